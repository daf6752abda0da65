pub mod assignment;
pub mod grade;
pub mod question;
pub mod roster;
pub mod submission;
pub mod user;
pub use assignment::{Assignment, AssignmentStatus};
pub use grade::{GradeRecord, QuestionGrade};
pub use question::{Question, QuestionDraft, QuestionOption, QuestionType};
pub use roster::{Classroom, Guardianship};
pub use submission::{AnswerValue, Submission, SubmissionStatus};
pub use user::{Actor, UserRole};
