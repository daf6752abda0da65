pub mod assignment_service;
pub mod grading_engine;
pub mod grading_service;
pub mod optimistic;
pub mod question_bank_service;
pub mod submission_service;

pub use assignment_service::AssignmentService;
pub use grading_engine::GradingEngine;
pub use grading_service::GradingService;
pub use question_bank_service::QuestionBankService;
pub use submission_service::SubmissionService;
