use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::ReadScope;
use crate::models::domain::{
    submission::{SubmissionEvent, SubmissionEventKind},
    AnswerValue, Assignment, AssignmentStatus, Question, QuestionGrade, QuestionType, Submission,
    SubmissionStatus,
};

/// Assignment as returned to a particular reader. Learners get answer keys
/// stripped until they have handed in their own work.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AssignmentView {
    pub id: String,
    pub lesson_id: String,
    pub classroom_id: String,
    pub created_by_user_id: String,
    pub title: String,
    pub instructions: Option<String>,
    pub status: AssignmentStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub max_score: f64,
    pub version: i64,
    pub questions: Vec<QuestionView>,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionView {
    pub id: String,
    pub order: i32,
    pub question_type: QuestionType,
    pub prompt: String,
    pub image_url: Option<String>,
    pub options: Vec<OptionView>,
    pub points: f64,
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub correct: Option<bool>,
}

impl AssignmentView {
    pub fn new(assignment: Assignment, scope: ReadScope, reveal_answers: bool) -> Self {
        let show_keys = scope == ReadScope::Full || reveal_answers;
        AssignmentView {
            questions: assignment
                .questions
                .into_iter()
                .map(|q| QuestionView::new(q, show_keys))
                .collect(),
            id: assignment.id,
            lesson_id: assignment.lesson_id,
            classroom_id: assignment.classroom_id,
            created_by_user_id: assignment.created_by_user_id,
            title: assignment.title,
            instructions: assignment.instructions,
            status: assignment.status,
            due_at: assignment.due_at,
            max_score: assignment.max_score,
            version: assignment.version,
            published_at: assignment.published_at,
            closed_at: assignment.closed_at,
        }
    }

    pub fn full(assignment: Assignment) -> Self {
        Self::new(assignment, ReadScope::Full, true)
    }
}

impl QuestionView {
    fn new(question: Question, show_keys: bool) -> Self {
        QuestionView {
            id: question.id,
            order: question.order,
            question_type: question.question_type,
            prompt: question.prompt,
            image_url: question.image_url,
            options: question
                .options
                .into_iter()
                .map(|opt| OptionView {
                    id: opt.id,
                    text: opt.text,
                    correct: show_keys.then_some(opt.correct),
                })
                .collect(),
            points: question.points,
            correct_answer: if show_keys {
                question.correct_answer
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AnswerView {
    pub question_id: String,
    pub selected_option_id: Option<String>,
    pub boolean: Option<bool>,
    pub text: Option<String>,
}

impl AnswerView {
    fn new(question_id: String, value: AnswerValue) -> Self {
        let mut view = AnswerView {
            question_id,
            selected_option_id: None,
            boolean: None,
            text: None,
        };
        match value {
            AnswerValue::SelectedOption(id) => view.selected_option_id = Some(id),
            AnswerValue::Boolean(b) => view.boolean = Some(b),
            AnswerValue::Text(t) => view.text = Some(t),
        }
        view
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionGradeView {
    pub question_id: String,
    pub points: f64,
    pub auto_score: Option<f64>,
    pub teacher_score: Option<f64>,
    pub effective_score: Option<f64>,
    pub feedback: Option<String>,
}

impl From<QuestionGrade> for QuestionGradeView {
    fn from(grade: QuestionGrade) -> Self {
        QuestionGradeView {
            effective_score: grade.effective_score(),
            question_id: grade.question_id,
            points: grade.points,
            auto_score: grade.auto_score,
            teacher_score: grade.teacher_score,
            feedback: grade.feedback,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SubmissionEventView {
    pub kind: SubmissionEventKind,
    pub actor_id: String,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl From<SubmissionEvent> for SubmissionEventView {
    fn from(event: SubmissionEvent) -> Self {
        SubmissionEventView {
            kind: event.kind,
            actor_id: event.actor_id,
            note: event.note,
            at: event.at,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SubmissionView {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub status: SubmissionStatus,
    pub answers: Vec<AnswerView>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub late: bool,
    /// Present only once the submission is graded.
    pub score: Option<f64>,
    pub total_score: Option<f64>,
    pub late_penalty_percent: Option<f64>,
    pub ungraded_questions: i32,
    pub grades: Vec<QuestionGradeView>,
    pub overall_feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub events: Vec<SubmissionEventView>,
    pub version: i64,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        let score = submission.score();
        let grade = submission.grade;
        SubmissionView {
            id: submission.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            status: submission.status,
            answers: submission
                .answers
                .into_iter()
                .map(|(question_id, value)| AnswerView::new(question_id, value))
                .collect(),
            submitted_at: submission.submitted_at,
            late: submission.late,
            score,
            total_score: grade.as_ref().map(|g| g.total_score),
            late_penalty_percent: grade.as_ref().map(|g| g.late_penalty_percent),
            ungraded_questions: grade
                .as_ref()
                .map(|g| g.ungraded_count() as i32)
                .unwrap_or(0),
            overall_feedback: grade.as_ref().and_then(|g| g.overall_feedback.clone()),
            grades: grade
                .map(|g| g.questions.into_iter().map(QuestionGradeView::from).collect())
                .unwrap_or_default(),
            graded_at: submission.graded_at,
            events: submission
                .events
                .into_iter()
                .map(SubmissionEventView::from)
                .collect(),
            version: submission.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PaginationMetadata {
    pub offset: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PaginatedAssignments {
    pub data: Vec<AssignmentView>,
    pub pagination: PaginationMetadata,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct DeleteResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CloseDueResponse {
    pub closed_assignment_ids: Vec<String>,
}
