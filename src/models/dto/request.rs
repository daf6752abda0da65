use async_graphql::{InputObject, OneofObject, ID};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::question::{OptionDraft, QuestionDraft, QuestionType};
use crate::models::domain::AnswerValue;

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateAssignmentInput {
    #[validate(length(min = 1, max = 100))]
    pub lesson_id: String,

    #[validate(length(min = 1, max = 100))]
    pub classroom_id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub instructions: Option<String>,

    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
pub struct UpdateAssignmentInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub instructions: Option<String>,

    pub due_at: Option<DateTime<Utc>>,

    /// Removes the due date; wins over `due_at`.
    #[serde(default)]
    #[graphql(default)]
    pub clear_due_at: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject)]
pub struct QuestionOptionInput {
    #[validate(length(min = 1, max = 500))]
    pub text: String,

    pub correct: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateQuestionInput {
    pub question_type: QuestionType,

    #[validate(length(min = 1, max = 5000))]
    pub prompt: String,

    #[validate(url)]
    pub image_url: Option<String>,

    #[validate(length(max = 20), nested)]
    #[serde(default)]
    #[graphql(default)]
    pub options: Vec<QuestionOptionInput>,

    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub points: f64,

    #[validate(length(max = 1000))]
    pub correct_answer: Option<String>,

    /// Zero-based slot; omitted means append.
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

impl CreateQuestionInput {
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            question_type: self.question_type,
            prompt: self.prompt.clone(),
            image_url: self.image_url.clone(),
            options: self
                .options
                .iter()
                .map(|opt| OptionDraft {
                    text: opt.text.clone(),
                    correct: opt.correct,
                })
                .collect(),
            points: self.points,
            correct_answer: self.correct_answer.clone(),
        }
    }
}

/// Partial question edit; options, when given, replace the whole list.
#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
pub struct UpdateQuestionInput {
    pub question_type: Option<QuestionType>,

    #[validate(length(min = 1, max = 5000))]
    pub prompt: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,

    #[validate(length(max = 20), nested)]
    pub options: Option<Vec<QuestionOptionInput>>,

    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub points: Option<f64>,

    #[validate(length(max = 1000))]
    pub correct_answer: Option<String>,

    #[serde(default)]
    #[graphql(default)]
    pub clear_correct_answer: bool,

    #[serde(default)]
    #[graphql(default)]
    pub clear_image_url: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct ReorderQuestionsInput {
    pub assignment_id: ID,

    #[validate(length(min = 1))]
    pub ordered_question_ids: Vec<ID>,

    /// Optimistic check against the assignment version the caller last saw.
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, OneofObject)]
pub enum AnswerInput {
    SelectedOptionId(ID),
    Boolean(bool),
    Text(String),
}

impl From<AnswerInput> for AnswerValue {
    fn from(input: AnswerInput) -> Self {
        match input {
            AnswerInput::SelectedOptionId(id) => AnswerValue::SelectedOption(id.to_string()),
            AnswerInput::Boolean(value) => AnswerValue::Boolean(value),
            AnswerInput::Text(text) => AnswerValue::Text(text),
        }
    }
}

#[derive(Debug, Clone, Validate, InputObject)]
pub struct SaveAnswerInput {
    pub submission_id: ID,
    pub question_id: ID,
    pub answer: AnswerInput,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct GradeQuestionInput {
    pub submission_id: ID,
    pub question_id: ID,

    #[validate(range(min = 0.0))]
    pub teacher_score: f64,

    #[validate(length(max = 5000))]
    pub feedback: Option<String>,

    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct FinalizeGradeInput {
    pub submission_id: ID,

    #[validate(length(max = 5000))]
    pub overall_feedback: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct ReopenSubmissionInput {
    pub submission_id: ID,

    /// Lets the student change answers again; by default only grades change.
    #[serde(default)]
    #[graphql(default)]
    pub allow_answer_edits: bool,

    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}
