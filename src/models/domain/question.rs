use std::collections::HashSet;

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::submission::AnswerValue;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub order: i32, // dense, zero-based within the assignment
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub options: Vec<QuestionOption>, // multiple choice only
    pub points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>, // true/false and short answer only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer, // exact match against correct_answer
    Essay,       // free text, graded by a teacher
}

impl QuestionType {
    /// Objective types are scored without human judgment.
    pub fn is_objective(self) -> bool {
        !matches!(self, QuestionType::Essay)
    }
}

/// Validated-on-build description of a question, independent of its
/// identity and position.
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionDraft {
    pub question_type: QuestionType,
    pub prompt: String,
    pub image_url: Option<String>,
    pub options: Vec<OptionDraft>,
    pub points: f64,
    pub correct_answer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionDraft {
    pub text: String,
    pub correct: bool,
}

impl Question {
    pub fn from_draft(id: &str, draft: QuestionDraft, order: i32) -> AppResult<Self> {
        let now = Utc::now();
        let question = Question {
            id: id.to_string(),
            order,
            question_type: draft.question_type,
            prompt: draft.prompt.trim().to_string(),
            image_url: draft.image_url,
            options: draft
                .options
                .into_iter()
                .map(|opt| QuestionOption {
                    id: Uuid::new_v4().to_string(),
                    text: opt.text.trim().to_string(),
                    correct: opt.correct,
                })
                .collect(),
            points: draft.points,
            correct_answer: draft.correct_answer.map(|a| a.trim().to_string()),
            created_at: Some(now),
            modified_at: Some(now),
        };
        question.validate()?;
        Ok(question)
    }

    /// Checks the fields required (and forbidden) by the question type.
    pub fn validate(&self) -> AppResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Question prompt must not be empty".to_string(),
            ));
        }

        if !self.points.is_finite() || self.points <= 0.0 {
            return Err(AppError::ValidationError(format!(
                "Question points must be positive, got {}",
                self.points
            )));
        }

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.options.len() < 2 {
                    return Err(AppError::ValidationError(
                        "Multiple-choice questions need at least 2 options".to_string(),
                    ));
                }
                if !self.options.iter().any(|opt| opt.correct) {
                    return Err(AppError::ValidationError(
                        "Multiple-choice questions need at least one correct option".to_string(),
                    ));
                }
                if self.options.iter().any(|opt| opt.text.trim().is_empty()) {
                    return Err(AppError::ValidationError(
                        "Option text must not be empty".to_string(),
                    ));
                }
                self.reject_duplicate_options()?;
                if self.correct_answer.is_some() {
                    return Err(AppError::ValidationError(
                        "Multiple-choice questions take correctness from their options".to_string(),
                    ));
                }
            }
            QuestionType::TrueFalse => {
                self.reject_options()?;
                match self.correct_answer.as_deref().map(parse_bool) {
                    Some(Some(_)) => {}
                    _ => {
                        return Err(AppError::ValidationError(
                            "True/false questions need a correct answer of 'true' or 'false'"
                                .to_string(),
                        ))
                    }
                }
            }
            QuestionType::ShortAnswer => {
                self.reject_options()?;
                if self
                    .correct_answer
                    .as_deref()
                    .map(|a| a.trim().is_empty())
                    .unwrap_or(true)
                {
                    return Err(AppError::ValidationError(
                        "Short-answer questions need a correct answer".to_string(),
                    ));
                }
            }
            QuestionType::Essay => {
                self.reject_options()?;
                if self.correct_answer.is_some() {
                    return Err(AppError::ValidationError(
                        "Essay questions are graded manually and take no correct answer"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Option ids and texts (ignoring case) are unique within a question.
    fn reject_duplicate_options(&self) -> AppResult<()> {
        let mut ids = HashSet::new();
        let mut texts = HashSet::new();
        for opt in &self.options {
            if !ids.insert(opt.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Option id '{}' is used more than once",
                    opt.id
                )));
            }
            if !texts.insert(opt.text.trim().to_lowercase()) {
                return Err(AppError::ValidationError(format!(
                    "Option '{}' is listed more than once",
                    opt.text.trim()
                )));
            }
        }
        Ok(())
    }

    fn reject_options(&self) -> AppResult<()> {
        if !self.options.is_empty() {
            return Err(AppError::ValidationError(format!(
                "{:?} questions do not take options",
                self.question_type
            )));
        }
        Ok(())
    }

    /// Checks an answer's shape against this question's type.
    pub fn validate_answer(&self, value: &AnswerValue) -> AppResult<()> {
        match (self.question_type, value) {
            (QuestionType::MultipleChoice, AnswerValue::SelectedOption(option_id)) => {
                if self.options.iter().any(|opt| &opt.id == option_id) {
                    Ok(())
                } else {
                    Err(AppError::ValidationError(format!(
                        "Option '{}' does not belong to question '{}'",
                        option_id, self.id
                    )))
                }
            }
            (QuestionType::TrueFalse, AnswerValue::Boolean(_)) => Ok(()),
            (QuestionType::ShortAnswer | QuestionType::Essay, AnswerValue::Text(_)) => Ok(()),
            (question_type, value) => Err(AppError::ValidationError(format!(
                "Answer {} does not fit a {:?} question",
                value.kind(),
                question_type
            ))),
        }
    }

    /// True/false questions store their key as text; this is the parsed form.
    pub fn expected_boolean(&self) -> Option<bool> {
        self.correct_answer.as_deref().and_then(parse_bool)
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
