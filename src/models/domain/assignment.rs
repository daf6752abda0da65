use std::collections::HashSet;

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::question::Question;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Assignment {
    pub id: String,
    pub lesson_id: String,
    pub classroom_id: String,
    pub created_by_user_id: String, // owning teacher
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub status: AssignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub max_score: f64, // always the sum of question points
    #[serde(default)]
    pub questions: Vec<Question>, // kept sorted by order
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
pub enum AssignmentStatus {
    Draft,
    Published,
    Closed,
}

impl Assignment {
    pub fn new_draft(
        lesson_id: &str,
        classroom_id: &str,
        created_by_user_id: &str,
        title: &str,
        instructions: Option<String>,
        due_at: Option<DateTime<Utc>>,
    ) -> Self {
        Assignment {
            id: Uuid::new_v4().to_string(),
            lesson_id: lesson_id.to_string(),
            classroom_id: classroom_id.to_string(),
            created_by_user_id: created_by_user_id.to_string(),
            title: title.trim().to_string(),
            instructions,
            status: AssignmentStatus::Draft,
            due_at,
            max_score: 0.0,
            questions: Vec::new(),
            version: 0,
            published_at: None,
            closed_at: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn ensure_draft(&self) -> AppResult<()> {
        if self.status != AssignmentStatus::Draft {
            return Err(AppError::InvalidState(format!(
                "Assignment '{}' is {:?}; only drafts can be edited",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn ensure_published(&self) -> AppResult<()> {
        if self.status != AssignmentStatus::Published {
            return Err(AppError::InvalidState(format!(
                "Assignment '{}' is {:?}, not open for work",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at.map(|due| now > due).unwrap_or(false)
    }

    pub fn publish(&mut self) -> AppResult<()> {
        self.ensure_draft()?;
        if self.questions.is_empty() {
            return Err(AppError::InvalidState(
                "Cannot publish an assignment without questions".to_string(),
            ));
        }
        if self.max_score <= 0.0 {
            return Err(AppError::InvalidState(
                "Cannot publish an assignment with a max score of zero".to_string(),
            ));
        }
        self.status = AssignmentStatus::Published;
        self.published_at = Some(Utc::now());
        Ok(())
    }

    /// Back to draft; the caller is responsible for checking that no
    /// submission has been handed in yet.
    pub fn unpublish(&mut self) -> AppResult<()> {
        if self.status != AssignmentStatus::Published {
            return Err(AppError::InvalidState(format!(
                "Only published assignments can be unpublished, '{}' is {:?}",
                self.id, self.status
            )));
        }
        self.status = AssignmentStatus::Draft;
        self.published_at = None;
        Ok(())
    }

    pub fn close(&mut self) -> AppResult<()> {
        if self.status != AssignmentStatus::Published {
            return Err(AppError::InvalidState(format!(
                "Only published assignments can be closed, '{}' is {:?}",
                self.id, self.status
            )));
        }
        self.status = AssignmentStatus::Closed;
        self.closed_at = Some(Utc::now());
        Ok(())
    }

    /// Inserts at `position` (clamped to the end), shifting later questions.
    pub fn insert_question(
        &mut self,
        mut question: Question,
        position: Option<usize>,
    ) -> AppResult<()> {
        self.ensure_draft()?;
        if self.question(&question.id).is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Question '{}' already exists",
                question.id
            )));
        }
        let index = position
            .unwrap_or(self.questions.len())
            .min(self.questions.len());
        question.order = index as i32;
        self.questions.insert(index, question);
        self.renumber();
        Ok(())
    }

    pub fn replace_question(&mut self, question: Question) -> AppResult<()> {
        self.ensure_draft()?;
        question.validate()?;
        let slot = self
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or_else(|| AppError::NotFound(format!("Question '{}' not found", question.id)))?;
        *slot = question;
        self.renumber();
        Ok(())
    }

    pub fn remove_question(&mut self, question_id: &str) -> AppResult<Question> {
        self.ensure_draft()?;
        let index = self
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question '{}' not found", question_id)))?;
        let removed = self.questions.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Replaces the whole order; `ordered_ids` must be a permutation of
    /// the current question ids.
    pub fn reorder_questions(&mut self, ordered_ids: &[String]) -> AppResult<()> {
        self.ensure_draft()?;

        let current: HashSet<&str> = self.questions.iter().map(|q| q.id.as_str()).collect();
        let requested: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();

        if requested.len() != ordered_ids.len() {
            return Err(AppError::ValidationError(
                "Question order contains duplicate ids".to_string(),
            ));
        }
        if requested != current {
            return Err(AppError::ValidationError(
                "Question order must list every question of the assignment exactly once"
                    .to_string(),
            ));
        }

        let mut remaining = std::mem::take(&mut self.questions);
        for id in ordered_ids {
            if let Some(index) = remaining.iter().position(|q| &q.id == id) {
                self.questions.push(remaining.swap_remove(index));
            }
        }
        self.renumber();
        Ok(())
    }

    fn renumber(&mut self) {
        for (index, question) in self.questions.iter_mut().enumerate() {
            question.order = index as i32;
        }
        self.max_score = self.questions.iter().map(|q| q.points).sum();
    }
}
