use std::collections::BTreeMap;

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::grade::GradeRecord;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerValue>, // keyed by question id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>, // set once
    #[serde(default)]
    pub late: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub events: Vec<SubmissionEvent>,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub fn is_handed_in(self) -> bool {
        matches!(self, SubmissionStatus::Submitted | SubmissionStatus::Graded)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    SelectedOption(String),
    Boolean(bool),
    Text(String),
}

impl AnswerValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerValue::SelectedOption(_) => "selected option",
            AnswerValue::Boolean(_) => "boolean",
            AnswerValue::Text(_) => "text",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubmissionEvent {
    pub kind: SubmissionEventKind,
    pub actor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Enum, Copy)]
pub enum SubmissionEventKind {
    Submitted,
    ScoreOverridden,
    Finalized,
    Reopened,
}

impl Submission {
    pub fn start(assignment_id: &str, student_id: &str) -> Self {
        Submission {
            id: Uuid::new_v4().to_string(),
            assignment_id: assignment_id.to_string(),
            student_id: student_id.to_string(),
            status: SubmissionStatus::InProgress,
            answers: BTreeMap::new(),
            submitted_at: None,
            late: false,
            grade: None,
            graded_at: None,
            events: Vec::new(),
            version: 0,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn ensure_in_progress(&self) -> AppResult<()> {
        if self.status != SubmissionStatus::InProgress {
            return Err(AppError::InvalidState(format!(
                "Submission '{}' is {:?}, answers can no longer change",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn ensure_gradable(&self) -> AppResult<&GradeRecord> {
        if !self.status.is_handed_in() {
            return Err(AppError::InvalidState(format!(
                "Submission '{}' has not been submitted",
                self.id
            )));
        }
        self.grade.as_ref().ok_or_else(|| {
            AppError::InternalError(format!("Submission '{}' has no grade record", self.id))
        })
    }

    pub fn grade_mut(&mut self) -> AppResult<&mut GradeRecord> {
        self.ensure_gradable()?;
        let id = self.id.clone();
        self.grade.as_mut().ok_or_else(|| {
            AppError::InternalError(format!("Submission '{}' has no grade record", id))
        })
    }

    /// Final score, only once grading is complete.
    pub fn score(&self) -> Option<f64> {
        match (self.status, &self.grade) {
            (SubmissionStatus::Graded, Some(grade)) => Some(grade.total_score),
            _ => None,
        }
    }

    /// Submitted -> Graded once every question carries a score.
    pub fn promote_if_complete(&mut self) -> bool {
        let complete = self.grade.as_ref().map(|g| g.is_complete()).unwrap_or(false);
        if self.status == SubmissionStatus::Submitted && complete {
            self.status = SubmissionStatus::Graded;
            self.graded_at = Some(Utc::now());
            return true;
        }
        false
    }

    pub fn record(&mut self, kind: SubmissionEventKind, actor_id: &str, note: Option<String>) {
        self.events.push(SubmissionEvent {
            kind,
            actor_id: actor_id.to_string(),
            note,
            at: Utc::now(),
        });
    }
}
