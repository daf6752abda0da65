use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Grade state embedded in a submission.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GradeRecord {
    pub questions: Vec<QuestionGrade>,
    pub total_score: f64,
    #[serde(default)]
    pub late_penalty_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionGrade {
    pub question_id: String,
    pub points: f64,
    pub auto_score: Option<f64>,
    pub teacher_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl QuestionGrade {
    /// Teacher override, else the automatic score. None means a human
    /// still has to grade the question.
    pub fn effective_score(&self) -> Option<f64> {
        self.teacher_score.or(self.auto_score)
    }
}

impl GradeRecord {
    pub fn new(questions: Vec<QuestionGrade>, late_penalty_percent: f64) -> Self {
        let mut record = GradeRecord {
            questions,
            total_score: 0.0,
            late_penalty_percent: late_penalty_percent.clamp(0.0, 100.0),
            overall_feedback: None,
            finalized_at: None,
        };
        record.recompute_total();
        record
    }

    pub fn max_score(&self) -> f64 {
        self.questions.iter().map(|q| q.points).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.questions.iter().all(|q| q.effective_score().is_some())
    }

    pub fn ungraded_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.effective_score().is_none())
            .count()
    }

    pub fn raw_score(&self) -> f64 {
        self.questions
            .iter()
            .map(|q| q.effective_score().unwrap_or(0.0))
            .sum()
    }

    pub fn recompute_total(&mut self) {
        let factor = 1.0 - self.late_penalty_percent / 100.0;
        self.total_score = (self.raw_score() * factor).clamp(0.0, self.max_score());
    }

    pub fn set_teacher_score(
        &mut self,
        question_id: &str,
        score: f64,
        feedback: Option<String>,
    ) -> AppResult<()> {
        let grade = self
            .questions
            .iter_mut()
            .find(|q| q.question_id == question_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Question '{}' is not part of this submission",
                    question_id
                ))
            })?;

        if !score.is_finite() || score < 0.0 || score > grade.points {
            return Err(AppError::ValidationError(format!(
                "Score {} is outside the range 0..={}",
                score, grade.points
            )));
        }

        grade.teacher_score = Some(score);
        if feedback.is_some() {
            grade.feedback = feedback;
        }
        self.recompute_total();
        Ok(())
    }
}
