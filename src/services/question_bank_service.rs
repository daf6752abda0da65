use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AccessPolicy,
    errors::{AppError, AppResult},
    models::{
        domain::{Actor, Assignment, Question, QuestionOption},
        dto::request::{CreateQuestionInput, ReorderQuestionsInput, UpdateQuestionInput},
    },
    repositories::AssignmentRepository,
    services::optimistic::update_assignment,
};

/// Authoring of the questions embedded in a draft assignment. Every method
/// returns the whole assignment so callers see renumbered order and the
/// recomputed max score.
pub struct QuestionBankService {
    assignments: Arc<dyn AssignmentRepository>,
    policy: Arc<AccessPolicy>,
}

impl QuestionBankService {
    pub fn new(assignments: Arc<dyn AssignmentRepository>, policy: Arc<AccessPolicy>) -> Self {
        Self {
            assignments,
            policy,
        }
    }

    async fn load_for_author(&self, actor: &Actor, assignment_id: &str) -> AppResult<Assignment> {
        let assignment = self
            .assignments
            .find_by_id(assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Assignment with id '{}' not found", assignment_id))
            })?;
        self.policy
            .require_assignment_teacher(actor, &assignment)
            .await?;
        Ok(assignment)
    }

    pub async fn create_question(
        &self,
        actor: &Actor,
        assignment_id: &str,
        input: CreateQuestionInput,
    ) -> AppResult<Assignment> {
        input.validate()?;
        let assignment = self.load_for_author(actor, assignment_id).await?;

        let question_id = Uuid::new_v4().to_string();
        let question = Question::from_draft(&question_id, input.to_draft(), 0)?;
        let position = input.position.map(|p| p.max(0) as usize);

        let saved = update_assignment(self.assignments.as_ref(), assignment, None, |a| {
            a.insert_question(question.clone(), position)
        })
        .await?;

        log::info!(
            "Added question '{}' to assignment '{}' (max score {})",
            question_id,
            saved.id,
            saved.max_score
        );
        Ok(saved)
    }

    pub async fn update_question(
        &self,
        actor: &Actor,
        assignment_id: &str,
        question_id: &str,
        input: UpdateQuestionInput,
    ) -> AppResult<Assignment> {
        input.validate()?;
        let assignment = self.load_for_author(actor, assignment_id).await?;

        update_assignment(self.assignments.as_ref(), assignment, None, |a| {
            a.ensure_draft()?;
            let current = a.question(question_id).cloned().ok_or_else(|| {
                AppError::NotFound(format!("Question '{}' not found", question_id))
            })?;
            a.replace_question(apply_update(current, &input))
        })
        .await
    }

    pub async fn delete_question(
        &self,
        actor: &Actor,
        assignment_id: &str,
        question_id: &str,
    ) -> AppResult<Assignment> {
        let assignment = self.load_for_author(actor, assignment_id).await?;

        let saved = update_assignment(self.assignments.as_ref(), assignment, None, |a| {
            a.remove_question(question_id).map(|_| ())
        })
        .await?;

        log::info!(
            "Removed question '{}' from assignment '{}'",
            question_id,
            saved.id
        );
        Ok(saved)
    }

    /// All-or-nothing reorder. A concurrent create or delete makes the id
    /// set stale, which surfaces as a validation error on retry.
    pub async fn reorder_questions(
        &self,
        actor: &Actor,
        input: ReorderQuestionsInput,
    ) -> AppResult<Assignment> {
        input.validate()?;
        let assignment = self.load_for_author(actor, &input.assignment_id).await?;
        let ordered: Vec<String> = input
            .ordered_question_ids
            .iter()
            .map(|id| id.to_string())
            .collect();

        update_assignment(
            self.assignments.as_ref(),
            assignment,
            input.expected_version,
            |a| a.reorder_questions(&ordered),
        )
        .await
    }
}

/// Merges a partial edit into a copy of the stored question. Option ids are
/// kept for options whose text is unchanged so saved answers still resolve.
fn apply_update(mut question: Question, input: &UpdateQuestionInput) -> Question {
    if let Some(question_type) = input.question_type {
        question.question_type = question_type;
    }
    if let Some(prompt) = &input.prompt {
        question.prompt = prompt.trim().to_string();
    }
    if input.clear_image_url {
        question.image_url = None;
    } else if let Some(url) = &input.image_url {
        question.image_url = Some(url.clone());
    }
    if let Some(options) = &input.options {
        let mut previous = std::mem::take(&mut question.options);
        question.options = options
            .iter()
            .map(|opt| {
                let text = opt.text.trim().to_string();
                // each stored id is handed to at most one new option
                let id = previous
                    .iter()
                    .position(|p| p.text == text)
                    .map(|index| previous.swap_remove(index).id)
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                QuestionOption {
                    id,
                    text,
                    correct: opt.correct,
                }
            })
            .collect();
    }
    if let Some(points) = input.points {
        question.points = points;
    }
    if input.clear_correct_answer {
        question.correct_answer = None;
    } else if let Some(answer) = &input.correct_answer {
        question.correct_answer = Some(answer.trim().to_string());
    }
    question.modified_at = Some(Utc::now());
    question
}
