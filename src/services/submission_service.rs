use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    auth::AccessPolicy,
    config::{LateSubmissionPolicy, SubmissionPolicy},
    errors::{AppError, AppResult},
    models::domain::{
        submission::SubmissionEventKind, Actor, AnswerValue, Assignment, Submission,
        SubmissionStatus,
    },
    repositories::{AssignmentRepository, SubmissionRepository},
    services::{grading_engine::GradingEngine, optimistic::update_submission},
};

/// Student-facing side of the submission lifecycle plus the read paths.
pub struct SubmissionService {
    assignments: Arc<dyn AssignmentRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    policy: Arc<AccessPolicy>,
    submission_policy: SubmissionPolicy,
}

impl SubmissionService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        policy: Arc<AccessPolicy>,
        submission_policy: SubmissionPolicy,
    ) -> Self {
        Self {
            assignments,
            submissions,
            policy,
            submission_policy,
        }
    }

    async fn load_assignment(&self, id: &str) -> AppResult<Assignment> {
        self.assignments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment with id '{}' not found", id)))
    }

    async fn load_submission(&self, id: &str) -> AppResult<Submission> {
        self.submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission with id '{}' not found", id)))
    }

    /// Loads a submission with its assignment after checking the caller owns it.
    async fn load_owned(&self, actor: &Actor, id: &str) -> AppResult<(Submission, Assignment)> {
        let submission = self.load_submission(id).await?;
        let assignment = self.load_assignment(&submission.assignment_id).await?;
        self.policy
            .require_submission_owner(actor, &submission, &assignment)
            .await?;
        Ok((submission, assignment))
    }

    /// Returns the caller's submission, creating it on first use. Racing
    /// starts converge on the record that won the unique index.
    pub async fn start_or_fetch(
        &self,
        actor: &Actor,
        assignment_id: &str,
    ) -> AppResult<Submission> {
        let assignment = self.load_assignment(assignment_id).await?;
        self.policy.assignment_read_scope(actor, &assignment).await?;
        let student_id = self
            .policy
            .require_enrolled_student(actor, &assignment)
            .await?;

        if let Some(existing) = self
            .submissions
            .find_by_assignment_and_student(assignment_id, &student_id)
            .await?
        {
            return Ok(existing);
        }

        assignment.ensure_published()?;

        match self
            .submissions
            .create(Submission::start(assignment_id, &student_id))
            .await
        {
            Ok(created) => {
                log::info!(
                    "Student '{}' started submission '{}' for assignment '{}'",
                    student_id,
                    created.id,
                    assignment_id
                );
                Ok(created)
            }
            Err(AppError::AlreadyExists(_)) => self
                .submissions
                .find_by_assignment_and_student(assignment_id, &student_id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Submission for assignment '{}' vanished after a duplicate insert",
                        assignment_id
                    ))
                }),
            Err(e) => Err(e),
        }
    }

    /// Upserts one answer. Last write wins per question.
    pub async fn save_answer(
        &self,
        actor: &Actor,
        submission_id: &str,
        question_id: &str,
        value: AnswerValue,
    ) -> AppResult<Submission> {
        let (submission, assignment) = self.load_owned(actor, submission_id).await?;
        assignment.ensure_published()?;

        let question = assignment.question(question_id).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Question '{}' is not part of assignment '{}'",
                question_id, assignment.id
            ))
        })?;
        question.validate_answer(&value)?;

        update_submission(self.submissions.as_ref(), submission, None, |s| {
            s.ensure_in_progress()?;
            s.answers.insert(question_id.to_string(), value.clone());
            Ok(())
        })
        .await
    }

    /// Hands the submission in and grades it. Exactly one of several
    /// concurrent calls succeeds; the rest see `InvalidState`.
    pub async fn submit(&self, actor: &Actor, submission_id: &str) -> AppResult<Submission> {
        self.submit_at(actor, submission_id, Utc::now()).await
    }

    pub async fn submit_at(
        &self,
        actor: &Actor,
        submission_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Submission> {
        let (submission, assignment) = self.load_owned(actor, submission_id).await?;
        assignment.ensure_published()?;

        let late = assignment.is_past_due(now);
        let penalty = match (late, self.submission_policy.late_submissions) {
            (false, _) | (true, LateSubmissionPolicy::Accept) => 0.0,
            (true, LateSubmissionPolicy::Penalize { percent }) => percent,
            (true, LateSubmissionPolicy::Reject) => {
                log::warn!(
                    "Rejected late submission '{}' for assignment '{}'",
                    submission_id,
                    assignment.id
                );
                return Err(AppError::InvalidState(format!(
                    "Assignment '{}' was due and does not accept late submissions",
                    assignment.id
                )));
            }
        };

        let actor_id = actor.id().to_string();
        let submitted = update_submission(self.submissions.as_ref(), submission, None, |s| {
            s.ensure_in_progress()?;
            s.status = SubmissionStatus::Submitted;
            if s.submitted_at.is_none() {
                s.submitted_at = Some(now);
            }
            s.late = s.late || late;
            s.grade = Some(GradingEngine::grade_submission(
                &assignment,
                &s.answers,
                penalty,
            ));
            s.record(
                SubmissionEventKind::Submitted,
                &actor_id,
                late.then(|| "late".to_string()),
            );
            s.promote_if_complete();
            Ok(())
        })
        .await?;

        log::info!(
            "Submission '{}' handed in ({:?}{})",
            submitted.id,
            submitted.status,
            if submitted.late { ", late" } else { "" }
        );
        Ok(submitted)
    }

    pub async fn get_submission(&self, actor: &Actor, id: &str) -> AppResult<Submission> {
        let submission = self.load_submission(id).await?;
        let assignment = self.load_assignment(&submission.assignment_id).await?;
        self.policy
            .require_submission_reader(actor, &submission, &assignment)
            .await?;
        Ok(submission)
    }

    /// Grading queue for the owning teacher.
    pub async fn list_for_assignment(
        &self,
        actor: &Actor,
        assignment_id: &str,
    ) -> AppResult<Vec<Submission>> {
        let assignment = self.load_assignment(assignment_id).await?;
        if !matches!(actor, Actor::Admin(_)) {
            self.policy
                .require_assignment_teacher(actor, &assignment)
                .await?;
        }
        self.submissions.list_by_assignment(assignment_id).await
    }

    /// A student's own work, or a child's handed-in work for a guardian.
    pub async fn list_for_student(
        &self,
        actor: &Actor,
        student_id: &str,
    ) -> AppResult<Vec<Submission>> {
        self.policy
            .require_student_or_guardian(actor, student_id)
            .await?;

        let submissions = self.submissions.list_by_student(student_id).await?;
        let visible = match actor {
            Actor::Parent(_) => submissions
                .into_iter()
                .filter(|s| s.status.is_handed_in())
                .collect(),
            _ => submissions,
        };
        Ok(visible)
    }
}
