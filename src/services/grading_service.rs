use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    auth::AccessPolicy,
    config::{LateSubmissionPolicy, SubmissionPolicy},
    errors::{AppError, AppResult},
    models::{
        domain::{submission::SubmissionEventKind, Actor, Assignment, Submission, SubmissionStatus},
        dto::request::{FinalizeGradeInput, GradeQuestionInput, ReopenSubmissionInput},
    },
    repositories::{AssignmentRepository, SubmissionRepository},
    services::optimistic::update_submission,
};

/// Teacher-side grading: overrides, finalization and reopening.
pub struct GradingService {
    assignments: Arc<dyn AssignmentRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    policy: Arc<AccessPolicy>,
    submission_policy: SubmissionPolicy,
}

impl GradingService {
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

    async fn load_for_grader(
        &self,
        actor: &Actor,
        submission_id: &str,
    ) -> AppResult<(Submission, Assignment)> {
        let submission = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission with id '{}' not found", submission_id))
            })?;
        let assignment: Assignment = self
            .assignments
            .find_by_id(&submission.assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Assignment with id '{}' not found",
                    submission.assignment_id
                ))
            })?;
        self.policy
            .require_assignment_teacher(actor, &assignment)
            .await?;
        Ok((submission, assignment))
    }

    /// Answers may only reopen while a resubmission could still be accepted.
    fn ensure_resubmittable(&self, assignment: &Assignment) -> AppResult<()> {
        assignment.ensure_published()?;
        if assignment.is_past_due(Utc::now())
            && self.submission_policy.late_submissions == LateSubmissionPolicy::Reject
        {
            return Err(AppError::InvalidState(format!(
                "Assignment '{}' was due and does not accept late submissions",
                assignment.id
            )));
        }
        Ok(())
    }

    /// Sets a teacher score for one question. The last missing score moves
    /// the submission to Graded.
    pub async fn grade_question(
        &self,
        actor: &Actor,
        input: GradeQuestionInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        let (submission, _) = self.load_for_grader(actor, &input.submission_id).await?;
        let question_id = input.question_id.to_string();
        let actor_id = actor.id().to_string();

        let graded = update_submission(
            self.submissions.as_ref(),
            submission,
            input.expected_version,
            |s| {
                s.grade_mut()?.set_teacher_score(
                    &question_id,
                    input.teacher_score,
                    input.feedback.clone(),
                )?;
                s.record(
                    SubmissionEventKind::ScoreOverridden,
                    &actor_id,
                    Some(format!("{}: {}", question_id, input.teacher_score)),
                );
                s.promote_if_complete();
                Ok(())
            },
        )
        .await?;

        log::info!(
            "Question '{}' of submission '{}' graded {} by '{}'",
            question_id,
            graded.id,
            input.teacher_score,
            actor_id
        );
        Ok(graded)
    }

    /// Requires every question to carry a score. Finalizing again only
    /// replaces the overall feedback.
    pub async fn finalize_grade(
        &self,
        actor: &Actor,
        input: FinalizeGradeInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        let (submission, _) = self.load_for_grader(actor, &input.submission_id).await?;
        let actor_id = actor.id().to_string();

        update_submission(self.submissions.as_ref(), submission, None, |s| {
            let pending = s.ensure_gradable()?.ungraded_count();
            if pending > 0 {
                return Err(AppError::InvalidState(format!(
                    "Submission '{}' still has {} ungraded question(s)",
                    s.id, pending
                )));
            }

            let first_time = s.grade_mut()?.finalized_at.is_none();
            let grade = s.grade_mut()?;
            grade.overall_feedback = input.overall_feedback.clone();
            if first_time {
                grade.finalized_at = Some(Utc::now());
            }
            s.promote_if_complete();
            if first_time {
                s.record(SubmissionEventKind::Finalized, &actor_id, None);
            }
            Ok(())
        })
        .await
    }

    /// Graded -> Submitted for regrading, or -> InProgress when the student
    /// may change answers again. Always leaves a Reopened event.
    ///
    /// Reopening for edits needs a published assignment that would still take
    /// the resubmission. The old grade stays on record until that resubmission
    /// replaces it.
    pub async fn reopen(
        &self,
        actor: &Actor,
        input: ReopenSubmissionInput,
    ) -> AppResult<Submission> {
        input.validate()?;
        let (submission, assignment) = self.load_for_grader(actor, &input.submission_id).await?;
        if input.allow_answer_edits {
            self.ensure_resubmittable(&assignment)?;
        }
        let actor_id = actor.id().to_string();

        let reopened = update_submission(self.submissions.as_ref(), submission, None, |s| {
            if s.status != SubmissionStatus::Graded {
                return Err(AppError::InvalidState(format!(
                    "Only graded submissions can be reopened, '{}' is {:?}",
                    s.id, s.status
                )));
            }

            if input.allow_answer_edits {
                s.status = SubmissionStatus::InProgress;
            } else {
                s.status = SubmissionStatus::Submitted;
                if let Some(grade) = s.grade.as_mut() {
                    grade.finalized_at = None;
                }
            }
            s.graded_at = None;
            s.record(
                SubmissionEventKind::Reopened,
                &actor_id,
                Some(input.reason.clone()),
            );
            Ok(())
        })
        .await?;

        log::info!(
            "Submission '{}' reopened by '{}' ({})",
            reopened.id,
            actor_id,
            if input.allow_answer_edits {
                "answers editable"
            } else {
                "grading only"
            }
        );
        Ok(reopened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{question::fixtures::*, AnswerValue, Question},
        repositories::{InMemoryAssignmentRepository, InMemorySubmissionRepository},
        services::{grading_engine::GradingEngine, SubmissionService},
        test_utils::seeded_roster,
    };
    use async_graphql::ID;
    use chrono::{DateTime, Duration};

    struct Fixture {
        service: GradingService,
        submissions: SubmissionService,
        assignments: Arc<InMemoryAssignmentRepository>,
        submission: Submission,
    }

    fn teacher() -> Actor {
        Actor::Teacher("teacher-1".to_string())
    }

    fn student() -> Actor {
        Actor::Student("student-1".to_string())
    }

    async fn fixture() -> Fixture {
        fixture_with(SubmissionPolicy::default(), None).await
    }

    /// Submitted work on an assignment with one correct MC (2 pts) and an
    /// unanswered essay (3 pts).
    async fn fixture_with(policy: SubmissionPolicy, due_at: Option<DateTime<Utc>>) -> Fixture {
        let roster = seeded_roster().await;

        let mut assignment =
            Assignment::new_draft("lesson-1", "class-1", "teacher-1", "Stories", None, due_at);
        let mc = Question::from_draft("mc", multiple_choice(2.0, &["A", "B"], 1), 0)
            .expect("valid");
        let correct = mc.options[1].id.clone();
        assignment.insert_question(mc, None).expect("insert");
        assignment
            .insert_question(
                Question::from_draft("essay", essay(3.0), 0).expect("valid"),
                None,
            )
            .expect("insert");
        assignment.publish().expect("publish");

        let mut submission = Submission::start(&assignment.id, "student-1");
        submission
            .answers
            .insert("mc".to_string(), AnswerValue::SelectedOption(correct));
        submission.status = SubmissionStatus::Submitted;
        submission.submitted_at = Some(Utc::now() - Duration::hours(2));
        submission.grade = Some(GradingEngine::grade_submission(
            &assignment,
            &submission.answers,
            0.0,
        ));

        let assignments = Arc::new(InMemoryAssignmentRepository::new());
        assignments.create(assignment).await.expect("assignment");
        let submissions = Arc::new(InMemorySubmissionRepository::new());
        let submission = submissions.create(submission).await.expect("submission");
        let access = Arc::new(AccessPolicy::new(roster));

        Fixture {
            service: GradingService::new(
                assignments.clone(),
                submissions.clone(),
                access.clone(),
                policy,
            ),
            submissions: SubmissionService::new(
                assignments.clone(),
                submissions,
                access,
                policy,
            ),
            assignments,
            submission,
        }
    }

    async fn graded(f: &Fixture) -> Submission {
        f.service
            .grade_question(&teacher(), grade_input(f, "essay", 3.0))
            .await
            .expect("grade")
    }

    fn reopen_input(f: &Fixture, allow_answer_edits: bool) -> ReopenSubmissionInput {
        ReopenSubmissionInput {
            submission_id: ID::from(f.submission.id.clone()),
            allow_answer_edits,
            reason: "Recheck essay".to_string(),
        }
    }

    fn grade_input(f: &Fixture, question: &str, score: f64) -> GradeQuestionInput {
        GradeQuestionInput {
            submission_id: ID::from(f.submission.id.clone()),
            question_id: ID::from(question),
            teacher_score: score,
            feedback: None,
            expected_version: None,
        }
    }

    #[tokio::test]
    async fn grading_the_essay_completes_the_submission() {
        let f = fixture().await;
        assert_eq!(f.submission.score(), None);

        let graded = f
            .service
            .grade_question(&teacher(), grade_input(&f, "essay", 2.0))
            .await
            .expect("grade");
        assert_eq!(graded.status, SubmissionStatus::Graded);
        assert_eq!(graded.score(), Some(4.0));
        assert_eq!(
            graded.events.last().map(|e| e.kind),
            Some(SubmissionEventKind::ScoreOverridden)
        );
    }

    #[tokio::test]
    async fn scores_outside_the_question_range_are_rejected() {
        let f = fixture().await;
        let result = f
            .service
            .grade_question(&teacher(), grade_input(&f, "essay", 3.5))
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let stranger = f
            .service
            .grade_question(
                &Actor::Teacher("teacher-2".to_string()),
                grade_input(&f, "essay", 1.0),
            )
            .await;
        assert!(matches!(stranger, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let f = fixture().await;
        let mut input = grade_input(&f, "essay", 1.0);
        input.expected_version = Some(f.submission.version + 3);

        let result = f.service.grade_question(&teacher(), input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn finalize_requires_every_score() {
        let f = fixture().await;
        let input = FinalizeGradeInput {
            submission_id: ID::from(f.submission.id.clone()),
            overall_feedback: Some("Nice work".to_string()),
        };
        assert!(matches!(
            f.service.finalize_grade(&teacher(), input.clone()).await,
            Err(AppError::InvalidState(_))
        ));

        f.service
            .grade_question(&teacher(), grade_input(&f, "essay", 3.0))
            .await
            .expect("grade");
        let finalized = f
            .service
            .finalize_grade(&teacher(), input)
            .await
            .expect("finalize");
        let first_stamp = finalized.grade.as_ref().and_then(|g| g.finalized_at);
        assert!(first_stamp.is_some());

        let again = f
            .service
            .finalize_grade(
                &teacher(),
                FinalizeGradeInput {
                    submission_id: ID::from(f.submission.id.clone()),
                    overall_feedback: Some("Excellent".to_string()),
                },
            )
            .await
            .expect("refinalize");
        let grade = again.grade.expect("grade");
        assert_eq!(grade.overall_feedback.as_deref(), Some("Excellent"));
        assert_eq!(grade.finalized_at, first_stamp);
        assert_eq!(
            again
                .events
                .iter()
                .filter(|e| e.kind == SubmissionEventKind::Finalized)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn reopen_defaults_to_grading_only() {
        let f = fixture().await;
        assert!(matches!(
            f.service.reopen(&teacher(), reopen_input(&f, false)).await,
            Err(AppError::InvalidState(_))
        ));

        f.service
            .grade_question(&teacher(), grade_input(&f, "essay", 1.0))
            .await
            .expect("grade");
        let reopened = f
            .service
            .reopen(&teacher(), reopen_input(&f, false))
            .await
            .expect("reopen");
        assert_eq!(reopened.status, SubmissionStatus::Submitted);
        assert_eq!(reopened.score(), None);
        assert!(reopened.grade.is_some());
        assert!(reopened.submitted_at.is_some());

        let regraded = graded(&f).await;
        assert_eq!(regraded.score(), Some(5.0));

        let editable = f
            .service
            .reopen(&teacher(), reopen_input(&f, true))
            .await
            .expect("reopen for edits");
        assert_eq!(editable.status, SubmissionStatus::InProgress);
        assert_eq!(editable.score(), None);
        assert_eq!(editable.grade.as_ref().map(|g| g.total_score), Some(5.0));
        assert_eq!(editable.submitted_at, f.submission.submitted_at);
        assert_eq!(
            editable
                .events
                .iter()
                .filter(|e| e.kind == SubmissionEventKind::Reopened)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn reopened_answers_can_be_resubmitted() {
        let f = fixture().await;
        graded(&f).await;
        f.service
            .reopen(&teacher(), reopen_input(&f, true))
            .await
            .expect("reopen for edits");

        let resubmitted = f
            .submissions
            .submit(&student(), &f.submission.id)
            .await
            .expect("resubmit");
        assert_eq!(resubmitted.status, SubmissionStatus::Submitted);
        assert_eq!(resubmitted.submitted_at, f.submission.submitted_at);
        let grade = resubmitted.grade.expect("fresh grade");
        assert_eq!(grade.ungraded_count(), 1);
        assert!(!resubmitted.late);
    }

    #[tokio::test]
    async fn closed_assignments_cannot_reopen_for_edits() {
        let f = fixture().await;
        graded(&f).await;
        let mut assignment = f
            .assignments
            .find_by_id(&f.submission.assignment_id)
            .await
            .expect("lookup")
            .expect("assignment");
        assignment.close().expect("close");
        f.assignments.update(assignment).await.expect("persist");

        assert!(matches!(
            f.service.reopen(&teacher(), reopen_input(&f, true)).await,
            Err(AppError::InvalidState(_))
        ));

        let regrade = f
            .service
            .reopen(&teacher(), reopen_input(&f, false))
            .await
            .expect("grading-only reopen still allowed");
        assert_eq!(regrade.status, SubmissionStatus::Submitted);
        assert_eq!(regrade.grade.map(|g| g.total_score), Some(5.0));
    }

    #[tokio::test]
    async fn past_due_reject_policy_blocks_reopen_for_edits() {
        let policy = SubmissionPolicy {
            late_submissions: LateSubmissionPolicy::Reject,
        };
        let f = fixture_with(policy, Some(Utc::now() - Duration::hours(1))).await;
        let before = graded(&f).await;

        assert!(matches!(
            f.service.reopen(&teacher(), reopen_input(&f, true)).await,
            Err(AppError::InvalidState(_))
        ));

        let unchanged = f
            .submissions
            .get_submission(&teacher(), &f.submission.id)
            .await
            .expect("lookup");
        assert_eq!(unchanged.status, SubmissionStatus::Graded);
        assert_eq!(unchanged.version, before.version);
        assert_eq!(unchanged.score(), Some(5.0));
    }
}
