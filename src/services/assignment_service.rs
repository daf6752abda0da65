use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    auth::{AccessPolicy, ReadScope},
    errors::{AppError, AppResult},
    models::{
        domain::{Actor, Assignment, AssignmentStatus, SubmissionStatus},
        dto::{
            request::{CreateAssignmentInput, UpdateAssignmentInput},
            response::{AssignmentView, PaginatedAssignments, PaginationMetadata},
        },
    },
    repositories::{AssignmentRepository, SubmissionRepository},
    services::optimistic::update_assignment,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub struct AssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    policy: Arc<AccessPolicy>,
}

impl AssignmentService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        policy: Arc<AccessPolicy>,
    ) -> Self {
        Self {
            assignments,
            submissions,
            policy,
        }
    }

    async fn load(&self, id: &str) -> AppResult<Assignment> {
        self.assignments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment with id '{}' not found", id)))
    }

    pub async fn create_assignment(
        &self,
        actor: &Actor,
        input: CreateAssignmentInput,
    ) -> AppResult<Assignment> {
        input.validate()?;
        self.policy
            .require_classroom_teacher(actor, &input.classroom_id)
            .await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::ValidationError(
                "Assignment title cannot be blank".to_string(),
            ));
        }

        let assignment = Assignment::new_draft(
            &input.lesson_id,
            &input.classroom_id,
            actor.id(),
            title,
            input.instructions,
            input.due_at,
        );
        let created = self.assignments.create(assignment).await?;

        log::info!(
            "Teacher '{}' created assignment '{}' in classroom '{}'",
            actor.id(),
            created.id,
            created.classroom_id
        );
        Ok(created)
    }

    pub async fn update_assignment(
        &self,
        actor: &Actor,
        id: &str,
        input: UpdateAssignmentInput,
    ) -> AppResult<Assignment> {
        input.validate()?;
        let assignment = self.load(id).await?;
        self.policy
            .require_assignment_teacher(actor, &assignment)
            .await?;

        update_assignment(self.assignments.as_ref(), assignment, None, |a| {
            a.ensure_draft()?;
            if let Some(title) = &input.title {
                let title = title.trim();
                if title.is_empty() {
                    return Err(AppError::ValidationError(
                        "Assignment title cannot be blank".to_string(),
                    ));
                }
                a.title = title.to_string();
            }
            if let Some(instructions) = &input.instructions {
                a.instructions = Some(instructions.clone());
            }
            if input.clear_due_at {
                a.due_at = None;
            } else if let Some(due_at) = input.due_at {
                a.due_at = Some(due_at);
            }
            Ok(())
        })
        .await
    }

    /// Drafts only. Removes the embedded questions with the document, then
    /// any submissions left over from an earlier publication.
    pub async fn delete_assignment(&self, actor: &Actor, id: &str) -> AppResult<()> {
        let assignment = self.load(id).await?;
        self.policy
            .require_assignment_teacher(actor, &assignment)
            .await?;
        assignment.ensure_draft()?;

        let removed = self.submissions.delete_by_assignment(id).await?;
        self.assignments.delete(id).await?;

        log::info!(
            "Deleted assignment '{}' with {} question(s) and {} submission(s)",
            id,
            assignment.questions.len(),
            removed
        );
        Ok(())
    }

    pub async fn publish(
        &self,
        actor: &Actor,
        id: &str,
        expected_version: Option<i64>,
    ) -> AppResult<Assignment> {
        let assignment = self.load(id).await?;
        self.policy
            .require_assignment_teacher(actor, &assignment)
            .await?;

        let published =
            update_assignment(self.assignments.as_ref(), assignment, expected_version, |a| {
                a.publish()
            })
            .await?;

        log::info!(
            "Assignment '{}' published with {} question(s), max score {}",
            published.id,
            published.questions.len(),
            published.max_score
        );
        Ok(published)
    }

    /// Published -> Draft while nobody has handed anything in yet.
    pub async fn unpublish(&self, actor: &Actor, id: &str) -> AppResult<Assignment> {
        let assignment = self.load(id).await?;
        self.policy
            .require_teacher_or_admin(actor, &assignment)
            .await?;

        // The count and the status write are separate steps; a submit racing
        // between them can still land on the returned draft.
        let handed_in = self
            .submissions
            .count_by_assignment_and_status(
                id,
                &[SubmissionStatus::Submitted, SubmissionStatus::Graded],
            )
            .await?;
        if handed_in > 0 {
            return Err(AppError::InvalidState(format!(
                "Assignment '{}' already has {} handed-in submission(s)",
                id, handed_in
            )));
        }

        let draft = update_assignment(self.assignments.as_ref(), assignment, None, |a| {
            a.unpublish()
        })
        .await?;

        log::info!("Assignment '{}' unpublished by '{}'", id, actor.id());
        Ok(draft)
    }

    pub async fn close(&self, actor: &Actor, id: &str) -> AppResult<Assignment> {
        let assignment = self.load(id).await?;
        self.policy
            .require_assignment_teacher(actor, &assignment)
            .await?;

        let closed =
            update_assignment(self.assignments.as_ref(), assignment, None, |a| a.close()).await?;

        log::info!("Assignment '{}' closed by '{}'", id, actor.id());
        Ok(closed)
    }

    /// Scheduler entry point: closes every published assignment whose due
    /// date is at or before `now`. Returns the ids that were closed.
    pub async fn close_due(&self, actor: &Actor, now: DateTime<Utc>) -> AppResult<Vec<String>> {
        self.policy.require_admin(actor)?;

        let candidates = self
            .assignments
            .list_by_status(AssignmentStatus::Published)
            .await?;

        let mut closed = Vec::new();
        for assignment in candidates {
            if !assignment.due_at.map(|due| due <= now).unwrap_or(false) {
                continue;
            }
            let id = assignment.id.clone();
            match update_assignment(self.assignments.as_ref(), assignment, None, |a| a.close())
                .await
            {
                Ok(_) => closed.push(id),
                // closed or unpublished in the meantime
                Err(AppError::InvalidState(msg)) => {
                    log::debug!("Skipping assignment '{}': {}", id, msg)
                }
                Err(AppError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        log::info!("Closed {} overdue assignment(s)", closed.len());
        Ok(closed)
    }

    pub async fn get_assignment(&self, actor: &Actor, id: &str) -> AppResult<AssignmentView> {
        let assignment = self.load(id).await?;
        let scope = self.policy.assignment_read_scope(actor, &assignment).await?;
        let reveal = self.reveals_answers(actor, &assignment.id, scope).await?;
        Ok(AssignmentView::new(assignment, scope, reveal))
    }

    pub async fn list_for_classroom(
        &self,
        actor: &Actor,
        classroom_id: &str,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> AppResult<PaginatedAssignments> {
        let scope = self.policy.classroom_read_scope(actor, classroom_id).await?;
        let offset = offset.unwrap_or(0).max(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let statuses: &[AssignmentStatus] = match scope {
            ReadScope::Full => &[
                AssignmentStatus::Draft,
                AssignmentStatus::Published,
                AssignmentStatus::Closed,
            ],
            ReadScope::Learner => &[AssignmentStatus::Published, AssignmentStatus::Closed],
        };

        let (items, total) = self
            .assignments
            .list_by_classroom(classroom_id, statuses, offset, limit)
            .await?;

        let mut data = Vec::with_capacity(items.len());
        for assignment in items {
            let reveal = self.reveals_answers(actor, &assignment.id, scope).await?;
            data.push(AssignmentView::new(assignment, scope, reveal));
        }

        Ok(PaginatedAssignments {
            data,
            pagination: PaginationMetadata {
                offset,
                limit,
                total,
            },
        })
    }

    /// Students see answer keys once their own work is handed in.
    async fn reveals_answers(
        &self,
        actor: &Actor,
        assignment_id: &str,
        scope: ReadScope,
    ) -> AppResult<bool> {
        match (scope, actor) {
            (ReadScope::Full, _) => Ok(true),
            (ReadScope::Learner, Actor::Student(student_id)) => Ok(self
                .submissions
                .find_by_assignment_and_student(assignment_id, student_id)
                .await?
                .map(|s| s.status.is_handed_in())
                .unwrap_or(false)),
            (ReadScope::Learner, _) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::question::fixtures::essay,
        models::domain::{Question, Submission},
        repositories::{InMemoryAssignmentRepository, InMemorySubmissionRepository},
        test_utils::seeded_roster,
    };
    use async_trait::async_trait;
    use chrono::Duration;

    struct Fixture {
        service: AssignmentService,
        submissions: Arc<InMemorySubmissionRepository>,
    }

    fn teacher() -> Actor {
        Actor::Teacher("teacher-1".to_string())
    }

    fn admin() -> Actor {
        Actor::Admin("admin-1".to_string())
    }

    async fn fixture() -> Fixture {
        let roster = seeded_roster().await;
        let submissions = Arc::new(InMemorySubmissionRepository::new());
        let service = AssignmentService::new(
            Arc::new(InMemoryAssignmentRepository::new()),
            submissions.clone(),
            Arc::new(AccessPolicy::new(roster)),
        );
        Fixture {
            service,
            submissions,
        }
    }

    fn create_input(due_at: Option<DateTime<Utc>>) -> CreateAssignmentInput {
        CreateAssignmentInput {
            lesson_id: "lesson-1".to_string(),
            classroom_id: "class-1".to_string(),
            title: "  Weather words ".to_string(),
            instructions: None,
            due_at,
        }
    }

    async fn published(f: &Fixture, due_at: Option<DateTime<Utc>>) -> Assignment {
        let created = f
            .service
            .create_assignment(&teacher(), create_input(due_at))
            .await
            .expect("create");
        let with_question =
            update_assignment(f.service.assignments.as_ref(), created, None, |a| {
                a.insert_question(
                    Question::from_draft("q1", essay(2.0), 0).expect("valid"),
                    None,
                )
            })
            .await
            .expect("add question");
        f.service
            .publish(&teacher(), &with_question.id, None)
            .await
            .expect("publish")
    }

    #[tokio::test]
    async fn create_requires_the_classroom_teacher() {
        let f = fixture().await;
        let created = f
            .service
            .create_assignment(&teacher(), create_input(None))
            .await
            .expect("create");
        assert_eq!(created.title, "Weather words");
        assert_eq!(created.status, AssignmentStatus::Draft);
        assert_eq!(created.created_by_user_id, "teacher-1");

        let result = f
            .service
            .create_assignment(&Actor::Student("student-1".to_string()), create_input(None))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn publish_without_questions_is_invalid() {
        let f = fixture().await;
        let created = f
            .service
            .create_assignment(&teacher(), create_input(None))
            .await
            .expect("create");

        let result = f.service.publish(&teacher(), &created.id, None).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let f = fixture().await;
        let created = f
            .service
            .create_assignment(&teacher(), create_input(None))
            .await
            .expect("create");
        let updated = f
            .service
            .update_assignment(
                &teacher(),
                &created.id,
                UpdateAssignmentInput {
                    instructions: Some("Match the pictures".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.version, created.version + 1);

        let result = f
            .service
            .publish(&teacher(), &created.id, Some(created.version))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn updates_apply_to_drafts_only() {
        let f = fixture().await;
        let due = Utc::now() + Duration::days(3);
        let created = f
            .service
            .create_assignment(&teacher(), create_input(Some(due)))
            .await
            .expect("create");

        let blank = f
            .service
            .update_assignment(
                &teacher(),
                &created.id,
                UpdateAssignmentInput {
                    title: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blank, Err(AppError::ValidationError(_))));

        let updated = f
            .service
            .update_assignment(
                &teacher(),
                &created.id,
                UpdateAssignmentInput {
                    title: Some(" Rain and snow ".to_string()),
                    clear_due_at: true,
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.title, "Rain and snow");
        assert_eq!(updated.due_at, None);

        let assignment = published(&f, None).await;
        let frozen = f
            .service
            .update_assignment(
                &teacher(),
                &assignment.id,
                UpdateAssignmentInput {
                    title: Some("Too late".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(frozen, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn unpublish_is_blocked_by_handed_in_work() {
        let f = fixture().await;
        let assignment = published(&f, None).await;

        let mut submission = Submission::start(&assignment.id, "student-1");
        submission.status = SubmissionStatus::Submitted;
        f.submissions.create(submission).await.expect("seed");

        let result = f.service.unpublish(&admin(), &assignment.id).await;
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn admins_can_unpublish_untouched_assignments() {
        let f = fixture().await;
        let assignment = published(&f, None).await;

        let draft = f
            .service
            .unpublish(&admin(), &assignment.id)
            .await
            .expect("unpublish");
        assert_eq!(draft.status, AssignmentStatus::Draft);
    }

    #[tokio::test]
    async fn close_due_only_touches_overdue_published_assignments() {
        let f = fixture().await;
        let now = Utc::now();
        let overdue = published(&f, Some(now - Duration::hours(1))).await;
        let upcoming = published(&f, Some(now + Duration::days(1))).await;
        let undated = published(&f, None).await;

        assert!(matches!(
            f.service.close_due(&teacher(), now).await,
            Err(AppError::Forbidden(_))
        ));

        let closed = f.service.close_due(&admin(), now).await.expect("close due");
        assert_eq!(closed, vec![overdue.id.clone()]);

        for (id, status) in [
            (&overdue.id, AssignmentStatus::Closed),
            (&upcoming.id, AssignmentStatus::Published),
            (&undated.id, AssignmentStatus::Published),
        ] {
            let view = f.service.get_assignment(&admin(), id).await.expect("read");
            assert_eq!(view.status, status);
        }
    }

    #[tokio::test]
    async fn learners_list_without_drafts_or_keys() {
        let f = fixture().await;
        published(&f, None).await;
        f.service
            .create_assignment(&teacher(), create_input(None))
            .await
            .expect("draft");

        let student = Actor::Student("student-1".to_string());
        let page = f
            .service
            .list_for_classroom(&student, "class-1", None, None)
            .await
            .expect("list");
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].status, AssignmentStatus::Published);

        let full = f
            .service
            .list_for_classroom(&teacher(), "class-1", None, Some(1))
            .await
            .expect("list");
        assert_eq!(full.pagination.total, 2);
        assert_eq!(full.data.len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_submissions() {
        let f = fixture().await;
        let assignment = published(&f, None).await;
        f.submissions
            .create(Submission::start(&assignment.id, "student-1"))
            .await
            .expect("seed");

        assert!(matches!(
            f.service.delete_assignment(&teacher(), &assignment.id).await,
            Err(AppError::InvalidState(_))
        ));

        f.service
            .unpublish(&teacher(), &assignment.id)
            .await
            .expect("unpublish");
        f.service
            .delete_assignment(&teacher(), &assignment.id)
            .await
            .expect("delete");

        assert!(f
            .submissions
            .list_by_assignment(&assignment.id)
            .await
            .expect("list")
            .is_empty());
        assert!(matches!(
            f.service.get_assignment(&teacher(), &assignment.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    /// Delegates to the in-memory store but cannot delete.
    struct UndeletableSubmissions(InMemorySubmissionRepository);

    #[async_trait]
    impl SubmissionRepository for UndeletableSubmissions {
        async fn create(&self, submission: Submission) -> AppResult<Submission> {
            self.0.create(submission).await
        }
        async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_assignment_and_student(
            &self,
            assignment_id: &str,
            student_id: &str,
        ) -> AppResult<Option<Submission>> {
            self.0
                .find_by_assignment_and_student(assignment_id, student_id)
                .await
        }
        async fn list_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>> {
            self.0.list_by_assignment(assignment_id).await
        }
        async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Submission>> {
            self.0.list_by_student(student_id).await
        }
        async fn count_by_assignment_and_status(
            &self,
            assignment_id: &str,
            statuses: &[SubmissionStatus],
        ) -> AppResult<usize> {
            self.0
                .count_by_assignment_and_status(assignment_id, statuses)
                .await
        }
        async fn update(&self, submission: Submission) -> AppResult<Submission> {
            self.0.update(submission).await
        }
        async fn delete_by_assignment(&self, _assignment_id: &str) -> AppResult<u64> {
            Err(AppError::DatabaseError("submissions unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_submission_cleanup_keeps_the_assignment() {
        let roster = seeded_roster().await;
        let service = AssignmentService::new(
            Arc::new(InMemoryAssignmentRepository::new()),
            Arc::new(UndeletableSubmissions(InMemorySubmissionRepository::new())),
            Arc::new(AccessPolicy::new(roster)),
        );
        let assignment = service
            .create_assignment(&teacher(), create_input(None))
            .await
            .expect("create");

        assert!(matches!(
            service.delete_assignment(&teacher(), &assignment.id).await,
            Err(AppError::DatabaseError(_))
        ));
        let kept = service
            .get_assignment(&teacher(), &assignment.id)
            .await
            .expect("still stored");
        assert_eq!(kept.id, assignment.id);
    }
}
