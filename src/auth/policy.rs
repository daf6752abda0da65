use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Actor, Assignment, AssignmentStatus, Classroom, Submission},
    repositories::RosterRepository,
};

/// How much of an assignment a reader may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadScope {
    /// Owning teacher or admin: everything, answer keys included.
    Full,
    /// Student or parent: answer keys only once the student has handed in.
    Learner,
}

/// Single place where role-based access decisions are made. Identity and
/// membership failures are `Forbidden`; lifecycle checks stay with the
/// aggregates and report `InvalidState`.
pub struct AccessPolicy {
    roster: Arc<dyn RosterRepository>,
}

impl AccessPolicy {
    pub fn new(roster: Arc<dyn RosterRepository>) -> Self {
        Self { roster }
    }

    async fn classroom(&self, classroom_id: &str) -> AppResult<Classroom> {
        self.roster
            .find_classroom(classroom_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Classroom '{}' not found", classroom_id)))
    }

    /// Teachers may author only in classrooms they own.
    pub async fn require_classroom_teacher(
        &self,
        actor: &Actor,
        classroom_id: &str,
    ) -> AppResult<()> {
        let Actor::Teacher(teacher_id) = actor else {
            return Err(AppError::Forbidden(
                "Only teachers can manage assignments".to_string(),
            ));
        };
        let classroom = self.classroom(classroom_id).await?;
        if !classroom.is_taught_by(teacher_id) {
            return Err(AppError::Forbidden(format!(
                "Classroom '{}' belongs to another teacher",
                classroom_id
            )));
        }
        Ok(())
    }

    /// Structural edits, publication and grading.
    pub async fn require_assignment_teacher(
        &self,
        actor: &Actor,
        assignment: &Assignment,
    ) -> AppResult<()> {
        self.require_classroom_teacher(actor, &assignment.classroom_id)
            .await
    }

    /// Unpublish is also open to administrators.
    pub async fn require_teacher_or_admin(
        &self,
        actor: &Actor,
        assignment: &Assignment,
    ) -> AppResult<()> {
        if matches!(actor, Actor::Admin(_)) {
            return Ok(());
        }
        self.require_assignment_teacher(actor, assignment).await
    }

    pub fn require_admin(&self, actor: &Actor) -> AppResult<()> {
        if !matches!(actor, Actor::Admin(_)) {
            return Err(AppError::Forbidden(
                "Only admins can perform this action".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the student id when the actor is a student enrolled in the
    /// assignment's classroom.
    pub async fn require_enrolled_student(
        &self,
        actor: &Actor,
        assignment: &Assignment,
    ) -> AppResult<String> {
        let Actor::Student(student_id) = actor else {
            return Err(AppError::Forbidden(
                "Only students can work on submissions".to_string(),
            ));
        };
        let classroom = self.classroom(&assignment.classroom_id).await?;
        if !classroom.is_enrolled(student_id) {
            return Err(AppError::Forbidden(format!(
                "Student is not enrolled in classroom '{}'",
                assignment.classroom_id
            )));
        }
        Ok(student_id.clone())
    }

    pub async fn require_submission_owner(
        &self,
        actor: &Actor,
        submission: &Submission,
        assignment: &Assignment,
    ) -> AppResult<()> {
        let student_id = self.require_enrolled_student(actor, assignment).await?;
        if submission.student_id != student_id {
            return Err(AppError::Forbidden(
                "Submission belongs to another student".to_string(),
            ));
        }
        Ok(())
    }

    /// Drafts are invisible to learners; they get `NotFound` rather than a
    /// hint that the assignment exists.
    pub async fn assignment_read_scope(
        &self,
        actor: &Actor,
        assignment: &Assignment,
    ) -> AppResult<ReadScope> {
        match actor {
            Actor::Admin(_) => Ok(ReadScope::Full),
            Actor::Teacher(_) => {
                self.require_assignment_teacher(actor, assignment).await?;
                Ok(ReadScope::Full)
            }
            Actor::Student(student_id) => {
                let classroom = self.classroom(&assignment.classroom_id).await?;
                if !classroom.is_enrolled(student_id) {
                    return Err(AppError::Forbidden(
                        "Assignment belongs to another classroom".to_string(),
                    ));
                }
                hide_drafts(assignment)?;
                Ok(ReadScope::Learner)
            }
            Actor::Parent(parent_id) => {
                let classroom = self.classroom(&assignment.classroom_id).await?;
                if !self.guards_any(parent_id, &classroom.student_ids).await? {
                    return Err(AppError::Forbidden(
                        "None of your children are enrolled in this classroom".to_string(),
                    ));
                }
                hide_drafts(assignment)?;
                Ok(ReadScope::Learner)
            }
        }
    }

    /// Same as `assignment_read_scope` but for a whole classroom listing.
    pub async fn classroom_read_scope(
        &self,
        actor: &Actor,
        classroom_id: &str,
    ) -> AppResult<ReadScope> {
        match actor {
            Actor::Admin(_) => Ok(ReadScope::Full),
            Actor::Teacher(_) => {
                self.require_classroom_teacher(actor, classroom_id).await?;
                Ok(ReadScope::Full)
            }
            Actor::Student(student_id) => {
                let classroom = self.classroom(classroom_id).await?;
                if !classroom.is_enrolled(student_id) {
                    return Err(AppError::Forbidden(
                        "Student is not enrolled in this classroom".to_string(),
                    ));
                }
                Ok(ReadScope::Learner)
            }
            Actor::Parent(parent_id) => {
                let classroom = self.classroom(classroom_id).await?;
                if !self.guards_any(parent_id, &classroom.student_ids).await? {
                    return Err(AppError::Forbidden(
                        "None of your children are enrolled in this classroom".to_string(),
                    ));
                }
                Ok(ReadScope::Learner)
            }
        }
    }

    /// Owner, grading teacher, admins, and guardians once the work has been
    /// handed in.
    pub async fn require_submission_reader(
        &self,
        actor: &Actor,
        submission: &Submission,
        assignment: &Assignment,
    ) -> AppResult<()> {
        match actor {
            Actor::Admin(_) => Ok(()),
            Actor::Teacher(_) => self.require_assignment_teacher(actor, assignment).await,
            Actor::Student(student_id) => {
                if &submission.student_id != student_id {
                    return Err(AppError::Forbidden(
                        "Submission belongs to another student".to_string(),
                    ));
                }
                Ok(())
            }
            Actor::Parent(parent_id) => {
                self.require_guardian(parent_id, &submission.student_id).await?;
                if !submission.status.is_handed_in() {
                    return Err(AppError::NotFound(format!(
                        "Submission '{}' not found",
                        submission.id
                    )));
                }
                Ok(())
            }
        }
    }

    /// Listing a student's submissions: the student, or one of their guardians.
    pub async fn require_student_or_guardian(
        &self,
        actor: &Actor,
        student_id: &str,
    ) -> AppResult<()> {
        match actor {
            Actor::Admin(_) => Ok(()),
            Actor::Student(id) if id == student_id => Ok(()),
            Actor::Parent(parent_id) => self.require_guardian(parent_id, student_id).await,
            _ => Err(AppError::Forbidden(
                "Only the student or their guardians can list these submissions".to_string(),
            )),
        }
    }

    async fn require_guardian(&self, parent_id: &str, student_id: &str) -> AppResult<()> {
        if !self.roster.is_guardian_of(parent_id, student_id).await? {
            return Err(AppError::Forbidden(
                "You are not a guardian of this student".to_string(),
            ));
        }
        Ok(())
    }

    async fn guards_any(&self, parent_id: &str, student_ids: &[String]) -> AppResult<bool> {
        for student_id in student_ids {
            if self.roster.is_guardian_of(parent_id, student_id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn hide_drafts(assignment: &Assignment) -> AppResult<()> {
    if assignment.status == AssignmentStatus::Draft {
        return Err(AppError::NotFound(format!(
            "Assignment '{}' not found",
            assignment.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{Submission, SubmissionStatus},
        repositories::roster_repository::MockRosterRepository,
    };

    fn classroom() -> Classroom {
        Classroom {
            id: "class-1".to_string(),
            teacher_id: "teacher-1".to_string(),
            student_ids: vec!["student-1".to_string()],
        }
    }

    fn policy_with(mut roster: MockRosterRepository) -> AccessPolicy {
        roster.expect_find_classroom().returning(|classroom_id| {
            if classroom_id == "class-1" {
                Ok(Some(classroom()))
            } else {
                Ok(None)
            }
        });
        AccessPolicy::new(Arc::new(roster))
    }

    fn assignment(status: AssignmentStatus) -> Assignment {
        let mut assignment =
            Assignment::new_draft("lesson-1", "class-1", "teacher-1", "Shapes", None, None);
        assignment.status = status;
        assignment
    }

    #[tokio::test]
    async fn owning_teacher_can_author() {
        let policy = policy_with(MockRosterRepository::new());
        let draft = assignment(AssignmentStatus::Draft);

        assert!(policy
            .require_assignment_teacher(&Actor::Teacher("teacher-1".into()), &draft)
            .await
            .is_ok());
        assert!(matches!(
            policy
                .require_assignment_teacher(&Actor::Teacher("teacher-2".into()), &draft)
                .await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            policy
                .require_assignment_teacher(&Actor::Student("student-1".into()), &draft)
                .await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn unknown_classroom_is_not_found() {
        let policy = policy_with(MockRosterRepository::new());
        assert!(matches!(
            policy
                .require_classroom_teacher(&Actor::Teacher("teacher-1".into()), "class-404")
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn students_never_see_drafts() {
        let policy = policy_with(MockRosterRepository::new());
        let student = Actor::Student("student-1".into());

        assert!(matches!(
            policy
                .assignment_read_scope(&student, &assignment(AssignmentStatus::Draft))
                .await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(
            policy
                .assignment_read_scope(&student, &assignment(AssignmentStatus::Published))
                .await
                .expect("visible"),
            ReadScope::Learner
        );
        assert!(matches!(
            policy
                .assignment_read_scope(
                    &Actor::Student("stranger".into()),
                    &assignment(AssignmentStatus::Published)
                )
                .await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn students_mutate_only_their_own_submission() {
        let policy = policy_with(MockRosterRepository::new());
        let published = assignment(AssignmentStatus::Published);
        let own = Submission::start(&published.id, "student-1");
        let other = Submission::start(&published.id, "student-2");
        let student = Actor::Student("student-1".into());

        assert!(policy
            .require_submission_owner(&student, &own, &published)
            .await
            .is_ok());
        assert!(matches!(
            policy
                .require_submission_owner(&student, &other, &published)
                .await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn parents_read_only_handed_in_work_of_their_children() {
        let mut roster = MockRosterRepository::new();
        roster
            .expect_is_guardian_of()
            .returning(|parent, student| Ok(parent == "parent-1" && student == "student-1"));
        let policy = policy_with(roster);

        let published = assignment(AssignmentStatus::Published);
        let mut submission = Submission::start(&published.id, "student-1");
        let parent = Actor::Parent("parent-1".into());

        assert!(matches!(
            policy
                .require_submission_reader(&parent, &submission, &published)
                .await,
            Err(AppError::NotFound(_))
        ));

        submission.status = SubmissionStatus::Submitted;
        assert!(policy
            .require_submission_reader(&parent, &submission, &published)
            .await
            .is_ok());

        let stranger = Actor::Parent("parent-2".into());
        assert!(matches!(
            policy
                .require_submission_reader(&stranger, &submission, &published)
                .await,
            Err(AppError::Forbidden(_))
        ));

        assert!(matches!(
            policy
                .assignment_read_scope(&parent, &assignment(AssignmentStatus::Draft))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn admins_may_unpublish_but_not_author() {
        let policy = policy_with(MockRosterRepository::new());
        let published = assignment(AssignmentStatus::Published);
        let admin = Actor::Admin("admin-1".into());

        assert!(policy.require_teacher_or_admin(&admin, &published).await.is_ok());
        assert!(policy.require_admin(&admin).is_ok());
        assert!(policy
            .require_admin(&Actor::Teacher("teacher-1".into()))
            .is_err());
        assert!(matches!(
            policy.require_assignment_teacher(&admin, &published).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
