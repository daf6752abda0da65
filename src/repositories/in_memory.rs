//! Process-local repositories backing `STORAGE_BACKEND=memory` and the test
//! suites. Each write takes the collection's write lock, so compare-and-swap
//! checks are atomic.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        Assignment, AssignmentStatus, Classroom, Guardianship, Submission, SubmissionStatus,
    },
    repositories::{AssignmentRepository, RosterRepository, SubmissionRepository},
};

fn page<T: Clone>(items: &[T], offset: i64, limit: i64) -> Vec<T> {
    let start = offset.max(0) as usize;
    let end = (start + limit.max(0) as usize).min(items.len());
    if start >= items.len() {
        vec![]
    } else {
        items[start..end].to_vec()
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    assignments: Arc<RwLock<HashMap<String, Assignment>>>,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn create(&self, assignment: Assignment) -> AppResult<Assignment> {
        let mut assignments = self.assignments.write().await;
        if assignments.contains_key(&assignment.id) {
            return Err(AppError::AlreadyExists(format!(
                "Assignment with id '{}' already exists",
                assignment.id
            )));
        }
        assignments.insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Assignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments.get(id).cloned())
    }

    async fn list_by_classroom(
        &self,
        classroom_id: &str,
        statuses: &[AssignmentStatus],
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Assignment>, i64)> {
        let assignments = self.assignments.read().await;
        let mut items: Vec<_> = assignments
            .values()
            .filter(|a| a.classroom_id == classroom_id && statuses.contains(&a.status))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = items.len() as i64;
        Ok((page(&items, offset, limit), total))
    }

    async fn list_by_status(&self, status: AssignmentStatus) -> AppResult<Vec<Assignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    async fn update(&self, mut assignment: Assignment) -> AppResult<Assignment> {
        let mut assignments = self.assignments.write().await;
        let stored = assignments.get(&assignment.id).ok_or_else(|| {
            AppError::NotFound(format!("Assignment '{}' not found", assignment.id))
        })?;

        if stored.version != assignment.version {
            return Err(AppError::Conflict(format!(
                "Assignment '{}' changed since version {}",
                assignment.id, assignment.version
            )));
        }

        assignment.version += 1;
        assignments.insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut assignments = self.assignments.write().await;
        if assignments.remove(id).is_none() {
            return Err(AppError::NotFound(format!("Assignment '{}' not found", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySubmissionRepository {
    submissions: Arc<RwLock<HashMap<String, Submission>>>,
}

impl InMemorySubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn create(&self, submission: Submission) -> AppResult<Submission> {
        let mut submissions = self.submissions.write().await;
        let duplicate = submissions.contains_key(&submission.id)
            || submissions.values().any(|s| {
                s.assignment_id == submission.assignment_id
                    && s.student_id == submission.student_id
            });
        if duplicate {
            return Err(AppError::AlreadyExists(format!(
                "Submission for assignment '{}' and student '{}' already exists",
                submission.assignment_id, submission.student_id
            )));
        }
        submissions.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions.get(id).cloned())
    }

    async fn find_by_assignment_and_student(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> AppResult<Option<Submission>> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .find(|s| s.assignment_id == assignment_id && s.student_id == student_id)
            .cloned())
    }

    async fn list_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        let mut items: Vec<_> = submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        let mut items: Vec<_> = submissions
            .values()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn count_by_assignment_and_status(
        &self,
        assignment_id: &str,
        statuses: &[SubmissionStatus],
    ) -> AppResult<usize> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id && statuses.contains(&s.status))
            .count())
    }

    async fn update(&self, mut submission: Submission) -> AppResult<Submission> {
        let mut submissions = self.submissions.write().await;
        let stored = submissions.get(&submission.id).ok_or_else(|| {
            AppError::NotFound(format!("Submission '{}' not found", submission.id))
        })?;

        if stored.version != submission.version {
            return Err(AppError::Conflict(format!(
                "Submission '{}' changed since version {}",
                submission.id, submission.version
            )));
        }

        submission.version += 1;
        submissions.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn delete_by_assignment(&self, assignment_id: &str) -> AppResult<u64> {
        let mut submissions = self.submissions.write().await;
        let before = submissions.len();
        submissions.retain(|_, s| s.assignment_id != assignment_id);
        Ok((before - submissions.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryRosterRepository {
    classrooms: Arc<RwLock<HashMap<String, Classroom>>>,
    guardianships: Arc<RwLock<Vec<Guardianship>>>,
}

impl InMemoryRosterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_classroom(&self, classroom: Classroom) {
        let mut classrooms = self.classrooms.write().await;
        classrooms.insert(classroom.id.clone(), classroom);
    }

    pub async fn link_guardian(&self, parent_id: &str, student_id: &str) {
        let mut guardianships = self.guardianships.write().await;
        let exists = guardianships
            .iter()
            .any(|g| g.parent_id == parent_id && g.student_id == student_id);
        if !exists {
            guardianships.push(Guardianship {
                parent_id: parent_id.to_string(),
                student_id: student_id.to_string(),
            });
        }
    }
}

#[async_trait]
impl RosterRepository for InMemoryRosterRepository {
    async fn find_classroom(&self, classroom_id: &str) -> AppResult<Option<Classroom>> {
        let classrooms = self.classrooms.read().await;
        Ok(classrooms.get(classroom_id).cloned())
    }

    async fn is_guardian_of(&self, parent_id: &str, student_id: &str) -> AppResult<bool> {
        let guardianships = self.guardianships.read().await;
        Ok(guardianships
            .iter()
            .any(|g| g.parent_id == parent_id && g.student_id == student_id))
    }
}
