use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{is_duplicate_key, Database},
    errors::{AppError, AppResult},
    models::domain::{Submission, SubmissionStatus},
};

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the student already has a
    /// submission for the assignment.
    async fn create(&self, submission: Submission) -> AppResult<Submission>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>>;
    async fn find_by_assignment_and_student(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> AppResult<Option<Submission>>;
    async fn list_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>>;
    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Submission>>;
    async fn count_by_assignment_and_status(
        &self,
        assignment_id: &str,
        statuses: &[SubmissionStatus],
    ) -> AppResult<usize>;
    /// Compare-and-swap on `submission.version`, same contract as
    /// `AssignmentRepository::update`.
    async fn update(&self, submission: Submission) -> AppResult<Submission>;
    async fn delete_by_assignment(&self, assignment_id: &str) -> AppResult<u64>;
}

pub struct MongoSubmissionRepository {
    collection: Collection<Submission>,
}

impl MongoSubmissionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("submissions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for submissions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let assignment_student_index = IndexModel::builder()
            .keys(doc! { "assignment_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("assignment_student_unique".to_string())
                    .build(),
            )
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("student_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(assignment_student_index).await?;
        self.collection.create_index(student_index).await?;

        log::info!("Successfully created indexes for submissions collection");
        Ok(())
    }
}

fn status_key(status: SubmissionStatus) -> &'static str {
    match status {
        SubmissionStatus::InProgress => "InProgress",
        SubmissionStatus::Submitted => "Submitted",
        SubmissionStatus::Graded => "Graded",
    }
}

#[async_trait]
impl SubmissionRepository for MongoSubmissionRepository {
    async fn create(&self, submission: Submission) -> AppResult<Submission> {
        match self.collection.insert_one(&submission).await {
            Ok(_) => Ok(submission),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "Submission for assignment '{}' and student '{}' already exists",
                submission.assignment_id, submission.student_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>> {
        let submission = self.collection.find_one(doc! { "id": id }).await?;
        Ok(submission)
    }

    async fn find_by_assignment_and_student(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> AppResult<Option<Submission>> {
        let submission = self
            .collection
            .find_one(doc! {
                "assignment_id": assignment_id,
                "student_id": student_id
            })
            .await?;
        Ok(submission)
    }

    async fn list_by_assignment(&self, assignment_id: &str) -> AppResult<Vec<Submission>> {
        let submissions = self
            .collection
            .find(doc! { "assignment_id": assignment_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(submissions)
    }

    async fn list_by_student(&self, student_id: &str) -> AppResult<Vec<Submission>> {
        let submissions = self
            .collection
            .find(doc! { "student_id": student_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(submissions)
    }

    async fn count_by_assignment_and_status(
        &self,
        assignment_id: &str,
        statuses: &[SubmissionStatus],
    ) -> AppResult<usize> {
        let statuses: Vec<Bson> = statuses
            .iter()
            .map(|s| Bson::String(status_key(*s).to_string()))
            .collect();

        let count = self
            .collection
            .count_documents(doc! {
                "assignment_id": assignment_id,
                "status": { "$in": statuses }
            })
            .await?;
        Ok(count as usize)
    }

    async fn update(&self, mut submission: Submission) -> AppResult<Submission> {
        let expected = submission.version;
        submission.version = expected + 1;

        let result = self
            .collection
            .replace_one(doc! { "id": &submission.id, "version": expected }, &submission)
            .await?;

        if result.matched_count == 0 {
            let exists = self
                .collection
                .count_documents(doc! { "id": &submission.id })
                .await?
                > 0;
            return Err(if exists {
                AppError::Conflict(format!(
                    "Submission '{}' changed since version {}",
                    submission.id, expected
                ))
            } else {
                AppError::NotFound(format!("Submission '{}' not found", submission.id))
            });
        }

        Ok(submission)
    }

    async fn delete_by_assignment(&self, assignment_id: &str) -> AppResult<u64> {
        let result = self
            .collection
            .delete_many(doc! { "assignment_id": assignment_id })
            .await?;
        Ok(result.deleted_count)
    }
}
