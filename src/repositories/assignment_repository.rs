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
    models::domain::{Assignment, AssignmentStatus},
};

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn create(&self, assignment: Assignment) -> AppResult<Assignment>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Assignment>>;
    /// One page of a classroom's assignments in the given states, oldest
    /// first, plus the total count across all pages.
    async fn list_by_classroom(
        &self,
        classroom_id: &str,
        statuses: &[AssignmentStatus],
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Assignment>, i64)>;
    async fn list_by_status(&self, status: AssignmentStatus) -> AppResult<Vec<Assignment>>;
    /// Compare-and-swap on `assignment.version`; the stored copy gets the
    /// next version. A stale version fails with `Conflict`.
    async fn update(&self, assignment: Assignment) -> AppResult<Assignment>;
    async fn delete(&self, id: &str) -> AppResult<()>;
}

pub struct MongoAssignmentRepository {
    collection: Collection<Assignment>,
}

impl MongoAssignmentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("assignments");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for assignments collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let classroom_index = IndexModel::builder()
            .keys(doc! { "classroom_id": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("classroom_created".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(IndexOptions::builder().name("status".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(classroom_index).await?;
        self.collection.create_index(status_index).await?;

        log::info!("Successfully created indexes for assignments collection");
        Ok(())
    }
}

fn status_key(status: AssignmentStatus) -> &'static str {
    match status {
        AssignmentStatus::Draft => "Draft",
        AssignmentStatus::Published => "Published",
        AssignmentStatus::Closed => "Closed",
    }
}

#[async_trait]
impl AssignmentRepository for MongoAssignmentRepository {
    async fn create(&self, assignment: Assignment) -> AppResult<Assignment> {
        match self.collection.insert_one(&assignment).await {
            Ok(_) => Ok(assignment),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "Assignment with id '{}' already exists",
                assignment.id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Assignment>> {
        let assignment = self.collection.find_one(doc! { "id": id }).await?;
        Ok(assignment)
    }

    async fn list_by_classroom(
        &self,
        classroom_id: &str,
        statuses: &[AssignmentStatus],
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Assignment>, i64)> {
        let statuses: Vec<Bson> = statuses
            .iter()
            .map(|s| Bson::String(status_key(*s).to_string()))
            .collect();
        let filter = doc! {
            "classroom_id": classroom_id,
            "status": { "$in": statuses }
        };

        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let items: Vec<Assignment> = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": 1 })
            .skip(offset.max(0) as u64)
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        Ok((items, total))
    }

    async fn list_by_status(&self, status: AssignmentStatus) -> AppResult<Vec<Assignment>> {
        let items = self
            .collection
            .find(doc! { "status": status_key(status) })
            .await?
            .try_collect()
            .await?;
        Ok(items)
    }

    async fn update(&self, mut assignment: Assignment) -> AppResult<Assignment> {
        let expected = assignment.version;
        assignment.version = expected + 1;

        let result = self
            .collection
            .replace_one(doc! { "id": &assignment.id, "version": expected }, &assignment)
            .await?;

        if result.matched_count == 0 {
            let exists = self
                .collection
                .count_documents(doc! { "id": &assignment.id })
                .await?
                > 0;
            return Err(if exists {
                AppError::Conflict(format!(
                    "Assignment '{}' changed since version {}",
                    assignment.id, expected
                ))
            } else {
                AppError::NotFound(format!("Assignment '{}' not found", assignment.id))
            });
        }

        Ok(assignment)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound(format!("Assignment '{}' not found", id)));
        }
        Ok(())
    }
}
