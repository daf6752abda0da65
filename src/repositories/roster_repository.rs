use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{Classroom, Guardianship},
};

/// Read-only view of classroom ownership, enrollment and guardianship.
/// The records themselves are maintained outside the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn find_classroom(&self, classroom_id: &str) -> AppResult<Option<Classroom>>;
    async fn is_guardian_of(&self, parent_id: &str, student_id: &str) -> AppResult<bool>;
}

pub struct MongoRosterRepository {
    classrooms: Collection<Classroom>,
    guardianships: Collection<Guardianship>,
}

impl MongoRosterRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            classrooms: db.get_collection("classrooms"),
            guardianships: db.get_collection("guardianships"),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for roster collections");

        let classroom_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let guardianship_index = IndexModel::builder()
            .keys(doc! { "parent_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("parent_student_unique".to_string())
                    .build(),
            )
            .build();

        self.classrooms.create_index(classroom_index).await?;
        self.guardianships.create_index(guardianship_index).await?;

        log::info!("Successfully created indexes for roster collections");
        Ok(())
    }
}

#[async_trait]
impl RosterRepository for MongoRosterRepository {
    async fn find_classroom(&self, classroom_id: &str) -> AppResult<Option<Classroom>> {
        let classroom = self.classrooms.find_one(doc! { "id": classroom_id }).await?;
        Ok(classroom)
    }

    async fn is_guardian_of(&self, parent_id: &str, student_id: &str) -> AppResult<bool> {
        let link = self
            .guardianships
            .find_one(doc! { "parent_id": parent_id, "student_id": student_id })
            .await?;
        Ok(link.is_some())
    }
}
