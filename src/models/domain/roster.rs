use serde::{Deserialize, Serialize};

/// A classroom as seen by the engine: who teaches it and who is enrolled.
/// Maintained by the surrounding platform.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Classroom {
    pub id: String,
    pub teacher_id: String,
    #[serde(default)]
    pub student_ids: Vec<String>,
}

impl Classroom {
    pub fn is_taught_by(&self, teacher_id: &str) -> bool {
        self.teacher_id == teacher_id
    }

    pub fn is_enrolled(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|id| id == student_id)
    }
}

/// Links a parent account to a student account.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Guardianship {
    pub parent_id: String,
    pub student_id: String,
}
