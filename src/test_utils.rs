use std::sync::Arc;

use crate::{
    app_state::AppState,
    config::Config,
    models::domain::Classroom,
    repositories::InMemoryRosterRepository,
};

/// Roster used across unit tests: `class-1` taught by `teacher-1` with
/// `student-1` and `student-2`; `parent-1` is the guardian of `student-1`.
pub async fn seeded_roster() -> Arc<InMemoryRosterRepository> {
    let roster = Arc::new(InMemoryRosterRepository::new());
    roster
        .put_classroom(Classroom {
            id: "class-1".to_string(),
            teacher_id: "teacher-1".to_string(),
            student_ids: vec!["student-1".to_string(), "student-2".to_string()],
        })
        .await;
    roster.link_guardian("parent-1", "student-1").await;
    roster
}

/// In-memory application state over [`seeded_roster`].
pub async fn memory_state() -> (AppState, Arc<InMemoryRosterRepository>) {
    let roster = seeded_roster().await;
    let state = AppState::in_memory(Config::test_config(), roster.clone());
    (state, roster)
}
