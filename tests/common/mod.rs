#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use classwork_server::{
    app_state::AppState,
    config::{Config, StorageBackend, SubmissionPolicy},
    models::{
        domain::{Actor, Assignment, Classroom, QuestionType},
        dto::request::{CreateAssignmentInput, CreateQuestionInput, QuestionOptionInput},
    },
    repositories::InMemoryRosterRepository,
};

pub fn config(submission_policy: SubmissionPolicy) -> Config {
    Config {
        app_env: "test".to_string(),
        storage_backend: StorageBackend::Memory,
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "classwork-integration".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 8080,
        jwt_secret: SecretString::from("integration_jwt_secret".to_string()),
        jwt_expiration_hours: 1,
        submission_policy,
    }
}

/// class-1 is taught by teacher-1 with student-1 and student-2 enrolled;
/// parent-1 is the guardian of student-1.
pub async fn roster() -> Arc<InMemoryRosterRepository> {
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

pub async fn state_with(policy: SubmissionPolicy) -> AppState {
    AppState::in_memory(config(policy), roster().await)
}

pub async fn state() -> AppState {
    state_with(SubmissionPolicy::default()).await
}

pub fn teacher() -> Actor {
    Actor::Teacher("teacher-1".to_string())
}

pub fn student() -> Actor {
    Actor::Student("student-1".to_string())
}

pub async fn draft(state: &AppState, due_at: Option<DateTime<Utc>>) -> Assignment {
    state
        .assignment_service
        .create_assignment(
            &teacher(),
            CreateAssignmentInput {
                lesson_id: "lesson-1".to_string(),
                classroom_id: "class-1".to_string(),
                title: "Fractions".to_string(),
                instructions: Some("Show your work".to_string()),
                due_at,
            },
        )
        .await
        .expect("create assignment")
}

pub fn multiple_choice(points: f64, options: &[&str], correct: usize) -> CreateQuestionInput {
    CreateQuestionInput {
        question_type: QuestionType::MultipleChoice,
        prompt: "Pick one".to_string(),
        image_url: None,
        options: options
            .iter()
            .enumerate()
            .map(|(i, text)| QuestionOptionInput {
                text: text.to_string(),
                correct: i == correct,
            })
            .collect(),
        points,
        correct_answer: None,
        position: None,
    }
}

pub fn essay(points: f64) -> CreateQuestionInput {
    CreateQuestionInput {
        question_type: QuestionType::Essay,
        prompt: "Explain your reasoning".to_string(),
        image_url: None,
        options: vec![],
        points,
        correct_answer: None,
        position: None,
    }
}

/// Published assignment with a 2 point multiple choice question (second
/// option correct) followed by a 3 point essay.
pub async fn published_assignment(state: &AppState, due_at: Option<DateTime<Utc>>) -> Assignment {
    let assignment = draft(state, due_at).await;
    state
        .question_bank_service
        .create_question(&teacher(), &assignment.id, multiple_choice(2.0, &["1/3", "1/2"], 1))
        .await
        .expect("multiple choice");
    state
        .question_bank_service
        .create_question(&teacher(), &assignment.id, essay(3.0))
        .await
        .expect("essay");
    state
        .assignment_service
        .publish(&teacher(), &assignment.id, None)
        .await
        .expect("publish")
}
