use std::sync::Arc;

use crate::{
    auth::{AccessPolicy, JwtService},
    config::{Config, StorageBackend},
    db::Database,
    errors::AppResult,
    repositories::{
        AssignmentRepository, InMemoryAssignmentRepository, InMemoryRosterRepository,
        InMemorySubmissionRepository, MongoAssignmentRepository, MongoRosterRepository,
        MongoSubmissionRepository, RosterRepository, SubmissionRepository,
    },
    services::{AssignmentService, GradingService, QuestionBankService, SubmissionService},
};

#[derive(Clone)]
pub struct AppState {
    pub assignment_service: Arc<AssignmentService>,
    pub question_bank_service: Arc<QuestionBankService>,
    pub submission_service: Arc<SubmissionService>,
    pub grading_service: Arc<GradingService>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
    /// Present for the Mongo backend; used by the health check.
    pub database: Option<Database>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        match config.storage_backend {
            StorageBackend::Mongo => {
                let db = Database::connect(&config).await?;

                let assignments = Arc::new(MongoAssignmentRepository::new(&db));
                assignments.ensure_indexes().await?;
                let submissions = Arc::new(MongoSubmissionRepository::new(&db));
                submissions.ensure_indexes().await?;
                let roster = Arc::new(MongoRosterRepository::new(&db));
                roster.ensure_indexes().await?;

                let mut state = Self::with_repositories(config, assignments, submissions, roster);
                state.database = Some(db);
                Ok(state)
            }
            StorageBackend::Memory => {
                log::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(config, Arc::new(InMemoryRosterRepository::new())))
            }
        }
    }

    pub fn with_repositories(
        config: Config,
        assignments: Arc<dyn AssignmentRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        roster: Arc<dyn RosterRepository>,
    ) -> Self {
        let policy = Arc::new(AccessPolicy::new(roster));
        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));

        Self {
            assignment_service: Arc::new(AssignmentService::new(
                assignments.clone(),
                submissions.clone(),
                policy.clone(),
            )),
            question_bank_service: Arc::new(QuestionBankService::new(
                assignments.clone(),
                policy.clone(),
            )),
            submission_service: Arc::new(SubmissionService::new(
                assignments.clone(),
                submissions.clone(),
                policy.clone(),
                config.submission_policy,
            )),
            grading_service: Arc::new(GradingService::new(
                assignments,
                submissions,
                policy,
                config.submission_policy,
            )),
            jwt_service,
            config: Arc::new(config),
            database: None,
        }
    }

    /// Fresh in-memory assignment and submission stores over the given roster.
    pub fn in_memory(config: Config, roster: Arc<InMemoryRosterRepository>) -> Self {
        Self::with_repositories(
            config,
            Arc::new(InMemoryAssignmentRepository::new()),
            Arc::new(InMemorySubmissionRepository::new()),
            roster,
        )
    }
}
