use std::env;

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

/// What happens to a submission that arrives after the assignment's due date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LateSubmissionPolicy {
    Reject,
    Accept,
    Penalize { percent: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubmissionPolicy {
    pub late_submissions: LateSubmissionPolicy,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            late_submissions: LateSubmissionPolicy::Accept,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: String,
    pub storage_backend: StorageBackend,
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub submission_policy: SubmissionPolicy,
}

const DEV_JWT_SECRET: &str = "dev_secret_key_change_in_production";
const DEFAULT_LATE_PENALTY_PERCENT: f64 = 10.0;

impl Config {
    pub fn from_env() -> Self {
        Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            storage_backend: parse_storage_backend(
                &env::var("STORAGE_BACKEND").unwrap_or_default(),
            ),
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "classwork-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            ),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24),
            submission_policy: SubmissionPolicy {
                late_submissions: parse_late_policy(
                    &env::var("LATE_SUBMISSION_POLICY").unwrap_or_default(),
                    env::var("LATE_PENALTY_PERCENT").ok().as_deref(),
                ),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Validate that production-critical configuration is set
    pub fn validate_for_production(&self) -> AppResult<()> {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEV_JWT_SECRET {
            return Err(AppError::InternalError(
                "JWT_SECRET is using the default value".to_string(),
            ));
        }

        if jwt_secret.len() < 32 {
            return Err(AppError::InternalError(format!(
                "JWT_SECRET is too short ({}), must be at least 32 characters",
                jwt_secret.len()
            )));
        }

        if self.storage_backend == StorageBackend::Memory {
            return Err(AppError::InternalError(
                "STORAGE_BACKEND=memory is not allowed in production".to_string(),
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            app_env: "test".to_string(),
            storage_backend: StorageBackend::Memory,
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "classwork-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            submission_policy: SubmissionPolicy::default(),
        }
    }
}

fn parse_storage_backend(value: &str) -> StorageBackend {
    match value.trim().to_lowercase().as_str() {
        "memory" | "in-memory" => StorageBackend::Memory,
        _ => StorageBackend::Mongo,
    }
}

fn parse_late_policy(value: &str, percent: Option<&str>) -> LateSubmissionPolicy {
    match value.trim().to_lowercase().as_str() {
        "reject" => LateSubmissionPolicy::Reject,
        "penalize" | "penalty" => {
            let percent = percent
                .and_then(|p| p.trim().parse::<f64>().ok())
                .filter(|p| p.is_finite())
                .unwrap_or(DEFAULT_LATE_PENALTY_PERCENT)
                .clamp(0.0, 100.0);
            LateSubmissionPolicy::Penalize { percent }
        }
        _ => LateSubmissionPolicy::Accept,
    }
}
