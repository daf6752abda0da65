//! Read-modify-write loops over the versioned aggregates. A write that loses
//! the compare-and-swap reloads the aggregate and re-applies the mutation, so
//! lifecycle guards inside `apply` always run against fresh state.

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Assignment, Submission},
    repositories::{AssignmentRepository, SubmissionRepository},
};

pub const MAX_WRITE_ATTEMPTS: usize = 5;

fn check_expected(kind: &str, id: &str, current: i64, expected: Option<i64>) -> AppResult<()> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict(format!(
            "{} '{}' is at version {}, caller expected {}",
            kind, id, current, expected
        ))),
        _ => Ok(()),
    }
}

/// Applies `apply` to `current` and persists it. With an `expected_version`
/// a lost race is reported as `Conflict` instead of being retried.
pub async fn update_assignment<F>(
    repository: &dyn AssignmentRepository,
    mut current: Assignment,
    expected_version: Option<i64>,
    mut apply: F,
) -> AppResult<Assignment>
where
    F: FnMut(&mut Assignment) -> AppResult<()> + Send,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        check_expected("Assignment", &current.id, current.version, expected_version)?;

        let mut next = current.clone();
        apply(&mut next)?;
        next.modified_at = Some(Utc::now());

        match repository.update(next).await {
            Ok(saved) => return Ok(saved),
            Err(AppError::Conflict(msg)) if expected_version.is_none() => {
                log::debug!(
                    "Assignment write lost a race (attempt {}/{}): {}",
                    attempt,
                    MAX_WRITE_ATTEMPTS,
                    msg
                );
                current = repository.find_by_id(&current.id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Assignment '{}' not found", current.id))
                })?;
            }
            Err(e) => return Err(e),
        }
    }

    log::warn!(
        "Giving up on assignment '{}' after {} conflicting writes",
        current.id,
        MAX_WRITE_ATTEMPTS
    );
    Err(AppError::Conflict(format!(
        "Assignment '{}' is being modified concurrently, try again",
        current.id
    )))
}

/// Submission counterpart of [`update_assignment`].
pub async fn update_submission<F>(
    repository: &dyn SubmissionRepository,
    mut current: Submission,
    expected_version: Option<i64>,
    mut apply: F,
) -> AppResult<Submission>
where
    F: FnMut(&mut Submission) -> AppResult<()> + Send,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        check_expected("Submission", &current.id, current.version, expected_version)?;

        let mut next = current.clone();
        apply(&mut next)?;
        next.modified_at = Some(Utc::now());

        match repository.update(next).await {
            Ok(saved) => return Ok(saved),
            Err(AppError::Conflict(msg)) if expected_version.is_none() => {
                log::debug!(
                    "Submission write lost a race (attempt {}/{}): {}",
                    attempt,
                    MAX_WRITE_ATTEMPTS,
                    msg
                );
                current = repository.find_by_id(&current.id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Submission '{}' not found", current.id))
                })?;
            }
            Err(e) => return Err(e),
        }
    }

    log::warn!(
        "Giving up on submission '{}' after {} conflicting writes",
        current.id,
        MAX_WRITE_ATTEMPTS
    );
    Err(AppError::Conflict(format!(
        "Submission '{}' is being modified concurrently, try again",
        current.id
    )))
}
