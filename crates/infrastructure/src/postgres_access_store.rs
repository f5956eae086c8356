use std::fmt::Display;

use sqlx::PgPool;
use wardkeep_core::AppError;

mod catalog;
mod change_requests;
mod overrides;
mod roles;
mod temporary;
mod users;

/// PostgreSQL-backed implementation of every access repository port.
#[derive(Clone)]
pub struct PostgresAccessStore {
    pool: PgPool,
}

impl PostgresAccessStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(context: impl Display, error: sqlx::Error) -> AppError {
    let unique_violation = error
        .as_database_error()
        .is_some_and(|database_error| database_error.is_unique_violation());
    if unique_violation {
        return AppError::Conflict(format!("{context}: record already exists"));
    }

    AppError::Internal(format!("{context}: {error}"))
}
