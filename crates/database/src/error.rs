// In crates/database/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to connect to the database")]
    ConnectionError(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("Database operation failed")]
    OperationFailed(#[source] sqlx::Error),
    #[error("{field} value {value} does not fit the column")]
    ValueOutOfRange { field: &'static str, value: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
