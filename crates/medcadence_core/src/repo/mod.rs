//! Storage contracts and reference implementations.
//!
//! # Responsibility
//! - Define the outbound contracts of the ledger and schedule stores.
//! - Keep SQL and locking details out of services.
//!
//! # Invariants
//! - Storage faults are reported as `RepoError`, never as empty results.
//! - Undecodable column values map to `InvalidData`, which is not retryable.
//! - Undo is a single atomic delete-most-recent primitive in every store.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod intake_repo;
pub mod medication_repo;
pub mod memory_store;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-side failure.
#[derive(Debug)]
pub enum RepoError {
    /// Database transport failure.
    Db(DbError),
    /// Persisted row could not be decoded.
    InvalidData(String),
    /// Store is unreachable (e.g. poisoned lock).
    Unavailable(String),
}

impl RepoError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Db(DbError::Sqlite(_)) | Self::Unavailable(_) => true,
            Self::Db(DbError::UnsupportedSchemaVersion { .. }) | Self::InvalidData(_) => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Column values that do not decode are bad rows, not transport faults.
            rusqlite::Error::InvalidColumnType(index, name, sql_type) => Self::InvalidData(
                format!("column {name} (#{index}) holds an unexpected {sql_type} value"),
            ),
            rusqlite::Error::IntegralValueOutOfRange(index, value) => {
                Self::InvalidData(format!("column #{index} value {value} is out of range"))
            }
            rusqlite::Error::FromSqlConversionFailure(index, sql_type, err) => Self::InvalidData(
                format!("column #{index} ({sql_type}) failed to decode: {err}"),
            ),
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
