//! Error types for catalog persistence.

use std::fmt;

use thiserror::Error;

/// Coarse cause of a failed catalog query, carried in [`CatalogError::Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogDbErrorKind {
    /// Another connection holds the write lock past the busy timeout.
    BusyOrLocked,
    /// Unique, foreign-key or check constraint failed.
    ConstraintViolation,
    /// No pooled connection became available in time.
    PoolTimeout,
    /// A stored column could not be decoded.
    Decode,
    Other,
}

impl CatalogDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::Decode,
            sqlx::Error::Database(database_error) => {
                let database_error = database_error.as_ref();
                // Extended result codes: SQLITE_BUSY is 5, SQLITE_LOCKED is 6.
                let code = database_error.code();
                let locked = matches!(
                    code.as_deref(),
                    Some("5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED")
                ) || database_error.message().contains("database is locked");
                if locked {
                    Self::BusyOrLocked
                } else if database_error.is_unique_violation()
                    || database_error.is_foreign_key_violation()
                    || database_error.is_check_violation()
                {
                    Self::ConstraintViolation
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for CatalogDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::PoolTimeout => "pool_timeout",
            Self::Decode => "decode",
            Self::Other => "other",
        })
    }
}

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        kind: CatalogDbErrorKind,
        message: String,
    },

    /// A part row that should exist does not.
    #[error(
        "part not found: id {0}\n  Suggestion: The part may have been evicted by a concurrent run"
    )]
    PartNotFound(i64),

    /// A stored row holds a value the model cannot represent.
    #[error("corrupt {table} row {id}: {reason}")]
    CorruptRow {
        table: &'static str,
        id: i64,
        reason: String,
    },
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: CatalogDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl CatalogError {
    /// True when `SQLite` gave up waiting for the write lock; the unit of
    /// work can be replayed from the start.
    #[must_use]
    pub fn is_busy_or_locked(&self) -> bool {
        matches!(
            self,
            Self::Database {
                kind: CatalogDbErrorKind::BusyOrLocked,
                ..
            }
        )
    }
}
