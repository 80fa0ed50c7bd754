use rusqlite::ffi;
use thiserror::Error;

use crate::models::MESSAGE_MAX_LEN;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("constraint violated: {0}")]
    Constraint(#[from] ConstraintViolation),

    /// A commit failed on this session and it has not been rolled back.
    #[error("session has a failed commit pending rollback")]
    PendingRollback,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    pub fn constraint(&self) -> Option<&ConstraintViolation> {
        match self {
            Self::Constraint(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("{table}.{columns} must be unique")]
    Unique { table: String, columns: String },

    #[error("{table}.{column} may not be null")]
    NotNull { table: String, column: String },

    #[error("{table}.{column} is longer than {max} characters")]
    TooLong {
        table: String,
        column: String,
        max: usize,
    },

    #[error("{table} references a row that does not exist")]
    ForeignKey { table: String },
}

impl ConstraintViolation {
    pub(crate) fn not_null(table: &str, column: &str) -> Self {
        Self::NotNull {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub(crate) fn too_long(table: &str, column: &str, max: usize) -> Self {
        Self::TooLong {
            table: table.to_string(),
            column: column.to_string(),
            max,
        }
    }

    /// Classify a SQLite constraint failure raised while writing to `table`.
    /// Returns `None` for anything that is not a constraint failure.
    pub fn from_sqlite(table: &str, err: &rusqlite::Error) -> Option<Self> {
        let rusqlite::Error::SqliteFailure(e, msg) = err else {
            return None;
        };
        if e.code != rusqlite::ErrorCode::ConstraintViolation {
            return None;
        }
        let detail = msg
            .as_deref()
            .and_then(|m| m.split_once(": "))
            .map(|(_, d)| d)
            .unwrap_or("");

        let violation = match e.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                let (tbl, columns) = split_columns(table, detail);
                Self::Unique {
                    table: tbl,
                    columns,
                }
            }
            ffi::SQLITE_CONSTRAINT_NOTNULL => {
                let (tbl, column) = split_columns(table, detail);
                Self::NotNull { table: tbl, column }
            }
            // The only CHECK in the schema bounds message length.
            ffi::SQLITE_CONSTRAINT_CHECK => Self::too_long(table, "text", MESSAGE_MAX_LEN),
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKey {
                table: table.to_string(),
            },
            _ => return None,
        };
        Some(violation)
    }
}

/// "users.username" -> ("users", "username");
/// "follows.a, follows.b" -> ("follows", "a, b").
fn split_columns(fallback_table: &str, detail: &str) -> (String, String) {
    let mut table = fallback_table.to_string();
    let columns: Vec<&str> = detail
        .split(", ")
        .filter(|s| !s.is_empty())
        .map(|qualified| match qualified.split_once('.') {
            Some((t, c)) => {
                table = t.to_string();
                c
            }
            None => qualified,
        })
        .collect();
    (table, columns.join(", "))
}

/// Map a write failure on `table` to a constraint violation when it is one.
pub(crate) fn write_error(table: &str, err: rusqlite::Error) -> DbError {
    match ConstraintViolation::from_sqlite(table, &err) {
        Some(v) => DbError::Constraint(v),
        None => DbError::Sqlite(err),
    }
}
