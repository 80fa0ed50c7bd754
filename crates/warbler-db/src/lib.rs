pub mod error;
pub mod migrations;
pub mod models;
pub mod password;
pub mod queries;
pub mod session;
pub mod user;

pub use error::{ConstraintViolation, DbError};
pub use models::{Follow, Message, NewMessage, NewUser, User, UserChanges};
pub use session::{Session, Staged};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private, throwaway database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Start a unit of work. The session holds the connection until dropped,
    /// so keep it scoped to a single request.
    pub fn session(&self) -> Result<Session<'_>> {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        Ok(Session::new(conn))
    }
}
