//! Unit of work.
//!
//! Changes are staged on a [`Session`] and only reach the database on
//! [`Session::commit`], which applies the whole batch in one SQLite
//! transaction. A failed commit leaves nothing behind in the database but
//! marks the session as failed: every later call returns
//! [`DbError::PendingRollback`] until [`Session::rollback`] is called.
//!
//! Reads go straight to the connection and only see committed rows.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, MutexGuard, OnceLock};

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::error::{ConstraintViolation, write_error};
use crate::models::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, Follow, MESSAGE_MAX_LEN, Message, NewMessage,
    NewUser, User, UserChanges,
};
use crate::{DbError, Result};

type IdSlot = Arc<OnceLock<i64>>;

/// Handle to a staged insert. The id is filled in once the commit that
/// wrote the row succeeds.
pub struct Staged<T> {
    id: IdSlot,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Staged<T> {
    fn new() -> (Self, IdSlot) {
        let slot = IdSlot::default();
        let staged = Self {
            id: slot.clone(),
            _entity: PhantomData,
        };
        (staged, slot)
    }

    pub fn id(&self) -> Option<i64> {
        self.id.get().copied()
    }
}

impl<T> Clone for Staged<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Staged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Staged").field("id", &self.id()).finish()
    }
}

enum Pending {
    InsertUser(NewUser, IdSlot),
    UpdateUser(i64, UserChanges),
    DeleteUser(i64),
    InsertMessage(NewMessage, IdSlot),
    DeleteMessage(i64),
    AddFollow(Follow),
    RemoveFollow(Follow),
}

pub struct Session<'db> {
    conn: MutexGuard<'db, Connection>,
    pending: Vec<Pending>,
    failed: Option<String>,
}

impl<'db> Session<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self {
            conn,
            pending: Vec::new(),
            failed: None,
        }
    }

    // -- Staging --

    pub fn add_user(&mut self, user: NewUser) -> Result<Staged<User>> {
        self.usable()?;
        let (staged, slot) = Staged::new();
        self.pending.push(Pending::InsertUser(user, slot));
        Ok(staged)
    }

    pub fn update_user(&mut self, id: i64, changes: UserChanges) -> Result<()> {
        self.stage(Pending::UpdateUser(id, changes))
    }

    /// Deleting a user takes their messages and follow edges with them.
    pub fn delete_user(&mut self, id: i64) -> Result<()> {
        self.stage(Pending::DeleteUser(id))
    }

    pub fn add_message(&mut self, message: NewMessage) -> Result<Staged<Message>> {
        self.usable()?;
        let (staged, slot) = Staged::new();
        self.pending.push(Pending::InsertMessage(message, slot));
        Ok(staged)
    }

    pub fn delete_message(&mut self, id: i64) -> Result<()> {
        self.stage(Pending::DeleteMessage(id))
    }

    pub fn add_follow(&mut self, follow: Follow) -> Result<()> {
        self.stage(Pending::AddFollow(follow))
    }

    /// No-op at commit if the edge does not exist.
    pub fn remove_follow(&mut self, follow: Follow) -> Result<()> {
        self.stage(Pending::RemoveFollow(follow))
    }

    // -- Transaction control --

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// True after a failed commit, until `rollback`.
    pub fn needs_rollback(&self) -> bool {
        self.failed.is_some()
    }

    pub fn commit(&mut self) -> Result<()> {
        self.usable()?;
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }

        match apply(&mut self.conn, &pending) {
            Ok(assigned) => {
                for (slot, id) in assigned {
                    let _ = slot.set(id);
                }
                debug!("Committed {} staged change(s)", pending.len());
                Ok(())
            }
            Err(e) => {
                warn!("Commit failed, session needs rollback: {}", e);
                self.failed = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Discard staged changes and clear a failed commit.
    pub fn rollback(&mut self) {
        if let Some(reason) = self.failed.take() {
            debug!("Rolled back failed commit: {}", reason);
        }
        self.pending.clear();
    }

    // -- Internals --

    /// Connection for read queries. Refused while a failed commit is
    /// waiting for rollback.
    pub(crate) fn conn(&self) -> Result<&Connection> {
        self.usable()?;
        Ok(&self.conn)
    }

    fn stage(&mut self, op: Pending) -> Result<()> {
        self.usable()?;
        self.pending.push(op);
        Ok(())
    }

    fn usable(&self) -> Result<()> {
        match self.failed {
            Some(_) => Err(DbError::PendingRollback),
            None => Ok(()),
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.has_pending() {
            debug!(
                "Session dropped with {} uncommitted change(s)",
                self.pending.len()
            );
        }
    }
}

/// Run every staged change inside one transaction. Dropping the
/// transaction on the error path rolls it back.
fn apply(conn: &mut Connection, pending: &[Pending]) -> Result<Vec<(IdSlot, i64)>> {
    let tx = conn.transaction()?;
    let mut assigned = Vec::new();

    for op in pending {
        match op {
            Pending::InsertUser(user, slot) => {
                let id = insert_user(&tx, user)?;
                assigned.push((slot.clone(), id));
            }
            Pending::UpdateUser(id, changes) => update_user(&tx, *id, changes)?,
            Pending::DeleteUser(id) => {
                tx.execute("DELETE FROM users WHERE id = ?1", [id])
                    .map_err(|e| write_error("users", e))?;
            }
            Pending::InsertMessage(message, slot) => {
                let id = insert_message(&tx, message)?;
                assigned.push((slot.clone(), id));
            }
            Pending::DeleteMessage(id) => {
                tx.execute("DELETE FROM messages WHERE id = ?1", [id])
                    .map_err(|e| write_error("messages", e))?;
            }
            Pending::AddFollow(f) => {
                tx.execute(
                    "INSERT INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                    params![f.user_being_followed_id, f.user_following_id],
                )
                .map_err(|e| write_error("follows", e))?;
            }
            Pending::RemoveFollow(f) => {
                tx.execute(
                    "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                    params![f.user_being_followed_id, f.user_following_id],
                )
                .map_err(|e| write_error("follows", e))?;
            }
        }
    }

    tx.commit()?;
    Ok(assigned)
}

fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64> {
    let username = user
        .username
        .as_deref()
        .ok_or_else(|| ConstraintViolation::not_null("users", "username"))?;
    let email = user
        .email
        .as_deref()
        .ok_or_else(|| ConstraintViolation::not_null("users", "email"))?;

    conn.execute(
        "INSERT INTO users (username, email, password, image_url, header_image_url, bio, location)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            username,
            email,
            user.password,
            user.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
            user.header_image_url
                .as_deref()
                .unwrap_or(DEFAULT_HEADER_IMAGE_URL),
            user.bio,
            user.location,
        ],
    )
    .map_err(|e| write_error("users", e))?;

    Ok(conn.last_insert_rowid())
}

fn update_user(conn: &Connection, id: i64, changes: &UserChanges) -> Result<()> {
    if changes.is_empty() {
        return Ok(());
    }

    conn.execute(
        "UPDATE users SET
            username = COALESCE(?1, username),
            email = COALESCE(?2, email),
            image_url = COALESCE(?3, image_url),
            header_image_url = COALESCE(?4, header_image_url),
            bio = COALESCE(?5, bio),
            location = COALESCE(?6, location)
         WHERE id = ?7",
        params![
            changes.username,
            changes.email,
            changes.image_url,
            changes.header_image_url,
            changes.bio,
            changes.location,
            id,
        ],
    )
    .map_err(|e| write_error("users", e))?;

    Ok(())
}

fn insert_message(conn: &Connection, message: &NewMessage) -> Result<i64> {
    let text = message
        .text
        .as_deref()
        .ok_or_else(|| ConstraintViolation::not_null("messages", "text"))?;
    if text.chars().count() > MESSAGE_MAX_LEN {
        return Err(ConstraintViolation::too_long("messages", "text", MESSAGE_MAX_LEN).into());
    }
    let user_id = message
        .user_id
        .ok_or_else(|| ConstraintViolation::not_null("messages", "user_id"))?;
    let timestamp = message.timestamp.unwrap_or_else(Utc::now);

    conn.execute(
        "INSERT INTO messages (text, timestamp, user_id) VALUES (?1, ?2, ?3)",
        params![text, timestamp, user_id],
    )
    .map_err(|e| write_error("messages", e))?;

    Ok(conn.last_insert_rowid())
}
