use rusqlite::{OptionalExtension, Row};

use crate::models::{Follow, Message, User};
use crate::session::Session;
use crate::Result;

const USER_COLUMNS: &str =
    "id, username, email, password, image_url, header_image_url, bio, location";
const MESSAGE_COLUMNS: &str = "id, text, timestamp, user_id";

impl Session<'_> {
    // -- Users --

    pub fn find_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = self.conn()?.query_row(&sql, [id], user_from_row).optional()?;
        Ok(user)
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = self
            .conn()?
            .query_row(&sql, [username], user_from_row)
            .optional()?;
        Ok(user)
    }

    /// Users whose username contains `search`, or everyone when `None`.
    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let rows = match search {
            Some(term) => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE username LIKE ?1 ESCAPE '\\' ORDER BY id"
                );
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map([like_pattern(term)], user_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map([], user_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }

    /// Users following `user_id`.
    pub fn followers_of(&self, user_id: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u
             JOIN follows f ON f.user_following_id = u.id
             WHERE f.user_being_followed_id = ?1
             ORDER BY u.id",
            prefixed(USER_COLUMNS, "u")
        );
        self.users_where(&sql, user_id)
    }

    /// Users `user_id` follows.
    pub fn following_of(&self, user_id: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users u
             JOIN follows f ON f.user_being_followed_id = u.id
             WHERE f.user_following_id = ?1
             ORDER BY u.id",
            prefixed(USER_COLUMNS, "u")
        );
        self.users_where(&sql, user_id)
    }

    // -- Follows --

    pub fn follow_exists(&self, follow: Follow) -> Result<bool> {
        let found = self
            .conn()?
            .query_row(
                "SELECT 1 FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [follow.user_being_followed_id, follow.user_following_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // -- Messages --

    pub fn find_message(&self, id: i64) -> Result<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1");
        let message = self
            .conn()?
            .query_row(&sql, [id], message_from_row)
            .optional()?;
        Ok(message)
    }

    /// Newest first.
    pub fn messages_of(&self, user_id: i64, limit: u32) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn()?.prepare(&sql)?;
        let rows = stmt
            .query_map([user_id, i64::from(limit)], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Home feed: messages by `user_id` and by everyone they follow,
    /// newest first.
    pub fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE user_id = ?1
                OR user_id IN (SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1)
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn()?.prepare(&sql)?;
        let rows = stmt
            .query_map([user_id, i64::from(limit)], message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn users_where(&self, sql: &str, id: i64) -> Result<Vec<User>> {
        let mut stmt = self.conn()?.prepare(sql)?;
        let rows = stmt
            .query_map([id], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        location: row.get(7)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
    })
}

/// "id, username" + "u" -> "u.id, u.username"
fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Substring match with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
