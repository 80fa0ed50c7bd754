//! Entity types. `User`, `Message` and `Follow` map directly to committed
//! rows; `NewUser` / `NewMessage` are in-memory records that only get
//! validated when the session commits them.

use chrono::{DateTime, Utc};

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Longest message text accepted, counted in characters.
pub const MESSAGE_MAX_LEN: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// argon2 PHC string.
    pub password: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

/// Directed edge: `user_following_id` follows `user_being_followed_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Follow {
    pub user_being_followed_id: i64,
    pub user_following_id: i64,
}

impl Follow {
    pub fn new(follower_id: i64, followed_id: i64) -> Self {
        Self {
            user_being_followed_id: followed_id,
            user_following_id: follower_id,
        }
    }
}

/// A user that has not been persisted yet. `username` and `email` may be
/// missing here; the commit rejects them.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl NewUser {
    /// Builds a record with an already-hashed password. Use
    /// [`User::signup`](crate::User::signup) to hash a plaintext one.
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: password.to_string(),
            ..Default::default()
        }
    }
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.image_url.is_none()
            && self.header_image_url.is_none()
            && self.bio.is_none()
            && self.location.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub text: Option<String>,
    pub user_id: Option<i64>,
    /// Defaults to the commit time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewMessage {
    pub fn new(text: &str, user_id: i64) -> Self {
        Self {
            text: Some(text.to_string()),
            user_id: Some(user_id),
            timestamp: None,
        }
    }
}
