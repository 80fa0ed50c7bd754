use std::fmt;

use tracing::debug;

use crate::models::{Follow, Message, NewUser, User};
use crate::password;
use crate::session::{Session, Staged};
use crate::Result;

/// Upper bound on messages loaded with a user's profile.
pub const PROFILE_MESSAGE_LIMIT: u32 = 100;

impl User {
    /// Hash `password` and stage a new user. Nothing is written until the
    /// session commits; a taken username or email fails there.
    pub fn signup(
        session: &mut Session<'_>,
        username: &str,
        email: &str,
        password: &str,
        image_url: Option<&str>,
    ) -> Result<Staged<User>> {
        let user = NewUser::signup(username, email, password, image_url)?;
        session.add_user(user)
    }

    /// `Ok(None)` when the username is unknown or the password is wrong.
    /// Errors are reserved for storage faults.
    pub fn authenticate(
        session: &Session<'_>,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let Some(user) = session.find_user_by_username(username)? else {
            debug!("Authentication failed: no user {:?}", username);
            return Ok(None);
        };

        if user.check_password(password) {
            Ok(Some(user))
        } else {
            debug!("Authentication failed: bad password for {:?}", username);
            Ok(None)
        }
    }

    /// Verify `password` against the stored hash. Needs no session, so
    /// callers can run it without holding the connection.
    pub fn check_password(&self, password: &str) -> bool {
        password::verify(password, &self.password)
    }

    /// Does `self` follow `other`?
    pub fn is_following(&self, session: &Session<'_>, other: &User) -> Result<bool> {
        session.follow_exists(Follow::new(self.id, other.id))
    }

    /// Does `other` follow `self`?
    pub fn is_followed_by(&self, session: &Session<'_>, other: &User) -> Result<bool> {
        session.follow_exists(Follow::new(other.id, self.id))
    }

    /// Stage the edge `self` -> `other`.
    pub fn follow(&self, session: &mut Session<'_>, other: &User) -> Result<()> {
        session.add_follow(Follow::new(self.id, other.id))
    }

    pub fn unfollow(&self, session: &mut Session<'_>, other: &User) -> Result<()> {
        session.remove_follow(Follow::new(self.id, other.id))
    }

    pub fn messages(&self, session: &Session<'_>) -> Result<Vec<Message>> {
        session.messages_of(self.id, u32::MAX)
    }

    pub fn followers(&self, session: &Session<'_>) -> Result<Vec<User>> {
        session.followers_of(self.id)
    }

    pub fn following(&self, session: &Session<'_>) -> Result<Vec<User>> {
        session.following_of(self.id)
    }
}

impl NewUser {
    /// Hash `password` into a new, unstaged user record. Hashing is slow;
    /// do it before opening a session.
    pub fn signup(
        username: &str,
        email: &str,
        password: &str,
        image_url: Option<&str>,
    ) -> Result<NewUser> {
        let hashed = password::hash(password)?;
        Ok(NewUser {
            image_url: image_url.map(str::to_string),
            ..NewUser::new(username, email, &hashed)
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}
