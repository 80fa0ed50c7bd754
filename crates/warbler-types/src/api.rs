use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Session --

/// Claims carried in the session cookie. `sub` is the id of the logged-in
/// user, the one value the view layer keeps per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct UserSearch {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Short form used in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub image_url: String,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub messages: Vec<MessageResponse>,
    pub following_count: usize,
    pub followers_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowingResponse {
    pub user: UserSummary,
    pub following: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowersResponse {
    pub user: UserSummary,
    pub followers: Vec<UserSummary>,
}

/// Every field except `password` is optional; the password re-confirms the
/// current user before anything changes.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub password: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub user: Option<UserSummary>,
    pub messages: Vec<MessageResponse>,
}
