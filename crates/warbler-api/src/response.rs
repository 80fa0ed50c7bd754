use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use warbler_db::{ConstraintViolation, DbError, Message, User};
use warbler_types::api::{MessageResponse, UserResponse, UserSummary};

/// Map a database failure onto the status the client sees.
pub fn db_status(e: DbError) -> StatusCode {
    match &e {
        DbError::Constraint(ConstraintViolation::Unique { .. }) => {
            warn!("Rejected write: {}", e);
            StatusCode::CONFLICT
        }
        DbError::Constraint(_) => {
            warn!("Rejected write: {}", e);
            StatusCode::BAD_REQUEST
        }
        _ => {
            error!("Database error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `302 Found` pointing at `location`.
pub fn redirect(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        image_url: user.image_url.clone(),
        header_image_url: user.header_image_url.clone(),
        bio: user.bio.clone(),
        location: user.location.clone(),
    }
}

pub fn user_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        username: user.username.clone(),
        image_url: user.image_url.clone(),
        bio: user.bio.clone(),
    }
}

pub fn message_response(message: &Message) -> MessageResponse {
    MessageResponse {
        id: message.id,
        text: message.text.clone(),
        timestamp: message.timestamp,
        user_id: message.user_id,
    }
}
