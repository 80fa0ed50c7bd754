use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};

use warbler_db::NewMessage;
use warbler_db::models::MESSAGE_MAX_LEN;
use warbler_types::api::{NewMessageRequest, TimelineResponse};

use crate::auth::{AppState, session_user};
use crate::middleware::CurrentUser;
use crate::response::{db_status, message_response, redirect, user_summary};
use crate::with_session;

/// Messages shown on the home feed.
const TIMELINE_LIMIT: u32 = 100;

/// GET / — the home feed when logged in, an empty page otherwise.
pub async fn homepage(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(me) = session_user(&state, &headers).await? else {
        return Ok(Json(TimelineResponse {
            user: None,
            messages: vec![],
        }));
    };

    let me_id = me.id;
    let messages = with_session(&state, move |session| {
        session.timeline(me_id, TIMELINE_LIMIT).map_err(db_status)
    })
    .await?;

    Ok(Json(TimelineResponse {
        user: Some(user_summary(&me)),
        messages: messages.iter().map(message_response).collect(),
    }))
}

/// POST /messages/new — post as the current user.
pub async fn new_message(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(req): Json<NewMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.text.trim().is_empty() || req.text.chars().count() > MESSAGE_MAX_LEN {
        warn!("Rejected message from {}: empty or too long", me.username);
        return Err(StatusCode::BAD_REQUEST);
    }

    let me_id = me.id;
    let message_id = with_session(&state, move |session| {
        let staged = session
            .add_message(NewMessage::new(&req.text, me_id))
            .map_err(db_status)?;
        session.commit().map_err(db_status)?;
        Ok(staged.id())
    })
    .await?;

    info!("{} posted message {:?}", me.username, message_id);
    Ok(redirect(format!("/users/{me_id}")))
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = with_session(&state, move |session| {
        session.find_message(message_id).map_err(db_status)
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(message_response(&message)))
}

/// POST /messages/{message_id}/delete — only the author may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let me_id = me.id;

    with_session(&state, move |session| {
        let message = session
            .find_message(message_id)
            .map_err(db_status)?
            .ok_or(StatusCode::NOT_FOUND)?;

        if message.user_id != me_id {
            warn!(
                "User {} tried to delete message {} owned by {}",
                me_id, message.id, message.user_id
            );
            return Err(StatusCode::FORBIDDEN);
        }

        session.delete_message(message.id).map_err(db_status)?;
        session.commit().map_err(db_status)
    })
    .await?;

    Ok(redirect(format!("/users/{me_id}")))
}
