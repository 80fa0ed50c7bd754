use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use warbler_db::User;

use crate::auth::{AppState, session_user};

/// The user behind the request's session. Inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Reject requests without a live session; otherwise expose the user to
/// handlers as `Extension<CurrentUser>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let headers = req.headers().clone();
    let Some(user) = session_user(&state, &headers).await? else {
        warn!("Access unauthorized: {} {}", req.method(), req.uri());
        return Err(StatusCode::UNAUTHORIZED);
    };

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
