pub mod auth;
pub mod messages;
pub mod middleware;
pub mod response;
pub mod users;

pub use auth::{AppState, AppStateInner, CURR_USER_KEY};

use axum::{
    Router,
    http::{HeaderValue, StatusCode, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use warbler_db::Session;

use crate::middleware::require_auth;
use crate::response::db_status;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(messages::homepage))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/{user_id}", get(users::show_user))
        .route("/messages/{message_id}", get(messages::show_message))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/follow/{follow_id}", post(users::add_follow))
        .route("/users/stop-following/{follow_id}", post(users::stop_following))
        .route("/users/profile", get(users::profile).post(users::update_profile))
        .route("/users/delete", post(users::delete_user))
        .route("/messages/new", post(messages::new_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Every response depends on the session cookie.
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Run `f` against a fresh database session on the blocking pool.
/// The session, and anything it left uncommitted, is dropped when `f` returns.
pub(crate) async fn with_session<F, T>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&mut Session<'_>) -> Result<T, StatusCode> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    run_blocking(move || {
        let mut session = state.db.session().map_err(db_status)?;
        f(&mut session)
    })
    .await
}

/// Run CPU-heavy work (password hashing) on the blocking pool without
/// touching the database.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> Result<T, StatusCode> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
}
