use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{error, info, warn};

use warbler_db::{Database, NewUser, User};
use warbler_types::api::{Claims, LoginRequest, SignupRequest};

use crate::response::{db_status, redirect};
use crate::{run_blocking, with_session};

/// Cookie holding the signed id of the logged-in user.
pub const CURR_USER_KEY: &str = "curr_user";

const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub secret_key: String,
    pub session_days: i64,
}

/// POST /signup — create the account and log it in.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.trim().is_empty()
        || !is_valid_email(&req.email)
        || req.password.len() < MIN_PASSWORD_LEN
    {
        warn!("Rejected signup form for {:?}", req.username);
        return Err(StatusCode::BAD_REQUEST);
    }

    // Hash before taking the connection so other requests are not held up.
    let new_user = run_blocking(move || {
        let image_url = req.image_url.as_deref().filter(|u| !u.is_empty());
        NewUser::signup(&req.username, &req.email, &req.password, image_url).map_err(db_status)
    })
    .await?;

    let user = with_session(&state, move |session| {
        let staged = session.add_user(new_user).map_err(db_status)?;
        session.commit().map_err(db_status)?;

        let id = staged.id().ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;
        session
            .find_user(id)
            .map_err(db_status)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await?;

    info!("Signed up {}", user);
    let jar = log_in(&state, jar, &user)?;
    Ok((jar, redirect("/")))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let username = req.username.clone();
    let found = with_session(&state, move |session| {
        session.find_user_by_username(&username).map_err(db_status)
    })
    .await?;

    let Some(user) = verify_password(found, req.password).await? else {
        warn!("Invalid credentials for {:?}", req.username);
        return Err(StatusCode::UNAUTHORIZED);
    };

    info!("Logged in {}", user);
    let jar = log_in(&state, jar, &user)?;
    Ok((jar, redirect("/")))
}

/// GET /logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (log_out(jar), redirect("/login"))
}

/// `Some(user)` when `password` matches. Runs on the blocking pool, outside
/// any database session.
pub(crate) async fn verify_password(
    user: Option<User>,
    password: String,
) -> Result<Option<User>, StatusCode> {
    run_blocking(move || Ok(user.filter(|u| u.check_password(&password)))).await
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    email.contains('@')
}

/// Set the session cookie for `user`.
pub fn log_in(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, StatusCode> {
    let token = create_token(&state.secret_key, user.id, &user.username, state.session_days)
        .map_err(|e| {
            error!("Failed to sign session for {}: {}", user.id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let cookie = Cookie::build((CURR_USER_KEY, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    Ok(jar.add(cookie))
}

pub fn log_out(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(CURR_USER_KEY).path("/"))
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    username: &str,
    days: i64,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Session token from the cookie, falling back to a Bearer header.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(CURR_USER_KEY) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// The logged-in user, if the request carries a valid session for a user
/// that still exists.
pub async fn session_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, StatusCode> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let claims = match decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.secret_key.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            warn!("Ignoring invalid session: {}", e);
            return Ok(None);
        }
    };

    with_session(state, move |session| {
        session.find_user(claims.sub).map_err(db_status)
    })
    .await
}
