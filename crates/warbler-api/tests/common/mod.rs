#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use tower::ServiceExt;

use warbler_api::{AppState, AppStateInner, CURR_USER_KEY, auth};
use warbler_db::{Database, NewUser, User};

pub const SECRET: &str = "test-secret";

/// Fresh in-memory app with `testuser` / password `testuser` signed up.
pub fn setup() -> (AppState, User) {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        secret_key: SECRET.into(),
        session_days: 1,
    });

    let testuser = {
        let mut session = state.db.session().unwrap();
        let staged =
            User::signup(&mut session, "testuser", "test@test.com", "testuser", None).unwrap();
        session.commit().unwrap();
        session.find_user(staged.id().unwrap()).unwrap().unwrap()
    };

    (state, testuser)
}

pub fn add_user(state: &AppState, username: &str, email: &str) -> User {
    let mut session = state.db.session().unwrap();
    let staged = session
        .add_user(NewUser::new(username, email, "HASHED_PASSWORD1"))
        .unwrap();
    session.commit().unwrap();
    session.find_user(staged.id().unwrap()).unwrap().unwrap()
}

/// `Cookie` header value logging `user` in.
pub fn session_cookie(user: &User) -> String {
    let token = auth::create_token(SECRET, user.id, &user.username, 1).unwrap();
    format!("{CURR_USER_KEY}={token}")
}

pub fn get(uri: &str, as_user: Option<&User>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = as_user {
        builder = builder.header(header::COOKIE, session_cookie(user));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post(uri: &str, as_user: Option<&User>, json: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(user) = as_user {
        builder = builder.header(header::COOKIE, session_cookie(user));
    }
    let body = match json {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

pub async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let resp = warbler_api::router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

pub fn location(headers: &HeaderMap) -> &str {
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
