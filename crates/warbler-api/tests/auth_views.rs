mod common;

use axum::http::{StatusCode, header};
use serde_json::json;

use common::{get, location, post, send, setup};

#[tokio::test]
async fn signup_logs_in_and_redirects_home() {
    let (state, _) = setup();

    let req = post(
        "/signup",
        None,
        Some(json!({ "username": "newbie", "email": "new@test.com", "password": "secret1" })),
    );
    let (status, headers, _) = send(&state, req).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/");
    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("curr_user="));

    let session = state.db.session().unwrap();
    assert!(session.find_user_by_username("newbie").unwrap().is_some());
}

#[tokio::test]
async fn signup_with_taken_username_conflicts() {
    let (state, _) = setup();

    let req = post(
        "/signup",
        None,
        Some(json!({ "username": "testuser", "email": "other@test.com", "password": "secret1" })),
    );
    let (status, _, _) = send(&state, req).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_with_taken_email_conflicts() {
    let (state, _) = setup();

    let req = post(
        "/signup",
        None,
        Some(json!({ "username": "other", "email": "test@test.com", "password": "secret1" })),
    );
    let (status, _, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let session = state.db.session().unwrap();
    assert!(session.find_user_by_username("other").unwrap().is_none());
}

#[tokio::test]
async fn signup_rejects_invalid_form() {
    let (state, _) = setup();

    for body in [
        json!({ "username": "", "email": "a@test.com", "password": "secret1" }),
        json!({ "username": "a", "email": "not-an-email", "password": "secret1" }),
        json!({ "username": "a", "email": "a@test.com", "password": "short" }),
    ] {
        let (status, _, _) = send(&state, post("/signup", None, Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn login() {
    let (state, _) = setup();

    let req = post(
        "/login",
        None,
        Some(json!({ "username": "testuser", "password": "testuser" })),
    );
    let (status, headers, _) = send(&state, req).await;

    assert_eq!(status, StatusCode::FOUND);
    assert!(headers.get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn login_with_bad_credentials() {
    let (state, _) = setup();

    for body in [
        json!({ "username": "testuser", "password": "wrongPassword" }),
        json!({ "username": "wrongusername", "password": "testuser" }),
    ] {
        let (status, headers, _) = send(&state, post("/login", None, Some(body))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(headers.get(header::SET_COOKIE).is_none());
    }
}

#[tokio::test]
async fn logout_redirects_to_login() {
    let (state, testuser) = setup();

    let (status, headers, _) = send(&state, get("/logout", Some(&testuser))).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/login");
}

#[tokio::test]
async fn forged_session_is_ignored() {
    let (state, _) = setup();

    let req = axum::http::Request::builder()
        .uri("/users/profile")
        .header(header::COOKIE, "curr_user=not-a-token")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _, _) = send(&state, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
