mod common;

use axum::http::{StatusCode, header};
use serde_json::json;

use common::{add_user, get, location, post, send, setup};

#[tokio::test]
async fn list_users() {
    let (state, testuser) = setup();

    let (status, _, body) = send(&state, get("/users", Some(&testuser))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("testuser"));
}

#[tokio::test]
async fn list_users_search() {
    let (state, _) = setup();
    add_user(&state, "alice", "alice@test.com");

    let (status, _, body) = send(&state, get("/users?q=ali", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("alice"));
    assert!(!body.contains("testuser"));
}

#[tokio::test]
async fn users_show() {
    let (state, testuser) = setup();

    let uri = format!("/users/{}", testuser.id);
    let (status, _, body) = send(&state, get(&uri, Some(&testuser))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("testuser"));
}

#[tokio::test]
async fn users_show_missing_is_404() {
    let (state, testuser) = setup();

    let (status, _, _) = send(&state, get("/users/9999", Some(&testuser))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn show_following() {
    let (state, testuser) = setup();

    let uri = format!("/users/{}/following", testuser.id);
    let (status, _, body) = send(&state, get(&uri, Some(&testuser))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("following"));
}

#[tokio::test]
async fn users_followers() {
    let (state, testuser) = setup();

    let uri = format!("/users/{}/followers", testuser.id);
    let (status, _, body) = send(&state, get(&uri, Some(&testuser))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("followers"));
}

#[tokio::test]
async fn follow_pages_of_other_users_when_logged_in() {
    let (state, testuser) = setup();
    let other = add_user(&state, "test1user", "test1@test.com");

    for page in ["following", "followers"] {
        let uri = format!("/users/{}/{page}", other.id);
        let (status, _, body) = send(&state, get(&uri, Some(&testuser))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("test1user"));
    }
}

#[tokio::test]
async fn follow_pages_refused_when_logged_out() {
    let (state, testuser) = setup();

    for page in ["following", "followers"] {
        let uri = format!("/users/{}/{page}", testuser.id);
        let (status, _, body) = send(&state, get(&uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!body.contains("testuser"));
    }
}

#[tokio::test]
async fn profile() {
    let (state, testuser) = setup();

    let (status, _, body) = send(&state, get("/users/profile", Some(&testuser))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("testuser"));
}

#[tokio::test]
async fn profile_update_requires_password() {
    let (state, testuser) = setup();

    let req = post(
        "/users/profile",
        Some(&testuser),
        Some(json!({ "bio": "hi", "password": "wrong" })),
    );
    let (status, _, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = post(
        "/users/profile",
        Some(&testuser),
        Some(json!({ "bio": "hi", "location": "Earth", "image_url": "", "password": "testuser" })),
    );
    let (status, headers, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), format!("/users/{}", testuser.id));

    let session = state.db.session().unwrap();
    let updated = session.find_user(testuser.id).unwrap().unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hi"));
    assert_eq!(updated.location.as_deref(), Some("Earth"));
    assert_eq!(updated.image_url, warbler_db::models::DEFAULT_IMAGE_URL);
    assert_eq!(updated.username, "testuser");
}

#[tokio::test]
async fn profile_update_rejects_invalid_email() {
    let (state, testuser) = setup();

    let req = post(
        "/users/profile",
        Some(&testuser),
        Some(json!({ "email": "not-an-email", "password": "testuser" })),
    );
    let (status, _, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let session = state.db.session().unwrap();
    let stored = session.find_user(testuser.id).unwrap().unwrap();
    assert_eq!(stored.email, testuser.email);
}

#[tokio::test]
async fn profile_update_to_taken_username_conflicts() {
    let (state, testuser) = setup();
    add_user(&state, "taken", "taken@test.com");

    let req = post(
        "/users/profile",
        Some(&testuser),
        Some(json!({ "username": "taken", "password": "testuser" })),
    );
    let (status, _, _) = send(&state, req).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn add_follow() {
    let (state, testuser) = setup();
    let u1 = add_user(&state, "test1user", "test1@test.com");

    let uri = format!("/users/follow/{}", u1.id);
    let (status, headers, _) = send(&state, post(&uri, Some(&testuser), None)).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), format!("/users/{}/following", testuser.id));

    let session = state.db.session().unwrap();
    assert!(testuser.is_following(&session, &u1).unwrap());
}

#[tokio::test]
async fn add_follow_self() {
    let (state, testuser) = setup();

    let uri = format!("/users/follow/{}", testuser.id);
    let (status, headers, _) = send(&state, post(&uri, Some(&testuser), None)).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), format!("/users/{}/following", testuser.id));

    let session = state.db.session().unwrap();
    assert!(testuser.is_following(&session, &testuser).unwrap());
    assert!(testuser.is_followed_by(&session, &testuser).unwrap());
}

#[tokio::test]
async fn add_follow_twice_is_harmless() {
    let (state, testuser) = setup();
    let u1 = add_user(&state, "test1user", "test1@test.com");

    let uri = format!("/users/follow/{}", u1.id);
    send(&state, post(&uri, Some(&testuser), None)).await;
    let (status, _, _) = send(&state, post(&uri, Some(&testuser), None)).await;

    assert_eq!(status, StatusCode::FOUND);
}

#[tokio::test]
async fn add_follow_unknown_user_is_404() {
    let (state, testuser) = setup();

    let (status, _, _) = send(&state, post("/users/follow/9999", Some(&testuser), None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_following() {
    let (state, testuser) = setup();
    let u1 = add_user(&state, "test1user", "test1@test.com");

    send(&state, post(&format!("/users/follow/{}", u1.id), Some(&testuser), None)).await;
    let uri = format!("/users/stop-following/{}", u1.id);
    let (status, _, _) = send(&state, post(&uri, Some(&testuser), None)).await;

    assert_eq!(status, StatusCode::FOUND);
    let session = state.db.session().unwrap();
    assert!(!testuser.is_following(&session, &u1).unwrap());
}

#[tokio::test]
async fn delete_user() {
    let (state, testuser) = setup();

    let (status, headers, _) = send(&state, post("/users/delete", Some(&testuser), None)).await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(location(&headers), "/signup");
    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("curr_user="));

    let session = state.db.session().unwrap();
    assert!(session.find_user(testuser.id).unwrap().is_none());
}

#[tokio::test]
async fn session_of_deleted_user_is_refused() {
    let (state, testuser) = setup();
    send(&state, post("/users/delete", Some(&testuser), None)).await;

    let (status, _, _) = send(&state, get("/users/profile", Some(&testuser))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_are_not_cached() {
    let (state, _) = setup();

    let (_, headers, _) = send(&state, get("/users", None)).await;

    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "no-cache, no-store, must-revalidate"
    );
}
