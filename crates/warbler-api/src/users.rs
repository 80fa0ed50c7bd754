use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_db::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use warbler_db::user::PROFILE_MESSAGE_LIMIT;
use warbler_db::{Session, User, UserChanges};
use warbler_types::api::{
    FollowersResponse, FollowingResponse, ProfileResponse, ProfileUpdateRequest, UserSearch,
};

use crate::auth::{AppState, is_valid_email, log_out, verify_password};
use crate::middleware::CurrentUser;
use crate::response::{db_status, message_response, redirect, user_response, user_summary};
use crate::with_session;

/// GET /users — optionally filtered with `?q=`.
pub async fn list_users(
    State(state): State<AppState>,
    Query(search): Query<UserSearch>,
) -> Result<impl IntoResponse, StatusCode> {
    let users = with_session(&state, move |session| {
        let term = search.q.as_deref().filter(|q| !q.is_empty());
        session.list_users(term).map_err(db_status)
    })
    .await?;

    Ok(Json(users.iter().map(user_summary).collect::<Vec<_>>()))
}

/// GET /users/{user_id}
pub async fn show_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let profile = with_session(&state, move |session| {
        let user = find_user(session, user_id)?;
        let messages = session
            .messages_of(user.id, PROFILE_MESSAGE_LIMIT)
            .map_err(db_status)?;
        let following_count = user.following(session).map_err(db_status)?.len();
        let followers_count = user.followers(session).map_err(db_status)?.len();

        Ok(ProfileResponse {
            user: user_response(&user),
            messages: messages.iter().map(message_response).collect(),
            following_count,
            followers_count,
        })
    })
    .await?;

    Ok(Json(profile))
}

/// GET /users/{user_id}/following
pub async fn show_following(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let (user, following) = with_session(&state, move |session| {
        let user = find_user(session, user_id)?;
        let following = user.following(session).map_err(db_status)?;
        Ok((user, following))
    })
    .await?;

    Ok(Json(FollowingResponse {
        user: user_summary(&user),
        following: following.iter().map(user_summary).collect(),
    }))
}

/// GET /users/{user_id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Extension(_current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let (user, followers) = with_session(&state, move |session| {
        let user = find_user(session, user_id)?;
        let followers = user.followers(session).map_err(db_status)?;
        Ok((user, followers))
    })
    .await?;

    Ok(Json(FollowersResponse {
        user: user_summary(&user),
        followers: followers.iter().map(user_summary).collect(),
    }))
}

/// POST /users/follow/{follow_id} — following someone twice is a no-op.
pub async fn add_follow(
    State(state): State<AppState>,
    Path(follow_id): Path<i64>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let me_id = me.id;

    with_session(&state, move |session| {
        let followed = find_user(session, follow_id)?;
        if me.is_following(session, &followed).map_err(db_status)? {
            return Ok(());
        }

        me.follow(session, &followed).map_err(db_status)?;
        session.commit().map_err(db_status)?;
        info!("{} now follows {}", me.username, followed.username);
        Ok(())
    })
    .await?;

    Ok(redirect(format!("/users/{me_id}/following")))
}

/// POST /users/stop-following/{follow_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Path(follow_id): Path<i64>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, StatusCode> {
    let me_id = me.id;

    with_session(&state, move |session| {
        let followed = find_user(session, follow_id)?;
        me.unfollow(session, &followed).map_err(db_status)?;
        session.commit().map_err(db_status)?;
        info!("{} stopped following {}", me.username, followed.username);
        Ok(())
    })
    .await?;

    Ok(redirect(format!("/users/{me_id}/following")))
}

/// GET /users/profile — the current user's editable fields.
pub async fn profile(Extension(CurrentUser(me)): Extension<CurrentUser>) -> impl IntoResponse {
    Json(user_response(&me))
}

/// POST /users/profile — requires the current password.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(mut req): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let me_id = me.id;

    if req
        .email
        .as_deref()
        .is_some_and(|e| !e.is_empty() && !is_valid_email(e))
    {
        warn!("Rejected profile update for {}: bad email", me);
        return Err(StatusCode::BAD_REQUEST);
    }

    let password = std::mem::take(&mut req.password);
    let Some(me) = verify_password(Some(me), password).await? else {
        warn!("Wrong password on profile update for user {}", me_id);
        return Err(StatusCode::UNAUTHORIZED);
    };

    with_session(&state, move |session| {
        let changes = UserChanges {
            username: req.username.filter(|s| !s.is_empty()),
            email: req.email.filter(|s| !s.is_empty()),
            image_url: req.image_url.map(|u| or_default(u, DEFAULT_IMAGE_URL)),
            header_image_url: req
                .header_image_url
                .map(|u| or_default(u, DEFAULT_HEADER_IMAGE_URL)),
            bio: req.bio,
            location: req.location,
        };
        session.update_user(me.id, changes).map_err(db_status)?;
        session.commit().map_err(db_status)?;
        info!("Updated profile of {}", me);
        Ok(())
    })
    .await?;

    Ok(redirect(format!("/users/{me_id}")))
}

/// POST /users/delete — log out and remove the account with everything
/// that hangs off it.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, StatusCode> {
    with_session(&state, move |session| {
        session.delete_user(me.id).map_err(db_status)?;
        session.commit().map_err(db_status)?;
        info!("Deleted {}", me);
        Ok(())
    })
    .await?;

    Ok((log_out(jar), redirect("/signup")))
}

fn find_user(session: &Session<'_>, id: i64) -> Result<User, StatusCode> {
    session
        .find_user(id)
        .map_err(db_status)?
        .ok_or(StatusCode::NOT_FOUND)
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
