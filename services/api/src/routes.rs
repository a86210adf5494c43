//! API service routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    models::{
        ChangePasswordRequest, DeleteAccountRequest, FollowRequest, SigninRequest, SignupRequest,
        notification::NotificationType,
    },
    repositories::posts::NewPost,
    state::AppState,
    validation::{validate_email, validate_password, validate_username},
};

pub mod notifications;
pub mod posts;
pub mod spots;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/settings/change-password", put(change_password))
        .route("/settings/delete-account", delete(delete_account))
        .route("/follow", post(follow))
        .route("/unfollow", post(unfollow))
        .route("/follow/:username", get(get_following))
        .route("/posts", get(posts::get_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/user/:username", get(posts::posts_by_user))
        .route("/posts/:id/like", post(posts::like_post))
        .route("/posts/:id/likers", get(posts::likers))
        .route("/posts/:id/comment", post(posts::comment_post))
        .route("/posts/:id/share", post(posts::share_post))
        .route("/posts/:id/save", post(posts::save_post))
        .route(
            "/dive-spots",
            get(spots::get_spots).post(spots::create_spot),
        )
        .route("/dive-spots/:id", get(spots::get_spot))
        .route("/dive-spots/:id/fish", post(spots::add_fish))
        .route("/dive-spots/:id/photo", post(spots::add_photo))
        .route("/dive-spots/:id/like", post(spots::like_spot))
        .route("/dive-spots/:id/dislike", post(spots::dislike_spot))
        .route(
            "/dive-spots/:id/interest",
            post(spots::register_interest).get(spots::list_interested),
        )
        .route("/notifications", get(notifications::get_all))
        .route(
            "/notifications/:username",
            get(notifications::get_for_user),
        )
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Register a new user
///
/// The welcome post is a best-effort second step: its failure is logged but
/// does not roll back the signup.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_username(&payload.username).map_err(ApiError::InvalidInput)?;
    validate_email(&payload.email).map_err(ApiError::InvalidInput)?;
    validate_password(&payload.password).map_err(ApiError::InvalidInput)?;

    let user = state
        .user_repository
        .create(&payload.username, &payload.email, &payload.password)
        .await?;

    info!("New user registered: {}", user.id);

    let welcome_post = NewPost {
        title: "Welcome Post".to_string(),
        description: "Hey, I am a new user.".to_string(),
        username: user.username.clone(),
        media: None,
    };
    if let Err(e) = state.post_repository.create(&welcome_post).await {
        warn!("Failed to create welcome post for {}: {}", user.username, e);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signup successful",
            "userId": user.id,
        })),
    ))
}

/// Verify a user's credentials
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_username(&payload.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !state
        .user_repository
        .verify_password(&user, &payload.password)?
    {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(json!({"message": "Sign-in successful"})))
}

/// Change a user's password
pub async fn change_password(
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .user_repository
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !state
        .user_repository
        .verify_password(&user, &payload.current_password)?
    {
        return Err(ApiError::InvalidInput(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_password(&payload.new_password).map_err(ApiError::InvalidInput)?;

    state
        .user_repository
        .update_password(&payload.username, &payload.new_password)
        .await?;

    Ok(Json(json!({"message": "Password changed successfully"})))
}

/// Delete a user account
pub async fn delete_account(
    State(state): State<AppState>,
    Json(payload): Json<DeleteAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    state.user_repository.delete(&payload.username).await?;

    Ok(Json(json!({"message": "Account deleted successfully"})))
}

/// Follow a user
///
/// A Follow notification is emitted only when the edge is newly added, so
/// repeating the request stays a no-op all the way through.
pub async fn follow(
    State(state): State<AppState>,
    Json(payload): Json<FollowRequest>,
) -> ApiResult<impl IntoResponse> {
    let newly_added = state
        .user_repository
        .follow(&payload.current_user, &payload.target_user)
        .await?;

    if newly_added {
        state
            .notification_repository
            .record(
                NotificationType::Follow,
                &payload.current_user,
                &payload.target_user,
                None,
            )
            .await?;
    }

    Ok(Json(json!({
        "message": format!("Now following {}", payload.target_user)
    })))
}

/// Unfollow a user
pub async fn unfollow(
    State(state): State<AppState>,
    Json(payload): Json<FollowRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .user_repository
        .unfollow(&payload.current_user, &payload.target_user)
        .await?;

    Ok(Json(json!({
        "message": format!("Unfollowed {}", payload.target_user)
    })))
}

/// Get the list of usernames a user follows
pub async fn get_following(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let following = state.user_repository.following(&username).await?;

    Ok(Json(following))
}
