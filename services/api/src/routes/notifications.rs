//! Notification routes (pull-only delivery)

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{error::ApiResult, models::PageQuery, state::AppState};

/// Get a user's notifications, newest first, with their posts joined
pub async fn get_for_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = query.clamp();
    let notifications = state
        .notification_repository
        .for_user(&username, limit, offset)
        .await?;

    Ok(Json(notifications))
}

/// Get all notifications
pub async fn get_all(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let notifications = state.notification_repository.get_all().await?;

    Ok(Json(notifications))
}
