//! Post routes: feed, creation, and engagement actions

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    media_store::{MediaHandle, MediaUpload},
    models::{
        PageQuery, UsernameBody,
        notification::NotificationType,
        post::{CommentBody, PostForm},
    },
    repositories::posts::{NewPost, PostUpdate},
    state::AppState,
};

/// Get posts, newest first
pub async fn get_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = query.clamp();
    let posts = state.post_repository.get_all(limit, offset).await?;

    Ok(Json(posts))
}

/// Create a new post, optionally with a media file
pub async fn create_post(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_post_form(multipart).await?;

    let (title, username) = match (form.title, form.username) {
        (Some(title), Some(username)) if !title.is_empty() && !username.is_empty() => {
            (title, username)
        }
        _ => {
            return Err(ApiError::InvalidInput(
                "Title and username are required".to_string(),
            ));
        }
    };

    let media = match form.media {
        Some(upload) => Some(upload_media(&state, &upload).await?),
        None => None,
    };

    let new_post = NewPost {
        title,
        description: form.description.unwrap_or_default(),
        username,
        media,
    };
    let post = state.post_repository.create(&new_post).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Get a post by ID
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .post_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Get posts by a specific user, newest first
pub async fn posts_by_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let posts = state.post_repository.by_username(&username).await?;

    Ok(Json(posts))
}

/// Like a post and notify its owner
pub async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UsernameBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() {
        return Err(ApiError::InvalidInput("Username is required".to_string()));
    }

    let post = state.post_repository.like(id, &payload.username).await?;

    state
        .notification_repository
        .record(
            NotificationType::Like,
            &payload.username,
            &post.username,
            Some(post.id),
        )
        .await?;

    Ok(Json(post))
}

/// Get the list of users who liked a post
pub async fn likers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .post_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(post.liked_by))
}

/// Comment on a post and notify its owner
pub async fn comment_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() || payload.comment.is_empty() {
        return Err(ApiError::InvalidInput(
            "Username and comment are required".to_string(),
        ));
    }

    let post = state
        .post_repository
        .comment(id, &payload.username, &payload.comment)
        .await?;

    state
        .notification_repository
        .record(
            NotificationType::Comment,
            &payload.username,
            &post.username,
            Some(post.id),
        )
        .await?;

    Ok(Json(post))
}

/// Share a post (idempotent, no notification)
pub async fn share_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UsernameBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() {
        return Err(ApiError::InvalidInput("Username is required".to_string()));
    }

    let post = state.post_repository.share(id, &payload.username).await?;

    Ok(Json(post))
}

/// Save a post (idempotent, no notification)
pub async fn save_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UsernameBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() {
        return Err(ApiError::InvalidInput("Username is required".to_string()));
    }

    let post = state.post_repository.save(id, &payload.username).await?;

    Ok(Json(post))
}

/// Apply a partial update to a post
///
/// Replacing the media destroys the old blob first; that cleanup is
/// best-effort and a failure does not block the replacement.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_post_form(multipart).await?;

    let existing = state
        .post_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let media = match form.media {
        Some(upload) => {
            if let Some(public_id) = &existing.media_public_id {
                if let Err(e) = state.media_store.destroy(public_id).await {
                    warn!("Failed to delete replaced media {}: {}", public_id, e);
                }
            }
            Some(upload_media(&state, &upload).await?)
        }
        None => None,
    };

    let update = PostUpdate {
        title: form.title,
        description: form.description,
        username: form.username,
        media,
    };
    let post = state.post_repository.update(id, &update).await?;

    Ok(Json(post))
}

/// Delete a post and its media blob
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .post_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if let Some(public_id) = &post.media_public_id {
        if let Err(e) = state.media_store.destroy(public_id).await {
            warn!("Failed to delete media {}: {}", public_id, e);
        }
    }

    state.post_repository.delete(id).await?;

    Ok(Json(json!({"message": "Post deleted successfully"})))
}

pub(crate) async fn upload_media(
    state: &AppState,
    upload: &MediaUpload,
) -> ApiResult<MediaHandle> {
    state.media_store.upload(upload).await.map_err(|e| {
        error!("Failed to upload media: {}", e);
        ApiError::InternalServerError
    })
}

/// Collect the create/update post fields from a multipart form
async fn read_post_form(mut multipart: Multipart) -> ApiResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::InvalidInput(format!("Invalid multipart form: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => {
                form.title = Some(text_field(field).await?);
            }
            "description" => {
                form.description = Some(text_field(field).await?);
            }
            "username" => {
                form.username = Some(text_field(field).await?);
            }
            "media" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::InvalidInput(format!("Invalid multipart form: {}", e))
                })?;

                form.media = Some(MediaUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Invalid multipart form: {}", e)))
}
