//! Dive spot routes

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    media_store::MediaUpload,
    models::{
        UsernameBody,
        spot::{CreateSpotRequest, FishBody, InterestBody},
    },
    repositories::spots::NewSpot,
    routes::posts::upload_media,
    state::AppState,
};

/// Create a new dive spot
pub async fn create_spot(
    State(state): State<AppState>,
    Json(payload): Json<CreateSpotRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_spot = match payload {
        CreateSpotRequest {
            number: Some(number),
            name: Some(name),
            location: Some(location),
            description: Some(description),
            fish,
            latitude: Some(latitude),
            longitude: Some(longitude),
        } if !name.is_empty() && !location.is_empty() => NewSpot {
            number,
            name,
            location,
            description,
            fish,
            latitude,
            longitude,
        },
        _ => {
            return Err(ApiError::InvalidInput(
                "All fields are required".to_string(),
            ));
        }
    };

    let spot = state.spot_repository.create(&new_spot).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "New dive spot successful",
            "spotId": spot.id,
        })),
    ))
}

/// Get all dive spots
pub async fn get_spots(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let spots = state.spot_repository.get_all().await?;

    Ok(Json(spots))
}

/// Get a dive spot by ID
pub async fn get_spot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let spot = state
        .spot_repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dive spot not found".to_string()))?;

    Ok(Json(spot))
}

/// Record a fish sighting at a spot
///
/// The fish list is append-only and not deduplicated: two sightings of the
/// same species are two entries.
pub async fn add_fish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FishBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.fish_name.is_empty() {
        return Err(ApiError::InvalidInput("Fish name is required".to_string()));
    }

    let fish = state.spot_repository.add_fish(id, &payload.fish_name).await?;

    Ok(Json(fish))
}

/// Upload a photo for a spot and append its handle to the image list
pub async fn add_photo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload: Option<MediaUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::InvalidInput(format!("Invalid multipart form: {}", e))
    })? {
        if field.name() == Some("photo") {
            let filename = field.file_name().unwrap_or("photo").to_string();
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field.bytes().await.map_err(|e| {
                ApiError::InvalidInput(format!("Invalid multipart form: {}", e))
            })?;

            upload = Some(MediaUpload {
                filename,
                content_type,
                bytes,
            });
        }
    }

    let upload = upload.ok_or_else(|| ApiError::InvalidInput("No file uploaded".to_string()))?;
    let handle = upload_media(&state, &upload).await?;

    match state.spot_repository.add_image(id, &handle).await {
        Ok(_) => Ok(Json(handle)),
        Err(e) => {
            // The blob went up before we knew the spot was missing.
            if let Err(cleanup) = state.media_store.destroy(&handle.public_id).await {
                warn!("Failed to clean up orphaned photo {}: {}", handle.public_id, cleanup);
            }
            Err(e)
        }
    }
}

/// Like a dive spot (idempotent per actor, no notification)
pub async fn like_spot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UsernameBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() {
        return Err(ApiError::InvalidInput("Username is required".to_string()));
    }

    let spot = state.spot_repository.like(id, &payload.username).await?;

    Ok(Json(spot))
}

/// Dislike a dive spot (idempotent per actor, no notification)
pub async fn dislike_spot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UsernameBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.username.is_empty() {
        return Err(ApiError::InvalidInput("Username is required".to_string()));
    }

    let spot = state.spot_repository.dislike(id, &payload.username).await?;

    Ok(Json(spot))
}

/// Register a user's interest in a spot
pub async fn register_interest(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InterestBody>,
) -> ApiResult<impl IntoResponse> {
    if payload.user_name.is_empty() {
        return Err(ApiError::InvalidInput("User name is required".to_string()));
    }

    let spot = state
        .spot_repository
        .register_interest(id, &payload.user_name)
        .await?;

    Ok(Json(spot))
}

/// List the users interested in a spot
pub async fn list_interested(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let users = state.spot_repository.interested_users(id).await?;

    Ok(Json(users))
}
