//! Dive spot entity and request payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media_store::MediaHandle;

/// A registered dive spot
///
/// `number` is the human-facing spot number and is unique across all spots.
/// `fish` is an append-only list and deliberately not deduplicated; the
/// per-actor sets (`liked_by`, `disliked_by`, `users_interested`) are.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiveSpot {
    pub id: Uuid,
    pub number: i32,
    pub name: String,
    pub location: String,
    pub description: String,
    pub fish: Vec<String>,
    pub images: Vec<MediaHandle>,
    pub likes: i32,
    pub liked_by: Vec<String>,
    pub dislikes: i32,
    pub disliked_by: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub users_interested: Vec<String>,
}

/// Request for creating a dive spot
///
/// All fields are optional at the serde level so that missing ones can be
/// reported as a 400 with a message instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateSpotRequest {
    pub number: Option<i32>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub fish: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Body for adding a fish sighting to a spot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishBody {
    pub fish_name: String,
}

/// Body for registering interest in a spot
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestBody {
    pub user_name: String,
}
