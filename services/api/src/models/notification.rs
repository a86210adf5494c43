//! Notification entity and fan-out types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::post::Post;

/// The social actions that fan out into notifications
///
/// Shares, saves, interest registrations, fish sightings, and dislikes are
/// deliberately silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "Like",
            NotificationType::Comment => "Comment",
            NotificationType::Follow => "Follow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Like" => Some(NotificationType::Like),
            "Comment" => Some(NotificationType::Comment),
            "Follow" => Some(NotificationType::Follow),
            _ => None,
        }
    }
}

/// A write-once notification record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub action_username: String,
    pub post_owner: String,
    pub type_of: NotificationType,
    #[serde(rename = "idPost")]
    pub post_id: Option<Uuid>,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Derive a stable id from (action, actor, target)
    ///
    /// Likes and follows are idempotent per actor, so re-emitting their
    /// notification after a crashed composite step must not create a second
    /// record; an `ON CONFLICT DO NOTHING` insert keyed on this id makes the
    /// fan-out retry-safe. Comments are distinct events and use random ids.
    pub fn deterministic_id(type_of: NotificationType, actor: &str, target: &str) -> Uuid {
        let key = format!("{}:{}:{}", type_of.as_str(), actor, target);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}

/// A notification joined with the post it references, if any
///
/// `post` is absent for follow notifications and for posts that have since
/// been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationWithPost {
    #[serde(flatten)]
    pub notification: Notification,
    pub post: Option<Post>,
}
