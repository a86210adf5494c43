//! API models for request and response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod notification;
pub mod post;
pub mod spot;

/// User entity
///
/// The password hash never leaves the service; `following` is the
/// insertion-ordered list of usernames this user follows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for user registration
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request for user sign-in
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Request for changing a user's password
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub username: String,
    pub current_password: String,
    pub new_password: String,
}

/// Request for account deletion
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub username: String,
}

/// Request for follow/unfollow actions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub current_user: String,
    pub target_user: String,
}

/// Body carrying only the acting username (like/share/save/dislike)
#[derive(Debug, Deserialize)]
pub struct UsernameBody {
    pub username: String,
}

/// Pagination query parameters shared by list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
}

impl PageQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp the raw query into (limit, offset) suitable for SQL
    pub fn clamp(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let offset = (page - 1) as i64 * limit as i64;
        (limit as i64, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults() {
        let query = PageQuery::default();
        assert_eq!(query.clamp(), (20, 0));
    }

    #[test]
    fn test_page_query_clamps_limit_and_page() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(query.clamp(), (100, 0));

        let query = PageQuery {
            page: Some(3),
            limit: Some(10),
        };
        assert_eq!(query.clamp(), (10, 20));
    }
}
