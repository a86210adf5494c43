//! Post entity and engagement payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A post in the community feed
///
/// The engagement counters are kept in lockstep with their sets:
/// `likes == liked_by.len()` and `shares == shared_by.len()` at all times.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub media_url: Option<String>,
    pub media_public_id: Option<String>,
    pub username: String,
    pub likes: i32,
    pub liked_by: Vec<String>,
    pub comments: Vec<Comment>,
    pub shares: i32,
    pub shared_by: Vec<String>,
    pub saved_by: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A single comment on a post, stored in insertion order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub username: String,
    pub comment: String,
    pub date: DateTime<Utc>,
}

/// Body for commenting on a post
#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub username: String,
    pub comment: String,
}

/// Fields collected from the multipart create/update post forms
#[derive(Debug, Default)]
pub struct PostForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub username: Option<String>,
    pub media: Option<crate::media_store::MediaUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_json_shape() {
        let comment = Comment {
            username: "alice".to_string(),
            comment: "Great visibility today".to_string(),
            date: Utc::now(),
        };

        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["username"], "alice");
        assert_eq!(value["comment"], "Great visibility today");
        assert!(value["date"].is_string());
    }

    #[test]
    fn test_post_serializes_camel_case() {
        let post = Post {
            id: Uuid::new_v4(),
            title: "Blue Hole".to_string(),
            description: String::new(),
            media_url: None,
            media_public_id: None,
            username: "alice".to_string(),
            likes: 1,
            liked_by: vec!["bob".to_string()],
            comments: vec![],
            shares: 0,
            shared_by: vec![],
            saved_by: vec![],
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["likedBy"][0], "bob");
        assert!(value.get("liked_by").is_none());
        assert_eq!(value["mediaUrl"], serde_json::Value::Null);
    }
}
