//! Notification repository and fan-out
//!
//! Fan-out runs synchronously inside the triggering action. Records are
//! write-once: nothing here ever updates or deletes an existing notification
//! (account deletion removes a recipient's rows, but that lives with the
//! user repository).

use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::notification::{Notification, NotificationType, NotificationWithPost};
use crate::models::post::Post;
use crate::repositories::posts::post_from_row;

const NOTIFICATION_COLUMNS: &str = "id, action_username, post_owner, type_of, post_id, created_at";

fn notification_from_row(row: &PgRow) -> ApiResult<Notification> {
    let type_of: String = row.get("type_of");
    let type_of = NotificationType::parse(&type_of).ok_or_else(|| {
        error!("Unknown notification type: {}", type_of);
        ApiError::InternalServerError
    })?;

    Ok(Notification {
        id: row.get("id"),
        action_username: row.get("action_username"),
        post_owner: row.get("post_owner"),
        type_of,
        post_id: row.get("post_id"),
        created_at: row.get("created_at"),
    })
}

/// Notification repository for database operations
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new notification repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a notification derived from a social action
    ///
    /// Like and Follow use a deterministic id over (action, actor, target)
    /// and `ON CONFLICT DO NOTHING`, so re-running the fan-out after a
    /// crashed composite step cannot produce a duplicate. Comments are
    /// distinct events and always get a fresh id.
    pub async fn record(
        &self,
        type_of: NotificationType,
        action_username: &str,
        post_owner: &str,
        post_id: Option<Uuid>,
    ) -> ApiResult<()> {
        let id = match type_of {
            NotificationType::Comment => Uuid::new_v4(),
            NotificationType::Like | NotificationType::Follow => {
                let target = post_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| post_owner.to_string());
                Notification::deterministic_id(type_of, action_username, &target)
            }
        };

        sqlx::query(
            "INSERT INTO notifications (id, action_username, post_owner, type_of, post_id)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(action_username)
        .bind(post_owner)
        .bind(type_of.as_str())
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user's notifications, newest first, joined with their posts
    ///
    /// The post is absent for follow notifications and for posts deleted
    /// since the notification was recorded.
    pub async fn for_user(
        &self,
        username: &str,
        limit: i64,
        offset: i64,
    ) -> ApiResult<Vec<NotificationWithPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE post_owner = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(username)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let notifications: Vec<Notification> =
            rows.iter().map(notification_from_row).collect::<ApiResult<_>>()?;

        let post_ids: Vec<Uuid> = notifications.iter().filter_map(|n| n.post_id).collect();
        let posts = self.posts_by_ids(&post_ids).await?;

        Ok(notifications
            .into_iter()
            .map(|notification| {
                let post = notification
                    .post_id
                    .and_then(|id| posts.get(&id))
                    .cloned();
                NotificationWithPost { notification, post }
            })
            .collect())
    }

    /// Get all notifications (auxiliary listing)
    pub async fn get_all(&self) -> ApiResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn posts_by_ids(&self, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Post>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT id, title, description, media_url, media_public_id, username,
                    likes, liked_by, comments, shares, shared_by, saved_by, created_at
             FROM posts
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| post_from_row(row).map(|post| (post.id, post)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::posts::{NewPost, PostRepository};
    use crate::test_support;

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_like_fanout_records_exactly_one_notification() {
        let pool = test_support::pool().await;
        let repo = NotificationRepository::new(pool.clone());
        let owner = test_support::unique("alice");
        let post_id = Uuid::new_v4();

        // Re-emission after a crashed composite step must be a no-op.
        repo.record(NotificationType::Like, "bob", &owner, Some(post_id))
            .await
            .unwrap();
        repo.record(NotificationType::Like, "bob", &owner, Some(post_id))
            .await
            .unwrap();

        let notifications = repo.for_user(&owner, 100, 0).await.unwrap();
        assert_eq!(notifications.len(), 1);
        let n = &notifications[0].notification;
        assert_eq!(n.action_username, "bob");
        assert_eq!(n.post_owner, owner);
        assert_eq!(n.type_of, NotificationType::Like);
        assert_eq!(n.post_id, Some(post_id));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_comment_notifications_are_distinct_events() {
        let pool = test_support::pool().await;
        let repo = NotificationRepository::new(pool.clone());
        let owner = test_support::unique("alice");

        let post_id = Uuid::new_v4();
        repo.record(NotificationType::Comment, "bob", &owner, Some(post_id))
            .await
            .unwrap();
        repo.record(NotificationType::Comment, "bob", &owner, Some(post_id))
            .await
            .unwrap();

        let notifications = repo.for_user(&owner, 100, 0).await.unwrap();
        assert_eq!(notifications.len(), 2);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_for_user_joins_existing_posts_only() {
        let pool = test_support::pool().await;
        let repo = NotificationRepository::new(pool.clone());
        let post_repo = PostRepository::new(pool.clone());
        let owner = test_support::unique("alice");

        let post = post_repo
            .create(&NewPost {
                title: "Night dive".to_string(),
                description: String::new(),
                username: owner.clone(),
                media: None,
            })
            .await
            .unwrap();

        repo.record(NotificationType::Like, "bob", &owner, Some(post.id))
            .await
            .unwrap();
        repo.record(NotificationType::Follow, "carol", &owner, None)
            .await
            .unwrap();
        repo.record(NotificationType::Like, "dave", &owner, Some(Uuid::new_v4()))
            .await
            .unwrap();

        let notifications = repo.for_user(&owner, 100, 0).await.unwrap();
        assert_eq!(notifications.len(), 3);

        for entry in &notifications {
            match (entry.notification.post_id, &entry.post) {
                (Some(id), Some(joined)) => assert_eq!(joined.id, id),
                (Some(id), None) => assert_ne!(id, post.id, "existing post must be joined"),
                (None, post) => assert!(post.is_none()),
            }
        }

        // Newest first.
        let dates: Vec<_> = notifications
            .iter()
            .map(|n| n.notification.created_at)
            .collect();
        let mut sorted = dates.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, sorted);
    }
}
