//! Post repository: feed queries and idempotent engagement actions

use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::error;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::media_store::MediaHandle;
use crate::models::post::{Comment, Post};

const POST_COLUMNS: &str = "id, title, description, media_url, media_public_id, username, \
     likes, liked_by, comments, shares, shared_by, saved_by, created_at";

pub(crate) fn post_from_row(row: &PgRow) -> ApiResult<Post> {
    let comments: serde_json::Value = row.get("comments");
    let comments: Vec<Comment> = serde_json::from_value(comments).map_err(|e| {
        error!("Malformed comments column: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        media_url: row.get("media_url"),
        media_public_id: row.get("media_public_id"),
        username: row.get("username"),
        likes: row.get("likes"),
        liked_by: row.get("liked_by"),
        comments,
        shares: row.get("shares"),
        shared_by: row.get("shared_by"),
        saved_by: row.get("saved_by"),
        created_at: row.get("created_at"),
    })
}

/// Fields for creating a post
#[derive(Debug)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub username: String,
    pub media: Option<MediaHandle>,
}

/// Partial fields for updating a post
#[derive(Debug, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub username: Option<String>,
    pub media: Option<MediaHandle>,
}

/// Post repository for database operations
#[derive(Clone)]
pub struct PostRepository {
    pool: PgPool,
}

impl PostRepository {
    /// Create a new post repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub async fn create(&self, new_post: &NewPost) -> ApiResult<Post> {
        let (media_url, media_public_id) = match &new_post.media {
            Some(handle) => (Some(handle.url.as_str()), Some(handle.public_id.as_str())),
            None => (None, None),
        };

        let row = sqlx::query(&format!(
            "INSERT INTO posts (title, description, username, media_url, media_public_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&new_post.title)
        .bind(&new_post.description)
        .bind(&new_post.username)
        .bind(media_url)
        .bind(media_public_id)
        .fetch_one(&self.pool)
        .await?;

        post_from_row(&row)
    }

    /// Get posts, newest first
    pub async fn get_all(&self, limit: i64, offset: i64) -> ApiResult<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(post_from_row).collect()
    }

    /// Get all posts by a user, newest first
    pub async fn by_username(&self, username: &str) -> ApiResult<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE username = $1
             ORDER BY created_at DESC"
        ))
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(post_from_row).collect()
    }

    /// Find a post by ID
    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// Like a post on behalf of `username`
    ///
    /// The increment and the set insert happen in one conditional UPDATE so
    /// that `likes == |liked_by|` holds even under concurrent duplicates.
    /// Fails with `AlreadyDone` when the actor has already liked the post.
    pub async fn like(&self, id: Uuid, username: &str) -> ApiResult<Post> {
        let row = sqlx::query(&format!(
            "UPDATE posts
             SET likes = likes + 1, liked_by = array_append(liked_by, $2)
             WHERE id = $1 AND NOT ($2 = ANY(liked_by))
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => post_from_row(&row),
            None => {
                if self.exists(id).await? {
                    Err(ApiError::AlreadyDone(
                        "User has already liked this post".to_string(),
                    ))
                } else {
                    Err(ApiError::NotFound("Post not found".to_string()))
                }
            }
        }
    }

    /// Append a comment to a post
    pub async fn comment(&self, id: Uuid, username: &str, text: &str) -> ApiResult<Post> {
        let entry = Comment {
            username: username.to_string(),
            comment: text.to_string(),
            date: Utc::now(),
        };
        let entry = serde_json::json!([entry]);

        let row = sqlx::query(&format!(
            "UPDATE posts
             SET comments = comments || $2
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(entry)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

        post_from_row(&row)
    }

    /// Share a post (no-op if the actor has already shared it)
    pub async fn share(&self, id: Uuid, username: &str) -> ApiResult<Post> {
        let row = sqlx::query(&format!(
            "UPDATE posts
             SET shares = shares + 1, shared_by = array_append(shared_by, $2)
             WHERE id = $1 AND NOT ($2 = ANY(shared_by))
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => post_from_row(&row),
            None => self
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Post not found".to_string())),
        }
    }

    /// Save a post for a user (no-op if already saved)
    pub async fn save(&self, id: Uuid, username: &str) -> ApiResult<Post> {
        let row = sqlx::query(&format!(
            "UPDATE posts
             SET saved_by = array_append(saved_by, $2)
             WHERE id = $1 AND NOT ($2 = ANY(saved_by))
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => post_from_row(&row),
            None => self
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Post not found".to_string())),
        }
    }

    /// Apply a partial update to a post
    pub async fn update(&self, id: Uuid, update: &PostUpdate) -> ApiResult<Post> {
        let (media_url, media_public_id) = match &update.media {
            Some(handle) => (Some(handle.url.as_str()), Some(handle.public_id.as_str())),
            None => (None, None),
        };

        let row = sqlx::query(&format!(
            "UPDATE posts
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 username = COALESCE($4, username),
                 media_url = COALESCE($5, media_url),
                 media_public_id = COALESCE($6, media_public_id)
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.username.as_deref())
        .bind(media_url)
        .bind(media_public_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

        post_from_row(&row)
    }

    /// Delete a post
    pub async fn delete(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }

    async fn exists(&self, id: Uuid) -> ApiResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    async fn create_post(repo: &PostRepository, username: &str) -> Post {
        repo.create(&NewPost {
            title: "Blue Hole".to_string(),
            description: "Steep wall, strong current".to_string(),
            username: username.to_string(),
            media: None,
        })
        .await
        .expect("create post")
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_like_counts_match_set_and_duplicate_is_rejected() {
        let repo = PostRepository::new(test_support::pool().await);
        let owner = test_support::unique("alice");
        let post = create_post(&repo, &owner).await;

        let liked = repo.like(post.id, "bob").await.expect("first like");
        assert_eq!(liked.likes, 1);
        assert_eq!(liked.liked_by, vec!["bob".to_string()]);
        assert_eq!(liked.likes as usize, liked.liked_by.len());

        let second = repo.like(post.id, "bob").await;
        assert!(matches!(second, Err(ApiError::AlreadyDone(_))));

        let unchanged = repo.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.likes, 1);
        assert_eq!(unchanged.likes as usize, unchanged.liked_by.len());
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_like_missing_post_is_not_found() {
        let repo = PostRepository::new(test_support::pool().await);

        let result = repo.like(Uuid::new_v4(), "bob").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_share_twice_increments_once() {
        let repo = PostRepository::new(test_support::pool().await);
        let owner = test_support::unique("alice");
        let post = create_post(&repo, &owner).await;

        let shared = repo.share(post.id, "bob").await.expect("first share");
        assert_eq!(shared.shares, 1);

        let again = repo.share(post.id, "bob").await.expect("second share");
        assert_eq!(again.shares, 1);
        assert_eq!(again.shares as usize, again.shared_by.len());
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_save_is_idempotent() {
        let repo = PostRepository::new(test_support::pool().await);
        let owner = test_support::unique("alice");
        let post = create_post(&repo, &owner).await;

        repo.save(post.id, "bob").await.expect("first save");
        let again = repo.save(post.id, "bob").await.expect("second save");
        assert_eq!(again.saved_by, vec!["bob".to_string()]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_comments_append_in_order() {
        let repo = PostRepository::new(test_support::pool().await);
        let owner = test_support::unique("alice");
        let post = create_post(&repo, &owner).await;

        repo.comment(post.id, "bob", "Saw a turtle").await.unwrap();
        let post = repo.comment(post.id, "carol", "Nice wall").await.unwrap();

        assert_eq!(post.comments.len(), 2);
        assert_eq!(post.comments[0].username, "bob");
        assert_eq!(post.comments[1].comment, "Nice wall");
    }
}
