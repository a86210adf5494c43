//! Shared helpers for repository and handler tests against a live PostgreSQL instance

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, header};
use common::database::{DatabaseConfig, init_pool};
use sqlx::PgPool;

use crate::media_store::{MediaHandle, MediaStore, MediaUpload};
use crate::repositories::UserRepository;
use crate::repositories::notifications::NotificationRepository;
use crate::repositories::posts::PostRepository;
use crate::repositories::spots::SpotRepository;
use crate::state::AppState;

/// Connect to the test database and apply migrations
pub async fn pool() -> PgPool {
    let config = DatabaseConfig::from_env().expect("database config");
    let pool = init_pool(&config).await.expect("database connection");
    crate::MIGRATOR.run(&pool).await.expect("migrations");
    pool
}

/// A collision-free name for test fixtures, short enough to pass
/// username validation
pub fn unique(prefix: &str) -> String {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &tag[..12])
}

/// Media store that keeps everything in-process, for handler tests
pub struct NullMediaStore;

#[async_trait]
impl MediaStore for NullMediaStore {
    async fn upload(&self, upload: &MediaUpload) -> Result<MediaHandle> {
        Ok(MediaHandle {
            url: format!("memory://{}", upload.filename),
            public_id: format!("memory/{}", upload.filename),
        })
    }

    async fn destroy(&self, _public_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Application state backed by the test database and a [`NullMediaStore`]
pub async fn app_state() -> AppState {
    let pool = pool().await;
    AppState {
        db_pool: pool.clone(),
        user_repository: UserRepository::new(pool.clone()),
        post_repository: PostRepository::new(pool.clone()),
        spot_repository: SpotRepository::new(pool.clone()),
        notification_repository: NotificationRepository::new(pool),
        media_store: Arc::new(NullMediaStore),
    }
}

/// Build a JSON request for driving the router in tests
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}
