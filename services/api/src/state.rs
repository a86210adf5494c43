//! Application state shared across handlers

use sqlx::PgPool;
use std::sync::Arc;

use crate::media_store::MediaStore;
use crate::repositories::{
    UserRepository, notifications::NotificationRepository, posts::PostRepository,
    spots::SpotRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub user_repository: UserRepository,
    pub post_repository: PostRepository,
    pub spot_repository: SpotRepository,
    pub notification_repository: NotificationRepository,
    pub media_store: Arc<dyn MediaStore>,
}
