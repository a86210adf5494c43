use anyhow::Result;
use aws_config::BehaviorVersion;
use sqlx::migrate::Migrator;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod media_store;
mod models;
mod repositories;
mod routes;
mod state;
#[cfg(test)]
mod test_support;
mod validation;

use common::database::{DatabaseConfig, init_pool, run_migrations};

use crate::{
    media_store::{S3MediaStore, S3MediaStoreConfig},
    repositories::{
        UserRepository, notifications::NotificationRepository, posts::PostRepository,
        spots::SpotRepository,
    },
    state::AppState,
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, &MIGRATOR).await?;

    // Initialize the blob store for uploaded media
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let media_store = S3MediaStore::new(s3_client, S3MediaStoreConfig::from_env());

    info!("API service initialized successfully");

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let post_repository = PostRepository::new(pool.clone());
    let spot_repository = SpotRepository::new(pool.clone());
    let notification_repository = NotificationRepository::new(pool.clone());

    let app_state = AppState {
        db_pool: pool,
        user_repository,
        post_repository,
        spot_repository,
        notification_repository,
        media_store: Arc::new(media_store),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    info!("API service listening on 0.0.0.0:3001");

    axum::serve(listener, app).await?;

    Ok(())
}
