//! Dive spot repository

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::error;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::media_store::MediaHandle;
use crate::models::spot::DiveSpot;
use crate::repositories::is_unique_violation;

const SPOT_COLUMNS: &str = "id, number, name, location, description, fish, images, \
     likes, liked_by, dislikes, disliked_by, latitude, longitude, users_interested";

fn spot_from_row(row: &PgRow) -> ApiResult<DiveSpot> {
    let images: serde_json::Value = row.get("images");
    let images: Vec<MediaHandle> = serde_json::from_value(images).map_err(|e| {
        error!("Malformed images column: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(DiveSpot {
        id: row.get("id"),
        number: row.get("number"),
        name: row.get("name"),
        location: row.get("location"),
        description: row.get("description"),
        fish: row.get("fish"),
        images,
        likes: row.get("likes"),
        liked_by: row.get("liked_by"),
        dislikes: row.get("dislikes"),
        disliked_by: row.get("disliked_by"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        users_interested: row.get("users_interested"),
    })
}

/// Fields for creating a dive spot
#[derive(Debug)]
pub struct NewSpot {
    pub number: i32,
    pub name: String,
    pub location: String,
    pub description: String,
    pub fish: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Dive spot repository for database operations
#[derive(Clone)]
pub struct SpotRepository {
    pool: PgPool,
}

impl SpotRepository {
    /// Create a new dive spot repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new dive spot
    ///
    /// Fails with `Conflict` when a spot with the same number exists.
    pub async fn create(&self, new_spot: &NewSpot) -> ApiResult<DiveSpot> {
        let row = sqlx::query(&format!(
            "INSERT INTO dive_spots (number, name, location, description, fish, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SPOT_COLUMNS}"
        ))
        .bind(new_spot.number)
        .bind(&new_spot.name)
        .bind(&new_spot.location)
        .bind(&new_spot.description)
        .bind(&new_spot.fish)
        .bind(new_spot.latitude)
        .bind(new_spot.longitude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("Dive spot with this number already exists".to_string())
            } else {
                e.into()
            }
        })?;

        spot_from_row(&row)
    }

    /// Get all dive spots, ordered by spot number
    pub async fn get_all(&self) -> ApiResult<Vec<DiveSpot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SPOT_COLUMNS} FROM dive_spots ORDER BY number"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(spot_from_row).collect()
    }

    /// Find a dive spot by ID
    pub async fn find_by_id(&self, id: Uuid) -> ApiResult<Option<DiveSpot>> {
        let row = sqlx::query(&format!(
            "SELECT {SPOT_COLUMNS} FROM dive_spots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(spot_from_row).transpose()
    }

    /// Append a fish sighting (duplicates allowed by design)
    pub async fn add_fish(&self, id: Uuid, fish_name: &str) -> ApiResult<Vec<String>> {
        let row = sqlx::query(
            "UPDATE dive_spots
             SET fish = array_append(fish, $2)
             WHERE id = $1
             RETURNING fish",
        )
        .bind(id)
        .bind(fish_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dive spot not found".to_string()))?;

        Ok(row.get("fish"))
    }

    /// Append an uploaded photo handle to the spot's image list
    pub async fn add_image(&self, id: Uuid, handle: &MediaHandle) -> ApiResult<DiveSpot> {
        let entry = serde_json::json!([handle]);

        let row = sqlx::query(&format!(
            "UPDATE dive_spots
             SET images = images || $2
             WHERE id = $1
             RETURNING {SPOT_COLUMNS}"
        ))
        .bind(id)
        .bind(entry)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Dive spot not found".to_string()))?;

        spot_from_row(&row)
    }

    /// Like a spot on behalf of `username`
    ///
    /// Fails with `AlreadyDone` when the actor has already liked the spot.
    pub async fn like(&self, id: Uuid, username: &str) -> ApiResult<DiveSpot> {
        let row = sqlx::query(&format!(
            "UPDATE dive_spots
             SET likes = likes + 1, liked_by = array_append(liked_by, $2)
             WHERE id = $1 AND NOT ($2 = ANY(liked_by))
             RETURNING {SPOT_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => spot_from_row(&row),
            None => {
                if self.exists(id).await? {
                    Err(ApiError::AlreadyDone(
                        "User has already liked this dive spot".to_string(),
                    ))
                } else {
                    Err(ApiError::NotFound("Dive spot not found".to_string()))
                }
            }
        }
    }

    /// Dislike a spot (no-op if the actor has already disliked it)
    pub async fn dislike(&self, id: Uuid, username: &str) -> ApiResult<DiveSpot> {
        let row = sqlx::query(&format!(
            "UPDATE dive_spots
             SET dislikes = dislikes + 1, disliked_by = array_append(disliked_by, $2)
             WHERE id = $1 AND NOT ($2 = ANY(disliked_by))
             RETURNING {SPOT_COLUMNS}"
        ))
        .bind(id)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => spot_from_row(&row),
            None => self
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Dive spot not found".to_string())),
        }
    }

    /// Register a user's interest in a spot (no-op if already interested)
    pub async fn register_interest(&self, id: Uuid, user_name: &str) -> ApiResult<DiveSpot> {
        let row = sqlx::query(&format!(
            "UPDATE dive_spots
             SET users_interested = array_append(users_interested, $2)
             WHERE id = $1 AND NOT ($2 = ANY(users_interested))
             RETURNING {SPOT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => spot_from_row(&row),
            None => self
                .find_by_id(id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Dive spot not found".to_string())),
        }
    }

    /// List users interested in a spot
    pub async fn interested_users(&self, id: Uuid) -> ApiResult<Vec<String>> {
        let row = sqlx::query("SELECT users_interested FROM dive_spots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("Dive spot not found".to_string()))?;

        Ok(row.get("users_interested"))
    }

    async fn exists(&self, id: Uuid) -> ApiResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM dive_spots WHERE id = $1)")
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

    fn new_spot(number: i32) -> NewSpot {
        NewSpot {
            number,
            name: "Satil Wreck".to_string(),
            location: "Eilat".to_string(),
            description: "Missile boat wreck at 24m".to_string(),
            fish: vec![],
            latitude: 29.5,
            longitude: 34.9,
        }
    }

    async fn unique_number(pool: &sqlx::PgPool) -> i32 {
        // Spot numbers are small and human-facing; tests pick a free one.
        let max: Option<i32> = sqlx::query_scalar("SELECT MAX(number) FROM dive_spots")
            .fetch_one(pool)
            .await
            .expect("max spot number");
        max.unwrap_or(0) + 1
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_duplicate_spot_number_is_conflict() {
        let pool = test_support::pool().await;
        let repo = SpotRepository::new(pool.clone());
        let number = unique_number(&pool).await;

        repo.create(&new_spot(number)).await.expect("first spot");
        let duplicate = repo.create(&new_spot(number)).await;

        assert!(matches!(duplicate, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_fish_list_is_not_deduplicated() {
        let pool = test_support::pool().await;
        let repo = SpotRepository::new(pool.clone());
        let number = unique_number(&pool).await;
        let spot = repo.create(&new_spot(number)).await.unwrap();

        let fish = repo.add_fish(spot.id, "Clownfish").await.unwrap();
        assert_eq!(fish, vec!["Clownfish".to_string()]);

        let fish = repo.add_fish(spot.id, "Clownfish").await.unwrap();
        assert_eq!(fish, vec!["Clownfish".to_string(), "Clownfish".to_string()]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_interest_does_not_duplicate() {
        let pool = test_support::pool().await;
        let repo = SpotRepository::new(pool.clone());
        let number = unique_number(&pool).await;
        let spot = repo.create(&new_spot(number)).await.unwrap();

        repo.register_interest(spot.id, "bob").await.unwrap();
        let spot = repo.register_interest(spot.id, "bob").await.unwrap();

        assert_eq!(spot.users_interested, vec!["bob".to_string()]);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_spot_like_and_dislike_track_actors() {
        let pool = test_support::pool().await;
        let repo = SpotRepository::new(pool.clone());
        let number = unique_number(&pool).await;
        let spot = repo.create(&new_spot(number)).await.unwrap();

        let liked = repo.like(spot.id, "bob").await.unwrap();
        assert_eq!(liked.likes, 1);
        assert!(matches!(
            repo.like(spot.id, "bob").await,
            Err(ApiError::AlreadyDone(_))
        ));

        let disliked = repo.dislike(spot.id, "carol").await.unwrap();
        assert_eq!(disliked.dislikes, 1);
        let again = repo.dislike(spot.id, "carol").await.unwrap();
        assert_eq!(again.dislikes, 1);
        assert_eq!(again.dislikes as usize, again.disliked_by.len());
    }
}
