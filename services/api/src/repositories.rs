//! Repositories for database operations
//!
//! Every idempotency guard in here is a single conditional UPDATE keyed on
//! "actor not yet in the relevant set", so concurrent duplicate requests on
//! the same row serialize inside PostgreSQL and cannot double-count.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::models::User;

pub mod notifications;
pub mod posts;
pub mod spots;

/// True when the error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        following: row.get("following"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, following, created_at, updated_at";

/// User repository for account and social-graph operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a hashed credential
    ///
    /// Fails with `Conflict` when the username or email is already taken.
    pub async fn create(&self, username: &str, email: &str, password: &str) -> ApiResult<User> {
        info!("Creating new user: {}", username);

        let existing = sqlx::query("SELECT username FROM users WHERE username = $1 OR email = $2")
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = existing {
            let taken: String = row.get("username");
            let message = if taken == username {
                "Username already exists"
            } else {
                "Email already exists"
            };
            return Err(ApiError::Conflict(message.to_string()));
        }

        let password_hash = hash_password(password)?;

        let row = sqlx::query(&format!(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // The pre-check races with concurrent signups; the unique
            // constraint is the authoritative guard.
            if is_unique_violation(&e) {
                ApiError::Conflict("Username already exists".to_string())
            } else {
                e.into()
            }
        })?;

        Ok(user_from_row(&row))
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Verify a user's password against the stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> ApiResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
            error!("Failed to parse password hash: {}", e);
            ApiError::InternalServerError
        })?;

        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Replace a user's password hash
    pub async fn update_password(&self, username: &str, password: &str) -> ApiResult<()> {
        let password_hash = hash_password(password)?;

        sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE username = $1",
        )
        .bind(username)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete an account
    ///
    /// Posts are retained (the username stays on them as a plain reference);
    /// notifications addressed to the user are removed since nobody can read
    /// them anymore. Deleting an unknown username is a no-op.
    pub async fn delete(&self, username: &str) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            sqlx::query("DELETE FROM notifications WHERE post_owner = $1")
                .bind(username)
                .execute(&self.pool)
                .await?;
            info!("Deleted account: {}", username);
        }

        Ok(())
    }

    /// Add `target` to `current`'s following list
    ///
    /// Returns true when the edge was newly added, false when it already
    /// existed. Fails with `NotFound` when either user is absent.
    pub async fn follow(&self, current: &str, target: &str) -> ApiResult<bool> {
        self.require_user(target).await?;

        let result = sqlx::query(
            "UPDATE users
             SET following = array_append(following, $2), updated_at = now()
             WHERE username = $1 AND NOT ($2 = ANY(following))",
        )
        .bind(current)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Either the follower is unknown or the edge already exists.
        self.require_user(current).await?;
        Ok(false)
    }

    /// Remove `target` from `current`'s following list (no-op if absent)
    pub async fn unfollow(&self, current: &str, target: &str) -> ApiResult<()> {
        self.require_user(target).await?;

        let result = sqlx::query(
            "UPDATE users
             SET following = array_remove(following, $2), updated_at = now()
             WHERE username = $1",
        )
        .bind(current)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("User(s) not found".to_string()));
        }

        Ok(())
    }

    /// List the usernames a user follows, in insertion order
    pub async fn following(&self, username: &str) -> ApiResult<Vec<String>> {
        let row = sqlx::query("SELECT following FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(row.get("following"))
    }

    async fn require_user(&self, username: &str) -> ApiResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(())
        } else {
            Err(ApiError::NotFound("User(s) not found".to_string()))
        }
    }
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(hash.to_string())
}
