//! User repository for database operations

use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, UpdateUser, User};

const USER_COLUMNS: &str = "id, username, password_hash, firstname, lastname, email, \
                            referral_code, created_at, updated_at, deleted_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new user. The password must already be hashed.
    pub async fn create(&self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO users (id, username, password_hash, firstname, lastname, email,
                               referral_code, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.password_hash)
            .bind(&new_user.firstname)
            .bind(&new_user.lastname)
            .bind(&new_user.email)
            .bind(&new_user.referral_code)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Whether a username is already claimed, including by deleted accounts
    pub async fn username_taken(&self, username: &str) -> DatabaseResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::query)?;

        Ok(count > 0)
    }

    /// Find an active user by username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE username = ? AND deleted_at IS NULL",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Find an active user by ID
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE id = ? AND deleted_at IS NULL",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Replace the profile fields of an active user
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &UpdateUser,
    ) -> DatabaseResult<Option<User>> {
        info!("Updating profile for user: {}", id);

        let query = format!(
            r#"
            UPDATE users
            SET firstname = ?, lastname = ?, email = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&update.firstname)
            .bind(&update.lastname)
            .bind(&update.email)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Mark a user as deleted. The row is kept.
    pub async fn soft_delete(&self, id: Uuid) -> DatabaseResult<bool> {
        info!("Deleting user: {}", id);

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::query)?;

        Ok(result.rows_affected() > 0)
    }
}
