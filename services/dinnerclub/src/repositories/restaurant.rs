//! Restaurant repository for database operations
//!
//! Restaurants are never created directly. They appear when an entry names
//! them and disappear when the last entry naming them goes away, so the
//! write side lives in connection-level helpers used inside entry
//! transactions.

use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::models::{EntryFields, Pagination, Restaurant};

const RESTAURANT_COLUMNS: &str = "id, name, location, cuisine, closed, address, website_url, \
                                  reservations_url, menu_url, phone_number, created_at, updated_at";

/// Restaurant repository
#[derive(Clone)]
pub struct RestaurantRepository {
    pool: SqlitePool,
}

impl RestaurantRepository {
    /// Create a new restaurant repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Total number of restaurants
    pub async fn count(&self) -> DatabaseResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// One page of restaurants, alphabetical
    pub async fn list(&self, pagination: &Pagination) -> DatabaseResult<Vec<Restaurant>> {
        let query = format!(
            "SELECT {} FROM restaurants ORDER BY name COLLATE NOCASE LIMIT ? OFFSET ?",
            RESTAURANT_COLUMNS
        );

        sqlx::query_as::<_, Restaurant>(&query)
            .bind(pagination.per_page)
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Find a restaurant by ID
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Restaurant>> {
        let query = format!("SELECT {} FROM restaurants WHERE id = ?", RESTAURANT_COLUMNS);

        sqlx::query_as::<_, Restaurant>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }
}

/// Return the id of the restaurant named by an entry, creating it if needed.
/// Names match case-insensitively.
pub(crate) async fn find_or_create(
    conn: &mut SqliteConnection,
    fields: &EntryFields,
) -> DatabaseResult<Uuid> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM restaurants WHERE name = ? COLLATE NOCASE")
            .bind(&fields.name)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DatabaseError::query)?;

    if let Some(id) = existing {
        return Ok(id);
    }

    info!("Creating new restaurant: {}", fields.name);

    let id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO restaurants (id, name, location, cuisine, closed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&fields.name)
    .bind(&fields.location)
    .bind(&fields.cuisine)
    .bind(fields.closed)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;

    Ok(id)
}

/// Delete a restaurant that no entry references any more
pub(crate) async fn delete_if_orphaned(
    conn: &mut SqliteConnection,
    restaurant_id: Uuid,
) -> DatabaseResult<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM restaurants
        WHERE id = ?
          AND NOT EXISTS (SELECT 1 FROM entries WHERE restaurant_id = ?)
        "#,
    )
    .bind(restaurant_id)
    .bind(restaurant_id)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;

    if result.rows_affected() > 0 {
        info!("Removed restaurant with no remaining entries: {}", restaurant_id);
    }

    Ok(result.rows_affected() > 0)
}
