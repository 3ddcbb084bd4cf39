//! Entry repository for database operations

use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::restaurant::{delete_if_orphaned, find_or_create};
use crate::models::{Entry, EntryFields, NewEntry, Pagination};

const ENTRY_SELECT: &str = r#"
    SELECT e.id, e.submitter_id, submitter.username AS submitter, e.restaurant_id,
           e.name, e.location, e.cuisine, e.visited, e.closed, e.meal_service, e.ordered,
           e.food_rating, e.ambience_rating, e.value_rating, e.comments,
           e.created_at, e.updated_at
    FROM entries e
    JOIN users AS submitter ON submitter.id = e.submitter_id
"#;

/// Entry repository
#[derive(Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    /// Create a new entry repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new entry, linking it to its restaurant
    pub async fn create(&self, new_entry: &NewEntry) -> DatabaseResult<Entry> {
        info!("Creating new entry: {}", new_entry.fields.name);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::query)?;

        let restaurant_id = find_or_create(&mut tx, &new_entry.fields).await?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let fields = &new_entry.fields;
        sqlx::query(
            r#"
            INSERT INTO entries (id, submitter_id, restaurant_id, name, location, cuisine,
                                 visited, closed, meal_service, ordered, food_rating,
                                 ambience_rating, value_rating, comments, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(new_entry.submitter_id)
        .bind(restaurant_id)
        .bind(&fields.name)
        .bind(&fields.location)
        .bind(&fields.cuisine)
        .bind(fields.visited)
        .bind(fields.closed)
        .bind(&fields.meal_service)
        .bind(&fields.ordered)
        .bind(fields.food_rating)
        .bind(fields.ambience_rating)
        .bind(fields.value_rating)
        .bind(&fields.comments)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::query)?;

        let entry = fetch_entry(&mut tx, id)
            .await?
            .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound))?;

        tx.commit().await.map_err(DatabaseError::query)?;
        Ok(entry)
    }

    /// Find an entry by ID
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Entry>> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::query)?;
        fetch_entry(&mut conn, id).await
    }

    /// Total number of entries
    pub async fn count(&self) -> DatabaseResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// One page of entries, newest first
    pub async fn list(&self, pagination: &Pagination) -> DatabaseResult<Vec<Entry>> {
        let query = format!(
            "{} ORDER BY e.created_at DESC LIMIT ? OFFSET ?",
            ENTRY_SELECT
        );

        sqlx::query_as::<_, Entry>(&query)
            .bind(pagination.per_page)
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Every entry submitted by a user, newest first
    pub async fn list_by_submitter(&self, username: &str) -> DatabaseResult<Vec<Entry>> {
        let query = format!(
            "{} WHERE submitter.username = ? ORDER BY e.created_at DESC",
            ENTRY_SELECT
        );

        sqlx::query_as::<_, Entry>(&query)
            .bind(username)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Every entry that reviewed a restaurant, newest first
    pub async fn list_by_restaurant(&self, restaurant_id: Uuid) -> DatabaseResult<Vec<Entry>> {
        let query = format!(
            "{} WHERE e.restaurant_id = ? ORDER BY e.created_at DESC",
            ENTRY_SELECT
        );

        sqlx::query_as::<_, Entry>(&query)
            .bind(restaurant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::query)
    }

    /// Replace an entry's content. A changed name re-links the entry and may
    /// leave the previous restaurant orphaned, in which case it is removed.
    pub async fn update(&self, id: Uuid, fields: &EntryFields) -> DatabaseResult<Option<Entry>> {
        info!("Updating entry: {}", id);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::query)?;

        let previous: Option<Uuid> =
            sqlx::query_scalar("SELECT restaurant_id FROM entries WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DatabaseError::query)?;

        let Some(previous_restaurant) = previous else {
            return Ok(None);
        };

        let restaurant_id = find_or_create(&mut tx, fields).await?;

        sqlx::query(
            r#"
            UPDATE entries
            SET restaurant_id = ?, name = ?, location = ?, cuisine = ?, visited = ?, closed = ?,
                meal_service = ?, ordered = ?, food_rating = ?, ambience_rating = ?,
                value_rating = ?, comments = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(restaurant_id)
        .bind(&fields.name)
        .bind(&fields.location)
        .bind(&fields.cuisine)
        .bind(fields.visited)
        .bind(fields.closed)
        .bind(&fields.meal_service)
        .bind(&fields.ordered)
        .bind(fields.food_rating)
        .bind(fields.ambience_rating)
        .bind(fields.value_rating)
        .bind(&fields.comments)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::query)?;

        if previous_restaurant != restaurant_id {
            delete_if_orphaned(&mut tx, previous_restaurant).await?;
        }

        let entry = fetch_entry(&mut tx, id).await?;
        tx.commit().await.map_err(DatabaseError::query)?;
        Ok(entry)
    }

    /// Delete an entry, returning what was removed
    pub async fn delete(&self, id: Uuid) -> DatabaseResult<Option<Entry>> {
        info!("Deleting entry: {}", id);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::query)?;

        let Some(entry) = fetch_entry(&mut tx, id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::query)?;

        delete_if_orphaned(&mut tx, entry.restaurant_id).await?;

        tx.commit().await.map_err(DatabaseError::query)?;
        Ok(Some(entry))
    }
}

async fn fetch_entry(conn: &mut SqliteConnection, id: Uuid) -> DatabaseResult<Option<Entry>> {
    let query = format!("{} WHERE e.id = ?", ENTRY_SELECT);

    sqlx::query_as::<_, Entry>(&query)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::query)
}
