//! Schema management for the dinnerclub service
//!
//! The schema is derived from the table descriptions below at startup.
//! Missing tables and indexes are created and missing columns are added to
//! existing tables. Nothing is ever dropped or altered in place.

use common::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use tracing::info;

struct Table {
    name: &'static str,
    columns: &'static [(&'static str, &'static str)],
}

const TABLES: &[Table] = &[
    Table {
        name: "users",
        columns: &[
            ("id", "BLOB PRIMARY KEY NOT NULL"),
            ("username", "TEXT NOT NULL"),
            ("password_hash", "TEXT NOT NULL"),
            ("firstname", "TEXT"),
            ("lastname", "TEXT"),
            ("email", "TEXT"),
            ("referral_code", "TEXT"),
            ("created_at", "TEXT NOT NULL"),
            ("updated_at", "TEXT NOT NULL"),
            ("deleted_at", "TEXT"),
        ],
    },
    Table {
        name: "restaurants",
        columns: &[
            ("id", "BLOB PRIMARY KEY NOT NULL"),
            ("name", "TEXT NOT NULL"),
            ("location", "TEXT NOT NULL DEFAULT ''"),
            ("cuisine", "TEXT NOT NULL DEFAULT ''"),
            ("closed", "INTEGER NOT NULL DEFAULT 0"),
            ("address", "TEXT"),
            ("website_url", "TEXT"),
            ("reservations_url", "TEXT"),
            ("menu_url", "TEXT"),
            ("phone_number", "TEXT"),
            ("created_at", "TEXT NOT NULL"),
            ("updated_at", "TEXT NOT NULL"),
        ],
    },
    Table {
        name: "entries",
        columns: &[
            ("id", "BLOB PRIMARY KEY NOT NULL"),
            ("submitter_id", "BLOB NOT NULL REFERENCES users(id)"),
            ("restaurant_id", "BLOB NOT NULL REFERENCES restaurants(id)"),
            ("name", "TEXT NOT NULL"),
            ("location", "TEXT NOT NULL DEFAULT ''"),
            ("cuisine", "TEXT NOT NULL DEFAULT ''"),
            ("visited", "INTEGER NOT NULL DEFAULT 0"),
            ("closed", "INTEGER NOT NULL DEFAULT 0"),
            ("meal_service", "TEXT"),
            ("ordered", "TEXT"),
            ("food_rating", "INTEGER NOT NULL DEFAULT 0"),
            ("ambience_rating", "INTEGER NOT NULL DEFAULT 0"),
            ("value_rating", "INTEGER NOT NULL DEFAULT 0"),
            ("comments", "TEXT"),
            ("created_at", "TEXT NOT NULL"),
            ("updated_at", "TEXT NOT NULL"),
        ],
    },
];

/// Value given to existing rows when a NOT NULL timestamp column is added
const EPOCH: &str = "1970-01-01T00:00:00+00:00";

const INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS users_username ON users (username)",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email ON users (email)",
    "CREATE UNIQUE INDEX IF NOT EXISTS restaurants_name ON restaurants (name COLLATE NOCASE)",
    "CREATE INDEX IF NOT EXISTS entries_submitter_id ON entries (submitter_id)",
    "CREATE INDEX IF NOT EXISTS entries_restaurant_id ON entries (restaurant_id)",
];

/// Bring the schema up to date with the in-process data model
pub async fn migrate_schema(pool: &SqlitePool) -> DatabaseResult<()> {
    for table in TABLES {
        create_table(pool, table).await?;
        add_missing_columns(pool, table).await?;
    }

    for index in INDEXES {
        execute(pool, index).await?;
    }

    info!("Successfully migrated all database schemas");
    Ok(())
}

async fn create_table(pool: &SqlitePool, table: &Table) -> DatabaseResult<()> {
    let columns = table
        .columns
        .iter()
        .map(|(name, definition)| format!("{} {}", name, definition))
        .collect::<Vec<_>>()
        .join(", ");

    let statement = format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name, columns);
    execute(pool, &statement).await
}

async fn add_missing_columns(pool: &SqlitePool, table: &Table) -> DatabaseResult<()> {
    let existing: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
        .bind(table.name)
        .fetch_all(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    for (name, definition) in table.columns {
        if existing.iter().any(|column| column == name) {
            continue;
        }

        info!("Adding column {}.{}", table.name, name);
        let statement = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table.name,
            name,
            added_column_definition(name, definition)
        );
        execute(pool, &statement).await?;
    }

    Ok(())
}

/// Column definition usable with `ALTER TABLE ... ADD COLUMN`.
///
/// SQLite needs a non-NULL default to add a NOT NULL column to a table that
/// may already hold rows, and refuses a non-NULL default on a REFERENCES
/// column. Foreign keys are therefore added as nullable and other NOT NULL
/// columns get a backfill default.
fn added_column_definition(name: &str, definition: &str) -> String {
    if !definition.contains("NOT NULL") || definition.contains("DEFAULT") {
        return definition.to_string();
    }

    if definition.contains("REFERENCES") {
        return definition.replace("NOT NULL ", "");
    }

    if name.ends_with("_at") {
        format!("{} DEFAULT '{}'", definition, EPOCH)
    } else {
        format!("{} DEFAULT ''", definition)
    }
}

async fn execute(pool: &SqlitePool, statement: &str) -> DatabaseResult<()> {
    sqlx::query(statement)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("{}: {}", statement, e)))?;
    Ok(())
}
