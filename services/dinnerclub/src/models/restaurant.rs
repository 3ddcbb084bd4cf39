//! Restaurant model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::Entry;

/// Restaurant entity, created on demand from entries
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub cuisine: String,
    pub closed: bool,
    pub address: Option<String>,
    pub website_url: Option<String>,
    pub reservations_url: Option<String>,
    pub menu_url: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A restaurant together with the entries that reviewed it
#[derive(Debug, Serialize)]
pub struct RestaurantDetail {
    pub restaurant: Restaurant,
    pub entries: Vec<Entry>,
}
