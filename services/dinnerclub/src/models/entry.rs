//! Entry (restaurant visit) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{
    FieldError, Validator, non_blank, validate_length, validate_rating, validate_required,
};

/// Entry entity, joined with its submitter's username
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Entry {
    pub id: Uuid,
    pub submitter_id: Uuid,
    pub submitter: String,
    pub restaurant_id: Uuid,
    pub name: String,
    pub location: String,
    pub cuisine: String,
    pub visited: bool,
    pub closed: bool,
    pub meal_service: Option<String>,
    pub ordered: Option<String>,
    pub food_rating: i64,
    pub ambience_rating: i64,
    pub value_rating: i64,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry form as posted by the browser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub visited: bool,
    #[serde(default)]
    pub closed: bool,
    pub meal_service: Option<String>,
    pub ordered: Option<String>,
    #[serde(default)]
    pub food_rating: i64,
    #[serde(default)]
    pub ambience_rating: i64,
    #[serde(default)]
    pub value_rating: i64,
    pub comments: Option<String>,
}

/// Validated entry content, shared by create and update
#[derive(Debug, Clone)]
pub struct EntryFields {
    pub name: String,
    pub location: String,
    pub cuisine: String,
    pub visited: bool,
    pub closed: bool,
    pub meal_service: Option<String>,
    pub ordered: Option<String>,
    pub food_rating: i64,
    pub ambience_rating: i64,
    pub value_rating: i64,
    pub comments: Option<String>,
}

/// New entry creation payload
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub submitter_id: Uuid,
    pub fields: EntryFields,
}

impl EntryForm {
    /// Validate the form and normalize blank optional values
    pub fn validate(self) -> Result<EntryFields, Vec<FieldError>> {
        let meal_service = non_blank(self.meal_service);
        let ordered = non_blank(self.ordered);
        let comments = non_blank(self.comments);

        Validator::new()
            .check("name", validate_required(&self.name, "Name"))
            .check("location", validate_required(&self.location, "Location"))
            .check("cuisine", validate_required(&self.cuisine, "Cuisine"))
            .check(
                "meal_service",
                validate_length(meal_service.as_deref(), "Meal service"),
            )
            .check("ordered", validate_length(ordered.as_deref(), "Ordered"))
            .check("food_rating", validate_rating(self.food_rating, "Food rating"))
            .check(
                "ambience_rating",
                validate_rating(self.ambience_rating, "Ambience rating"),
            )
            .check(
                "value_rating",
                validate_rating(self.value_rating, "Value rating"),
            )
            .finish()?;

        Ok(EntryFields {
            name: self.name.trim().to_string(),
            location: self.location.trim().to_string(),
            cuisine: self.cuisine.trim().to_string(),
            visited: self.visited,
            closed: self.closed,
            meal_service,
            ordered,
            food_rating: self.food_rating,
            ambience_rating: self.ambience_rating,
            value_rating: self.value_rating,
            comments,
        })
    }
}
