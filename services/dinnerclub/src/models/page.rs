//! Rendered page payloads and pagination

use serde::{Deserialize, Serialize};

/// Items shown per listing page
pub const PER_PAGE: i64 = 10;

/// A rendered page: the site-wide context plus page-specific data
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub citycode: String,
    pub is_logged_in: bool,
    pub messages: Vec<String>,
    pub data: T,
}

/// `?page=N` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Position of one page within a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Resolve the requested page against the total item count
    pub fn new(requested: Option<i64>, total: i64, per_page: i64) -> Result<Self, String> {
        let page = requested.unwrap_or(1);
        if page < 1 {
            return Err("Page must be 1 or greater".to_string());
        }
        if (page - 1).checked_mul(per_page).is_none() {
            return Err("Page is out of range".to_string());
        }

        let total_pages = (total + per_page - 1) / per_page;
        Ok(Self {
            page,
            per_page,
            total,
            total_pages,
        })
    }

    /// Row offset of the first item on this page
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// A page of items with its pagination metadata
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
