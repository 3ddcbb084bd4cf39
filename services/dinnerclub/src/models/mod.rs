//! dinnerclub models

pub mod entry;
pub mod page;
pub mod restaurant;
pub mod user;

// Re-export for convenience
pub use entry::{Entry, EntryFields, EntryForm, NewEntry};
pub use page::{Page, PageQuery, Pagination, Paginated};
pub use restaurant::{Restaurant, RestaurantDetail};
pub use user::{LoginCredentials, NewUser, Registration, UpdateUser, User};
