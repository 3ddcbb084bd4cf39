//! Repositories for database operations

pub mod entry;
pub mod restaurant;
pub mod user;

pub use entry::EntryRepository;
pub use restaurant::RestaurantRepository;
pub use user::UserRepository;
