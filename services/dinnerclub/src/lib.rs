//! dinnerclub: a restaurant visit log for a small club
//!
//! Members register, log in and record their visits ("entries"); every entry
//! names a restaurant, which is created on first mention. Authentication is
//! carried by an encrypted session cookie, or by a bearer access token for
//! API clients.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use config::AppConfig;
pub use routes::create_router;
pub use state::AppState;
