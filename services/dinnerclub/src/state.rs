//! Application state shared across handlers

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::jwt::TokenService;
use crate::middleware::SiteDefaults;
use crate::password::PasswordService;
use crate::repositories::{EntryRepository, RestaurantRepository, UserRepository};
use crate::session::SessionStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub auth: AuthService,
    pub tokens: TokenService,
    pub sessions: SessionStore,
    pub defaults: SiteDefaults,
    pub entry_repository: EntryRepository,
    pub restaurant_repository: RestaurantRepository,
}

impl AppState {
    /// Wire every service from a validated configuration
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Result<Self> {
        let tokens = TokenService::new(config.jwt.clone());
        let passwords =
            PasswordService::new(&config.password).context("Invalid password configuration")?;
        let sessions = SessionStore::new(
            &config.session_secret,
            config.session_ttl_seconds,
            config.secure_cookies,
        )
        .context("Invalid session configuration")?;

        let auth = AuthService::new(
            UserRepository::new(pool.clone()),
            passwords,
            tokens.clone(),
        );

        Ok(Self {
            defaults: SiteDefaults {
                citycode: config.normalized_city_code(),
                referralcode: config.referral_gate(),
            },
            entry_repository: EntryRepository::new(pool.clone()),
            restaurant_repository: RestaurantRepository::new(pool.clone()),
            db_pool: pool,
            auth,
            tokens,
            sessions,
        })
    }
}
