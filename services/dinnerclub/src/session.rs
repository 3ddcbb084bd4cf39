//! Cookie-backed sessions
//!
//! The whole session lives in one encrypted cookie. The middleware loads it
//! before the handler runs and writes it back only when something changed.
//! A cookie that fails to decrypt, parse or is past its expiry is treated as
//! a fresh anonymous session.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "dinnerclub_session";

/// Minimum session secret length accepted for key derivation
pub const MIN_SECRET_LEN: usize = 32;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session secret must be at least 32 bytes long")]
    WeakSecret,

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Serialized session payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<String>,
    pub expires_at: i64,
}

#[derive(Debug, Default)]
struct SessionInner {
    data: SessionData,
    dirty: bool,
}

/// Per-request session handle, shared between middleware and handler
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// A fresh anonymous session
    pub fn new() -> Self {
        Self::default()
    }

    fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner { data, dirty: false })),
        }
    }

    /// Authenticated user id, if any
    pub async fn user_id(&self) -> Option<Uuid> {
        self.inner.lock().await.data.user_id
    }

    /// Mark the session as authenticated
    pub async fn set_user_id(&self, user_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner.data.user_id = Some(user_id);
        inner.dirty = true;
    }

    /// Drop the authenticated identity; a no-op on anonymous sessions
    pub async fn clear_user_id(&self) {
        let mut inner = self.inner.lock().await;
        if inner.data.user_id.take().is_some() {
            inner.dirty = true;
        }
    }

    /// Queue a one-shot message for the next rendered page
    pub async fn add_flash(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        inner.data.flashes.push(message.into());
        inner.dirty = true;
    }

    /// Return and clear all queued messages
    pub async fn drain_flashes(&self) -> Vec<String> {
        let mut inner = self.inner.lock().await;
        if inner.data.flashes.is_empty() {
            return Vec::new();
        }
        inner.dirty = true;
        std::mem::take(&mut inner.data.flashes)
    }

    async fn take_changes(&self) -> Option<SessionData> {
        let mut inner = self.inner.lock().await;
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some(inner.data.clone())
    }
}

/// Session store configuration and cookie codec
#[derive(Clone)]
pub struct SessionStore {
    key: Key,
    ttl_seconds: u64,
    secure: bool,
}

impl SessionStore {
    /// Create a store whose cookies are encrypted with a key derived from `secret`
    pub fn new(secret: &str, ttl_seconds: u64, secure: bool) -> Result<Self, SessionError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::WeakSecret);
        }

        Ok(Self {
            key: Key::derive_from(secret.as_bytes()),
            ttl_seconds,
            secure,
        })
    }

    /// Load the session carried by the request, or start an anonymous one
    pub fn load(&self, headers: &HeaderMap) -> Session {
        let jar = PrivateCookieJar::from_headers(headers, self.key.clone());

        let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
            return Session::new();
        };

        match serde_json::from_str::<SessionData>(cookie.value()) {
            Ok(data) if data.expires_at > Utc::now().timestamp() => Session::from_data(data),
            Ok(_) => {
                debug!("Discarding expired session");
                Session::new()
            }
            Err(e) => {
                debug!("Discarding unreadable session: {}", e);
                Session::new()
            }
        }
    }

    /// Encrypt `data` into a cookie jar ready to be attached to a response
    pub fn store(
        &self,
        headers: &HeaderMap,
        mut data: SessionData,
    ) -> Result<PrivateCookieJar, SessionError> {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        data.expires_at = Utc::now().timestamp().saturating_add(ttl);
        let value = serde_json::to_string(&data)?;

        let cookie = Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure);

        Ok(PrivateCookieJar::from_headers(headers, self.key.clone()).add(cookie))
    }
}

/// Load the session before the handler runs and persist any mutation after
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers().clone();
    let session = store.load(&headers);
    req.extensions_mut().insert(session.clone());

    let response = next.run(req).await;

    let Some(changes) = session.take_changes().await else {
        return response;
    };

    match store.store(&headers, changes) {
        Ok(jar) => (jar, response).into_response(),
        Err(e) => {
            error!("Failed to persist session: {}", e);
            response
        }
    }
}
