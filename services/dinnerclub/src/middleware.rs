//! Request context and route guards
//!
//! `request_context` runs once per request, after the session middleware, and
//! stores a typed [`RequestContext`] in the request extensions. The guards
//! read it back and reject the request before the handler runs.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;
use uuid::Uuid;

use crate::session::Session;
use crate::state::AppState;

/// Per-deployment values copied into every request context
#[derive(Debug, Clone)]
pub struct SiteDefaults {
    /// Uppercased at startup
    pub citycode: String,
    pub referralcode: Option<String>,
}

/// Request-scoped view of who is calling and where
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Option<Uuid>,
    pub is_logged_in: bool,
    pub citycode: String,
    pub referralcode: Option<String>,
}

/// Resolve the caller's identity and annotate the request.
///
/// The session identity wins; a valid bearer access token is the fallback.
pub async fn request_context(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = req
        .extensions()
        .get::<Session>()
        .cloned()
        .unwrap_or_default();

    let mut user_id = state.auth.current_user_id(&session).await;

    if user_id.is_none() {
        if let Some(TypedHeader(Authorization(bearer))) = bearer {
            match state.tokens.verify_access_token(bearer.token()) {
                Ok(id) => user_id = Some(id),
                Err(e) => debug!("Ignoring bearer token: {}", e),
            }
        }
    }

    req.extensions_mut().insert(RequestContext {
        user_id,
        is_logged_in: user_id.is_some(),
        citycode: state.defaults.citycode.clone(),
        referralcode: state.defaults.referralcode.clone(),
    });

    next.run(req).await
}

fn is_logged_in(req: &Request) -> bool {
    req.extensions()
        .get::<RequestContext>()
        .is_some_and(|ctx| ctx.is_logged_in)
}

/// Reject anonymous callers
pub async fn require_logged_in(req: Request, next: Next) -> Result<Response, StatusCode> {
    if !is_logged_in(&req) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

/// Reject callers that are already logged in
pub async fn require_anonymous(req: Request, next: Next) -> Result<Response, StatusCode> {
    if is_logged_in(&req) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}
