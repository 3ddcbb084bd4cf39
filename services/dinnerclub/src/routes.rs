//! dinnerclub routes
//!
//! Pages are JSON documents carrying the site context and any pending flash
//! messages. Form posts answer with a `302 Found` redirect.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use common::database;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::{RequestContext, request_context, require_anonymous, require_logged_in},
    models::Page,
    session::{Session, session_middleware},
};

pub mod auth;
pub mod entries;
pub mod profile;
pub mod restaurants;

/// Create the router for the dinnerclub service
pub fn create_router(state: AppState) -> Router {
    let anonymous_routes = Router::new()
        .route("/auth/register", get(auth::register_page).post(auth::register))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route_layer(middleware::from_fn(require_anonymous));

    let member_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/profile", get(profile::show))
        .route("/profile/update", post(profile::update))
        .route("/profile/delete", post(profile::delete))
        .route("/entries/new", get(entries::new_page).post(entries::create))
        .route(
            "/entries/:id/update",
            get(entries::edit_page).post(entries::update),
        )
        .route("/entries/:id/delete", post(entries::delete))
        .route("/entries/submittedby/:username", get(entries::submitted_by))
        .route("/status", get(status))
        .route_layer(middleware::from_fn(require_logged_in));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/entries", get(entries::list))
        .route("/entries/:id", get(entries::show))
        .route("/restaurants", get(restaurants::list))
        .route("/restaurants/:id", get(restaurants::show))
        .route("/auth/token/refresh", post(auth::refresh_token))
        .merge(anonymous_routes)
        .merge(member_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), request_context))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Liveness for logged-in callers, including database connectivity
pub async fn status(State(state): State<AppState>) -> AppResult<Json<&'static str>> {
    database::health_check(&state.db_pool).await?;
    Ok(Json("ok"))
}

async fn root() -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, "/entries")],
    )
        .into_response()
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "404 page not found" })),
    )
}

/// `302 Found` to another page
pub(crate) fn found(path: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, path)]).into_response()
}

/// Whether the caller asked for JSON status codes instead of redirects
pub(crate) fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Render a page, consuming the pending flash messages
pub(crate) async fn render<T: Serialize>(
    session: &Session,
    ctx: &RequestContext,
    data: T,
) -> Json<Page<T>> {
    Json(Page {
        citycode: ctx.citycode.clone(),
        is_logged_in: ctx.is_logged_in,
        messages: session.drain_flashes().await,
        data,
    })
}

/// The caller's user id on a guarded route
pub(crate) fn current_user(ctx: &RequestContext) -> AppResult<Uuid> {
    ctx.user_id.ok_or(AppError::Unauthorized)
}
