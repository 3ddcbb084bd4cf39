//! Registration, login and logout

use axum::{
    Extension, Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{found, render, wants_json};
use crate::{
    AppState,
    auth::{AccessToken, AuthError},
    error::AppResult,
    middleware::RequestContext,
    models::{LoginCredentials, Page, Registration},
    session::Session,
};

/// Request for token refresh
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// GET /auth/register
pub async fn register_page(
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
) -> Json<Page<Value>> {
    let referral_required = ctx.referralcode.is_some();
    render(&session, &ctx, json!({ "referral_required": referral_required })).await
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    Form(registration): Form<Registration>,
) -> AppResult<Response> {
    let json = wants_json(&headers);

    match state
        .auth
        .register(registration, ctx.referralcode.as_deref())
        .await
    {
        Ok(user) if json => Ok((StatusCode::CREATED, Json(json!({ "data": user }))).into_response()),
        Ok(user) => {
            session
                .add_flash(format!(
                    "New user '{}' registered successfully.",
                    user.username
                ))
                .await;
            Ok(found("/auth/login"))
        }
        Err(AuthError::DuplicateUsername | AuthError::DuplicateEmail) if !json => {
            session.add_flash("User already signed up.").await;
            Ok(found("/auth/register"))
        }
        Err(AuthError::ReferralMismatch) if !json => {
            session
                .add_flash("The referral code you entered is incorrect.")
                .await;
            Ok(found("/auth/register"))
        }
        Err(err) => Err(err.into()),
    }
}

/// GET /auth/login
pub async fn login_page(
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
) -> Json<Page<Value>> {
    render(&session, &ctx, Value::Null).await
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Form(credentials): Form<LoginCredentials>,
) -> AppResult<Response> {
    let json = wants_json(&headers);

    match state.auth.login(&session, &credentials).await {
        Ok(outcome) if json => Ok(Json(json!({
            "data": {
                "user": outcome.user,
                "tokens": outcome.tokens,
            }
        }))
        .into_response()),
        Ok(outcome) => {
            session
                .add_flash(format!(
                    "User '{}' logged in successfully.",
                    outcome.user.username
                ))
                .await;
            Ok(found("/profile"))
        }
        Err(AuthError::InvalidCredentials) if !json => {
            session
                .add_flash("The username or password you entered is incorrect.")
                .await;
            Ok(found("/auth/login"))
        }
        Err(err) => Err(err.into()),
    }
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
) -> Response {
    state.auth.logout(&session).await;

    if wants_json(&headers) {
        return StatusCode::NO_CONTENT.into_response();
    }

    session.add_flash("User logged out successfully.").await;
    found("/entries")
}

/// POST /auth/token/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<Json<AccessToken>> {
    info!("Token refresh request");
    let token = state.auth.refresh_access_token(&payload.refresh_token).await?;
    Ok(Json(token))
}
