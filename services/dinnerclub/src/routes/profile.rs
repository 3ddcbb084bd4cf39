//! The logged-in user's own account

use axum::{Extension, Form, Json, extract::State, response::Response};

use super::{current_user, found, render};
use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::RequestContext,
    models::{Page, UpdateUser, User},
    session::Session,
};

/// GET /profile
pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<Page<User>>> {
    let user_id = current_user(&ctx)?;
    let user = state
        .auth
        .user(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(render(&session, &ctx, user).await)
}

/// POST /profile/update
pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Form(update): Form<UpdateUser>,
) -> AppResult<Response> {
    let user_id = current_user(&ctx)?;
    state.auth.update_profile(user_id, update).await?;

    session.add_flash("Profile updated successfully.").await;
    Ok(found("/profile"))
}

/// POST /profile/delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Response> {
    let user_id = current_user(&ctx)?;
    let username = state
        .auth
        .delete_account(user_id, &session)
        .await?
        .ok_or(AppError::Unauthorized)?;

    session
        .add_flash(format!("User '{}' deleted successfully.", username))
        .await;
    Ok(found("/entries"))
}
