//! Restaurant visit entries

use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{current_user, found, render};
use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::RequestContext,
    models::{
        Entry, EntryForm, NewEntry, Page, PageQuery, Paginated, Pagination, page::PER_PAGE,
        user::normalize_username,
    },
    session::Session,
};

/// GET /entries
pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<Paginated<Entry>>>> {
    let total = state.entry_repository.count().await?;
    let pagination = Pagination::new(query.page, total, PER_PAGE).map_err(AppError::BadRequest)?;
    let items = state.entry_repository.list(&pagination).await?;

    Ok(render(&session, &ctx, Paginated { items, pagination }).await)
}

/// GET /entries/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Page<Entry>>> {
    let entry = state
        .entry_repository
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(render(&session, &ctx, entry).await)
}

/// GET /entries/new
pub async fn new_page(
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
) -> Json<Page<Value>> {
    render(&session, &ctx, json!({ "action": "/entries/new" })).await
}

/// POST /entries/new
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<EntryForm>,
) -> AppResult<Response> {
    let submitter_id = current_user(&ctx)?;
    let fields = form.validate().map_err(AppError::Validation)?;

    let entry = state
        .entry_repository
        .create(&NewEntry {
            submitter_id,
            fields,
        })
        .await?;

    session
        .add_flash(format!("New entry '{}' saved successfully.", entry.name))
        .await;
    Ok(found(&format!("/entries/{}", entry.id)))
}

/// Load an entry the caller is allowed to change
async fn owned_entry(state: &AppState, ctx: &RequestContext, id: Uuid) -> AppResult<Entry> {
    let user_id = current_user(ctx)?;
    let entry = state
        .entry_repository
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    if entry.submitter_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(entry)
}

/// GET /entries/:id/update
pub async fn edit_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Page<Entry>>> {
    let entry = owned_entry(&state, &ctx, id).await?;
    Ok(render(&session, &ctx, entry).await)
}

/// POST /entries/:id/update
pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Form(form): Form<EntryForm>,
) -> AppResult<Response> {
    owned_entry(&state, &ctx, id).await?;
    let fields = form.validate().map_err(AppError::Validation)?;

    let entry = state
        .entry_repository
        .update(id, &fields)
        .await?
        .ok_or(AppError::NotFound)?;

    session
        .add_flash(format!("Entry '{}' updated successfully.", entry.name))
        .await;
    Ok(found(&format!("/entries/{}", entry.id)))
}

/// POST /entries/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    owned_entry(&state, &ctx, id).await?;

    let entry = state
        .entry_repository
        .delete(id)
        .await?
        .ok_or(AppError::NotFound)?;

    session
        .add_flash(format!("Entry '{}' deleted successfully.", entry.name))
        .await;
    Ok(found("/entries"))
}

/// GET /entries/submittedby/:username
pub async fn submitted_by(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
) -> AppResult<Json<Page<Vec<Entry>>>> {
    let entries = state
        .entry_repository
        .list_by_submitter(&normalize_username(&username))
        .await?;

    Ok(render(&session, &ctx, entries).await)
}
