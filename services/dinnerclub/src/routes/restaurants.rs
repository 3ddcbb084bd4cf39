//! Restaurants, derived from entries

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use super::render;
use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::RequestContext,
    models::{Page, PageQuery, Paginated, Pagination, Restaurant, RestaurantDetail, page::PER_PAGE},
    session::Session,
};

/// GET /restaurants
pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<Paginated<Restaurant>>>> {
    let total = state.restaurant_repository.count().await?;
    let pagination = Pagination::new(query.page, total, PER_PAGE).map_err(AppError::BadRequest)?;
    let items = state.restaurant_repository.list(&pagination).await?;

    Ok(render(&session, &ctx, Paginated { items, pagination }).await)
}

/// GET /restaurants/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Page<RestaurantDetail>>> {
    let restaurant = state
        .restaurant_repository
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let entries = state.entry_repository.list_by_restaurant(id).await?;

    Ok(render(&session, &ctx, RestaurantDetail { restaurant, entries }).await)
}
