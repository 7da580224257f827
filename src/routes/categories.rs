use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::transfer::{CategoryPayload, CategoryResponse, WriteMode};

fn not_found(id: i64) -> AppError {
    AppError::NotFound {
        resource: "Category",
        id,
    }
}

/// GET /categories - All categories in id order.
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CategoryResponse>>> {
    let categories = db::list_categories(&state.pool).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// POST /categories - Create a category.
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CategoryResponse>)> {
    let Json(payload) = payload?;
    let changes = payload.validate(WriteMode::Create)?;

    let category =
        db::create_category(&state.pool, changes.name.as_deref().unwrap_or_default()).await?;
    tracing::info!(id = category.id, "Created category");

    Ok((StatusCode::CREATED, Json(category.into())))
}

/// GET /categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<CategoryResponse>> {
    let Path(id) = id?;
    let category = db::get_category(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(category.into()))
}

/// PUT /categories/{id} - Full update.
pub async fn replace_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> AppResult<Json<CategoryResponse>> {
    update_category(state, id?.0, payload?.0, WriteMode::Replace).await
}

/// PATCH /categories/{id} - Partial update.
pub async fn patch_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> AppResult<Json<CategoryResponse>> {
    update_category(state, id?.0, payload?.0, WriteMode::Partial).await
}

async fn update_category(
    state: AppState,
    id: i64,
    payload: CategoryPayload,
    mode: WriteMode,
) -> AppResult<Json<CategoryResponse>> {
    if db::get_category(&state.pool, id).await?.is_none() {
        return Err(not_found(id));
    }
    let changes = payload.validate(mode)?;

    let category = db::update_category(&state.pool, id, &changes)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::debug!(id, "Updated category");

    Ok(Json(category.into()))
}

/// DELETE /categories/{id} - Contacts in the category are kept and detached.
pub async fn delete_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    let detached = db::delete_category(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(id, detached, "Deleted category");

    Ok(StatusCode::NO_CONTENT)
}
