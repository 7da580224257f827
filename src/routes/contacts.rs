use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::db;
use crate::error::{AppError, AppResult, FieldErrors, ValidationError};
use crate::query::ContactListQuery;
use crate::state::AppState;
use crate::transfer::{ContactChanges, ContactPayload, ContactResponse, WriteMode};

fn not_found(id: i64) -> AppError {
    AppError::NotFound {
        resource: "Contact",
        id,
    }
}

/// Field rules plus the category lookup, so one response lists every bad
/// field. The write re-checks the category inside its transaction.
async fn check_payload(
    state: &AppState,
    payload: ContactPayload,
    mode: WriteMode,
) -> AppResult<ContactChanges> {
    let mut errors = FieldErrors::new();
    if let Some(category_id) = payload.category_reference() {
        if db::get_category(&state.pool, category_id).await?.is_none() {
            errors.add("category", ValidationError::UnknownCategory(category_id));
        }
    }
    Ok(payload.validate_with(mode, errors)?)
}

/// GET /contacts?category=&category_name=&created_at=&search=&ordering=
pub async fn list_contacts(
    State(state): State<AppState>,
    query: Result<Query<ContactListQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ContactResponse>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;

    let rows = db::list_contacts(&state.pool, &filter).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// POST /contacts - Create a contact.
pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ContactResponse>)> {
    let Json(payload) = payload?;
    let changes = check_payload(&state, payload, WriteMode::Create).await?;

    let contact = db::create_contact(&state.pool, &changes).await?;
    tracing::info!(id = contact.id, "Created contact");

    Ok((StatusCode::CREATED, Json(contact.into())))
}

/// GET /contacts/{id}
pub async fn get_contact(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ContactResponse>> {
    let Path(id) = id?;
    let contact = db::get_contact(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(contact.into()))
}

/// PUT /contacts/{id} - Full update; `name` is required.
pub async fn replace_contact(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> AppResult<Json<ContactResponse>> {
    update_contact(state, id?.0, payload?.0, WriteMode::Replace).await
}

/// PATCH /contacts/{id} - Partial update.
pub async fn patch_contact(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> AppResult<Json<ContactResponse>> {
    update_contact(state, id?.0, payload?.0, WriteMode::Partial).await
}

async fn update_contact(
    state: AppState,
    id: i64,
    payload: ContactPayload,
    mode: WriteMode,
) -> AppResult<Json<ContactResponse>> {
    if db::get_contact(&state.pool, id).await?.is_none() {
        return Err(not_found(id));
    }
    let changes = check_payload(&state, payload, mode).await?;

    let contact = db::update_contact(&state.pool, id, &changes).await?;
    tracing::debug!(id, "Updated contact");

    Ok(Json(contact.into()))
}

/// DELETE /contacts/{id}
pub async fn delete_contact(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    if !db::delete_contact(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(id, "Deleted contact");

    Ok(StatusCode::NO_CONTENT)
}
