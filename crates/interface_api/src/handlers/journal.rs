//! Journal entry handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::JournalEntryId;

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::journal::*;
use crate::dto::ledger::LedgerRowResponse;
use crate::{error::ApiError, AppState};

/// Creates a draft entry, optionally with its lines
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateJournalEntryRequest>,
) -> Result<(StatusCode, Json<JournalEntryResponse>), ApiError> {
    require_permission(&claims, permissions::JOURNAL_WRITE)?;
    request.validate()?;

    let entry = state.service.create_journal_entry(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(JournalEntryResponse::from(&entry))))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_READ)?;

    let entry = state.service.journal_entry(JournalEntryId::from_uuid(id)).await?;
    Ok(Json(JournalEntryResponse::from(&entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateJournalEntryRequest>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_WRITE)?;
    request.validate()?;

    let entry = state
        .service
        .update_journal_entry(JournalEntryId::from_uuid(id), request.into())
        .await?;
    Ok(Json(JournalEntryResponse::from(&entry)))
}

pub async fn add_line(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<JournalLineRequest>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_WRITE)?;

    let entry = state
        .service
        .add_journal_line(JournalEntryId::from_uuid(id), request.into_command()?)
        .await?;
    Ok(Json(JournalEntryResponse::from(&entry)))
}

pub async fn approve_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_APPROVE)?;

    let entry = state
        .service
        .approve_journal_entry(JournalEntryId::from_uuid(id), &claims.sub)
        .await?;
    Ok(Json(JournalEntryResponse::from(&entry)))
}

pub async fn reject_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_APPROVE)?;

    let entry = state
        .service
        .reject_journal_entry(JournalEntryId::from_uuid(id), &claims.sub)
        .await?;
    Ok(Json(JournalEntryResponse::from(&entry)))
}

/// Posts a balanced draft to the general ledger
pub async fn post_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostedEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_POST)?;

    let posted = state
        .service
        .post_journal_entry(JournalEntryId::from_uuid(id))
        .await?;
    Ok(Json(PostedEntryResponse::from(&posted)))
}

/// Records a reversal marker on a posted entry
pub async fn reverse_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReverseEntryRequest>,
) -> Result<Json<JournalEntryResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_REVERSE)?;
    request.validate()?;

    let entry = state
        .service
        .reverse_journal_entry(
            JournalEntryId::from_uuid(id),
            request.reversal_date,
            &request.reason,
        )
        .await?;
    Ok(Json(JournalEntryResponse::from(&entry)))
}

/// Drafts an offsetting entry for a posted one
pub async fn create_reversing_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReversingEntryRequest>,
) -> Result<(StatusCode, Json<JournalEntryResponse>), ApiError> {
    require_permission(&claims, permissions::JOURNAL_REVERSE)?;
    request.validate()?;

    let entry = state
        .service
        .create_reversing_entry(
            JournalEntryId::from_uuid(id),
            request.date,
            &request.reference_number,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(JournalEntryResponse::from(&entry))))
}

pub async fn entry_ledger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LedgerRowResponse>>, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;

    let rows = state
        .service
        .ledger_rows_for_entry(JournalEntryId::from_uuid(id))
        .await?;
    Ok(Json(rows.iter().map(LedgerRowResponse::from).collect()))
}
