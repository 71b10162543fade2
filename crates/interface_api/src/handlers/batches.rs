//! Posting batch handlers
//!
//! The acting user recorded on approvals, postings and reversals is the
//! token subject.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{JournalEntryId, PostingBatchId};

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::batches::*;
use crate::{error::ApiError, AppState};

pub async fn create_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError> {
    require_permission(&claims, permissions::JOURNAL_WRITE)?;
    request.validate()?;

    let batch = state.service.create_posting_batch(request.into()).await?;
    Ok((StatusCode::CREATED, Json(BatchResponse::from(&batch))))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_READ)?;

    let batch = state.service.posting_batch(PostingBatchId::from_uuid(id)).await?;
    Ok(Json(BatchResponse::from(&batch)))
}

/// Moves a draft entry into the batch
pub async fn add_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddBatchEntryRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_WRITE)?;

    let batch = state
        .service
        .add_entry_to_batch(
            PostingBatchId::from_uuid(id),
            JournalEntryId::from_uuid(request.entry_id),
        )
        .await?;
    Ok(Json(BatchResponse::from(&batch)))
}

pub async fn approve_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchResponse>, ApiError> {
    require_permission(&claims, permissions::BATCH_APPROVE)?;

    let batch = state
        .service
        .approve_batch(PostingBatchId::from_uuid(id), &claims.sub)
        .await?;
    Ok(Json(BatchResponse::from(&batch)))
}

pub async fn reject_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchResponse>, ApiError> {
    require_permission(&claims, permissions::BATCH_APPROVE)?;

    let batch = state
        .service
        .reject_batch(PostingBatchId::from_uuid(id), &claims.sub)
        .await?;
    Ok(Json(BatchResponse::from(&batch)))
}

/// Posts every entry of an approved batch, all or nothing
pub async fn post_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostedBatchResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_POST)?;

    let posted = state
        .service
        .post_batch(PostingBatchId::from_uuid(id), &claims.sub)
        .await?;
    Ok(Json(PostedBatchResponse::from(&posted)))
}

pub async fn reverse_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReverseBatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    require_permission(&claims, permissions::JOURNAL_REVERSE)?;
    request.validate()?;

    let batch = state
        .service
        .reverse_batch(PostingBatchId::from_uuid(id), &claims.sub, &request.reason)
        .await?;
    Ok(Json(BatchResponse::from(&batch)))
}
