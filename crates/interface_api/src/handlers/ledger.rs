//! General ledger handlers

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::LedgerRowId;

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::ledger::*;
use crate::{error::ApiError, AppState};

/// Edits a row's memo, reference, description or notes
pub async fn annotate_row(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnnotateRowRequest>,
) -> Result<Json<LedgerRowResponse>, ApiError> {
    require_permission(&claims, permissions::LEDGER_ANNOTATE)?;
    request.validate()?;

    let row = state
        .service
        .annotate_ledger_row(LedgerRowId::from_uuid(id), request.into())
        .await?;
    Ok(Json(LedgerRowResponse::from(&row)))
}

pub async fn trial_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<TrialBalanceResponse>, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;

    let trial = state.service.trial_balance().await?;
    Ok(Json(TrialBalanceResponse::from(&trial)))
}

/// Posting counters since process start, in Prometheus text format
pub async fn metrics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    ))
}
