//! Accounting period handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::AccountingPeriodId;

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::periods::*;
use crate::{error::ApiError, AppState};

pub async fn create_period(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreatePeriodRequest>,
) -> Result<(StatusCode, Json<PeriodResponse>), ApiError> {
    require_permission(&claims, permissions::PERIOD_WRITE)?;
    request.validate()?;

    let period = state.service.create_period(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(PeriodResponse::from(&period))))
}

pub async fn list_periods(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PeriodResponse>>, ApiError> {
    require_permission(&claims, permissions::PERIOD_READ)?;

    let periods = state.service.periods().await?;
    Ok(Json(periods.iter().map(PeriodResponse::from).collect()))
}

pub async fn get_period(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PeriodResponse>, ApiError> {
    require_permission(&claims, permissions::PERIOD_READ)?;

    let period = state.service.period(AccountingPeriodId::from_uuid(id)).await?;
    Ok(Json(PeriodResponse::from(&period)))
}

pub async fn update_period(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePeriodRequest>,
) -> Result<Json<PeriodResponse>, ApiError> {
    require_permission(&claims, permissions::PERIOD_WRITE)?;
    request.validate()?;

    let period = state
        .service
        .update_period(AccountingPeriodId::from_uuid(id), request.into_update()?)
        .await?;
    Ok(Json(PeriodResponse::from(&period)))
}

/// Closes a period; postings dated inside it are refused until reopened
pub async fn close_period(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PeriodResponse>, ApiError> {
    require_permission(&claims, permissions::PERIOD_CLOSE)?;

    let period = state.service.close_period(AccountingPeriodId::from_uuid(id)).await?;
    Ok(Json(PeriodResponse::from(&period)))
}

pub async fn reopen_period(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PeriodResponse>, ApiError> {
    require_permission(&claims, permissions::PERIOD_CLOSE)?;

    let period = state.service.reopen_period(AccountingPeriodId::from_uuid(id)).await?;
    Ok(Json(PeriodResponse::from(&period)))
}
