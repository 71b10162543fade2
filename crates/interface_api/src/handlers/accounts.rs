//! Account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::AccountId;

use crate::auth::{permissions, require_permission, Claims};
use crate::dto::accounts::*;
use crate::dto::ledger::LedgerRowResponse;
use crate::{error::ApiError, AppState};

/// Opens a new account
pub async fn create_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    require_permission(&claims, permissions::ACCOUNT_WRITE)?;
    request.validate()?;

    let account = state.service.open_account(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

/// Lists the chart of accounts ordered by code
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    require_permission(&claims, permissions::ACCOUNT_READ)?;

    let accounts = state.service.accounts().await?;
    Ok(Json(accounts.iter().map(AccountResponse::from).collect()))
}

pub async fn get_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    require_permission(&claims, permissions::ACCOUNT_READ)?;

    let account = state.service.account(AccountId::from_uuid(id)).await?;
    Ok(Json(AccountResponse::from(&account)))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    require_permission(&claims, permissions::ACCOUNT_WRITE)?;
    request.validate()?;

    let account = state
        .service
        .update_account(AccountId::from_uuid(id), request.into_update()?)
        .await?;
    Ok(Json(AccountResponse::from(&account)))
}

pub async fn activate_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    require_permission(&claims, permissions::ACCOUNT_WRITE)?;

    let account = state.service.activate_account(AccountId::from_uuid(id)).await?;
    Ok(Json(AccountResponse::from(&account)))
}

pub async fn deactivate_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    require_permission(&claims, permissions::ACCOUNT_WRITE)?;

    let account = state.service.deactivate_account(AccountId::from_uuid(id)).await?;
    Ok(Json(AccountResponse::from(&account)))
}

/// Ledger rows posted to an account, oldest first
pub async fn account_ledger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LedgerRowResponse>>, ApiError> {
    require_permission(&claims, permissions::LEDGER_READ)?;

    let rows = state
        .service
        .ledger_rows_for_account(AccountId::from_uuid(id))
        .await?;
    Ok(Json(rows.iter().map(LedgerRowResponse::from).collect()))
}
