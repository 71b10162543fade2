//! Posting batch DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::AccountingPeriodId;
use domain_ledger::{ApprovalDecision, ApprovalStatus, BatchStatus, NewPostingBatch, PostedBatch, PostingBatch};

use super::accounts::AccountResponse;
use super::journal::JournalEntryResponse;
use super::ledger::LedgerRowResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchRequest {
    #[validate(length(min = 1, max = 64))]
    pub batch_number: String,
    pub batch_date: NaiveDate,
    pub description: Option<String>,
    pub period_id: Option<Uuid>,
}

impl From<CreateBatchRequest> for NewPostingBatch {
    fn from(request: CreateBatchRequest) -> Self {
        Self {
            batch_number: request.batch_number,
            batch_date: request.batch_date,
            description: request.description,
            period_id: request.period_id.map(AccountingPeriodId::from_uuid),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddBatchEntryRequest {
    pub entry_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReverseBatchRequest {
    #[validate(length(min = 1, max = 1024))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub id: Uuid,
    pub batch_number: String,
    pub batch_date: NaiveDate,
    pub description: Option<String>,
    pub period_id: Option<Uuid>,
    pub status: BatchStatus,
    pub approval_status: ApprovalStatus,
    pub approval: Option<ApprovalDecision>,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub reversed_by: Option<String>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub reversal_reason: Option<String>,
    pub entry_count: usize,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub entries: Vec<JournalEntryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PostingBatch> for BatchResponse {
    fn from(batch: &PostingBatch) -> Self {
        Self {
            id: *batch.id().as_uuid(),
            batch_number: batch.batch_number().to_string(),
            batch_date: batch.batch_date(),
            description: batch.description().map(str::to_string),
            period_id: batch.period_id().map(|id| *id.as_uuid()),
            status: batch.status(),
            approval_status: batch.approval_status(),
            approval: batch.approval().cloned(),
            posted_by: batch.posted_by().map(str::to_string),
            posted_at: batch.posted_at(),
            reversed_by: batch.reversed_by().map(str::to_string),
            reversed_at: batch.reversed_at(),
            reversal_reason: batch.reversal_reason().map(str::to_string),
            entry_count: batch.entry_count(),
            total_debits: batch.total_debits(),
            total_credits: batch.total_credits(),
            entries: batch.entries().iter().map(JournalEntryResponse::from).collect(),
            created_at: batch.created_at(),
            updated_at: batch.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostedBatchResponse {
    pub batch: BatchResponse,
    pub ledger_rows: Vec<LedgerRowResponse>,
    pub accounts: Vec<AccountResponse>,
}

impl From<&PostedBatch> for PostedBatchResponse {
    fn from(posted: &PostedBatch) -> Self {
        Self {
            batch: BatchResponse::from(&posted.batch),
            ledger_rows: posted.ledger_rows.iter().map(LedgerRowResponse::from).collect(),
            accounts: posted.accounts.iter().map(AccountResponse::from).collect(),
        }
    }
}
