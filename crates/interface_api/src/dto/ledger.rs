//! General ledger DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_ledger::{ClassificationTag, GeneralLedgerRow, LedgerRowMetadata, TrialBalance};

#[derive(Debug, Serialize)]
pub struct LedgerRowResponse {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub line_id: Option<Uuid>,
    pub account_id: Uuid,
    pub debit: Decimal,
    pub credit: Decimal,
    pub classification: ClassificationTag,
    pub transaction_date: NaiveDate,
    pub period_id: Option<Uuid>,
    pub memo: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&GeneralLedgerRow> for LedgerRowResponse {
    fn from(row: &GeneralLedgerRow) -> Self {
        Self {
            id: *row.id().as_uuid(),
            entry_id: *row.entry_id().as_uuid(),
            line_id: row.line_id().map(|id| *id.as_uuid()),
            account_id: *row.account_id().as_uuid(),
            debit: row.debit(),
            credit: row.credit(),
            classification: row.classification(),
            transaction_date: row.transaction_date(),
            period_id: row.period_id().map(|id| *id.as_uuid()),
            memo: row.memo().map(str::to_string),
            reference_number: row.reference_number().map(str::to_string),
            description: row.description().map(str::to_string),
            notes: row.notes().map(str::to_string),
            created_at: row.created_at(),
        }
    }
}

/// Metadata edits; amounts and account references cannot be changed
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AnnotateRowRequest {
    #[validate(length(max = 1024))]
    pub memo: Option<String>,
    #[validate(length(max = 128))]
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl From<AnnotateRowRequest> for LedgerRowMetadata {
    fn from(request: AnnotateRowRequest) -> Self {
        Self {
            memo: request.memo,
            reference_number: request.reference_number,
            description: request.description,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrialBalanceLine {
    pub account_id: Uuid,
    pub debits: Decimal,
    pub credits: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TrialBalanceResponse {
    pub accounts: Vec<TrialBalanceLine>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub is_balanced: bool,
}

impl From<&TrialBalance> for TrialBalanceResponse {
    fn from(trial: &TrialBalance) -> Self {
        Self {
            accounts: trial
                .accounts
                .iter()
                .map(|(account_id, totals)| TrialBalanceLine {
                    account_id: *account_id.as_uuid(),
                    debits: totals.debits,
                    credits: totals.credits,
                })
                .collect(),
            total_debits: trial.total_debits,
            total_credits: trial.total_credits,
            is_balanced: trial.is_balanced(),
        }
    }
}
