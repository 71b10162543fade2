//! Journal entry DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{AccountId, AccountingPeriodId};
use domain_ledger::{
    ApprovalDecision, ApprovalStatus, ClassificationTag, EntryReversal, EntrySide, JournalEntry,
    JournalEntryLine, JournalEntryUpdate, LedgerError, NewJournalEntry, NewJournalLine, PostedEntry,
};

use super::accounts::AccountResponse;
use super::ledger::LedgerRowResponse;
use super::parse_classification;

fn default_source() -> String {
    "manual".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct JournalLineRequest {
    pub account_id: Uuid,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    pub memo: Option<String>,
    pub classification: Option<String>,
}

impl JournalLineRequest {
    pub fn into_command(self) -> Result<NewJournalLine, LedgerError> {
        Ok(NewJournalLine {
            account_id: AccountId::from_uuid(self.account_id),
            debit: self.debit,
            credit: self.credit,
            memo: self.memo,
            classification: parse_classification(self.classification.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateJournalEntryRequest {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 128))]
    pub reference_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_source")]
    #[validate(length(min = 1, max = 64))]
    pub source: String,
    pub period_id: Option<Uuid>,
    /// Control total; defaults to the sum of the debit lines
    pub original_amount: Option<Decimal>,
    #[serde(default)]
    pub lines: Vec<JournalLineRequest>,
}

impl CreateJournalEntryRequest {
    pub fn into_command(self) -> Result<NewJournalEntry, LedgerError> {
        let original_amount = self
            .original_amount
            .unwrap_or_else(|| self.lines.iter().map(|line| line.debit).sum());
        let lines = self
            .lines
            .into_iter()
            .map(JournalLineRequest::into_command)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewJournalEntry {
            date: self.date,
            reference_number: self.reference_number,
            description: self.description,
            source: self.source,
            period_id: self.period_id.map(AccountingPeriodId::from_uuid),
            original_amount,
            lines,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateJournalEntryRequest {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 128))]
    pub reference_number: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub source: Option<String>,
    /// `null` detaches the entry from its period
    #[serde(default, deserialize_with = "super::nullable")]
    pub period_id: Option<Option<Uuid>>,
    pub original_amount: Option<Decimal>,
}

impl From<UpdateJournalEntryRequest> for JournalEntryUpdate {
    fn from(request: UpdateJournalEntryRequest) -> Self {
        Self {
            date: request.date,
            reference_number: request.reference_number,
            description: request.description,
            source: request.source,
            period_id: request
                .period_id
                .map(|period_id| period_id.map(AccountingPeriodId::from_uuid)),
            original_amount: request.original_amount,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReverseEntryRequest {
    pub reversal_date: NaiveDate,
    #[validate(length(min = 1, max = 1024))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReversingEntryRequest {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 128))]
    pub reference_number: String,
}

#[derive(Debug, Serialize)]
pub struct JournalLineResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub side: EntrySide,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub classification: Option<ClassificationTag>,
}

impl From<&JournalEntryLine> for JournalLineResponse {
    fn from(line: &JournalEntryLine) -> Self {
        Self {
            id: *line.id().as_uuid(),
            account_id: *line.account_id().as_uuid(),
            side: line.side(),
            amount: line.amount(),
            memo: line.memo().map(str::to_string),
            classification: line.classification(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JournalEntryResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    pub reference_number: String,
    pub description: String,
    pub source: String,
    pub period_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub original_amount: Decimal,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub is_balanced: bool,
    pub approval_status: ApprovalStatus,
    pub approval: Option<ApprovalDecision>,
    pub is_posted: bool,
    pub posted_at: Option<DateTime<Utc>>,
    pub is_reversed: bool,
    pub reversal: Option<EntryReversal>,
    pub lines: Vec<JournalLineResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JournalEntry> for JournalEntryResponse {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            id: *entry.id().as_uuid(),
            date: entry.date(),
            reference_number: entry.reference_number().to_string(),
            description: entry.description().to_string(),
            source: entry.source().to_string(),
            period_id: entry.period_id().map(|id| *id.as_uuid()),
            batch_id: entry.batch_id().map(|id| *id.as_uuid()),
            original_amount: entry.original_amount(),
            total_debits: entry.total_debits(),
            total_credits: entry.total_credits(),
            is_balanced: entry.is_balanced(),
            approval_status: entry.approval_status(),
            approval: entry.approval().cloned(),
            is_posted: entry.is_posted(),
            posted_at: entry.posted_at(),
            is_reversed: entry.is_reversed(),
            reversal: entry.reversal().cloned(),
            lines: entry.lines().iter().map(JournalLineResponse::from).collect(),
            created_at: entry.created_at(),
            updated_at: entry.updated_at(),
        }
    }
}

/// The posted entry with the rows it wrote and the accounts it moved
#[derive(Debug, Serialize)]
pub struct PostedEntryResponse {
    pub entry: JournalEntryResponse,
    pub ledger_rows: Vec<LedgerRowResponse>,
    pub accounts: Vec<AccountResponse>,
}

impl From<&PostedEntry> for PostedEntryResponse {
    fn from(posted: &PostedEntry) -> Self {
        Self {
            entry: JournalEntryResponse::from(&posted.entry),
            ledger_rows: posted.ledger_rows.iter().map(LedgerRowResponse::from).collect(),
            accounts: posted.accounts.iter().map(AccountResponse::from).collect(),
        }
    }
}
