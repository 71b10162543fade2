//! Domain events for the ledger aggregates
//!
//! Aggregates record an event for every state change and keep them until
//! the caller drains them with `take_events()` after a successful save.
//! Events serialize as `{"type": "...", "payload": {...}}` so subscribers
//! (audit trail, metrics, read models) can route on the tag alone.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{
    AccountId, AccountingPeriodId, JournalEntryId, JournalLineId, LedgerRowId, PostingBatchId,
};

use crate::account::{AccountCategory, AccountStatus, EntrySide};
use crate::general_ledger::ClassificationTag;

/// Domain events emitted by the ledger aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum LedgerEvent {
    AccountCreated {
        account_id: AccountId,
        code: String,
        name: String,
        category: AccountCategory,
        opening_balance: Decimal,
        timestamp: DateTime<Utc>,
    },

    AccountUpdated {
        account_id: AccountId,
        changed_fields: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A debit or credit moved the balance
    AccountBalanceChanged {
        account_id: AccountId,
        old_balance: Decimal,
        new_balance: Decimal,
        amount: Decimal,
        side: EntrySide,
        timestamp: DateTime<Utc>,
    },

    AccountStatusChanged {
        account_id: AccountId,
        status: AccountStatus,
        timestamp: DateTime<Utc>,
    },

    AccountingPeriodCreated {
        period_id: AccountingPeriodId,
        name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        fiscal_year: i32,
        timestamp: DateTime<Utc>,
    },

    AccountingPeriodUpdated {
        period_id: AccountingPeriodId,
        timestamp: DateTime<Utc>,
    },

    AccountingPeriodClosed {
        period_id: AccountingPeriodId,
        timestamp: DateTime<Utc>,
    },

    /// Reopening is audit sensitive; subscribers usually alert on it
    AccountingPeriodReopened {
        period_id: AccountingPeriodId,
        timestamp: DateTime<Utc>,
    },

    JournalEntryCreated {
        entry_id: JournalEntryId,
        reference_number: String,
        entry_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    JournalEntryUpdated {
        entry_id: JournalEntryId,
        timestamp: DateTime<Utc>,
    },

    JournalEntryApproved {
        entry_id: JournalEntryId,
        approved_by: String,
        timestamp: DateTime<Utc>,
    },

    JournalEntryRejected {
        entry_id: JournalEntryId,
        rejected_by: String,
        timestamp: DateTime<Utc>,
    },

    JournalEntryLineAdded {
        entry_id: JournalEntryId,
        line_id: JournalLineId,
        account_id: AccountId,
        side: EntrySide,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },

    JournalEntryPosted {
        entry_id: JournalEntryId,
        total_debits: Decimal,
        total_credits: Decimal,
        timestamp: DateTime<Utc>,
    },

    JournalEntryReversed {
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    PostingBatchCreated {
        batch_id: PostingBatchId,
        batch_number: String,
        batch_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },

    PostingBatchEntryAdded {
        batch_id: PostingBatchId,
        entry_id: JournalEntryId,
        timestamp: DateTime<Utc>,
    },

    PostingBatchApproved {
        batch_id: PostingBatchId,
        approved_by: String,
        timestamp: DateTime<Utc>,
    },

    PostingBatchRejected {
        batch_id: PostingBatchId,
        rejected_by: String,
        timestamp: DateTime<Utc>,
    },

    PostingBatchPosted {
        batch_id: PostingBatchId,
        posted_by: String,
        entry_count: usize,
        total_debits: Decimal,
        total_credits: Decimal,
        timestamp: DateTime<Utc>,
    },

    PostingBatchReversed {
        batch_id: PostingBatchId,
        reversed_by: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    LedgerRowCreated {
        row_id: LedgerRowId,
        entry_id: JournalEntryId,
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
        classification: ClassificationTag,
        timestamp: DateTime<Utc>,
    },

    LedgerRowUpdated {
        row_id: LedgerRowId,
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Returns the id of the aggregate that emitted the event
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            LedgerEvent::AccountCreated { account_id, .. }
            | LedgerEvent::AccountUpdated { account_id, .. }
            | LedgerEvent::AccountBalanceChanged { account_id, .. }
            | LedgerEvent::AccountStatusChanged { account_id, .. } => *account_id.as_uuid(),

            LedgerEvent::AccountingPeriodCreated { period_id, .. }
            | LedgerEvent::AccountingPeriodUpdated { period_id, .. }
            | LedgerEvent::AccountingPeriodClosed { period_id, .. }
            | LedgerEvent::AccountingPeriodReopened { period_id, .. } => *period_id.as_uuid(),

            LedgerEvent::JournalEntryCreated { entry_id, .. }
            | LedgerEvent::JournalEntryUpdated { entry_id, .. }
            | LedgerEvent::JournalEntryApproved { entry_id, .. }
            | LedgerEvent::JournalEntryRejected { entry_id, .. }
            | LedgerEvent::JournalEntryLineAdded { entry_id, .. }
            | LedgerEvent::JournalEntryPosted { entry_id, .. }
            | LedgerEvent::JournalEntryReversed { entry_id, .. } => *entry_id.as_uuid(),

            LedgerEvent::PostingBatchCreated { batch_id, .. }
            | LedgerEvent::PostingBatchEntryAdded { batch_id, .. }
            | LedgerEvent::PostingBatchApproved { batch_id, .. }
            | LedgerEvent::PostingBatchRejected { batch_id, .. }
            | LedgerEvent::PostingBatchPosted { batch_id, .. }
            | LedgerEvent::PostingBatchReversed { batch_id, .. } => *batch_id.as_uuid(),

            LedgerEvent::LedgerRowCreated { row_id, .. }
            | LedgerEvent::LedgerRowUpdated { row_id, .. } => *row_id.as_uuid(),
        }
    }

    /// Returns the event timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::AccountCreated { timestamp, .. }
            | LedgerEvent::AccountUpdated { timestamp, .. }
            | LedgerEvent::AccountBalanceChanged { timestamp, .. }
            | LedgerEvent::AccountStatusChanged { timestamp, .. }
            | LedgerEvent::AccountingPeriodCreated { timestamp, .. }
            | LedgerEvent::AccountingPeriodUpdated { timestamp, .. }
            | LedgerEvent::AccountingPeriodClosed { timestamp, .. }
            | LedgerEvent::AccountingPeriodReopened { timestamp, .. }
            | LedgerEvent::JournalEntryCreated { timestamp, .. }
            | LedgerEvent::JournalEntryUpdated { timestamp, .. }
            | LedgerEvent::JournalEntryApproved { timestamp, .. }
            | LedgerEvent::JournalEntryRejected { timestamp, .. }
            | LedgerEvent::JournalEntryLineAdded { timestamp, .. }
            | LedgerEvent::JournalEntryPosted { timestamp, .. }
            | LedgerEvent::JournalEntryReversed { timestamp, .. }
            | LedgerEvent::PostingBatchCreated { timestamp, .. }
            | LedgerEvent::PostingBatchEntryAdded { timestamp, .. }
            | LedgerEvent::PostingBatchApproved { timestamp, .. }
            | LedgerEvent::PostingBatchRejected { timestamp, .. }
            | LedgerEvent::PostingBatchPosted { timestamp, .. }
            | LedgerEvent::PostingBatchReversed { timestamp, .. }
            | LedgerEvent::LedgerRowCreated { timestamp, .. }
            | LedgerEvent::LedgerRowUpdated { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::AccountCreated { .. } => "AccountCreated",
            LedgerEvent::AccountUpdated { .. } => "AccountUpdated",
            LedgerEvent::AccountBalanceChanged { .. } => "AccountBalanceChanged",
            LedgerEvent::AccountStatusChanged { .. } => "AccountStatusChanged",
            LedgerEvent::AccountingPeriodCreated { .. } => "AccountingPeriodCreated",
            LedgerEvent::AccountingPeriodUpdated { .. } => "AccountingPeriodUpdated",
            LedgerEvent::AccountingPeriodClosed { .. } => "AccountingPeriodClosed",
            LedgerEvent::AccountingPeriodReopened { .. } => "AccountingPeriodReopened",
            LedgerEvent::JournalEntryCreated { .. } => "JournalEntryCreated",
            LedgerEvent::JournalEntryUpdated { .. } => "JournalEntryUpdated",
            LedgerEvent::JournalEntryApproved { .. } => "JournalEntryApproved",
            LedgerEvent::JournalEntryRejected { .. } => "JournalEntryRejected",
            LedgerEvent::JournalEntryLineAdded { .. } => "JournalEntryLineAdded",
            LedgerEvent::JournalEntryPosted { .. } => "JournalEntryPosted",
            LedgerEvent::JournalEntryReversed { .. } => "JournalEntryReversed",
            LedgerEvent::PostingBatchCreated { .. } => "PostingBatchCreated",
            LedgerEvent::PostingBatchEntryAdded { .. } => "PostingBatchEntryAdded",
            LedgerEvent::PostingBatchApproved { .. } => "PostingBatchApproved",
            LedgerEvent::PostingBatchRejected { .. } => "PostingBatchRejected",
            LedgerEvent::PostingBatchPosted { .. } => "PostingBatchPosted",
            LedgerEvent::PostingBatchReversed { .. } => "PostingBatchReversed",
            LedgerEvent::LedgerRowCreated { .. } => "LedgerRowCreated",
            LedgerEvent::LedgerRowUpdated { .. } => "LedgerRowUpdated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_serialized_form_is_tagged() {
        let account_id = AccountId::new();
        let event = LedgerEvent::AccountBalanceChanged {
            account_id,
            old_balance: dec!(0),
            new_balance: dec!(1000),
            amount: dec!(1000),
            side: EntrySide::Debit,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "AccountBalanceChanged");
        assert_eq!(json["payload"]["side"], "Debit");
        assert_eq!(event.aggregate_id(), *account_id.as_uuid());

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_type_matches_serde_tag() {
        let event = LedgerEvent::PostingBatchRejected {
            batch_id: PostingBatchId::new(),
            rejected_by: "controller".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }
}
