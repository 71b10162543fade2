//! Ledger Port Definitions
//!
//! The ledger core depends on three collaborators:
//!
//! - [`LedgerStore`]: persistence, exposing a [`LedgerUnitOfWork`] transaction scope
//! - [`PeriodResolver`]: maps a business date to its accounting period
//! - [`EventSink`]: receives drained domain events after a successful commit
//!
//! # Unit of work
//!
//! Every change made through a unit of work is invisible to other readers
//! until [`LedgerUnitOfWork::commit`] succeeds. Dropping or rolling back a
//! unit of work discards all of it. Saves of accounts, periods, journal
//! entries and batches are checked against the version the aggregate was
//! loaded with; a concurrent writer surfaces as `PortError::Conflict`.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;
use tracing::info;

use core_kernel::{
    AccountId, AccountingPeriodId, DomainPort, JournalEntryId, LedgerRowId, PortError,
    PostingBatchId,
};

use crate::account::Account;
use crate::batch::PostingBatch;
use crate::events::LedgerEvent;
use crate::general_ledger::GeneralLedgerRow;
use crate::journal::JournalEntry;
use crate::period::{AccountingPeriod, PeriodType};

/// Resolves business dates to accounting periods
pub trait PeriodResolver {
    /// Returns the period governing `date`, if any
    fn resolve(&self, date: NaiveDate) -> Option<AccountingPeriod>;

    /// Returns a period by id
    fn period(&self, id: AccountingPeriodId) -> Option<AccountingPeriod>;

    /// Returns every period whose range contains `date`
    fn covering(&self, date: NaiveDate) -> Vec<AccountingPeriod>;
}

/// Resolution over an in-memory list of periods
///
/// When several periods cover a date, regular periods win over adjustment
/// periods and shorter period types win over longer ones, so a closed month
/// blocks postings even while its quarter is still open.
impl PeriodResolver for Vec<AccountingPeriod> {
    fn resolve(&self, date: NaiveDate) -> Option<AccountingPeriod> {
        self.iter()
            .filter(|p| p.is_date_in_period(date))
            .min_by_key(|p| (p.is_adjustment_period(), period_rank(p.period_type())))
            .cloned()
    }

    fn period(&self, id: AccountingPeriodId) -> Option<AccountingPeriod> {
        self.iter().find(|p| p.id() == id).cloned()
    }

    fn covering(&self, date: NaiveDate) -> Vec<AccountingPeriod> {
        self.iter().filter(|p| p.is_date_in_period(date)).cloned().collect()
    }
}

fn period_rank(period_type: PeriodType) -> u8 {
    match period_type {
        PeriodType::Monthly => 0,
        PeriodType::Quarterly => 1,
        PeriodType::Yearly => 2,
    }
}

/// Transaction scope over the ledger's persistent state
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    // Accounts
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, PortError>;
    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, PortError>;
    async fn list_accounts(&mut self) -> Result<Vec<Account>, PortError>;
    /// Inserts or updates an account, checking its version, then bumps the version
    async fn save_account(&mut self, account: &mut Account) -> Result<(), PortError>;

    // Periods
    async fn period(&mut self, id: AccountingPeriodId) -> Result<Option<AccountingPeriod>, PortError>;
    async fn periods_covering(&mut self, date: NaiveDate) -> Result<Vec<AccountingPeriod>, PortError>;
    async fn list_periods(&mut self) -> Result<Vec<AccountingPeriod>, PortError>;
    /// Inserts or updates a period, checking its version, then bumps the version
    async fn save_period(&mut self, period: &mut AccountingPeriod) -> Result<(), PortError>;

    // Journal entries
    async fn journal_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError>;
    /// Inserts or updates an entry, checking its version, then bumps the version
    async fn save_journal_entry(&mut self, entry: &mut JournalEntry) -> Result<(), PortError>;

    // Posting batches
    async fn posting_batch(&mut self, id: PostingBatchId) -> Result<Option<PostingBatch>, PortError>;
    async fn batch_by_number(&mut self, batch_number: &str) -> Result<Option<PostingBatch>, PortError>;
    /// Saves the batch and every entry it contains, checking each version
    async fn save_posting_batch(&mut self, batch: &mut PostingBatch) -> Result<(), PortError>;

    // General ledger
    /// Appends rows; existing rows are never overwritten
    async fn append_ledger_rows(&mut self, rows: &[GeneralLedgerRow]) -> Result<(), PortError>;
    async fn ledger_row(&mut self, id: LedgerRowId) -> Result<Option<GeneralLedgerRow>, PortError>;
    /// Persists descriptive metadata of an existing row; amounts are left untouched
    async fn update_ledger_row_metadata(&mut self, row: &GeneralLedgerRow) -> Result<(), PortError>;
    async fn ledger_rows_for_account(&mut self, account_id: AccountId) -> Result<Vec<GeneralLedgerRow>, PortError>;
    async fn ledger_rows_for_entry(&mut self, entry_id: JournalEntryId) -> Result<Vec<GeneralLedgerRow>, PortError>;
    async fn all_ledger_rows(&mut self) -> Result<Vec<GeneralLedgerRow>, PortError>;

    /// Makes every staged change visible atomically
    async fn commit(self: Box<Self>) -> Result<(), PortError>;

    /// Discards every staged change
    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}

/// Persistence collaborator for the ledger
#[async_trait]
pub trait LedgerStore: DomainPort {
    /// Opens a new unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError>;
}

/// Receives events drained from aggregates after a successful commit
pub trait EventSink: Send + Sync {
    fn publish(&self, events: &[LedgerEvent]);
}

/// Writes every event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, events: &[LedgerEvent]) {
        for event in events {
            info!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                timestamp = %event.timestamp(),
                "Ledger event"
            );
        }
    }
}

/// Collects events in memory
#[derive(Debug, Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything published so far
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Event type names in publication order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(LedgerEvent::event_type).collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn publish(&self, events: &[LedgerEvent]) {
        if let Ok(mut stored) = self.events.lock() {
            stored.extend_from_slice(events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(name: &str, start: NaiveDate, end: NaiveDate, period_type: PeriodType) -> AccountingPeriod {
        AccountingPeriod::create(AccountingPeriodId::new(), name, start, end, 2024, period_type).unwrap()
    }

    #[test]
    fn test_resolver_prefers_shortest_regular_period() {
        let year = period("FY2024", date(2024, 1, 1), date(2024, 12, 31), PeriodType::Yearly);
        let q1 = period("Q1", date(2024, 1, 1), date(2024, 3, 31), PeriodType::Quarterly);
        let feb = period("Feb", date(2024, 2, 1), date(2024, 2, 29), PeriodType::Monthly);
        let periods = vec![year.clone(), q1.clone(), feb.clone()];

        assert_eq!(periods.resolve(date(2024, 2, 10)).unwrap().id(), feb.id());
        assert_eq!(periods.resolve(date(2024, 3, 10)).unwrap().id(), q1.id());
        assert_eq!(periods.resolve(date(2024, 7, 1)).unwrap().id(), year.id());
        assert!(periods.resolve(date(2025, 1, 1)).is_none());
        assert_eq!(periods.period(q1.id()).unwrap().name(), "Q1");
        assert_eq!(periods.covering(date(2024, 2, 10)).len(), 3);
        assert_eq!(periods.covering(date(2024, 7, 1)).len(), 1);
    }

    #[test]
    fn test_adjustment_period_loses_to_regular() {
        let dec = period("Dec", date(2024, 12, 1), date(2024, 12, 31), PeriodType::Monthly);
        let adj = period("Dec adj", date(2024, 12, 1), date(2024, 12, 31), PeriodType::Monthly)
            .as_adjustment_period();
        let periods = vec![adj, dec.clone()];

        assert_eq!(periods.resolve(date(2024, 12, 31)).unwrap().id(), dec.id());
    }

    #[test]
    fn test_in_memory_sink_collects() {
        let sink = InMemoryEventSink::new();
        let mut p = period("Jan", date(2024, 1, 1), date(2024, 1, 31), PeriodType::Monthly);
        sink.publish(&p.take_events());
        assert_eq!(sink.event_types(), vec!["AccountingPeriodCreated"]);
    }
}
