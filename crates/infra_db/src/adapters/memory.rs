//! In-Memory Ledger Store
//!
//! A [`LedgerStore`] that keeps the whole ledger behind a single mutex.
//! Each unit of work takes a snapshot when it begins, works on that
//! snapshot and publishes its writes on commit after re-checking the
//! version of every aggregate it wrote against the shared state. Used by the server when no database
//! is configured and by the service tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use core_kernel::{
    AccountId, AccountingPeriodId, AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable,
    JournalEntryId, LedgerRowId, PortError, PostingBatchId,
};
use domain_ledger::{
    Account, AccountingPeriod, GeneralLedgerRow, JournalEntry, LedgerStore, LedgerUnitOfWork,
    PostingBatch,
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    periods: BTreeMap<AccountingPeriodId, AccountingPeriod>,
    entries: BTreeMap<JournalEntryId, JournalEntry>,
    batches: BTreeMap<PostingBatchId, PostingBatch>,
    rows: Vec<GeneralLedgerRow>,
}

impl LedgerState {
    fn row_index(&self, id: LedgerRowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }
}

/// Mutex-guarded ledger shared by every unit of work
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed general ledger rows
    pub async fn ledger_row_count(&self) -> usize {
        self.state.lock().await.rows.len()
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let accounts = self.state.lock().await.accounts.len();

        HealthCheckResult {
            adapter_id: "memory-ledger-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: start.elapsed().as_millis() as u64,
            message: Some(format!("{} accounts", accounts)),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError> {
        let snapshot = self.state.lock().await.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            shared: Arc::clone(&self.state),
            committed_rows: snapshot.rows.len(),
            snapshot,
            account_bases: HashMap::new(),
            period_bases: BTreeMap::new(),
            entry_bases: BTreeMap::new(),
            batch_bases: BTreeMap::new(),
            annotated_rows: BTreeSet::new(),
        }))
    }
}

/// Snapshot-isolated unit of work over [`InMemoryLedgerStore`]
pub struct InMemoryUnitOfWork {
    shared: Arc<Mutex<LedgerState>>,
    snapshot: LedgerState,
    /// Rows present when the unit of work began; later rows are new
    committed_rows: usize,
    /// Version each written aggregate had when this unit of work began
    account_bases: HashMap<AccountId, u64>,
    period_bases: BTreeMap<AccountingPeriodId, u64>,
    entry_bases: BTreeMap<JournalEntryId, u64>,
    batch_bases: BTreeMap<PostingBatchId, u64>,
    annotated_rows: BTreeSet<LedgerRowId>,
}

fn stale(kind: &str, id: impl Display, saved: u64, stored: u64) -> PortError {
    PortError::conflict(format!(
        "{} {} is stale: saved from version {}, stored version is {}",
        kind, id, saved, stored
    ))
}

fn modified(kind: &str, id: impl Display, base: u64, current: u64) -> Result<(), PortError> {
    if base == current {
        return Ok(());
    }
    Err(PortError::conflict(format!(
        "{} {} was modified concurrently: expected version {}, found {}",
        kind, id, base, current
    )))
}

impl InMemoryUnitOfWork {
    /// Checks an entry against the snapshot and records its base version
    fn check_entry(&mut self, entry: &JournalEntry) -> Result<(), PortError> {
        let stored_version = self.snapshot.entries.get(&entry.id()).map(JournalEntry::version).unwrap_or(0);
        if entry.version() != stored_version {
            return Err(stale("Journal entry", entry.id(), entry.version(), stored_version));
        }
        self.entry_bases.entry(entry.id()).or_insert(stored_version);
        Ok(())
    }

    fn check_versions(&self, shared: &LedgerState) -> Result<(), PortError> {
        for (id, base) in &self.period_bases {
            let current = shared.periods.get(id).map(AccountingPeriod::version).unwrap_or(0);
            modified("Accounting period", id, *base, current)?;
        }
        for (id, base) in &self.entry_bases {
            let current = shared.entries.get(id).map(JournalEntry::version).unwrap_or(0);
            modified("Journal entry", id, *base, current)?;
        }
        for (id, base) in &self.batch_bases {
            let current = shared.batches.get(id).map(PostingBatch::version).unwrap_or(0);
            modified("Posting batch", id, *base, current)?;
        }

        for (id, base) in &self.account_bases {
            let current = shared.accounts.get(id).map(Account::version).unwrap_or(0);
            modified("Account", id, *base, current)?;

            if let Some(staged) = self.snapshot.accounts.get(id) {
                let taken = shared
                    .accounts
                    .values()
                    .any(|other| other.id() != *id && other.code() == staged.code());
                if taken {
                    return Err(PortError::conflict(format!(
                        "Account code '{}' already exists",
                        staged.code()
                    )));
                }
            }
        }

        for id in self.batch_bases.keys() {
            if let Some(staged) = self.snapshot.batches.get(id) {
                let taken = shared
                    .batches
                    .values()
                    .any(|other| other.id() != *id && other.batch_number() == staged.batch_number());
                if taken {
                    return Err(PortError::conflict(format!(
                        "Posting batch '{}' already exists",
                        staged.batch_number()
                    )));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerUnitOfWork for InMemoryUnitOfWork {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, PortError> {
        Ok(self.snapshot.accounts.get(&id).cloned())
    }

    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, PortError> {
        Ok(self
            .snapshot
            .accounts
            .values()
            .find(|account| account.code() == code)
            .cloned())
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, PortError> {
        let mut accounts: Vec<Account> = self.snapshot.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.code().cmp(b.code()));
        Ok(accounts)
    }

    async fn save_account(&mut self, account: &mut Account) -> Result<(), PortError> {
        let id = account.id();
        let stored_version = self.snapshot.accounts.get(&id).map(Account::version).unwrap_or(0);
        if account.version() != stored_version {
            return Err(stale("Account", id, account.version(), stored_version));
        }

        let duplicate = self
            .snapshot
            .accounts
            .values()
            .any(|other| other.id() != id && other.code() == account.code());
        if duplicate {
            return Err(PortError::conflict(format!(
                "Account code '{}' already exists",
                account.code()
            )));
        }

        self.account_bases.entry(id).or_insert(stored_version);
        account.mark_persisted();

        let mut stored = account.clone();
        let _ = stored.take_events();
        self.snapshot.accounts.insert(id, stored);
        Ok(())
    }

    async fn period(&mut self, id: AccountingPeriodId) -> Result<Option<AccountingPeriod>, PortError> {
        Ok(self.snapshot.periods.get(&id).cloned())
    }

    async fn periods_covering(&mut self, date: NaiveDate) -> Result<Vec<AccountingPeriod>, PortError> {
        Ok(self
            .snapshot
            .periods
            .values()
            .filter(|period| period.is_date_in_period(date))
            .cloned()
            .collect())
    }

    async fn list_periods(&mut self) -> Result<Vec<AccountingPeriod>, PortError> {
        let mut periods: Vec<AccountingPeriod> = self.snapshot.periods.values().cloned().collect();
        periods.sort_by_key(|period| (period.start_date(), period.end_date()));
        Ok(periods)
    }

    async fn save_period(&mut self, period: &mut AccountingPeriod) -> Result<(), PortError> {
        let id = period.id();
        let stored_version = self.snapshot.periods.get(&id).map(AccountingPeriod::version).unwrap_or(0);
        if period.version() != stored_version {
            return Err(stale("Accounting period", id, period.version(), stored_version));
        }

        self.period_bases.entry(id).or_insert(stored_version);
        period.mark_persisted();

        let mut stored = period.clone();
        let _ = stored.take_events();
        self.snapshot.periods.insert(id, stored);
        Ok(())
    }

    async fn journal_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
        Ok(self.snapshot.entries.get(&id).cloned())
    }

    async fn save_journal_entry(&mut self, entry: &mut JournalEntry) -> Result<(), PortError> {
        self.check_entry(entry)?;
        entry.mark_persisted();

        let mut stored = entry.clone();
        let _ = stored.take_events();
        self.snapshot.entries.insert(stored.id(), stored);
        Ok(())
    }

    async fn posting_batch(&mut self, id: PostingBatchId) -> Result<Option<PostingBatch>, PortError> {
        Ok(self.snapshot.batches.get(&id).cloned())
    }

    async fn batch_by_number(&mut self, batch_number: &str) -> Result<Option<PostingBatch>, PortError> {
        Ok(self
            .snapshot
            .batches
            .values()
            .find(|batch| batch.batch_number() == batch_number)
            .cloned())
    }

    async fn save_posting_batch(&mut self, batch: &mut PostingBatch) -> Result<(), PortError> {
        let id = batch.id();
        let stored_version = self.snapshot.batches.get(&id).map(PostingBatch::version).unwrap_or(0);
        if batch.version() != stored_version {
            return Err(stale("Posting batch", id, batch.version(), stored_version));
        }

        let duplicate = self
            .snapshot
            .batches
            .values()
            .any(|other| other.id() != batch.id() && other.batch_number() == batch.batch_number());
        if duplicate {
            return Err(PortError::conflict(format!(
                "Posting batch '{}' already exists",
                batch.batch_number()
            )));
        }

        for entry in batch.entries() {
            self.check_entry(entry)?;
        }
        self.batch_bases.entry(id).or_insert(stored_version);
        batch.mark_persisted();

        let mut stored = batch.clone();
        let _ = stored.take_events();
        for entry in stored.entries() {
            self.snapshot.entries.insert(entry.id(), entry.clone());
        }
        self.snapshot.batches.insert(id, stored);
        Ok(())
    }

    async fn append_ledger_rows(&mut self, rows: &[GeneralLedgerRow]) -> Result<(), PortError> {
        for row in rows {
            if self.snapshot.row_index(row.id()).is_some() {
                return Err(PortError::conflict(format!(
                    "General ledger row {} already exists",
                    row.id()
                )));
            }
            let mut stored = row.clone();
            let _ = stored.take_events();
            self.snapshot.rows.push(stored);
        }
        Ok(())
    }

    async fn ledger_row(&mut self, id: LedgerRowId) -> Result<Option<GeneralLedgerRow>, PortError> {
        Ok(self.snapshot.row_index(id).map(|index| self.snapshot.rows[index].clone()))
    }

    async fn update_ledger_row_metadata(&mut self, row: &GeneralLedgerRow) -> Result<(), PortError> {
        let index = self
            .snapshot
            .row_index(row.id())
            .ok_or_else(|| PortError::not_found("GeneralLedgerRow", row.id()))?;

        let existing = &self.snapshot.rows[index];
        if existing.debit() != row.debit()
            || existing.credit() != row.credit()
            || existing.account_id() != row.account_id()
            || existing.entry_id() != row.entry_id()
        {
            return Err(PortError::validation(format!(
                "General ledger row {} is append-only: amounts and account cannot change",
                row.id()
            )));
        }

        let mut stored = row.clone();
        let _ = stored.take_events();
        self.snapshot.rows[index] = stored;
        if index < self.committed_rows {
            self.annotated_rows.insert(row.id());
        }
        Ok(())
    }

    async fn ledger_rows_for_account(&mut self, account_id: AccountId) -> Result<Vec<GeneralLedgerRow>, PortError> {
        Ok(self
            .snapshot
            .rows
            .iter()
            .filter(|row| row.account_id() == account_id)
            .cloned()
            .collect())
    }

    async fn ledger_rows_for_entry(&mut self, entry_id: JournalEntryId) -> Result<Vec<GeneralLedgerRow>, PortError> {
        Ok(self
            .snapshot
            .rows
            .iter()
            .filter(|row| row.entry_id() == entry_id)
            .cloned()
            .collect())
    }

    async fn all_ledger_rows(&mut self) -> Result<Vec<GeneralLedgerRow>, PortError> {
        Ok(self.snapshot.rows.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let mut shared = self.shared.lock().await;
        self.check_versions(&shared)?;

        let new_rows = &self.snapshot.rows[self.committed_rows..];
        if let Some(row) = new_rows.iter().find(|row| shared.row_index(row.id()).is_some()) {
            return Err(PortError::conflict(format!(
                "General ledger row {} already exists",
                row.id()
            )));
        }

        for id in self.account_bases.keys() {
            if let Some(account) = self.snapshot.accounts.get(id) {
                shared.accounts.insert(*id, account.clone());
            }
        }
        for id in self.period_bases.keys() {
            if let Some(period) = self.snapshot.periods.get(id) {
                shared.periods.insert(*id, period.clone());
            }
        }
        for id in self.entry_bases.keys() {
            if let Some(entry) = self.snapshot.entries.get(id) {
                shared.entries.insert(*id, entry.clone());
            }
        }
        for id in self.batch_bases.keys() {
            if let Some(batch) = self.snapshot.batches.get(id) {
                shared.batches.insert(*id, batch.clone());
            }
        }
        for id in &self.annotated_rows {
            let annotated = self.snapshot.row_index(*id).map(|index| self.snapshot.rows[index].clone());
            if let (Some(index), Some(row)) = (shared.row_index(*id), annotated) {
                shared.rows[index] = row;
            }
        }
        shared.rows.extend(new_rows.iter().cloned());

        debug!(
            accounts = self.account_bases.len(),
            periods = self.period_bases.len(),
            entries = self.entry_bases.len(),
            batches = self.batch_bases.len(),
            rows = new_rows.len(),
            "Unit of work committed"
        );
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        debug!("Unit of work rolled back");
        Ok(())
    }
}
