//! Posting engine
//!
//! The engine turns a balanced draft entry (or an approved batch of them)
//! into account balance movements and append-only general ledger rows.
//!
//! # Invariants
//!
//! - Every posted entry balances within the tolerance
//! - Each account's balance equals its opening balance plus the signed sum
//!   of every posted line against it
//! - A failed post leaves entries, accounts and ledger rows untouched
//!
//! Posting works on staged clones of the entry and of every account it
//! touches. The originals are replaced only after every line has been
//! applied, so an error half-way through has no visible effect.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use core_kernel::{AccountId, AccountingPeriodId, IdGenerator, LedgerRowId};

use crate::account::Account;
use crate::batch::PostingBatch;
use crate::error::LedgerError;
use crate::general_ledger::{ClassificationTag, GeneralLedgerRow};
use crate::journal::JournalEntry;
use crate::metrics::{LedgerMetric, MetricsCollector, NoopMetrics};
use crate::ports::PeriodResolver;

/// Posting rules that vary by deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingPolicy {
    /// Fail when no accounting period covers an entry's date
    pub require_period: bool,
    /// Fail when a line targets an inactive account
    pub reject_inactive_accounts: bool,
    /// Post standalone entries only once they are approved
    pub require_entry_approval: bool,
}

impl Default for PostingPolicy {
    fn default() -> Self {
        Self {
            require_period: true,
            reject_inactive_accounts: true,
            require_entry_approval: false,
        }
    }
}

/// The accounts a posting may touch, keyed by id
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    accounts: HashMap<AccountId, Account>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.id(), account);
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn get_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Account> {
        self.accounts.values_mut()
    }

    pub fn into_accounts(self) -> Vec<Account> {
        self.accounts.into_values().collect()
    }

    /// Clones the accounts named by `ids` into a separate book
    fn stage<I>(&self, ids: I) -> AccountBook
    where
        I: IntoIterator<Item = AccountId>,
    {
        let mut staged = AccountBook::new();
        for id in ids {
            if let Some(account) = self.accounts.get(&id) {
                staged.accounts.entry(id).or_insert_with(|| account.clone());
            }
        }
        staged
    }

    /// Replaces accounts with their staged versions
    fn absorb(&mut self, staged: AccountBook) {
        self.accounts.extend(staged.accounts);
    }
}

impl FromIterator<Account> for AccountBook {
    fn from_iter<T: IntoIterator<Item = Account>>(iter: T) -> Self {
        let mut book = AccountBook::new();
        for account in iter {
            book.insert(account);
        }
        book
    }
}

/// What a successful post produced
#[derive(Debug, Clone, Default)]
pub struct PostingOutcome {
    /// New general ledger rows, one per posted line, in line order
    pub ledger_rows: Vec<GeneralLedgerRow>,
    /// Accounts whose balance moved, in first-touched order
    pub touched_accounts: Vec<AccountId>,
}

/// Applies journal entries and batches to accounts and the general ledger
pub struct PostingEngine {
    metrics: Arc<dyn MetricsCollector>,
    policy: PostingPolicy,
}

impl Default for PostingEngine {
    fn default() -> Self {
        Self::new(Arc::new(NoopMetrics), PostingPolicy::default())
    }
}

impl PostingEngine {
    pub fn new(metrics: Arc<dyn MetricsCollector>, policy: PostingPolicy) -> Self {
        Self { metrics, policy }
    }

    pub fn policy(&self) -> PostingPolicy {
        self.policy
    }

    /// Posts a standalone entry
    ///
    /// # Arguments
    ///
    /// * `entry` - Draft entry; on success it is posted
    /// * `accounts` - Every account the entry's lines reference
    /// * `periods` - Period lookup for the entry's date
    /// * `ids` - Source of ledger row ids
    ///
    /// # Errors
    ///
    /// - `LedgerError::EntryManagedByBatch` if a batch owns the entry
    /// - `LedgerError::EntryNotApproved` when the policy requires approval
    /// - `LedgerError::NoPeriodForDate`, `PeriodClosed` or `DateOutsidePeriod` from the period gate
    /// - `LedgerError::NotFound`, `AccountInactive` or `AccountNoDirectPosting` for a bad line account
    /// - `LedgerError::EntryAlreadyPosted` or `UnbalancedEntry` from the entry itself
    pub fn post_entry(
        &self,
        entry: &mut JournalEntry,
        accounts: &mut AccountBook,
        periods: &dyn PeriodResolver,
        ids: &dyn IdGenerator,
    ) -> Result<PostingOutcome, LedgerError> {
        let result = self.try_post_entry(entry, accounts, periods, ids);
        if let Err(error) = &result {
            self.record_failure("entry", &entry.id().to_string(), error);
        }
        result
    }

    fn try_post_entry(
        &self,
        entry: &mut JournalEntry,
        accounts: &mut AccountBook,
        periods: &dyn PeriodResolver,
        ids: &dyn IdGenerator,
    ) -> Result<PostingOutcome, LedgerError> {
        ensure_standalone(entry)?;
        if self.policy.require_entry_approval {
            entry.ensure_approved()?;
        }

        let period_id = self.gate_period(entry, entry.period_id(), periods)?;
        self.check_accounts(entry, accounts)?;

        let mut staged_entry = entry.clone();
        staged_entry.post()?;

        let mut staged_accounts =
            accounts.stage(entry.lines().iter().map(|line| line.account_id()));
        let mut outcome = PostingOutcome::default();
        self.apply_entry(&staged_entry, period_id, &mut staged_accounts, ids, &mut outcome)?;

        *entry = staged_entry;
        accounts.absorb(staged_accounts);

        self.metrics.increment(LedgerMetric::EntriesPosted, 1);
        self.record_applied(&outcome);
        info!(
            entry_id = %entry.id(),
            reference = entry.reference_number(),
            lines = entry.lines().len(),
            total = %entry.total_debits(),
            "Journal entry posted"
        );

        Ok(outcome)
    }

    /// Posts every entry of an approved draft batch
    ///
    /// Entries without a period of their own are booked to the batch's
    /// period when it has one. Every entry is checked against the period gate and its accounts
    /// before anything is applied; on error the batch, its entries and the
    /// accounts are left exactly as they were.
    ///
    /// # Errors
    ///
    /// - `LedgerError::BatchNotDraft` or `BatchNotApproved` for the batch state
    /// - any error [`post_entry`](Self::post_entry) reports for one of the entries
    pub fn post_batch(
        &self,
        batch: &mut PostingBatch,
        posted_by: &str,
        accounts: &mut AccountBook,
        periods: &dyn PeriodResolver,
        ids: &dyn IdGenerator,
    ) -> Result<PostingOutcome, LedgerError> {
        let result = self.try_post_batch(batch, posted_by, accounts, periods, ids);
        if let Err(error) = &result {
            self.record_failure("batch", &batch.id().to_string(), error);
        }
        result
    }

    fn try_post_batch(
        &self,
        batch: &mut PostingBatch,
        posted_by: &str,
        accounts: &mut AccountBook,
        periods: &dyn PeriodResolver,
        ids: &dyn IdGenerator,
    ) -> Result<PostingOutcome, LedgerError> {
        batch.check_postable()?;

        let mut period_ids = Vec::with_capacity(batch.entry_count());
        for entry in batch.entries() {
            let assigned = entry.period_id().or(batch.period_id());
            period_ids.push(self.gate_period(entry, assigned, periods)?);
            self.check_accounts(entry, accounts)?;
        }

        let mut staged_batch = batch.clone();
        staged_batch.post(posted_by)?;

        let mut staged_accounts = accounts.stage(
            batch
                .entries()
                .iter()
                .flat_map(|entry| entry.lines().iter().map(|line| line.account_id())),
        );
        let mut outcome = PostingOutcome::default();
        for (entry, period_id) in staged_batch.entries().iter().zip(period_ids) {
            self.apply_entry(entry, period_id, &mut staged_accounts, ids, &mut outcome)?;
        }

        *batch = staged_batch;
        accounts.absorb(staged_accounts);

        self.metrics
            .increment(LedgerMetric::EntriesPosted, batch.entry_count() as u64);
        self.metrics.increment(LedgerMetric::BatchesPosted, 1);
        self.record_applied(&outcome);
        info!(
            batch_id = %batch.id(),
            batch_number = batch.batch_number(),
            entries = batch.entry_count(),
            posted_by,
            "Posting batch posted"
        );

        Ok(outcome)
    }

    /// Records a reversal marker on a standalone posted entry
    ///
    /// No balance moves; see [`JournalEntry::reverse`].
    ///
    /// # Errors
    ///
    /// `LedgerError::EntryManagedByBatch` if a batch owns the entry, or any
    /// error from [`JournalEntry::reverse`]
    pub fn reverse_entry(
        &self,
        entry: &mut JournalEntry,
        date: NaiveDate,
        reason: &str,
    ) -> Result<(), LedgerError> {
        ensure_standalone(entry)?;
        entry.reverse(date, reason)?;
        self.metrics.increment(LedgerMetric::EntriesReversed, 1);
        info!(entry_id = %entry.id(), %date, reason, "Journal entry reversed");
        Ok(())
    }

    /// Marks a posted batch and all its entries reversed
    pub fn reverse_batch(
        &self,
        batch: &mut PostingBatch,
        reversed_by: &str,
        reason: &str,
    ) -> Result<(), LedgerError> {
        batch.reverse(reversed_by, reason)?;
        self.metrics
            .increment(LedgerMetric::EntriesReversed, batch.entry_count() as u64);
        self.metrics.increment(LedgerMetric::BatchesReversed, 1);
        info!(batch_id = %batch.id(), reversed_by, reason, "Posting batch reversed");
        Ok(())
    }

    /// Approves a standalone draft entry
    ///
    /// # Errors
    ///
    /// `LedgerError::EntryManagedByBatch` if a batch owns the entry, or any
    /// error from [`JournalEntry::approve`]
    pub fn approve_entry(&self, entry: &mut JournalEntry, approved_by: &str) -> Result<(), LedgerError> {
        ensure_standalone(entry)?;
        entry.approve(approved_by)?;
        self.metrics.increment(LedgerMetric::EntriesApproved, 1);
        info!(entry_id = %entry.id(), approved_by, "Journal entry approved");
        Ok(())
    }

    /// Rejects a standalone draft entry
    pub fn reject_entry(&self, entry: &mut JournalEntry, rejected_by: &str) -> Result<(), LedgerError> {
        ensure_standalone(entry)?;
        entry.reject(rejected_by)?;
        self.metrics.increment(LedgerMetric::EntriesRejected, 1);
        info!(entry_id = %entry.id(), rejected_by, "Journal entry rejected");
        Ok(())
    }

    /// Approves a batch
    pub fn approve_batch(&self, batch: &mut PostingBatch, approved_by: &str) -> Result<(), LedgerError> {
        batch.approve(approved_by)?;
        self.metrics.increment(LedgerMetric::BatchesApproved, 1);
        info!(batch_id = %batch.id(), approved_by, "Posting batch approved");
        Ok(())
    }

    /// Rejects a batch
    pub fn reject_batch(&self, batch: &mut PostingBatch, rejected_by: &str) -> Result<(), LedgerError> {
        batch.reject(rejected_by)?;
        self.metrics.increment(LedgerMetric::BatchesRejected, 1);
        info!(batch_id = %batch.id(), rejected_by, "Posting batch rejected");
        Ok(())
    }

    /// Finds the period governing an entry and checks it accepts the entry's date
    ///
    /// `assigned` is the period the entry was explicitly booked to, if any.
    /// Outside adjustment periods, every regular period covering the date
    /// must also be open, so a closed year blocks its still-open months.
    fn gate_period(
        &self,
        entry: &JournalEntry,
        assigned: Option<AccountingPeriodId>,
        periods: &dyn PeriodResolver,
    ) -> Result<Option<AccountingPeriodId>, LedgerError> {
        let period = match assigned {
            Some(id) => Some(
                periods
                    .period(id)
                    .ok_or_else(|| LedgerError::not_found("AccountingPeriod", id))?,
            ),
            None => periods.resolve(entry.date()),
        };

        let period = match period {
            Some(period) => period,
            None if self.policy.require_period => {
                return Err(LedgerError::NoPeriodForDate { date: entry.date() });
            }
            None => return Ok(None),
        };

        period.ensure_accepts(entry.date())?;
        if !period.is_adjustment_period() {
            for covering in periods.covering(entry.date()) {
                if !covering.is_adjustment_period() {
                    covering.ensure_open()?;
                }
            }
        }
        Ok(Some(period.id()))
    }

    fn check_accounts(&self, entry: &JournalEntry, accounts: &AccountBook) -> Result<(), LedgerError> {
        for line in entry.lines() {
            let account = accounts
                .get(line.account_id())
                .ok_or_else(|| LedgerError::not_found("Account", line.account_id()))?;

            if self.policy.reject_inactive_accounts && !account.is_active() {
                return Err(LedgerError::AccountInactive {
                    account_id: account.id().to_string(),
                });
            }
            if !account.allows_direct_posting() {
                return Err(LedgerError::AccountNoDirectPosting {
                    account_id: account.id().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Moves balances and emits one ledger row per line of a posted entry
    fn apply_entry(
        &self,
        entry: &JournalEntry,
        period_id: Option<AccountingPeriodId>,
        accounts: &mut AccountBook,
        ids: &dyn IdGenerator,
        outcome: &mut PostingOutcome,
    ) -> Result<(), LedgerError> {
        for line in entry.lines() {
            let account = accounts
                .get_mut(line.account_id())
                .ok_or_else(|| LedgerError::not_found("Account", line.account_id()))?;

            let new_balance = account.apply(line.side(), line.amount())?;
            debug!(
                account_id = %account.id(),
                side = %line.side(),
                amount = %line.amount(),
                %new_balance,
                "Balance updated"
            );

            let classification = line
                .classification()
                .or(account.classification())
                .unwrap_or(ClassificationTag::General);
            let row = GeneralLedgerRow::from_posted_line(
                LedgerRowId::from_uuid(ids.next_id()),
                entry,
                line,
                classification,
                period_id,
            )?;

            if !outcome.touched_accounts.contains(&account.id()) {
                outcome.touched_accounts.push(account.id());
            }
            outcome.ledger_rows.push(row);
        }
        Ok(())
    }

    fn record_applied(&self, outcome: &PostingOutcome) {
        let rows = outcome.ledger_rows.len() as u64;
        self.metrics.increment(LedgerMetric::LinesPosted, rows);
        self.metrics.increment(LedgerMetric::LedgerRowsWritten, rows);
        self.metrics.increment(LedgerMetric::BalanceChanges, rows);
    }

    fn record_failure(&self, target: &'static str, id: &str, error: &LedgerError) {
        self.metrics.increment(LedgerMetric::PostingFailures, 1);
        warn!(target_kind = target, id, error = %error, kind = ?error.kind(), "Posting rejected");
    }
}

/// Batch-owned entries are approved, posted and reversed through their batch
fn ensure_standalone(entry: &JournalEntry) -> Result<(), LedgerError> {
    match entry.batch_id() {
        Some(batch_id) => Err(LedgerError::EntryManagedByBatch {
            entry_id: entry.id().to_string(),
            batch_id: batch_id.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountCategory;
    use crate::batch::BatchStatus;
    use crate::journal::JournalEntryUpdate;
    use crate::period::{AccountingPeriod, PeriodType};
    use core_kernel::{JournalEntryId, JournalLineId, PostingBatchId, SequentialIdGenerator};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(category: AccountCategory, code: &str) -> Account {
        Account::create(AccountId::new(), category, code, None, code, dec!(0)).unwrap()
    }

    fn march() -> Vec<AccountingPeriod> {
        vec![AccountingPeriod::create(
            AccountingPeriodId::new(),
            "March 2024",
            date(2024, 3, 1),
            date(2024, 3, 31),
            2024,
            PeriodType::Monthly,
        )
        .unwrap()]
    }

    fn entry(reference: &str, debit_to: AccountId, credit_to: AccountId, amount: Decimal) -> JournalEntry {
        let mut entry = JournalEntry::create(
            JournalEntryId::new(),
            date(2024, 3, 15),
            reference,
            "",
            "Manual",
            None,
            amount,
        )
        .unwrap();
        entry.add_line(JournalLineId::new(), debit_to, amount, dec!(0), None).unwrap();
        entry.add_line(JournalLineId::new(), credit_to, dec!(0), amount, None).unwrap();
        entry
    }

    #[test]
    fn test_post_entry_moves_balances_and_writes_rows() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000")
            .with_classification(ClassificationTag::Sales);
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();
        let mut entry = entry("JE-1", cash_id, revenue_id, dec!(1000));

        let outcome = PostingEngine::default()
            .post_entry(&mut entry, &mut book, &march(), &SequentialIdGenerator::new())
            .unwrap();

        assert!(entry.is_posted());
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(1000));
        assert_eq!(book.get(revenue_id).unwrap().balance(), dec!(1000));
        assert_eq!(outcome.ledger_rows.len(), 2);
        assert_eq!(outcome.ledger_rows[0].debit(), dec!(1000));
        assert_eq!(outcome.ledger_rows[0].classification(), ClassificationTag::General);
        assert_eq!(outcome.ledger_rows[1].credit(), dec!(1000));
        assert_eq!(outcome.ledger_rows[1].classification(), ClassificationTag::Sales);
        assert!(outcome.ledger_rows.iter().all(|r| r.period_id().is_some()));
        assert_eq!(outcome.touched_accounts, vec![cash_id, revenue_id]);
    }

    #[test]
    fn test_line_classification_overrides_account_default() {
        let cash = account(AccountCategory::Asset, "1000");
        let expense = account(AccountCategory::Expense, "6000")
            .with_classification(ClassificationTag::Administrative);
        let (cash_id, expense_id) = (cash.id(), expense.id());
        let mut book: AccountBook = vec![cash, expense].into_iter().collect();

        let mut entry = JournalEntry::create(
            JournalEntryId::new(),
            date(2024, 3, 15),
            "JE-9",
            "",
            "Manual",
            None,
            dec!(40),
        )
        .unwrap();
        let line = crate::journal::JournalEntryLine::create(
            JournalLineId::new(),
            entry.id(),
            expense_id,
            dec!(40),
            dec!(0),
            None,
        )
        .unwrap()
        .with_classification(ClassificationTag::Maintenance);
        entry.push_line(line).unwrap();
        entry.add_line(JournalLineId::new(), cash_id, dec!(0), dec!(40), None).unwrap();

        let outcome = PostingEngine::default()
            .post_entry(&mut entry, &mut book, &march(), &SequentialIdGenerator::new())
            .unwrap();
        assert_eq!(outcome.ledger_rows[0].classification(), ClassificationTag::Maintenance);
    }

    #[test]
    fn test_unbalanced_entry_changes_nothing() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();

        let mut entry = JournalEntry::create(
            JournalEntryId::new(),
            date(2024, 3, 15),
            "JE-2",
            "",
            "Manual",
            None,
            dec!(1000),
        )
        .unwrap();
        entry.add_line(JournalLineId::new(), cash_id, dec!(1000), dec!(0), None).unwrap();
        entry.add_line(JournalLineId::new(), revenue_id, dec!(0), dec!(900), None).unwrap();

        let result = PostingEngine::default().post_entry(
            &mut entry,
            &mut book,
            &march(),
            &SequentialIdGenerator::new(),
        );

        assert!(matches!(result, Err(LedgerError::UnbalancedEntry { .. })));
        assert!(!entry.is_posted());
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(0));
        assert_eq!(book.get(revenue_id).unwrap().balance(), dec!(0));
    }

    #[test]
    fn test_period_gate() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();
        let ids = SequentialIdGenerator::new();

        let mut periods = march();
        periods[0].close().unwrap();
        let mut closed = entry("JE-3", cash_id, revenue_id, dec!(10));
        let result = PostingEngine::default().post_entry(&mut closed, &mut book, &periods, &ids);
        assert!(matches!(result, Err(LedgerError::PeriodClosed { .. })));

        let none: Vec<AccountingPeriod> = Vec::new();
        let mut orphan = entry("JE-4", cash_id, revenue_id, dec!(10));
        let result = PostingEngine::default().post_entry(&mut orphan, &mut book, &none, &ids);
        assert!(matches!(result, Err(LedgerError::NoPeriodForDate { .. })));

        let lenient = PostingEngine::new(
            Arc::new(NoopMetrics),
            PostingPolicy {
                require_period: false,
                ..PostingPolicy::default()
            },
        );
        lenient.post_entry(&mut orphan, &mut book, &none, &ids).unwrap();
        assert!(orphan.is_posted());
    }

    #[test]
    fn test_closed_year_blocks_open_month() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();

        let mut year = AccountingPeriod::create(
            AccountingPeriodId::new(),
            "FY2024",
            date(2024, 1, 1),
            date(2024, 12, 31),
            2024,
            PeriodType::Yearly,
        )
        .unwrap();
        year.close().unwrap();
        let year_id = year.id();
        let mut periods = march();
        periods.push(year);

        let mut entry = entry("JE-20", cash_id, revenue_id, dec!(10));
        let result = PostingEngine::default().post_entry(
            &mut entry,
            &mut book,
            &periods,
            &SequentialIdGenerator::new(),
        );

        assert!(
            matches!(result, Err(LedgerError::PeriodClosed { ref period_id }) if *period_id == year_id.to_string())
        );
        assert!(!entry.is_posted());
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(0));
    }

    #[test]
    fn test_adjustment_period_ignores_closed_year() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();

        let mut year = AccountingPeriod::create(
            AccountingPeriodId::new(),
            "FY2024",
            date(2024, 1, 1),
            date(2024, 12, 31),
            2024,
            PeriodType::Yearly,
        )
        .unwrap();
        year.close().unwrap();
        let adjustment = AccountingPeriod::create(
            AccountingPeriodId::new(),
            "FY2024 adjustments",
            date(2024, 3, 1),
            date(2024, 3, 31),
            2024,
            PeriodType::Monthly,
        )
        .unwrap()
        .as_adjustment_period();
        let adjustment_id = adjustment.id();
        let periods = vec![year, adjustment];

        let mut entry = JournalEntry::create(
            JournalEntryId::new(),
            date(2024, 3, 15),
            "JE-21",
            "",
            "Manual",
            Some(adjustment_id),
            dec!(10),
        )
        .unwrap();
        entry.add_line(JournalLineId::new(), cash_id, dec!(10), dec!(0), None).unwrap();
        entry.add_line(JournalLineId::new(), revenue_id, dec!(0), dec!(10), None).unwrap();

        let outcome = PostingEngine::default()
            .post_entry(&mut entry, &mut book, &periods, &SequentialIdGenerator::new())
            .unwrap();
        assert!(outcome.ledger_rows.iter().all(|r| r.period_id() == Some(adjustment_id)));
    }

    #[test]
    fn test_batch_period_is_gated() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();

        let mut periods = march();
        let march_id = periods[0].id();
        periods[0].close().unwrap();

        let mut batch = PostingBatch::create(
            PostingBatchId::new(),
            "B-4",
            date(2024, 3, 31),
            None,
            Some(march_id),
        )
        .unwrap();
        let mut undated = entry("JE-22", cash_id, revenue_id, dec!(10));
        undated
            .update(JournalEntryUpdate {
                date: Some(date(2024, 5, 2)),
                ..Default::default()
            })
            .unwrap();
        batch.add_journal_entry(undated).unwrap();
        batch.approve("controller").unwrap();

        let lenient = PostingEngine::new(
            Arc::new(NoopMetrics),
            PostingPolicy {
                require_period: false,
                ..PostingPolicy::default()
            },
        );
        let result = lenient.post_batch(
            &mut batch,
            "clerk",
            &mut book,
            &periods,
            &SequentialIdGenerator::new(),
        );
        assert!(matches!(result, Err(LedgerError::PeriodClosed { .. })));
        assert_eq!(batch.status(), BatchStatus::Draft);

        periods[0].reopen().unwrap();
        let result = lenient.post_batch(
            &mut batch,
            "clerk",
            &mut book,
            &periods,
            &SequentialIdGenerator::new(),
        );
        assert!(matches!(result, Err(LedgerError::DateOutsidePeriod { .. })));
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(0));
    }

    #[test]
    fn test_entry_approval_policy() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();
        let ids = SequentialIdGenerator::new();

        let strict = PostingEngine::new(
            Arc::new(NoopMetrics),
            PostingPolicy {
                require_entry_approval: true,
                ..PostingPolicy::default()
            },
        );
        let mut entry = entry("JE-30", cash_id, revenue_id, dec!(25));

        let result = strict.post_entry(&mut entry, &mut book, &march(), &ids);
        assert!(matches!(result, Err(LedgerError::EntryNotApproved { .. })));

        strict.reject_entry(&mut entry, "bob").unwrap();
        let result = strict.post_entry(&mut entry, &mut book, &march(), &ids);
        assert!(matches!(result, Err(LedgerError::EntryNotApproved { ref approval_status, .. }) if approval_status == "Rejected"));
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(0));

        strict.approve_entry(&mut entry, "alice").unwrap();
        strict.post_entry(&mut entry, &mut book, &march(), &ids).unwrap();
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(25));

        let mut unapproved = self::entry("JE-31", cash_id, revenue_id, dec!(5));
        PostingEngine::default()
            .post_entry(&mut unapproved, &mut book, &march(), &ids)
            .unwrap();
    }

    #[test]
    fn test_batch_entry_approved_through_batch_only() {
        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-5", date(2024, 3, 31), None, None).unwrap();
        batch
            .add_journal_entry(entry("JE-32", AccountId::new(), AccountId::new(), dec!(10)))
            .unwrap();
        let mut owned = batch.entries()[0].clone();

        assert!(matches!(
            PostingEngine::default().approve_entry(&mut owned, "alice"),
            Err(LedgerError::EntryManagedByBatch { .. })
        ));
    }

    #[test]
    fn test_inactive_and_control_accounts_rejected() {
        let mut inactive = account(AccountCategory::Asset, "1000");
        inactive.deactivate();
        let control = account(AccountCategory::Asset, "1100").as_control_account();
        let revenue = account(AccountCategory::Revenue, "4000");
        let (inactive_id, control_id, revenue_id) = (inactive.id(), control.id(), revenue.id());
        let mut book: AccountBook = vec![inactive, control, revenue].into_iter().collect();
        let ids = SequentialIdGenerator::new();

        let mut first = entry("JE-5", inactive_id, revenue_id, dec!(10));
        assert!(matches!(
            PostingEngine::default().post_entry(&mut first, &mut book, &march(), &ids),
            Err(LedgerError::AccountInactive { .. })
        ));

        let mut second = entry("JE-6", control_id, revenue_id, dec!(10));
        assert!(matches!(
            PostingEngine::default().post_entry(&mut second, &mut book, &march(), &ids),
            Err(LedgerError::AccountNoDirectPosting { .. })
        ));

        let mut third = entry("JE-7", AccountId::new(), revenue_id, dec!(10));
        assert!(matches!(
            PostingEngine::default().post_entry(&mut third, &mut book, &march(), &ids),
            Err(LedgerError::NotFound { entity: "Account", .. })
        ));
    }

    #[test]
    fn test_batch_entry_cannot_post_alone() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();

        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-1", date(2024, 3, 31), None, None).unwrap();
        batch.add_journal_entry(entry("JE-8", cash_id, revenue_id, dec!(10))).unwrap();
        let mut owned = batch.entries()[0].clone();

        let result = PostingEngine::default().post_entry(
            &mut owned,
            &mut book,
            &march(),
            &SequentialIdGenerator::new(),
        );
        assert!(matches!(result, Err(LedgerError::EntryManagedByBatch { .. })));
    }

    #[test]
    fn test_post_batch_is_all_or_nothing() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let mut inactive = account(AccountCategory::Expense, "6000");
        inactive.deactivate();
        let (cash_id, revenue_id, inactive_id) = (cash.id(), revenue.id(), inactive.id());
        let mut book: AccountBook = vec![cash, revenue, inactive].into_iter().collect();

        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-2", date(2024, 3, 31), None, None).unwrap();
        batch.add_journal_entry(entry("JE-10", cash_id, revenue_id, dec!(100))).unwrap();
        batch.add_journal_entry(entry("JE-11", inactive_id, cash_id, dec!(40))).unwrap();
        batch.approve("controller").unwrap();

        let engine = PostingEngine::default();
        let ids = SequentialIdGenerator::new();
        let result = engine.post_batch(&mut batch, "clerk", &mut book, &march(), &ids);

        assert!(matches!(result, Err(LedgerError::AccountInactive { .. })));
        assert!(batch.entries().iter().all(|e| !e.is_posted()));
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(0));
    }

    #[test]
    fn test_post_and_reverse_batch() {
        let cash = account(AccountCategory::Asset, "1000");
        let revenue = account(AccountCategory::Revenue, "4000");
        let (cash_id, revenue_id) = (cash.id(), revenue.id());
        let mut book: AccountBook = vec![cash, revenue].into_iter().collect();

        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-3", date(2024, 3, 31), None, None).unwrap();
        batch.add_journal_entry(entry("JE-12", cash_id, revenue_id, dec!(100))).unwrap();
        batch.add_journal_entry(entry("JE-13", cash_id, revenue_id, dec!(50))).unwrap();

        let engine = PostingEngine::default();
        engine.approve_batch(&mut batch, "controller").unwrap();
        let outcome = engine
            .post_batch(&mut batch, "clerk", &mut book, &march(), &SequentialIdGenerator::new())
            .unwrap();

        assert_eq!(outcome.ledger_rows.len(), 4);
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(150));

        engine.reverse_batch(&mut batch, "controller", "duplicate upload").unwrap();
        assert!(batch.entries().iter().all(JournalEntry::is_reversed));
        assert_eq!(book.get(cash_id).unwrap().balance(), dec!(150));
    }
}
