//! Ledger application service
//!
//! [`LedgerService`] runs every command inside one [`LedgerUnitOfWork`]:
//! load the aggregates, call the domain, save, commit. Any error rolls the
//! unit of work back, so a failed command leaves no trace in the store.
//! Domain events are drained only after a successful commit and handed to
//! the [`EventSink`].

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use core_kernel::{
    AccountId, AccountingPeriodId, IdGenerator, JournalEntryId, JournalLineId, LedgerRowId,
    PostingBatchId,
};

use crate::account::{Account, AccountCategory, AccountUpdate};
use crate::batch::PostingBatch;
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::general_ledger::{ClassificationTag, GeneralLedgerRow, LedgerRowMetadata, TrialBalance};
use crate::journal::{JournalEntry, JournalEntryLine, JournalEntryUpdate};
use crate::period::{AccountingPeriod, PeriodType, PeriodUpdate};
use crate::ports::{EventSink, LedgerStore, LedgerUnitOfWork};
use crate::posting::{AccountBook, PostingEngine};

/// Input for opening an account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub category: AccountCategory,
    pub code: String,
    pub parent_code: Option<String>,
    pub name: String,
    pub opening_balance: Decimal,
    pub description: Option<String>,
    pub classification: Option<ClassificationTag>,
    pub is_control_account: bool,
}

/// Input for creating an accounting period
#[derive(Debug, Clone)]
pub struct NewPeriod {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fiscal_year: i32,
    pub period_type: PeriodType,
    pub is_adjustment_period: bool,
}

/// Input for one journal line
#[derive(Debug, Clone)]
pub struct NewJournalLine {
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub memo: Option<String>,
    pub classification: Option<ClassificationTag>,
}

impl NewJournalLine {
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            memo: None,
            classification: None,
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            memo: None,
            classification: None,
        }
    }
}

/// Input for creating a draft journal entry, optionally with its first lines
#[derive(Debug, Clone)]
pub struct NewJournalEntry {
    pub date: NaiveDate,
    pub reference_number: String,
    pub description: String,
    pub source: String,
    pub period_id: Option<AccountingPeriodId>,
    pub original_amount: Decimal,
    pub lines: Vec<NewJournalLine>,
}

/// Input for creating a posting batch
#[derive(Debug, Clone)]
pub struct NewPostingBatch {
    pub batch_number: String,
    pub batch_date: NaiveDate,
    pub description: Option<String>,
    pub period_id: Option<AccountingPeriodId>,
}

/// Result of posting a single entry
#[derive(Debug, Clone)]
pub struct PostedEntry {
    pub entry: JournalEntry,
    pub ledger_rows: Vec<GeneralLedgerRow>,
    pub accounts: Vec<Account>,
}

/// Result of posting a batch
#[derive(Debug, Clone)]
pub struct PostedBatch {
    pub batch: PostingBatch,
    pub ledger_rows: Vec<GeneralLedgerRow>,
    pub accounts: Vec<Account>,
}

/// Orchestrates ledger commands against a [`LedgerStore`]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    engine: PostingEngine,
    ids: Arc<dyn IdGenerator>,
    events: Arc<dyn EventSink>,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        engine: PostingEngine,
        ids: Arc<dyn IdGenerator>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            engine,
            ids,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Opens an account; account codes are unique
    #[instrument(skip(self, command), fields(code = %command.code))]
    pub async fn open_account(&self, command: NewAccount) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = self.open_account_in(uow.as_mut(), command).await;
        let mut account = finish(uow, result).await?;

        self.publish(account.take_events());
        info!(account_id = %account.id(), code = account.code(), "Account opened");
        Ok(account)
    }

    async fn open_account_in(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        command: NewAccount,
    ) -> Result<Account, LedgerError> {
        let code = command.code.trim().to_string();
        if uow.account_by_code(&code).await?.is_some() {
            return Err(LedgerError::DuplicateKey {
                entity: "Account",
                key: code,
            });
        }

        let mut account = Account::create(
            AccountId::from_uuid(self.ids.next_id()),
            command.category,
            code,
            command.parent_code,
            command.name,
            command.opening_balance,
        )?;
        if let Some(tag) = command.classification {
            account = account.with_classification(tag);
        }
        if let Some(description) = command.description {
            account = account.with_description(description);
        }
        if command.is_control_account {
            account = account.as_control_account();
        }

        uow.save_account(&mut account).await?;
        Ok(account)
    }

    /// Applies descriptive changes to an account
    #[instrument(skip(self, update))]
    pub async fn update_account(
        &self,
        account_id: AccountId,
        update: AccountUpdate,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut account = require_account(uow.as_mut(), account_id).await?;
            account.update(update)?;
            uow.save_account(&mut account).await?;
            Ok(account)
        }
        .await;
        let mut account = finish(uow, result).await?;

        self.publish(account.take_events());
        Ok(account)
    }

    /// Reactivates an account; a no-op when already active
    pub async fn activate_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.set_account_active(account_id, true).await
    }

    /// Deactivates an account so it no longer accepts postings
    pub async fn deactivate_account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        self.set_account_active(account_id, false).await
    }

    #[instrument(skip(self))]
    async fn set_account_active(
        &self,
        account_id: AccountId,
        active: bool,
    ) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut account = require_account(uow.as_mut(), account_id).await?;
            if active {
                account.activate();
            } else {
                account.deactivate();
            }
            uow.save_account(&mut account).await?;
            Ok(account)
        }
        .await;
        let mut account = finish(uow, result).await?;

        self.publish(account.take_events());
        info!(account_id = %account_id, status = ?account.status(), "Account status set");
        Ok(account)
    }

    pub async fn account(&self, account_id: AccountId) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = require_account(uow.as_mut(), account_id).await;
        finish(uow, result).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow.list_accounts().await.map_err(LedgerError::from);
        finish(uow, result).await
    }

    // ------------------------------------------------------------------
    // Accounting periods
    // ------------------------------------------------------------------

    /// Creates an open period
    ///
    /// Regular periods of the same type may not overlap. Adjustment periods
    /// are exempt; they deliberately share dates with a regular period.
    #[instrument(skip(self, command), fields(name = %command.name))]
    pub async fn create_period(&self, command: NewPeriod) -> Result<AccountingPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut period = AccountingPeriod::create(
                AccountingPeriodId::from_uuid(self.ids.next_id()),
                command.name,
                command.start_date,
                command.end_date,
                command.fiscal_year,
                command.period_type,
            )?;
            if command.is_adjustment_period {
                period = period.as_adjustment_period();
            }

            let existing = uow.list_periods().await?;
            ensure_no_overlap(&period, &existing)?;
            uow.save_period(&mut period).await?;
            Ok(period)
        }
        .await;
        let mut period = finish(uow, result).await?;

        self.publish(period.take_events());
        info!(period_id = %period.id(), "Accounting period created");
        Ok(period)
    }

    #[instrument(skip(self, update))]
    pub async fn update_period(
        &self,
        period_id: AccountingPeriodId,
        update: PeriodUpdate,
    ) -> Result<AccountingPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut period = require_period(uow.as_mut(), period_id).await?;
            period.update(update)?;

            let existing = uow.list_periods().await?;
            ensure_no_overlap(&period, &existing)?;
            uow.save_period(&mut period).await?;
            Ok(period)
        }
        .await;
        let mut period = finish(uow, result).await?;

        self.publish(period.take_events());
        Ok(period)
    }

    /// Closes a period; postings dated inside it are refused until it is reopened
    #[instrument(skip(self))]
    pub async fn close_period(&self, period_id: AccountingPeriodId) -> Result<AccountingPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut period = require_period(uow.as_mut(), period_id).await?;
            period.close()?;
            uow.save_period(&mut period).await?;
            Ok(period)
        }
        .await;
        let mut period = finish(uow, result).await?;

        self.publish(period.take_events());
        info!(period_id = %period_id, "Accounting period closed");
        Ok(period)
    }

    #[instrument(skip(self))]
    pub async fn reopen_period(&self, period_id: AccountingPeriodId) -> Result<AccountingPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut period = require_period(uow.as_mut(), period_id).await?;
            period.reopen()?;
            uow.save_period(&mut period).await?;
            Ok(period)
        }
        .await;
        let mut period = finish(uow, result).await?;

        self.publish(period.take_events());
        info!(period_id = %period_id, "Accounting period reopened");
        Ok(period)
    }

    pub async fn period(&self, period_id: AccountingPeriodId) -> Result<AccountingPeriod, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = require_period(uow.as_mut(), period_id).await;
        finish(uow, result).await
    }

    pub async fn periods(&self) -> Result<Vec<AccountingPeriod>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow.list_periods().await.map_err(LedgerError::from);
        finish(uow, result).await
    }

    // ------------------------------------------------------------------
    // Journal entries
    // ------------------------------------------------------------------

    /// Creates a draft entry with its initial lines
    ///
    /// An explicit period must exist, be open and contain the entry date.
    /// Every line account must exist; activity is checked at posting time.
    #[instrument(skip(self, command), fields(reference = %command.reference_number))]
    pub async fn create_journal_entry(&self, command: NewJournalEntry) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            if let Some(period_id) = command.period_id {
                require_period(uow.as_mut(), period_id)
                    .await?
                    .ensure_accepts(command.date)?;
            }

            let mut entry = JournalEntry::create(
                JournalEntryId::from_uuid(self.ids.next_id()),
                command.date,
                command.reference_number,
                command.description,
                command.source,
                command.period_id,
                command.original_amount,
            )?;
            for line in command.lines {
                self.append_line(uow.as_mut(), &mut entry, line).await?;
            }

            uow.save_journal_entry(&mut entry).await?;
            Ok(entry)
        }
        .await;
        let mut entry = finish(uow, result).await?;

        self.publish(entry.take_events());
        info!(entry_id = %entry.id(), lines = entry.lines().len(), "Journal entry created");
        Ok(entry)
    }

    /// Appends a line to a standalone draft entry
    #[instrument(skip(self, line))]
    pub async fn add_journal_line(
        &self,
        entry_id: JournalEntryId,
        line: NewJournalLine,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut entry = require_standalone_entry(uow.as_mut(), entry_id).await?;
            self.append_line(uow.as_mut(), &mut entry, line).await?;
            uow.save_journal_entry(&mut entry).await?;
            Ok(entry)
        }
        .await;
        let mut entry = finish(uow, result).await?;

        self.publish(entry.take_events());
        Ok(entry)
    }

    #[instrument(skip(self, update))]
    pub async fn update_journal_entry(
        &self,
        entry_id: JournalEntryId,
        update: JournalEntryUpdate,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut entry = require_standalone_entry(uow.as_mut(), entry_id).await?;
            if let Some(Some(period_id)) = update.period_id {
                require_period(uow.as_mut(), period_id).await?.ensure_open()?;
            }
            entry.update(update)?;
            uow.save_journal_entry(&mut entry).await?;
            Ok(entry)
        }
        .await;
        let mut entry = finish(uow, result).await?;

        self.publish(entry.take_events());
        Ok(entry)
    }

    async fn append_line(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        entry: &mut JournalEntry,
        line: NewJournalLine,
    ) -> Result<(), LedgerError> {
        require_account(uow, line.account_id).await?;

        let mut built = JournalEntryLine::create(
            JournalLineId::from_uuid(self.ids.next_id()),
            entry.id(),
            line.account_id,
            line.debit,
            line.credit,
            line.memo,
        )?;
        if let Some(tag) = line.classification {
            built = built.with_classification(tag);
        }
        entry.push_line(built)?;
        Ok(())
    }

    /// Posts a standalone entry, moving balances and writing ledger rows
    #[instrument(skip(self))]
    pub async fn post_journal_entry(&self, entry_id: JournalEntryId) -> Result<PostedEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut entry = require_entry(uow.as_mut(), entry_id).await?;
            let entries = std::slice::from_ref(&entry);
            let mut book = load_accounts(uow.as_mut(), entries).await?;
            let periods = load_periods(uow.as_mut(), entries, None).await?;

            let outcome = self
                .engine
                .post_entry(&mut entry, &mut book, &periods, self.ids.as_ref())?;

            uow.save_journal_entry(&mut entry).await?;
            let accounts = save_touched(uow.as_mut(), &mut book, &outcome.touched_accounts).await?;
            uow.append_ledger_rows(&outcome.ledger_rows).await?;

            Ok(PostedEntry {
                entry,
                ledger_rows: outcome.ledger_rows,
                accounts,
            })
        }
        .await;
        let mut posted = finish(uow, result).await?;

        let mut events = posted.entry.take_events();
        events.extend(posted.accounts.iter_mut().flat_map(Account::take_events));
        events.extend(posted.ledger_rows.iter_mut().flat_map(GeneralLedgerRow::take_events));
        self.publish(events);
        Ok(posted)
    }

    /// Marks a posted standalone entry reversed; balances do not move
    #[instrument(skip(self, reason))]
    pub async fn reverse_journal_entry(
        &self,
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
        reason: &str,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut entry = require_entry(uow.as_mut(), entry_id).await?;
            self.engine.reverse_entry(&mut entry, reversal_date, reason)?;
            uow.save_journal_entry(&mut entry).await?;
            Ok(entry)
        }
        .await;
        let mut entry = finish(uow, result).await?;

        self.publish(entry.take_events());
        Ok(entry)
    }

    /// Saves a draft entry that offsets a posted entry line by line
    ///
    /// The draft still has to be posted to move balances.
    #[instrument(skip(self, reference_number))]
    pub async fn create_reversing_entry(
        &self,
        entry_id: JournalEntryId,
        date: NaiveDate,
        reference_number: &str,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let original = require_entry(uow.as_mut(), entry_id).await?;
            let mut reversing = original.reversing_entry(self.ids.as_ref(), date, reference_number)?;
            uow.save_journal_entry(&mut reversing).await?;
            Ok(reversing)
        }
        .await;
        let mut reversing = finish(uow, result).await?;

        self.publish(reversing.take_events());
        info!(original = %entry_id, reversing = %reversing.id(), "Reversing entry drafted");
        Ok(reversing)
    }

    /// Records an approval on a standalone draft entry
    #[instrument(skip(self))]
    pub async fn approve_journal_entry(
        &self,
        entry_id: JournalEntryId,
        approved_by: &str,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut entry = require_entry(uow.as_mut(), entry_id).await?;
            self.engine.approve_entry(&mut entry, approved_by)?;
            uow.save_journal_entry(&mut entry).await?;
            Ok(entry)
        }
        .await;
        let mut entry = finish(uow, result).await?;

        self.publish(entry.take_events());
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn reject_journal_entry(
        &self,
        entry_id: JournalEntryId,
        rejected_by: &str,
    ) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut entry = require_entry(uow.as_mut(), entry_id).await?;
            self.engine.reject_entry(&mut entry, rejected_by)?;
            uow.save_journal_entry(&mut entry).await?;
            Ok(entry)
        }
        .await;
        let mut entry = finish(uow, result).await?;

        self.publish(entry.take_events());
        Ok(entry)
    }

    pub async fn journal_entry(&self, entry_id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = require_entry(uow.as_mut(), entry_id).await;
        finish(uow, result).await
    }

    // ------------------------------------------------------------------
    // Posting batches
    // ------------------------------------------------------------------

    /// Creates an empty batch; batch numbers are unique
    #[instrument(skip(self, command), fields(batch_number = %command.batch_number))]
    pub async fn create_posting_batch(&self, command: NewPostingBatch) -> Result<PostingBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let batch_number = command.batch_number.trim().to_string();
            if uow.batch_by_number(&batch_number).await?.is_some() {
                return Err(LedgerError::DuplicateKey {
                    entity: "PostingBatch",
                    key: batch_number,
                });
            }
            if let Some(period_id) = command.period_id {
                require_period(uow.as_mut(), period_id).await?.ensure_open()?;
            }

            let mut batch = PostingBatch::create(
                PostingBatchId::from_uuid(self.ids.next_id()),
                batch_number,
                command.batch_date,
                command.description,
                command.period_id,
            )?;
            uow.save_posting_batch(&mut batch).await?;
            Ok(batch)
        }
        .await;
        let mut batch = finish(uow, result).await?;

        self.publish(batch.take_events());
        info!(batch_id = %batch.id(), "Posting batch created");
        Ok(batch)
    }

    /// Moves a standalone draft entry into a draft batch
    #[instrument(skip(self))]
    pub async fn add_entry_to_batch(
        &self,
        batch_id: PostingBatchId,
        entry_id: JournalEntryId,
    ) -> Result<PostingBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut batch = require_batch(uow.as_mut(), batch_id).await?;
            let entry = require_standalone_entry(uow.as_mut(), entry_id).await?;
            batch.add_journal_entry(entry)?;
            uow.save_posting_batch(&mut batch).await?;
            Ok(batch)
        }
        .await;
        let mut batch = finish(uow, result).await?;

        self.publish(batch.take_events());
        Ok(batch)
    }

    #[instrument(skip(self))]
    pub async fn approve_batch(&self, batch_id: PostingBatchId, approved_by: &str) -> Result<PostingBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut batch = require_batch(uow.as_mut(), batch_id).await?;
            self.engine.approve_batch(&mut batch, approved_by)?;
            uow.save_posting_batch(&mut batch).await?;
            Ok(batch)
        }
        .await;
        let mut batch = finish(uow, result).await?;

        self.publish(batch.take_events());
        Ok(batch)
    }

    #[instrument(skip(self))]
    pub async fn reject_batch(&self, batch_id: PostingBatchId, rejected_by: &str) -> Result<PostingBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut batch = require_batch(uow.as_mut(), batch_id).await?;
            self.engine.reject_batch(&mut batch, rejected_by)?;
            uow.save_posting_batch(&mut batch).await?;
            Ok(batch)
        }
        .await;
        let mut batch = finish(uow, result).await?;

        self.publish(batch.take_events());
        Ok(batch)
    }

    /// Posts an approved batch; all entries post or none do
    #[instrument(skip(self))]
    pub async fn post_batch(&self, batch_id: PostingBatchId, posted_by: &str) -> Result<PostedBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut batch = require_batch(uow.as_mut(), batch_id).await?;
            let mut book = load_accounts(uow.as_mut(), batch.entries()).await?;
            let periods = load_periods(uow.as_mut(), batch.entries(), batch.period_id()).await?;

            let outcome = self.engine.post_batch(
                &mut batch,
                posted_by,
                &mut book,
                &periods,
                self.ids.as_ref(),
            )?;

            uow.save_posting_batch(&mut batch).await?;
            let accounts = save_touched(uow.as_mut(), &mut book, &outcome.touched_accounts).await?;
            uow.append_ledger_rows(&outcome.ledger_rows).await?;

            Ok(PostedBatch {
                batch,
                ledger_rows: outcome.ledger_rows,
                accounts,
            })
        }
        .await;
        let mut posted = finish(uow, result).await?;

        let mut events = posted.batch.take_events();
        events.extend(posted.accounts.iter_mut().flat_map(Account::take_events));
        events.extend(posted.ledger_rows.iter_mut().flat_map(GeneralLedgerRow::take_events));
        self.publish(events);
        Ok(posted)
    }

    /// Marks a posted batch and its entries reversed; balances do not move
    #[instrument(skip(self, reason))]
    pub async fn reverse_batch(
        &self,
        batch_id: PostingBatchId,
        reversed_by: &str,
        reason: &str,
    ) -> Result<PostingBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut batch = require_batch(uow.as_mut(), batch_id).await?;
            self.engine.reverse_batch(&mut batch, reversed_by, reason)?;
            uow.save_posting_batch(&mut batch).await?;
            Ok(batch)
        }
        .await;
        let mut batch = finish(uow, result).await?;

        self.publish(batch.take_events());
        Ok(batch)
    }

    pub async fn posting_batch(&self, batch_id: PostingBatchId) -> Result<PostingBatch, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = require_batch(uow.as_mut(), batch_id).await;
        finish(uow, result).await
    }

    // ------------------------------------------------------------------
    // General ledger
    // ------------------------------------------------------------------

    pub async fn ledger_rows_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<GeneralLedgerRow>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            require_account(uow.as_mut(), account_id).await?;
            Ok(uow.ledger_rows_for_account(account_id).await?)
        }
        .await;
        finish(uow, result).await
    }

    pub async fn ledger_rows_for_entry(
        &self,
        entry_id: JournalEntryId,
    ) -> Result<Vec<GeneralLedgerRow>, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            require_entry(uow.as_mut(), entry_id).await?;
            Ok(uow.ledger_rows_for_entry(entry_id).await?)
        }
        .await;
        finish(uow, result).await
    }

    /// Updates a row's descriptive metadata
    #[instrument(skip(self, metadata))]
    pub async fn annotate_ledger_row(
        &self,
        row_id: LedgerRowId,
        metadata: LedgerRowMetadata,
    ) -> Result<GeneralLedgerRow, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result: Result<_, LedgerError> = async {
            let mut row = uow
                .ledger_row(row_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("GeneralLedgerRow", row_id))?;
            row.update(metadata);
            uow.update_ledger_row_metadata(&row).await?;
            Ok(row)
        }
        .await;
        let mut row = finish(uow, result).await?;

        self.publish(row.take_events());
        Ok(row)
    }

    /// Debit and credit totals per account over every ledger row
    pub async fn trial_balance(&self) -> Result<TrialBalance, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = uow.all_ledger_rows().await.map_err(LedgerError::from);
        let rows = finish(uow, result).await?;
        Ok(TrialBalance::from_rows(&rows))
    }

    fn publish(&self, events: Vec<LedgerEvent>) {
        if !events.is_empty() {
            self.events.publish(&events);
        }
    }
}

/// Commits on success and rolls back on failure
async fn finish<T>(
    uow: Box<dyn LedgerUnitOfWork>,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = uow.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(error)
        }
    }
}

async fn require_account(
    uow: &mut dyn LedgerUnitOfWork,
    account_id: AccountId,
) -> Result<Account, LedgerError> {
    uow.account(account_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Account", account_id))
}

async fn require_period(
    uow: &mut dyn LedgerUnitOfWork,
    period_id: AccountingPeriodId,
) -> Result<AccountingPeriod, LedgerError> {
    uow.period(period_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("AccountingPeriod", period_id))
}

async fn require_entry(
    uow: &mut dyn LedgerUnitOfWork,
    entry_id: JournalEntryId,
) -> Result<JournalEntry, LedgerError> {
    uow.journal_entry(entry_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("JournalEntry", entry_id))
}

/// Loads an entry that is not owned by a batch
async fn require_standalone_entry(
    uow: &mut dyn LedgerUnitOfWork,
    entry_id: JournalEntryId,
) -> Result<JournalEntry, LedgerError> {
    let entry = require_entry(uow, entry_id).await?;
    if let Some(batch_id) = entry.batch_id() {
        return Err(LedgerError::EntryManagedByBatch {
            entry_id: entry_id.to_string(),
            batch_id: batch_id.to_string(),
        });
    }
    Ok(entry)
}

async fn require_batch(
    uow: &mut dyn LedgerUnitOfWork,
    batch_id: PostingBatchId,
) -> Result<PostingBatch, LedgerError> {
    uow.posting_batch(batch_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("PostingBatch", batch_id))
}

/// Loads every account referenced by the entries' lines
///
/// Missing accounts are left out; the engine reports them as not found.
async fn load_accounts(
    uow: &mut dyn LedgerUnitOfWork,
    entries: &[JournalEntry],
) -> Result<AccountBook, LedgerError> {
    let ids: BTreeSet<AccountId> = entries
        .iter()
        .flat_map(|entry| entry.lines().iter().map(JournalEntryLine::account_id))
        .collect();

    let mut book = AccountBook::new();
    for id in ids {
        if let Some(account) = uow.account(id).await? {
            book.insert(account);
        }
    }
    Ok(book)
}

/// Loads the periods the posting gate needs for the entries
///
/// That is every period covering an entry's date plus the period each
/// entry is assigned to, falling back to `batch_period`.
async fn load_periods(
    uow: &mut dyn LedgerUnitOfWork,
    entries: &[JournalEntry],
    batch_period: Option<AccountingPeriodId>,
) -> Result<Vec<AccountingPeriod>, LedgerError> {
    let mut periods: Vec<AccountingPeriod> = Vec::new();
    for entry in entries {
        let mut found = uow.periods_covering(entry.date()).await?;
        if let Some(id) = entry.period_id().or(batch_period) {
            found.extend(uow.period(id).await?);
        }
        for period in found {
            if !periods.iter().any(|p| p.id() == period.id()) {
                periods.push(period);
            }
        }
    }
    Ok(periods)
}

/// Saves the accounts a posting moved and returns them in posting order
async fn save_touched(
    uow: &mut dyn LedgerUnitOfWork,
    book: &mut AccountBook,
    touched: &[AccountId],
) -> Result<Vec<Account>, LedgerError> {
    let mut saved = Vec::with_capacity(touched.len());
    for id in touched {
        let account = book
            .get_mut(*id)
            .ok_or_else(|| LedgerError::not_found("Account", id))?;
        uow.save_account(account).await?;
        saved.push(account.clone());
    }
    Ok(saved)
}

fn ensure_no_overlap(
    period: &AccountingPeriod,
    existing: &[AccountingPeriod],
) -> Result<(), LedgerError> {
    if period.is_adjustment_period() {
        return Ok(());
    }
    for other in existing {
        if other.id() == period.id()
            || other.is_adjustment_period()
            || other.period_type() != period.period_type()
        {
            continue;
        }
        period.range().ensure_disjoint(&other.range())?;
    }
    Ok(())
}
