//! Journal entries and their lines
//!
//! A journal entry is built incrementally while in draft: lines are
//! appended one at a time and no balance check happens until
//! [`JournalEntry::post`]. Posting succeeds only when total debits and
//! total credits agree within [`BALANCE_TOLERANCE`]; afterwards the entry
//! is frozen and every mutating call fails.
//!
//! Reversal is an audit marker. [`JournalEntry::reverse`] records the date
//! and reason and emits `JournalEntryReversed`, but leaves the entry posted
//! and touches no balances. Offsetting postings come from
//! [`JournalEntry::reversing_entry`], which builds a separate draft entry
//! with every line's side swapped.
//!
//! A standalone draft can carry its own approval decision. Any edit to the
//! draft clears that decision, so what gets posted is what was approved.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::money::{checked_sum, ensure_non_negative, within_tolerance};
use core_kernel::{
    AccountId, AccountingPeriodId, IdGenerator, JournalEntryId, JournalLineId, PositiveAmount,
    PostingBatchId, BALANCE_TOLERANCE,
};

use crate::account::EntrySide;
use crate::batch::{ApprovalDecision, ApprovalStatus};
use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::general_ledger::ClassificationTag;

/// One side of one account's movement within an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    id: JournalLineId,
    entry_id: JournalEntryId,
    account_id: AccountId,
    side: EntrySide,
    amount: PositiveAmount,
    memo: Option<String>,
    /// Overrides the account's default classification on the ledger row
    classification: Option<ClassificationTag>,
}

impl JournalEntryLine {
    /// Builds a line from separate debit and credit amounts
    ///
    /// Exactly one of the two must be positive and neither may be negative.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative amount, both sides set, or neither side set
    pub fn create(
        id: JournalLineId,
        entry_id: JournalEntryId,
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
        memo: Option<String>,
    ) -> Result<Self, LedgerError> {
        let debit = ensure_non_negative(debit)?;
        let credit = ensure_non_negative(credit)?;

        let (side, amount) = match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, false) => (EntrySide::Debit, debit),
            (false, true) => (EntrySide::Credit, credit),
            (true, true) => {
                return Err(LedgerError::validation(
                    "line",
                    "a line cannot carry both a debit and a credit amount",
                ))
            }
            (false, false) => {
                return Err(LedgerError::validation(
                    "line",
                    "a line must carry either a debit or a credit amount",
                ))
            }
        };

        Ok(Self {
            id,
            entry_id,
            account_id,
            side,
            amount: PositiveAmount::new(amount)?,
            memo: memo.filter(|m| !m.trim().is_empty()),
            classification: None,
        })
    }

    /// Overrides the classification tag used for this line's ledger row
    pub fn with_classification(mut self, classification: ClassificationTag) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn id(&self) -> JournalLineId {
        self.id
    }

    pub fn entry_id(&self) -> JournalEntryId {
        self.entry_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn side(&self) -> EntrySide {
        self.side
    }

    pub fn amount(&self) -> Decimal {
        self.amount.value()
    }

    /// Debit amount, zero for a credit line
    pub fn debit_amount(&self) -> Decimal {
        match self.side {
            EntrySide::Debit => self.amount.value(),
            EntrySide::Credit => Decimal::ZERO,
        }
    }

    /// Credit amount, zero for a debit line
    pub fn credit_amount(&self) -> Decimal {
        match self.side {
            EntrySide::Credit => self.amount.value(),
            EntrySide::Debit => Decimal::ZERO,
        }
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn classification(&self) -> Option<ClassificationTag> {
        self.classification
    }
}

/// Reversal marker recorded on a posted entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryReversal {
    pub reversal_date: NaiveDate,
    pub reason: String,
    pub reversed_at: DateTime<Utc>,
}

/// Changes to a draft entry's header; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct JournalEntryUpdate {
    pub date: Option<NaiveDate>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    /// `Some(None)` detaches the entry from its period
    pub period_id: Option<Option<AccountingPeriodId>>,
    pub original_amount: Option<Decimal>,
}

/// A single balanced transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    id: JournalEntryId,
    date: NaiveDate,
    reference_number: String,
    description: String,
    source: String,
    period_id: Option<AccountingPeriodId>,
    /// Control total supplied by the source document
    original_amount: Decimal,
    is_posted: bool,
    posted_at: Option<DateTime<Utc>>,
    reversal: Option<EntryReversal>,
    batch_id: Option<PostingBatchId>,
    #[serde(default)]
    approval_status: ApprovalStatus,
    #[serde(default)]
    approval: Option<ApprovalDecision>,
    lines: Vec<JournalEntryLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Persistence version, used for optimistic concurrency
    #[serde(default)]
    version: u64,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl JournalEntry {
    /// Creates a draft entry
    ///
    /// No balance check happens here.
    ///
    /// # Arguments
    ///
    /// * `id` - Identity supplied by the caller's id generator
    /// * `date` - Transaction date, used for period resolution
    /// * `reference_number` - Document reference, required
    /// * `description` - Free text
    /// * `source` - Origin of the entry, e.g. "Manual" or "Billing"
    /// * `period_id` - Explicit period, if the caller already resolved it
    /// * `original_amount` - Control total from the source document
    ///
    /// # Errors
    ///
    /// Returns a validation error if the reference number is blank or the control total is negative
    pub fn create(
        id: JournalEntryId,
        date: NaiveDate,
        reference_number: impl Into<String>,
        description: impl Into<String>,
        source: impl Into<String>,
        period_id: Option<AccountingPeriodId>,
        original_amount: Decimal,
    ) -> Result<Self, LedgerError> {
        let reference_number = reference_number.into().trim().to_string();
        LedgerError::require("reference_number", &reference_number)?;
        let original_amount = ensure_non_negative(original_amount)?;

        let now = Utc::now();
        let mut entry = Self {
            id,
            date,
            reference_number,
            description: description.into(),
            source: source.into().trim().to_string(),
            period_id,
            original_amount,
            is_posted: false,
            posted_at: None,
            reversal: None,
            batch_id: None,
            approval_status: ApprovalStatus::Pending,
            approval: None,
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
            events: Vec::new(),
        };

        entry.events.push(LedgerEvent::JournalEntryCreated {
            entry_id: id,
            reference_number: entry.reference_number.clone(),
            entry_date: date,
            timestamp: now,
        });

        Ok(entry)
    }

    /// Appends a line
    ///
    /// # Errors
    ///
    /// - `LedgerError::EntryAlreadyPosted` once posted
    /// - Validation errors from [`JournalEntryLine::create`]
    pub fn add_line(
        &mut self,
        line_id: JournalLineId,
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
        memo: Option<String>,
    ) -> Result<&JournalEntryLine, LedgerError> {
        let line = JournalEntryLine::create(line_id, self.id, account_id, debit, credit, memo)?;
        self.push_line(line)
    }

    /// Appends a prebuilt line, e.g. one carrying a classification override
    pub fn push_line(&mut self, line: JournalEntryLine) -> Result<&JournalEntryLine, LedgerError> {
        self.ensure_unposted()?;
        if line.entry_id != self.id {
            return Err(LedgerError::validation(
                "line",
                format!("line {} belongs to entry {}", line.id, line.entry_id),
            ));
        }

        self.clear_approval();
        self.updated_at = Utc::now();
        self.events.push(LedgerEvent::JournalEntryLineAdded {
            entry_id: self.id,
            line_id: line.id,
            account_id: line.account_id,
            side: line.side,
            amount: line.amount(),
            timestamp: self.updated_at,
        });
        self.lines.push(line);

        let index = self.lines.len() - 1;
        Ok(&self.lines[index])
    }

    /// Updates header fields, emitting `JournalEntryUpdated` only if something changed
    ///
    /// # Errors
    ///
    /// `LedgerError::EntryAlreadyPosted` once posted
    pub fn update(&mut self, update: JournalEntryUpdate) -> Result<(), LedgerError> {
        self.ensure_unposted()?;

        if let Some(reference) = &update.reference_number {
            LedgerError::require("reference_number", reference)?;
        }
        let original_amount = update
            .original_amount
            .map(ensure_non_negative)
            .transpose()?;

        let mut changed = false;
        if let Some(date) = update.date {
            changed |= date != self.date;
            self.date = date;
        }
        if let Some(reference) = update.reference_number {
            let reference = reference.trim().to_string();
            changed |= reference != self.reference_number;
            self.reference_number = reference;
        }
        if let Some(description) = update.description {
            changed |= description != self.description;
            self.description = description;
        }
        if let Some(source) = update.source {
            let source = source.trim().to_string();
            changed |= source != self.source;
            self.source = source;
        }
        if let Some(period_id) = update.period_id {
            changed |= period_id != self.period_id;
            self.period_id = period_id;
        }
        if let Some(amount) = original_amount {
            changed |= amount != self.original_amount;
            self.original_amount = amount;
        }

        if changed {
            self.clear_approval();
            self.updated_at = Utc::now();
            self.events.push(LedgerEvent::JournalEntryUpdated {
                entry_id: self.id,
                timestamp: self.updated_at,
            });
        }

        Ok(())
    }

    /// Approves the draft for posting
    ///
    /// # Errors
    ///
    /// - `LedgerError::EntryAlreadyPosted` once posted
    /// - `LedgerError::EntryAlreadyApproved` if already approved
    /// - a validation error for a blank actor
    pub fn approve(&mut self, approved_by: impl Into<String>) -> Result<(), LedgerError> {
        let approved_by = approved_by.into();
        self.ensure_unposted()?;
        LedgerError::require("approved_by", &approved_by)?;
        if self.approval_status == ApprovalStatus::Approved {
            return Err(LedgerError::EntryAlreadyApproved {
                entry_id: self.id.to_string(),
            });
        }

        self.record_decision(ApprovalStatus::Approved, approved_by.clone());
        self.events.push(LedgerEvent::JournalEntryApproved {
            entry_id: self.id,
            approved_by,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Rejects the draft; a rejected entry can still be approved later
    ///
    /// # Errors
    ///
    /// - `LedgerError::EntryAlreadyPosted` once posted
    /// - `LedgerError::EntryAlreadyRejected` if already rejected
    /// - a validation error for a blank actor
    pub fn reject(&mut self, rejected_by: impl Into<String>) -> Result<(), LedgerError> {
        let rejected_by = rejected_by.into();
        self.ensure_unposted()?;
        LedgerError::require("rejected_by", &rejected_by)?;
        if self.approval_status == ApprovalStatus::Rejected {
            return Err(LedgerError::EntryAlreadyRejected {
                entry_id: self.id.to_string(),
            });
        }

        self.record_decision(ApprovalStatus::Rejected, rejected_by.clone());
        self.events.push(LedgerEvent::JournalEntryRejected {
            entry_id: self.id,
            rejected_by,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Fails with `EntryNotApproved` unless the entry is approved
    pub fn ensure_approved(&self) -> Result<(), LedgerError> {
        if self.approval_status != ApprovalStatus::Approved {
            return Err(LedgerError::EntryNotApproved {
                entry_id: self.id.to_string(),
                approval_status: self.approval_status.to_string(),
            });
        }
        Ok(())
    }

    fn record_decision(&mut self, status: ApprovalStatus, actor: String) {
        let now = Utc::now();
        self.approval_status = status;
        self.approval = Some(ApprovalDecision {
            actor,
            decided_at: now,
        });
        self.updated_at = now;
    }

    fn clear_approval(&mut self) {
        self.approval_status = ApprovalStatus::Pending;
        self.approval = None;
    }

    /// Posts the entry
    ///
    /// # Errors
    ///
    /// - `LedgerError::EntryAlreadyPosted` if already posted
    /// - `LedgerError::UnbalancedEntry` if `|debits - credits| >= 0.01`
    pub fn post(&mut self) -> Result<(), LedgerError> {
        self.check_postable()?;
        let (total_debits, total_credits) = self.totals()?;

        self.is_posted = true;
        let now = Utc::now();
        self.posted_at = Some(now);
        self.updated_at = now;
        self.events.push(LedgerEvent::JournalEntryPosted {
            entry_id: self.id,
            total_debits,
            total_credits,
            timestamp: now,
        });

        Ok(())
    }

    /// Checks every precondition of [`post`](Self::post) without changing anything
    pub fn check_postable(&self) -> Result<(), LedgerError> {
        if self.is_posted {
            return Err(LedgerError::EntryAlreadyPosted {
                entry_id: self.id.to_string(),
            });
        }
        let (debits, credits) = self.totals()?;
        if !within_tolerance(debits, credits) {
            return Err(LedgerError::UnbalancedEntry {
                entry_id: self.id.to_string(),
                debits,
                credits,
            });
        }
        Ok(())
    }

    /// Records a reversal marker on a posted entry
    ///
    /// The entry stays posted and no balances move.
    ///
    /// # Errors
    ///
    /// - `LedgerError::EntryNotPosted` if the entry is a draft
    /// - `LedgerError::EntryAlreadyReversed` on a second reversal
    /// - a validation error for a blank reason
    pub fn reverse(&mut self, date: NaiveDate, reason: impl Into<String>) -> Result<(), LedgerError> {
        let reason = reason.into();
        self.check_reversible(&reason)?;

        let now = Utc::now();
        self.reversal = Some(EntryReversal {
            reversal_date: date,
            reason: reason.clone(),
            reversed_at: now,
        });
        self.updated_at = now;
        self.events.push(LedgerEvent::JournalEntryReversed {
            entry_id: self.id,
            reversal_date: date,
            reason,
            timestamp: now,
        });

        Ok(())
    }

    /// Checks every precondition of [`reverse`](Self::reverse) without changing anything
    pub fn check_reversible(&self, reason: &str) -> Result<(), LedgerError> {
        if !self.is_posted {
            return Err(LedgerError::EntryNotPosted {
                entry_id: self.id.to_string(),
            });
        }
        if self.reversal.is_some() {
            return Err(LedgerError::EntryAlreadyReversed {
                entry_id: self.id.to_string(),
            });
        }
        LedgerError::require("reason", reason)
    }

    /// Builds a draft entry that offsets this posted entry line by line
    ///
    /// Each line keeps its account, amount and classification with the side
    /// swapped. The new entry still has to be posted to move balances.
    ///
    /// # Errors
    ///
    /// `LedgerError::EntryNotPosted` if this entry is a draft
    pub fn reversing_entry(
        &self,
        ids: &dyn IdGenerator,
        date: NaiveDate,
        reference_number: impl Into<String>,
    ) -> Result<JournalEntry, LedgerError> {
        if !self.is_posted {
            return Err(LedgerError::EntryNotPosted {
                entry_id: self.id.to_string(),
            });
        }

        let mut reversing = JournalEntry::create(
            JournalEntryId::from_uuid(ids.next_id()),
            date,
            reference_number,
            format!("Reversal of {}", self.reference_number),
            self.source.clone(),
            None,
            self.original_amount,
        )?;

        for line in &self.lines {
            let mut mirrored = line.clone();
            mirrored.id = JournalLineId::from_uuid(ids.next_id());
            mirrored.entry_id = reversing.id;
            mirrored.side = line.side.opposite();
            reversing.push_line(mirrored)?;
        }

        Ok(reversing)
    }

    pub(crate) fn assign_to_batch(&mut self, batch_id: PostingBatchId) {
        self.batch_id = Some(batch_id);
    }

    fn ensure_unposted(&self) -> Result<(), LedgerError> {
        if self.is_posted {
            return Err(LedgerError::EntryAlreadyPosted {
                entry_id: self.id.to_string(),
            });
        }
        Ok(())
    }

    fn totals(&self) -> Result<(Decimal, Decimal), LedgerError> {
        let debits = checked_sum(self.lines.iter().map(JournalEntryLine::debit_amount))?;
        let credits = checked_sum(self.lines.iter().map(JournalEntryLine::credit_amount))?;
        Ok((debits, credits))
    }

    /// Sum of all debit amounts
    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(JournalEntryLine::debit_amount).sum()
    }

    /// Sum of all credit amounts
    pub fn total_credits(&self) -> Decimal {
        self.lines.iter().map(JournalEntryLine::credit_amount).sum()
    }

    /// Debits minus credits
    pub fn difference(&self) -> Decimal {
        self.total_debits() - self.total_credits()
    }

    /// True when debits and credits agree within the balance tolerance
    pub fn is_balanced(&self) -> bool {
        self.difference().abs() < BALANCE_TOLERANCE
    }

    /// Called by persistence once a save succeeded
    pub fn mark_persisted(&mut self) {
        self.version += 1;
    }

    /// Drains recorded events
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn id(&self) -> JournalEntryId {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn reference_number(&self) -> &str {
        &self.reference_number
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn period_id(&self) -> Option<AccountingPeriodId> {
        self.period_id
    }

    pub fn original_amount(&self) -> Decimal {
        self.original_amount
    }

    pub fn is_posted(&self) -> bool {
        self.is_posted
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    pub fn reversal(&self) -> Option<&EntryReversal> {
        self.reversal.as_ref()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversal.is_some()
    }

    /// Batch that owns this entry, if any
    pub fn batch_id(&self) -> Option<PostingBatchId> {
        self.batch_id
    }

    pub fn approval_status(&self) -> ApprovalStatus {
        self.approval_status
    }

    /// Latest approval decision, if any
    pub fn approval(&self) -> Option<&ApprovalDecision> {
        self.approval.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn lines(&self) -> &[JournalEntryLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
