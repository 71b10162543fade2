//! Posting batches and their approval workflow
//!
//! A batch tracks two things independently: where it is in the posting
//! lifecycle ([`BatchStatus`]) and what the approver decided
//! ([`ApprovalStatus`]).
//!
//! ```text
//!            add_journal_entry
//!              ┌─────┐
//!              ▼     │
//!           ┌───────┐   post (Approved)   ┌────────┐   reverse   ┌──────────┐
//!  create ─►│ Draft │────────────────────►│ Posted │────────────►│ Reversed │
//!           └───────┘                     └────────┘             └──────────┘
//!
//!  approval:  Pending ──approve──► Approved ──reject──► Rejected ──approve──► Approved
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountingPeriodId, JournalEntryId, PostingBatchId};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::journal::JournalEntry;

/// Posting lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Draft,
    Posted,
    Reversed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Draft => f.write_str("Draft"),
            BatchStatus::Posted => f.write_str("Posted"),
            BatchStatus::Reversed => f.write_str("Reversed"),
        }
    }
}

/// Approval decision on a batch or a standalone journal entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => f.write_str("Pending"),
            ApprovalStatus::Approved => f.write_str("Approved"),
            ApprovalStatus::Rejected => f.write_str("Rejected"),
        }
    }
}

/// Who made the latest approval decision, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub actor: String,
    pub decided_at: DateTime<Utc>,
}

/// A group of journal entries posted or reversed under one approval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingBatch {
    id: PostingBatchId,
    batch_number: String,
    batch_date: NaiveDate,
    description: Option<String>,
    period_id: Option<AccountingPeriodId>,
    status: BatchStatus,
    approval_status: ApprovalStatus,
    approval: Option<ApprovalDecision>,
    posted_by: Option<String>,
    posted_at: Option<DateTime<Utc>>,
    reversed_by: Option<String>,
    reversed_at: Option<DateTime<Utc>>,
    reversal_reason: Option<String>,
    entries: Vec<JournalEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Persistence version, used for optimistic concurrency
    #[serde(default)]
    version: u64,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl PostingBatch {
    /// Creates an empty Draft/Pending batch
    ///
    /// # Errors
    ///
    /// Returns a validation error if the batch number is blank
    pub fn create(
        id: PostingBatchId,
        batch_number: impl Into<String>,
        batch_date: NaiveDate,
        description: Option<String>,
        period_id: Option<AccountingPeriodId>,
    ) -> Result<Self, LedgerError> {
        let batch_number = batch_number.into().trim().to_string();
        LedgerError::require("batch_number", &batch_number)?;

        let now = Utc::now();
        let mut batch = Self {
            id,
            batch_number,
            batch_date,
            description,
            period_id,
            status: BatchStatus::Draft,
            approval_status: ApprovalStatus::Pending,
            approval: None,
            posted_by: None,
            posted_at: None,
            reversed_by: None,
            reversed_at: None,
            reversal_reason: None,
            entries: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
            events: Vec::new(),
        };

        batch.events.push(LedgerEvent::PostingBatchCreated {
            batch_id: id,
            batch_number: batch.batch_number.clone(),
            batch_date,
            timestamp: now,
        });

        Ok(batch)
    }

    /// Attaches a draft entry to the batch
    ///
    /// # Errors
    ///
    /// - `LedgerError::BatchNotDraft` unless the batch is a draft
    /// - `LedgerError::EntryAlreadyPosted` for a posted entry
    /// - a validation error if the entry is already in this batch
    pub fn add_journal_entry(&mut self, mut entry: JournalEntry) -> Result<(), LedgerError> {
        self.ensure_draft()?;
        if entry.is_posted() {
            return Err(LedgerError::EntryAlreadyPosted {
                entry_id: entry.id().to_string(),
            });
        }
        if self.entries.iter().any(|e| e.id() == entry.id()) {
            return Err(LedgerError::validation(
                "entry_id",
                format!("entry {} is already in batch {}", entry.id(), self.id),
            ));
        }

        entry.assign_to_batch(self.id);
        self.updated_at = Utc::now();
        self.events.push(LedgerEvent::PostingBatchEntryAdded {
            batch_id: self.id,
            entry_id: entry.id(),
            timestamp: self.updated_at,
        });
        self.entries.push(entry);

        Ok(())
    }

    /// Approves the batch
    ///
    /// # Errors
    ///
    /// `LedgerError::BatchAlreadyApproved` if already approved; a validation error for a blank actor
    pub fn approve(&mut self, approved_by: impl Into<String>) -> Result<(), LedgerError> {
        let approved_by = approved_by.into();
        LedgerError::require("approved_by", &approved_by)?;
        if self.approval_status == ApprovalStatus::Approved {
            return Err(LedgerError::BatchAlreadyApproved {
                batch_id: self.id.to_string(),
            });
        }

        self.record_decision(ApprovalStatus::Approved, approved_by.clone());
        self.events.push(LedgerEvent::PostingBatchApproved {
            batch_id: self.id,
            approved_by,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Rejects the batch
    ///
    /// # Errors
    ///
    /// `LedgerError::BatchAlreadyRejected` if already rejected; a validation error for a blank actor
    pub fn reject(&mut self, rejected_by: impl Into<String>) -> Result<(), LedgerError> {
        let rejected_by = rejected_by.into();
        LedgerError::require("rejected_by", &rejected_by)?;
        if self.approval_status == ApprovalStatus::Rejected {
            return Err(LedgerError::BatchAlreadyRejected {
                batch_id: self.id.to_string(),
            });
        }

        self.record_decision(ApprovalStatus::Rejected, rejected_by.clone());
        self.events.push(LedgerEvent::PostingBatchRejected {
            batch_id: self.id,
            rejected_by,
            timestamp: self.updated_at,
        });
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

    /// Posts every entry in insertion order and marks the batch Posted
    ///
    /// All entries are checked before the first one is flipped, so a
    /// failure leaves every entry unposted.
    ///
    /// # Errors
    ///
    /// - `LedgerError::BatchNotDraft` unless the batch is a draft
    /// - `LedgerError::BatchNotApproved` unless the batch is approved
    /// - the first entry-level failure (`EntryAlreadyPosted`, `UnbalancedEntry`)
    pub fn post(&mut self, posted_by: impl Into<String>) -> Result<(), LedgerError> {
        let posted_by = posted_by.into();
        self.check_postable()?;
        LedgerError::require("posted_by", &posted_by)?;

        for entry in &mut self.entries {
            entry.post()?;
        }

        let now = Utc::now();
        self.status = BatchStatus::Posted;
        self.posted_by = Some(posted_by.clone());
        self.posted_at = Some(now);
        self.updated_at = now;
        self.events.push(LedgerEvent::PostingBatchPosted {
            batch_id: self.id,
            posted_by,
            entry_count: self.entries.len(),
            total_debits: self.total_debits(),
            total_credits: self.total_credits(),
            timestamp: now,
        });

        Ok(())
    }

    /// Checks every precondition of [`post`](Self::post) without changing anything
    pub fn check_postable(&self) -> Result<(), LedgerError> {
        self.ensure_draft()?;
        if self.approval_status != ApprovalStatus::Approved {
            return Err(LedgerError::BatchNotApproved {
                batch_id: self.id.to_string(),
                approval_status: self.approval_status.to_string(),
            });
        }
        self.entries.iter().try_for_each(JournalEntry::check_postable)
    }

    /// Marks every entry reversed and the batch Reversed
    ///
    /// Like [`JournalEntry::reverse`], this records the reversal without
    /// moving any balance.
    ///
    /// # Errors
    ///
    /// `LedgerError::BatchNotPosted` unless the batch is posted, or the
    /// first entry-level reversal failure
    pub fn reverse(
        &mut self,
        reversed_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let reversed_by = reversed_by.into();
        let reason = reason.into();

        if self.status != BatchStatus::Posted {
            return Err(LedgerError::BatchNotPosted {
                batch_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        LedgerError::require("reversed_by", &reversed_by)?;
        for entry in &self.entries {
            entry.check_reversible(&reason)?;
        }

        let now = Utc::now();
        let reversal_date = now.date_naive();
        for entry in &mut self.entries {
            entry.reverse(reversal_date, reason.clone())?;
        }

        self.status = BatchStatus::Reversed;
        self.reversed_by = Some(reversed_by.clone());
        self.reversed_at = Some(now);
        self.reversal_reason = Some(reason.clone());
        self.updated_at = now;
        self.events.push(LedgerEvent::PostingBatchReversed {
            batch_id: self.id,
            reversed_by,
            reason,
            timestamp: now,
        });

        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), LedgerError> {
        if self.status != BatchStatus::Draft {
            return Err(LedgerError::BatchNotDraft {
                batch_id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Called by persistence once a save succeeded; the batch's entries are
    /// saved with it and move on too
    pub fn mark_persisted(&mut self) {
        self.version += 1;
        for entry in &mut self.entries {
            entry.mark_persisted();
        }
    }

    /// Drains the batch's own events followed by each entry's events
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        let mut events = std::mem::take(&mut self.events);
        for entry in &mut self.entries {
            events.extend(entry.take_events());
        }
        events
    }

    pub fn id(&self) -> PostingBatchId {
        self.id
    }

    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    pub fn batch_date(&self) -> NaiveDate {
        self.batch_date
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn period_id(&self) -> Option<AccountingPeriodId> {
        self.period_id
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn approval_status(&self) -> ApprovalStatus {
        self.approval_status
    }

    pub fn approval(&self) -> Option<&ApprovalDecision> {
        self.approval.as_ref()
    }

    pub fn posted_by(&self) -> Option<&str> {
        self.posted_by.as_deref()
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    pub fn reversed_by(&self) -> Option<&str> {
        self.reversed_by.as_deref()
    }

    pub fn reversed_at(&self) -> Option<DateTime<Utc>> {
        self.reversed_at
    }

    pub fn reversal_reason(&self) -> Option<&str> {
        self.reversal_reason.as_deref()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn entry(&self, entry_id: JournalEntryId) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.id() == entry_id)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_debits(&self) -> Decimal {
        self.entries.iter().map(JournalEntry::total_debits).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.entries.iter().map(JournalEntry::total_credits).sum()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
