//! Ledger domain errors
//!
//! Every failure carries enough context (aggregate id, current state) for an
//! operator to see which workflow step was violated. Callers that need to
//! branch on the class of failure use [`LedgerError::kind`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, PortError, TemporalError};

/// Broad classes of ledger failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; the caller can retry with corrected data
    Validation,
    /// The aggregate is in the wrong state for the requested operation
    StateConflict,
    /// The double-entry invariant would be broken; the enclosing unit of work must abort
    InvariantViolation,
    /// A referenced aggregate does not exist
    NotFound,
    /// The persistence collaborator failed
    Persistence,
}

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    // Validation
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    #[error("Invalid amount: {0}")]
    Amount(#[from] MoneyError),

    #[error("Invalid date range: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Unknown classification tag: {0}")]
    UnknownClassification(String),

    #[error("Entry dated {date} is outside period {period_id} ({start} to {end})")]
    DateOutsidePeriod {
        period_id: String,
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    // State conflicts
    #[error("Invalid state transition for {aggregate} {id}: {from} -> {to}")]
    InvalidStateTransition {
        aggregate: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Journal entry {entry_id} is already posted")]
    EntryAlreadyPosted {
        entry_id: String,
    },

    #[error("Journal entry {entry_id} is not posted")]
    EntryNotPosted {
        entry_id: String,
    },

    #[error("Journal entry {entry_id} has already been reversed")]
    EntryAlreadyReversed {
        entry_id: String,
    },

    #[error("Journal entry {entry_id} must be approved before posting (approval status: {approval_status})")]
    EntryNotApproved {
        entry_id: String,
        approval_status: String,
    },

    #[error("Journal entry {entry_id} is already approved")]
    EntryAlreadyApproved {
        entry_id: String,
    },

    #[error("Journal entry {entry_id} is already rejected")]
    EntryAlreadyRejected {
        entry_id: String,
    },

    #[error("Journal entry {entry_id} belongs to batch {batch_id} and must be posted through it")]
    EntryManagedByBatch {
        entry_id: String,
        batch_id: String,
    },

    #[error("Accounting period {period_id} is closed")]
    PeriodClosed {
        period_id: String,
    },

    #[error("Accounting period {period_id} is not closed")]
    PeriodNotClosed {
        period_id: String,
    },

    #[error("No accounting period covers {date}")]
    NoPeriodForDate {
        date: NaiveDate,
    },

    #[error("Only draft batches can be posted: batch {batch_id} is {status}")]
    BatchNotDraft {
        batch_id: String,
        status: String,
    },

    #[error("Batch {batch_id} must be approved before posting (approval status: {approval_status})")]
    BatchNotApproved {
        batch_id: String,
        approval_status: String,
    },

    #[error("Batch {batch_id} is {status}; only posted batches can be reversed")]
    BatchNotPosted {
        batch_id: String,
        status: String,
    },

    #[error("Batch {batch_id} is already approved")]
    BatchAlreadyApproved {
        batch_id: String,
    },

    #[error("Batch {batch_id} is already rejected")]
    BatchAlreadyRejected {
        batch_id: String,
    },

    #[error("Account {account_id} is inactive")]
    AccountInactive {
        account_id: String,
    },

    #[error("Account {account_id} is a control account and does not accept direct postings")]
    AccountNoDirectPosting {
        account_id: String,
    },

    #[error("{entity} {key} already exists")]
    DuplicateKey {
        entity: &'static str,
        key: String,
    },

    // Invariant violations
    #[error("Journal entry {entry_id} is unbalanced: debits {debits} != credits {credits}")]
    UnbalancedEntry {
        entry_id: String,
        debits: Decimal,
        credits: Decimal,
    },

    // Lookups and persistence
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),
}

impl LedgerError {
    /// Creates a validation error for the named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Fails with a validation error when a required text field is blank
    pub(crate) fn require(field: &str, value: &str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(Self::validation(field, "is required"));
        }
        Ok(())
    }

    /// Fails with a validation error when a text field exceeds `max` characters
    pub(crate) fn max_len(field: &str, value: &str, max: usize) -> Result<(), Self> {
        if value.chars().count() > max {
            return Err(Self::validation(
                field,
                format!("must be at most {} characters", max),
            ));
        }
        Ok(())
    }

    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation { .. }
            | LedgerError::Amount(_)
            | LedgerError::Temporal(_)
            | LedgerError::UnknownClassification(_)
            | LedgerError::DateOutsidePeriod { .. } => ErrorKind::Validation,

            LedgerError::UnbalancedEntry { .. } => ErrorKind::InvariantViolation,

            LedgerError::NotFound { .. } => ErrorKind::NotFound,

            LedgerError::Persistence(port) if port.is_not_found() => ErrorKind::NotFound,
            LedgerError::Persistence(port) if port.is_conflict() => ErrorKind::StateConflict,
            LedgerError::Persistence(PortError::Validation { .. }) => ErrorKind::Validation,
            LedgerError::Persistence(_) => ErrorKind::Persistence,

            _ => ErrorKind::StateConflict,
        }
    }

    /// Returns true when the enclosing unit of work must be discarded rather
    /// than committed with partial effects
    pub fn aborts_transaction(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kinds() {
        assert_eq!(
            LedgerError::validation("code", "is required").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::Amount(MoneyError::NonPositive(dec!(0))).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::BatchAlreadyApproved { batch_id: "BAT-1".into() }.kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            LedgerError::UnbalancedEntry {
                entry_id: "JNL-1".into(),
                debits: dec!(1000),
                credits: dec!(900),
            }
            .kind(),
            ErrorKind::InvariantViolation
        );
    }

    #[test]
    fn test_port_errors_keep_their_class() {
        let missing: LedgerError = PortError::not_found("Account", "ACC-1").into();
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let stale: LedgerError = PortError::conflict("stale version").into();
        assert_eq!(stale.kind(), ErrorKind::StateConflict);

        let down: LedgerError = PortError::connection("refused").into();
        assert_eq!(down.kind(), ErrorKind::Persistence);
        assert!(down.aborts_transaction());
    }

    #[test]
    fn test_unbalanced_message_names_entry_and_totals() {
        let err = LedgerError::UnbalancedEntry {
            entry_id: "JNL-42".into(),
            debits: dec!(1000),
            credits: dec!(900),
        };
        let message = err.to_string();
        assert!(message.contains("JNL-42"));
        assert!(message.contains("1000"));
        assert!(message.contains("900"));
    }
}
