//! Ledger Domain
//!
//! This crate implements double-entry bookkeeping: a chart of accounts,
//! accounting periods, journal entries, approval-gated posting batches and
//! the append-only general ledger that posting produces.
//!
//! # Core Concepts
//!
//! - **Account**: a ledger account whose balance follows its category's normal side
//! - **Accounting Period**: a date range that can be closed to block postings
//! - **Journal Entry**: lines that must balance (debits = credits) before posting
//! - **Posting Batch**: entries approved, posted and reversed together
//! - **General Ledger Row**: the immutable record of one posted line
//!
//! # Posting flow
//!
//! ```text
//! JournalEntry (draft) ──► PostingEngine ──► Account balances
//!                              │
//!                              └──────────► GeneralLedgerRow (append-only)
//! ```
//!
//! [`LedgerService`] wraps the engine with a [`LedgerStore`] so each command
//! commits or rolls back as a unit.

pub mod account;
pub mod batch;
pub mod error;
pub mod events;
pub mod general_ledger;
pub mod journal;
pub mod metrics;
pub mod period;
pub mod ports;
pub mod posting;
pub mod service;

pub use account::{
    normal_balance_sign, Account, AccountCategory, AccountStatus, AccountUpdate, EntrySide,
    MAX_ACCOUNT_CODE_LEN,
};
pub use batch::{ApprovalDecision, ApprovalStatus, BatchStatus, PostingBatch};
pub use error::{ErrorKind, LedgerError};
pub use events::LedgerEvent;
pub use general_ledger::{
    AccountTotals, ClassificationTag, GeneralLedgerRow, LedgerRowMetadata, NewLedgerRow,
    TrialBalance,
};
pub use journal::{EntryReversal, JournalEntry, JournalEntryLine, JournalEntryUpdate};
pub use metrics::{LedgerMetric, MetricsCollector, NoopMetrics};
pub use period::{AccountingPeriod, PeriodType, PeriodUpdate};
pub use ports::{
    EventSink, InMemoryEventSink, LedgerStore, LedgerUnitOfWork, PeriodResolver, TracingEventSink,
};
pub use posting::{AccountBook, PostingEngine, PostingOutcome, PostingPolicy};
pub use service::{
    LedgerService, NewAccount, NewJournalEntry, NewJournalLine, NewPeriod, NewPostingBatch,
    PostedBatch, PostedEntry,
};
