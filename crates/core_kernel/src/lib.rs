//! Core Kernel - Foundational types and utilities for the ledger system
//!
//! This crate provides the fundamental building blocks used across the workspace:
//! - Strongly-typed identifiers for every ledger aggregate
//! - Fixed-point amount helpers and the balance tolerance
//! - Inclusive date ranges for accounting periods
//! - Port abstractions (errors, health checks, identity generation)

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{PositiveAmount, MoneyError, BALANCE_TOLERANCE};
pub use temporal::{DateRange, TemporalError};
pub use identifiers::{
    AccountId, AccountingPeriodId, JournalEntryId, JournalLineId,
    PostingBatchId, LedgerRowId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
    IdGenerator, UuidV7Generator, SequentialIdGenerator,
};
