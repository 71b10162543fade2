//! SQL access for the ledger tables
//!
//! Aggregates are stored as JSONB bodies; the columns next to them exist for
//! filtering, ordering and the constraints that protect the general ledger.

pub mod ledger;

pub use ledger::LedgerRepository;
