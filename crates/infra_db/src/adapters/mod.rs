//! Ledger store adapters
//!
//! Two implementations of the `LedgerStore` port:
//!
//! - [`InMemoryLedgerStore`]: snapshot-isolated, process-local
//! - [`PostgresLedgerStore`]: one database transaction per unit of work

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryLedgerStore, InMemoryUnitOfWork};
pub use postgres::{PostgresLedgerStore, PostgresUnitOfWork};
