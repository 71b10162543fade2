//! Test Utilities Crate
//!
//! Shared test infrastructure for the ledger workspace.
//!
//! # Modules
//!
//! - `fixtures`: dates, a chart of accounts and a wired-up in-memory ledger
//! - `builders`: builders for service commands
//! - `database`: PostgreSQL test containers
//! - `assertions`: ledger-specific assertions
//! - `generators`: proptest strategies
//! - `metrics`: a counting metrics collector

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;
pub mod metrics;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
pub use metrics::*;
