//! Infrastructure Database Layer
//!
//! Persistence for the ledger: a PostgreSQL store built on SQLx and an
//! in-memory store with the same unit-of-work semantics.
//!
//! # Architecture
//!
//! ```text
//! LedgerService ──► LedgerStore::begin ──► LedgerUnitOfWork ──► commit / rollback
//!                        │
//!                        ├── PostgresLedgerStore (LedgerRepository SQL)
//!                        └── InMemoryLedgerStore
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/ledger")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{InMemoryLedgerStore, PostgresLedgerStore};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use repositories::LedgerRepository;
