//! PostgreSQL Ledger Store
//!
//! Implements [`LedgerStore`] on top of a connection pool. Each unit of
//! work owns one database transaction; the SQL lives in
//! [`LedgerRepository`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let store = PostgresLedgerStore::new(pool);
//! let mut uow = store.begin().await?;
//! ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AccountId, AccountingPeriodId, AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable,
    JournalEntryId, LedgerRowId, PortError, PostingBatchId,
};
use domain_ledger::{
    Account, AccountingPeriod, GeneralLedgerRow, JournalEntry, LedgerStore, LedgerUnitOfWork,
    PostingBatch,
};

use crate::error::DatabaseError;
use crate::repositories::LedgerRepository;

/// PostgreSQL-backed ledger store
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresLedgerStore {}

#[async_trait]
impl HealthCheckable for PostgresLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-ledger-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-ledger-store".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        debug!("Transaction started");
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// One database transaction
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnitOfWork for PostgresUnitOfWork {
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, PortError> {
        Ok(LedgerRepository::find_account(&mut self.tx, *id.as_uuid()).await?)
    }

    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, PortError> {
        Ok(LedgerRepository::find_account_by_code(&mut self.tx, code).await?)
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, PortError> {
        Ok(LedgerRepository::list_accounts(&mut self.tx).await?)
    }

    #[instrument(skip(self, account), fields(account_id = %account.id(), version = account.version()))]
    async fn save_account(&mut self, account: &mut Account) -> Result<(), PortError> {
        let expected = account.version();
        let mut next = account.clone();
        next.mark_persisted();

        LedgerRepository::upsert_account(&mut self.tx, &next, expected).await?;
        account.mark_persisted();
        Ok(())
    }

    async fn period(&mut self, id: AccountingPeriodId) -> Result<Option<AccountingPeriod>, PortError> {
        Ok(LedgerRepository::find_period(&mut self.tx, *id.as_uuid()).await?)
    }

    async fn periods_covering(&mut self, date: NaiveDate) -> Result<Vec<AccountingPeriod>, PortError> {
        Ok(LedgerRepository::periods_covering(&mut self.tx, date).await?)
    }

    async fn list_periods(&mut self) -> Result<Vec<AccountingPeriod>, PortError> {
        Ok(LedgerRepository::list_periods(&mut self.tx).await?)
    }

    async fn save_period(&mut self, period: &mut AccountingPeriod) -> Result<(), PortError> {
        let expected = period.version();
        let mut next = period.clone();
        next.mark_persisted();

        LedgerRepository::upsert_period(&mut self.tx, &next, expected).await?;
        period.mark_persisted();
        Ok(())
    }

    async fn journal_entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, PortError> {
        Ok(LedgerRepository::find_entry(&mut self.tx, *id.as_uuid()).await?)
    }

    async fn save_journal_entry(&mut self, entry: &mut JournalEntry) -> Result<(), PortError> {
        let expected = entry.version();
        let mut next = entry.clone();
        next.mark_persisted();

        LedgerRepository::upsert_entry(&mut self.tx, &next, expected).await?;
        entry.mark_persisted();
        Ok(())
    }

    async fn posting_batch(&mut self, id: PostingBatchId) -> Result<Option<PostingBatch>, PortError> {
        Ok(LedgerRepository::find_batch(&mut self.tx, *id.as_uuid()).await?)
    }

    async fn batch_by_number(&mut self, batch_number: &str) -> Result<Option<PostingBatch>, PortError> {
        Ok(LedgerRepository::find_batch_by_number(&mut self.tx, batch_number).await?)
    }

    #[instrument(skip(self, batch), fields(batch_id = %batch.id(), entries = batch.entry_count()))]
    async fn save_posting_batch(&mut self, batch: &mut PostingBatch) -> Result<(), PortError> {
        let mut next = batch.clone();
        next.mark_persisted();

        LedgerRepository::upsert_batch(&mut self.tx, &next, batch.version()).await?;
        for (saved, current) in next.entries().iter().zip(batch.entries()) {
            LedgerRepository::upsert_entry(&mut self.tx, saved, current.version()).await?;
        }
        batch.mark_persisted();
        Ok(())
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn append_ledger_rows(&mut self, rows: &[GeneralLedgerRow]) -> Result<(), PortError> {
        for row in rows {
            LedgerRepository::insert_row(&mut self.tx, row).await?;
        }
        Ok(())
    }

    async fn ledger_row(&mut self, id: LedgerRowId) -> Result<Option<GeneralLedgerRow>, PortError> {
        Ok(LedgerRepository::find_row(&mut self.tx, *id.as_uuid()).await?)
    }

    async fn update_ledger_row_metadata(&mut self, row: &GeneralLedgerRow) -> Result<(), PortError> {
        Ok(LedgerRepository::update_row_body(&mut self.tx, row).await?)
    }

    async fn ledger_rows_for_account(&mut self, account_id: AccountId) -> Result<Vec<GeneralLedgerRow>, PortError> {
        Ok(LedgerRepository::rows_for_account(&mut self.tx, *account_id.as_uuid()).await?)
    }

    async fn ledger_rows_for_entry(&mut self, entry_id: JournalEntryId) -> Result<Vec<GeneralLedgerRow>, PortError> {
        Ok(LedgerRepository::rows_for_entry(&mut self.tx, *entry_id.as_uuid()).await?)
    }

    async fn all_ledger_rows(&mut self) -> Result<Vec<GeneralLedgerRow>, PortError> {
        Ok(LedgerRepository::all_rows(&mut self.tx).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let PostgresUnitOfWork { tx } = *self;
        tx.commit().await.map_err(DatabaseError::from)?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        let PostgresUnitOfWork { tx } = *self;
        tx.rollback().await.map_err(DatabaseError::from)?;
        debug!("Transaction rolled back");
        Ok(())
    }
}
