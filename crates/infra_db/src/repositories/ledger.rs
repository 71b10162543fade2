//! Ledger repository
//!
//! SQL for the ledger tables. Every function runs on a caller-supplied
//! connection, normally the open transaction of a
//! [`PostgresUnitOfWork`](crate::adapters::postgres::PostgresUnitOfWork),
//! so the caller decides the transaction boundary.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use domain_ledger::{Account, AccountingPeriod, GeneralLedgerRow, JournalEntry, PostingBatch};

use crate::error::DatabaseError;

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(body)?)
}

fn decode_all<T: DeserializeOwned>(bodies: Vec<Value>) -> Result<Vec<T>, DatabaseError> {
    bodies.into_iter().map(decode).collect()
}

/// A versioned upsert that touched no row lost the race
fn ensure_written(
    rows_affected: u64,
    entity: &str,
    id: impl std::fmt::Display,
    expected: u64,
) -> Result<(), DatabaseError> {
    if rows_affected == 0 {
        return Err(DatabaseError::StaleVersion {
            entity: entity.to_string(),
            id: id.to_string(),
            expected,
        });
    }
    Ok(())
}

/// Stateless access to the ledger tables
pub struct LedgerRepository;

impl LedgerRepository {
    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    pub async fn find_account(conn: &mut PgConnection, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM accounts WHERE account_id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        body.map(decode).transpose()
    }

    pub async fn find_account_by_code(conn: &mut PgConnection, code: &str) -> Result<Option<Account>, DatabaseError> {
        let body: Option<Value> = sqlx::query_scalar("SELECT body FROM accounts WHERE code = $1")
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;
        body.map(decode).transpose()
    }

    pub async fn list_accounts(conn: &mut PgConnection) -> Result<Vec<Account>, DatabaseError> {
        let bodies: Vec<Value> = sqlx::query_scalar("SELECT body FROM accounts ORDER BY code")
            .fetch_all(&mut *conn)
            .await?;
        decode_all(bodies)
    }

    /// Writes `account` (already carrying its next version) if the stored
    /// row is still at `expected_version`
    ///
    /// A new account is written with `expected_version = 0`, which never
    /// matches an existing row. Periods, entries and batches follow the
    /// same protocol.
    ///
    /// # Errors
    ///
    /// `DatabaseError::StaleVersion` when another writer got there first,
    /// `DatabaseError::DuplicateEntry` when the code is taken
    pub async fn upsert_account(
        conn: &mut PgConnection,
        account: &Account,
        expected_version: u64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id, code, category, balance, is_active, version, body, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (account_id) DO UPDATE SET
                code = EXCLUDED.code,
                category = EXCLUDED.category,
                balance = EXCLUDED.balance,
                is_active = EXCLUDED.is_active,
                version = EXCLUDED.version,
                body = EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            WHERE accounts.version = $9
            "#,
        )
        .bind(account.id().as_uuid())
        .bind(account.code())
        .bind(account.category().as_str())
        .bind(account.balance())
        .bind(account.is_active())
        .bind(account.version() as i64)
        .bind(serde_json::to_value(account)?)
        .bind(account.updated_at())
        .bind(expected_version as i64)
        .execute(&mut *conn)
        .await?;

        ensure_written(result.rows_affected(), "Account", account.id(), expected_version)
    }

    // ---------------------------------------------------------------------
    // Accounting periods
    // ---------------------------------------------------------------------

    pub async fn find_period(conn: &mut PgConnection, id: Uuid) -> Result<Option<AccountingPeriod>, DatabaseError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM accounting_periods WHERE period_id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        body.map(decode).transpose()
    }

    pub async fn periods_covering(
        conn: &mut PgConnection,
        date: NaiveDate,
    ) -> Result<Vec<AccountingPeriod>, DatabaseError> {
        let bodies: Vec<Value> = sqlx::query_scalar(
            "SELECT body FROM accounting_periods WHERE start_date <= $1 AND end_date >= $1 ORDER BY start_date",
        )
        .bind(date)
        .fetch_all(&mut *conn)
        .await?;
        decode_all(bodies)
    }

    pub async fn list_periods(conn: &mut PgConnection) -> Result<Vec<AccountingPeriod>, DatabaseError> {
        let bodies: Vec<Value> =
            sqlx::query_scalar("SELECT body FROM accounting_periods ORDER BY start_date, name")
                .fetch_all(&mut *conn)
                .await?;
        decode_all(bodies)
    }

    pub async fn upsert_period(
        conn: &mut PgConnection,
        period: &AccountingPeriod,
        expected_version: u64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounting_periods (
                period_id, name, start_date, end_date, fiscal_year, period_type,
                is_closed, is_adjustment_period, version, body
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (period_id) DO UPDATE SET
                name = EXCLUDED.name,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                fiscal_year = EXCLUDED.fiscal_year,
                period_type = EXCLUDED.period_type,
                is_closed = EXCLUDED.is_closed,
                is_adjustment_period = EXCLUDED.is_adjustment_period,
                version = EXCLUDED.version,
                body = EXCLUDED.body
            WHERE accounting_periods.version = $11
            "#,
        )
        .bind(period.id().as_uuid())
        .bind(period.name())
        .bind(period.start_date())
        .bind(period.end_date())
        .bind(period.fiscal_year())
        .bind(period.period_type().to_string())
        .bind(period.is_closed())
        .bind(period.is_adjustment_period())
        .bind(period.version() as i64)
        .bind(serde_json::to_value(period)?)
        .bind(expected_version as i64)
        .execute(&mut *conn)
        .await?;

        ensure_written(result.rows_affected(), "AccountingPeriod", period.id(), expected_version)
    }

    // ---------------------------------------------------------------------
    // Journal entries
    // ---------------------------------------------------------------------

    pub async fn find_entry(conn: &mut PgConnection, id: Uuid) -> Result<Option<JournalEntry>, DatabaseError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM journal_entries WHERE entry_id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        body.map(decode).transpose()
    }

    pub async fn upsert_entry(
        conn: &mut PgConnection,
        entry: &JournalEntry,
        expected_version: u64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO journal_entries (
                entry_id, batch_id, entry_date, reference_number, is_posted, is_reversed, version, body
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entry_id) DO UPDATE SET
                batch_id = EXCLUDED.batch_id,
                entry_date = EXCLUDED.entry_date,
                reference_number = EXCLUDED.reference_number,
                is_posted = EXCLUDED.is_posted,
                is_reversed = EXCLUDED.is_reversed,
                version = EXCLUDED.version,
                body = EXCLUDED.body
            WHERE journal_entries.version = $9
            "#,
        )
        .bind(entry.id().as_uuid())
        .bind(entry.batch_id().map(|id| *id.as_uuid()))
        .bind(entry.date())
        .bind(entry.reference_number())
        .bind(entry.is_posted())
        .bind(entry.is_reversed())
        .bind(entry.version() as i64)
        .bind(serde_json::to_value(entry)?)
        .bind(expected_version as i64)
        .execute(&mut *conn)
        .await?;

        ensure_written(result.rows_affected(), "JournalEntry", entry.id(), expected_version)
    }

    // ---------------------------------------------------------------------
    // Posting batches
    // ---------------------------------------------------------------------

    pub async fn find_batch(conn: &mut PgConnection, id: Uuid) -> Result<Option<PostingBatch>, DatabaseError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM posting_batches WHERE batch_id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        body.map(decode).transpose()
    }

    pub async fn find_batch_by_number(
        conn: &mut PgConnection,
        batch_number: &str,
    ) -> Result<Option<PostingBatch>, DatabaseError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM posting_batches WHERE batch_number = $1")
                .bind(batch_number)
                .fetch_optional(&mut *conn)
                .await?;
        body.map(decode).transpose()
    }

    /// Writes the batch row only; the entries it owns are upserted separately
    pub async fn upsert_batch(
        conn: &mut PgConnection,
        batch: &PostingBatch,
        expected_version: u64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posting_batches (
                batch_id, batch_number, batch_date, status, approval_status, version, body
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (batch_id) DO UPDATE SET
                batch_number = EXCLUDED.batch_number,
                batch_date = EXCLUDED.batch_date,
                status = EXCLUDED.status,
                approval_status = EXCLUDED.approval_status,
                version = EXCLUDED.version,
                body = EXCLUDED.body
            WHERE posting_batches.version = $8
            "#,
        )
        .bind(batch.id().as_uuid())
        .bind(batch.batch_number())
        .bind(batch.batch_date())
        .bind(batch.status().to_string())
        .bind(batch.approval_status().to_string())
        .bind(batch.version() as i64)
        .bind(serde_json::to_value(batch)?)
        .bind(expected_version as i64)
        .execute(&mut *conn)
        .await?;

        ensure_written(result.rows_affected(), "PostingBatch", batch.id(), expected_version)
    }

    // ---------------------------------------------------------------------
    // General ledger
    // ---------------------------------------------------------------------

    pub async fn insert_row(conn: &mut PgConnection, row: &GeneralLedgerRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO general_ledger (
                row_id, entry_id, line_id, account_id, debit, credit,
                classification, transaction_date, period_id, body, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.id().as_uuid())
        .bind(row.entry_id().as_uuid())
        .bind(row.line_id().map(|id| *id.as_uuid()))
        .bind(row.account_id().as_uuid())
        .bind(row.debit())
        .bind(row.credit())
        .bind(row.classification().as_str())
        .bind(row.transaction_date())
        .bind(row.period_id().map(|id| *id.as_uuid()))
        .bind(serde_json::to_value(row)?)
        .bind(row.created_at())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find_row(conn: &mut PgConnection, id: Uuid) -> Result<Option<GeneralLedgerRow>, DatabaseError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM general_ledger WHERE row_id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        body.map(decode).transpose()
    }

    /// Rewrites a row's body; the trigger on `general_ledger` rejects any amount change
    pub async fn update_row_body(conn: &mut PgConnection, row: &GeneralLedgerRow) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE general_ledger SET body = $2 WHERE row_id = $1")
            .bind(row.id().as_uuid())
            .bind(serde_json::to_value(row)?)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("GeneralLedgerRow", row.id()));
        }
        Ok(())
    }

    pub async fn rows_for_account(conn: &mut PgConnection, account_id: Uuid) -> Result<Vec<GeneralLedgerRow>, DatabaseError> {
        let bodies: Vec<Value> =
            sqlx::query_scalar("SELECT body FROM general_ledger WHERE account_id = $1 ORDER BY seq")
                .bind(account_id)
                .fetch_all(&mut *conn)
                .await?;
        decode_all(bodies)
    }

    pub async fn rows_for_entry(conn: &mut PgConnection, entry_id: Uuid) -> Result<Vec<GeneralLedgerRow>, DatabaseError> {
        let bodies: Vec<Value> =
            sqlx::query_scalar("SELECT body FROM general_ledger WHERE entry_id = $1 ORDER BY seq")
                .bind(entry_id)
                .fetch_all(&mut *conn)
                .await?;
        decode_all(bodies)
    }

    pub async fn all_rows(conn: &mut PgConnection) -> Result<Vec<GeneralLedgerRow>, DatabaseError> {
        let bodies: Vec<Value> = sqlx::query_scalar("SELECT body FROM general_ledger ORDER BY seq")
            .fetch_all(&mut *conn)
            .await?;
        decode_all(bodies)
    }
}
