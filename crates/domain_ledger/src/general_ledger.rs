//! General ledger projection
//!
//! One row per posted journal line. Rows are append-only: amounts, account
//! and provenance are fixed at creation, and corrections arrive as new
//! offsetting rows. Only descriptive metadata can be edited afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use core_kernel::money::ensure_non_negative;
use core_kernel::{AccountId, AccountingPeriodId, JournalEntryId, JournalLineId, LedgerRowId, BALANCE_TOLERANCE};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::journal::{JournalEntry, JournalEntryLine};

/// Operational cost-center class attached to every ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassificationTag {
    Generation,
    Transmission,
    Distribution,
    CustomerService,
    Sales,
    Administrative,
    General,
    Maintenance,
}

impl ClassificationTag {
    /// Every accepted tag
    pub const ALL: [ClassificationTag; 8] = [
        ClassificationTag::Generation,
        ClassificationTag::Transmission,
        ClassificationTag::Distribution,
        ClassificationTag::CustomerService,
        ClassificationTag::Sales,
        ClassificationTag::Administrative,
        ClassificationTag::General,
        ClassificationTag::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationTag::Generation => "Generation",
            ClassificationTag::Transmission => "Transmission",
            ClassificationTag::Distribution => "Distribution",
            ClassificationTag::CustomerService => "CustomerService",
            ClassificationTag::Sales => "Sales",
            ClassificationTag::Administrative => "Administrative",
            ClassificationTag::General => "General",
            ClassificationTag::Maintenance => "Maintenance",
        }
    }
}

impl Default for ClassificationTag {
    fn default() -> Self {
        ClassificationTag::General
    }
}

impl fmt::Display for ClassificationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationTag {
    type Err = LedgerError;

    /// Case-insensitive; spaces, dashes and underscores are ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        ClassificationTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().to_ascii_lowercase() == key)
            .ok_or_else(|| LedgerError::UnknownClassification(s.to_string()))
    }
}

/// Input for [`GeneralLedgerRow::create`]
#[derive(Debug, Clone)]
pub struct NewLedgerRow {
    pub entry_id: JournalEntryId,
    pub line_id: Option<JournalLineId>,
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub classification: ClassificationTag,
    pub transaction_date: NaiveDate,
    pub period_id: Option<AccountingPeriodId>,
    pub memo: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Descriptive fields that may change after a row is written
#[derive(Debug, Clone, Default)]
pub struct LedgerRowMetadata {
    pub memo: Option<String>,
    pub reference_number: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// A posted movement on one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralLedgerRow {
    id: LedgerRowId,
    entry_id: JournalEntryId,
    line_id: Option<JournalLineId>,
    account_id: AccountId,
    debit: Decimal,
    credit: Decimal,
    classification: ClassificationTag,
    transaction_date: NaiveDate,
    period_id: Option<AccountingPeriodId>,
    memo: Option<String>,
    reference_number: Option<String>,
    description: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl GeneralLedgerRow {
    /// Creates a row
    ///
    /// # Errors
    ///
    /// Returns a validation error when either amount is negative, both are
    /// positive, or both are zero
    pub fn create(id: LedgerRowId, row: NewLedgerRow) -> Result<Self, LedgerError> {
        let debit = ensure_non_negative(row.debit)?;
        let credit = ensure_non_negative(row.credit)?;

        if debit > Decimal::ZERO && credit > Decimal::ZERO {
            return Err(LedgerError::validation(
                "amount",
                "a ledger row cannot carry both a debit and a credit",
            ));
        }
        if debit.is_zero() && credit.is_zero() {
            return Err(LedgerError::validation(
                "amount",
                "a ledger row must carry a debit or a credit",
            ));
        }

        let now = Utc::now();
        let mut ledger_row = Self {
            id,
            entry_id: row.entry_id,
            line_id: row.line_id,
            account_id: row.account_id,
            debit,
            credit,
            classification: row.classification,
            transaction_date: row.transaction_date,
            period_id: row.period_id,
            memo: row.memo,
            reference_number: row.reference_number,
            description: row.description,
            notes: row.notes,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };

        ledger_row.events.push(LedgerEvent::LedgerRowCreated {
            row_id: id,
            entry_id: ledger_row.entry_id,
            account_id: ledger_row.account_id,
            debit,
            credit,
            classification: ledger_row.classification,
            timestamp: now,
        });

        Ok(ledger_row)
    }

    /// Builds the row for one line of a posted entry
    pub fn from_posted_line(
        id: LedgerRowId,
        entry: &JournalEntry,
        line: &JournalEntryLine,
        classification: ClassificationTag,
        period_id: Option<AccountingPeriodId>,
    ) -> Result<Self, LedgerError> {
        Self::create(
            id,
            NewLedgerRow {
                entry_id: entry.id(),
                line_id: Some(line.id()),
                account_id: line.account_id(),
                debit: line.debit_amount(),
                credit: line.credit_amount(),
                classification,
                transaction_date: entry.date(),
                period_id: period_id.or(entry.period_id()),
                memo: line.memo().map(str::to_string),
                reference_number: Some(entry.reference_number().to_string()),
                description: Some(entry.description().to_string()).filter(|d| !d.is_empty()),
                notes: None,
            },
        )
    }

    /// Updates descriptive metadata; amounts and account never change
    pub fn update(&mut self, metadata: LedgerRowMetadata) {
        let mut changed = false;

        for (slot, value) in [
            (&mut self.memo, metadata.memo),
            (&mut self.reference_number, metadata.reference_number),
            (&mut self.description, metadata.description),
            (&mut self.notes, metadata.notes),
        ] {
            if let Some(value) = value {
                if slot.as_ref() != Some(&value) {
                    *slot = Some(value);
                    changed = true;
                }
            }
        }

        if changed {
            self.updated_at = Utc::now();
            self.events.push(LedgerEvent::LedgerRowUpdated {
                row_id: self.id,
                timestamp: self.updated_at,
            });
        }
    }

    /// Drains recorded events
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn id(&self) -> LedgerRowId {
        self.id
    }

    pub fn entry_id(&self) -> JournalEntryId {
        self.entry_id
    }

    pub fn line_id(&self) -> Option<JournalLineId> {
        self.line_id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn debit(&self) -> Decimal {
        self.debit
    }

    pub fn credit(&self) -> Decimal {
        self.credit
    }

    pub fn classification(&self) -> ClassificationTag {
        self.classification
    }

    pub fn transaction_date(&self) -> NaiveDate {
        self.transaction_date
    }

    pub fn period_id(&self) -> Option<AccountingPeriodId> {
        self.period_id
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn reference_number(&self) -> Option<&str> {
        self.reference_number.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Debit and credit totals for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountTotals {
    pub debits: Decimal,
    pub credits: Decimal,
}

/// Per-account totals over a set of ledger rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialBalance {
    pub accounts: BTreeMap<AccountId, AccountTotals>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
}

impl TrialBalance {
    /// Folds ledger rows into per-account totals
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a GeneralLedgerRow>,
    {
        let mut trial = TrialBalance::default();
        for row in rows {
            let totals = trial.accounts.entry(row.account_id).or_default();
            totals.debits += row.debit;
            totals.credits += row.credit;
            trial.total_debits += row.debit;
            trial.total_credits += row.credit;
        }
        trial
    }

    /// True when ledger-wide debits equal credits within tolerance
    pub fn is_balanced(&self) -> bool {
        (self.total_debits - self.total_credits).abs() < BALANCE_TOLERANCE
    }
}
