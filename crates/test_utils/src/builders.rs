//! Test Data Builders
//!
//! Builders for ledger service commands. Tests set only the fields they
//! care about; everything else defaults to a valid January 2024 value.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, AccountingPeriodId};
use domain_ledger::{ClassificationTag, NewJournalEntry, NewJournalLine, NewPostingBatch};

use crate::fixtures::DateFixtures;

/// Builder for [`NewJournalEntry`]
pub struct JournalEntryBuilder {
    date: NaiveDate,
    reference_number: String,
    description: String,
    source: String,
    period_id: Option<AccountingPeriodId>,
    original_amount: Option<Decimal>,
    lines: Vec<NewJournalLine>,
}

impl Default for JournalEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalEntryBuilder {
    pub fn new() -> Self {
        Self {
            date: DateFixtures::jan_15(),
            reference_number: "JE-0001".to_string(),
            description: "Test entry".to_string(),
            source: "Manual".to_string(),
            period_id: None,
            original_amount: None,
            lines: Vec::new(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = reference.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn in_period(mut self, period_id: AccountingPeriodId) -> Self {
        self.period_id = Some(period_id);
        self
    }

    pub fn with_original_amount(mut self, amount: Decimal) -> Self {
        self.original_amount = Some(amount);
        self
    }

    pub fn debit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        self.lines.push(NewJournalLine::debit(account_id, amount));
        self
    }

    pub fn credit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        self.lines.push(NewJournalLine::credit(account_id, amount));
        self
    }

    /// Adds a classified line; zero on either side
    pub fn classified_line(
        mut self,
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
        classification: ClassificationTag,
    ) -> Self {
        self.lines.push(NewJournalLine {
            account_id,
            debit,
            credit,
            memo: None,
            classification: Some(classification),
        });
        self
    }

    /// A balanced two-line entry moving `amount` from `credit_to` into `debit_to`
    pub fn transfer(self, debit_to: AccountId, credit_to: AccountId, amount: Decimal) -> Self {
        self.debit(debit_to, amount).credit(credit_to, amount)
    }

    /// The control total defaults to the sum of debits
    pub fn build(self) -> NewJournalEntry {
        let debits: Decimal = self.lines.iter().map(|line| line.debit).sum();
        NewJournalEntry {
            date: self.date,
            reference_number: self.reference_number,
            description: self.description,
            source: self.source,
            period_id: self.period_id,
            original_amount: self.original_amount.unwrap_or(debits),
            lines: self.lines,
        }
    }
}

/// Builder for [`NewPostingBatch`]
pub struct PostingBatchBuilder {
    batch_number: String,
    batch_date: NaiveDate,
    description: Option<String>,
    period_id: Option<AccountingPeriodId>,
}

impl Default for PostingBatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PostingBatchBuilder {
    pub fn new() -> Self {
        Self {
            batch_number: "BATCH-0001".to_string(),
            batch_date: DateFixtures::jan_15(),
            description: None,
            period_id: None,
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.batch_number = number.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.batch_date = date;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn in_period(mut self, period_id: AccountingPeriodId) -> Self {
        self.period_id = Some(period_id);
        self
    }

    pub fn build(self) -> NewPostingBatch {
        NewPostingBatch {
            batch_number: self.batch_number,
            batch_date: self.batch_date,
            description: self.description,
            period_id: self.period_id,
        }
    }
}
