//! Accounting periods and the closed-period gate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AccountingPeriodId, DateRange};

use crate::error::LedgerError;
use crate::events::LedgerEvent;

const MAX_NAME_LEN: usize = 1024;
const MAX_TEXT_LEN: usize = 2048;
const MIN_FISCAL_YEAR: i32 = 1900;
const MAX_FISCAL_YEAR: i32 = 2100;

/// Length of an accounting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodType {
    Monthly,
    Quarterly,
    Yearly,
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodType::Monthly => f.write_str("Monthly"),
            PeriodType::Quarterly => f.write_str("Quarterly"),
            PeriodType::Yearly => f.write_str("Yearly"),
        }
    }
}

impl FromStr for PeriodType {
    type Err = LedgerError;

    /// Accepts "Annual" as a synonym for Yearly
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(PeriodType::Monthly),
            "quarterly" => Ok(PeriodType::Quarterly),
            "yearly" | "annual" => Ok(PeriodType::Yearly),
            other => Err(LedgerError::validation(
                "period_type",
                format!("unknown period type '{}'", other),
            )),
        }
    }
}

/// Changes to an open period; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct PeriodUpdate {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fiscal_year: Option<i32>,
    pub period_type: Option<PeriodType>,
    pub is_adjustment_period: Option<bool>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// A bounded date range that can be closed to stop postings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingPeriod {
    id: AccountingPeriodId,
    name: String,
    range: DateRange,
    is_closed: bool,
    is_adjustment_period: bool,
    fiscal_year: i32,
    period_type: PeriodType,
    description: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Persistence version, used for optimistic concurrency
    #[serde(default)]
    version: u64,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl AccountingPeriod {
    /// Creates a new open period
    ///
    /// # Errors
    ///
    /// - `LedgerError::Temporal` if `start >= end`
    /// - `LedgerError::Validation` for a blank or overlong name or a fiscal year outside 1900..=2100
    pub fn create(
        id: AccountingPeriodId,
        name: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        fiscal_year: i32,
        period_type: PeriodType,
    ) -> Result<Self, LedgerError> {
        let name = name.into().trim().to_string();
        validate_name(&name)?;
        let range = DateRange::new(start, end)?;
        validate_fiscal_year(fiscal_year)?;

        let now = Utc::now();
        let mut period = Self {
            id,
            name,
            range,
            is_closed: false,
            is_adjustment_period: false,
            fiscal_year,
            period_type,
            description: None,
            notes: None,
            created_at: now,
            updated_at: now,
            version: 0,
            events: Vec::new(),
        };

        period.events.push(LedgerEvent::AccountingPeriodCreated {
            period_id: id,
            name: period.name.clone(),
            start_date: start,
            end_date: end,
            fiscal_year,
            timestamp: now,
        });

        Ok(period)
    }

    /// Marks the period as a year-end adjustment period
    pub fn as_adjustment_period(mut self) -> Self {
        self.is_adjustment_period = true;
        self
    }

    /// Applies an update to an open period
    ///
    /// The date range is revalidated against the merged start and end.
    ///
    /// # Errors
    ///
    /// `LedgerError::PeriodClosed` when the period is closed, validation errors otherwise
    pub fn update(&mut self, update: PeriodUpdate) -> Result<(), LedgerError> {
        self.ensure_open()?;

        let name = match update.name {
            Some(name) => {
                let name = name.trim().to_string();
                validate_name(&name)?;
                name
            }
            None => self.name.clone(),
        };
        let range = DateRange::new(
            update.start_date.unwrap_or(self.range.start),
            update.end_date.unwrap_or(self.range.end),
        )?;
        let fiscal_year = update.fiscal_year.unwrap_or(self.fiscal_year);
        validate_fiscal_year(fiscal_year)?;
        if let Some(description) = &update.description {
            LedgerError::max_len("description", description, MAX_TEXT_LEN)?;
        }
        if let Some(notes) = &update.notes {
            LedgerError::max_len("notes", notes, MAX_TEXT_LEN)?;
        }

        let mut changed = name != self.name
            || range != self.range
            || fiscal_year != self.fiscal_year;

        self.name = name;
        self.range = range;
        self.fiscal_year = fiscal_year;

        if let Some(period_type) = update.period_type {
            changed |= period_type != self.period_type;
            self.period_type = period_type;
        }
        if let Some(adjustment) = update.is_adjustment_period {
            changed |= adjustment != self.is_adjustment_period;
            self.is_adjustment_period = adjustment;
        }
        if let Some(description) = update.description {
            changed |= self.description.as_ref() != Some(&description);
            self.description = Some(description);
        }
        if let Some(notes) = update.notes {
            changed |= self.notes.as_ref() != Some(&notes);
            self.notes = Some(notes);
        }

        if changed {
            self.updated_at = Utc::now();
            self.events.push(LedgerEvent::AccountingPeriodUpdated {
                period_id: self.id,
                timestamp: self.updated_at,
            });
        }

        Ok(())
    }

    /// Closes the period
    ///
    /// # Errors
    ///
    /// `LedgerError::PeriodClosed` if already closed
    pub fn close(&mut self) -> Result<(), LedgerError> {
        self.ensure_open()?;
        self.is_closed = true;
        self.updated_at = Utc::now();
        self.events.push(LedgerEvent::AccountingPeriodClosed {
            period_id: self.id,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Reopens a closed period
    ///
    /// # Errors
    ///
    /// `LedgerError::PeriodNotClosed` if the period is open
    pub fn reopen(&mut self) -> Result<(), LedgerError> {
        if !self.is_closed {
            return Err(LedgerError::PeriodNotClosed {
                period_id: self.id.to_string(),
            });
        }
        self.is_closed = false;
        self.updated_at = Utc::now();
        self.events.push(LedgerEvent::AccountingPeriodReopened {
            period_id: self.id,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Inclusive range check
    pub fn is_date_in_period(&self, date: NaiveDate) -> bool {
        self.range.contains(date)
    }

    /// Fails unless the period is open and covers `date`
    pub fn ensure_accepts(&self, date: NaiveDate) -> Result<(), LedgerError> {
        self.ensure_open()?;
        if !self.is_date_in_period(date) {
            return Err(LedgerError::DateOutsidePeriod {
                period_id: self.id.to_string(),
                date,
                start: self.range.start,
                end: self.range.end,
            });
        }
        Ok(())
    }

    /// Fails with `PeriodClosed` when the period is closed
    pub fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.is_closed {
            return Err(LedgerError::PeriodClosed {
                period_id: self.id.to_string(),
            });
        }
        Ok(())
    }

    /// Called by persistence once a save succeeded
    pub fn mark_persisted(&mut self) {
        self.version += 1;
    }

    /// Drains recorded events
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn id(&self) -> AccountingPeriodId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_date(&self) -> NaiveDate {
        self.range.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.range.end
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    pub fn is_adjustment_period(&self) -> bool {
        self.is_adjustment_period
    }

    pub fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }

    pub fn period_type(&self) -> PeriodType {
        self.period_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

fn validate_name(name: &str) -> Result<(), LedgerError> {
    LedgerError::require("name", name)?;
    LedgerError::max_len("name", name, MAX_NAME_LEN)
}

fn validate_fiscal_year(year: i32) -> Result<(), LedgerError> {
    if !(MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&year) {
        return Err(LedgerError::validation(
            "fiscal_year",
            format!("{} is outside {}..={}", year, MIN_FISCAL_YEAR, MAX_FISCAL_YEAR),
        ));
    }
    Ok(())
}
