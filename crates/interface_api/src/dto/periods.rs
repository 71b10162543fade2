//! Accounting period DTOs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_ledger::{AccountingPeriod, LedgerError, NewPeriod, PeriodType, PeriodUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePeriodRequest {
    #[validate(length(min = 1, max = 1024))]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1900, max = 2100))]
    pub fiscal_year: i32,
    pub period_type: String,
    #[serde(default)]
    pub is_adjustment_period: bool,
}

impl CreatePeriodRequest {
    pub fn into_command(self) -> Result<NewPeriod, LedgerError> {
        Ok(NewPeriod {
            period_type: PeriodType::from_str(&self.period_type)?,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
            fiscal_year: self.fiscal_year,
            is_adjustment_period: self.is_adjustment_period,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePeriodRequest {
    #[validate(length(min = 1, max = 1024))]
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 1900, max = 2100))]
    pub fiscal_year: Option<i32>,
    pub period_type: Option<String>,
    pub is_adjustment_period: Option<bool>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePeriodRequest {
    pub fn into_update(self) -> Result<PeriodUpdate, LedgerError> {
        Ok(PeriodUpdate {
            period_type: self.period_type.as_deref().map(PeriodType::from_str).transpose()?,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
            fiscal_year: self.fiscal_year,
            is_adjustment_period: self.is_adjustment_period,
            description: self.description,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PeriodResponse {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fiscal_year: i32,
    pub period_type: PeriodType,
    pub is_closed: bool,
    pub is_adjustment_period: bool,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AccountingPeriod> for PeriodResponse {
    fn from(period: &AccountingPeriod) -> Self {
        Self {
            id: *period.id().as_uuid(),
            name: period.name().to_string(),
            start_date: period.start_date(),
            end_date: period.end_date(),
            fiscal_year: period.fiscal_year(),
            period_type: period.period_type(),
            is_closed: period.is_closed(),
            is_adjustment_period: period.is_adjustment_period(),
            description: period.description().map(str::to_string),
            notes: period.notes().map(str::to_string),
            updated_at: period.updated_at(),
        }
    }
}
