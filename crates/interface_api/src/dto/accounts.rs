//! Account DTOs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_ledger::{
    Account, AccountCategory, AccountStatus, AccountUpdate, ClassificationTag, LedgerError,
    NewAccount,
};

use super::parse_classification;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    pub category: String,
    #[validate(length(min = 1, max = 16))]
    pub code: String,
    pub parent_code: Option<String>,
    #[validate(length(min = 1, max = 1024))]
    pub name: String,
    #[serde(default)]
    pub opening_balance: Decimal,
    pub description: Option<String>,
    pub classification: Option<String>,
    #[serde(default)]
    pub is_control_account: bool,
}

impl CreateAccountRequest {
    pub fn into_command(self) -> Result<NewAccount, LedgerError> {
        Ok(NewAccount {
            category: AccountCategory::from_str(&self.category)?,
            classification: parse_classification(self.classification.as_deref())?,
            code: self.code,
            parent_code: self.parent_code,
            name: self.name,
            opening_balance: self.opening_balance,
            description: self.description,
            is_control_account: self.is_control_account,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 1024))]
    pub name: Option<String>,
    pub parent_code: Option<String>,
    pub description: Option<String>,
    pub classification: Option<String>,
    pub is_control_account: Option<bool>,
}

impl UpdateAccountRequest {
    pub fn into_update(self) -> Result<AccountUpdate, LedgerError> {
        Ok(AccountUpdate {
            classification: parse_classification(self.classification.as_deref())?,
            name: self.name,
            parent_code: self.parent_code,
            description: self.description,
            is_control_account: self.is_control_account,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub code: String,
    pub parent_code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: AccountCategory,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub classification: Option<ClassificationTag>,
    pub is_control_account: bool,
    pub level: usize,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: *account.id().as_uuid(),
            code: account.code().to_string(),
            parent_code: account.parent_code().map(str::to_string),
            name: account.name().to_string(),
            description: account.description().map(str::to_string),
            category: account.category(),
            balance: account.balance(),
            status: account.status(),
            classification: account.classification(),
            is_control_account: account.is_control_account(),
            level: account.level(),
            version: account.version(),
            created_at: account.created_at(),
            updated_at: account.updated_at(),
        }
    }
}
