//! Chart-of-accounts entries and the normal-balance sign rule
//!
//! An account's balance only ever moves through [`Account::debit`] and
//! [`Account::credit`]. Which direction a movement pushes the balance
//! depends on the account category:
//!
//! | Category  | Debit | Credit |
//! |-----------|-------|--------|
//! | Asset     |  +    |   -    |
//! | Expense   |  +    |   -    |
//! | Liability |  -    |   +    |
//! | Equity    |  -    |   +    |
//! | Revenue   |  -    |   +    |

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::money::checked_add;
use core_kernel::{AccountId, PositiveAmount};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::general_ledger::ClassificationTag;

/// Maximum length of an account code
pub const MAX_ACCOUNT_CODE_LEN: usize = 16;

/// Category of an account in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountCategory {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountCategory {
    /// Returns the side that increases accounts of this category
    pub fn normal_side(&self) -> EntrySide {
        match self {
            AccountCategory::Asset | AccountCategory::Expense => EntrySide::Debit,
            AccountCategory::Liability | AccountCategory::Equity | AccountCategory::Revenue => {
                EntrySide::Credit
            }
        }
    }

    /// Returns true if this category has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        self.normal_side() == EntrySide::Debit
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Asset => "Asset",
            AccountCategory::Liability => "Liability",
            AccountCategory::Equity => "Equity",
            AccountCategory::Revenue => "Revenue",
            AccountCategory::Expense => "Expense",
        }
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asset" => Ok(AccountCategory::Asset),
            "liability" => Ok(AccountCategory::Liability),
            "equity" => Ok(AccountCategory::Equity),
            "revenue" => Ok(AccountCategory::Revenue),
            "expense" => Ok(AccountCategory::Expense),
            other => Err(LedgerError::validation(
                "category",
                format!("unknown account category '{}'", other),
            )),
        }
    }
}

/// Side of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    /// Returns the other side
    pub fn opposite(&self) -> EntrySide {
        match self {
            EntrySide::Debit => EntrySide::Credit,
            EntrySide::Credit => EntrySide::Debit,
        }
    }
}

impl fmt::Display for EntrySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySide::Debit => f.write_str("Debit"),
            EntrySide::Credit => f.write_str("Credit"),
        }
    }
}

/// Returns `+1` when a movement on `side` increases an account of
/// `category`, `-1` when it decreases it
pub fn normal_balance_sign(category: AccountCategory, side: EntrySide) -> i8 {
    if category.normal_side() == side {
        1
    } else {
        -1
    }
}

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// Changes to an account's descriptive fields
///
/// `None` leaves a field unchanged. Category and balance are not
/// updatable here.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub parent_code: Option<String>,
    pub description: Option<String>,
    pub classification: Option<ClassificationTag>,
    pub is_control_account: Option<bool>,
}

/// An account in the chart of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    category: AccountCategory,
    code: String,
    parent_code: Option<String>,
    name: String,
    description: Option<String>,
    balance: Decimal,
    status: AccountStatus,
    /// Default classification for ledger rows posted to this account
    classification: Option<ClassificationTag>,
    is_control_account: bool,
    /// Persistence version, used for optimistic concurrency
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl Account {
    /// Creates a new active account
    ///
    /// # Arguments
    ///
    /// * `id` - Identity supplied by the caller's id generator
    /// * `category` - Account category, which fixes the sign rule
    /// * `code` - Account code, at most 16 characters
    /// * `parent_code` - Optional code of the parent account
    /// * `name` - Display name
    /// * `opening_balance` - Balance the account starts with
    ///
    /// # Errors
    ///
    /// Returns a validation error when the code or name is blank or the code is too long
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cash = Account::create(AccountId::new_v7(), AccountCategory::Asset, "1000", None, "Cash", dec!(0))?;
    /// ```
    pub fn create(
        id: AccountId,
        category: AccountCategory,
        code: impl Into<String>,
        parent_code: Option<String>,
        name: impl Into<String>,
        opening_balance: Decimal,
    ) -> Result<Self, LedgerError> {
        let code = code.into().trim().to_string();
        let name = name.into().trim().to_string();
        LedgerError::require("code", &code)?;
        LedgerError::max_len("code", &code, MAX_ACCOUNT_CODE_LEN)?;
        LedgerError::require("name", &name)?;
        let parent_code = normalize_parent_code(parent_code);

        let now = Utc::now();
        let mut account = Self {
            id,
            category,
            code,
            parent_code,
            name,
            description: None,
            balance: opening_balance,
            status: AccountStatus::Active,
            classification: None,
            is_control_account: false,
            version: 0,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };

        account.events.push(LedgerEvent::AccountCreated {
            account_id: id,
            code: account.code.clone(),
            name: account.name.clone(),
            category,
            opening_balance,
            timestamp: now,
        });

        Ok(account)
    }

    /// Sets the default classification tag used for this account's ledger rows
    pub fn with_classification(mut self, classification: ClassificationTag) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the account as a control account, which refuses direct postings
    pub fn as_control_account(mut self) -> Self {
        self.is_control_account = true;
        self
    }

    /// Applies a debit
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Amount` if `amount <= 0`
    pub fn debit(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.apply(EntrySide::Debit, amount)
    }

    /// Applies a credit
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Amount` if `amount <= 0`
    pub fn credit(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.apply(EntrySide::Credit, amount)
    }

    /// Applies a movement on `side` and returns the new balance
    pub fn apply(&mut self, side: EntrySide, amount: Decimal) -> Result<Decimal, LedgerError> {
        let amount = PositiveAmount::new(amount)?.value();
        let change = match normal_balance_sign(self.category, side) {
            1 => amount,
            _ => -amount,
        };

        let old_balance = self.balance;
        self.balance = checked_add(old_balance, change)?;
        self.updated_at = Utc::now();

        self.events.push(LedgerEvent::AccountBalanceChanged {
            account_id: self.id,
            old_balance,
            new_balance: self.balance,
            amount,
            side,
            timestamp: self.updated_at,
        });

        Ok(self.balance)
    }

    /// Activates the account; no-op when already active
    pub fn activate(&mut self) {
        self.set_status(AccountStatus::Active);
    }

    /// Deactivates the account; no-op when already inactive
    pub fn deactivate(&mut self) {
        self.set_status(AccountStatus::Inactive);
    }

    fn set_status(&mut self, status: AccountStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.updated_at = Utc::now();
        self.events.push(LedgerEvent::AccountStatusChanged {
            account_id: self.id,
            status,
            timestamp: self.updated_at,
        });
    }

    /// Updates descriptive fields, emitting `AccountUpdated` only if something changed
    pub fn update(&mut self, update: AccountUpdate) -> Result<(), LedgerError> {
        let mut changed = Vec::new();

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            LedgerError::require("name", &name)?;
            if name != self.name {
                self.name = name;
                changed.push("name".to_string());
            }
        }

        if let Some(parent_code) = update.parent_code {
            let parent_code = normalize_parent_code(Some(parent_code));
            if parent_code != self.parent_code {
                self.parent_code = parent_code;
                changed.push("parent_code".to_string());
            }
        }

        if let Some(description) = update.description {
            if self.description.as_deref() != Some(description.as_str()) {
                self.description = Some(description);
                changed.push("description".to_string());
            }
        }

        if let Some(classification) = update.classification {
            if self.classification != Some(classification) {
                self.classification = Some(classification);
                changed.push("classification".to_string());
            }
        }

        if let Some(is_control) = update.is_control_account {
            if self.is_control_account != is_control {
                self.is_control_account = is_control;
                changed.push("is_control_account".to_string());
            }
        }

        if !changed.is_empty() {
            self.updated_at = Utc::now();
            self.events.push(LedgerEvent::AccountUpdated {
                account_id: self.id,
                changed_fields: changed,
                timestamp: self.updated_at,
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

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn category(&self) -> AccountCategory {
        self.category
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn parent_code(&self) -> Option<&str> {
        self.parent_code.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn classification(&self) -> Option<ClassificationTag> {
        self.classification
    }

    pub fn is_control_account(&self) -> bool {
        self.is_control_account
    }

    /// Control accounts only receive postings through their sub-accounts
    pub fn allows_direct_posting(&self) -> bool {
        !self.is_control_account
    }

    /// Depth in the account hierarchy: 1 for a root, parent segments + 1 otherwise
    pub fn level(&self) -> usize {
        match &self.parent_code {
            Some(parent) => parent.split('.').count() + 1,
            None => 1,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn normalize_parent_code(parent_code: Option<String>) -> Option<String> {
    parent_code
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}
