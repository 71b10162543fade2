//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for ledger tests: calendar dates in fiscal
//! year 2024, a small chart of accounts and a [`TestLedger`] that wires a
//! [`LedgerService`] to an in-memory store with observable events and
//! metrics.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::SequentialIdGenerator;
use domain_ledger::{
    Account, AccountCategory, AccountingPeriod, InMemoryEventSink, LedgerService, NewAccount,
    NewPeriod, PeriodType, PostingEngine, PostingPolicy,
};
use infra_db::InMemoryLedgerStore;

use crate::metrics::InMemoryMetrics;

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    pub fn jan_1() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Mid-month posting date used by most scenarios
    pub fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    pub fn jan_31() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    pub fn feb_1() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    pub fn feb_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
    }

    pub fn feb_29() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    }

    pub fn mar_31() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    pub fn dec_31() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    /// A date no fixture period covers
    pub fn uncovered() -> NaiveDate {
        NaiveDate::from_ymd_opt(2031, 6, 1).unwrap()
    }
}

/// Fixture for accounting period commands
pub struct PeriodFixtures;

impl PeriodFixtures {
    pub fn january() -> NewPeriod {
        NewPeriod {
            name: "January 2024".to_string(),
            start_date: DateFixtures::jan_1(),
            end_date: DateFixtures::jan_31(),
            fiscal_year: 2024,
            period_type: PeriodType::Monthly,
            is_adjustment_period: false,
        }
    }

    pub fn february() -> NewPeriod {
        NewPeriod {
            name: "February 2024".to_string(),
            start_date: DateFixtures::feb_1(),
            end_date: DateFixtures::feb_29(),
            fiscal_year: 2024,
            period_type: PeriodType::Monthly,
            is_adjustment_period: false,
        }
    }

    pub fn first_quarter() -> NewPeriod {
        NewPeriod {
            name: "Q1 2024".to_string(),
            start_date: DateFixtures::jan_1(),
            end_date: DateFixtures::mar_31(),
            fiscal_year: 2024,
            period_type: PeriodType::Quarterly,
            is_adjustment_period: false,
        }
    }

    pub fn fiscal_year() -> NewPeriod {
        NewPeriod {
            name: "FY2024".to_string(),
            start_date: DateFixtures::jan_1(),
            end_date: DateFixtures::dec_31(),
            fiscal_year: 2024,
            period_type: PeriodType::Yearly,
            is_adjustment_period: false,
        }
    }

    pub fn year_end_adjustment() -> NewPeriod {
        NewPeriod {
            name: "FY2024 Adjustments".to_string(),
            start_date: DateFixtures::jan_1(),
            end_date: DateFixtures::dec_31(),
            fiscal_year: 2024,
            period_type: PeriodType::Yearly,
            is_adjustment_period: true,
        }
    }
}

/// Fixture for account commands
pub struct AccountFixtures;

impl AccountFixtures {
    fn account(category: AccountCategory, code: &str, name: &str) -> NewAccount {
        NewAccount {
            category,
            code: code.to_string(),
            parent_code: None,
            name: name.to_string(),
            opening_balance: dec!(0),
            description: None,
            classification: None,
            is_control_account: false,
        }
    }

    pub fn cash() -> NewAccount {
        Self::account(AccountCategory::Asset, "1000", "Cash")
    }

    pub fn receivables() -> NewAccount {
        Self::account(AccountCategory::Asset, "1100", "Accounts Receivable")
    }

    pub fn payables() -> NewAccount {
        Self::account(AccountCategory::Liability, "2000", "Accounts Payable")
    }

    pub fn capital() -> NewAccount {
        Self::account(AccountCategory::Equity, "3000", "Owner Capital")
    }

    pub fn sales() -> NewAccount {
        Self::account(AccountCategory::Revenue, "4000", "Sales Revenue")
    }

    pub fn rent() -> NewAccount {
        Self::account(AccountCategory::Expense, "5000", "Rent Expense")
    }

    /// Control account that only accepts postings through its children
    pub fn current_assets() -> NewAccount {
        NewAccount {
            is_control_account: true,
            ..Self::account(AccountCategory::Asset, "1", "Current Assets")
        }
    }
}

/// A ledger service over an in-memory store with observable side effects
pub struct TestLedger {
    pub service: LedgerService,
    pub store: InMemoryLedgerStore,
    pub events: Arc<InMemoryEventSink>,
    pub metrics: Arc<InMemoryMetrics>,
}

impl TestLedger {
    pub fn new() -> Self {
        Self::with_policy(PostingPolicy::default())
    }

    pub fn with_policy(policy: PostingPolicy) -> Self {
        let store = InMemoryLedgerStore::new();
        let events = Arc::new(InMemoryEventSink::new());
        let metrics = Arc::new(InMemoryMetrics::new());
        let service = LedgerService::new(
            Arc::new(store.clone()),
            PostingEngine::new(metrics.clone(), policy),
            Arc::new(SequentialIdGenerator::new()),
            events.clone(),
        );

        Self {
            service,
            store,
            events,
            metrics,
        }
    }

    /// Opens cash, payables and sales plus the January period
    pub async fn seeded() -> (Self, SeededLedger) {
        let ledger = Self::new();
        let seeded = SeededLedger {
            cash: ledger.service.open_account(AccountFixtures::cash()).await.unwrap(),
            payables: ledger.service.open_account(AccountFixtures::payables()).await.unwrap(),
            sales: ledger.service.open_account(AccountFixtures::sales()).await.unwrap(),
            january: ledger.service.create_period(PeriodFixtures::january()).await.unwrap(),
        };
        (ledger, seeded)
    }
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates created by [`TestLedger::seeded`]
#[derive(Debug, Clone)]
pub struct SeededLedger {
    pub cash: Account,
    pub payables: Account,
    pub sales: Account,
    pub january: AccountingPeriod,
}
