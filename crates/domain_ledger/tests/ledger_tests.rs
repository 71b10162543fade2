//! End-to-end tests for domain_ledger posting

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    AccountId, AccountingPeriodId, JournalEntryId, JournalLineId, PostingBatchId,
    SequentialIdGenerator,
};

use domain_ledger::{
    normal_balance_sign, Account, AccountBook, AccountCategory, AccountingPeriod, BatchStatus,
    EntrySide, JournalEntry, LedgerError, LedgerEvent, LedgerMetric, PeriodType, PostingBatch,
    PostingEngine, PostingPolicy, TrialBalance,
};
use test_utils::InMemoryMetrics;

fn account(category: AccountCategory, code: &str, name: &str) -> Account {
    Account::create(AccountId::new(), category, code, None, name, dec!(0)).unwrap()
}

fn open_period_around(date: NaiveDate) -> Vec<AccountingPeriod> {
    let start = date - chrono::Days::new(15);
    let end = date + chrono::Days::new(15);
    vec![AccountingPeriod::create(
        AccountingPeriodId::new(),
        "Current",
        start,
        end,
        2024,
        PeriodType::Monthly,
    )
    .unwrap()]
}

fn simple_entry(
    reference: &str,
    date: NaiveDate,
    debit_to: AccountId,
    debit: Decimal,
    credit_to: AccountId,
    credit: Decimal,
) -> JournalEntry {
    let mut entry =
        JournalEntry::create(JournalEntryId::new(), date, reference, "", "Manual", None, debit)
            .unwrap();
    entry.add_line(JournalLineId::new(), debit_to, debit, dec!(0), None).unwrap();
    entry.add_line(JournalLineId::new(), credit_to, dec!(0), credit, None).unwrap();
    entry
}

// ============================================================================
// Normal balance rule
// ============================================================================

mod normal_balance {
    use super::*;

    #[test]
    fn test_sign_table() {
        use AccountCategory::*;
        for (category, debit_sign) in [
            (Asset, 1),
            (Expense, 1),
            (Liability, -1),
            (Equity, -1),
            (Revenue, -1),
        ] {
            assert_eq!(normal_balance_sign(category, EntrySide::Debit), debit_sign);
            assert_eq!(normal_balance_sign(category, EntrySide::Credit), -debit_sign);
        }
    }

    #[test]
    fn test_liability_debit_decreases() {
        let mut payable = account(AccountCategory::Liability, "2000", "Accounts Payable");
        payable.credit(dec!(500)).unwrap();
        payable.debit(dec!(200)).unwrap();
        assert_eq!(payable.balance(), dec!(300));
    }
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    struct Books {
        cash: AccountId,
        revenue: AccountId,
        book: AccountBook,
        periods: Vec<AccountingPeriod>,
        ids: SequentialIdGenerator,
        today: NaiveDate,
    }

    fn books() -> Books {
        let today = Utc::now().date_naive();
        let cash = account(AccountCategory::Asset, "1000", "Cash");
        let revenue = account(AccountCategory::Revenue, "4000", "Revenue");
        Books {
            cash: cash.id(),
            revenue: revenue.id(),
            book: vec![cash, revenue].into_iter().collect(),
            periods: open_period_around(today),
            ids: SequentialIdGenerator::new(),
            today,
        }
    }

    #[test]
    fn scenario_a_balanced_entry_posts() {
        let mut b = books();
        let mut entry = simple_entry("JE-001", b.today, b.cash, dec!(1000), b.revenue, dec!(1000));

        let outcome = PostingEngine::default()
            .post_entry(&mut entry, &mut b.book, &b.periods, &b.ids)
            .unwrap();

        assert!(entry.is_posted());
        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(1000));
        assert_eq!(b.book.get(b.revenue).unwrap().balance(), dec!(1000));
        assert_eq!(outcome.ledger_rows.len(), entry.lines().len());
        assert!(TrialBalance::from_rows(&outcome.ledger_rows).is_balanced());
    }

    #[test]
    fn scenario_b_unbalanced_entry_is_rejected() {
        let mut b = books();
        let mut entry = simple_entry("JE-001", b.today, b.cash, dec!(1000), b.revenue, dec!(900));

        let result = PostingEngine::default().post_entry(&mut entry, &mut b.book, &b.periods, &b.ids);

        assert!(matches!(result, Err(LedgerError::UnbalancedEntry { .. })));
        assert!(!entry.is_posted());
        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(0));
        assert_eq!(b.book.get(b.revenue).unwrap().balance(), dec!(0));
    }

    fn posted_batch(b: &mut Books, engine: &PostingEngine) -> PostingBatch {
        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-001", b.today, None, None).unwrap();
        batch
            .add_journal_entry(simple_entry("JE-101", b.today, b.cash, dec!(300), b.revenue, dec!(300)))
            .unwrap();
        batch
            .add_journal_entry(simple_entry("JE-102", b.today, b.cash, dec!(200), b.revenue, dec!(200)))
            .unwrap();
        engine.approve_batch(&mut batch, "controller").unwrap();
        engine
            .post_batch(&mut batch, "clerk", &mut b.book, &b.periods, &b.ids)
            .unwrap();
        batch
    }

    #[test]
    fn scenario_c_approved_batch_posts_every_entry() {
        let mut b = books();
        let batch = posted_batch(&mut b, &PostingEngine::default());

        assert_eq!(batch.status(), BatchStatus::Posted);
        assert!(batch.entries().iter().all(JournalEntry::is_posted));
        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(500));
        assert_eq!(b.book.get(b.revenue).unwrap().balance(), dec!(500));
    }

    #[test]
    fn scenario_d_batch_reversal_is_marker_only() {
        let mut b = books();
        let engine = PostingEngine::default();
        let mut batch = posted_batch(&mut b, &engine);
        batch.take_events();

        engine.reverse_batch(&mut batch, "controller", "data entry error").unwrap();

        assert_eq!(batch.status(), BatchStatus::Reversed);
        let reversed: Vec<_> = batch
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                LedgerEvent::JournalEntryReversed { entry_id, reason, .. } => Some((entry_id, reason)),
                _ => None,
            })
            .collect();
        assert_eq!(reversed.len(), 2);
        assert!(reversed.iter().all(|(_, reason)| reason == "data entry error"));

        // Reversal records the decision; balances stay where posting left them
        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(500));
        assert_eq!(b.book.get(b.revenue).unwrap().balance(), dec!(500));
        assert!(batch.entries().iter().all(|e| e.is_posted() && e.is_reversed()));
    }

    #[test]
    fn test_reversing_entry_restores_balances() {
        let mut b = books();
        let engine = PostingEngine::default();
        let mut entry = simple_entry("JE-200", b.today, b.cash, dec!(750), b.revenue, dec!(750));
        engine.post_entry(&mut entry, &mut b.book, &b.periods, &b.ids).unwrap();

        engine.reverse_entry(&mut entry, b.today, "wrong customer").unwrap();
        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(750));

        let mut offset = entry.reversing_entry(&b.ids, b.today, "JE-200-R").unwrap();
        engine.post_entry(&mut offset, &mut b.book, &b.periods, &b.ids).unwrap();

        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(0));
        assert_eq!(b.book.get(b.revenue).unwrap().balance(), dec!(0));
    }

    #[test]
    fn test_failed_batch_leaves_no_trace() {
        let mut b = books();
        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-002", b.today, None, None).unwrap();
        batch
            .add_journal_entry(simple_entry("JE-301", b.today, b.cash, dec!(100), b.revenue, dec!(100)))
            .unwrap();
        batch
            .add_journal_entry(simple_entry("JE-302", b.today, b.cash, dec!(100), AccountId::new(), dec!(100)))
            .unwrap();
        batch.approve("controller").unwrap();

        let metrics = Arc::new(InMemoryMetrics::new());
        let engine = PostingEngine::new(metrics.clone(), PostingPolicy::default());
        let result = engine.post_batch(&mut batch, "clerk", &mut b.book, &b.periods, &b.ids);

        assert!(matches!(result, Err(LedgerError::NotFound { entity: "Account", .. })));
        assert_eq!(batch.status(), BatchStatus::Draft);
        assert!(batch.entries().iter().all(|e| !e.is_posted()));
        assert_eq!(b.book.get(b.cash).unwrap().balance(), dec!(0));
        assert_eq!(metrics.get(LedgerMetric::PostingFailures), 1);
        assert_eq!(metrics.get(LedgerMetric::EntriesPosted), 0);
    }

    #[test]
    fn test_batch_lifecycle_counters() {
        let mut b = books();
        let mut batch =
            PostingBatch::create(PostingBatchId::new(), "B-003", b.today, None, None).unwrap();
        batch
            .add_journal_entry(simple_entry("JE-303", b.today, b.cash, dec!(100), b.revenue, dec!(100)))
            .unwrap();
        batch
            .add_journal_entry(simple_entry("JE-304", b.today, b.cash, dec!(50), b.revenue, dec!(50)))
            .unwrap();

        let metrics = Arc::new(InMemoryMetrics::new());
        let engine = PostingEngine::new(metrics.clone(), PostingPolicy::default());
        engine.approve_batch(&mut batch, "controller").unwrap();
        engine.post_batch(&mut batch, "clerk", &mut b.book, &b.periods, &b.ids).unwrap();
        engine.reverse_batch(&mut batch, "controller", "duplicate upload").unwrap();

        assert_eq!(metrics.get(LedgerMetric::BatchesApproved), 1);
        assert_eq!(metrics.get(LedgerMetric::BatchesPosted), 1);
        assert_eq!(metrics.get(LedgerMetric::EntriesPosted), 2);
        assert_eq!(metrics.get(LedgerMetric::LedgerRowsWritten), 4);
        assert_eq!(metrics.get(LedgerMetric::EntriesReversed), 2);
        assert_eq!(metrics.get(LedgerMetric::BatchesReversed), 1);
        assert_eq!(metrics.get(LedgerMetric::PostingFailures), 0);
    }

    #[test]
    fn test_closed_period_blocks_until_reopened() {
        let mut b = books();
        let engine = PostingEngine::default();
        b.periods[0].close().unwrap();

        let mut entry = simple_entry("JE-400", b.today, b.cash, dec!(10), b.revenue, dec!(10));
        assert!(matches!(
            engine.post_entry(&mut entry, &mut b.book, &b.periods, &b.ids),
            Err(LedgerError::PeriodClosed { .. })
        ));

        b.periods[0].reopen().unwrap();
        engine.post_entry(&mut entry, &mut b.book, &b.periods, &b.ids).unwrap();
        assert!(entry.is_posted());
    }
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use super::*;

    fn amount() -> impl Strategy<Value = Decimal> {
        (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn category() -> impl Strategy<Value = AccountCategory> {
        prop_oneof![
            Just(AccountCategory::Asset),
            Just(AccountCategory::Liability),
            Just(AccountCategory::Equity),
            Just(AccountCategory::Revenue),
            Just(AccountCategory::Expense),
        ]
    }

    proptest! {
        #[test]
        fn prop_debit_then_credit_is_identity(category in category(), value in amount()) {
            let mut acc = account(category, "9000", "Suspense");
            acc.debit(value).unwrap();
            acc.credit(value).unwrap();
            prop_assert_eq!(acc.balance(), Decimal::ZERO);
        }

        #[test]
        fn prop_posted_rows_always_balance(amounts in prop::collection::vec(amount(), 1..8)) {
            let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
            let cash = account(AccountCategory::Asset, "1000", "Cash");
            let sales = account(AccountCategory::Revenue, "4000", "Sales");
            let (cash_id, sales_id) = (cash.id(), sales.id());
            let mut book: AccountBook = vec![cash, sales].into_iter().collect();
            let periods = open_period_around(today);
            let ids = SequentialIdGenerator::new();
            let engine = PostingEngine::default();

            let mut rows = Vec::new();
            for (i, value) in amounts.iter().enumerate() {
                let mut entry = simple_entry(&format!("JE-{}", i), today, cash_id, *value, sales_id, *value);
                rows.extend(engine.post_entry(&mut entry, &mut book, &periods, &ids).unwrap().ledger_rows);
            }

            let total: Decimal = amounts.iter().copied().sum();
            prop_assert!(TrialBalance::from_rows(&rows).is_balanced());
            prop_assert_eq!(book.get(cash_id).unwrap().balance(), total);
            prop_assert_eq!(book.get(sales_id).unwrap().balance(), total);
        }

        #[test]
        fn prop_off_by_more_than_tolerance_never_posts(value in amount(), gap in 1i64..100_000) {
            let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
            let cash = account(AccountCategory::Asset, "1000", "Cash");
            let sales = account(AccountCategory::Revenue, "4000", "Sales");
            let (cash_id, sales_id) = (cash.id(), sales.id());
            let mut book: AccountBook = vec![cash, sales].into_iter().collect();

            let credit = value + Decimal::new(gap, 2);
            let mut entry = simple_entry("JE-P", today, cash_id, value, sales_id, credit);
            let result = PostingEngine::default().post_entry(
                &mut entry,
                &mut book,
                &open_period_around(today),
                &SequentialIdGenerator::new(),
            );

            prop_assert!(
                matches!(result, Err(LedgerError::UnbalancedEntry { .. })),
                "expected unbalanced entry error"
            );
            prop_assert_eq!(book.get(cash_id).unwrap().balance(), Decimal::ZERO);
        }
    }
}
