//! Custom Test Assertions
//!
//! Assertion helpers for ledger types with messages that show the numbers
//! involved.

use rust_decimal::Decimal;

use core_kernel::BALANCE_TOLERANCE;
use domain_ledger::{
    Account, ErrorKind, GeneralLedgerRow, InMemoryEventSink, LedgerError, TrialBalance,
};

/// Asserts an account's balance
pub fn assert_balance(account: &Account, expected: Decimal) {
    assert_eq!(
        account.balance(),
        expected,
        "Account {} ({}) has balance {}, expected {}",
        account.code(),
        account.id(),
        account.balance(),
        expected
    );
}

/// Asserts that the rows' debits equal their credits within tolerance
pub fn assert_rows_balanced(rows: &[GeneralLedgerRow]) {
    let debits: Decimal = rows.iter().map(GeneralLedgerRow::debit).sum();
    let credits: Decimal = rows.iter().map(GeneralLedgerRow::credit).sum();
    assert!(
        (debits - credits).abs() < BALANCE_TOLERANCE,
        "Ledger rows are unbalanced: debits={}, credits={}",
        debits,
        credits
    );
}

/// Asserts a ledger-wide trial balance
pub fn assert_trial_balanced(trial: &TrialBalance) {
    assert!(
        trial.is_balanced(),
        "Trial balance is off: debits={}, credits={}",
        trial.total_debits,
        trial.total_credits
    );
}

/// Asserts that a result failed with the given error kind
pub fn assert_error_kind<T: std::fmt::Debug>(result: Result<T, LedgerError>, expected: ErrorKind) -> LedgerError {
    match result {
        Ok(value) => panic!("Expected {:?} error, got Ok({:?})", expected, value),
        Err(error) => {
            assert_eq!(
                error.kind(),
                expected,
                "Expected {:?} error, got {:?}: {}",
                expected,
                error.kind(),
                error
            );
            error
        }
    }
}

/// Asserts that `expected` appears in the published event stream in order
///
/// Other events may be interleaved.
pub fn assert_events_in_order(sink: &InMemoryEventSink, expected: &[&str]) {
    let published = sink.event_types();
    let mut remaining = expected.iter().peekable();
    for event_type in &published {
        if remaining.peek().is_some_and(|next| *next == event_type) {
            remaining.next();
        }
    }
    let missing: Vec<&&str> = remaining.collect();
    assert!(
        missing.is_empty(),
        "Events {:?} not published in order; published: {:?}",
        missing,
        published
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::AccountId;
    use domain_ledger::AccountCategory;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_balance() {
        let mut cash =
            Account::create(AccountId::new(), AccountCategory::Asset, "1000", None, "Cash", dec!(0)).unwrap();
        cash.debit(dec!(40)).unwrap();
        assert_balance(&cash, dec!(40));
    }

    #[test]
    #[should_panic(expected = "Expected NotFound error")]
    fn test_assert_error_kind_on_ok() {
        assert_error_kind(Ok::<u8, LedgerError>(1), ErrorKind::NotFound);
    }

    #[test]
    fn test_assert_error_kind_returns_error() {
        let error = assert_error_kind(
            Err::<(), _>(LedgerError::not_found("Account", "ACC-1")),
            ErrorKind::NotFound,
        );
        assert!(error.to_string().contains("ACC-1"));
    }

    #[test]
    fn test_events_in_order_allows_gaps() {
        let sink = InMemoryEventSink::new();
        assert_events_in_order(&sink, &[]);
    }
}
