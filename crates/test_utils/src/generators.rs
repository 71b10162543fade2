//! Property-Based Test Generators
//!
//! Proptest strategies that produce ledger inputs respecting the domain's
//! invariants: positive four-decimal amounts, valid categories and
//! balanced line sets.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_ledger::{AccountCategory, EntrySide};

/// Strategy for account categories
pub fn category_strategy() -> impl Strategy<Value = AccountCategory> {
    prop_oneof![
        Just(AccountCategory::Asset),
        Just(AccountCategory::Liability),
        Just(AccountCategory::Equity),
        Just(AccountCategory::Revenue),
        Just(AccountCategory::Expense),
    ]
}

/// Strategy for debit or credit
pub fn side_strategy() -> impl Strategy<Value = EntrySide> {
    prop_oneof![Just(EntrySide::Debit), Just(EntrySide::Credit)]
}

/// Strategy for positive amounts with up to four decimal places
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64, 0u32..=4u32).prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Strategy for whole-cent amounts between 0.01 and 10,000,000.00
pub fn cent_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for dates in 2024
pub fn date_2024_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..366u64).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|start| start.checked_add_days(Days::new(offset)))
            .unwrap_or(NaiveDate::MIN)
    })
}

/// Strategy for balanced line amounts: debit amounts and credit amounts
/// with equal totals
///
/// The credit side splits the debit total into up to `max_credits` parts.
pub fn balanced_amounts_strategy(
    max_debits: usize,
    max_credits: usize,
) -> impl Strategy<Value = (Vec<Decimal>, Vec<Decimal>)> {
    (
        prop::collection::vec(1i64..10_000_000i64, 1..=max_debits.max(1)),
        1usize..=max_credits.max(1),
    )
        .prop_map(|(debit_cents, credit_parts)| {
            let total: i64 = debit_cents.iter().sum();
            let parts = (credit_parts as i64).min(total).max(1);
            let share = total / parts;
            let mut credits: Vec<Decimal> = (0..parts - 1).map(|_| Decimal::new(share, 2)).collect();
            credits.push(Decimal::new(total - share * (parts - 1), 2));

            let debits = debit_cents.into_iter().map(|c| Decimal::new(c, 2)).collect();
            (debits, credits)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_positive_amounts_are_positive(amount in positive_amount_strategy()) {
            prop_assert!(amount > Decimal::ZERO);
        }

        #[test]
        fn test_balanced_amounts_balance((debits, credits) in balanced_amounts_strategy(4, 3)) {
            let debit_total: Decimal = debits.iter().sum();
            let credit_total: Decimal = credits.iter().sum();
            prop_assert_eq!(debit_total, credit_total);
            prop_assert!(credits.iter().all(|c| *c > Decimal::ZERO));
        }

        #[test]
        fn test_dates_fall_in_2024(date in date_2024_strategy()) {
            prop_assert_eq!(chrono::Datelike::year(&date), 2024);
        }
    }
}
