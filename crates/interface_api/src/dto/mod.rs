//! Request and response bodies
//!
//! Requests carry enum values as strings so unknown categories, period
//! types and classification tags surface as ledger validation errors.

pub mod accounts;
pub mod batches;
pub mod journal;
pub mod ledger;
pub mod periods;

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use domain_ledger::{ClassificationTag, LedgerError};

pub(crate) fn parse_classification(value: Option<&str>) -> Result<Option<ClassificationTag>, LedgerError> {
    value.map(ClassificationTag::from_str).transpose()
}

/// Reads an explicit `null` as `Some(None)`; pair with `#[serde(default)]`
/// so an absent field stays `None`
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
