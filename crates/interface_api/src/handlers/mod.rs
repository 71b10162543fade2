//! Request handlers, one module per resource

pub mod accounts;
pub mod batches;
pub mod health;
pub mod journal;
pub mod ledger;
pub mod periods;
