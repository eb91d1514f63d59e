//! Pure domain logic. Nothing in here touches the store or the network.

pub mod access;
pub mod csv_support;
pub mod import;
pub mod ledger;
pub mod reconciliation;
pub mod recording;
pub mod reports;
pub mod statement;
