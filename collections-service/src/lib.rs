//! DistriFin collections service: field payment recording, cheque
//! reconciliation against bank statements, and the double-entry ledger.

pub mod config;
pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
