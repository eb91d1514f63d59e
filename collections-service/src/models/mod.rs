//! Domain records persisted in the document store.

pub mod audit;
pub mod collection;
pub mod customer;
pub mod ledger;
pub mod route;
pub mod settings;
pub mod statement;
pub mod user;

pub use audit::{AuditAction, AuditLog};
pub use collection::{ChequeDetails, Collection, CollectionStatus, PaymentType};
pub use customer::{Customer, CustomerInput, CustomerStatus};
pub use ledger::{Account, LedgerEntry, LedgerPostingKind, LEDGER_SCHEMA_VERSION};
pub use route::{Route, RouteInput, RouteStatus};
pub use settings::GlobalSettings;
pub use statement::{BankStatementEntry, BankStatus};
pub use user::{User, UserInput, UserRole};
