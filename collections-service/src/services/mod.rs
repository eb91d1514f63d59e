pub mod admin;
pub mod audit;
pub mod collections;
pub mod database;
pub mod error;
pub mod extraction;
pub mod identity;
pub mod memory;
pub mod metrics;
pub mod reconciliation;
pub mod session;
pub mod store;

pub use admin::AdminService;
pub use collections::CollectionService;
pub use database::MongoStore;
pub use extraction::{ChequeExtractor, ChequeScanner, GeminiConfig, GeminiExtractor, MockExtractor};
pub use identity::{IdentityConfig, IdentityProvider, IdentityToolkitClient};
pub use memory::InMemoryStore;
pub use reconciliation::ReconciliationService;
pub use session::SessionService;
pub use store::{ChangeEvent, DataStore};
