//! service-core: shared infrastructure for the DistriFin services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
