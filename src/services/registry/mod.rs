//! Service registry module
//!
//! This module contains the lease-based service registry split into logical components:
//! - `types`: Instance records and snapshot types
//! - `error`: Registry error taxonomy
//! - `selector`: Load-balancing selection strategies
//! - `service`: Concurrent registry store and lifecycle
//! - `cleanup`: Background lease sweeper
//! - `discovery`: Transport-facing discovery trait

mod cleanup;
pub mod discovery;
pub mod error;
pub mod selector;
pub mod service;
pub mod types;

// Re-export public types for easier access
pub use discovery::Discovery;
pub use error::RegistryError;
pub use selector::{RandomSelector, RoundRobinSelector, Selector};
pub use service::ServiceRegistry;
pub use types::{
    InstanceRecord, MAX_LEASE_DURATION, RegistryStats, ServiceInstances, ServiceSnapshot,
};
