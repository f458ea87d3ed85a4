pub mod registry;
pub mod router;

pub use registry::{Discovery, InstanceRecord, RegistryError, ServiceRegistry};
pub use router::DiscoveryRouter;
