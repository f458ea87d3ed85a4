use std::time::Duration;

use super::error::RegistryError;
use super::service::ServiceRegistry;
use super::types::{InstanceRecord, ServiceSnapshot};

/// 服务发现接口，传输层只依赖该抽象
pub trait Discovery: Send + Sync + std::fmt::Debug + 'static {
    fn register(&self, name: &str, address: &str) -> Result<(), RegistryError>;
    fn renew(&self, name: &str, address: &str) -> Result<(), RegistryError>;
    fn fetch(&self, name: &str) -> Result<InstanceRecord, RegistryError>;
    fn fetch_all(&self) -> ServiceSnapshot;
    fn unregister(&self, name: &str, address: &str) -> Result<(), RegistryError>;
    fn lease_duration(&self) -> Duration;
    fn close(&self);
}

impl Discovery for ServiceRegistry {
    fn register(&self, name: &str, address: &str) -> Result<(), RegistryError> {
        ServiceRegistry::register(self, name, address)
    }

    fn renew(&self, name: &str, address: &str) -> Result<(), RegistryError> {
        ServiceRegistry::renew(self, name, address)
    }

    fn fetch(&self, name: &str) -> Result<InstanceRecord, RegistryError> {
        ServiceRegistry::fetch(self, name)
    }

    fn fetch_all(&self) -> ServiceSnapshot {
        ServiceRegistry::fetch_all(self)
    }

    fn unregister(&self, name: &str, address: &str) -> Result<(), RegistryError> {
        ServiceRegistry::unregister(self, name, address)
    }

    fn lease_duration(&self) -> Duration {
        ServiceRegistry::lease_duration(self)
    }

    fn close(&self) {
        ServiceRegistry::close(self)
    }
}
