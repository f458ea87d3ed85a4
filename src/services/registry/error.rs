/// 注册表错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid request: {0}")]
    Validation(&'static str),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Instance {address} not found for service {name}")]
    InstanceNotFound { name: String, address: String },

    #[error("Invalid registry configuration: {0}")]
    Config(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::ServiceNotFound(_) | RegistryError::InstanceNotFound { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RegistryError::Validation(_))
    }

    pub(crate) fn instance_not_found(name: &str, address: &str) -> Self {
        RegistryError::InstanceNotFound {
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}
