use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

/// 允许的最大租约时长（10 年）
pub const MAX_LEASE_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

// 服务实例记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub name: String,
    pub address: String,
    pub last_renewal: Instant,
    pub registered_at: Instant,
}

impl InstanceRecord {
    pub(crate) fn new(name: &str, address: &str, now: Instant) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            last_renewal: now,
            registered_at: now,
        }
    }

    pub(crate) fn renew(&mut self, now: Instant) {
        self.last_renewal = now;
    }

    /// 租约到期时刻：`last_renewal + lease`，超出时钟范围时为 `None`
    pub fn expires_at(&self, lease: Duration) -> Option<Instant> {
        self.last_renewal.checked_add(lease)
    }

    /// 当前时间严格越过租约边界时视为过期
    pub fn is_expired(&self, lease: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_renewal) > lease
    }
}

// 单个服务名下的实例集合（地址 -> 实例），按地址有序
pub type ServiceInstances = BTreeMap<String, InstanceRecord>;

// fetch_all 返回的快照（服务名 -> 实例列表）
pub type ServiceSnapshot = BTreeMap<String, Vec<InstanceRecord>>;

// 注册表统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub services: usize,
    pub instances: usize,
}
