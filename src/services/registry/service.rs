use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::error::RegistryError;
use super::selector::{RandomSelector, Selector};
use super::types::{
    InstanceRecord, MAX_LEASE_DURATION, RegistryStats, ServiceInstances, ServiceSnapshot,
};

// 注册表内部状态，由所有句柄共享
#[derive(Debug)]
pub(super) struct RegistryInner {
    // 服务名 -> 实例集合
    pub(super) services: DashMap<String, ServiceInstances>,
    pub(super) lease_duration: Duration,
    pub(super) selector: Arc<dyn Selector>,
    pub(super) shutdown: CancellationToken,
    pub(super) task_tracker: TaskTracker,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        // 最后一个句柄释放时停止清理任务
        self.shutdown.cancel();
    }
}

/// 服务注册表
///
/// 克隆开销很小，所有克隆共享同一份状态。每个服务名的实例集合
/// 只在该键的分片锁内修改，因此同名下的并发注册、注销与租约清理
/// 彼此串行，不同服务名之间互不阻塞。
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    pub(super) inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    /// 以固定租约时长创建注册表并启动租约清理任务
    ///
    /// 必须在 Tokio 运行时内调用。
    pub fn create(lease_duration: Duration) -> Result<Self, RegistryError> {
        Self::create_with_selector(lease_duration, Arc::new(RandomSelector::new()))
    }

    pub fn create_with_selector(
        lease_duration: Duration,
        selector: Arc<dyn Selector>,
    ) -> Result<Self, RegistryError> {
        if lease_duration.is_zero() {
            return Err(RegistryError::Config(
                "lease duration must be greater than zero".to_string(),
            ));
        }
        if lease_duration > MAX_LEASE_DURATION
            || Instant::now().checked_add(lease_duration).is_none()
        {
            return Err(RegistryError::Config(format!(
                "lease duration must not exceed {}s",
                MAX_LEASE_DURATION.as_secs()
            )));
        }

        let registry = Self {
            inner: Arc::new(RegistryInner {
                services: DashMap::new(),
                lease_duration,
                selector,
                shutdown: CancellationToken::new(),
                task_tracker: TaskTracker::new(),
            }),
        };

        registry.start_cleanup_task();

        tracing::info!(
            lease_ms = lease_duration.as_millis() as u64,
            "Service registry created"
        );

        Ok(registry)
    }

    pub fn lease_duration(&self) -> Duration {
        self.inner.lease_duration
    }

    // 注册实例；已存在时只刷新续约时间
    pub fn register(&self, name: &str, address: &str) -> Result<(), RegistryError> {
        if name.is_empty() || address.is_empty() {
            return Err(RegistryError::Validation("name and address are mandatory"));
        }

        let now = Instant::now();
        let mut instances = self.inner.services.entry(name.to_string()).or_default();

        match instances.get_mut(address) {
            Some(instance) => {
                instance.renew(now);
                tracing::debug!(
                    service_name = %name,
                    address = %address,
                    "Refreshed existing service instance"
                );
            }
            None => {
                instances.insert(address.to_string(), InstanceRecord::new(name, address, now));
                tracing::info!(
                    service_name = %name,
                    address = %address,
                    "Registering service instance"
                );
            }
        }

        Ok(())
    }

    // 续约；服务名或地址不存在时都返回未找到
    pub fn renew(&self, name: &str, address: &str) -> Result<(), RegistryError> {
        let mut instances = self
            .inner
            .services
            .get_mut(name)
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))?;

        let instance = instances
            .get_mut(address)
            .ok_or_else(|| RegistryError::instance_not_found(name, address))?;
        instance.renew(Instant::now());

        tracing::debug!(service_name = %name, address = %address, "Renewed service instance");
        Ok(())
    }

    // 从未过期的实例中挑选一个
    pub fn fetch(&self, name: &str) -> Result<InstanceRecord, RegistryError> {
        let not_found = || RegistryError::ServiceNotFound(name.to_string());

        if name.is_empty() {
            return Err(not_found());
        }

        let instances = self.inner.services.get(name).ok_or_else(not_found)?;
        let now = Instant::now();
        let live: Vec<&InstanceRecord> = instances
            .values()
            .filter(|instance| !instance.is_expired(self.inner.lease_duration, now))
            .collect();

        let index = self.inner.selector.select(live.len()).ok_or_else(not_found)?;
        let instance = live.get(index).copied().ok_or_else(not_found)?;

        tracing::debug!(
            service_name = %name,
            address = %instance.address,
            candidates = live.len(),
            "Selected service instance"
        );

        Ok(instance.clone())
    }

    // 返回所有服务的快照，调用方无需持有任何锁
    pub fn fetch_all(&self) -> ServiceSnapshot {
        self.inner
            .services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().values().cloned().collect()))
            .collect()
    }

    pub fn unregister(&self, name: &str, address: &str) -> Result<(), RegistryError> {
        self.remove_instance(name, address, |_| true).map(|_| ())
    }

    /// 注销与租约清理共用的删除路径
    ///
    /// `should_remove` 在该服务名的锁内执行；返回 `false` 时保留实例并返回
    /// `Ok(false)`。最后一个实例被删除时同时删除服务名条目。
    pub(super) fn remove_instance<F>(
        &self,
        name: &str,
        address: &str,
        should_remove: F,
    ) -> Result<bool, RegistryError>
    where
        F: FnOnce(&InstanceRecord) -> bool,
    {
        match self.inner.services.entry(name.to_string()) {
            Entry::Vacant(_) => Err(RegistryError::ServiceNotFound(name.to_string())),
            Entry::Occupied(mut entry) => {
                let instances = entry.get_mut();

                let Some(instance) = instances.get(address) else {
                    return Err(RegistryError::instance_not_found(name, address));
                };
                if !should_remove(instance) {
                    return Ok(false);
                }

                instances.remove(address);
                tracing::info!(service_name = %name, address = %address, "Removed service instance");

                if instances.is_empty() {
                    entry.remove();
                    tracing::info!(service_name = %name, "Removed service with no remaining instances");
                }

                Ok(true)
            }
        }
    }

    pub fn stats(&self) -> RegistryStats {
        self.inner
            .services
            .iter()
            .fold(RegistryStats::default(), |mut stats, entry| {
                stats.services += 1;
                stats.instances += entry.value().len();
                stats
            })
    }

    /// 停止租约清理任务，可重复调用
    ///
    /// 返回后不会再开始新的清理周期；注册表本身仍可继续使用。
    pub fn close(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.task_tracker.close();
        tracing::info!("Service registry closed, lease sweeper stopping");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    // 关闭并等待清理任务退出
    pub async fn shutdown(&self) {
        self.close();
        self.inner.task_tracker.wait().await;
        tracing::debug!("Lease sweeper terminated");
    }
}
