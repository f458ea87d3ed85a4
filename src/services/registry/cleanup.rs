use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};

use super::service::ServiceRegistry;

impl ServiceRegistry {
    // 启动租约清理任务，周期等于租约时长
    pub(super) fn start_cleanup_task(&self) {
        // 只持有弱引用，所有句柄释放后任务自行退出
        let registry = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        let lease = self.inner.lease_duration;

        self.inner.task_tracker.spawn(async move {
            let Some(start) = Instant::now().checked_add(lease) else {
                tracing::error!(
                    lease_secs = lease.as_secs(),
                    "Lease duration out of range, lease sweeper not started"
                );
                return;
            };
            let mut interval = tokio::time::interval_at(start, lease);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let Some(inner) = registry.upgrade() else {
                    break;
                };
                tracing::debug!("Executing service lease expiration check...");
                ServiceRegistry { inner }.cleanup_expired_services();
            }

            tracing::debug!("Lease sweeper exited");
        });
    }

    /// 清理过期实例，返回本轮实际删除的数量
    pub(crate) fn cleanup_expired_services(&self) -> usize {
        let expired = self.collect_expired(Instant::now());
        let evicted = self.evict_expired(expired);

        if evicted > 0 {
            tracing::info!(evicted_count = evicted, "Lease expiration check completed");
        } else {
            tracing::debug!(evicted_count = evicted, "Lease expiration check completed");
        }

        evicted
    }

    // 从快照中找出在 `now` 时已过期的 (服务名, 地址)
    fn collect_expired(&self, now: Instant) -> Vec<(String, String)> {
        let lease = self.inner.lease_duration;
        self.fetch_all()
            .into_values()
            .flatten()
            .filter(|instance| instance.is_expired(lease, now))
            .map(|instance| (instance.name, instance.address))
            .collect()
    }

    /// 逐个走注销路径删除候选实例
    ///
    /// 删除前在锁内重新检查是否过期，期间被续约的实例会保留，
    /// 已被外部注销的实例按未找到忽略。
    fn evict_expired(&self, expired: Vec<(String, String)>) -> usize {
        let lease = self.inner.lease_duration;
        let mut evicted = 0;

        for (name, address) in expired {
            match self.remove_instance(&name, &address, |instance| {
                instance.is_expired(lease, Instant::now())
            }) {
                Ok(true) => {
                    evicted += 1;
                    tracing::warn!(
                        service_name = %name,
                        address = %address,
                        lease_ms = lease.as_millis() as u64,
                        "Service instance expired due to missing renewal, removed from registry"
                    );
                }
                Ok(false) => {
                    tracing::debug!(
                        service_name = %name,
                        address = %address,
                        "Service instance renewed before eviction, keeping it"
                    );
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        service_name = %name,
                        address = %address,
                        "Service instance already removed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        service_name = %name,
                        address = %address,
                        error = %e,
                        "Failed to remove expired service instance"
                    );
                }
            }
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const LEASE: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_only_expired() {
        let registry = ServiceRegistry::create(LEASE).unwrap();
        registry.close();

        registry.register("OLD", "A1").unwrap();
        registry.register("MIXED", "A1").unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;
        registry.register("MIXED", "A2").unwrap();

        assert_eq!(registry.cleanup_expired_services(), 2);

        let snapshot = registry.fetch_all();
        assert!(!snapshot.contains_key("OLD"));
        assert_eq!(snapshot["MIXED"].len(), 1);
        assert_eq!(snapshot["MIXED"][0].address, "A2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_at_exact_boundary_keeps_instance() {
        let registry = ServiceRegistry::create(LEASE).unwrap();
        registry.close();

        registry.register("TEST", "A1").unwrap();
        tokio::time::advance(LEASE).await;

        assert_eq!(registry.cleanup_expired_services(), 0);
        assert_eq!(registry.stats().instances, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_ignores_instance_removed_after_snapshot() {
        let registry = ServiceRegistry::create(LEASE).unwrap();
        registry.close();

        registry.register("TEST", "A1").unwrap();
        registry.register("TEST", "A2").unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;

        let expired = registry.collect_expired(Instant::now());
        assert_eq!(expired.len(), 2);

        // 快照之后被显式注销：A1 所在服务仍存在，返回实例未找到
        registry.unregister("TEST", "A1").unwrap();
        assert_eq!(registry.evict_expired(expired.clone()), 1);
        assert!(registry.fetch_all().is_empty());

        // 服务名也已删除时同样忽略
        assert_eq!(registry.evict_expired(expired), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_keeps_instance_renewed_after_snapshot() {
        let registry = ServiceRegistry::create(LEASE).unwrap();
        registry.close();

        registry.register("TEST", "A1").unwrap();
        tokio::time::advance(Duration::from_millis(1500)).await;

        let expired = registry.collect_expired(Instant::now());
        registry.renew("TEST", "A1").unwrap();

        assert_eq!(registry.evict_expired(expired), 0);
        assert_eq!(registry.stats().instances, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_after_last_handle_dropped() {
        let registry = ServiceRegistry::create(LEASE).unwrap();
        let tracker = registry.inner.task_tracker.clone();
        drop(registry);

        tracker.close();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("sweeper should exit once the registry is dropped");
    }
}
