use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 负载均衡选择器：从 `len` 个候选实例中挑选一个下标
///
/// `len == 0` 时必须返回 `None`，调用方据此返回未找到错误。
pub trait Selector: Send + Sync + std::fmt::Debug {
    fn select(&self, len: usize) -> Option<usize>;
}

/// 均匀随机选择器，可注入种子以获得确定性结果
#[derive(Debug)]
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for RandomSelector {
    fn select(&self, len: usize) -> Option<usize> {
        match len {
            0 => None,
            1 => Some(0),
            _ => {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                Some(rng.gen_range(0..len))
            }
        }
    }
}

/// 轮询选择器
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    cursor: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobinSelector {
    fn select(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(idx % len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_empty_candidates_yield_none() {
        assert_eq!(RandomSelector::seeded(1).select(0), None);
        assert_eq!(RoundRobinSelector::new().select(0), None);
    }

    #[test]
    fn test_single_candidate() {
        let selector = RandomSelector::new();
        for _ in 0..10 {
            assert_eq!(selector.select(1), Some(0));
        }
    }

    #[test]
    fn test_seeded_selector_is_deterministic() {
        let a = RandomSelector::seeded(42);
        let b = RandomSelector::seeded(42);
        let picks_a: Vec<_> = (0..32).map(|_| a.select(5)).collect();
        let picks_b: Vec<_> = (0..32).map(|_| b.select(5)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_random_selector_covers_all_candidates() {
        let selector = RandomSelector::seeded(7);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let idx = selector.select(4).expect("non-empty candidates");
            assert!(idx < 4);
            seen.insert(idx);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_round_robin_cycles() {
        let selector = RoundRobinSelector::new();
        let picks: Vec<_> = (0..6).filter_map(|_| selector.select(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }
}
