//! Level-based executor pool
//!
//! One concurrency limit per nesting depth so deeply nested sub-plans cannot
//! starve root-level plans. A plan awaiting a sub-plan holds a permit at its
//! own depth only, so every depth needs its own semaphore: depths past the
//! configured levels get a fresh level sized like the last one.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::settings::RuntimeConfig;

pub struct LevelBasedExecutorPool {
    levels: Mutex<Vec<Arc<Semaphore>>>,
    overflow_size: usize,
}

impl LevelBasedExecutorPool {
    /// Zero sizes are raised to one; an empty list yields a single level.
    pub fn new(sizes: &[usize]) -> Self {
        let mut sizes: Vec<usize> = sizes.iter().map(|size| (*size).max(1)).collect();
        if sizes.is_empty() {
            sizes.push(1);
        }
        let overflow_size = sizes[sizes.len() - 1];
        let levels = sizes
            .into_iter()
            .map(|size| Arc::new(Semaphore::new(size)))
            .collect();
        Self {
            levels: Mutex::new(levels),
            overflow_size,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(&config.level_pool_sizes)
    }

    /// Levels created so far, configured or grown.
    pub fn level_count(&self) -> usize {
        self.levels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn available_permits(&self, depth: u32) -> usize {
        self.level(depth).available_permits()
    }

    fn level(&self, depth: u32) -> Arc<Semaphore> {
        let index = depth as usize;
        let mut levels = self.levels.lock().unwrap_or_else(|e| e.into_inner());
        while levels.len() <= index {
            debug!(
                "[ExecutorPool] Adding level {} with {} slots",
                levels.len(),
                self.overflow_size
            );
            levels.push(Arc::new(Semaphore::new(self.overflow_size)));
        }
        levels[index].clone()
    }

    /// Spawn `fut` once a slot at `depth` is free.
    pub fn spawn<F>(&self, depth: u32, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let semaphore = self.level(depth);
        tokio::spawn(async move {
            // Semaphores are never closed, so acquisition only waits.
            let _permit = semaphore.acquire_owned().await;
            debug!("[ExecutorPool] Running work at depth {}", depth);
            fut.await
        })
    }
}

impl Default for LevelBasedExecutorPool {
    fn default() -> Self {
        Self::from_config(&RuntimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_empty_and_zero_sizes() {
        let pool = LevelBasedExecutorPool::new(&[]);
        assert_eq!(pool.level_count(), 1);
        assert_eq!(pool.available_permits(0), 1);

        let pool = LevelBasedExecutorPool::new(&[0, 3]);
        assert_eq!(pool.available_permits(0), 1);
        assert_eq!(pool.available_permits(1), 3);
    }

    #[test]
    fn test_deep_levels_sized_like_last() {
        let pool = LevelBasedExecutorPool::new(&[4, 2]);
        assert_eq!(pool.available_permits(1), 2);
        assert_eq!(pool.available_permits(7), 2);
        assert_eq!(pool.level_count(), 8);
    }

    #[tokio::test]
    async fn test_sub_plan_past_last_level_runs() {
        let pool = Arc::new(LevelBasedExecutorPool::new(&[2, 1]));
        let inner = pool.clone();
        let outer = pool.spawn(1, async move { inner.spawn(2, async { 7 }).await.unwrap() });

        let value = tokio::time::timeout(Duration::from_secs(2), outer)
            .await
            .expect("nested sub-plan starved")
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_full_last_level_does_not_block_children() {
        let pool = Arc::new(LevelBasedExecutorPool::new(&[8, 4, 2]));
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let inner = pool.clone();
                pool.spawn(2, async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    inner.spawn(3, async move { i }).await.unwrap()
                })
            })
            .collect();

        let mut values = Vec::new();
        for handle in handles {
            let value = tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .expect("depth-3 children starved")
                .unwrap();
            values.push(value);
        }
        assert_eq!(values, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_spawn_returns_output() {
        let pool = LevelBasedExecutorPool::default();
        let value = pool.spawn(0, async { 41 + 1 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_level_limits_concurrency() {
        let pool = LevelBasedExecutorPool::new(&[2]);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.spawn(0, async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
