//! 已展示消息去重表
//!
//! 设计原则：
//! - 按插入顺序保存记录（单调递增序号 → 记录），容量超限时淘汰最早插入的一条
//! - TTL 固定，因此插入顺序即过期顺序，序号表同时充当过期队列
//! - 提前淘汰的记录连同其过期项一起移除，之后不会再被"过期"一次
//! - `is_processed` 自身检查过期时间，后台清理任务只负责回收内存

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use courier_core::NotifyMetrics;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// 去重表配置
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1000,
        }
    }
}

/// 已处理记录，`expires_at` 为首次标记时间 + ttl
#[derive(Debug, Clone)]
struct ProcessedRecord {
    message_id: String,
    expires_at: Instant,
}

#[derive(Default)]
struct RegistryState {
    next_seq: u64,
    /// 插入序号 → 记录（有序，最小序号即最早插入/最早过期）
    order: BTreeMap<u64, ProcessedRecord>,
    /// message_id → 插入序号
    index: HashMap<String, u64>,
}

impl RegistryState {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(entry) = self.order.first_entry() {
            if entry.get().expires_at > now {
                break;
            }
            let record = entry.remove();
            self.index.remove(&record.message_id);
            removed += 1;
        }
        removed
    }

    fn evict_oldest(&mut self) -> Option<ProcessedRecord> {
        let (_, record) = self.order.pop_first()?;
        self.index.remove(&record.message_id);
        Some(record)
    }
}

/// 去重表（进程内单例，由调用方注入）
pub struct DedupRegistry {
    config: DedupConfig,
    state: Mutex<RegistryState>,
    metrics: Option<Arc<NotifyMetrics>>,
}

impl DedupRegistry {
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config: DedupConfig {
                ttl: config.ttl,
                max_entries: config.max_entries.max(1),
            },
            state: Mutex::new(RegistryState::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NotifyMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // 临界区内没有可能 panic 的用户代码，中毒后直接复用内部状态
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn report_size(&self, size: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.dedup_entries.set(size as i64);
        }
    }

    /// 该消息是否已展示过（且记录未过期）
    pub fn is_processed(&self, message_id: &str) -> bool {
        let mut state = self.lock();
        state.purge_expired(Instant::now());
        state.index.contains_key(message_id)
    }

    /// 标记为已处理
    ///
    /// 幂等：已存在且未过期的记录保持原样（不延长过期时间）。返回是否新插入。
    pub fn mark_processed(&self, message_id: &str) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        state.purge_expired(now);

        if state.index.contains_key(message_id) {
            trace!(message_id = %message_id, "Message already marked as processed");
            return false;
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.insert(
            seq,
            ProcessedRecord {
                message_id: message_id.to_string(),
                expires_at: now + self.config.ttl,
            },
        );
        state.index.insert(message_id.to_string(), seq);

        while state.order.len() > self.config.max_entries {
            if let Some(evicted) = state.evict_oldest() {
                debug!(
                    evicted_id = %evicted.message_id,
                    max_entries = self.config.max_entries,
                    "Dedup registry full, evicted oldest record"
                );
            }
        }

        let size = state.order.len();
        drop(state);
        self.report_size(size);
        true
    }

    /// 回收已过期记录，返回回收条数
    pub fn sweep_expired(&self) -> usize {
        let mut state = self.lock();
        let removed = state.purge_expired(Instant::now());
        let size = state.order.len();
        drop(state);

        if removed > 0 {
            debug!(removed, remaining = size, "Swept expired dedup records");
        }
        self.report_size(size);
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.order.clear();
        state.index.clear();
        drop(state);
        self.report_size(0);
    }

    /// 启动后台过期清理任务
    ///
    /// 任务只持有弱引用，去重表被释放后自动退出；也可通过返回的句柄提前终止
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        let period = interval.max(Duration::from_millis(10));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match registry.upgrade() {
                    Some(registry) => {
                        registry.sweep_expired();
                    }
                    None => break,
                }
            }
            debug!("Dedup sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(ttl_secs: u64, max_entries: usize) -> DedupRegistry {
        DedupRegistry::new(DedupConfig {
            ttl: Duration::from_secs(ttl_secs),
            max_entries,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_processed_is_idempotent() {
        let registry = registry(300, 10);

        assert!(registry.mark_processed("msg-1"));
        assert!(registry.is_processed("msg-1"));
        assert!(!registry.mark_processed("msg-1"));
        assert!(registry.is_processed("msg-1"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_mark_does_not_extend_expiry() {
        let registry = registry(10, 10);

        registry.mark_processed("msg-1");
        tokio::time::advance(Duration::from_secs(6)).await;
        registry.mark_processed("msg-1");
        tokio::time::advance(Duration::from_secs(4)).await;

        assert!(!registry.is_processed("msg-1"));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_bound_evicts_earliest_inserted() {
        let max = 5;
        let registry = registry(300, max);

        for i in 0..=max {
            registry.mark_processed(&format!("msg-{i}"));
        }

        assert_eq!(registry.len(), max);
        assert!(!registry.is_processed("msg-0"));
        for i in 1..=max {
            assert!(registry.is_processed(&format!("msg-{i}")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_ignores_access_order() {
        let registry = registry(300, 2);

        registry.mark_processed("a");
        registry.mark_processed("b");
        // 访问不影响淘汰顺序
        assert!(registry.is_processed("a"));
        registry.mark_processed("c");

        assert!(!registry.is_processed("a"));
        assert!(registry.is_processed("b"));
        assert!(registry.is_processed("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let registry = registry(300, 10);

        registry.mark_processed("msg-1");
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(registry.is_processed("msg-1"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!registry.is_processed("msg-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_record_expiry_does_not_remove_reinserted_id() {
        let registry = registry(10, 1);

        registry.mark_processed("a");
        tokio::time::advance(Duration::from_secs(5)).await;
        // 淘汰 a
        registry.mark_processed("b");
        // 再次插入 a，同时淘汰 b
        registry.mark_processed("a");

        // 原 a 记录的过期时间点已过，但新记录仍有效
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(registry.is_processed("a"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_expired_records() {
        let registry = Arc::new(registry(1, 10));
        let handle = registry.spawn_sweeper(Duration::from_millis(100));

        registry.mark_processed("msg-1");
        registry.mark_processed("msg-2");
        assert_eq!(registry.len(), 2);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(registry.len(), 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_gauge_tracks_size() {
        let metrics = Arc::new(NotifyMetrics::standalone());
        let registry = registry(300, 2).with_metrics(metrics.clone());

        registry.mark_processed("a");
        registry.mark_processed("b");
        registry.mark_processed("c");
        assert_eq!(metrics.dedup_entries.get(), 2);

        registry.clear();
        assert_eq!(metrics.dedup_entries.get(), 0);
    }
}
