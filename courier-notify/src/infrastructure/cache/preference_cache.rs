//! 用户通知偏好缓存
//!
//! 设计原则：
//! - 固定 TTL（默认 60 秒），过期后下一次读取触发一次远端拉取
//! - 单飞：拉取进行中时，并发读取共享同一次拉取结果，不发起重复请求
//! - 拉取失败或超时返回硬编码默认偏好，失败结果不写入缓存
//! - `invalidate` 不取消进行中的拉取，拉取完成后仍会写入缓存（后写覆盖），
//!   但之后的读取不再加入该次拉取，而是发起新的拉取

use std::sync::Arc;
use std::time::Duration;

use courier_core::NotifyMetrics;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::domain::model::UserPreferences;
use crate::domain::repository::PreferencesRpc;

/// 偏好缓存配置
#[derive(Debug, Clone, Copy)]
pub struct PreferenceCacheConfig {
    pub ttl: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PreferenceCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    user_id: String,
    preferences: UserPreferences,
    cached_at: Instant,
}

impl CacheEntry {
    fn is_fresh_for(&self, user_id: &str, ttl: Duration) -> bool {
        self.user_id == user_id && self.cached_at.elapsed() < ttl
    }
}

/// 拉取结果：None 表示失败（调用方使用默认值）
type FetchFuture = Shared<BoxFuture<'static, Option<UserPreferences>>>;

struct InFlight {
    generation: u64,
    user_id: String,
    future: FetchFuture,
}

#[derive(Default)]
struct FlightSlot {
    next_generation: u64,
    current: Option<InFlight>,
}

/// 带 TTL 与单飞的偏好缓存
pub struct PreferenceCache {
    rpc: Arc<dyn PreferencesRpc>,
    config: PreferenceCacheConfig,
    entry: Arc<RwLock<Option<CacheEntry>>>,
    inflight: Mutex<FlightSlot>,
    metrics: Option<Arc<NotifyMetrics>>,
}

impl PreferenceCache {
    pub fn new(rpc: Arc<dyn PreferencesRpc>, config: PreferenceCacheConfig) -> Self {
        Self {
            rpc,
            config,
            entry: Arc::new(RwLock::new(None)),
            inflight: Mutex::new(FlightSlot::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NotifyMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics
                .preference_fetch_total
                .with_label_values(&[outcome])
                .inc();
        }
    }

    /// 读取用户偏好
    pub async fn get(&self, user_id: &str) -> UserPreferences {
        {
            let entry = self.entry.read().await;
            if let Some(entry) = entry.as_ref() {
                if entry.is_fresh_for(user_id, self.config.ttl) {
                    trace!(user_id = %user_id, "Preference cache hit");
                    self.record("hit");
                    return entry.preferences.clone();
                }
            }
        }

        let (generation, flight) = self.join_or_start_fetch(user_id).await;
        let fetched = flight.await;

        {
            let mut slot = self.inflight.lock().await;
            if slot
                .current
                .as_ref()
                .is_some_and(|current| current.generation == generation)
            {
                slot.current = None;
            }
        }

        match fetched {
            Some(preferences) => {
                self.record("fetched");
                preferences
            }
            None => {
                self.record("fallback");
                UserPreferences::defaults()
            }
        }
    }

    /// 立即清空缓存，下一次读取强制拉取
    pub async fn invalidate(&self) {
        // 加锁顺序与 join_or_start_fetch 一致：先 inflight 后 entry
        let mut slot = self.inflight.lock().await;
        let detached = slot.current.take();
        slot.next_generation += 1;

        let mut entry = self.entry.write().await;
        *entry = None;
        debug!(
            detached_fetch = detached.is_some(),
            "Preference cache invalidated"
        );
    }

    async fn join_or_start_fetch(&self, user_id: &str) -> (u64, FetchFuture) {
        let mut slot = self.inflight.lock().await;

        if let Some(current) = slot.current.as_ref() {
            if current.user_id == user_id {
                trace!(user_id = %user_id, "Joining in-flight preference fetch");
                return (current.generation, current.future.clone());
            }
        }

        // 等待锁期间可能已有拉取完成并写入缓存
        {
            let entry = self.entry.read().await;
            if let Some(entry) = entry.as_ref() {
                if entry.is_fresh_for(user_id, self.config.ttl) {
                    let preferences = entry.preferences.clone();
                    let ready: BoxFuture<'static, Option<UserPreferences>> =
                        async move { Some(preferences) }.boxed();
                    return (u64::MAX, ready.shared());
                }
            }
        }

        let generation = slot.next_generation;
        slot.next_generation += 1;

        let future = Self::fetch(
            Arc::clone(&self.rpc),
            Arc::clone(&self.entry),
            user_id.to_string(),
            self.config.fetch_timeout,
        )
        .boxed()
        .shared();

        slot.current = Some(InFlight {
            generation,
            user_id: user_id.to_string(),
            future: future.clone(),
        });

        (generation, future)
    }

    async fn fetch(
        rpc: Arc<dyn PreferencesRpc>,
        entry: Arc<RwLock<Option<CacheEntry>>>,
        user_id: String,
        timeout: Duration,
    ) -> Option<UserPreferences> {
        debug!(user_id = %user_id, "Fetching notification preferences");

        match tokio::time::timeout(timeout, rpc.get_notification_settings(&user_id)).await {
            Ok(Ok(settings)) => {
                let preferences = UserPreferences::from_settings(&settings);
                let mut guard = entry.write().await;
                *guard = Some(CacheEntry {
                    user_id,
                    preferences: preferences.clone(),
                    cached_at: Instant::now(),
                });
                Some(preferences)
            }
            Ok(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Preference fetch failed, using defaults");
                None
            }
            Err(_) => {
                warn!(
                    user_id = %user_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Preference fetch timed out, using defaults"
                );
                None
            }
        }
    }
}
