//! 应用服务层 - 宿主平台调用的统一入口
//!
//! 负责通道载荷归一化、后台任务的启停，并把调用编排到领域服务。
//! token 相关操作与消息仲裁互不等待。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use courier_core::NotifyMetrics;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::domain::model::{NotificationMessage, SourceChannel, TokenOperationResult, TokenState};
use crate::domain::repository::DeviceTokenSource;
use crate::domain::service::{ArbitrationOutcome, ChannelArbiter, DropReason, TokenLifecycleManager};
use crate::infrastructure::codec::{NormalizeError, normalize_push, normalize_realtime};
use crate::infrastructure::{DedupRegistry, PreferenceCache};

pub struct NotificationApplication {
    arbiter: Arc<ChannelArbiter>,
    tokens: Arc<TokenLifecycleManager>,
    preferences: Arc<PreferenceCache>,
    dedup: Arc<DedupRegistry>,
    token_source: Arc<dyn DeviceTokenSource>,
    sweep_interval: Duration,
    metrics: Arc<NotifyMetrics>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl NotificationApplication {
    pub fn new(
        arbiter: Arc<ChannelArbiter>,
        tokens: Arc<TokenLifecycleManager>,
        preferences: Arc<PreferenceCache>,
        dedup: Arc<DedupRegistry>,
        token_source: Arc<dyn DeviceTokenSource>,
        sweep_interval: Duration,
        metrics: Arc<NotifyMetrics>,
    ) -> Self {
        Self {
            arbiter,
            tokens,
            preferences,
            dedup,
            token_source,
            sweep_interval,
            metrics,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// 启动后台任务：去重过期清理、应用启动时的 token 同步
    ///
    /// 重复调用无副作用，必须在 tokio 运行时内调用
    pub fn initialize(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let sweeper = self.dedup.spawn_sweeper(self.sweep_interval);

        let tokens = Arc::clone(&self.tokens);
        let sync = tokio::spawn(async move {
            if let Some(result) = tokens.sync_persisted_token().await {
                info!(
                    success = result.success,
                    deferred = result.deferred,
                    "App start token sync finished"
                );
            }
        });

        self.push_tasks([sweeper, sync]);
        info!(
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            "Notification orchestrator initialized"
        );
    }

    /// 停止后台任务并清空去重记录
    pub fn shutdown(&self) {
        let tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for task in tasks {
            task.abort();
        }
        self.dedup.clear();
        self.started.store(false, Ordering::SeqCst);
        info!("Notification orchestrator shut down");
    }

    /// 长连接原始消息
    pub async fn on_realtime_message(&self, raw: &Value) -> ArbitrationOutcome {
        self.ingest(SourceChannel::Realtime, normalize_realtime(raw))
            .await
    }

    /// 第三方推送原始消息
    pub async fn on_push_message(&self, raw: &Value) -> ArbitrationOutcome {
        self.ingest(SourceChannel::Push, normalize_push(raw)).await
    }

    /// 使用平台 SDK 当前的 token 注册；SDK 尚未下发时使用本地持久化的 token
    #[instrument(skip(self))]
    pub async fn register_device_token(&self) -> TokenOperationResult {
        let token = match self.token_source.current_token().await {
            Ok(Some(token)) => Some(token),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to obtain device token from platform SDK");
                None
            }
        };
        let token = match token {
            Some(token) => token,
            None => match self.tokens.current_token().await {
                Some(stored) => stored.value,
                None => return TokenOperationResult::failed("no device token available"),
            },
        };
        self.tokens.register(&token).await
    }

    /// 登出时注销 token
    pub async fn revoke_device_token(&self) -> TokenOperationResult {
        self.tokens.revoke().await
    }

    /// 平台 SDK 轮换 token
    pub async fn on_token_rotated(&self, new_token: &str) -> TokenOperationResult {
        self.tokens.on_token_rotated(new_token).await
    }

    /// 回到前台：重试未被确认的注册
    pub async fn on_app_foreground(&self) -> Option<TokenOperationResult> {
        self.tokens.retry_unconfirmed().await
    }

    /// 用户修改了通知设置
    pub async fn invalidate_preference_cache(&self) {
        self.preferences.invalidate().await;
    }

    pub fn token_state(&self) -> TokenState {
        self.tokens.state()
    }

    pub fn dedup_entries(&self) -> usize {
        self.dedup.len()
    }

    pub fn metrics(&self) -> &Arc<NotifyMetrics> {
        &self.metrics
    }

    async fn ingest(
        &self,
        channel: SourceChannel,
        normalized: Result<NotificationMessage, NormalizeError>,
    ) -> ArbitrationOutcome {
        self.metrics
            .messages_received_total
            .with_label_values(&[channel.as_str()])
            .inc();

        match normalized {
            Ok(message) => match channel {
                SourceChannel::Realtime => self.arbiter.on_realtime_message(message).await,
                SourceChannel::Push => self.arbiter.on_push_message(message).await,
            },
            Err(e) => {
                warn!(channel = channel.as_str(), error = %e, "Dropping malformed message");
                self.metrics
                    .messages_dropped_total
                    .with_label_values(&[channel.as_str(), DropReason::Malformed.as_str()])
                    .inc();
                ArbitrationOutcome::Dropped(DropReason::Malformed)
            }
        }
    }

    fn push_tasks(&self, handles: impl IntoIterator<Item = JoinHandle<()>>) {
        let mut guard = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.extend(handles);
    }
}

impl Drop for NotificationApplication {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
