//! 通道仲裁
//!
//! 同一逻辑通知可能同时经长连接和第三方推送到达。仲裁在一个串行闸门内完成：
//! 生命周期判断 → 偏好判断 → 去重检查并标记 → 展示。
//! 偏好判断先于去重，被屏蔽的消息不会占用去重记录。

use std::fmt;
use std::sync::Arc;

use courier_core::NotifyMetrics;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::domain::model::{
    AppLifecycleState, NotificationMessage, PresentResult, SourceChannel, UserPreferences,
};
use crate::domain::repository::{AppLifecycleProvider, AuthSessionProvider};
use crate::domain::service::presenter::Presenter;
use crate::infrastructure::{DedupRegistry, PreferenceCache};

/// 丢弃原因（策略性丢弃，不是错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// 后台收到长连接消息，交由第三方推送送达
    Background,
    /// 用户关闭了该分类
    PreferenceBlocked,
    /// 已由另一通道处理
    Duplicate,
    /// 载荷无法归一化
    Malformed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::PreferenceBlocked => "preference_blocked",
            Self::Duplicate => "duplicate",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 仲裁结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationOutcome {
    Presented(PresentResult),
    Dropped(DropReason),
}

impl ArbitrationOutcome {
    pub fn is_presented(&self) -> bool {
        matches!(self, Self::Presented(_))
    }

    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::Dropped(reason) => Some(*reason),
            Self::Presented(_) => None,
        }
    }
}

pub struct ChannelArbiter {
    dedup: Arc<DedupRegistry>,
    preferences: Arc<PreferenceCache>,
    presenter: Arc<Presenter>,
    auth: Arc<dyn AuthSessionProvider>,
    lifecycle: Arc<dyn AppLifecycleProvider>,
    gate: Mutex<()>,
    metrics: Option<Arc<NotifyMetrics>>,
}

impl ChannelArbiter {
    pub fn new(
        dedup: Arc<DedupRegistry>,
        preferences: Arc<PreferenceCache>,
        presenter: Arc<Presenter>,
        auth: Arc<dyn AuthSessionProvider>,
        lifecycle: Arc<dyn AppLifecycleProvider>,
    ) -> Self {
        Self {
            dedup,
            preferences,
            presenter,
            auth,
            lifecycle,
            gate: Mutex::new(()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NotifyMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 长连接消息入口
    pub async fn on_realtime_message(&self, message: NotificationMessage) -> ArbitrationOutcome {
        debug_assert_eq!(message.source_channel, SourceChannel::Realtime);
        self.arbitrate(message).await
    }

    /// 第三方推送消息入口
    pub async fn on_push_message(&self, message: NotificationMessage) -> ArbitrationOutcome {
        debug_assert_eq!(message.source_channel, SourceChannel::Push);
        self.arbitrate(message).await
    }

    /// 仲裁单条消息
    ///
    /// 整个判断过程持有闸门，两条通道同时到达同一 id 时只有一条能展示
    #[instrument(skip(self, message), fields(message_id = %message.id, channel = %message.source_channel))]
    pub async fn arbitrate(&self, message: NotificationMessage) -> ArbitrationOutcome {
        let _gate = self.gate.lock().await;

        let app_state = self.lifecycle.current_state();
        if message.source_channel == SourceChannel::Realtime
            && app_state == AppLifecycleState::Background
        {
            debug!("Realtime message received in background, deferring to push");
            return self.dropped(&message, DropReason::Background);
        }

        let preferences = self.load_preferences().await;
        if !preferences.is_allowed(&message.category) {
            info!(category = message.category.key(), "Category disabled by user preference");
            return self.dropped(&message, DropReason::PreferenceBlocked);
        }

        if self.dedup.is_processed(&message.id) {
            debug!("Message already handled by another channel");
            return self.dropped(&message, DropReason::Duplicate);
        }
        self.dedup.mark_processed(&message.id);

        let result = self.presenter.present(&message, app_state).await;
        ArbitrationOutcome::Presented(result)
    }

    async fn load_preferences(&self) -> UserPreferences {
        match self.auth.current_user_id() {
            Some(user_id) => self.preferences.get(&user_id).await,
            None => UserPreferences::defaults(),
        }
    }

    fn dropped(&self, message: &NotificationMessage, reason: DropReason) -> ArbitrationOutcome {
        if let Some(metrics) = &self.metrics {
            metrics
                .messages_dropped_total
                .with_label_values(&[message.source_channel.as_str(), reason.as_str()])
                .inc();
        }
        ArbitrationOutcome::Dropped(reason)
    }
}
