//! 通知展示 - 优先级映射为平台展示参数并交给本地渲染器

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use courier_core::NotifyMetrics;
use tracing::{debug, instrument, warn};

use crate::domain::model::{
    AppLifecycleState, DEFAULT_CHANNEL_ID, DisplayRequest, NotificationMessage, PresentResult,
    PresentationProfile, Priority,
};
use crate::domain::repository::NotificationRenderer;

/// 兜底展示内容
#[derive(Debug, Clone)]
pub struct PresenterConfig {
    pub fallback_title: String,
    pub fallback_body: String,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            fallback_title: "New notification".to_string(),
            fallback_body: "Open the app to see details".to_string(),
        }
    }
}

pub struct Presenter {
    renderer: Arc<dyn NotificationRenderer>,
    config: PresenterConfig,
    metrics: Option<Arc<NotifyMetrics>>,
}

impl Presenter {
    pub fn new(renderer: Arc<dyn NotificationRenderer>, config: PresenterConfig) -> Self {
        Self {
            renderer,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NotifyMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 展示通知
    ///
    /// 渲染失败时用通用标题/正文和默认渠道再尝试一次，仍失败则静默放弃
    #[instrument(skip(self, message), fields(message_id = %message.id, priority = ?message.priority))]
    pub async fn present(
        &self,
        message: &NotificationMessage,
        app_state: AppLifecycleState,
    ) -> PresentResult {
        let start = Instant::now();

        let request = self.build_request(message, app_state);
        let result = match self.renderer.display(request).await {
            Ok(()) => {
                debug!(channel = %message.source_channel, "Notification presented");
                PresentResult::Presented
            }
            Err(e) => {
                warn!(error = %e, "Renderer failed, attempting fallback presentation");
                let fallback = self.build_fallback(message, app_state);
                match self.renderer.display(fallback).await {
                    Ok(()) => PresentResult::PresentedFallback,
                    Err(e) => {
                        warn!(error = %e, "Fallback presentation failed, dropping notification");
                        PresentResult::Failed
                    }
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics
                .present_duration_seconds
                .observe(start.elapsed().as_secs_f64());
            metrics
                .messages_presented_total
                .with_label_values(&[message.source_channel.as_str(), result.as_str()])
                .inc();
        }

        result
    }

    fn build_request(
        &self,
        message: &NotificationMessage,
        app_state: AppLifecycleState,
    ) -> DisplayRequest {
        let profile = PresentationProfile::for_priority(message.priority);
        DisplayRequest {
            notification_id: uuid::Uuid::new_v4().to_string(),
            channel_id: message.category.channel_id().to_string(),
            title: message.title.clone(),
            body: message.body.clone(),
            importance: profile.importance,
            sound: profile.sound,
            vibration_pattern: profile.vibration_pattern,
            prominence: profile.prominence,
            payload: Self::routing_payload(message, app_state),
        }
    }

    fn build_fallback(
        &self,
        message: &NotificationMessage,
        app_state: AppLifecycleState,
    ) -> DisplayRequest {
        let profile = PresentationProfile::for_priority(Priority::Normal);
        let mut payload = Self::routing_payload(message, app_state);
        payload.insert("fallback".to_string(), "true".to_string());

        DisplayRequest {
            notification_id: uuid::Uuid::new_v4().to_string(),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            title: self.config.fallback_title.clone(),
            body: self.config.fallback_body.clone(),
            importance: profile.importance,
            sound: profile.sound,
            vibration_pattern: profile.vibration_pattern,
            prominence: profile.prominence,
            payload,
        }
    }

    /// 原始载荷 + 点击路由需要的记账字段
    fn routing_payload(
        message: &NotificationMessage,
        app_state: AppLifecycleState,
    ) -> HashMap<String, String> {
        let mut payload = message.payload.clone();
        payload.insert("messageId".to_string(), message.id.clone());
        payload.insert("category".to_string(), message.category.key().to_string());
        payload.insert(
            "sourceChannel".to_string(),
            message.source_channel.as_str().to_string(),
        );
        payload.insert("appState".to_string(), app_state.as_str().to_string());
        payload
    }
}
