//! # Prometheus 指标收集模块
//!
//! 为通知编排提供统一的指标收集能力。策略性丢弃（后台丢弃、偏好屏蔽、重复）
//! 不是错误，但必须可观测，因此每种丢弃原因都有独立的计数。

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// 通知编排指标
#[derive(Clone)]
pub struct NotifyMetrics {
    /// 收到的消息数（按通道）
    pub messages_received_total: IntCounterVec,
    /// 丢弃的消息数（按通道、原因）
    pub messages_dropped_total: IntCounterVec,
    /// 展示的消息数（按通道、展示方式 primary|fallback|failed）
    pub messages_presented_total: IntCounterVec,
    /// 偏好读取结果（hit|fetched|fallback）
    pub preference_fetch_total: IntCounterVec,
    /// token RPC 调用结果（按操作、结果）
    pub token_rpc_total: IntCounterVec,
    /// 当前去重记录数
    pub dedup_entries: IntGauge,
    /// 展示耗时（秒）
    pub present_duration_seconds: Histogram,
    registry: Registry,
}

impl NotifyMetrics {
    /// 在给定的注册表上创建指标
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let messages_received_total = IntCounterVec::new(
            Opts::new(
                "notify_messages_received_total",
                "Total number of inbound notification events",
            ),
            &["channel"],
        )?;

        let messages_dropped_total = IntCounterVec::new(
            Opts::new(
                "notify_messages_dropped_total",
                "Total number of notification events dropped by policy",
            ),
            &["channel", "reason"],
        )?;

        let messages_presented_total = IntCounterVec::new(
            Opts::new(
                "notify_messages_presented_total",
                "Total number of notification presentations",
            ),
            &["channel", "mode"],
        )?;

        let preference_fetch_total = IntCounterVec::new(
            Opts::new(
                "notify_preference_fetch_total",
                "Preference cache lookups by outcome",
            ),
            &["outcome"],
        )?;

        let token_rpc_total = IntCounterVec::new(
            Opts::new(
                "notify_token_rpc_total",
                "Device token registration RPC calls by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;

        let dedup_entries = IntGauge::new(
            "notify_dedup_entries",
            "Current number of records held by the dedup registry",
        )?;

        let present_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "notify_present_duration_seconds",
                "Local notification rendering duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(messages_received_total.clone()))?;
        registry.register(Box::new(messages_dropped_total.clone()))?;
        registry.register(Box::new(messages_presented_total.clone()))?;
        registry.register(Box::new(preference_fetch_total.clone()))?;
        registry.register(Box::new(token_rpc_total.clone()))?;
        registry.register(Box::new(dedup_entries.clone()))?;
        registry.register(Box::new(present_duration_seconds.clone()))?;

        Ok(Self {
            messages_received_total,
            messages_dropped_total,
            messages_presented_total,
            preference_fetch_total,
            token_rpc_total,
            dedup_entries,
            present_duration_seconds,
            registry: registry.clone(),
        })
    }

    /// 使用独立注册表创建（测试与嵌入式宿主使用）
    pub fn standalone() -> Self {
        // 全新注册表上不会出现重复注册
        Self::new(&Registry::new()).expect("metrics registration on a fresh registry")
    }

    /// 以 Prometheus 文本格式导出
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub fn dropped(&self, channel: &str, reason: &str) -> u64 {
        self.messages_dropped_total
            .with_label_values(&[channel, reason])
            .get()
    }

    pub fn presented(&self, channel: &str, mode: &str) -> u64 {
        self.messages_presented_total
            .with_label_values(&[channel, mode])
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters_and_export() {
        let metrics = NotifyMetrics::standalone();
        metrics
            .messages_dropped_total
            .with_label_values(&["realtime", "background"])
            .inc();
        metrics.dedup_entries.set(3);

        assert_eq!(metrics.dropped("realtime", "background"), 1);
        assert_eq!(metrics.dropped("push", "duplicate"), 0);

        let text = metrics.gather_text();
        assert!(text.contains("notify_messages_dropped_total"));
        assert!(text.contains("notify_dedup_entries 3"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = Registry::new();
        assert!(NotifyMetrics::new(&registry).is_ok());
        assert!(NotifyMetrics::new(&registry).is_err());
    }
}
