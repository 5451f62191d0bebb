//! 通知编排服务配置
//!
//! 取值优先级：环境变量（COURIER_NOTIFY_*）> 配置文件 `[notify]` > 默认值

use std::env;
use std::time::Duration;

use courier_core::config::{CourierAppConfig, env_parse};

use crate::domain::model::{DeviceContext, DeviceInfo, Platform};
use crate::domain::service::PresenterConfig;
use crate::infrastructure::cache::PreferenceCacheConfig;
use crate::infrastructure::dedup_registry::DedupConfig;

#[derive(Debug, Clone)]
pub struct NotifyServiceConfig {
    // 去重配置
    pub dedup_ttl_secs: u64,
    pub dedup_max_entries: usize,
    pub dedup_sweep_interval_ms: u64,
    // 偏好缓存配置
    pub preference_ttl_secs: u64,
    pub preference_fetch_timeout_ms: u64,
    // token 存储
    pub token_store_path: Option<String>,
    // 设备上下文
    pub platform: Platform,
    pub locale: String,
    pub timezone: String,
    pub app_version: String,
    pub device_model: String,
    pub os_version: String,
    // 兜底展示内容
    pub fallback_title: String,
    pub fallback_body: String,
}

impl Default for NotifyServiceConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_secs: 300,
            dedup_max_entries: 1000,
            dedup_sweep_interval_ms: 1000,
            preference_ttl_secs: 60,
            preference_fetch_timeout_ms: 5000,
            token_store_path: None,
            platform: Platform::Android,
            locale: "en-US".to_string(),
            timezone: "UTC".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            device_model: "unknown".to_string(),
            os_version: "unknown".to_string(),
            fallback_title: "New notification".to_string(),
            fallback_body: "Open the app to see details".to_string(),
        }
    }
}

impl NotifyServiceConfig {
    pub fn from_app_config(app: &CourierAppConfig) -> Self {
        let section = app.notify();
        let defaults = Self::default();

        let dedup_ttl_secs = env_parse::<u64>("COURIER_NOTIFY_DEDUP_TTL_SECS")
            .or(section.dedup_ttl_secs)
            .unwrap_or(defaults.dedup_ttl_secs);

        let dedup_max_entries = env_parse::<usize>("COURIER_NOTIFY_DEDUP_MAX_ENTRIES")
            .or(section.dedup_max_entries)
            .unwrap_or(defaults.dedup_max_entries);

        let dedup_sweep_interval_ms = env_parse::<u64>("COURIER_NOTIFY_DEDUP_SWEEP_INTERVAL_MS")
            .or(section.dedup_sweep_interval_ms)
            .unwrap_or(defaults.dedup_sweep_interval_ms);

        let preference_ttl_secs = env_parse::<u64>("COURIER_NOTIFY_PREFERENCE_TTL_SECS")
            .or(section.preference_ttl_secs)
            .unwrap_or(defaults.preference_ttl_secs);

        let preference_fetch_timeout_ms =
            env_parse::<u64>("COURIER_NOTIFY_PREFERENCE_FETCH_TIMEOUT_MS")
                .or(section.preference_fetch_timeout_ms)
                .unwrap_or(defaults.preference_fetch_timeout_ms);

        let token_store_path = env::var("COURIER_NOTIFY_TOKEN_STORE_PATH")
            .ok()
            .or_else(|| section.token_store_path.clone());

        let platform = env::var("COURIER_NOTIFY_PLATFORM")
            .ok()
            .or_else(|| section.platform.clone())
            .and_then(|p| Platform::parse(&p))
            .unwrap_or(defaults.platform);

        let string_value = |key: &str, file: &Option<String>, default: String| {
            env::var(key)
                .ok()
                .or_else(|| file.clone())
                .unwrap_or(default)
        };

        Self {
            dedup_ttl_secs,
            dedup_max_entries,
            dedup_sweep_interval_ms,
            preference_ttl_secs,
            preference_fetch_timeout_ms,
            token_store_path,
            platform,
            locale: string_value("COURIER_NOTIFY_LOCALE", &section.locale, defaults.locale),
            timezone: string_value(
                "COURIER_NOTIFY_TIMEZONE",
                &section.timezone,
                defaults.timezone,
            ),
            app_version: string_value(
                "COURIER_NOTIFY_APP_VERSION",
                &section.app_version,
                defaults.app_version,
            ),
            device_model: string_value(
                "COURIER_NOTIFY_DEVICE_MODEL",
                &section.device_model,
                defaults.device_model,
            ),
            os_version: string_value(
                "COURIER_NOTIFY_OS_VERSION",
                &section.os_version,
                defaults.os_version,
            ),
            fallback_title: string_value(
                "COURIER_NOTIFY_FALLBACK_TITLE",
                &section.fallback_title,
                defaults.fallback_title,
            ),
            fallback_body: string_value(
                "COURIER_NOTIFY_FALLBACK_BODY",
                &section.fallback_body,
                defaults.fallback_body,
            ),
        }
    }

    pub fn dedup(&self) -> DedupConfig {
        DedupConfig {
            ttl: Duration::from_secs(self.dedup_ttl_secs),
            max_entries: self.dedup_max_entries,
        }
    }

    pub fn dedup_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.dedup_sweep_interval_ms)
    }

    pub fn preference_cache(&self) -> PreferenceCacheConfig {
        PreferenceCacheConfig {
            ttl: Duration::from_secs(self.preference_ttl_secs),
            fetch_timeout: Duration::from_millis(self.preference_fetch_timeout_ms),
        }
    }

    pub fn presenter(&self) -> PresenterConfig {
        PresenterConfig {
            fallback_title: self.fallback_title.clone(),
            fallback_body: self.fallback_body.clone(),
        }
    }

    pub fn device_context(&self) -> DeviceContext {
        DeviceContext {
            platform: self.platform,
            locale: self.locale.clone(),
            timezone: self.timezone.clone(),
            device_info: DeviceInfo {
                app_version: self.app_version.clone(),
                device_model: self.device_model.clone(),
                os_version: self.os_version.clone(),
            },
        }
    }
}
