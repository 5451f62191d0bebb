//! Courier Core 配置模块
//!
//! 该模块提供了应用程序配置管理功能，包括：
//! - 配置文件/配置目录加载和解析
//! - 环境特定配置覆盖
//! - 日志与通知编排配置定义

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<CourierAppConfig> = OnceLock::new();

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default)]
    pub with_file: bool,
    #[serde(default)]
    pub with_line_number: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// 通知编排配置段 `[notify]`
///
/// 所有字段可选，缺省值由服务侧配置（`NotifyServiceConfig`）决定
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifySection {
    /// 去重记录 TTL（秒）
    #[serde(default)]
    pub dedup_ttl_secs: Option<u64>,
    /// 去重记录最大条数
    #[serde(default)]
    pub dedup_max_entries: Option<usize>,
    /// 过期清理间隔（毫秒）
    #[serde(default)]
    pub dedup_sweep_interval_ms: Option<u64>,
    /// 偏好缓存 TTL（秒）
    #[serde(default)]
    pub preference_ttl_secs: Option<u64>,
    /// 偏好拉取超时（毫秒）
    #[serde(default)]
    pub preference_fetch_timeout_ms: Option<u64>,
    /// 本地 token 持久化文件路径（未配置则仅内存保存）
    #[serde(default)]
    pub token_store_path: Option<String>,
    /// 设备平台："ios" | "android"
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub device_model: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    /// 渲染失败时的兜底标题/正文
    #[serde(default)]
    pub fallback_title: Option<String>,
    #[serde(default)]
    pub fallback_body: Option<String>,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CourierAppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notify: NotifySection,
}

impl CourierAppConfig {
    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: CourierAppConfig =
            toml::from_str(content).context("invalid courier configuration")?;
        Ok(cfg)
    }

    pub fn notify(&self) -> &NotifySection {
        &self.notify
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }
}

/// 加载配置（全局只加载一次）
///
/// 查找顺序：显式路径 > `config/` 目录 > `config/courier.toml` > `courier.toml`
pub fn load_config(path: Option<&str>) -> &'static CourierAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![
            PathBuf::from("config"),
            PathBuf::from("config/courier.toml"),
            PathBuf::from("courier.toml"),
        ],
    };

    APP_CONFIG.get_or_init(|| {
        let mut cfg = load_with_fallback(&candidates);
        if let Err(e) = ConfigManager::load_environment_config(&mut cfg) {
            warn!("failed to load environment config: {}", e);
        }
        cfg
    })
}

/// 获取已加载的应用配置
pub fn app_config() -> Option<&'static CourierAppConfig> {
    APP_CONFIG.get()
}

fn load_with_fallback(candidates: &[PathBuf]) -> CourierAppConfig {
    for path in candidates {
        match load_config_from_source(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    CourierAppConfig::default()
}

fn load_config_from_source(path: &Path) -> Result<CourierAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_config_from_file(path)
    }
}

fn load_config_from_file(path: &Path) -> Result<CourierAppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file: {}", path.display()))?;
    CourierAppConfig::from_toml_str(&content)
        .with_context(|| format!("invalid config format: {}", path.display()))
}

/// 目录模式：`courier.toml` 为基础，`overrides/*.toml` 按文件名顺序覆盖
fn load_config_from_directory(path: &Path) -> Result<CourierAppConfig> {
    let base_file = path.join("courier.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;
    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("overrides"))?;

    let cfg: CourierAppConfig = merged
        .try_into()
        .with_context(|| format!("invalid configuration after merging {}", path.display()))?;

    Ok(cfg)
}

fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 递归合并 TOML 值（overlay 覆盖 base）
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}

/// 读取环境变量并解析，解析失败视为未设置
pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notify_section() {
        let cfg = CourierAppConfig::from_toml_str(
            r#"
            [logging]
            level = "debug"
            json = true

            [notify]
            dedup_ttl_secs = 120
            dedup_max_entries = 50
            platform = "ios"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
        assert_eq!(cfg.notify.dedup_ttl_secs, Some(120));
        assert_eq!(cfg.notify.dedup_max_entries, Some(50));
        assert_eq!(cfg.notify.platform.as_deref(), Some("ios"));
        assert!(cfg.notify.preference_ttl_secs.is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = CourierAppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.logging.with_target);
        assert!(cfg.notify.token_store_path.is_none());
    }

    #[test]
    fn test_merge_value_overrides_nested_tables() {
        let mut base: Value = toml::from_str(
            r#"
            [notify]
            dedup_ttl_secs = 300
            locale = "en-US"
            "#,
        )
        .unwrap();
        let overlay: Value = toml::from_str(
            r#"
            [notify]
            dedup_ttl_secs = 60
            "#,
        )
        .unwrap();

        merge_value(&mut base, overlay);
        let cfg: CourierAppConfig = base.try_into().unwrap();
        assert_eq!(cfg.notify.dedup_ttl_secs, Some(60));
        assert_eq!(cfg.notify.locale.as_deref(), Some("en-US"));
    }
}
