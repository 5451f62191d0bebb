//! 配置管理器 - 负责处理不同环境下的配置覆盖
//!
//! - 根据 `COURIER_ENV` 选择环境
//! - 加载 `config/environments/{env}.toml` 并合并到基础配置

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;

use super::{CourierAppConfig, merge_value};

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    ///
    /// 从环境变量 COURIER_ENV 获取，未设置时默认为 "development"
    pub fn get_environment() -> String {
        env::var("COURIER_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 根据环境加载特定配置
    ///
    /// 加载 config/environments/{environment}.toml，文件不存在时保持基础配置不变
    pub fn load_environment_config(base_config: &mut CourierAppConfig) -> Result<()> {
        let env = Self::get_environment();
        let env_config_path = format!("config/environments/{}.toml", env);

        if !Path::new(&env_config_path).exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&env_config_path)
            .with_context(|| format!("unable to read environment config: {}", env_config_path))?;
        let overlay: Value = toml::from_str(&content)
            .with_context(|| format!("invalid environment config: {}", env_config_path))?;

        *base_config = Self::apply_overlay(base_config, overlay)?;
        Ok(())
    }

    /// 将覆盖配置合并到已有配置上
    ///
    /// 先把现有配置序列化回 TOML 表再合并，保证只覆盖 overlay 中出现的字段
    pub fn apply_overlay(base: &CourierAppConfig, overlay: Value) -> Result<CourierAppConfig> {
        let mut merged = Self::to_value(base);
        merge_value(&mut merged, overlay);
        merged
            .try_into()
            .context("invalid configuration after applying environment overlay")
    }

    fn to_value(cfg: &CourierAppConfig) -> Value {
        let mut root = toml::map::Map::new();

        let mut logging = toml::map::Map::new();
        logging.insert("level".into(), Value::String(cfg.logging.level.clone()));
        logging.insert("json".into(), Value::Boolean(cfg.logging.json));
        logging.insert("with_target".into(), Value::Boolean(cfg.logging.with_target));
        logging.insert(
            "with_thread_ids".into(),
            Value::Boolean(cfg.logging.with_thread_ids),
        );
        logging.insert("with_file".into(), Value::Boolean(cfg.logging.with_file));
        logging.insert(
            "with_line_number".into(),
            Value::Boolean(cfg.logging.with_line_number),
        );
        root.insert("logging".into(), Value::Table(logging));

        let n = &cfg.notify;
        let mut notify = toml::map::Map::new();
        let mut put_int = |key: &str, value: Option<i64>| {
            if let Some(v) = value {
                notify.insert(key.into(), Value::Integer(v));
            }
        };
        put_int("dedup_ttl_secs", n.dedup_ttl_secs.map(|v| v as i64));
        put_int("dedup_max_entries", n.dedup_max_entries.map(|v| v as i64));
        put_int(
            "dedup_sweep_interval_ms",
            n.dedup_sweep_interval_ms.map(|v| v as i64),
        );
        put_int("preference_ttl_secs", n.preference_ttl_secs.map(|v| v as i64));
        put_int(
            "preference_fetch_timeout_ms",
            n.preference_fetch_timeout_ms.map(|v| v as i64),
        );

        let strings = [
            ("token_store_path", &n.token_store_path),
            ("platform", &n.platform),
            ("locale", &n.locale),
            ("timezone", &n.timezone),
            ("app_version", &n.app_version),
            ("device_model", &n.device_model),
            ("os_version", &n.os_version),
            ("fallback_title", &n.fallback_title),
            ("fallback_body", &n.fallback_body),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                notify.insert(key.into(), Value::String(v.clone()));
            }
        }
        root.insert("notify".into(), Value::Table(notify));

        Value::Table(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overlay_keeps_unrelated_fields() {
        let base = CourierAppConfig::from_toml_str(
            r#"
            [logging]
            level = "warn"

            [notify]
            dedup_max_entries = 200
            timezone = "Asia/Shanghai"
            "#,
        )
        .unwrap();

        let overlay: Value = toml::from_str(
            r#"
            [notify]
            dedup_max_entries = 20
            "#,
        )
        .unwrap();

        let merged = ConfigManager::apply_overlay(&base, overlay).unwrap();
        assert_eq!(merged.logging.level, "warn");
        assert_eq!(merged.notify.dedup_max_entries, Some(20));
        assert_eq!(merged.notify.timezone.as_deref(), Some("Asia/Shanghai"));
    }
}
