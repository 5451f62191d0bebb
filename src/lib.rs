//! Courier Core 公共库
//!
//! 提供统一的配置加载、错误类型、日志初始化和指标收集功能

pub mod config;
pub mod error;
pub mod metrics;
pub mod tracing;

pub use config::{
    ConfigManager, CourierAppConfig, LoggingConfig, NotifySection, app_config, env_parse,
    load_config,
};
pub use error::*;
pub use metrics::NotifyMetrics;
