//! 设备推送 token 模型

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 设备平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ios" | "apns" => Some(Self::Ios),
            "android" | "fcm" => Some(Self::Android),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 本地持久化的设备 token
///
/// `registered_at` 为空表示 token 仅在本地保存、尚未被服务端确认
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub value: String,
    pub platform: Platform,
    #[serde(default)]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_confirmed_at: Option<DateTime<Utc>>,
}

impl DeviceToken {
    /// 未确认的本地 token
    pub fn unconfirmed(value: impl Into<String>, platform: Platform) -> Self {
        Self {
            value: value.into(),
            platform,
            registered_at: None,
            last_confirmed_at: None,
        }
    }

    /// 服务端确认后更新时间戳；首次确认同时写入 registered_at
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        if self.registered_at.is_none() {
            self.registered_at = Some(at);
        }
        self.last_confirmed_at = Some(at);
    }

    pub fn is_confirmed(&self) -> bool {
        self.registered_at.is_some()
    }
}

/// Token 生命周期状态
///
/// UNREGISTERED → REGISTERING → REGISTERED → (REFRESHING → REGISTERED)* → REVOKED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenState {
    Unregistered,
    Registering,
    Registered,
    Refreshing,
    Revoked,
}

/// 设备信息（随注册/更新请求上报）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub app_version: String,
    pub device_model: String,
    pub os_version: String,
}

/// 注册请求所需的设备上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceContext {
    pub platform: Platform,
    pub locale: String,
    pub timezone: String,
    pub device_info: DeviceInfo,
}

/// Token 操作结果（不抛错，由宿主决定是否提示用户）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOperationResult {
    pub success: bool,
    /// 无有效登录态时注册被延后，等待下一次自然触发
    pub deferred: bool,
    pub message: Option<String>,
}

impl TokenOperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            deferred: false,
            message: None,
        }
    }

    pub fn deferred(message: impl Into<String>) -> Self {
        Self {
            success: false,
            deferred: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            deferred: false,
            message: Some(message.into()),
        }
    }
}
