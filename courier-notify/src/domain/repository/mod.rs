//! 仓储/外部协作者接口（Port）

use async_trait::async_trait;
use courier_core::error::Result;
use serde::{Deserialize, Serialize};

use crate::domain::model::{
    AppLifecycleState, DeviceInfo, DeviceToken, DisplayRequest, NotificationSettings, Platform,
};

/// 更新接口返回的"token 不存在"错误码
pub const TOKEN_NOT_FOUND: &str = "NOT_FOUND";

/// 本地 token 存储
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<DeviceToken>>;
    async fn set(&self, token: &DeviceToken) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    pub token: String,
    pub platform: Platform,
    pub locale: String,
    pub timezone: String,
    pub device_info: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterTokenResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTokenRequest {
    pub token: String,
    pub device_info: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTokenResponse {
    pub success: bool,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UpdateTokenResponse {
    /// 服务端已清理该注册（需回退到重新注册）
    pub fn is_token_not_found(&self) -> bool {
        self.error_code.as_deref() == Some(TOKEN_NOT_FOUND)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveTokenResponse {
    pub success: bool,
}

/// 设备 token 注册 RPC
#[async_trait]
pub trait RegistrationRpc: Send + Sync {
    async fn register_token(&self, request: RegisterTokenRequest) -> Result<RegisterTokenResponse>;
    async fn update_token(&self, request: UpdateTokenRequest) -> Result<UpdateTokenResponse>;
    async fn remove_token(&self, request: RemoveTokenRequest) -> Result<RemoveTokenResponse>;
}

/// 用户通知偏好 RPC
#[async_trait]
pub trait PreferencesRpc: Send + Sync {
    async fn get_notification_settings(&self, user_id: &str) -> Result<NotificationSettings>;
}

/// 平台本地通知渲染器
#[async_trait]
pub trait NotificationRenderer: Send + Sync {
    async fn display(&self, request: DisplayRequest) -> Result<()>;
}

/// 登录态提供者（同步可用性检查）
pub trait AuthSessionProvider: Send + Sync {
    /// 有效的会话 token，未登录或已过期时返回 None
    fn valid_token(&self) -> Option<String>;

    /// 当前用户 ID
    fn current_user_id(&self) -> Option<String>;
}

/// 应用生命周期提供者
pub trait AppLifecycleProvider: Send + Sync {
    fn current_state(&self) -> AppLifecycleState;
}

/// 平台推送 SDK 的 token 来源
#[async_trait]
pub trait DeviceTokenSource: Send + Sync {
    async fn current_token(&self) -> Result<Option<String>>;
}
