//! 无外部依赖的协作者实现（演示宿主与本地调试使用）

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::error::Result;
use tracing::info;

use crate::domain::model::{DisplayRequest, NotificationSettings};
use crate::domain::repository::{
    AuthSessionProvider, DeviceTokenSource, NotificationRenderer, PreferencesRpc,
    RegisterTokenRequest, RegisterTokenResponse, RegistrationRpc, RemoveTokenRequest,
    RemoveTokenResponse, UpdateTokenRequest, UpdateTokenResponse,
};

/// 只打日志的渲染器
pub struct LoggingRenderer;

impl LoggingRenderer {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl NotificationRenderer for LoggingRenderer {
    async fn display(&self, request: DisplayRequest) -> Result<()> {
        info!(
            notification_id = %request.notification_id,
            channel_id = %request.channel_id,
            importance = ?request.importance,
            title = %request.title,
            body = %request.body,
            "Local notification displayed"
        );
        Ok(())
    }
}

/// 总是成功的注册 RPC
pub struct NoopRegistrationRpc;

#[async_trait]
impl RegistrationRpc for NoopRegistrationRpc {
    async fn register_token(&self, request: RegisterTokenRequest) -> Result<RegisterTokenResponse> {
        info!(platform = %request.platform, "noop register_token invoked");
        Ok(RegisterTokenResponse {
            success: true,
            message: None,
        })
    }

    async fn update_token(&self, _request: UpdateTokenRequest) -> Result<UpdateTokenResponse> {
        info!("noop update_token invoked");
        Ok(UpdateTokenResponse {
            success: true,
            error_code: None,
            message: None,
        })
    }

    async fn remove_token(&self, _request: RemoveTokenRequest) -> Result<RemoveTokenResponse> {
        info!("noop remove_token invoked");
        Ok(RemoveTokenResponse { success: true })
    }
}

/// 返回空设置的偏好 RPC（所有分类走默认值）
pub struct NoopPreferencesRpc;

#[async_trait]
impl PreferencesRpc for NoopPreferencesRpc {
    async fn get_notification_settings(&self, _user_id: &str) -> Result<NotificationSettings> {
        Ok(NotificationSettings::default())
    }
}

/// 固定登录态
pub struct StaticAuthSession {
    user_id: Option<String>,
}

impl StaticAuthSession {
    pub fn signed_in(user_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            user_id: Some(user_id.into()),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self { user_id: None })
    }
}

impl AuthSessionProvider for StaticAuthSession {
    fn valid_token(&self) -> Option<String> {
        self.user_id.as_ref().map(|id| format!("session-{id}"))
    }

    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

/// 固定设备 token 来源
pub struct StaticTokenSource {
    token: Option<String>,
}

impl StaticTokenSource {
    pub fn new(token: Option<String>) -> Arc<Self> {
        Arc::new(Self { token })
    }
}

#[async_trait]
impl DeviceTokenSource for StaticTokenSource {
    async fn current_token(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}
