//! 设备 token 生命周期管理
//!
//! 注册/刷新/注销三类操作串行执行；任何远端失败都只反映在返回结果里，
//! 不在内部重试，等待下一次自然触发（应用启动、回到前台、token 轮换）。

use std::sync::{Arc, RwLock};

use chrono::Utc;
use courier_core::NotifyMetrics;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::model::{DeviceContext, DeviceToken, TokenOperationResult, TokenState};
use crate::domain::repository::{
    AuthSessionProvider, RegisterTokenRequest, RegistrationRpc, RemoveTokenRequest, TokenStore,
    UpdateTokenRequest,
};

pub struct TokenLifecycleManager {
    store: Arc<dyn TokenStore>,
    rpc: Arc<dyn RegistrationRpc>,
    auth: Arc<dyn AuthSessionProvider>,
    device: DeviceContext,
    state: RwLock<TokenState>,
    op_lock: Mutex<()>,
    metrics: Option<Arc<NotifyMetrics>>,
}

impl TokenLifecycleManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        rpc: Arc<dyn RegistrationRpc>,
        auth: Arc<dyn AuthSessionProvider>,
        device: DeviceContext,
    ) -> Self {
        Self {
            store,
            rpc,
            auth,
            device,
            state: RwLock::new(TokenState::Unregistered),
            op_lock: Mutex::new(()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NotifyMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> TokenState {
        match self.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// 本地持久化的 token
    pub async fn current_token(&self) -> Option<DeviceToken> {
        match self.store.get().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted device token");
                None
            }
        }
    }

    /// 向服务端注册 token
    ///
    /// 无有效登录态时只做本地持久化并返回 deferred
    #[instrument(skip(self, token))]
    pub async fn register(&self, token: &str) -> TokenOperationResult {
        let _op = self.op_lock.lock().await;
        self.register_locked(token).await
    }

    /// 刷新已注册的 token，服务端返回 NOT_FOUND 或更新失败时回退到注册
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &str) -> TokenOperationResult {
        let _op = self.op_lock.lock().await;
        self.refresh_locked(token).await
    }

    /// 注销当前 token（登出）
    ///
    /// 无论远端删除是否成功，本地 token 都会被清除
    #[instrument(skip(self))]
    pub async fn revoke(&self) -> TokenOperationResult {
        let _op = self.op_lock.lock().await;

        let stored = self.current_token().await;
        let result = match stored {
            None => {
                debug!("No persisted device token, nothing to revoke");
                TokenOperationResult::ok()
            }
            Some(token) => {
                let request = RemoveTokenRequest { token: token.value };
                match self.rpc.remove_token(request).await {
                    Ok(resp) if resp.success => {
                        self.record_rpc("remove", "success");
                        TokenOperationResult::ok()
                    }
                    Ok(_) => {
                        self.record_rpc("remove", "rejected");
                        warn!("Server rejected device token removal");
                        TokenOperationResult::failed("remove_token rejected by server")
                    }
                    Err(e) => {
                        self.record_rpc("remove", "error");
                        warn!(error = %e, "Device token removal failed");
                        TokenOperationResult::failed(e.to_string())
                    }
                }
            }
        };

        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear persisted device token");
            self.set_state(TokenState::Unregistered);
            return TokenOperationResult::failed(format!(
                "device token still persisted locally: {e}"
            ));
        }
        self.set_state(TokenState::Revoked);
        info!(success = result.success, "Device token revoked locally");
        result
    }

    /// 平台 SDK 轮换了 token
    ///
    /// 刷新失败时新 token 仍会落盘，下一次触发时重试
    #[instrument(skip(self, new_token))]
    pub async fn on_token_rotated(&self, new_token: &str) -> TokenOperationResult {
        let _op = self.op_lock.lock().await;

        let result = self.refresh_locked(new_token).await;
        if !result.success {
            let persisted = self
                .current_token()
                .await
                .is_some_and(|t| t.value == new_token);
            if !persisted {
                self.persist(&DeviceToken::unconfirmed(new_token, self.device.platform))
                    .await;
            }
        }
        result
    }

    /// 应用启动：刷新本地已有的 token
    pub async fn sync_persisted_token(&self) -> Option<TokenOperationResult> {
        let _op = self.op_lock.lock().await;

        let stored = self.current_token().await?;
        debug!(confirmed = stored.is_confirmed(), "Syncing persisted device token");
        Some(self.refresh_locked(&stored.value).await)
    }

    /// 回到前台：仅当 token 尚未被服务端确认时重试
    pub async fn retry_unconfirmed(&self) -> Option<TokenOperationResult> {
        let _op = self.op_lock.lock().await;

        if self.state() == TokenState::Registered {
            return None;
        }
        let stored = self.current_token().await?;
        info!(confirmed = stored.is_confirmed(), "Retrying pending device token registration");
        Some(self.refresh_locked(&stored.value).await)
    }

    async fn register_locked(&self, token: &str) -> TokenOperationResult {
        if self.auth.valid_token().is_none() {
            info!("No valid auth session, device token registration deferred");
            self.persist(&DeviceToken::unconfirmed(token, self.device.platform))
                .await;
            self.set_state(TokenState::Unregistered);
            return TokenOperationResult::deferred("no valid auth session");
        }

        self.set_state(TokenState::Registering);
        let request = RegisterTokenRequest {
            token: token.to_string(),
            platform: self.device.platform,
            locale: self.device.locale.clone(),
            timezone: self.device.timezone.clone(),
            device_info: self.device.device_info.clone(),
        };

        let outcome = self.rpc.register_token(request).await;
        match outcome {
            Ok(resp) if resp.success => {
                self.record_rpc("register", "success");
                let mut confirmed = DeviceToken::unconfirmed(token, self.device.platform);
                confirmed.confirm(Utc::now());
                self.persist(&confirmed).await;
                self.set_state(TokenState::Registered);
                info!(platform = %self.device.platform, "Device token registered");
                TokenOperationResult::ok()
            }
            Ok(resp) => {
                self.record_rpc("register", "rejected");
                let message = resp
                    .message
                    .unwrap_or_else(|| "register_token rejected by server".to_string());
                warn!(reason = %message, "Device token registration rejected");
                self.persist(&DeviceToken::unconfirmed(token, self.device.platform))
                    .await;
                self.set_state(TokenState::Unregistered);
                TokenOperationResult::failed(message)
            }
            Err(e) => {
                self.record_rpc("register", "error");
                warn!(error = %e, "Device token registration failed");
                self.persist(&DeviceToken::unconfirmed(token, self.device.platform))
                    .await;
                self.set_state(TokenState::Unregistered);
                TokenOperationResult::failed(e.to_string())
            }
        }
    }

    async fn refresh_locked(&self, token: &str) -> TokenOperationResult {
        if self.auth.valid_token().is_none() {
            return self.register_locked(token).await;
        }

        self.set_state(TokenState::Refreshing);
        let request = UpdateTokenRequest {
            token: token.to_string(),
            device_info: self.device.device_info.clone(),
        };

        match self.rpc.update_token(request).await {
            Ok(resp) if resp.success => {
                self.record_rpc("update", "success");
                let mut confirmed = match self.current_token().await {
                    Some(existing) if existing.value == token => existing,
                    _ => DeviceToken::unconfirmed(token, self.device.platform),
                };
                confirmed.confirm(Utc::now());
                self.persist(&confirmed).await;
                self.set_state(TokenState::Registered);
                debug!("Device token refreshed");
                TokenOperationResult::ok()
            }
            Ok(resp) if resp.is_token_not_found() => {
                self.record_rpc("update", "not_found");
                info!("Server no longer knows device token, falling back to register");
                self.register_locked(token).await
            }
            Ok(resp) => {
                self.record_rpc("update", "rejected");
                warn!(
                    error_code = resp.error_code.as_deref().unwrap_or("-"),
                    "Device token update rejected, falling back to register"
                );
                self.register_locked(token).await
            }
            Err(e) => {
                self.record_rpc("update", "error");
                warn!(error = %e, "Device token update failed, falling back to register");
                self.register_locked(token).await
            }
        }
    }

    async fn persist(&self, token: &DeviceToken) {
        if let Err(e) = self.store.set(token).await {
            warn!(error = %e, "Failed to persist device token");
        }
    }

    fn set_state(&self, next: TokenState) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = *guard;
        if previous != next {
            debug!(from = ?previous, to = ?next, "Token state transition");
            *guard = next;
        }
    }

    fn record_rpc(&self, operation: &str, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics
                .token_rpc_total
                .with_label_values(&[operation, outcome])
                .inc();
        }
    }
}
