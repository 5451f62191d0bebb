// 集成测试共用的协作者替身：记录调用、按脚本返回
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use courier_core::error::{ErrorBuilder, ErrorCode, Result};
use courier_notify::config::NotifyServiceConfig;
use courier_notify::domain::model::{AppLifecycleState, DisplayRequest, NotificationSettings};
use courier_notify::domain::repository::{
    AuthSessionProvider, DeviceTokenSource, NotificationRenderer, PreferencesRpc,
    RegisterTokenRequest, RegisterTokenResponse, RegistrationRpc, RemoveTokenRequest,
    RemoveTokenResponse, TokenStore, UpdateTokenRequest, UpdateTokenResponse,
};
use courier_notify::infrastructure::{InMemoryTokenStore, SharedAppLifecycle};
use courier_notify::service::{ApplicationContext, PlatformBindings, initialize_with};
use prometheus::Registry;

#[derive(Default)]
pub struct RecordingRenderer {
    pub requests: Mutex<Vec<DisplayRequest>>,
    pub fail: Mutex<bool>,
}

impl RecordingRenderer {
    pub fn presented_ids(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.payload.get("messageId").cloned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationRenderer for RecordingRenderer {
    async fn display(&self, request: DisplayRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request);
        if *self.fail.lock().unwrap() {
            return Err(ErrorBuilder::new(ErrorCode::Internal, "renderer unavailable").build_error());
        }
        Ok(())
    }
}

/// 按脚本返回的注册 RPC
pub struct ScriptedRegistrationRpc {
    pub register: Mutex<Option<RegisterTokenResponse>>,
    pub update: Mutex<Option<UpdateTokenResponse>>,
    pub remove: Mutex<Option<RemoveTokenResponse>>,
    pub calls: Mutex<Vec<String>>,
}

impl Default for ScriptedRegistrationRpc {
    fn default() -> Self {
        Self {
            register: Mutex::new(Some(RegisterTokenResponse {
                success: true,
                message: None,
            })),
            update: Mutex::new(Some(UpdateTokenResponse {
                success: true,
                error_code: None,
                message: None,
            })),
            remove: Mutex::new(Some(RemoveTokenResponse { success: true })),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedRegistrationRpc {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn unavailable() -> courier_core::error::CourierError {
        ErrorBuilder::new(ErrorCode::ServiceUnavailable, "registration service unreachable")
            .build_error()
    }
}

#[async_trait]
impl RegistrationRpc for ScriptedRegistrationRpc {
    async fn register_token(&self, request: RegisterTokenRequest) -> Result<RegisterTokenResponse> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("register:{}", request.token));
        self.register.lock().unwrap().clone().ok_or_else(Self::unavailable)
    }

    async fn update_token(&self, request: UpdateTokenRequest) -> Result<UpdateTokenResponse> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("update:{}", request.token));
        self.update.lock().unwrap().clone().ok_or_else(Self::unavailable)
    }

    async fn remove_token(&self, request: RemoveTokenRequest) -> Result<RemoveTokenResponse> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("remove:{}", request.token));
        self.remove.lock().unwrap().clone().ok_or_else(Self::unavailable)
    }
}

#[derive(Default)]
pub struct MutablePreferencesRpc {
    pub settings: Mutex<NotificationSettings>,
    pub calls: Mutex<usize>,
}

#[async_trait]
impl PreferencesRpc for MutablePreferencesRpc {
    async fn get_notification_settings(&self, _user_id: &str) -> Result<NotificationSettings> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.settings.lock().unwrap().clone())
    }
}

/// 可切换登录态
pub struct SwitchableAuth {
    user_id: Mutex<Option<String>>,
}

impl SwitchableAuth {
    pub fn new(user_id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            user_id: Mutex::new(user_id.map(str::to_string)),
        })
    }

    pub fn sign_in(&self, user_id: &str) {
        *self.user_id.lock().unwrap() = Some(user_id.to_string());
    }
}

impl AuthSessionProvider for SwitchableAuth {
    fn valid_token(&self) -> Option<String> {
        self.user_id
            .lock()
            .unwrap()
            .as_ref()
            .map(|id| format!("session-{id}"))
    }

    fn current_user_id(&self) -> Option<String> {
        self.user_id.lock().unwrap().clone()
    }
}

pub struct FixedTokenSource(pub Option<String>);

#[async_trait]
impl DeviceTokenSource for FixedTokenSource {
    async fn current_token(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

pub struct TestHost {
    pub context: ApplicationContext,
    pub renderer: Arc<RecordingRenderer>,
    pub registration: Arc<ScriptedRegistrationRpc>,
    pub preferences: Arc<MutablePreferencesRpc>,
    pub auth: Arc<SwitchableAuth>,
    pub lifecycle: Arc<SharedAppLifecycle>,
    pub store: Arc<InMemoryTokenStore>,
}

impl TestHost {
    pub fn signed_in() -> Self {
        Self::build(Some("u-1"), None)
    }

    pub fn build(user_id: Option<&str>, device_token: Option<&str>) -> Self {
        let renderer = Arc::new(RecordingRenderer::default());
        let registration = Arc::new(ScriptedRegistrationRpc::default());
        let preferences = Arc::new(MutablePreferencesRpc::default());
        let auth = SwitchableAuth::new(user_id);
        let lifecycle = SharedAppLifecycle::new(AppLifecycleState::Foreground);
        let store = InMemoryTokenStore::shared();

        let bindings = PlatformBindings {
            renderer: renderer.clone(),
            registration_rpc: registration.clone(),
            preferences_rpc: preferences.clone(),
            auth: auth.clone(),
            lifecycle: lifecycle.clone(),
            token_source: Arc::new(FixedTokenSource(device_token.map(str::to_string))),
            token_store: Some(store.clone() as Arc<dyn TokenStore>),
        };

        let context = initialize_with(NotifyServiceConfig::default(), bindings, &Registry::new())
            .expect("wiring with a fresh registry");

        Self {
            context,
            renderer,
            registration,
            preferences,
            auth,
            lifecycle,
            store,
        }
    }

    pub fn app(&self) -> &courier_notify::NotificationApplication {
        &self.context.application
    }
}
