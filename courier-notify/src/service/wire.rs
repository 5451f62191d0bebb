//! Wire 风格的依赖注入模块
//!
//! 宿主平台提供外部协作者，其余组件按依赖顺序在这里构建

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_core::NotifyMetrics;
use courier_core::config::CourierAppConfig;
use prometheus::Registry;

use crate::application::NotificationApplication;
use crate::config::NotifyServiceConfig;
use crate::domain::repository::{
    AppLifecycleProvider, AuthSessionProvider, DeviceTokenSource, NotificationRenderer,
    PreferencesRpc, RegistrationRpc, TokenStore,
};
use crate::domain::service::{ChannelArbiter, Presenter, TokenLifecycleManager};
use crate::infrastructure::{DedupRegistry, PreferenceCache, build_token_store};

/// 宿主平台提供的协作者
pub struct PlatformBindings {
    pub renderer: Arc<dyn NotificationRenderer>,
    pub registration_rpc: Arc<dyn RegistrationRpc>,
    pub preferences_rpc: Arc<dyn PreferencesRpc>,
    pub auth: Arc<dyn AuthSessionProvider>,
    pub lifecycle: Arc<dyn AppLifecycleProvider>,
    pub token_source: Arc<dyn DeviceTokenSource>,
    /// 为空时按配置构建（文件或内存存储）
    pub token_store: Option<Arc<dyn TokenStore>>,
}

/// 应用上下文 - 包含所有已初始化的服务
pub struct ApplicationContext {
    pub application: Arc<NotificationApplication>,
    pub metrics: Arc<NotifyMetrics>,
    pub config: Arc<NotifyServiceConfig>,
}

/// 从全局配置构建应用上下文（指标注册到独立注册表）
pub fn initialize(
    app_config: &CourierAppConfig,
    bindings: PlatformBindings,
) -> Result<ApplicationContext> {
    let config = NotifyServiceConfig::from_app_config(app_config);
    initialize_with(config, bindings, &Registry::new())
}

/// 按照依赖顺序构建所有组件
pub fn initialize_with(
    config: NotifyServiceConfig,
    bindings: PlatformBindings,
    registry: &Registry,
) -> Result<ApplicationContext> {
    let config = Arc::new(config);

    // 1. 指标
    let metrics = Arc::new(
        NotifyMetrics::new(registry).context("Failed to register notification metrics")?,
    );

    // 2. 去重与偏好缓存
    let dedup = Arc::new(DedupRegistry::new(config.dedup()).with_metrics(metrics.clone()));
    let preferences = Arc::new(
        PreferenceCache::new(bindings.preferences_rpc, config.preference_cache())
            .with_metrics(metrics.clone()),
    );

    // 3. 展示与仲裁
    let presenter = Arc::new(
        Presenter::new(bindings.renderer, config.presenter()).with_metrics(metrics.clone()),
    );
    let arbiter = Arc::new(
        ChannelArbiter::new(
            dedup.clone(),
            preferences.clone(),
            presenter,
            bindings.auth.clone(),
            bindings.lifecycle,
        )
        .with_metrics(metrics.clone()),
    );

    // 4. token 生命周期
    let token_store = bindings
        .token_store
        .unwrap_or_else(|| build_token_store(&config));
    let tokens = Arc::new(
        TokenLifecycleManager::new(
            token_store,
            bindings.registration_rpc,
            bindings.auth,
            config.device_context(),
        )
        .with_metrics(metrics.clone()),
    );

    // 5. 应用服务
    let application = Arc::new(NotificationApplication::new(
        arbiter,
        tokens,
        preferences,
        dedup,
        bindings.token_source,
        config.dedup_sweep_interval(),
        metrics.clone(),
    ));

    Ok(ApplicationContext {
        application,
        metrics,
        config,
    })
}
