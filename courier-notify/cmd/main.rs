//! # Courier Notify 演示宿主
//!
//! 从标准输入逐行读取 JSON 事件：
//! `{"channel":"realtime"|"push","app_state":"foreground"|"background","payload":{..}}`

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_core::load_config;
use courier_core::tracing::init_tracing_from_config;
use courier_notify::domain::model::AppLifecycleState;
use courier_notify::infrastructure::SharedAppLifecycle;
use courier_notify::infrastructure::noop::{
    LoggingRenderer, NoopPreferencesRpc, NoopRegistrationRpc, StaticAuthSession,
    StaticTokenSource,
};
use courier_notify::service::{PlatformBindings, initialize};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct Envelope {
    channel: String,
    #[serde(default)]
    app_state: Option<String>,
    payload: Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_dir = std::env::var("COURIER_CONFIG").ok();
    let app_config = load_config(config_dir.as_deref());
    init_tracing_from_config(Some(app_config.logging()));

    let lifecycle = SharedAppLifecycle::new(AppLifecycleState::Foreground);
    let user_id = std::env::var("COURIER_DEMO_USER").unwrap_or_else(|_| "demo-user".to_string());

    let bindings = PlatformBindings {
        renderer: LoggingRenderer::shared(),
        registration_rpc: Arc::new(NoopRegistrationRpc),
        preferences_rpc: Arc::new(NoopPreferencesRpc),
        auth: StaticAuthSession::signed_in(user_id),
        lifecycle: lifecycle.clone(),
        token_source: StaticTokenSource::new(std::env::var("COURIER_DEMO_DEVICE_TOKEN").ok()),
        token_store: None,
    };

    let context = initialize(app_config, bindings).context("Failed to wire notification orchestrator")?;
    let app = context.application;
    app.initialize();

    let registration = app.register_device_token().await;
    info!(
        success = registration.success,
        deferred = registration.deferred,
        "Device token registration attempted"
    );

    info!("Reading notification envelopes from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope: Envelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Skipping invalid envelope");
                continue;
            }
        };

        if let Some(state) = envelope.app_state.as_deref().and_then(AppLifecycleState::parse) {
            lifecycle.set(state);
        }

        let outcome = match envelope.channel.as_str() {
            "realtime" => app.on_realtime_message(&envelope.payload).await,
            "push" => app.on_push_message(&envelope.payload).await,
            other => {
                warn!(channel = other, "Unknown channel in envelope");
                continue;
            }
        };
        info!(channel = %envelope.channel, outcome = ?outcome, "Envelope processed");
    }

    app.shutdown();
    info!(metrics = %context.metrics.gather_text(), "Input exhausted, shutting down");
    Ok(())
}
