// 通道仲裁端到端场景：原始载荷 → 归一化 → 仲裁 → 渲染
mod common;

use common::TestHost;
use courier_notify::domain::model::{AppLifecycleState, NotificationSettings, PresentResult};
use courier_notify::domain::service::{ArbitrationOutcome, DropReason};
use serde_json::json;

fn realtime(id: &str, category: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": category,
        "title": "Order update",
        "content": "Your courier picked up the order",
        "priority": "high",
        "data": { "orderId": "o-1" }
    })
}

fn push(id: &str, category: &str) -> serde_json::Value {
    json!({
        "messageId": format!("0:{id}-delivery"),
        "notification": { "title": "Order update", "body": "Your courier picked up the order" },
        "data": { "notificationId": id, "category": category, "priority": "high" }
    })
}

#[tokio::test]
async fn test_cross_channel_duplicate_presented_once() {
    let host = TestHost::signed_in();

    let first = host.app().on_realtime_message(&realtime("n-1", "CHAT")).await;
    let second = host.app().on_push_message(&push("n-1", "CHAT")).await;

    assert_eq!(first, ArbitrationOutcome::Presented(PresentResult::Presented));
    assert_eq!(second, ArbitrationOutcome::Dropped(DropReason::Duplicate));
    assert_eq!(host.renderer.presented_ids(), vec!["n-1"]);
    assert_eq!(host.context.metrics.dropped("push", "duplicate"), 1);
}

#[tokio::test]
async fn test_push_first_then_realtime_is_duplicate() {
    let host = TestHost::signed_in();

    assert!(host.app().on_push_message(&push("n-2", "SYSTEM")).await.is_presented());
    assert_eq!(
        host.app().on_realtime_message(&realtime("n-2", "SYSTEM")).await,
        ArbitrationOutcome::Dropped(DropReason::Duplicate)
    );
    assert_eq!(host.renderer.count(), 1);
}

#[tokio::test]
async fn test_background_realtime_never_presented_but_push_is() {
    let host = TestHost::signed_in();
    host.lifecycle.set(AppLifecycleState::Background);

    let realtime_outcome = host.app().on_realtime_message(&realtime("n-3", "CHAT")).await;
    assert_eq!(
        realtime_outcome,
        ArbitrationOutcome::Dropped(DropReason::Background)
    );
    assert_eq!(host.renderer.count(), 0);

    let push_outcome = host.app().on_push_message(&push("n-3", "CHAT")).await;
    assert!(push_outcome.is_presented());

    let requests = host.renderer.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].payload.get("appState").map(String::as_str),
        Some("background")
    );
}

#[tokio::test]
async fn test_preference_drop_does_not_consume_dedup_slot() {
    let host = TestHost::signed_in();
    *host.preferences.settings.lock().unwrap() = NotificationSettings {
        promotions: Some(false),
        ..Default::default()
    };

    let blocked = host.app().on_push_message(&push("n-4", "PROMOTION")).await;
    assert_eq!(blocked, ArbitrationOutcome::Dropped(DropReason::PreferenceBlocked));
    assert_eq!(host.app().dedup_entries(), 0);

    host.preferences.settings.lock().unwrap().promotions = Some(true);
    host.app().invalidate_preference_cache().await;

    let replay = host.app().on_push_message(&push("n-4", "PROMOTION")).await;
    assert!(replay.is_presented());
    assert_eq!(host.renderer.presented_ids(), vec!["n-4"]);
}

#[tokio::test]
async fn test_signed_out_uses_default_preferences() {
    let host = TestHost::build(None, None);

    let chat = host.app().on_push_message(&push("n-5", "CHAT")).await;
    let marketing = host.app().on_push_message(&push("n-6", "MARKETING")).await;

    assert!(chat.is_presented());
    assert_eq!(marketing.drop_reason(), Some(DropReason::PreferenceBlocked));
    assert_eq!(*host.preferences.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_preferences_cached_across_messages() {
    let host = TestHost::signed_in();

    for id in ["n-7", "n-8", "n-9"] {
        assert!(host.app().on_push_message(&push(id, "CHAT")).await.is_presented());
    }
    assert_eq!(*host.preferences.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_renderer_failure_falls_back_once() {
    let host = TestHost::signed_in();
    *host.renderer.fail.lock().unwrap() = true;

    let outcome = host.app().on_realtime_message(&realtime("n-10", "CHAT")).await;
    assert_eq!(outcome, ArbitrationOutcome::Presented(PresentResult::Failed));
    assert_eq!(host.renderer.count(), 2);

    let again = host.app().on_push_message(&push("n-10", "CHAT")).await;
    assert_eq!(again.drop_reason(), Some(DropReason::Duplicate));
    assert_eq!(host.renderer.count(), 2);
}

#[tokio::test]
async fn test_malformed_payload_dropped_at_ingestion() {
    let host = TestHost::signed_in();

    let outcome = host
        .app()
        .on_realtime_message(&json!({ "title": "missing id" }))
        .await;
    assert_eq!(outcome.drop_reason(), Some(DropReason::Malformed));

    let outcome = host.app().on_push_message(&json!(["not", "an", "object"])).await;
    assert_eq!(outcome.drop_reason(), Some(DropReason::Malformed));
    assert_eq!(host.renderer.count(), 0);
    assert_eq!(host.context.metrics.dropped("push", "malformed"), 1);
}

#[tokio::test]
async fn test_shutdown_clears_dedup_state() {
    let host = TestHost::signed_in();
    host.app().initialize();

    assert!(host.app().on_push_message(&push("n-11", "CHAT")).await.is_presented());
    assert_eq!(host.app().dedup_entries(), 1);

    host.app().shutdown();
    assert_eq!(host.app().dedup_entries(), 0);
}
