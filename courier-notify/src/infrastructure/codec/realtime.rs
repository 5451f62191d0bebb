//! 实时长连接载荷归一化
//!
//! 典型载荷：
//! `{"id":"n-1","type":"CHAT","title":"..","content":"..","priority":"high","data":{..}}`

use serde_json::Value;

use super::{NormalizeError, first_string, flatten_payload};
use crate::domain::model::{Category, NotificationMessage, Priority, SourceChannel};

pub fn normalize_realtime(raw: &Value) -> Result<NotificationMessage, NormalizeError> {
    let object = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let id = first_string(object, &["id", "messageId", "notificationId"])?
        .ok_or(NormalizeError::MissingId)?;

    let category = first_string(object, &["category", "type"])?
        .map(|c| Category::parse(&c))
        .unwrap_or(Category::System);
    let priority = first_string(object, &["priority"])?
        .map(|p| Priority::parse(&p))
        .unwrap_or_default();
    let title = first_string(object, &["title"])?.unwrap_or_default();
    let body = first_string(object, &["body", "content", "message"])?.unwrap_or_default();

    let mut payload = match object.get("data") {
        Some(Value::Object(data)) => flatten_payload(data),
        Some(Value::Null) | None => Default::default(),
        Some(_) => return Err(NormalizeError::InvalidField { field: "data" }),
    };
    payload.insert("messageId".to_string(), id.clone());

    Ok(NotificationMessage::new(id, category, priority, SourceChannel::Realtime)
        .with_content(title, body)
        .with_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_payload() {
        let raw = json!({
            "id": "n-1",
            "type": "CHAT",
            "title": "New message",
            "content": "Your courier is here",
            "priority": "high",
            "data": { "orderId": "o-9", "route": "/orders/o-9" }
        });

        let msg = normalize_realtime(&raw).unwrap();
        assert_eq!(msg.id, "n-1");
        assert_eq!(msg.category, Category::Chat);
        assert_eq!(msg.priority, Priority::High);
        assert_eq!(msg.body, "Your courier is here");
        assert_eq!(msg.source_channel, SourceChannel::Realtime);
        assert_eq!(msg.payload.get("orderId").map(String::as_str), Some("o-9"));
        assert_eq!(msg.payload.get("messageId").map(String::as_str), Some("n-1"));
    }

    #[test]
    fn test_numeric_id_is_accepted() {
        let msg = normalize_realtime(&json!({ "messageId": 42, "title": "x" })).unwrap();
        assert_eq!(msg.id, "42");
        assert_eq!(msg.category, Category::System);
        assert_eq!(msg.priority, Priority::Normal);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert_eq!(
            normalize_realtime(&json!({ "title": "no id" })),
            Err(NormalizeError::MissingId)
        );
        assert_eq!(
            normalize_realtime(&json!({ "id": "  " })),
            Err(NormalizeError::MissingId)
        );
        assert_eq!(
            normalize_realtime(&json!(["not", "an", "object"])),
            Err(NormalizeError::NotAnObject)
        );
    }

    #[test]
    fn test_invalid_field_type_is_rejected() {
        assert_eq!(
            normalize_realtime(&json!({ "id": {"nested": true} })),
            Err(NormalizeError::InvalidField { field: "id" })
        );
    }
}
