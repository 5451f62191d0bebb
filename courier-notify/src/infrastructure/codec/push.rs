//! 第三方推送载荷归一化
//!
//! 推送服务的 `messageId` 是投递层 ID，每次投递都不同；跨通道稳定的逻辑 ID
//! 放在 `data.notificationId` 中，因此优先使用 data 中的 ID。
//!
//! 典型载荷：
//! `{"messageId":"0:1699..","notification":{"title":"..","body":".."},
//!   "data":{"notificationId":"n-1","category":"PROMOTION","priority":"low"}}`

use serde_json::{Map, Value};

use super::{NormalizeError, first_string, flatten_payload};
use crate::domain::model::{Category, NotificationMessage, Priority, SourceChannel};

pub fn normalize_push(raw: &Value) -> Result<NotificationMessage, NormalizeError> {
    let object = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let empty = Map::new();
    let data = match object.get("data") {
        Some(Value::Object(data)) => data,
        Some(Value::Null) | None => &empty,
        Some(_) => return Err(NormalizeError::InvalidField { field: "data" }),
    };
    let notification = match object.get("notification") {
        Some(Value::Object(notification)) => notification,
        Some(Value::Null) | None => &empty,
        Some(_) => {
            return Err(NormalizeError::InvalidField {
                field: "notification",
            });
        }
    };

    let id = match first_string(data, &["notificationId", "id", "messageId"])? {
        Some(id) => id,
        None => first_string(object, &["messageId", "id"])?.ok_or(NormalizeError::MissingId)?,
    };

    let category = first_string(data, &["category", "type"])?
        .map(|c| Category::parse(&c))
        .unwrap_or(Category::System);
    let priority = first_string(data, &["priority"])?
        .map(|p| Priority::parse(&p))
        .unwrap_or_default();

    let title = match first_string(notification, &["title"])? {
        Some(title) => title,
        None => first_string(data, &["title"])?.unwrap_or_default(),
    };
    let body = match first_string(notification, &["body"])? {
        Some(body) => body,
        None => first_string(data, &["body", "content"])?.unwrap_or_default(),
    };

    let mut payload = flatten_payload(data);
    if let Some(delivery_id) = first_string(object, &["messageId"])? {
        payload.insert("deliveryId".to_string(), delivery_id);
    }
    payload.insert("messageId".to_string(), id.clone());

    Ok(NotificationMessage::new(id, category, priority, SourceChannel::Push)
        .with_content(title, body)
        .with_payload(payload))
}
