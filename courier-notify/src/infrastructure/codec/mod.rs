//! 通道边界的消息归一化
//!
//! 两个通道的原始载荷格式不同，在进入仲裁逻辑之前统一转换为 `NotificationMessage`，
//! 原始字段扁平化后保存在 `payload` 中，仅供下游点击路由使用。

mod push;
mod realtime;

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

pub use push::normalize_push;
pub use realtime::normalize_realtime;

/// 归一化错误（属于编程错误：直接在入口处丢弃并记录日志）
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("raw message is not a JSON object")]
    NotAnObject,
    #[error("raw message has no logical id")]
    MissingId,
    #[error("field `{field}` has unexpected type")]
    InvalidField { field: &'static str },
}

/// 按候选键顺序取第一个非空字符串（数字也接受并转为字符串）
pub(crate) fn first_string(
    object: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<Option<String>, NormalizeError> {
    for key in keys {
        match object.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.trim().is_empty() => continue,
            Some(Value::String(s)) => return Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => return Ok(Some(n.to_string())),
            Some(_) => return Err(NormalizeError::InvalidField { field: *key }),
        }
    }
    Ok(None)
}

/// 扁平化为字符串键值对：嵌套对象/数组保留 JSON 文本
pub(crate) fn flatten_payload(object: &Map<String, Value>) -> HashMap<String, String> {
    object
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}
