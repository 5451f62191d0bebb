//! Courier Core 错误工具模块
//!
//! - 统一的错误码 `ErrorCode` 与错误类型 `CourierError`
//! - `ErrorBuilder` 便于在各层构造带上下文的错误

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 统一错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidParameter,
    NotFound,
    Unauthenticated,
    ServiceUnavailable,
    Timeout,
    Internal,
    ConfigError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// 传输类错误（网络、超时、服务不可用），调用方应降级处理
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable | Self::Timeout | Self::Unauthenticated
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Courier 统一错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{code}] {reason}{}", fmt_details(.details))]
pub struct CourierError {
    pub code: ErrorCode,
    pub reason: String,
    pub details: Option<String>,
}

impl CourierError {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            details: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

fn fmt_details(details: &Option<String>) -> String {
    details
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, CourierError>;

/// 错误构建器
pub struct ErrorBuilder {
    code: ErrorCode,
    reason: String,
    details: Option<String>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            details: None,
        }
    }

    /// 附加错误详情（通常是底层错误的描述）
    pub fn details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }

    pub fn build_error(self) -> CourierError {
        CourierError {
            code: self.code,
            reason: self.reason,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_details() {
        let err = ErrorBuilder::new(ErrorCode::ServiceUnavailable, "registration rpc failed")
            .details("connection refused")
            .build_error();
        assert_eq!(
            err.to_string(),
            "[SERVICE_UNAVAILABLE] registration rpc failed: connection refused"
        );
        assert!(err.code().is_transport());
    }

    #[test]
    fn test_error_display_without_details() {
        let err = CourierError::new(ErrorCode::NotFound, "token not found");
        assert_eq!(err.to_string(), "[NOT_FOUND] token not found");
        assert!(!err.code().is_transport());
    }
}
