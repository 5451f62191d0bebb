//! 通知消息模型（与通道无关）

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 通知分类
///
/// 除内置分类外允许扩展标签，扩展标签按原始字符串（小写）参与偏好判断
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Chat,
    System,
    Promotion,
    Marketing,
    Other(String),
}

impl Category {
    /// 解析分类字符串（大小写不敏感，兼容复数形式与设置项命名）
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "chat" | "chat_message" | "chatmessages" | "chat_messages" => Self::Chat,
            "system" | "system_notice" | "systemnotices" | "system_notices" => Self::System,
            "promotion" | "promotions" | "promo" => Self::Promotion,
            "marketing" => Self::Marketing,
            _ => Self::Other(normalized),
        }
    }

    /// 偏好表中的键
    pub fn key(&self) -> &str {
        match self {
            Self::Chat => "chat",
            Self::System => "system",
            Self::Promotion => "promotion",
            Self::Marketing => "marketing",
            Self::Other(tag) => tag.as_str(),
        }
    }

    /// 偏好缺失时的默认值：聊天、系统默认允许，促销、营销默认拒绝，扩展标签允许
    pub fn default_allowed(&self) -> bool {
        match self {
            Self::Chat | Self::System => true,
            Self::Promotion | Self::Marketing => false,
            Self::Other(_) => true,
        }
    }

    /// 平台通知渠道 ID
    pub fn channel_id(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::System => "system",
            Self::Promotion => "promotion",
            Self::Marketing => "marketing",
            Self::Other(_) => DEFAULT_CHANNEL_ID,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 默认通知渠道（扩展分类与兜底展示使用）
pub const DEFAULT_CHANNEL_ID: &str = "default";

/// 消息优先级，全序：Critical > High > Normal > Low
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Priority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
}

impl Priority {
    /// 解析优先级，未知值按 Normal 处理
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" | "1" => Self::Low,
            "normal" | "default" | "2" => Self::Normal,
            "high" | "3" => Self::High,
            "critical" | "urgent" | "max" | "4" => Self::Critical,
            _ => Self::Normal,
        }
    }
}

/// 来源通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceChannel {
    /// 前台长连接（低延迟，仅前台有效）
    Realtime,
    /// 第三方推送（存储转发，任何状态都会送达）
    Push,
}

impl SourceChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for SourceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 应用生命周期状态（宿主平台拥有，本子系统只读）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppLifecycleState {
    Foreground,
    Background,
}

impl AppLifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::Background => "background",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "foreground" | "active" => Some(Self::Foreground),
            "background" | "inactive" => Some(Self::Background),
            _ => None,
        }
    }
}

/// 归一化后的通知消息
///
/// `id` 是去重键：来自不同通道的同一 `id` 代表同一逻辑事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    /// 原始载荷，仅供下游点击路由使用，仲裁逻辑不读取
    #[serde(default)]
    pub payload: HashMap<String, String>,
    pub source_channel: SourceChannel,
}

impl NotificationMessage {
    pub fn new(
        id: impl Into<String>,
        category: Category,
        priority: Priority,
        source_channel: SourceChannel,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            title: String::new(),
            body: String::new(),
            priority,
            payload: HashMap::new(),
            source_channel,
        }
    }

    pub fn with_content(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.title = title.into();
        self.body = body.into();
        self
    }

    pub fn with_payload(mut self, payload: HashMap<String, String>) -> Self {
        self.payload = payload;
        self
    }
}
