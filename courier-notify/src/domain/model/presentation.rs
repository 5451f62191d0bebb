//! 展示参数与渲染请求

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::message::Priority;

/// 平台重要性级别（同时决定视觉突出程度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Importance {
    Low,
    Default,
    High,
    Max,
}

/// 视觉突出程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prominence {
    /// 仅出现在通知栏
    Silent,
    /// 标准通知
    Standard,
    /// 横幅（heads-up）
    Banner,
    /// 全屏/锁屏强提醒
    FullScreen,
}

/// 提示音
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sound {
    None,
    Default,
}

/// 优先级对应的展示参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationProfile {
    pub importance: Importance,
    pub sound: Sound,
    /// 震动模式（毫秒），空表示不震动
    pub vibration_pattern: Vec<u64>,
    pub prominence: Prominence,
}

impl PresentationProfile {
    /// 固定映射：Critical > High > Normal > Low
    ///
    /// Low 不震动（省电）
    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Critical => Self {
                importance: Importance::Max,
                sound: Sound::Default,
                vibration_pattern: vec![0, 500, 200, 500, 200, 500],
                prominence: Prominence::FullScreen,
            },
            Priority::High => Self {
                importance: Importance::High,
                sound: Sound::Default,
                vibration_pattern: vec![0, 250, 250, 250],
                prominence: Prominence::Banner,
            },
            Priority::Normal => Self {
                importance: Importance::Default,
                sound: Sound::Default,
                vibration_pattern: vec![0, 250],
                prominence: Prominence::Standard,
            },
            Priority::Low => Self {
                importance: Importance::Low,
                sound: Sound::None,
                vibration_pattern: Vec::new(),
                prominence: Prominence::Silent,
            },
        }
    }
}

/// 交给本地通知渲染器的请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRequest {
    /// 本地通知 ID（每次展示唯一）
    pub notification_id: String,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub importance: Importance,
    pub sound: Sound,
    pub vibration_pattern: Vec<u64>,
    pub prominence: Prominence,
    /// 原始载荷 + 记账字段（source_channel、app_state、message_id）
    pub payload: HashMap<String, String>,
}

/// 展示结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Presented,
    /// 主展示失败，兜底展示成功
    PresentedFallback,
    /// 主展示与兜底展示都失败（已静默吞掉）
    Failed,
}

impl PresentResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presented => "primary",
            Self::PresentedFallback => "fallback",
            Self::Failed => "failed",
        }
    }
}
