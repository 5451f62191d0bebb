//! 用户通知偏好

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::message::Category;

/// 偏好接口返回的原始设置（任意字段都可能缺失）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub chat_messages: Option<bool>,
    #[serde(default)]
    pub system_notices: Option<bool>,
    #[serde(default)]
    pub promotions: Option<bool>,
    #[serde(default)]
    pub marketing: Option<bool>,
}

/// 分类 → 是否允许
///
/// 缺失的分类按 `Category::default_allowed` 处理
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPreferences {
    allowed: HashMap<String, bool>,
}

impl UserPreferences {
    /// 远端不可用时使用的硬编码默认偏好
    pub fn defaults() -> Self {
        let mut allowed = HashMap::new();
        allowed.insert(Category::Chat.key().to_string(), true);
        allowed.insert(Category::System.key().to_string(), true);
        allowed.insert(Category::Promotion.key().to_string(), false);
        allowed.insert(Category::Marketing.key().to_string(), false);
        Self { allowed }
    }

    pub fn from_settings(settings: &NotificationSettings) -> Self {
        let mut prefs = Self::default();
        let pairs = [
            (Category::Chat, settings.chat_messages),
            (Category::System, settings.system_notices),
            (Category::Promotion, settings.promotions),
            (Category::Marketing, settings.marketing),
        ];
        for (category, value) in pairs {
            if let Some(v) = value {
                prefs.set(&category, v);
            }
        }
        prefs
    }

    pub fn set(&mut self, category: &Category, allowed: bool) {
        self.allowed.insert(category.key().to_string(), allowed);
    }

    pub fn is_allowed(&self, category: &Category) -> bool {
        self.allowed
            .get(category.key())
            .copied()
            .unwrap_or_else(|| category.default_allowed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fall_back_to_category_defaults() {
        let prefs = UserPreferences::from_settings(&NotificationSettings {
            chat_messages: Some(false),
            promotions: Some(true),
            ..Default::default()
        });

        assert!(!prefs.is_allowed(&Category::Chat));
        assert!(prefs.is_allowed(&Category::Promotion));
        assert!(prefs.is_allowed(&Category::System));
        assert!(!prefs.is_allowed(&Category::Marketing));
    }

    #[test]
    fn test_settings_deserialize_camel_case() {
        let settings: NotificationSettings =
            serde_json::from_str(r#"{"chatMessages":true,"marketing":false}"#).unwrap();
        assert_eq!(settings.chat_messages, Some(true));
        assert_eq!(settings.marketing, Some(false));
        assert!(settings.promotions.is_none());
    }

    #[test]
    fn test_hard_coded_defaults() {
        let prefs = UserPreferences::defaults();
        assert!(prefs.is_allowed(&Category::Chat));
        assert!(prefs.is_allowed(&Category::System));
        assert!(!prefs.is_allowed(&Category::Promotion));
        assert!(!prefs.is_allowed(&Category::Marketing));
    }
}
