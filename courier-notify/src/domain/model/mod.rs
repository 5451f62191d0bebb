//! 领域模型

pub mod message;
pub mod preferences;
pub mod presentation;
pub mod token;

pub use message::{
    AppLifecycleState, Category, DEFAULT_CHANNEL_ID, NotificationMessage, Priority,
    SourceChannel,
};
pub use preferences::{NotificationSettings, UserPreferences};
pub use presentation::{
    DisplayRequest, Importance, PresentResult, PresentationProfile, Prominence, Sound,
};
pub use token::{
    DeviceContext, DeviceInfo, DeviceToken, Platform, TokenOperationResult, TokenState,
};
