//! # Courier Notify
//!
//! 客户端通知编排：同一逻辑通知可能经长连接和第三方推送两条通道到达，
//! 这里负责仲裁由哪条通道展示（最多一次），并维护设备推送 token 的注册生命周期。

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::NotificationApplication;
pub use service::{ApplicationContext, PlatformBindings};
