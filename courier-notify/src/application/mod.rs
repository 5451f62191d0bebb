//! 应用服务层

pub mod service;

pub use service::NotificationApplication;
