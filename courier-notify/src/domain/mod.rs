//! 领域层（仲裁、展示、token 生命周期）

pub mod model;
pub mod repository;
pub mod service;

pub use model::{AppLifecycleState, Category, NotificationMessage, Priority, SourceChannel};
pub use repository::{
    AppLifecycleProvider, AuthSessionProvider, DeviceTokenSource, NotificationRenderer,
    PreferencesRpc, RegistrationRpc, TokenStore,
};
pub use service::{ArbitrationOutcome, ChannelArbiter, DropReason, Presenter, TokenLifecycleManager};
