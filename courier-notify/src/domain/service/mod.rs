pub mod channel_arbiter;
pub mod presenter;
pub mod token_lifecycle;

pub use channel_arbiter::{ArbitrationOutcome, ChannelArbiter, DropReason};
pub use presenter::{Presenter, PresenterConfig};
pub use token_lifecycle::TokenLifecycleManager;
