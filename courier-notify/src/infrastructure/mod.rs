//! 基础设施层（Repository impl）

pub mod cache;
pub mod codec;
pub mod dedup_registry;
pub mod lifecycle;
pub mod noop;
pub mod token_store;

pub use cache::{PreferenceCache, PreferenceCacheConfig};
pub use codec::{NormalizeError, normalize_push, normalize_realtime};
pub use dedup_registry::{DedupConfig, DedupRegistry};
pub use lifecycle::SharedAppLifecycle;
pub use token_store::{FileTokenStore, InMemoryTokenStore, TokenStoreRef, build_token_store};
