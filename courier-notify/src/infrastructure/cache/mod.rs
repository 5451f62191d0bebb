pub mod preference_cache;

pub use preference_cache::{PreferenceCache, PreferenceCacheConfig};
