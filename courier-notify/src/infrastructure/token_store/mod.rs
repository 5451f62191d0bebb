pub mod file;
pub mod memory;

use std::sync::Arc;

use crate::config::NotifyServiceConfig;
use crate::domain::repository::TokenStore;

pub use file::FileTokenStore;
pub use memory::InMemoryTokenStore;

pub type TokenStoreRef = Arc<dyn TokenStore>;

/// 配置了持久化路径时使用文件存储，否则使用内存存储
pub fn build_token_store(config: &NotifyServiceConfig) -> TokenStoreRef {
    match &config.token_store_path {
        Some(path) => Arc::new(FileTokenStore::new(path)),
        None => InMemoryTokenStore::shared(),
    }
}
