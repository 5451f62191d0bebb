use std::sync::Arc;

use async_trait::async_trait;
use courier_core::error::Result;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::model::DeviceToken;
use crate::domain::repository::TokenStore;

/// 内存 token 存储（进程退出即丢失）
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<DeviceToken>>,
}

impl InMemoryTokenStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self) -> Result<Option<DeviceToken>> {
        Ok(self.token.read().await.clone())
    }

    async fn set(&self, token: &DeviceToken) -> Result<()> {
        *self.token.write().await = Some(token.clone());
        debug!(platform = %token.platform, "Device token stored in memory");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.write().await = None;
        Ok(())
    }
}
