//! 文件 token 存储
//!
//! 以 JSON 保存 `DeviceToken`，写入时先写临时文件再重命名，避免进程中断留下半个文件

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use courier_core::error::{ErrorBuilder, ErrorCode, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::model::DeviceToken;
use crate::domain::repository::TokenStore;

pub struct FileTokenStore {
    path: PathBuf,
    /// 串行化读写，避免并发写入交错
    io_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "device_token".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> courier_core::CourierError {
        ErrorBuilder::new(
            ErrorCode::Internal,
            format!("failed to {} token file {}", action, self.path.display()),
        )
        .details(err)
        .build_error()
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<DeviceToken>> {
        let _guard = self.io_lock.lock().await;

        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", e)),
        };

        match serde_json::from_slice::<DeviceToken>(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                // 损坏的文件视为没有 token，下一次注册会覆盖
                warn!(path = %self.path.display(), error = %e, "Corrupted token file ignored");
                Ok(None)
            }
        }
    }

    async fn set(&self, token: &DeviceToken) -> Result<()> {
        let _guard = self.io_lock.lock().await;

        let json = serde_json::to_vec_pretty(token).map_err(|e| {
            ErrorBuilder::new(ErrorCode::Internal, "failed to serialize device token")
                .details(e)
                .build_error()
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error("create directory for", e))?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| self.io_error("write", e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error("replace", e))?;

        debug!(path = %self.path.display(), "Device token persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.io_lock.lock().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Platform;

    #[tokio::test]
    async fn test_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("push/token.json"));

        assert!(store.get().await.unwrap().is_none());

        let mut token = DeviceToken::unconfirmed("tok-A", Platform::Ios);
        token.confirm(chrono::Utc::now());
        store.set(&token).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(token));

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
        // 重复清理不报错
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupted_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = FileTokenStore::new(&path);
        assert!(store.get().await.unwrap().is_none());
    }
}
