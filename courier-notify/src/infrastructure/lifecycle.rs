use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::domain::model::AppLifecycleState;
use crate::domain::repository::AppLifecycleProvider;

/// 宿主可写的生命周期状态（宿主在前后台切换时调用 `set`）
#[derive(Debug)]
pub struct SharedAppLifecycle {
    foreground: AtomicBool,
}

impl SharedAppLifecycle {
    pub fn new(initial: AppLifecycleState) -> Arc<Self> {
        Arc::new(Self {
            foreground: AtomicBool::new(initial == AppLifecycleState::Foreground),
        })
    }

    pub fn set(&self, state: AppLifecycleState) {
        let previous = self
            .foreground
            .swap(state == AppLifecycleState::Foreground, Ordering::SeqCst);
        if previous != (state == AppLifecycleState::Foreground) {
            debug!(state = state.as_str(), "App lifecycle state changed");
        }
    }
}

impl AppLifecycleProvider for SharedAppLifecycle {
    fn current_state(&self) -> AppLifecycleState {
        if self.foreground.load(Ordering::SeqCst) {
            AppLifecycleState::Foreground
        } else {
            AppLifecycleState::Background
        }
    }
}
