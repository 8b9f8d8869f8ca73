//! Graceful Shutdown

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::info;

/// Shutdown 控制器
///
/// 关闭后再调用 `wait` 会立即返回
#[derive(Clone, Default)]
pub struct ShutdownController {
    notify: Arc<Notify>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        info!("Triggering shutdown");
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// 等待关闭，可直接交给 `axum::serve(..).with_graceful_shutdown`
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let notify = self.notify.clone();
        let triggered = self.triggered.clone();
        async move {
            let notified = notify.notified();
            if triggered.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    /// 收到 OS 信号时触发关闭
    pub fn listen_for_signals(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            crate::shutdown_signal().await;
            controller.shutdown();
        });
    }
}
