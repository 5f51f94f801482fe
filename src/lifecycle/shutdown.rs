//! Shutdown request latch.

use std::sync::Arc;

use tokio::sync::Notify;

/// Latch between whoever decides the proxy should stop and the one task that
/// carries the stop out.
///
/// A request made before anyone waits is kept, so the waiter may start late.
#[derive(Clone, Default)]
pub struct Shutdown {
    requested: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.requested.notify_one();
    }

    /// Resolve once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        self.requested.notified().await;
    }
}
