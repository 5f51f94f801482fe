//! Tunnel lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique tunnel IDs for log correlation
//! - Count tunnels whose byte pumps are still running
//!
//! Tunnels outlive the HTTP exchange that opened them, so the listener's own
//! connection count does not see them once hijacked. Shutdown reads this
//! tracker to report how many were still open.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Relaxed ordering is enough; IDs only need to be unique.
static TUNNEL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a CONNECT tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TunnelId(u64);

impl TunnelId {
    pub fn new() -> Self {
        Self(TUNNEL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TunnelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TunnelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tunnel-{}", self.0)
    }
}

/// Counts open tunnels. Cheap to clone; clones share the count.
#[derive(Debug, Clone, Default)]
pub struct TunnelTracker {
    open: Arc<AtomicU64>,
}

impl TunnelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tunnel. The returned guard releases it on drop.
    pub fn track(&self) -> TunnelGuard {
        self.open.fetch_add(1, Ordering::SeqCst);
        let guard = TunnelGuard {
            open: Arc::clone(&self.open),
            id: TunnelId::new(),
        };
        tracing::trace!(tunnel_id = %guard.id, "Tunnel opened");
        guard
    }

    pub fn open_count(&self) -> u64 {
        self.open.load(Ordering::SeqCst)
    }
}

/// Held by the task relaying a tunnel's bytes.
#[derive(Debug)]
pub struct TunnelGuard {
    open: Arc<AtomicU64>,
    id: TunnelId,
}

impl TunnelGuard {
    pub fn id(&self) -> TunnelId {
        self.id
    }
}

impl Drop for TunnelGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(tunnel_id = %self.id, "Tunnel closed");
    }
}
