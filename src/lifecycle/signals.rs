//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown. On platforms without
//! Unix signals only Ctrl+C is observed.

use std::io;

/// Resolve when the process is asked to terminate.
///
/// Handlers are installed on the first poll. Installation failure is
/// returned, so callers can log it instead of hanging forever.
#[cfg(unix)]
pub async fn terminate() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => tracing::debug!("SIGINT received"),
        _ = term.recv() => tracing::debug!("SIGTERM received"),
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn terminate() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
