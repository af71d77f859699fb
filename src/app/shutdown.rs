//! Graceful shutdown handling.

use log::{info, warn};

/// Resolves when the process receives Ctrl-C.
///
/// If the signal handler cannot be installed, this never resolves and the
/// sink runs until its input ends.
pub async fn wait_for_interrupt() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, flushing buffered records before exit"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
