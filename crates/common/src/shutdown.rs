//! Graceful shutdown built on `CancellationToken`
//!
//! Workers receive child tokens and check them once per poll iteration.
//! The controller cancels on Ctrl+C, on SIGTERM (unix), or when asked to.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Coordinates shutdown of all market workers
///
/// # Example
///
/// ```ignore
/// let shutdown = ShutdownController::with_signals();
///
/// for worker in workers {
///     let token = shutdown.child_token();
///     tokio::spawn(async move { worker.run(token).await });
/// }
///
/// shutdown.wait_for_shutdown().await;
/// ```
#[derive(Clone)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a controller that cancels on Ctrl+C or SIGTERM
    ///
    /// Spawns a background task, so it must be called inside a runtime.
    pub fn with_signals() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            let signal = wait_for_signal().await;
            info!(signal, "Received shutdown signal, stopping workers");
            token.cancel();
        });

        controller
    }

    /// Token cancelled together with this controller, or on its own
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger shutdown manually
    pub fn shutdown(&self) {
        info!("Manual shutdown triggered");
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "Failed to listen for SIGTERM, only Ctrl+C will stop the engine");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl+C",
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending().await
        }
    }
}

/// Run a future until shutdown is signalled
///
/// Returns `Some(result)` if the future completed, `None` if shutdown won.
pub async fn run_until_shutdown<F, T>(token: CancellationToken, future: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        result = future => Some(result),
        _ = token.cancelled() => None,
    }
}
