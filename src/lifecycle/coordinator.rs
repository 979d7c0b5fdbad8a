use super::listeners::ListenerSet;
use super::signal::CancellationSignal;
use crate::config::ServerConfig;
use crate::handler::SharedHandler;
use std::future::pending;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// Where the coordinator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    Cancelling,
    Stopped,
}

/// Owns the shared cancellation signal and the listener set
///
/// [`run`](Self::run) starts every configured listener and returns once
/// the signal fires, whichever listener (or Ctrl-C) fired it.
pub struct Coordinator {
    config: ServerConfig,
    signal: CancellationSignal,
    state: watch::Sender<LifecycleState>,
}

impl Coordinator {
    pub fn new(config: ServerConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            config,
            signal: CancellationSignal::new(),
            state,
        }
    }

    /// Handle to the shared signal; triggering it stops the coordinator
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Runs every listener until the shared signal fires
    ///
    /// Returns the reason recorded by whoever fired the signal.
    pub async fn run(self, handler: SharedHandler) -> String {
        let listeners = ListenerSet::new(&self.config.endpoints, handler, &self.config.http);
        info!(listeners = listeners.len(), "Starting listeners");
        let handles = listeners.launch(&self.signal);
        self.state.send_replace(LifecycleState::Running);

        tokio::select! {
            _ = self.signal.cancelled() => {}
            _ = ctrl_c() => {
                info!("Received shutdown signal");
                self.signal.trigger("interrupted");
            }
        }

        self.state.send_replace(LifecycleState::Cancelling);
        let reason = self
            .signal
            .reason()
            .unwrap_or_else(|| "cancelled".to_string());
        info!(%reason, "Shutting down listeners");

        // Listeners bound their own drain by shutdown_timeout
        let grace = self.config.http.shutdown_timeout + Duration::from_secs(1);
        let joined = async {
            for handle in handles {
                handle.join().await;
            }
        };
        if timeout(grace, joined).await.is_err() {
            warn!("Listeners did not stop within the shutdown timeout");
        }

        self.state.send_replace(LifecycleState::Stopped);
        reason
    }
}

async fn ctrl_c() {
    if signal::ctrl_c().await.is_err() {
        // No signal handling available; only listener failures can stop us
        pending::<()>().await
    }
}
