use super::signal::CancellationSignal;
use crate::config::ListenerEndpoint;
use crate::handler::SharedHandler;
use crate::http::{HttpConfig, HttpEchoServer};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The set of listeners sharing one handler chain
pub struct ListenerSet {
    servers: Vec<HttpEchoServer>,
}

/// A launched listener
///
/// Closing it through [`close`](Self::close) is a graceful closure: the
/// other listeners keep serving and the shared signal does not fire.
pub struct ListenerHandle {
    endpoint: ListenerEndpoint,
    shutdown: CancellationSignal,
    task: JoinHandle<()>,
}

impl ListenerSet {
    pub fn new(endpoints: &[ListenerEndpoint], handler: SharedHandler, config: &HttpConfig) -> Self {
        let servers = endpoints
            .iter()
            .map(|endpoint| HttpEchoServer::new(endpoint.clone(), Arc::clone(&handler), config.clone()))
            .collect();
        Self { servers }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Starts every listener in its own task
    ///
    /// Returns as soon as the tasks are spawned; binding happens inside
    /// each task, so a slow or failing bind never holds up another
    /// listener. A listener that fails triggers `signal`.
    pub fn launch(self, signal: &CancellationSignal) -> Vec<ListenerHandle> {
        self.servers
            .into_iter()
            .map(|server| {
                let endpoint = server.endpoint().clone();
                let shutdown = signal.child();
                let global = signal.clone();
                let listener_shutdown = shutdown.clone();

                let task = tokio::spawn(async move {
                    let endpoint = server.endpoint();
                    match server.serve(listener_shutdown).await {
                        Ok(()) => info!(%endpoint, "Listener closed"),
                        Err(e) => {
                            error!(%endpoint, error = %e, "Listener failed");
                            if global.trigger(format!("listener {endpoint} failed: {e}")) {
                                info!(%endpoint, "Triggered shutdown of all listeners");
                            }
                        }
                    }
                });

                ListenerHandle {
                    endpoint,
                    shutdown,
                    task,
                }
            })
            .collect()
    }
}

impl ListenerHandle {
    pub fn endpoint(&self) -> &ListenerEndpoint {
        &self.endpoint
    }

    /// Gracefully closes this listener only
    pub fn close(&self) {
        self.shutdown.trigger(format!("listener {} closed", self.endpoint));
    }

    /// Waits for the listener task to end
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(endpoint = %self.endpoint, error = %e, "Listener task aborted");
        }
    }
}
