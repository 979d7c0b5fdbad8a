use super::body::Body;
use super::config::HttpConfig;
use super::connection::{Connection, status_response, wants_keep_alive};
use crate::config::ListenerEndpoint;
use crate::handler::{RequestContext, SharedHandler};
use crate::lifecycle::CancellationSignal;
use crate::{EchoError, Result};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn, Instrument};

const MIN_ACCEPT_BACKOFF: Duration = Duration::from_millis(5);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// HTTP listener bound to one endpoint, serving a shared handler chain
///
/// Every connection runs in its own task and every request is dispatched
/// in a task of its own, so a panicking handler costs one `500` response
/// and one connection, never the listener.
pub struct HttpEchoServer {
    endpoint: ListenerEndpoint,
    handler: SharedHandler,
    config: HttpConfig,
}

impl HttpEchoServer {
    pub fn new(endpoint: ListenerEndpoint, handler: SharedHandler, config: HttpConfig) -> Self {
        Self {
            endpoint,
            handler,
            config,
        }
    }

    pub fn endpoint(&self) -> &ListenerEndpoint {
        &self.endpoint
    }

    /// Binds the configured address as-is
    ///
    /// The dual-stack wildcard falls back to the IPv4 wildcard when the
    /// host cannot bind IPv6.
    pub async fn bind(&self) -> Result<TcpListener> {
        let error = match TcpListener::bind(self.endpoint.address()).await {
            Ok(listener) => return Ok(listener),
            Err(source) => EchoError::Bind {
                addr: self.endpoint.to_string(),
                source,
            },
        };

        let Some(fallback) = self.endpoint.ipv4_fallback() else {
            return Err(error);
        };
        debug!(endpoint = %self.endpoint, error = %error, %fallback, "Retrying bind on IPv4");
        TcpListener::bind(fallback.address())
            .await
            .map_err(|source| EchoError::Bind {
                addr: fallback.to_string(),
                source,
            })
    }

    /// Binds and serves until `shutdown` fires
    ///
    /// Returns `Ok(())` after a graceful closure; any error is fatal for
    /// this listener.
    pub async fn serve(&self, shutdown: CancellationSignal) -> Result<()> {
        let listener = self.bind().await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` fires
    pub async fn serve_listener(
        &self,
        listener: TcpListener,
        shutdown: CancellationSignal,
    ) -> Result<()> {
        let local_addr = listener.local_addr()?;
        let base = RequestContext::new(shutdown.clone()).with_server_addr(local_addr);
        let tracker = TaskTracker::new();
        let mut backoff = MIN_ACCEPT_BACKOFF;

        info!(address = %local_addr, endpoint = %self.endpoint, "HTTP echo server listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            backoff = MIN_ACCEPT_BACKOFF;
                            debug!(%peer, "Accepted connection");

                            let ctx = base.clone().with_peer_addr(peer);
                            let handler = Arc::clone(&self.handler);
                            let config = self.config.clone();
                            let span = tracing::info_span!("connection", server = %local_addr, %peer);
                            tracker.spawn(
                                async move {
                                    if let Err(e) = serve_connection(stream, ctx, handler, config).await {
                                        debug!(error = %e, "Connection ended with error");
                                    }
                                }
                                .instrument(span),
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, retry_in = ?backoff, "Failed to accept connection");
                            sleep(backoff).await;
                            backoff = (backoff * 2).min(MAX_ACCEPT_BACKOFF);
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!(address = %local_addr, "Received shutdown signal, stopping listener");
                    break;
                }
            }
        }

        drop(listener);
        tracker.close();
        if timeout(self.config.shutdown_timeout, tracker.wait()).await.is_err() {
            warn!(
                address = %local_addr,
                remaining = tracker.len(),
                "Connections still open after shutdown timeout"
            );
        }

        info!(address = %local_addr, "HTTP echo server stopped");
        Ok(())
    }
}

/// Reads requests off one connection until the peer or the server ends it
async fn serve_connection(
    stream: TcpStream,
    ctx: RequestContext,
    handler: SharedHandler,
    config: HttpConfig,
) -> Result<()> {
    let mut conn = Connection::new(stream, config);

    loop {
        let request = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => break,
            request = conn.read_request() => request,
        };

        let request = match request {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) => {
                if let Some(status) = e.status() {
                    let _ = conn.write_error(status).await;
                }
                return Err(e.into());
            }
        };

        let version = request.version();
        let head_only = *request.method() == Method::HEAD;
        let mut keep_alive = wants_keep_alive(&request) && !request.body().is_failed();

        let response = match dispatch(&handler, ctx.clone(), request).await {
            Some(response) => response,
            None => {
                keep_alive = false;
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        let close = !keep_alive || ctx.cancellation.is_triggered();
        conn.write_response(&response, version, head_only, close)
            .await?;
        if close {
            break;
        }
    }

    Ok(())
}

/// Runs the handler in its own task; `None` if it panicked
async fn dispatch(
    handler: &SharedHandler,
    ctx: RequestContext,
    request: Request<Body>,
) -> Option<Response<Bytes>> {
    let handler = Arc::clone(handler);
    let peer = ctx.peer_addr;

    match tokio::spawn(async move { handler.call(ctx, request).await }).await {
        Ok(response) => Some(response),
        Err(e) => {
            error!(peer = ?peer, error = %e, "Handler panicked");
            None
        }
    }
}
