use super::{Handler, RequestContext};
use crate::http::Body;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::net::SocketAddr;
use tokio::time::Instant;
use tracing::info;

/// Logs receipt and completion of every request around an inner handler
///
/// Panics in the inner handler are not caught here; the server isolates
/// each request in its own task.
#[derive(Debug, Clone)]
pub struct Logger<H> {
    inner: H,
}

impl<H> Logger<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: Handler> Handler for Logger<H> {
    async fn call(&self, ctx: RequestContext, request: Request<Body>) -> Response<Bytes> {
        let start = Instant::now();
        info!(
            server_addr = %display_addr(ctx.server_addr),
            peer = %display_addr(ctx.peer_addr),
            "Received request"
        );

        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        let response = self.inner.call(ctx, request).await;

        info!(%method, %path, elapsed = ?start.elapsed(), "Request completed");
        response
    }
}

/// Bare `ip:port`, or an empty string when the address is unknown
pub(crate) fn display_addr(addr: Option<SocketAddr>) -> String {
    addr.map(|addr| addr.to_string()).unwrap_or_default()
}
