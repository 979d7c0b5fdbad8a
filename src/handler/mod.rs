//! Request handlers
//!
//! A [`Handler`] turns one request into one response. The server shares a
//! single handler chain between every listener, so handlers hold no
//! mutable state.

pub mod echo;
pub mod logger;

#[cfg(test)]
mod tests;

use crate::http::Body;
use crate::lifecycle::CancellationSignal;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;

pub use echo::{ECHO_DELAY, EchoHandler, canonical_header_name, render_echo};
pub use logger::Logger;

/// Per-request metadata built when a connection is accepted
///
/// Every listener builds a base context from the shared cancellation
/// signal and its own bound address; each connection adds the peer.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Local address of the listener that accepted the request
    pub server_addr: Option<SocketAddr>,
    /// Remote address of the client
    pub peer_addr: Option<SocketAddr>,
    /// Process-wide cancellation signal
    pub cancellation: CancellationSignal,
}

impl RequestContext {
    pub fn new(cancellation: CancellationSignal) -> Self {
        Self {
            server_addr: None,
            peer_addr: None,
            cancellation,
        }
    }

    pub fn with_server_addr(mut self, addr: SocketAddr) -> Self {
        self.server_addr = Some(addr);
        self
    }

    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }
}

/// Turns a request into a response
///
/// Handlers never fail: anything that goes wrong is expressed in the
/// response itself.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, ctx: RequestContext, request: Request<Body>) -> Response<Bytes>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, ctx: RequestContext, request: Request<Body>) -> Response<Bytes> {
        (**self).call(ctx, request).await
    }
}

/// Handler chain shared by every listener
pub type SharedHandler = Arc<dyn Handler>;
