use thiserror::Error;

/// Error types for the echoprobe library
#[derive(Error, Debug)]
pub enum EchoError {
    /// A listener could not bind its configured address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP-related errors after the listener is bound
    #[error("TCP error: {0}")]
    Tcp(#[from] std::io::Error),

    /// HTTP protocol errors
    #[error("HTTP error: {0}")]
    Http(#[from] crate::http::HttpError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for the echoprobe library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod config;
pub mod handler;
pub mod http;
pub mod lifecycle;

// Re-export main types for convenience
pub use crate::config::{ConfigSource, EnvSource, ListenerEndpoint, ServerConfig};
pub use crate::handler::{EchoHandler, Handler, Logger, RequestContext, SharedHandler};
pub use crate::http::{Body, BodyError, HttpConfig, HttpEchoServer};
pub use crate::lifecycle::{CancellationSignal, Coordinator, LifecycleState, ListenerSet};
