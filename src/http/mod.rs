//! HTTP/1.1 listener implementation
//!
//! This module provides the wire side of the echo service: a small
//! HTTP/1.1 codec on top of `httparse` and a listener that dispatches every
//! request to a shared [`Handler`](crate::handler::Handler).

pub mod body;
pub mod config;
pub mod connection;
pub mod error;
pub mod server;


pub use body::{Body, BodyError};
pub use config::HttpConfig;
pub use connection::Connection;
pub use error::HttpError;
pub use server::HttpEchoServer;
