//! Startup configuration
//!
//! Listener addresses are looked up through a [`ConfigSource`] once at
//! startup. Nothing is validated here: a missing or malformed port ends up
//! in the bind call, which is where the failure surfaces.

use crate::http::HttpConfig;
use crate::{EchoError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Key holding the first listener's port
pub const PORT_KEY: &str = "PORT";
/// Key holding the second listener's port
pub const PORT2_KEY: &str = "PORT2";
/// Key holding the bind host shared by both listeners
pub const HOST_KEY: &str = "HOST";
/// Host used when `HOST` is not set: every interface, IPv6 and IPv4
pub const DEFAULT_HOST: &str = "::";

const IPV6_WILDCARD: &str = "[::]:";
const IPV4_WILDCARD: &str = "0.0.0.0:";

/// Opaque key-value lookup consulted at startup
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Process environment, falling back to values read from a dotenv file
///
/// Variables already present in the environment win over the file, so a
/// `.env` only fills in what the shell did not set.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    dotenv: HashMap<String, String>,
}

impl EnvSource {
    /// Environment only
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment plus the variables defined in the dotenv file at `path`
    pub fn with_dotenv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dotenv = dotenvy::from_path_iter(path)
            .map_err(|e| EchoError::Config(format!("{}: {e}", path.display())))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(|e| EchoError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self { dotenv })
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| self.dotenv.get(key).cloned())
    }
}

/// A bound network address string (`host:port`) for one listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEndpoint {
    address: String,
}

impl ListenerEndpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Builds `host:port`, bracketing IPv6 literals
    pub fn from_host_port(host: &str, port: &str) -> Self {
        if host.contains(':') && !host.starts_with('[') {
            Self::new(format!("[{host}]:{port}"))
        } else {
            Self::new(format!("{host}:{port}"))
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// IPv4 wildcard to bind when the IPv6 wildcard is unavailable
    ///
    /// Only the dual-stack default has one; hosts without IPv6 then still
    /// listen on every IPv4 interface.
    pub fn ipv4_fallback(&self) -> Option<ListenerEndpoint> {
        self.address
            .strip_prefix(IPV6_WILDCARD)
            .map(|port| Self::new(format!("{IPV4_WILDCARD}{port}")))
    }
}

impl fmt::Display for ListenerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Configuration for the whole server process
///
/// # Examples
///
/// ```
/// use echoprobe::config::{ListenerEndpoint, ServerConfig};
/// use std::collections::HashMap;
///
/// let source = HashMap::from([
///     ("PORT".to_string(), "8080".to_string()),
///     ("PORT2".to_string(), "8081".to_string()),
/// ]);
/// let config = ServerConfig::from_source(&source);
/// assert_eq!(config.endpoints[0], ListenerEndpoint::new("[::]:8080"));
/// assert_eq!(config.endpoints[1], ListenerEndpoint::new("[::]:8081"));
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// One entry per listener, in launch order
    pub endpoints: Vec<ListenerEndpoint>,
    /// Settings shared by every listener
    pub http: HttpConfig,
}

impl ServerConfig {
    /// Reads `PORT`, `PORT2` and the optional `HOST` from `source`
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let host = source
            .get(HOST_KEY)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let endpoints = [PORT_KEY, PORT2_KEY]
            .iter()
            .map(|key| {
                let port = source.get(key).unwrap_or_default();
                ListenerEndpoint::from_host_port(&host, &port)
            })
            .collect();

        Self {
            endpoints,
            http: HttpConfig::default(),
        }
    }
}
