use std::time::Duration;

/// Configuration for HTTP listeners
///
/// Shared by every listener the process starts.
///
/// # Examples
///
/// ```rust
/// use echoprobe::http::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig {
///     read_buffer_size: 8192,
///     max_headers: 100,
///     max_head_bytes: 1024 * 1024,
///     max_body_bytes: 10 * 1024 * 1024,
///     shutdown_timeout: Duration::from_secs(5),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bytes reserved for each socket read
    pub read_buffer_size: usize,
    /// Maximum number of header fields in one request
    pub max_headers: usize,
    /// Maximum size of the request line plus headers
    pub max_head_bytes: usize,
    /// Bodies larger than this are reported as unreadable
    pub max_body_bytes: usize,
    /// How long a listener waits for in-flight requests once cancelled
    pub shutdown_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8192,
            max_headers: 100,
            max_head_bytes: 1024 * 1024, // 1MB
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}
