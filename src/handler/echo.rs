use super::{Handler, RequestContext};
use crate::http::{Body, BodyError};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderValue, Request, Response};
use std::time::Duration;

/// Latency injected before every echo response
pub const ECHO_DELAY: Duration = Duration::from_secs(1);

/// Echoes headers, method, query parameters and body back as plain text
///
/// The response is held back for a fixed delay so clients can exercise
/// their timeout and concurrency behaviour against it.
///
/// # Examples
///
/// ```
/// use echoprobe::handler::{EchoHandler, Handler, RequestContext};
/// use echoprobe::http::Body;
/// use echoprobe::lifecycle::CancellationSignal;
/// use http::Request;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let handler = EchoHandler::with_delay(Duration::ZERO);
/// let request = Request::post("/?first=value").body(Body::from("hello")).unwrap();
/// let ctx = RequestContext::new(CancellationSignal::new());
///
/// let response = handler.call(ctx, request).await;
/// let text = String::from_utf8_lossy(response.body());
/// assert!(text.contains("Method: POST\n"));
/// assert!(text.contains("Request body: hello\n"));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EchoHandler {
    delay: Duration,
}

impl EchoHandler {
    pub fn new() -> Self {
        Self { delay: ECHO_DELAY }
    }

    /// Same handler with a different injected latency
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for EchoHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for EchoHandler {
    async fn call(&self, _ctx: RequestContext, request: Request<Body>) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let text = render_echo(&parts, body.into_bytes());

        tokio::time::sleep(self.delay).await;

        let mut response = Response::new(text);
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Builds the echo text for a request
///
/// Header names are rendered in canonical form (`Content-Type`); every
/// value of a repeated header or query key gets its own line. Body bytes
/// are copied verbatim.
pub fn render_echo(parts: &Parts, body: Result<Bytes, BodyError>) -> Bytes {
    let mut out = BytesMut::with_capacity(256);
    out.put_slice(b"Received request: \n");

    for (name, value) in &parts.headers {
        push_line(
            &mut out,
            &format!(
                "Header: {}, Value: {}",
                canonical_header_name(name.as_str()),
                String::from_utf8_lossy(value.as_bytes())
            ),
        );
    }

    push_line(&mut out, &format!("Method: {}", parts.method));

    for (key, values) in query_params(parts.uri.query().unwrap_or_default()) {
        for value in values {
            push_line(&mut out, &format!("Query param: {key}, Value: {value}"));
        }
    }

    match body {
        Ok(bytes) => {
            out.put_slice(b"Request body: ");
            out.put_slice(&bytes);
            out.put_u8(b'\n');
        }
        Err(err) => push_line(&mut out, &format!("Failed to read request body: {err}")),
    }

    out.freeze()
}

fn push_line(out: &mut BytesMut, line: &str) {
    out.put_slice(line.as_bytes());
    out.put_u8(b'\n');
}

/// Decoded query pairs grouped by key, keys in order of first appearance
fn query_params(query: &str) -> Vec<(String, Vec<String>)> {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => grouped.push((key.into_owned(), vec![value.into_owned()])),
        }
    }
    grouped
}

/// `content-type` -> `Content-Type`
pub fn canonical_header_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            canonical.push(c.to_ascii_uppercase());
        } else {
            canonical.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    canonical
}
