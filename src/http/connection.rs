use super::body::{Body, BodyError};
use super::config::HttpConfig;
use super::error::HttpError;
use bytes::{Buf, Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, EXPECT, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri, Version};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest chunk-size or trailer line accepted in a chunked body
const MAX_CHUNK_LINE: usize = 4096;

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// How the body of a request is delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    None,
    Length(u64),
    Chunked,
}

/// One HTTP/1.x connection: reads requests and writes responses in turn
pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    config: HttpConfig,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: HttpConfig) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(config.read_buffer_size),
            config,
        }
    }

    /// Reads the next request, body included
    ///
    /// Returns `Ok(None)` when the peer closes the connection between
    /// requests. A body that cannot be read is not an error here: it is
    /// handed on as [`Body::Failed`].
    pub async fn read_request(&mut self) -> Result<Option<Request<Body>>, HttpError> {
        let Some(head) = self.read_head().await? else {
            return Ok(None);
        };

        let framing = framing(head.headers())?;
        // An oversized body is refused without inviting the upload
        let oversized = matches!(
            framing,
            Framing::Length(len) if len > self.config.max_body_bytes as u64
        );
        if framing != Framing::None && !oversized && expects_continue(&head) {
            self.stream.write_all(CONTINUE).await?;
            self.stream.flush().await?;
        }

        let body = match framing {
            Framing::None => Body::Empty,
            Framing::Length(len) => self.read_sized_body(len).await.into(),
            Framing::Chunked => self.read_chunked_body().await.into(),
        };

        let (parts, ()) = head.into_parts();
        Ok(Some(Request::from_parts(parts, body)))
    }

    async fn fill(&mut self) -> io::Result<usize> {
        self.buffer.reserve(self.config.read_buffer_size);
        self.stream.read_buf(&mut self.buffer).await
    }

    async fn read_head(&mut self) -> Result<Option<Request<()>>, HttpError> {
        loop {
            let parsed = {
                let mut headers = vec![httparse::EMPTY_HEADER; self.config.max_headers];
                let mut req = httparse::Request::new(&mut headers);
                match req.parse(&self.buffer)? {
                    httparse::Status::Complete(len) => Some((build_head(&req)?, len)),
                    httparse::Status::Partial => None,
                }
            };

            if let Some((head, len)) = parsed {
                self.buffer.advance(len);
                return Ok(Some(head));
            }

            if self.buffer.len() >= self.config.max_head_bytes {
                return Err(HttpError::HeadTooLarge(self.config.max_head_bytes));
            }

            if self.fill().await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(HttpError::IncompleteRequest);
            }
        }
    }

    /// Makes sure at least `n` bytes are buffered
    async fn buffer_at_least(&mut self, n: usize) -> Result<(), BodyError> {
        while self.buffer.len() < n {
            if self.fill().await? == 0 {
                return Err(BodyError::UnexpectedEof);
            }
        }
        Ok(())
    }

    async fn read_sized_body(&mut self, len: u64) -> Result<Bytes, BodyError> {
        let limit = self.config.max_body_bytes;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= limit)
            .ok_or(BodyError::TooLarge(limit))?;

        self.buffer_at_least(len).await?;
        Ok(self.buffer.split_to(len).freeze())
    }

    async fn read_chunked_body(&mut self) -> Result<Bytes, BodyError> {
        let limit = self.config.max_body_bytes;
        let mut body = BytesMut::new();

        loop {
            let line = self.read_line().await?;
            let size = parse_chunk_size(&line)?;

            if size == 0 {
                self.skip_trailers().await?;
                return Ok(body.freeze());
            }

            if body.len().saturating_add(size) > limit {
                return Err(BodyError::TooLarge(limit));
            }

            self.buffer_at_least(size + 2).await?;
            if &self.buffer[size..size + 2] != b"\r\n" {
                return Err(BodyError::MalformedChunk("missing CRLF after chunk data"));
            }
            body.extend_from_slice(&self.buffer[..size]);
            self.buffer.advance(size + 2);
        }
    }

    /// Reads and drops the trailer section, bounded like a request head
    async fn skip_trailers(&mut self) -> Result<(), BodyError> {
        let mut total = 0usize;
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                return Ok(());
            }
            total += line.len() + 2;
            if total > self.config.max_head_bytes {
                return Err(BodyError::MalformedChunk("trailer section too large"));
            }
        }
    }

    /// Reads one CRLF-terminated line, without the terminator
    async fn read_line(&mut self) -> Result<Bytes, BodyError> {
        loop {
            if let Some(pos) = self.buffer.windows(2).position(|w| w == b"\r\n") {
                let line = self.buffer.split_to(pos).freeze();
                self.buffer.advance(2);
                return Ok(line);
            }

            if self.buffer.len() > MAX_CHUNK_LINE {
                return Err(BodyError::MalformedChunk("line too long"));
            }

            if self.fill().await? == 0 {
                return Err(BodyError::UnexpectedEof);
            }
        }
    }

    /// Writes `response`, adding framing headers
    ///
    /// `version` is the request's version, `head_only` suppresses the body
    /// (HEAD requests) and `close` announces that the connection ends after
    /// this response. HTTP/1.0 clients only reuse a connection that the
    /// response explicitly keeps alive.
    pub async fn write_response(
        &mut self,
        response: &Response<Bytes>,
        version: Version,
        head_only: bool,
        close: bool,
    ) -> io::Result<()> {
        let status = response.status();
        let mut head = BytesMut::with_capacity(256);

        head.extend_from_slice(b"HTTP/1.1 ");
        head.extend_from_slice(status.as_str().as_bytes());
        head.extend_from_slice(b" ");
        head.extend_from_slice(status.canonical_reason().unwrap_or("Unknown").as_bytes());
        head.extend_from_slice(b"\r\n");

        for (name, value) in response.headers() {
            if *name == CONTENT_LENGTH || *name == CONNECTION {
                continue;
            }
            head.extend_from_slice(name.as_str().as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }

        head.extend_from_slice(format!("content-length: {}\r\n", response.body().len()).as_bytes());
        if close {
            head.extend_from_slice(b"connection: close\r\n");
        } else if version == Version::HTTP_10 {
            head.extend_from_slice(b"connection: keep-alive\r\n");
        }
        head.extend_from_slice(b"\r\n");

        self.stream.write_all(&head).await?;
        if !head_only {
            self.stream.write_all(response.body()).await?;
        }
        self.stream.flush().await
    }

    /// Answers a request that could not be parsed
    pub async fn write_error(&mut self, status: StatusCode) -> io::Result<()> {
        self.write_response(&status_response(status), Version::HTTP_11, false, true)
            .await
    }
}

/// Plain-text response whose body is the status line itself
pub fn status_response(status: StatusCode) -> Response<Bytes> {
    let body = format!(
        "{} {}\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("Unknown")
    );
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Whether the connection may carry another request after this one
pub fn wants_keep_alive<B>(request: &Request<B>) -> bool {
    let connection = request.headers().get_all(CONNECTION);
    let has_token = |token: &str| {
        connection.iter().any(|value| {
            value
                .to_str()
                .map(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
                .unwrap_or(false)
        })
    };

    match request.version() {
        Version::HTTP_10 => has_token("keep-alive"),
        _ => !has_token("close"),
    }
}

fn build_head(req: &httparse::Request<'_, '_>) -> Result<Request<()>, HttpError> {
    let method = Method::from_bytes(req.method.unwrap_or_default().as_bytes())
        .map_err(|e| HttpError::InvalidRequest(format!("invalid method: {e}")))?;
    let uri: Uri = req
        .path
        .unwrap_or("/")
        .parse()
        .map_err(|e| HttpError::InvalidRequest(format!("invalid request target: {e}")))?;
    let version = match req.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut headers = HeaderMap::with_capacity(req.headers.len());
    for header in req.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|e| HttpError::InvalidRequest(format!("invalid header name: {e}")))?;
        let value = HeaderValue::from_bytes(header.value)
            .map_err(|e| HttpError::InvalidRequest(format!("invalid header value: {e}")))?;
        headers.append(name, value);
    }

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = headers;
    Ok(request)
}

fn framing(headers: &HeaderMap) -> Result<Framing, HttpError> {
    let mut codings = headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .flat_map(|value| value.to_str().unwrap_or("").split(','))
        .map(str::trim)
        .filter(|coding| !coding.is_empty())
        .peekable();

    // Transfer-Encoding takes precedence over Content-Length
    if codings.peek().is_some() {
        let codings: Vec<&str> = codings.collect();
        return match codings.as_slice() {
            [coding] if coding.eq_ignore_ascii_case("chunked") => Ok(Framing::Chunked),
            _ => Err(HttpError::UnsupportedTransferEncoding(codings.join(", "))),
        };
    }

    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| HttpError::InvalidRequest("invalid content-length".to_string()))?;
        match length {
            Some(previous) if previous != parsed => {
                return Err(HttpError::InvalidRequest(
                    "conflicting content-length values".to_string(),
                ));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(match length {
        Some(0) | None => Framing::None,
        Some(len) => Framing::Length(len),
    })
}

fn expects_continue<B>(request: &Request<B>) -> bool {
    request.version() == Version::HTTP_11
        && request
            .headers()
            .get(EXPECT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, BodyError> {
    let size = line.split(|b| *b == b';').next().unwrap_or_default();
    let size = std::str::from_utf8(size)
        .map_err(|_| BodyError::MalformedChunk("invalid chunk size"))?
        .trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BodyError::MalformedChunk("invalid chunk size"));
    }
    usize::from_str_radix(size, 16).map_err(|_| BodyError::MalformedChunk("chunk size overflow"))
}
