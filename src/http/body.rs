use bytes::Bytes;
use std::io;

/// Request body as handed to a handler
///
/// The connection reads the whole body before dispatching; a failure to do
/// so is carried here instead of failing the request.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Full(Bytes),
    Failed(BodyError),
}

/// Reasons a request body could not be read in full
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("unexpected EOF")]
    UnexpectedEof,
    #[error("malformed chunked encoding: {0}")]
    MalformedChunk(&'static str),
    #[error("request body too large (limit {0} bytes)")]
    TooLarge(usize),
    #[error("{0}")]
    Io(#[from] io::Error),
}

impl Body {
    /// Consumes the body, yielding its bytes or the read failure
    pub fn into_bytes(self) -> Result<Bytes, BodyError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Failed(err) => Err(err),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Body::Failed(_))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Full(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Full(Bytes::from(v))
    }
}

impl From<Result<Bytes, BodyError>> for Body {
    fn from(result: Result<Bytes, BodyError>) -> Self {
        match result {
            Ok(bytes) if bytes.is_empty() => Body::Empty,
            Ok(bytes) => Body::Full(bytes),
            Err(err) => Body::Failed(err),
        }
    }
}
