use http::StatusCode;
use std::io;

/// Errors raised while reading a request head
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP parsing error: {0}")]
    HttpParse(#[from] httparse::Error),
    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),
    #[error("Incomplete request")]
    IncompleteRequest,
}

impl HttpError {
    /// Status to answer with before closing, if the peer is still there
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Io(_) | HttpError::IncompleteRequest => None,
            HttpError::HttpParse(httparse::Error::TooManyHeaders) | HttpError::HeadTooLarge(_) => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            HttpError::HttpParse(_) | HttpError::InvalidRequest(_) => {
                Some(StatusCode::BAD_REQUEST)
            }
            HttpError::UnsupportedTransferEncoding(_) => Some(StatusCode::NOT_IMPLEMENTED),
        }
    }
}
