use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// A violation of the inbound event order, or a request the transport could not accept.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("received a request header while the previous request is still open")]
    UnexpectedHeader,

    #[error("received a payload event before any request header")]
    PayloadWithoutHeader,

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl ParseError {
    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    /// The status of the bare response the connection sends before giving up.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ParseError::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ParseError::UnexpectedHeader
            | ParseError::PayloadWithoutHeader
            | ParseError::InvalidHeader { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("response channel closed")]
    Closed,
}
