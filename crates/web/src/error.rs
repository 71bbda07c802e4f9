//! Failure classification for matched routes.
//!
//! Every failure a route can produce ends up as an [`ErrorInfo`]: a status code and a JSON payload
//! written to the client. The path there is:
//!
//! - the handler (or input decoding) fails with a [`HandlerError`]
//! - the router's [`ErrorMapper`] classifies it into an [`ErrorInfo`]
//! - the route writes it with [`ResponseSink::write_error`](crate::ResponseSink::write_error)
//!
//! [`DefaultErrorMapper`] passes structured errors through untouched and hides everything else
//! behind a generic 500.

use std::error::Error;
use std::fmt;

use http::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// A client-visible failure: status code plus serializable payload.
///
/// Return it from a handler (it converts into [`HandlerError`]) to choose the response exactly.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("application error with status {status}")]
pub struct ErrorInfo {
    status: StatusCode,
    payload: Value,
}

impl ErrorInfo {
    pub fn new(status: StatusCode, payload: Value) -> Self {
        Self { status, payload }
    }

    /// Builds `{"message": message}` with `status`
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "message": message.into() }))
    }

    /// Serializes `payload` into the error body.
    ///
    /// Falls back to [`ErrorInfo::unknown`] if the payload cannot be represented as JSON.
    pub fn from_serializable<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => Self::new(status, payload),
            Err(e) => {
                error!(cause = %e, "can't serialize error payload");
                Self::unknown()
            }
        }
    }

    /// The generic 500 sent for anything unclassified
    pub fn unknown() -> Self {
        Self::message(StatusCode::INTERNAL_SERVER_ERROR, "Unknown Error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_parts(self) -> (StatusCode, Value) {
        (self.status, self.payload)
    }
}

/// The input of a handler could not be built from the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("can't decode field `{field}`: {reason}")]
pub struct DecodeError {
    field: String,
    reason: String,
}

impl DecodeError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "missing")
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The 400 response describing the offending field
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::new(StatusCode::BAD_REQUEST, json!({ "field": self.field, "reason": self.reason }))
    }
}

/// Any failure of a matched route, before classification.
///
/// Handlers return `Result<T, E>` for any `E` that converts into `HandlerError`, which includes
/// every `std::error::Error + Send + Sync + 'static`. The conversion keeps [`ErrorInfo`] and
/// [`DecodeError`] recognisable, so `?` on either of them preserves its classification.
pub enum HandlerError {
    Decode(DecodeError),
    Application(ErrorInfo),
    Unclassified(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    /// Wraps an already boxed error, keeping a recognised classification
    pub fn from_boxed(error: Box<dyn Error + Send + Sync>) -> Self {
        let error = match error.downcast::<ErrorInfo>() {
            Ok(info) => return Self::Application(*info),
            Err(error) => error,
        };

        match error.downcast::<DecodeError>() {
            Ok(decode) => Self::Decode(*decode),
            Err(error) => Self::Unclassified(error),
        }
    }
}

impl<E> From<E> for HandlerError
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::from_boxed(Box::new(error))
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Decode(e) => f.debug_tuple("Decode").field(e).finish(),
            HandlerError::Application(e) => f.debug_tuple("Application").field(e).finish(),
            HandlerError::Unclassified(e) => f.debug_tuple("Unclassified").field(e).finish(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Decode(e) => fmt::Display::fmt(e, f),
            HandlerError::Application(e) => fmt::Display::fmt(e, f),
            HandlerError::Unclassified(e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Classifies route failures into client-visible responses.
pub trait ErrorMapper: Send + Sync {
    fn classify(&self, error: HandlerError) -> ErrorInfo;
}

impl<F> ErrorMapper for F
where
    F: Fn(HandlerError) -> ErrorInfo + Send + Sync,
{
    fn classify(&self, error: HandlerError) -> ErrorInfo {
        (self)(error)
    }
}

/// The mapper every router starts with.
///
/// - decode failures become 400 with `{"field": .., "reason": ..}`
/// - [`ErrorInfo`] is used verbatim
/// - anything else is logged and becomes 500 `{"message": "Unknown Error"}`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorMapper;

impl ErrorMapper for DefaultErrorMapper {
    fn classify(&self, error: HandlerError) -> ErrorInfo {
        match error {
            HandlerError::Decode(e) => e.to_error_info(),
            HandlerError::Application(info) => info,
            HandlerError::Unclassified(e) => {
                error!(cause = %e, "unclassified handler error");
                ErrorInfo::unknown()
            }
        }
    }
}
