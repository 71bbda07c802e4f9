//! The write-once response side of a request.
//!
//! A [`ResponseSink`] collects the status and headers until the first body write, then emits the
//! whole response through the connection's [`ResponseChannel`] in one go: header commit, body
//! chunk, close. Every request gets at most one response; later writes are ignored.
//!
//! ```text
//! NotStarted ──write──▶ HeadersCommitted ──▶ BodySent ──▶ Closed
//!      │                                                    ▲
//!      └──────────────────────close─────────────────────────┘
//! ```

use std::fmt;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use mime::Mime;
use serde::Serialize;
use switchyard_http::protocol::{Message, PayloadItem, ResponseChannel, ResponseHead};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::ErrorInfo;

/// Where a [`ResponseSink`] is in its lifecycle. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseState {
    /// Status and headers may still change
    NotStarted,
    /// The head has been handed to the transport
    HeadersCommitted,
    /// The body has been handed to the transport
    BodySent,
    /// The close event has been emitted, or the transport failed
    Closed,
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("headers can't change once the response is {state:?}")]
    HeadersCommitted { state: ResponseState },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl ResponseError {
    fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

/// The write-once output channel of one request.
pub struct ResponseSink {
    channel: Box<dyn ResponseChannel>,
    state: ResponseState,
    status: StatusCode,
    headers: HeaderMap,
}

impl fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSink")
            .field("state", &self.state)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ResponseSink {
    pub fn new<C: ResponseChannel + 'static>(channel: C) -> Self {
        Self::from_boxed(Box::new(channel))
    }

    pub fn from_boxed(channel: Box<dyn ResponseChannel>) -> Self {
        Self { channel, state: ResponseState::NotStarted, status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    /// Returns true once the close event has been emitted or the transport failed
    pub fn is_closed(&self) -> bool {
        self.state == ResponseState::Closed
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets the status used by [`write_text`](Self::write_text) and by the head of a response that
    /// is committed without an explicit status.
    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.ensure_not_started()?;
        self.status = status;
        Ok(())
    }

    /// Sets a header field, replacing any previous value of the same name.
    pub fn set_header<K, V>(&mut self, name: K, value: V) -> Result<(), ResponseError>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.ensure_not_started()?;
        let name = <HeaderName as TryFrom<K>>::try_from(name).map_err(|e| ResponseError::invalid_header(Into::<http::Error>::into(e)))?;
        let value =
            <HeaderValue as TryFrom<V>>::try_from(value).map_err(|e| ResponseError::invalid_header(Into::<http::Error>::into(e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn set_content_type(&mut self, mime: &Mime) -> Result<(), ResponseError> {
        self.set_header(CONTENT_TYPE, mime.as_ref())
    }

    /// Writes `text` with the current status, as `text/plain` unless a content type was set
    pub fn write_text(&mut self, text: impl Into<String>) {
        let status = self.status;
        self.write_body(status, &mime::TEXT_PLAIN_UTF_8, false, Bytes::from(text.into()));
    }

    /// Writes raw bytes, as `application/octet-stream` unless a content type was set
    pub fn write_bytes(&mut self, bytes: impl Into<Bytes>, status: StatusCode) {
        self.write_body(status, &mime::APPLICATION_OCTET_STREAM, false, bytes.into());
    }

    /// Serializes `value` as JSON and writes it with `status`.
    ///
    /// If serialization fails the request still gets an answer: a `500` with a plain-text
    /// description of the failure.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T, status: StatusCode) {
        if self.state != ResponseState::NotStarted {
            self.ignore_write();
            return;
        }

        match serde_json::to_vec(value) {
            Ok(body) => self.write_body(status, &mime::APPLICATION_JSON, true, Bytes::from(body)),
            Err(e) => {
                error!(cause = %e, "can't serialize response body");
                self.write_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &mime::TEXT_PLAIN_UTF_8,
                    true,
                    Bytes::from(format!("Server Error: {e}")),
                );
            }
        }
    }

    /// Writes a classified failure: its status with its payload as JSON
    pub fn write_error(&mut self, error: ErrorInfo) {
        let (status, payload) = error.into_parts();
        self.write_json(&payload, status);
    }

    /// Emits the close event, committing nothing if no body was written. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state == ResponseState::Closed {
            return;
        }

        if self.emit(Message::Payload(PayloadItem::Eof(None))) {
            self.state = ResponseState::Closed;
        }
    }

    fn write_body(&mut self, status: StatusCode, default_type: &Mime, force_type: bool, body: Bytes) {
        if self.state != ResponseState::NotStarted {
            self.ignore_write();
            return;
        }

        self.status = status;
        if force_type || !self.headers.contains_key(CONTENT_TYPE) {
            match HeaderValue::from_str(default_type.as_ref()) {
                Ok(value) => {
                    self.headers.insert(CONTENT_TYPE, value);
                }
                Err(e) => warn!(cause = %e, content_type = %default_type, "invalid content type"),
            }
        }
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        let mut head = Response::new(());
        *head.status_mut() = status;
        head.headers_mut().clone_from(&self.headers);

        if !self.emit(Message::Header(head)) {
            return;
        }
        self.state = ResponseState::HeadersCommitted;

        if !body.is_empty() && !self.emit(Message::Payload(PayloadItem::Chunk(body))) {
            return;
        }
        self.state = ResponseState::BodySent;

        self.close();
    }

    /// Sends one event; on failure the sink is closed and nothing more is emitted.
    fn emit(&mut self, message: Message<ResponseHead>) -> bool {
        match self.channel.send(message) {
            Ok(()) => true,
            Err(e) => {
                error!(cause = %e, state = ?self.state, "can't send response, closing it");
                self.state = ResponseState::Closed;
                false
            }
        }
    }

    fn ignore_write(&self) {
        debug!(state = ?self.state, "response already written, ignoring body write");
    }

    fn ensure_not_started(&self) -> Result<(), ResponseError> {
        if self.state == ResponseState::NotStarted {
            Ok(())
        } else {
            Err(ResponseError::HeadersCommitted { state: self.state })
        }
    }
}
