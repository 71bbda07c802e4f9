use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use tracing::trace;

use crate::ensure;
use crate::protocol::{Message, ParseError, PayloadItem, RequestHeader};

/// A fully received request: head, coalesced body and trailing headers.
#[derive(Debug)]
pub struct CompleteRequest {
    header: RequestHeader,
    body: Option<Bytes>,
    trailers: Option<HeaderMap>,
}

impl CompleteRequest {
    pub fn new(header: RequestHeader, body: Option<Bytes>, trailers: Option<HeaderMap>) -> Self {
        Self { header, body, trailers }
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    /// The body, present only if the transport delivered at least one non-empty chunk
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    pub fn into_parts(self) -> (RequestHeader, Option<Bytes>, Option<HeaderMap>) {
        (self.header, self.body, self.trailers)
    }
}

/// Folds the event stream of one logical request slot into whole requests.
///
/// Feed it every inbound [`Message`] in arrival order. It returns `Some` exactly once per request,
/// when the end event arrives.
#[derive(Debug, Default)]
pub struct RequestAssembler {
    pending: Option<PendingRequest>,
    max_body_size: Option<usize>,
}

#[derive(Debug)]
struct PendingRequest {
    header: RequestHeader,
    body: Option<BytesMut>,
}

impl RequestAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects requests whose coalesced body grows beyond `max_body_size` bytes.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    /// Returns true while a request head has been received but its end event has not.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Accepts the next inbound event.
    ///
    /// # Errors
    ///
    /// - [`ParseError::UnexpectedHeader`] if a head arrives while a request is still open
    /// - [`ParseError::PayloadWithoutHeader`] if a chunk or end event arrives with no open request
    /// - [`ParseError::TooLargeBody`] if the body exceeds the configured limit
    ///
    /// After an error the open request, if any, is discarded.
    pub fn feed(&mut self, message: Message<RequestHeader>) -> Result<Option<CompleteRequest>, ParseError> {
        match message {
            Message::Header(header) => {
                ensure!(self.pending.is_none(), self.fail(ParseError::UnexpectedHeader));
                trace!(method = %header.method(), uri = %header.uri(), "receive request header");
                self.pending = Some(PendingRequest { header, body: None });
                Ok(None)
            }

            Message::Payload(PayloadItem::Chunk(bytes)) => {
                let Some(pending) = self.pending.as_ref() else {
                    return Err(ParseError::PayloadWithoutHeader);
                };

                if bytes.is_empty() {
                    return Ok(None);
                }

                let current_size = pending.body.as_ref().map_or(0, BytesMut::len) + bytes.len();
                if let Some(max_size) = self.max_body_size {
                    ensure!(current_size <= max_size, self.fail(ParseError::too_large_body(current_size, max_size)));
                }

                if let Some(pending) = self.pending.as_mut() {
                    pending.body.get_or_insert_with(BytesMut::new).extend_from_slice(&bytes);
                }
                Ok(None)
            }

            Message::Payload(PayloadItem::Eof(trailers)) => {
                let pending = self.pending.take().ok_or(ParseError::PayloadWithoutHeader)?;
                let body = pending.body.map(BytesMut::freeze);
                trace!(body_size = body.as_ref().map_or(0, Bytes::len), "request complete");
                Ok(Some(CompleteRequest::new(pending.header, body, trailers)))
            }
        }
    }

    fn fail(&mut self, error: ParseError) -> ParseError {
        self.pending = None;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method, Request};

    fn head(method: Method, uri: &str) -> Message<RequestHeader> {
        Message::Header(Request::builder().method(method).uri(uri).body(()).unwrap().into())
    }

    fn chunk(bytes: &'static [u8]) -> Message<RequestHeader> {
        Message::Payload(PayloadItem::Chunk(Bytes::from_static(bytes)))
    }

    fn eof() -> Message<RequestHeader> {
        Message::Payload(PayloadItem::Eof(None))
    }

    #[test]
    fn completes_only_on_eof() {
        let mut assembler = RequestAssembler::new();

        assert!(assembler.feed(head(Method::GET, "/ping")).unwrap().is_none());
        assert!(assembler.is_pending());

        let request = assembler.feed(eof()).unwrap().unwrap();
        assert!(!assembler.is_pending());
        assert_eq!(request.header().path(), "/ping");
        assert!(request.body().is_none());
        assert!(request.trailers().is_none());
    }

    #[test]
    fn coalesces_every_chunk() {
        let mut assembler = RequestAssembler::new();

        assembler.feed(head(Method::POST, "/echo")).unwrap();
        assembler.feed(chunk(br#"{"msg""#)).unwrap();
        assembler.feed(chunk(b"")).unwrap();
        assembler.feed(chunk(br#":"hi"}"#)).unwrap();

        let request = assembler.feed(eof()).unwrap().unwrap();
        assert_eq!(request.body().unwrap().as_ref(), br#"{"msg":"hi"}"#);
    }

    #[test]
    fn empty_chunks_leave_body_absent() {
        let mut assembler = RequestAssembler::new();

        assembler.feed(head(Method::POST, "/echo")).unwrap();
        assembler.feed(chunk(b"")).unwrap();

        let request = assembler.feed(eof()).unwrap().unwrap();
        assert!(request.body().is_none());
    }

    #[test]
    fn keeps_trailers() {
        let mut assembler = RequestAssembler::new();
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", HeaderValue::from_static("abc"));

        assembler.feed(head(Method::PUT, "/upload")).unwrap();
        let request = assembler.feed(Message::Payload(PayloadItem::Eof(Some(trailers)))).unwrap().unwrap();

        let (_header, _body, trailers) = request.into_parts();
        assert_eq!(trailers.unwrap().get("x-checksum").unwrap(), "abc");
    }

    #[test]
    fn serves_requests_one_after_another() {
        let mut assembler = RequestAssembler::new();

        assembler.feed(head(Method::GET, "/first")).unwrap();
        let first = assembler.feed(eof()).unwrap().unwrap();
        assembler.feed(head(Method::GET, "/second")).unwrap();
        let second = assembler.feed(eof()).unwrap().unwrap();

        assert_eq!(first.header().path(), "/first");
        assert_eq!(second.header().path(), "/second");
    }

    #[test]
    fn rejects_out_of_order_events() {
        let mut assembler = RequestAssembler::new();
        assert!(matches!(assembler.feed(chunk(b"x")), Err(ParseError::PayloadWithoutHeader)));
        assert!(matches!(assembler.feed(eof()), Err(ParseError::PayloadWithoutHeader)));

        assembler.feed(head(Method::GET, "/a")).unwrap();
        assert!(matches!(assembler.feed(head(Method::GET, "/b")), Err(ParseError::UnexpectedHeader)));
        assert!(!assembler.is_pending());
    }

    #[test]
    fn enforces_body_limit() {
        let mut assembler = RequestAssembler::new().with_max_body_size(4);

        assembler.feed(head(Method::POST, "/upload")).unwrap();
        assembler.feed(chunk(b"abc")).unwrap();

        let error = assembler.feed(chunk(b"de")).unwrap_err();
        assert!(matches!(error, ParseError::TooLargeBody { current_size: 5, max_size: 4 }));
        assert!(!assembler.is_pending());
    }
}
