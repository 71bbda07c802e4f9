use std::sync::Arc;

use futures::{Stream, StreamExt};
use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Response, StatusCode};
use tracing::{error, info, warn};

use super::RequestAssembler;
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, RequestHeader, ResponseChannel, ResponseHead};

/// Drives one connection's inbound events through a [`Handler`]
///
/// `HttpConnection` owns both directions of a single connection:
/// - the inbound event stream, produced by whatever parses the wire format
/// - the outbound [`ResponseChannel`], cloned once per request and handed to the handler
///
/// Requests are coalesced with a [`RequestAssembler`] and dispatched strictly one at a time: the
/// next request is not read until the handler future for the previous one has completed.
///
/// # Type Parameters
///
/// * `S`: the inbound event stream
/// * `C`: the outbound channel type
pub struct HttpConnection<S, C> {
    events: S,
    channel: C,
    assembler: RequestAssembler,
}

impl<S, C> std::fmt::Debug for HttpConnection<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("assembler", &self.assembler).finish_non_exhaustive()
    }
}

impl<S, C> HttpConnection<S, C>
where
    S: Stream<Item = Result<Message<RequestHeader>, ParseError>> + Unpin,
    C: ResponseChannel + Clone + 'static,
{
    pub fn new(events: S, channel: C) -> Self {
        Self { events, channel, assembler: RequestAssembler::new() }
    }

    /// Rejects any request whose body exceeds `max_body_size` bytes with a bare 413.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.assembler = self.assembler.with_max_body_size(max_body_size);
        self
    }

    /// Serves requests until the event stream ends or the transport breaks protocol.
    ///
    /// On a protocol violation a bare error response is sent before returning the error, and
    /// the connection should be torn down.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            match self.events.next().await {
                Some(Ok(message)) => match self.assembler.feed(message) {
                    Ok(Some(request)) => {
                        handler.call(request, Box::new(self.channel.clone())).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(cause = %e, "can't assemble request, closing connection");
                        self.send_error_response(e.status_code())?;
                        return Err(e.into());
                    }
                },

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request event");
                    self.send_error_response(e.status_code())?;
                    return Err(e.into());
                }

                None => {
                    if self.assembler.is_pending() {
                        warn!("event stream ended inside a request, dropping it");
                    }
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    fn send_error_response(&mut self, status_code: StatusCode) -> Result<(), HttpError> {
        self.channel.send(Message::Header(build_error_response(status_code)))?;
        self.channel.send(Message::Payload(PayloadItem::Eof(None)))?;
        Ok(())
    }
}

fn build_error_response(status_code: StatusCode) -> ResponseHead {
    let mut head = Response::new(());
    *head.status_mut() = status_code;
    head.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    head
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures::stream;
    use http::{Method, Request};
    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::CompleteRequest;
    use crate::handler::make_handler;
    use crate::protocol::SendError;

    fn head(method: Method, uri: &str) -> Result<Message<RequestHeader>, ParseError> {
        Ok(Message::Header(Request::builder().method(method).uri(uri).body(()).unwrap().into()))
    }

    fn chunk(bytes: &'static [u8]) -> Result<Message<RequestHeader>, ParseError> {
        Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(bytes))))
    }

    fn eof() -> Result<Message<RequestHeader>, ParseError> {
        Ok(Message::Payload(PayloadItem::Eof(None)))
    }

    fn echo_path() -> impl Handler {
        make_handler(|request: CompleteRequest, mut channel: Box<dyn ResponseChannel>| async move {
            channel.send(Message::Header(Response::new(()))).unwrap();
            channel.send(Message::Payload(PayloadItem::Chunk(Bytes::copy_from_slice(request.header().path().as_bytes())))).unwrap();
            if let Some(body) = request.body() {
                channel.send(Message::Payload(PayloadItem::Chunk(body.clone()))).unwrap();
            }
            channel.send(Message::Payload(PayloadItem::Eof(None))).unwrap();
        })
    }

    #[tokio::test]
    async fn dispatches_each_complete_request_in_order() {
        let events = stream::iter(vec![
            head(Method::GET, "/first"),
            eof(),
            head(Method::POST, "/second"),
            chunk(b"ab"),
            chunk(b"cd"),
            eof(),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        HttpConnection::new(events, tx).process(Arc::new(echo_path())).await.unwrap();

        let mut chunks = vec![];
        while let Some(message) = rx.recv().await {
            if let Some(bytes) = message.into_payload_item().and_then(PayloadItem::into_bytes) {
                chunks.push(bytes);
            }
        }
        assert_eq!(chunks, vec![Bytes::from_static(b"/first"), Bytes::from_static(b"/second"), Bytes::from_static(b"abcd")]);
    }

    #[tokio::test]
    async fn incomplete_request_is_never_dispatched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = make_handler(move |_request: CompleteRequest, _channel: Box<dyn ResponseChannel>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        });

        let events = stream::iter(vec![head(Method::POST, "/upload"), chunk(b"partial")]);
        let (tx, _rx) = mpsc::unbounded_channel();

        HttpConnection::new(events, tx).process(Arc::new(handler)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn protocol_violation_sends_bare_400() {
        let events = stream::iter(vec![chunk(b"orphan")]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = HttpConnection::new(events, tx).process(Arc::new(echo_path())).await;
        assert!(matches!(result, Err(HttpError::RequestError { source: ParseError::PayloadWithoutHeader })));

        let head = rx.recv().await.unwrap().into_header().unwrap();
        assert_eq!(head.status(), StatusCode::BAD_REQUEST);
        assert_eq!(head.headers().get(CONTENT_LENGTH).unwrap(), "0");
        assert!(rx.recv().await.unwrap().is_eof());
    }

    #[tokio::test]
    async fn oversized_body_sends_413() {
        let events = stream::iter(vec![head(Method::POST, "/upload"), chunk(b"0123456789"), eof()]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = HttpConnection::new(events, tx).with_max_body_size(8).process(Arc::new(echo_path())).await;
        assert!(matches!(result, Err(HttpError::RequestError { source: ParseError::TooLargeBody { .. } })));

        let head = rx.recv().await.unwrap().into_header().unwrap();
        assert_eq!(head.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn transport_error_is_reported_on_closed_channel() {
        let events = stream::iter(vec![Err(ParseError::invalid_header("bad line folding"))]);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let result = HttpConnection::new(events, tx).process(Arc::new(echo_path())).await;
        assert!(matches!(result, Err(HttpError::ResponseError { source: SendError::Closed })));
    }
}
