use async_trait::async_trait;
use switchyard_http::connection::CompleteRequest;
use switchyard_http::handler::Handler;
use switchyard_http::protocol::ResponseChannel;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ErrorInfo;
use crate::middleware::{Fallback, NotFound};
use crate::request::RequestContext;
use crate::response::{ResponseSink, ResponseState};
use crate::router::Router;

/// Entry point for fully received requests.
///
/// For each request the dispatcher builds a fresh [`RequestContext`] and [`ResponseSink`] and runs
/// the router's chain, ending in the fallback (by default [`NotFound`]). If the chain finishes
/// without writing anything, the request is answered with a generic 500 so that it never hangs.
///
/// `Dispatcher` implements the transport [`Handler`], so it can be handed straight to
/// [`HttpConnection::process`](switchyard_http::connection::HttpConnection::process).
pub struct Dispatcher {
    router: Router,
    fallback: Box<dyn Fallback>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("router", &self.router).finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router, fallback: Box::new(NotFound) }
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs one request through the chain and makes sure it gets exactly one response.
    pub async fn dispatch(&self, mut req: RequestContext, mut res: ResponseSink) {
        debug!(method = %req.method(), path = req.path(), "dispatch request");
        self.router.dispatch(&mut req, &mut res, self.fallback.as_ref()).await;

        if res.state() == ResponseState::NotStarted {
            warn!(method = %req.method(), path = req.path(), "chain finished without a response");
            res.write_error(ErrorInfo::unknown());
        }
    }
}

#[async_trait]
impl Handler for Dispatcher {
    async fn call(&self, request: CompleteRequest, channel: Box<dyn ResponseChannel>) {
        self.dispatch(RequestContext::from(request), ResponseSink::from_boxed(channel)).await;
    }
}

pub struct DispatcherBuilder {
    router: Option<Router>,
    fallback: Option<Box<dyn Fallback>>,
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder").field("router", &self.router).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum DispatcherBuildError {
    #[error("router must be set")]
    MissingRouter,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { router: None, fallback: None }
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// The terminal step run when no entry answers, [`NotFound`] if unset
    pub fn fallback<F: Fallback + 'static>(mut self, fallback: F) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn build(self) -> Result<Dispatcher, DispatcherBuildError> {
        let router = self.router.ok_or(DispatcherBuildError::MissingRouter)?;
        let fallback = self.fallback.unwrap_or_else(|| Box::new(NotFound));
        Ok(Dispatcher { router, fallback })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;

    use bytes::Bytes;
    use futures::stream;
    use http::{Method, Request, StatusCode};
    use serde::{Deserialize, Serialize};
    use switchyard_http::connection::HttpConnection;
    use switchyard_http::protocol::{Message, ParseError, PayloadItem, RequestHeader};
    use tokio::sync::mpsc;

    use super::*;
    use crate::handler::{no_input_sync, typed_sync};
    use crate::middleware::{Flow, from_fn};
    use crate::response::tests::{capture, sink};

    fn request(method: Method, uri: &str) -> RequestContext {
        RequestContext::new(Request::builder().method(method).uri(uri).body(()).unwrap().into())
    }

    #[tokio::test]
    async fn unmatched_request_gets_not_found() {
        let dispatcher = Dispatcher::new(Router::new());
        let (res, mut rx) = sink();

        dispatcher.dispatch(request(Method::GET, "/nowhere"), res).await;

        let captured = capture(&mut rx);
        assert_eq!(captured.status(), StatusCode::NOT_FOUND);
        assert_eq!(captured.text(), "Resource Not Found");
        assert!(captured.closed);
    }

    #[tokio::test]
    async fn custom_fallback() {
        let dispatcher = Dispatcher::builder()
            .router(Router::bare())
            .fallback(|req: &RequestContext, res: &mut ResponseSink| {
                res.set_status(StatusCode::METHOD_NOT_ALLOWED).unwrap();
                res.write_text(format!("{} not allowed", req.method()));
            })
            .build()
            .unwrap();
        let (res, mut rx) = sink();

        dispatcher.dispatch(request(Method::PUT, "/"), res).await;

        let captured = capture(&mut rx);
        assert_eq!(captured.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(captured.text(), "PUT not allowed");
    }

    #[tokio::test]
    async fn silent_chain_still_answers() {
        let router = Router::bare();
        router.add(from_fn(|_req, _res| Flow::Stop));
        let dispatcher = Dispatcher::new(router);
        let (res, mut rx) = sink();

        dispatcher.dispatch(request(Method::GET, "/"), res).await;

        let captured = capture(&mut rx);
        assert_eq!(captured.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(captured.json(), serde_json::json!({ "message": "Unknown Error" }));
        assert_eq!(captured.events, 3);
    }

    #[test]
    fn builder_requires_router() {
        assert!(matches!(Dispatcher::builder().build(), Err(DispatcherBuildError::MissingRouter)));
    }

    #[derive(Debug, Deserialize, Serialize)]
    struct Echo {
        msg: String,
    }

    #[tokio::test]
    async fn serves_a_connection_end_to_end() {
        let router = Router::new();
        router.get("/ping", no_input_sync(|| Ok::<_, Infallible>("pong")));
        router.post("/echo", typed_sync(|echo: Echo| Ok::<_, Infallible>(echo)));
        let dispatcher = Arc::new(Dispatcher::new(router));

        let head = |method: Method, uri: &str| -> Result<Message<RequestHeader>, ParseError> {
            Ok(Message::Header(Request::builder().method(method).uri(uri).body(()).unwrap().into()))
        };
        let events = stream::iter(vec![
            head(Method::GET, "/ping"),
            Ok(Message::Payload(PayloadItem::Eof(None))),
            head(Method::POST, "/echo"),
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(br#"{"msg""#)))),
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(br#":"hi"}"#)))),
            Ok(Message::Payload(PayloadItem::Eof(None))),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        HttpConnection::new(events, tx).process(dispatcher).await.unwrap();

        let first = capture_one(&mut rx);
        assert_eq!(first.0, StatusCode::OK);
        assert_eq!(first.1, Bytes::from_static(br#""pong""#));

        let second = capture_one(&mut rx);
        assert_eq!(second.0, StatusCode::OK);
        assert_eq!(second.1, Bytes::from_static(br#"{"msg":"hi"}"#));
    }

    fn capture_one(rx: &mut mpsc::UnboundedReceiver<Message<http::Response<()>>>) -> (StatusCode, Bytes) {
        let head = rx.try_recv().unwrap().into_header().unwrap();
        let body = rx.try_recv().unwrap().into_payload_item().and_then(PayloadItem::into_bytes).unwrap();
        assert!(rx.try_recv().unwrap().is_eof());
        (head.status(), body)
    }
}
