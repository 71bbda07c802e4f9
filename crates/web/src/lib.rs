//! The dispatch core of switchyard
//!
//! This crate turns fully received requests into exactly one response each. A request travels
//! through an ordered chain of middleware entries held by a [`Router`]; route registrations are
//! entries too, matched first-come first-served against `:param` path patterns. The matched route
//! decodes its input, runs the handler and writes the result, or a classified failure, through a
//! write-once [`ResponseSink`].
//!
//! # Example
//!
//! ```no_run
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use switchyard_http::connection::HttpConnection;
//! use switchyard_http::protocol::{Message, ParseError, RequestHeader};
//! use switchyard_web::handler::{no_input_sync, typed_sync};
//! use switchyard_web::{Dispatcher, Router};
//!
//! #[derive(Deserialize, Serialize)]
//! struct Echo {
//!     msg: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new();
//!     router
//!         .get("/ping", no_input_sync(|| Ok::<_, Infallible>("pong")))
//!         .post("/echo", typed_sync(|echo: Echo| Ok::<_, Infallible>(echo)));
//!
//!     let dispatcher = Arc::new(Dispatcher::new(router));
//!
//!     // events and responses come from whatever parses the wire
//!     let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel::<Result<Message<RequestHeader>, ParseError>>();
//!     let (responses_tx, _responses_rx) = tokio::sync::mpsc::unbounded_channel();
//!     # drop(events_tx);
//!     let events = futures::stream::unfold(events_rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) });
//!     HttpConnection::new(Box::pin(events), responses_tx).process(dispatcher).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! - [`request`]: [`RequestContext`], the per-request state every entry reads and extends
//! - [`response`]: [`ResponseSink`], the write-once response state machine
//! - [`middleware`]: the [`Middleware`] trait, the [`Next`] continuation, fallbacks and the
//!   query-string parser
//! - [`router`]: the chain itself, route patterns and the route binder
//! - [`handler`] and [`extract`]: handler shapes and input decoding
//! - [`error`]: failure classification
//! - [`Dispatcher`]: the entry point the transport calls once per request
//!
//! # Limitations
//!
//! - There is no cancellation: once a handler runs it runs to completion, even if the client has
//!   gone away
//! - Entries of one request run strictly one after another

mod dispatcher;

pub mod error;
pub mod extract;
pub mod handler;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;

pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherBuildError;
pub use dispatcher::DispatcherBuilder;
pub use error::DecodeError;
pub use error::DefaultErrorMapper;
pub use error::ErrorInfo;
pub use error::ErrorMapper;
pub use error::HandlerError;
pub use handler::RouteHandler;
pub use middleware::Fallback;
pub use middleware::Middleware;
pub use middleware::Next;
pub use request::Params;
pub use request::RequestContext;
pub use response::ResponseSink;
pub use response::ResponseState;
pub use router::Router;
