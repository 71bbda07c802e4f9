//! The transport boundary of the switchyard request dispatcher
//!
//! This crate sits between whatever parses HTTP/1.1 off a socket and the dispatch core in
//! `switchyard-web`. It does not read or write bytes on the wire itself; instead it defines the
//! event vocabulary both sides agree on and the small amount of machinery that turns a stream of
//! events into whole requests.
//!
//! # Event model
//!
//! Every inbound request arrives as an ordered sequence of [`protocol::Message`]s:
//!
//! 1. exactly one `Message::Header` carrying the [`protocol::RequestHeader`]
//! 2. zero or more `Message::Payload(PayloadItem::Chunk(..))` body chunks
//! 3. exactly one `Message::Payload(PayloadItem::Eof(..))`, optionally carrying trailing headers
//!
//! Every outbound response is emitted through a [`protocol::ResponseChannel`] as the mirror
//! sequence: a header commit, a body chunk, then `Eof` which releases the connection.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use futures::stream;
//! use http::{Request, Response, StatusCode};
//! use switchyard_http::connection::{CompleteRequest, HttpConnection};
//! use switchyard_http::handler::make_handler;
//! use switchyard_http::protocol::{Message, ParseError, PayloadItem, RequestHeader, ResponseChannel, ResponseHead};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = Arc::new(make_handler(|request: CompleteRequest, mut channel: Box<dyn ResponseChannel>| async move {
//!         let head: ResponseHead = Response::builder().status(StatusCode::NO_CONTENT).body(()).unwrap();
//!         tracing::info!(path = request.header().path(), "answering");
//!         let _ = channel.send(Message::Header(head));
//!         let _ = channel.send(Message::Payload(PayloadItem::Eof(None)));
//!     }));
//!
//!     let header: RequestHeader = Request::builder().uri("/ping").body(()).unwrap().into();
//!     let events: Vec<Result<Message<RequestHeader>, ParseError>> =
//!         vec![Ok(Message::Header(header)), Ok(Message::Payload(PayloadItem::Eof(None)))];
//!     let events = stream::iter(events);
//!
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!     HttpConnection::new(events, tx).process(handler).await.unwrap();
//!     while let Some(message) = rx.recv().await {
//!         println!("{}", message.is_header());
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: event types, request head, outbound channel and the error types
//! - [`connection`]: request coalescing ([`connection::RequestAssembler`]) and the per-connection
//!   event loop ([`connection::HttpConnection`])
//! - [`handler`]: the trait the dispatch core implements to receive whole requests
//!
//! # Limitations
//!
//! - One request is dispatched at a time per connection
//! - Client disconnects are not propagated to in-flight handlers; there is no cancellation

pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
