//! Request coalescing and the per-connection event loop
//!
//! - [`RequestAssembler`]: folds the head, body chunks and end event of one request into a
//!   [`CompleteRequest`], enforcing the event order and an optional body size limit
//! - [`HttpConnection`]: drives one connection's event stream through the assembler and hands
//!   each completed request to a [`Handler`](crate::handler::Handler), one at a time
//!
//! Requests are never dispatched before their end event arrives, so a handler always sees the
//! whole body.

mod assembler;
mod http_connection;

pub use assembler::CompleteRequest;
pub use assembler::RequestAssembler;
pub use http_connection::HttpConnection;
