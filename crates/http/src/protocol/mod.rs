//! Protocol types shared by the transport and the dispatch core.
//!
//! - **Events** ([`message`]): [`Message`] and [`PayloadItem`], the vocabulary for both the
//!   inbound request stream and the outbound response stream
//! - **Request head** ([`request`]): [`RequestHeader`], an immutable view of method, URI and headers
//! - **Outbound channel** ([`response`]): [`ResponseHead`] and the [`ResponseChannel`] trait the
//!   transport implements to receive response events
//! - **Errors** ([`error`]): [`HttpError`], [`ParseError`] and [`SendError`]
//!
//! The types here carry no behaviour beyond classification helpers; ordering rules live in
//! [`crate::connection`].

mod message;
pub use message::Message;
pub use message::PayloadItem;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseChannel;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
