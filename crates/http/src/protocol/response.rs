//! The outbound half of the transport boundary.
//!
//! A response leaves the dispatch core as three events sent through a [`ResponseChannel`]:
//! the head ([`ResponseHead`]), one body chunk, and the end marker which tells the transport to
//! flush and release the connection slot. The transport guarantees the events reach the wire in
//! the order they were sent.

use http::Response;
use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::{Message, SendError};

/// Type alias for HTTP response headers.
///
/// `http::Response<()>` with an empty body placeholder: status, version and header fields,
/// committed before any body bytes are sent.
pub type ResponseHead = Response<()>;

/// The transport's receiving end for response events.
///
/// Implementations must preserve order and must treat `Message::Payload(PayloadItem::Eof(_))`
/// as the close event for the current response.
pub trait ResponseChannel: Send {
    /// Hands one response event to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] when the transport can no longer accept events for this response,
    /// typically because the connection is gone.
    fn send(&mut self, message: Message<ResponseHead>) -> Result<(), SendError>;
}

/// An in-process transport: events are queued for whoever holds the receiving half.
impl ResponseChannel for UnboundedSender<Message<ResponseHead>> {
    fn send(&mut self, message: Message<ResponseHead>) -> Result<(), SendError> {
        UnboundedSender::send(self, message).map_err(|_closed| SendError::Closed)
    }
}

impl<C: ResponseChannel + ?Sized> ResponseChannel for Box<C> {
    fn send(&mut self, message: Message<ResponseHead>) -> Result<(), SendError> {
        (**self).send(message)
    }
}
