use bytes::Bytes;
use http::HeaderMap;

/// One event of an HTTP message stream: either the head or a piece of the payload.
///
/// The same shape is used in both directions. Inbound, `T` is a
/// [`RequestHeader`](crate::protocol::RequestHeader); outbound, `T` is a
/// [`ResponseHead`](crate::protocol::ResponseHead).
#[derive(Debug)]
pub enum Message<T> {
    /// The head of the message, always the first event
    Header(T),
    /// A chunk of payload data or the end-of-message marker
    Payload(PayloadItem),
}

/// An item in the payload half of a message stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of body data
    Chunk(Bytes),
    /// Marks the end of the message. Inbound it may carry trailing headers; outbound it is the
    /// close event and never carries any.
    Eof(Option<HeaderMap>),
}

impl<T> Message<T> {
    /// Returns true if this message carries payload data or the end marker
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message is the head
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Returns true if this message is the end-of-message marker
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Message::Payload(PayloadItem::Eof(_)))
    }

    /// Consumes the message and returns the head, if this is one
    pub fn into_header(self) -> Option<T> {
        match self {
            Message::Header(header) => Some(header),
            Message::Payload(_) => None,
        }
    }

    /// Consumes the message and returns the payload item, if this is one
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Header(_) => None,
            Message::Payload(payload_item) => Some(payload_item),
        }
    }
}

/// Lets a body chunk be sent as `channel.send(bytes.into())`.
impl<T> From<Bytes> for Message<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

impl PayloadItem {
    /// Returns true if this item is the end marker
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof(_))
    }

    /// Returns true if this item carries body data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns the contained bytes if this is a chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }

    /// Consumes the item and returns the contained bytes if this is a chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_is_payload_but_not_chunk() {
        let message: Message<()> = Message::Payload(PayloadItem::Eof(None));
        assert!(message.is_payload());
        assert!(message.is_eof());
        assert!(!message.is_header());
        assert!(!message.into_payload_item().unwrap().is_chunk());
    }

    #[test]
    fn bytes_convert_into_chunk() {
        let message: Message<()> = Bytes::from_static(b"hello").into();
        let item = message.into_payload_item().unwrap();
        assert!(item.is_chunk());
        assert_eq!(item.as_bytes().map(Bytes::as_ref), Some(&b"hello"[..]));
        assert_eq!(item.into_bytes(), Some(Bytes::from_static(b"hello")));
    }

    #[test]
    fn header_message_has_no_payload() {
        let message = Message::Header(42);
        assert!(message.is_header());
        assert_eq!(message.into_header(), Some(42));
        assert!(Message::Header(7).into_payload_item().is_none());
    }
}
