use bytes::Bytes;

/// Message is one application datagram carried by the data channel.
/// `is_string` is set when the payload was sent as text; otherwise the
/// payload is binary.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// is_string is set when the payload was sent as text.
    pub is_string: bool,
    /// data is the payload, byte for byte as the peer sent it.
    pub data: Bytes,
}

impl Message {
    /// binary creates a binary message.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            is_string: false,
            data: data.into(),
        }
    }

    /// text creates a text message carrying the UTF-8 bytes of `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_string: true,
            data: Bytes::from(text.into()),
        }
    }

    /// as_text returns the payload as UTF-8 when it is valid UTF-8, regardless
    /// of how it was sent.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    /// len returns the payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
