//! Transport envelope wrapping an encoded message.

use uuid::Uuid;

use crate::naming::Message;

/// Header carrying the reason a message was moved to an error queue.
pub const FAULT_REASON_HEADER: &str = "fault-reason";
/// Header carrying the number of retries spent before faulting.
pub const FAULT_RETRIES_HEADER: &str = "fault-retries";

/// A message as it travels through a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Unique identifier for this message
    pub message_id: String,
    /// Message type urn (e.g. "urn:message:Shop.Orders:OrderCreated")
    pub message_type: String,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// Transport headers (fault reasons, correlation ids, ...)
    pub headers: Vec<(String, String)>,
}

impl Envelope {
    /// Create an envelope with a fresh message id.
    pub fn new(message_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            message_type: message_type.into(),
            payload,
            headers: Vec::new(),
        }
    }

    /// Encode a typed message as JSON.
    pub fn encode<M: Message>(message: &M) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(message)?;
        Ok(Self::new(M::TYPE.urn(), payload))
    }

    /// Decode the payload back into `M`.
    pub fn decode<M: Message>(&self) -> Result<M, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// True when this envelope carries an `M`.
    pub fn is<M: Message>(&self) -> bool {
        self.message_type == M::TYPE.urn()
    }

    /// Add or replace a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
