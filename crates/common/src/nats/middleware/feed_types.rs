use async_nats::HeaderMap;
use bytes::Bytes;

/// One raw message from the change feed, with all data owned so the batch
/// can travel through Tower middleware without lifetime concerns.
#[derive(Debug, Clone)]
pub struct FeedMessage {
    /// The NATS subject the document change was published to
    pub subject: String,
    /// The serialized document
    pub payload: Bytes,
    /// Optional headers (used for trace context propagation)
    pub headers: Option<HeaderMap>,
}

impl FeedMessage {
    pub fn new(subject: String, payload: Bytes, headers: Option<HeaderMap>) -> Self {
        Self {
            subject,
            payload,
            headers,
        }
    }
}

/// Request type for one change-feed delivery: the whole fetched batch.
///
/// The handler contract is per-batch, so the service stack sees batches,
/// not individual messages.
#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub messages: Vec<FeedMessage>,
}

impl FeedRequest {
    pub fn new(messages: Vec<FeedMessage>) -> Self {
        Self { messages }
    }

    pub fn batch_size(&self) -> usize {
        self.messages.len()
    }
}

/// Response type for a change-feed delivery.
///
/// Indicates whether the batch should be acknowledged or redelivered.
#[derive(Debug, Clone)]
pub enum FeedResponse {
    /// Batch was handled successfully - acknowledge every message
    Ack,
    /// Handling failed - reject the batch for redelivery
    Nak(Option<String>),
}

impl FeedResponse {
    pub fn ack() -> Self {
        Self::Ack
    }

    pub fn nak(reason: impl Into<String>) -> Self {
        Self::Nak(Some(reason.into()))
    }

    pub fn nak_no_reason() -> Self {
        Self::Nak(None)
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    pub fn is_nak(&self) -> bool {
        matches!(self, Self::Nak(_))
    }
}
