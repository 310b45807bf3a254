//! Link frames
//!
//! Every payload travels in one line of JSON:
//!
//! ```text
//! {"delivery":"background","payload":{"stepsdataresponse":{"stepsCacheDay":"2024-06-01","stepsCacheValue":4200}}}
//! ```
//!
//! The receiving side answers every frame it has read with [`ACK_LINE`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use duffy_core::domain::message::{decode_payload, DecodedPayload};
use duffy_core::domain::{Delivery, DomainError, SyncMessage};

/// Reply written by the receiver once a frame has been handed on
pub const ACK_LINE: &str = "ack\n";

/// True when `line` is an acknowledgement
pub fn is_ack(line: &str) -> bool {
    line.trim_end() == ACK_LINE.trim_end()
}

/// One newline-delimited frame on the paired-device link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub delivery: Delivery,
    pub payload: Value,
}

impl Frame {
    pub fn new(delivery: Delivery, message: &SyncMessage) -> Self {
        Self {
            delivery,
            payload: message.to_payload(),
        }
    }

    pub fn interactive(message: &SyncMessage) -> Self {
        Self::new(Delivery::Interactive, message)
    }

    pub fn background(message: &SyncMessage) -> Self {
        Self::new(Delivery::Background, message)
    }

    /// Serializes the frame as a single line, including the trailing newline
    pub fn to_line(&self) -> Result<String, DomainError> {
        let mut line = serde_json::to_string(self)
            .map_err(|e| DomainError::InvalidPayload(format!("Failed to encode frame: {e}")))?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one line received from the link
    pub fn parse(line: &str) -> Result<Self, DomainError> {
        serde_json::from_str(line.trim_end())
            .map_err(|e| DomainError::InvalidPayload(format!("Malformed frame: {e}")))
    }

    /// Decodes the messages carried by this frame
    pub fn messages(&self) -> Result<DecodedPayload, DomainError> {
        decode_payload(&self.payload)
    }
}
