//! The `{op, d}` envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("Malformed frame: {0}")]
    Malformed(String),
    #[error("Payload does not match schema for '{op}': {message}")]
    Schema { op: String, message: String },
    #[error("Failed to encode payload for '{op}': {message}")]
    Encode { op: String, message: String },
}

/// One decoded message: an operation name plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub op: String,
    #[serde(default)]
    pub d: Value,
}

impl Packet {
    /// Build an outbound packet from any serializable payload.
    pub fn new(op: impl Into<String>, d: impl Serialize) -> Result<Self, PacketError> {
        let op = op.into();
        let d = serde_json::to_value(d).map_err(|e| PacketError::Encode {
            op: op.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { op, d })
    }

    pub fn raw(op: impl Into<String>, d: Value) -> Self {
        Self { op: op.into(), d }
    }

    pub fn empty(op: impl Into<String>) -> Self {
        Self::raw(op, Value::Null)
    }

    /// Parse a text frame into a packet.
    pub fn from_json(text: &str) -> Result<Self, PacketError> {
        serde_json::from_str(text).map_err(|e| PacketError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, PacketError> {
        serde_json::to_string(self).map_err(|e| PacketError::Encode {
            op: self.op.clone(),
            message: e.to_string(),
        })
    }

    /// Decode the payload into a typed schema.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PacketError> {
        // Missing payloads decode like empty objects so optional-only schemas accept them
        let value = if self.d.is_null() {
            Value::Object(Default::default())
        } else {
            self.d.clone()
        };
        serde_json::from_value(value).map_err(|e| PacketError::Schema {
            op: self.op.clone(),
            message: e.to_string(),
        })
    }
}
