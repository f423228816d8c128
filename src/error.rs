//! Error types for the bridge.

use crate::types::ResourceKey;
use thiserror::Error;

/// Failures while translating between resources and events.
///
/// All codec errors are non-retryable: the event is structurally invalid and
/// the publish carrying it must be rejected.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode manifest status: {0}")]
    Encoding(String),

    #[error("failed to parse event type {event_type}: {reason}")]
    MalformedType { event_type: String, reason: String },

    #[error("unsupported event data type {0}")]
    UnsupportedType(String),

    #[error("failed to get {name} extension: {reason}")]
    MissingExtension { name: String, reason: String },

    #[error("failed to unmarshal event data {payload}: {reason}")]
    PayloadDecode { payload: String, reason: String },

    #[error("failed to convert deletion timestamp {value}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// Failures delivering a resource to a single subscriber.
///
/// Never fatal to the broadcaster or to other subscriptions.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to encode resource {resource_id}: {source}")]
    Encode {
        resource_id: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to send event to subscriber: {0}")]
    Send(String),

    #[error("subscriber fell behind and was dropped")]
    Lagged,

    #[error("subscriber callback failed: {0}")]
    Callback(String),
}

/// Failures reported by a resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stale resource version for {key}: current {current}, attempted {attempted}")]
    StaleVersion {
        key: ResourceKey,
        current: i64,
        attempted: i64,
    },
}

/// Failures converting between the wire message and an event.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("invalid attribute {name}: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("frame error: {0}")]
    Frame(String),
}

impl From<rmp_serde::encode::Error> for BindingError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        BindingError::Frame(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for BindingError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        BindingError::Frame(e.to_string())
    }
}

/// Main error type surfaced by the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to convert wire message to cloudevent: {0}")]
    Binding(#[from] BindingError),

    #[error("failed to decode cloudevent: {0}")]
    Codec(#[from] CodecError),

    #[error("failed to store resource: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
