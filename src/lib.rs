//! # Herald
//!
//! Bridges a resource store to remote subscribers over CloudEvents.
//!
//! ## Core Concepts
//!
//! - **Resources**: namespaced, versioned objects with a spec and a status
//! - **Codec**: manifest events in, status events out, metadata in extensions
//! - **Store**: current state of every resource, keyed by namespace and id
//! - **Broadcaster**: fans resource changes out to matching subscriptions
//! - **Bridge**: the publish/subscribe service an RPC layer calls into
//!
//! ## Example
//!
//! ```ignore
//! use herald::{Bridge, MemoryStore};
//!
//! let bridge = Arc::new(Bridge::new(Arc::new(MemoryStore::new())));
//!
//! // A subscriber streams status events until `done` fires
//! let (sink, events) = crossbeam_channel::unbounded();
//! let (done_tx, done) = crossbeam_channel::bounded(1);
//! let server = Arc::clone(&bridge);
//! std::thread::spawn(move || server.subscribe("hub", sink, &done));
//!
//! // A publisher pushes a manifest
//! bridge.publish(&wire_event)?;
//! let status = events.recv()?;
//! ```

pub mod binding;
pub mod codec;
pub mod error;
pub mod server;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use binding::{WireAttribute, WireData, WireEvent};
pub use codec::{decode, encode, DataType, Event, EventType, ExtensionValue, SubResource};
pub use error::{BindingError, BridgeError, CodecError, DeliveryError, Result, StoreError};
pub use server::{Bridge, BridgeConfig, EventSink};
pub use store::{MemoryStore, ResourceStore};
pub use subscriptions::{
    BroadcastEvent, Broadcaster, ClientId, DropReason, Registration, SourceFilter,
    SubscriptionConfig, SubscriptionHandle,
};
pub use types::*;
