//! Codec between resources and CloudEvents.
//!
//! The two directions are deliberately asymmetric:
//! - [`decode`] consumes *manifest* events (desired state pushed by a
//!   publisher) and produces a resource carrying the manifest.
//! - [`encode`] produces *status* events (observed state sent to
//!   subscribers) carrying only the status conditions.
//!
//! Metadata (resource id, version, cluster name, deletion timestamp) travels
//! in extension attributes and survives both directions; the manifest and the
//! status never survive a single round trip together.
//!
//! # Example
//!
//! ```ignore
//! let event = codec::encode(&resource)?;
//! let metadata = codec::decode(&event)?;
//! assert_eq!(metadata.resource_id, resource.resource_id);
//! ```

mod convert;
mod event;
pub mod payload;

pub use convert::{decode, encode};
pub use event::{
    DataType, Event, EventType, ExtensionValue, SubResource, APPLICATION_JSON, SPEC_VERSION,
};
