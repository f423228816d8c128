//! Subscription system for resource broadcasts.
//!
//! The [`Broadcaster`] owns every active subscription and fans resource
//! changes out to those whose source filter matches. Each subscription has
//! its own bounded queue, so a slow subscriber never holds up the others.
//!
//! Subscriptions end in one of three ways:
//! - the callback fails: the error is reported once and the subscription is
//!   removed,
//! - the owner unregisters it (idempotent),
//! - the subscriber falls behind and its queue overflows.
//!
//! # Example
//!
//! ```ignore
//! let broadcaster = Broadcaster::new();
//!
//! let registration = broadcaster.register("hub", |resource| {
//!     println!("Got resource: {}", resource.resource_id);
//!     Ok(())
//! });
//!
//! broadcaster.notify(&resource);
//!
//! // Later
//! broadcaster.unregister(registration.client_id);
//! ```

mod manager;
mod types;

pub use manager::Broadcaster;
pub use types::{
    BroadcastEvent, ClientId, DropReason, Registration, SourceFilter, SubscriptionConfig,
    SubscriptionHandle, ANY_SOURCE,
};
