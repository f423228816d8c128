//! Publish/subscribe service tying the binding, codec, store and broadcaster
//! together.
//!
//! The RPC layer owns connections and framing; it hands [`Bridge`] decoded
//! [`WireEvent`]s on publish, and an [`EventSink`] plus a done signal on
//! subscribe.

use crate::binding::{self, WireEvent};
use crate::codec;
use crate::error::{DeliveryError, Result};
use crate::store::ResourceStore;
use crate::subscriptions::Broadcaster;
use crate::types::Resource;
use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bridge configuration.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Max events queued per subscriber before it is dropped.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// Where a subscriber's events go, usually a server stream.
pub trait EventSink: Send + 'static {
    /// Send one event. May block on I/O.
    fn send(&mut self, event: WireEvent) -> std::result::Result<(), DeliveryError>;
}

impl EventSink for Sender<WireEvent> {
    fn send(&mut self, event: WireEvent) -> std::result::Result<(), DeliveryError> {
        Sender::send(self, event).map_err(|_| DeliveryError::Send("subscriber disconnected".into()))
    }
}

/// The publish/subscribe service.
pub struct Bridge<S: ResourceStore> {
    store: Arc<S>,
    broadcaster: Broadcaster,
    /// Keeps store writes and their notifications in the same order.
    publish_lock: Mutex<()>,
}

impl<S: ResourceStore> Bridge<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, BridgeConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: BridgeConfig) -> Self {
        Self {
            store,
            broadcaster: Broadcaster::with_buffer_size(config.buffer_size),
            publish_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Accept a published event.
    ///
    /// The event is fully decoded before the store is touched, so a rejected
    /// publish leaves no trace. Subscribers are notified after the write.
    pub fn publish(&self, wire: &WireEvent) -> Result<()> {
        let event = binding::to_event(wire)?;
        let resource = codec::decode(&event).map_err(|e| {
            warn!(event_id = %event.id, error = %e, "Rejecting publish");
            e
        })?;

        self.apply(resource)
    }

    /// Write a resource to the store and notify subscribers.
    pub fn apply(&self, resource: Resource) -> Result<()> {
        let _lock = self.publish_lock.lock();

        self.store.upsert(resource.clone())?;
        let delivered = self.broadcaster.notify(&resource);

        debug!(
            resource = %resource.key(),
            version = resource.resource_version,
            delivered,
            "Published resource"
        );
        Ok(())
    }

    /// Stream status events for resources from `source` into `sink` until
    /// delivery fails or `done` fires.
    ///
    /// `done` fires on a message or when its sender is dropped. Cancellation
    /// returns `Ok(())`; a delivery failure returns that failure. The
    /// subscription is unregistered either way.
    pub fn subscribe<K: EventSink>(&self, source: &str, mut sink: K, done: &Receiver<()>) -> Result<()> {
        let registration = self.broadcaster.register(source, move |resource: &Resource| {
            let event = codec::encode(resource).map_err(|e| DeliveryError::Encode {
                resource_id: resource.resource_id.clone(),
                source: e,
            })?;
            sink.send(binding::from_event(&event))
        });
        let client_id = registration.client_id;
        debug!(client_id = %client_id, source, "Subscriber connected");

        let outcome = select! {
            recv(registration.errors) -> err => err.ok(),
            recv(done) -> _ => None,
        };

        self.broadcaster.unregister(client_id);
        match outcome {
            Some(e) => {
                warn!(client_id = %client_id, error = %e, "Subscriber terminated");
                Err(e.into())
            }
            None => {
                debug!(client_id = %client_id, "Subscriber finished");
                Ok(())
            }
        }
    }
}
