//! Broadcaster fanning resource changes out to subscriptions.

use crate::error::DeliveryError;
use crate::types::Resource;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, trace, warn};

use super::types::{
    BroadcastEvent, ClientId, DropReason, Registration, SharedState, SourceFilter,
    SubscriptionConfig, SubscriptionHandle,
};

/// Default queue capacity per subscription.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<BroadcastEvent>,
    state: Arc<SharedState>,
}

impl Subscription {
    /// Try to queue an event without blocking.
    fn try_send(&self, event: BroadcastEvent) -> Result<(), DropReason> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DropReason::BufferOverflow),
            Err(TrySendError::Disconnected(_)) => Err(DropReason::Disconnected),
        }
    }

    fn matches(&self, resource: &Resource) -> bool {
        self.config.filter.matches(&resource.source)
    }
}

struct Inner {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<ClientId, Subscription>>,
    /// Counter for generating client IDs.
    next_id: AtomicU64,
    /// Queue capacity for callback registrations.
    buffer_size: usize,
}

/// Owns the set of active subscriptions and delivers resource changes to
/// them.
///
/// Cloning is cheap; clones share the same subscription set.
///
/// Two ways to subscribe:
/// - [`subscribe`](Self::subscribe) hands back a bounded queue the caller
///   drains itself.
/// - [`register`](Self::register) takes a callback and runs it on a
///   dedicated delivery thread, reporting the first failure on a
///   single-slot error channel.
///
/// No lock is held while a callback runs, and [`notify`](Self::notify)
/// never blocks on a subscriber: a full queue drops that subscriber only.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Broadcaster {
    /// Create a new broadcaster.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster whose callback registrations use the given
    /// queue capacity.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscriptions: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                buffer_size: buffer_size.max(1),
            }),
        }
    }

    // --- Queue API ---

    /// Create a new subscription and return its queue.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = ClientId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));
        let state = SharedState::new();

        debug!(client_id = %id, filter = ?config.filter, "Subscription registered");

        let subscription = Subscription {
            config,
            sender,
            state: Arc::clone(&state),
        };
        self.inner.subscriptions.write().insert(id, subscription);

        SubscriptionHandle {
            id,
            receiver,
            state,
        }
    }

    /// Unsubscribe and clean up. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ClientId) {
        let removed = self.inner.subscriptions.write().remove(&id);
        if let Some(sub) = removed {
            sub.state.deactivate(DropReason::Unsubscribed);
            // Best effort; the queue may be full or gone.
            let _ = sub.try_send(BroadcastEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
            debug!(client_id = %id, "Subscription removed");
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    /// Queue a resource for every subscription whose filter matches its
    /// source. Returns how many subscriptions accepted it.
    pub fn notify(&self, resource: &Resource) -> usize {
        let mut delivered = 0;
        let mut to_remove = Vec::new();

        {
            let subs = self.inner.subscriptions.read();
            for (id, sub) in subs.iter() {
                if !sub.matches(resource) {
                    continue;
                }
                match sub.try_send(BroadcastEvent::Resource(resource.clone())) {
                    Ok(()) => delivered += 1,
                    Err(reason) => to_remove.push((*id, reason)),
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.inner.subscriptions.write();
            for (id, reason) in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(client_id = %id, ?reason, "Dropping subscriber");
                    sub.state.deactivate(reason);
                }
            }
        }

        trace!(
            resource = %resource.key(),
            source = %resource.source,
            delivered,
            "Broadcast resource"
        );
        delivered
    }

    // --- Callback API ---

    /// Register a callback for resources from `source_filter`.
    ///
    /// The callback runs on its own thread. The first error it returns is
    /// pushed onto `errors` and the subscription is removed, so it receives
    /// nothing afterwards. A subscriber that falls behind by more than the
    /// queue capacity is dropped with [`DeliveryError::Lagged`].
    pub fn register<F>(&self, source_filter: impl Into<SourceFilter>, callback: F) -> Registration
    where
        F: FnMut(&Resource) -> Result<(), DeliveryError> + Send + 'static,
    {
        let handle = self.subscribe(SubscriptionConfig {
            buffer_size: self.inner.buffer_size,
            filter: source_filter.into(),
        });
        let client_id = handle.id;
        let (errors_tx, errors) = bounded(1);

        let weak = Arc::downgrade(&self.inner);
        let spawned = thread::Builder::new()
            .name(format!("herald-delivery-{}", client_id.0))
            .spawn({
                let errors_tx = errors_tx.clone();
                move || deliver(weak, handle, callback, errors_tx)
            });

        if let Err(e) = spawned {
            warn!(client_id = %client_id, error = %e, "Failed to start delivery thread");
            self.unsubscribe(client_id);
            let _ = errors_tx.try_send(DeliveryError::Callback(format!(
                "failed to start delivery thread: {}",
                e
            )));
        }

        Registration { client_id, errors }
    }

    /// Remove a registration. Idempotent, never waits for an in-flight
    /// delivery, and safe to call from the registration's own error path.
    pub fn unregister(&self, client_id: ClientId) {
        self.unsubscribe(client_id);
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery loop for one callback registration.
///
/// Holds only a weak reference so dropping every broadcaster closes the
/// queues and ends the loop.
fn deliver<F>(
    broadcaster: Weak<Inner>,
    handle: SubscriptionHandle,
    mut callback: F,
    errors: Sender<DeliveryError>,
) where
    F: FnMut(&Resource) -> Result<(), DeliveryError>,
{
    let id = handle.id;

    while let Ok(event) = handle.recv() {
        let resource = match event {
            BroadcastEvent::Resource(resource) => resource,
            BroadcastEvent::Dropped { .. } => break,
        };

        // Checked per event so queued resources stop once the subscription
        // is removed. A callback already past this check may still run after
        // unregister returns.
        if !handle.is_active() {
            break;
        }

        trace!(client_id = %id, resource = %resource.key(), "Delivering resource");
        if let Err(e) = callback(&resource) {
            warn!(client_id = %id, error = %e, "Subscriber callback failed");
            // Single slot, single error. A vanished reader is fine.
            let _ = errors.try_send(e);
            if let Some(inner) = broadcaster.upgrade() {
                Broadcaster { inner }.unregister(id);
            }
            return;
        }
    }

    if handle.drop_reason() == Some(DropReason::BufferOverflow) {
        let _ = errors.try_send(DeliveryError::Lagged);
    }
    debug!(client_id = %id, "Delivery loop finished");
}
