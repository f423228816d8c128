//! Subscription types for resource broadcasts.

use crate::error::DeliveryError;
use crate::types::Resource;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Filter value that matches every source.
pub const ANY_SOURCE: &str = "*";

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max queued resources before the subscriber is dropped.
    /// Default: 1000
    pub buffer_size: usize,

    /// Which sources to receive.
    pub filter: SourceFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SourceFilter::Any,
        }
    }
}

impl SubscriptionConfig {
    /// Subscribe to a single source (or every source with `"*"`).
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            filter: SourceFilter::from(source.into()),
            ..Default::default()
        }
    }
}

/// Which resource sources a subscription receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceFilter {
    Any,
    Exact(String),
}

impl SourceFilter {
    pub fn matches(&self, source: &str) -> bool {
        match self {
            SourceFilter::Any => true,
            SourceFilter::Exact(s) => s == source,
        }
    }
}

impl From<String> for SourceFilter {
    fn from(s: String) -> Self {
        if s == ANY_SOURCE {
            SourceFilter::Any
        } else {
            SourceFilter::Exact(s)
        }
    }
}

impl From<&str> for SourceFilter {
    fn from(s: &str) -> Self {
        SourceFilter::from(s.to_string())
    }
}

/// Events pushed into a subscription queue.
#[derive(Clone, Debug)]
pub enum BroadcastEvent {
    /// A resource changed.
    Resource(Resource),

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Queue overflowed (slow consumer).
    BufferOverflow,
    /// Receiver went away.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription among the live ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// State shared between the broadcaster's entry and the subscriber's handle.
#[derive(Debug)]
pub(crate) struct SharedState {
    active: AtomicBool,
    drop_reason: Mutex<Option<DropReason>>,
}

impl SharedState {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(true),
            drop_reason: Mutex::new(None),
        })
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deactivate, keeping the first recorded reason.
    pub(crate) fn deactivate(&self, reason: DropReason) {
        self.active.store(false, Ordering::SeqCst);
        self.drop_reason.lock().get_or_insert(reason);
    }

    pub(crate) fn drop_reason(&self) -> Option<DropReason> {
        *self.drop_reason.lock()
    }
}

/// Handle to receive broadcasts for one subscription.
pub struct SubscriptionHandle {
    pub id: ClientId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<BroadcastEvent>,
    pub(crate) state: Arc<SharedState>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<BroadcastEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<BroadcastEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<BroadcastEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// False once the subscription was unsubscribed or dropped.
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn drop_reason(&self) -> Option<DropReason> {
        self.state.drop_reason()
    }
}

/// Result of registering a callback.
///
/// `errors` yields at most one error: the first delivery failure. It is
/// disconnected without a value when the subscription ends cleanly.
pub struct Registration {
    pub client_id: ClientId,
    pub errors: crossbeam_channel::Receiver<DeliveryError>,
}
