//! In-process event fan-out.
//!
//! One [`Notifier`] is built by the service root and cloned into whatever
//! needs to publish or subscribe. There is no global bus.
//!
//! Each [`Subscription`] is bound to one room and owns an unbounded
//! channel. [`Notifier::emit`] walks the current subscribers and pushes
//! the event into every channel whose room matches, so delivery to all
//! current subscribers has happened by the time `emit` returns. Nothing
//! is buffered for rooms nobody is watching: a late subscriber re-fetches
//! state instead of replaying events.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use moo_core::{GameEvent, RoomId};
use tokio::sync::mpsc;

struct Subscriber {
    room_id: RoomId,
    tx: mpsc::UnboundedSender<GameEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Subscriber>> {
        // The map stays consistent even if a holder panicked.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes [`GameEvent`]s to the subscriptions of their room.
///
/// Cheap to clone; clones share one subscriber registry.
#[derive(Clone, Default)]
pub struct Notifier {
    registry: Arc<Registry>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every live subscription of `event.room_id`.
    ///
    /// Returns how many subscriptions received it. Subscriptions whose
    /// receiver is gone are pruned along the way.
    pub fn emit(&self, event: GameEvent) -> usize {
        let mut subscribers = self.registry.lock();
        let mut delivered = 0;
        subscribers.retain(|_, sub| {
            if sub.room_id != event.room_id {
                return true;
            }
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        tracing::debug!(
            room_id = %event.room_id,
            kind = ?event.kind,
            delivered,
            "event emitted"
        );
        delivered
    }

    /// Starts listening to events for `room_id`.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe(&self, room_id: RoomId) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.lock().insert(id, Subscriber { room_id, tx });
        tracing::debug!(%room_id, subscription = id, "subscribed");
        Subscription {
            id,
            room_id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Number of live subscriptions across all rooms.
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A live feed of one room's events.
///
/// Read it with [`recv`](Self::recv) or as a [`Stream`]. Dropping it (or
/// calling [`unsubscribe`](Self::unsubscribe)) removes it from the
/// notifier; no event is delivered afterwards.
pub struct Subscription {
    id: u64,
    room_id: RoomId,
    rx: mpsc::UnboundedReceiver<GameEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Waits for the next event. Returns `None` once the notifier is gone.
    pub async fn recv(&mut self) -> Option<GameEvent> {
        self.rx.recv().await
    }

    /// Takes an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<GameEvent> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().remove(&self.id);
            tracing::debug!(room_id = %self.room_id, subscription = self.id, "unsubscribed");
        }
    }
}

impl Stream for Subscription {
    type Item = GameEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<GameEvent>> {
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .finish()
    }
}
