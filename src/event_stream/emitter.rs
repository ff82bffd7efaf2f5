//! Bounded, non-blocking event publisher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::clock::Clock;
use crate::types::{Event, EventPayload};

pub type EventReceiver = mpsc::Receiver<Event>;

/// Outcome of a publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped,
}

/// Creates an emitter and the receiving end of its channel.
pub fn channel(capacity: usize, clock: Arc<dyn Clock>) -> (EventEmitter, EventReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (
        EventEmitter {
            sender,
            clock,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        receiver,
    )
}

#[derive(Clone)]
pub struct EventEmitter {
    sender: mpsc::Sender<Event>,
    clock: Arc<dyn Clock>,
    dropped: Arc<AtomicU64>,
}

impl EventEmitter {
    /// Stamps `payload` with the current time and offers it to the channel.
    ///
    /// Never waits: when the channel is full or the receiver is gone the
    /// event is discarded.
    pub fn emit(&self, payload: EventPayload) -> Delivery {
        let event_type = payload.event_type();
        let event = Event {
            payload,
            timestamp: self.clock.now_ms(),
        };

        match self.sender.try_send(event) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    target: "bridge_events::event_stream::emit",
                    event_type = %event_type,
                    "Event channel full, dropping event"
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    target: "bridge_events::event_stream::emit",
                    event_type = %event_type,
                    "Event channel closed, dropping event"
                );
                Delivery::Dropped
            }
        }
    }

    /// Number of events discarded since the channel was created.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("capacity", &self.sender.max_capacity())
            .field("dropped", &self.dropped_count())
            .finish()
    }
}
