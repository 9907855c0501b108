//! Bounded lifecycle event queue.
//!
//! Producers are the wireless stack callbacks; the single consumer is the
//! main loop. A producer never blocks: when the queue is full the event is
//! dropped and counted.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌────────────┐
//! │ on_connected     │────▶│              │     │            │
//! │ on_disconnected  │────▶│  EventBus    │────▶│  MainLoop  │
//! │ (stack context)  │     │  (FIFO, 8)   │     │ (consumer) │
//! └──────────────────┘     └──────────────┘     └────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::warn;

use crate::app::events::LifecycleEvent;

/// Maximum number of pending lifecycle events.
pub const EVENT_QUEUE_CAP: usize = 8;

/// Multi-producer, single-consumer FIFO of [`LifecycleEvent`]s.
pub struct EventBus {
    channel: Channel<CriticalSectionRawMutex, LifecycleEvent, EVENT_QUEUE_CAP>,
    dropped: AtomicU32,
}

impl EventBus {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue without blocking. Returns `false` if the event was dropped.
    pub fn publish(&self, event: LifecycleEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("event queue full, dropping {event}");
                false
            }
        }
    }

    /// Wait for the next event.
    pub async fn receive(&self) -> LifecycleEvent {
        self.channel.receive().await
    }

    /// Next event if one is queued.
    pub fn try_receive(&self) -> Option<LifecycleEvent> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Events lost to backpressure since boot.
    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
