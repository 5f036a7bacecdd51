//! Link event queue.
//!
//! Events are produced by the BLE stack callbacks (connect, disconnect,
//! characteristic write), which run on the Bluedroid task.  They are
//! consumed by the main loop, which hands them to the application service
//! one at a time, so no two events are ever processed concurrently.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GAP callback │────▶│              │     │              │
//! │ GATTS write  │────▶│  Event Queue │────▶│  Main Loop   │
//! │              │     │  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::mpmc::MpMcQueue;
use log::warn;

use crate::app::link::LinkEvent;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Fixed-capacity, lock-free FIFO of [`LinkEvent`]s.
pub struct EventQueue {
    inner: MpMcQueue<LinkEvent, EVENT_QUEUE_CAP>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            inner: MpMcQueue::new(),
        }
    }

    /// Push an event.  Safe to call from any task.
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: LinkEvent) -> bool {
        match self.inner.enqueue(event) {
            Ok(()) => true,
            Err(dropped) => {
                warn!("events: queue full, dropped {:?}", dropped);
                false
            }
        }
    }

    pub fn pop(&self) -> Option<LinkEvent> {
        self.inner.dequeue()
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(LinkEvent)) -> usize {
        let mut count = 0;
        while let Some(event) = self.pop() {
            handler(event);
            count += 1;
        }
        count
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ── Firmware-wide queue ───────────────────────────────────────

/// The queue between the BLE callbacks and the main loop.
static LINK_EVENTS: EventQueue = EventQueue::new();

/// Push a link event into the firmware queue.
pub fn push_event(event: LinkEvent) -> bool {
    LINK_EVENTS.push(event)
}

/// Pop the next link event from the firmware queue.
pub fn pop_event() -> Option<LinkEvent> {
    LINK_EVENTS.pop()
}

/// Drain the firmware queue.  Returns the number of events handled.
pub fn drain_events(handler: impl FnMut(LinkEvent)) -> usize {
    LINK_EVENTS.drain(handler)
}
