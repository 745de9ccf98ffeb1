//! Zero-delay resynchronization scheduling.
//!
//! A bus write whose effect must settle after the issuing bus cycle is not
//! applied in place. The device enqueues a [`SyncEvent`] instead, and the
//! machine loop drains the queue at the next resynchronization point — after
//! the current bus cycle has fully executed, before the next one starts.

use std::collections::VecDeque;

/// A deferred register update: target device plus the value/mask pair to
/// merge when the event fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// Tag of the device the update applies to.
    pub device: String,
    /// New value, already positioned within the mask.
    pub value: u8,
    /// Register bits the update touches.
    pub mask: u8,
}

/// Capability to defer work to the next resynchronization point.
///
/// Injected into devices at bind time. The framework contract: events run in
/// enqueue order, strictly after the bus cycle that enqueued them and before
/// the next distinct bus cycle. Once enqueued, an event always fires — there
/// is no cancellation.
pub trait Scheduler {
    /// Enqueue a zero-delay event.
    fn call_after_resync(&mut self, event: SyncEvent);
}

/// Standard single-threaded FIFO scheduler.
///
/// The machine loop drains it at each resynchronization point and dispatches
/// every event to its target device. Tests use it directly as a recording
/// fake: enqueued events sit in the queue until drained, with no real timing
/// attached.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<SyncEvent>,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events waiting for the next resynchronization point.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Take all pending events, oldest first, leaving the queue empty.
    ///
    /// Returned as a batch so dispatch can enqueue follow-up events without
    /// aliasing the queue mid-drain.
    pub fn drain(&mut self) -> Vec<SyncEvent> {
        self.events.drain(..).collect()
    }
}

impl Scheduler for EventQueue {
    fn call_after_resync(&mut self, event: SyncEvent) {
        self.events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(device: &str, value: u8, mask: u8) -> SyncEvent {
        SyncEvent {
            device: device.to_string(),
            value,
            mask,
        }
    }

    #[test]
    fn drain_preserves_enqueue_order() {
        let mut queue = EventQueue::new();
        queue.call_after_resync(event("a", 0x01, 0xFF));
        queue.call_after_resync(event("b", 0x02, 0x0F));
        queue.call_after_resync(event("a", 0x03, 0xFF));
        assert_eq!(queue.pending(), 3);

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![
                event("a", 0x01, 0xFF),
                event("b", 0x02, 0x0F),
                event("a", 0x03, 0xFF),
            ]
        );
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn drain_on_empty_queue_is_empty() {
        let mut queue = EventQueue::new();
        assert!(queue.drain().is_empty());
    }
}
