use pf_core::types::QueuedEvent;
use std::collections::VecDeque;

/// FIFO buffer of pending deltas for one group. Message deltas are
/// bounded; context deltas are never evicted.
#[derive(Debug)]
pub struct GroupQueue {
    events: VecDeque<QueuedEvent>,
    max_messages: usize,
}

impl GroupQueue {
    pub fn new(max_messages: usize) -> Self {
        Self {
            events: VecDeque::new(),
            max_messages,
        }
    }

    pub fn push(&mut self, event: QueuedEvent) {
        if event.is_message() && self.message_count() >= self.max_messages {
            if let Some(oldest) = self.events.iter().position(QueuedEvent::is_message) {
                self.events.remove(oldest);
            }
        }
        self.events.push_back(event);
    }

    pub fn snapshot(&self) -> Vec<QueuedEvent> {
        self.events.iter().cloned().collect()
    }

    /// Removes the oldest `count` events. Events pushed after a snapshot
    /// was taken stay queued for the next cycle.
    pub fn drain_first(&mut self, count: usize) {
        let count = count.min(self.events.len());
        self.events.drain(..count);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn message_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_message()).count()
    }
}
