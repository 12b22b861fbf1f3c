//! # Offline Queue
//!
//! Per-channel bounded FIFO of messages published while the channel had no
//! subscriber. Replayed, in publish order, by the next `subscribe`.
//!
//! When a channel's queue is full the oldest entry is evicted to admit the
//! newest.

use herald_types::Message;
use std::collections::{HashMap, VecDeque};

/// A message waiting for its first subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage {
    /// Global enqueue order.
    pub sequence: u64,
    pub message: Message,
}

/// Bounded per-channel message buffers.
#[derive(Debug)]
pub struct OfflineQueue {
    queues: HashMap<String, VecDeque<QueuedMessage>>,
    max_per_channel: usize,
    next_sequence: u64,
}

impl OfflineQueue {
    /// Create a queue holding at most `max_per_channel` messages per channel.
    #[must_use]
    pub fn new(max_per_channel: usize) -> Self {
        Self {
            queues: HashMap::new(),
            max_per_channel: max_per_channel.max(1),
            next_sequence: 0,
        }
    }

    /// Append `message`. Returns the evicted entry when the channel was full.
    pub fn push(&mut self, channel: &str, message: Message) -> Option<QueuedMessage> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let queue = self.queues.entry(channel.to_string()).or_default();
        queue.push_back(QueuedMessage { sequence, message });

        if queue.len() > self.max_per_channel {
            queue.pop_front()
        } else {
            None
        }
    }

    /// Remove and return every queued message of `channel`, oldest first.
    pub fn drain(&mut self, channel: &str) -> Vec<Message> {
        self.queues
            .remove(channel)
            .map(|queue| queue.into_iter().map(|entry| entry.message).collect())
            .unwrap_or_default()
    }

    /// Drop every queued message of `channel`. Returns how many were dropped.
    pub fn discard(&mut self, channel: &str) -> usize {
        self.queues.remove(channel).map_or(0, |q| q.len())
    }

    /// Queued messages for `channel`.
    #[must_use]
    pub fn len(&self, channel: &str) -> usize {
        self.queues.get(channel).map_or(0, VecDeque::len)
    }

    /// Queued messages across all channels.
    #[must_use]
    pub fn total(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_per_channel
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }
}
