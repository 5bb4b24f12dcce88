//! EventQueue — total order over pending events.
//!
//! Pop always returns the event with the smallest
//! `(timestamp, type-priority, sequence)` key. Sequence numbers are assigned
//! at enqueue time and increase monotonically, so ties inside one
//! (timestamp, type) bucket resolve in insertion order and the whole order
//! is deterministic.

use super::{Event, EventPayload};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
struct HeapEntry {
    key: (DateTime<Utc>, u8, u64),
    event: Event,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest key on top.
        other.key.cmp(&self.key)
    }
}

/// Priority queue driving the simulation loop.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<HeapEntry>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a payload, assigning the next sequence number.
    ///
    /// Returns the sequence assigned, so producers can reference the event
    /// they just emitted (e.g. a signal recording its triggering bar).
    pub fn push(&mut self, payload: EventPayload) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let key = (payload.timestamp(), payload.type_priority(), sequence);
        self.heap.push(HeapEntry {
            key,
            event: Event { sequence, payload },
        });
        sequence
    }

    /// Dequeue the event with the smallest (timestamp, priority, sequence).
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|entry| entry.event)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
