//! Bounded FIFO of tiles waiting for an admission slot.
//!
//! Membership is tracked alongside the queue so duplicate requests are
//! rejected in constant time. When the queue is full new tiles are refused
//! rather than displacing older ones: the caller sized the queue for one
//! screen of tiles, so overflow means the request is already stale.

use crate::coord::TileId;
use std::collections::{HashSet, VecDeque};

/// Result of offering a tile to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended to the back of the queue.
    Queued,
    /// Already waiting; the queue is unchanged.
    AlreadyQueued,
    /// Queue at capacity; the tile was not added.
    Full,
}

/// Deduplicating bounded FIFO of tile ids.
#[derive(Debug)]
pub struct OverflowQueue {
    items: VecDeque<TileId>,
    members: HashSet<TileId>,
    capacity: usize,
}

impl OverflowQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, id: TileId) -> PushOutcome {
        if self.members.contains(&id) {
            return PushOutcome::AlreadyQueued;
        }
        if self.items.len() >= self.capacity {
            return PushOutcome::Full;
        }
        self.members.insert(id);
        self.items.push_back(id);
        PushOutcome::Queued
    }

    /// Removes and returns the oldest queued tile.
    pub fn pop(&mut self) -> Option<TileId> {
        let id = self.items.pop_front()?;
        self.members.remove(&id);
        Some(id)
    }

    pub fn contains(&self, id: &TileId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.members.clear();
    }

    /// Iterates queued tiles from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TileId> {
        self.items.iter()
    }
}
