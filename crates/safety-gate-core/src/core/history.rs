// crates/safety-gate-core/src/core/history.rs
// ============================================================================
// Module: Bounded History
// Description: Fixed-capacity ring buffer for audit trails and logs.
// Purpose: Keep long-lived logs flat in memory by evicting the oldest entries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every history in Safety Gate (kill-switch events, usage events, provider
//! actions, overrides, enforcement decisions) is a [`BoundedLog`]. Pushing into
//! a full log evicts the oldest entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

// ============================================================================
// SECTION: Bounded Log
// ============================================================================

/// Append-only ring buffer with a fixed capacity.
///
/// # Invariants
/// - `len() <= capacity()` at all times.
/// - Capacity is at least one.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    /// Entries ordered oldest to newest.
    entries: VecDeque<T>,
    /// Maximum number of retained entries.
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Creates an empty log; a zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> BoundedLog<T> {
    /// Returns up to `limit` entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<T> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Returns every retained entry, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
