//! Pending-notification set.
//!
//! Fixed capacity, fixed storage. A notification that finds every entry in
//! use is dropped; notify promises at-most-once delivery, not delivery.

use alloc::vec;
use alloc::vec::Vec;

use crate::proc::{Endpoint, SourceFilter};

#[derive(Clone, Copy, Debug)]
struct PendingEntry {
    source: Endpoint,
    badge: u64,
    in_use: bool,
}

impl PendingEntry {
    const FREE: Self = Self {
        source: Endpoint::from_raw(0),
        badge: 0,
        in_use: false,
    };
}

/// Notifications recorded for a process that was not ready to receive.
#[derive(Debug)]
pub struct PendingNotifications {
    entries: Vec<PendingEntry>,
    /// Insertion counter, so delivery follows arrival order.
    seq: Vec<u64>,
    next_seq: u64,
}

impl PendingNotifications {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![PendingEntry::FREE; capacity],
            seq: vec![0; capacity],
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.in_use).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a notification. Returns false if the set was full.
    pub fn push(&mut self, source: Endpoint, badge: u64) -> bool {
        let Some(i) = self.entries.iter().position(|e| !e.in_use) else {
            return false;
        };
        self.entries[i] = PendingEntry {
            source,
            badge,
            in_use: true,
        };
        self.seq[i] = self.next_seq;
        self.next_seq += 1;
        true
    }

    /// Remove and return the oldest notification accepted by `filter`.
    pub fn take(&mut self, filter: SourceFilter) -> Option<(Endpoint, u64)> {
        let i = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.in_use && filter.matches(e.source))
            .min_by_key(|(i, _)| self.seq[*i])
            .map(|(i, _)| i)?;
        let entry = core::mem::replace(&mut self.entries[i], PendingEntry::FREE);
        Some((entry.source, entry.badge))
    }

    /// True if a notification accepted by `filter` is waiting.
    pub fn has(&self, filter: SourceFilter) -> bool {
        self.entries
            .iter()
            .any(|e| e.in_use && filter.matches(e.source))
    }

    /// Forget everything from `source`. Returns how many were dropped.
    pub fn purge(&mut self, source: Endpoint) -> usize {
        let mut dropped = 0;
        for e in self.entries.iter_mut().filter(|e| e.in_use && e.source == source) {
            *e = PendingEntry::FREE;
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_and_drop() {
        let mut set = PendingNotifications::new(2);
        let a = Endpoint::new(1, 0);
        assert!(set.push(a, 1));
        assert!(set.push(a, 2));
        assert!(!set.push(a, 3));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_take_in_arrival_order() {
        let mut set = PendingNotifications::new(4);
        let a = Endpoint::new(1, 0);
        let b = Endpoint::new(2, 0);
        set.push(a, 10);
        set.push(b, 20);
        set.push(a, 11);
        assert_eq!(set.take(SourceFilter::From(b)), Some((b, 20)));
        assert_eq!(set.take(SourceFilter::Any), Some((a, 10)));
        // freed slot is reused but the older entry still wins
        set.push(b, 21);
        assert_eq!(set.take(SourceFilter::Any), Some((a, 11)));
        assert_eq!(set.take(SourceFilter::Any), Some((b, 21)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_purge() {
        let mut set = PendingNotifications::new(3);
        let a = Endpoint::new(1, 0);
        set.push(a, 1);
        set.push(Endpoint::new(2, 0), 2);
        set.push(a, 3);
        assert_eq!(set.purge(a), 2);
        assert!(!set.has(SourceFilter::From(a)));
        assert_eq!(set.len(), 1);
    }
}
