//! Per-batch sequence allocation
//!
//! Sequence numbers are unique within a classification group and never
//! reused. Inside one batch the store cannot be asked for the maximum
//! on every row - rows inserted moments ago in the same transaction
//! would be re-counted anyway, and rows not yet inserted would be
//! missed - so the allocator primes a per-group high-water mark from
//! the store once and then increments in memory.
//!
//! One allocator per logical batch. Reusing an allocator across
//! batches risks a stale high-water mark if the store changed
//! underneath it.

use std::collections::HashMap;
use thiserror::Error;

use super::classid::{ClassSegments, MAX_SEQUENCE};
use super::store::{PartStore, StoreError};

#[derive(Debug, Error)]
pub enum SequenceError {
    /// The 3-digit sequence field is out of room for this group. This
    /// is a real capacity limit of the fixed-width scheme, surfaced
    /// prominently rather than wrapped around.
    #[error("classification group {group} is full: sequence numbers are limited to {max}", max = MAX_SEQUENCE)]
    Exhausted { group: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Allocates the next free sequence number per classification group
/// within one batch
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    high_water: HashMap<String, u16>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused sequence for the group. The first call per group
    /// queries the store's committed maximum; later calls increment
    /// the cached value without a storage round-trip.
    pub fn next(
        &mut self,
        store: &PartStore,
        segments: &ClassSegments,
    ) -> Result<u16, SequenceError> {
        let group = segments.group_key();

        let current = match self.high_water.get(&group) {
            Some(cached) => *cached,
            None => store.max_sequence(segments)?,
        };

        if current >= MAX_SEQUENCE {
            return Err(SequenceError::Exhausted { group });
        }

        let next = current + 1;
        self.high_water.insert(group, next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classid::ClassCode;
    use crate::entities::part::PartRecord;
    use chrono::Utc;

    fn seed_part(store: &PartStore, body: &str) {
        let id = format!("DMT-{}", body);
        let code = ClassCode::decode("DMT", &id).unwrap();
        store
            .insert_part(&PartRecord::new(id, &code, Utc::now()))
            .unwrap();
    }

    fn segments(d: &str, f: &str, c: &str, s: &str) -> ClassSegments {
        ClassSegments::parse(d, f, c, s).unwrap()
    }

    #[test]
    fn test_first_allocation_in_empty_group_is_one() {
        let store = PartStore::open_in_memory().unwrap();
        let mut alloc = SequenceAllocator::new();
        let seq = alloc.next(&store, &segments("01", "01", "01", "00")).unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_primes_from_committed_maximum() {
        let store = PartStore::open_in_memory().unwrap();
        seed_part(&store, "01010100007");
        let mut alloc = SequenceAllocator::new();
        let seq = alloc.next(&store, &segments("01", "01", "01", "00")).unwrap();
        assert_eq!(seq, 8);
    }

    #[test]
    fn test_monotonic_within_group_without_inserts() {
        // Rows allocated earlier in a batch are not yet committed; the
        // cache alone must keep the numbers strictly increasing.
        let store = PartStore::open_in_memory().unwrap();
        let mut alloc = SequenceAllocator::new();
        let group = segments("01", "02", "00", "00");

        let mut last = 0;
        for _ in 0..5 {
            let seq = alloc.next(&store, &group).unwrap();
            assert!(seq > last);
            last = seq;
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn test_groups_are_isolated() {
        let store = PartStore::open_in_memory().unwrap();
        seed_part(&store, "01010100009");
        let mut alloc = SequenceAllocator::new();

        assert_eq!(alloc.next(&store, &segments("01", "01", "01", "00")).unwrap(), 10);
        assert_eq!(alloc.next(&store, &segments("01", "02", "01", "00")).unwrap(), 1);
        assert_eq!(alloc.next(&store, &segments("01", "01", "01", "00")).unwrap(), 11);
    }

    #[test]
    fn test_exhaustion_at_limit() {
        let store = PartStore::open_in_memory().unwrap();
        seed_part(&store, "01010100999");
        let mut alloc = SequenceAllocator::new();

        let err = alloc
            .next(&store, &segments("01", "01", "01", "00"))
            .unwrap_err();
        assert!(matches!(err, SequenceError::Exhausted { .. }));
        assert!(err.to_string().contains("01010100"));
    }

    #[test]
    fn test_fresh_allocator_sees_new_commits() {
        let store = PartStore::open_in_memory().unwrap();
        let group = segments("01", "01", "01", "00");

        let mut first = SequenceAllocator::new();
        assert_eq!(first.next(&store, &group).unwrap(), 1);
        seed_part(&store, "01010100001");

        let mut second = SequenceAllocator::new();
        assert_eq!(second.next(&store, &group).unwrap(), 2);
    }
}
