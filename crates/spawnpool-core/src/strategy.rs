//! Allocation strategies: how a pool finds a free slot.
//!
//! [`FreeList`] keeps one index queue for the whole pool and rebuilds it
//! from the host's live state when it runs dry. [`Categories`] keeps no
//! cache at all and scans the requested category's slot range on every
//! call.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Range;

use tracing::debug;

use crate::host::ActivationHost;
use crate::queue::IndexQueue;
use crate::slot::SlotArray;

/// Why a strategy could not produce a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Miss {
    /// Nothing free, even after a rebuild.
    Exhausted,
    /// The dequeued slot's instance is gone.
    Stale { index: usize },
    /// The category key is not known.
    UnknownCategory,
}

/// Slot selection policy plugged into a pool.
pub trait Allocation<I> {
    /// What a caller names when asking for a slot (`()` for single free-list pools).
    type Key: ?Sized;

    /// Make freshly populated slots available.
    fn seed(&mut self, indices: &[usize]);

    /// Pick a free slot. The returned slot is no longer available to
    /// later calls until the host deactivates it again.
    fn select<H>(&mut self, key: &Self::Key, slots: &SlotArray<I>, host: &H) -> Result<usize, Miss>
    where
        H: ActivationHost<Instance = I>;

    /// Forget all cached availability.
    fn clear(&mut self);

    /// Number of rebuild scans performed so far.
    fn rebuilds(&self) -> u64 {
        0
    }
}

/// Whether a slot can be handed out right now.
#[inline]
pub(crate) fn is_free<H: ActivationHost>(slots: &SlotArray<H::Instance>, index: usize, host: &H) -> bool {
    match slots.get(index) {
        Some(slot) if !slot.is_reserved() => slot
            .instance()
            .map_or(false, |instance| host.is_alive(instance) && !host.is_active(instance)),
        _ => false,
    }
}

/// Single free-list backed by an [`IndexQueue`].
#[derive(Debug, Clone)]
pub struct FreeList<Q> {
    queue: Q,
    rebuilds: u64,
}

impl<Q: IndexQueue> FreeList<Q> {
    /// Wrap a queue.
    pub fn new(queue: Q) -> Self {
        Self { queue, rebuilds: 0 }
    }

    /// The underlying queue.
    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Number of rebuild scans performed so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    fn rebuild<H>(&mut self, slots: &SlotArray<H::Instance>, host: &H)
    where
        H: ActivationHost,
    {
        for index in 0..slots.len() {
            if is_free(slots, index, host) {
                self.queue.stage(index);
            }
        }
        self.queue.build();
        self.rebuilds += 1;
        debug!(recovered = self.queue.count(), slots = slots.len(), "Rebuilt free list");
    }
}

impl<I, Q: IndexQueue> Allocation<I> for FreeList<Q> {
    type Key = ();

    fn seed(&mut self, indices: &[usize]) {
        for &index in indices {
            self.queue.stage(index);
        }
        self.queue.build();
    }

    fn select<H>(&mut self, _key: &(), slots: &SlotArray<I>, host: &H) -> Result<usize, Miss>
    where
        H: ActivationHost<Instance = I>,
    {
        if self.queue.count() == 0 {
            self.rebuild(slots, host);
        }

        let index = self.queue.take().map_err(|_| Miss::Exhausted)?;
        match slots.instance(index) {
            Some(instance) if host.is_alive(instance) => Ok(index),
            _ => Err(Miss::Stale { index }),
        }
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

/// Per-category linear scan over contiguous slot ranges.
#[derive(Debug, Clone)]
pub struct Categories<K> {
    ranges: HashMap<K, Range<usize>>,
    order: Vec<K>,
}

impl<K: Eq + Hash + Clone + Debug> Categories<K> {
    /// Build from `(key, range)` pairs in population order.
    ///
    /// Returns the position of the first duplicated key on conflict.
    pub fn new(entries: impl IntoIterator<Item = (K, Range<usize>)>) -> Result<Self, usize> {
        let mut ranges = HashMap::new();
        let mut order = Vec::new();
        for (position, (key, range)) in entries.into_iter().enumerate() {
            if ranges.insert(key.clone(), range).is_some() {
                return Err(position);
            }
            order.push(key);
        }
        Ok(Self { ranges, order })
    }

    /// Slot range owned by `key`.
    pub fn range_of(&self, key: &K) -> Option<Range<usize>> {
        self.ranges.get(key).cloned()
    }

    /// Keys in population order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter()
    }
}

impl<I, K: Eq + Hash + Clone + Debug> Allocation<I> for Categories<K> {
    type Key = K;

    fn seed(&mut self, _indices: &[usize]) {}

    fn select<H>(&mut self, key: &K, slots: &SlotArray<I>, host: &H) -> Result<usize, Miss>
    where
        H: ActivationHost<Instance = I>,
    {
        let range = self.ranges.get(key).ok_or(Miss::UnknownCategory)?;
        range
            .clone()
            .find(|&index| is_free(slots, index, host))
            .ok_or(Miss::Exhausted)
    }

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InstanceFactory;
    use crate::queue::OrderedQueue;
    use crate::testing::{EntityId, Prefab, TestWorld};

    fn populated(world: &mut TestWorld, n: usize) -> SlotArray<EntityId> {
        let container = world.create_container("c", None);
        let mut slots = SlotArray::new(n);
        for index in 0..n {
            let id = world.instantiate(&Prefab::Ball, &container).unwrap();
            world.set_active(&id, false);
            slots.fill(index, id);
        }
        slots
    }

    #[test]
    fn test_free_list_rebuilds_when_dry() {
        let mut world = TestWorld::new();
        let slots = populated(&mut world, 3);
        let mut list = FreeList::new(OrderedQueue::new());

        assert_eq!(list.select(&(), &slots, &world), Ok(0));
        assert_eq!(list.rebuilds(), 1);

        // Queue still holds 1 and 2; no rebuild needed.
        assert_eq!(list.select(&(), &slots, &world), Ok(1));
        assert_eq!(list.rebuilds(), 1);
    }

    #[test]
    fn test_free_list_skips_active_and_dead_on_rebuild() {
        let mut world = TestWorld::new();
        let slots = populated(&mut world, 3);
        world.set_active(slots.instance(0).unwrap(), true);
        world.kill(*slots.instance(1).unwrap());

        let mut list = FreeList::new(OrderedQueue::new());
        assert_eq!(list.select(&(), &slots, &world), Ok(2));
        assert_eq!(list.queue().count(), 0);
    }

    #[test]
    fn test_free_list_reports_stale_dequeue() {
        let mut world = TestWorld::new();
        let slots = populated(&mut world, 2);
        let mut list = FreeList::new(OrderedQueue::new());
        Allocation::<EntityId>::seed(&mut list, &[0, 1]);

        world.kill(*slots.instance(0).unwrap());
        assert_eq!(list.select(&(), &slots, &world), Err(Miss::Stale { index: 0 }));
        assert_eq!(list.select(&(), &slots, &world), Ok(1));
    }

    #[test]
    fn test_free_list_exhausted() {
        let mut world = TestWorld::new();
        let slots = populated(&mut world, 1);
        world.set_active(slots.instance(0).unwrap(), true);

        let mut list = FreeList::new(OrderedQueue::new());
        assert_eq!(list.select(&(), &slots, &world), Err(Miss::Exhausted));
    }

    #[test]
    fn test_categories_scan_within_range() {
        let mut world = TestWorld::new();
        let slots = populated(&mut world, 4);
        let mut cats = Categories::new([("a", 0..2), ("b", 2..4)]).unwrap();

        world.set_active(slots.instance(2).unwrap(), true);
        assert_eq!(cats.select(&"b", &slots, &world), Ok(3));
        assert_eq!(cats.select(&"a", &slots, &world), Ok(0));
        assert_eq!(cats.select(&"z", &slots, &world), Err(Miss::UnknownCategory));

        world.set_active(slots.instance(3).unwrap(), true);
        assert_eq!(cats.select(&"b", &slots, &world), Err(Miss::Exhausted));
    }

    #[test]
    fn test_categories_reject_duplicates() {
        let result = Categories::new([("a", 0..1), ("b", 1..2), ("a", 2..3)]);
        assert_eq!(result.unwrap_err(), 2);
    }
}
