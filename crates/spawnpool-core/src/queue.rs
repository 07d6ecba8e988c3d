//! Free-slot index queues.
//!
//! Indices are staged one at a time and only become servable after
//! `build()`. Building replaces the previous serving order, so callers
//! build when the queue has run dry (initial population, rebuild scan,
//! growth).

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::QueueError;

/// Cache of free slot indices with a serving policy.
pub trait IndexQueue {
    /// Add an index to the staging buffer.
    fn stage(&mut self, index: usize);

    /// Move staged indices into serving order and clear staging.
    fn build(&mut self);

    /// Remove and return the next index in serving order.
    fn take(&mut self) -> Result<usize, QueueError>;

    /// Empty both staging and serving order.
    fn clear(&mut self);

    /// Number of indices in serving order (staging excluded).
    fn count(&self) -> usize;

    /// Number of indices waiting in staging.
    fn staged(&self) -> usize;
}

/// FIFO queue: serving order equals staging order.
#[derive(Debug, Default, Clone)]
pub struct OrderedQueue {
    staging: Vec<usize>,
    serving: VecDeque<usize>,
}

impl OrderedQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexQueue for OrderedQueue {
    #[inline]
    fn stage(&mut self, index: usize) {
        self.staging.push(index);
    }

    fn build(&mut self) {
        self.serving.clear();
        self.serving.extend(self.staging.drain(..));
    }

    #[inline]
    fn take(&mut self) -> Result<usize, QueueError> {
        self.serving.pop_front().ok_or(QueueError::EmptyQueue)
    }

    fn clear(&mut self) {
        self.staging.clear();
        self.serving.clear();
    }

    #[inline]
    fn count(&self) -> usize {
        self.serving.len()
    }

    #[inline]
    fn staged(&self) -> usize {
        self.staging.len()
    }
}

/// Shuffled queue.
///
/// Each build runs a Fisher-Yates pass over the staged indices, last
/// position first, swapping with a uniform pick from `[0, i]`. ChaCha8 is
/// used so that a seed produces the same serving order on every platform.
#[derive(Debug, Clone)]
pub struct RandomizedQueue {
    staging: Vec<usize>,
    serving: VecDeque<usize>,
    rng: ChaCha8Rng,
}

impl RandomizedQueue {
    /// Create a queue seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(ChaCha8Rng::from_entropy())
    }

    /// Create a deterministic queue.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(rng: ChaCha8Rng) -> Self {
        Self {
            staging: Vec::new(),
            serving: VecDeque::new(),
            rng,
        }
    }

    fn shuffle_staging(&mut self) {
        for i in (1..self.staging.len()).rev() {
            let swap = self.rng.gen_range(0..=i);
            self.staging.swap(i, swap);
        }
    }
}

impl Default for RandomizedQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexQueue for RandomizedQueue {
    #[inline]
    fn stage(&mut self, index: usize) {
        self.staging.push(index);
    }

    fn build(&mut self) {
        self.shuffle_staging();
        self.serving.clear();
        self.serving.extend(self.staging.drain(..));
    }

    #[inline]
    fn take(&mut self) -> Result<usize, QueueError> {
        self.serving.pop_front().ok_or(QueueError::EmptyQueue)
    }

    fn clear(&mut self) {
        self.staging.clear();
        self.serving.clear();
    }

    #[inline]
    fn count(&self) -> usize {
        self.serving.len()
    }

    #[inline]
    fn staged(&self) -> usize {
        self.staging.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<Q: IndexQueue>(queue: &mut Q) -> Vec<usize> {
        let mut out = Vec::new();
        while let Ok(index) = queue.take() {
            out.push(index);
        }
        out
    }

    #[test]
    fn test_ordered_serves_in_staging_order() {
        let mut q = OrderedQueue::new();
        q.stage(10);
        q.stage(20);
        q.stage(30);
        q.build();

        assert_eq!(q.take(), Ok(10));
        assert_eq!(q.take(), Ok(20));
        assert_eq!(q.take(), Ok(30));
        assert_eq!(q.take(), Err(QueueError::EmptyQueue));
    }

    #[test]
    fn test_staging_not_counted_until_build() {
        let mut q = OrderedQueue::new();
        q.stage(0);
        q.stage(1);
        assert_eq!(q.count(), 0);
        assert_eq!(q.staged(), 2);

        q.build();
        assert_eq!(q.count(), 2);
        assert_eq!(q.staged(), 0);
    }

    #[test]
    fn test_build_replaces_serving_order() {
        let mut q = OrderedQueue::new();
        q.stage(1);
        q.stage(2);
        q.build();

        q.stage(7);
        q.build();
        assert_eq!(drain(&mut q), vec![7]);
    }

    #[test]
    fn test_clear_empties_both_buffers() {
        let mut q = RandomizedQueue::with_seed(0);
        q.stage(0);
        q.build();
        q.stage(1);
        q.clear();

        assert_eq!(q.count(), 0);
        assert_eq!(q.staged(), 0);
        assert_eq!(q.take(), Err(QueueError::EmptyQueue));
    }

    #[test]
    fn test_randomized_same_seed_same_order() {
        let mut a = RandomizedQueue::with_seed(42);
        let mut b = RandomizedQueue::with_seed(42);
        for i in 0..32 {
            a.stage(i);
            b.stage(i);
        }
        a.build();
        b.build();

        assert_eq!(drain(&mut a), drain(&mut b));
    }

    #[test]
    fn test_randomized_actually_shuffles() {
        let mut q = RandomizedQueue::with_seed(7);
        for i in 0..64 {
            q.stage(i);
        }
        q.build();

        let order = drain(&mut q);
        assert_ne!(order, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn test_randomized_single_index() {
        let mut q = RandomizedQueue::with_seed(1);
        q.stage(5);
        q.build();
        assert_eq!(drain(&mut q), vec![5]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ordered_preserves_sequence(indices in proptest::collection::vec(0_usize..10_000, 0..200)) {
                let mut q = OrderedQueue::new();
                for &i in &indices {
                    q.stage(i);
                }
                q.build();
                prop_assert_eq!(q.count(), indices.len());
                prop_assert_eq!(drain(&mut q), indices);
            }

            #[test]
            fn randomized_preserves_multiset(
                indices in proptest::collection::vec(0_usize..10_000, 2..200),
                seed in any::<u64>(),
            ) {
                let mut q = RandomizedQueue::with_seed(seed);
                for &i in &indices {
                    q.stage(i);
                }
                q.build();

                let mut served = drain(&mut q);
                let mut expected = indices.clone();
                served.sort_unstable();
                expected.sort_unstable();
                prop_assert_eq!(served, expected);
            }

            #[test]
            fn randomized_is_seed_deterministic(
                indices in proptest::collection::vec(0_usize..1_000, 0..100),
                seed in any::<u64>(),
            ) {
                let mut a = RandomizedQueue::with_seed(seed);
                let mut b = RandomizedQueue::with_seed(seed);
                for &i in &indices {
                    a.stage(i);
                    b.stage(i);
                }
                a.build();
                b.build();
                prop_assert_eq!(drain(&mut a), drain(&mut b));
            }
        }
    }
}
