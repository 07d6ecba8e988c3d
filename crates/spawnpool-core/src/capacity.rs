//! Capacity policies: whether an exhausted pool may grow.

/// Decides how many slots to add when a pool runs out.
pub trait CapacityPolicy {
    /// Slots to add on exhaustion. Zero means report exhaustion instead.
    fn increment(&self) -> usize;
}

/// Never grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fixed;

impl CapacityPolicy for Fixed {
    #[inline(always)]
    fn increment(&self) -> usize {
        0
    }
}

/// Grows by a constant number of slots on each exhaustion.
///
/// Capacity only ever increases; nothing shrinks it automatically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Growable {
    increment: usize,
}

impl Growable {
    /// Grow by `increment` slots per exhaustion.
    pub const fn new(increment: usize) -> Self {
        Self { increment }
    }
}

impl CapacityPolicy for Growable {
    #[inline(always)]
    fn increment(&self) -> usize {
        self.increment
    }
}
