//! Slot storage.
//!
//! A slot's position in the array is its index and never changes. Growth
//! only appends, so indices handed out earlier stay valid.

use std::ops::Range;

/// One pool position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot<I> {
    /// `None` until populated, when creation failed, or after teardown.
    instance: Option<I>,
    /// Template index this slot is populated from.
    kind: usize,
    /// Held by an outstanding [`Reservation`].
    reserved: bool,
}

impl<I> Slot<I> {
    const fn empty(kind: usize) -> Self {
        Self {
            instance: None,
            kind,
            reserved: false,
        }
    }

    /// Instance handle, if the slot holds one.
    #[inline(always)]
    pub fn instance(&self) -> Option<&I> {
        self.instance.as_ref()
    }

    /// Kind (template index) of this slot.
    #[inline(always)]
    pub fn kind(&self) -> usize {
        self.kind
    }

    /// True while reserved and not yet committed or cancelled.
    #[inline(always)]
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }

    /// True if no instance is held.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.instance.is_none()
    }
}

/// Growable array of slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotArray<I> {
    slots: Vec<Slot<I>>,
}

impl<I> SlotArray<I> {
    /// `len` empty slots of kind 0.
    pub fn new(len: usize) -> Self {
        Self::with_kinds(&[len])
    }

    /// Empty slots laid out kind by kind: `counts[k]` slots of kind `k`.
    pub fn with_kinds(counts: &[usize]) -> Self {
        let mut slots = Vec::with_capacity(counts.iter().sum());
        for (kind, &count) in counts.iter().enumerate() {
            slots.extend((0..count).map(|_| Slot::empty(kind)));
        }
        Self { slots }
    }

    /// Append `by` empty slots of `kind`, returning the new index range.
    pub fn grow(&mut self, by: usize, kind: usize) -> Range<usize> {
        let start = self.slots.len();
        self.slots.extend((0..by).map(|_| Slot::empty(kind)));
        start..self.slots.len()
    }

    /// Number of slots, populated or not.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if there are no slots.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at `index`.
    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&Slot<I>> {
        self.slots.get(index)
    }

    /// Instance at `index`, if any.
    #[inline(always)]
    pub fn instance(&self, index: usize) -> Option<&I> {
        self.slots.get(index).and_then(Slot::instance)
    }

    /// Kind of the slot at `index`.
    #[inline(always)]
    pub fn kind(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(Slot::kind)
    }

    /// Iterate `(index, slot)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Slot<I>)> + '_ {
        self.slots.iter().enumerate()
    }

    /// Iterate held instances, skipping empty slots.
    pub fn instances(&self) -> impl Iterator<Item = &I> + '_ {
        self.slots.iter().filter_map(Slot::instance)
    }

    /// Number of slots holding an instance.
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|slot| slot.instance.is_some()).count()
    }

    /// Drop trailing slots back to `len`. Only used to undo a growth that
    /// populated nothing.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.slots.truncate(len);
    }

    pub(crate) fn fill(&mut self, index: usize, instance: I) {
        debug_assert!(index < self.slots.len(), "Slot index out of bounds");
        self.slots[index].instance = Some(instance);
    }

    /// Mark a slot reserved; returns false if it was already reserved or absent.
    pub(crate) fn reserve(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if !slot.reserved => {
                slot.reserved = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn unreserve(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.reserved = false;
        }
    }

    /// Take every instance out, clearing reservations.
    pub(crate) fn drain_instances(&mut self) -> impl Iterator<Item = I> + '_ {
        self.slots.iter_mut().filter_map(|slot| {
            slot.reserved = false;
            slot.instance.take()
        })
    }
}

/// A slot taken off the free list but not yet enabled.
///
/// Obtained from a pool's `select_and_reserve`. Pass it back to
/// `commit_enable` to activate the instance, or to `cancel_reservation`
/// to give the slot back. Until then no other request can receive it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation keeps its slot unavailable until committed or cancelled"]
pub struct Reservation<I> {
    index: usize,
    instance: I,
}

impl<I> Reservation<I> {
    pub(crate) fn new(index: usize, instance: I) -> Self {
        Self { index, instance }
    }

    /// Slot index being held.
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Instance to configure before enabling.
    #[inline(always)]
    pub fn instance(&self) -> &I {
        &self.instance
    }
}
