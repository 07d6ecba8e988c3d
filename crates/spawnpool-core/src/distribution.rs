//! Per-kind population planning.
//!
//! A distribution says how many instances of each kind a multi-kind pool
//! creates. Kind `k` always occupies the contiguous flat slot range that
//! follows kinds `0..k`.

use std::ops::Range;

use crate::error::DistributionFault;

/// Ordered per-kind instance counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
    counts: Vec<usize>,
}

impl Distribution {
    /// Minimum number of kinds accepted by [`Distribution::auto`].
    pub const MIN_AUTO_KINDS: usize = 3;

    /// Minimum average instances per kind accepted by [`Distribution::auto`].
    pub const MIN_PER_KIND: usize = 5;

    /// Empty distribution (single-kind pools).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Use the given counts as-is.
    pub fn manual(counts: impl Into<Vec<usize>>) -> Self {
        Self { counts: counts.into() }
    }

    /// `kinds` entries of `value` each.
    pub fn uniform(kinds: usize, value: usize) -> Self {
        Self { counts: vec![value; kinds] }
    }

    /// Front-loaded weighted split of `total` across `kinds`.
    ///
    /// The first kind gets half, every middle kind takes 60% (rounded up,
    /// at least one) of whatever is left, and the last kind gets the
    /// remainder (at least one). Earlier kinds therefore always receive
    /// the larger shares.
    ///
    /// If the minimum-of-one clamps push the sum over `total`, sweeps run
    /// from the first kind towards the end, decrementing every kind that
    /// still holds more than one. The last two kinds are never decremented.
    ///
    /// # Errors
    /// [`DistributionFault::TooFewKinds`] when `kinds < 3`,
    /// [`DistributionFault::TooSmall`] when `total < kinds * 5`.
    pub fn auto(total: usize, kinds: usize) -> Result<Self, DistributionFault> {
        if kinds < Self::MIN_AUTO_KINDS {
            return Err(DistributionFault::TooFewKinds { kinds });
        }

        let minimum = kinds.checked_mul(Self::MIN_PER_KIND).unwrap_or(usize::MAX);
        if total < minimum {
            return Err(DistributionFault::TooSmall { total, minimum });
        }

        let mut counts = vec![0usize; kinds];
        counts[0] = total / 2;
        let mut remaining = total - counts[0];
        // Ones handed out by the clamps on top of `total`.
        let mut surplus = 0usize;

        for count in &mut counts[1..kinds - 1] {
            if remaining == 0 {
                *count = 1;
                surplus += 1;
                continue;
            }
            // ceil(remaining * 0.6) without overflowing
            let share = 3 * (remaining / 5) + (3 * (remaining % 5) + 4) / 5;
            remaining -= share;
            *count = share;
        }
        counts[kinds - 1] = if remaining == 0 {
            surplus += 1;
            1
        } else {
            remaining
        };

        let adjustable = kinds - 2;
        while surplus > 0 {
            let mut progressed = false;
            for count in &mut counts[..adjustable] {
                if surplus == 0 {
                    break;
                }
                if *count > 1 {
                    *count -= 1;
                    surplus -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                return Err(DistributionFault::Unbalanced {
                    total,
                    sum: total.saturating_add(surplus),
                });
            }
        }

        Ok(Self { counts })
    }

    /// Per-kind counts.
    #[inline]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Number of kinds.
    #[inline]
    pub fn kinds(&self) -> usize {
        self.counts.len()
    }

    /// Total population.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// True for single-kind pools.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Flat slot range occupied by `kind`.
    pub fn range_of(&self, kind: usize) -> Option<Range<usize>> {
        let count = *self.counts.get(kind)?;
        let start: usize = self.counts[..kind].iter().sum();
        Some(start..start + count)
    }

    /// Kind owning flat slot `index`.
    pub fn kind_of(&self, index: usize) -> Option<usize> {
        let mut end = 0;
        for (kind, &count) in self.counts.iter().enumerate() {
            end += count;
            if index < end {
                return Some(kind);
            }
        }
        None
    }

    /// Iterate `(kind, range)` pairs in kind order.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        let mut start = 0;
        self.counts.iter().enumerate().map(move |(kind, &count)| {
            let range = start..start + count;
            start += count;
            (kind, range)
        })
    }
}
