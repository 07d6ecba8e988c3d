//! Process-scoped session identifiers.
//!
//! Hosts use these to label spawned instances. Ids are non-zero and
//! strictly increasing until the next [`SessionIds::begin`].

use std::sync::atomic::{AtomicU32, Ordering};

/// Atomic id counter.
#[derive(Debug, Default)]
pub struct SessionIds {
    last: AtomicU32,
}

impl SessionIds {
    /// Fresh counter; the first id handed out is 1.
    pub const fn new() -> Self {
        Self {
            last: AtomicU32::new(0),
        }
    }

    /// Start a new session. Ids restart at 1.
    pub fn begin(&self) {
        self.last.store(0, Ordering::Relaxed);
    }

    /// Next id. Wraps past `u32::MAX` back to 1, never yielding 0.
    #[inline]
    pub fn next(&self) -> u32 {
        loop {
            let id = self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if id != 0 {
                return id;
            }
        }
    }

    /// Last id handed out, 0 if none yet.
    pub fn last(&self) -> u32 {
        self.last.load(Ordering::Relaxed)
    }
}

static GLOBAL: SessionIds = SessionIds::new();

/// Reset the process-wide counter.
pub fn begin() {
    GLOBAL.begin();
}

/// Next id from the process-wide counter.
pub fn next_id() -> u32 {
    GLOBAL.next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let ids = SessionIds::new();
        assert_eq!(ids.last(), 0);
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
        assert_eq!(ids.last(), 3);
    }

    #[test]
    fn test_begin_resets() {
        let ids = SessionIds::new();
        ids.next();
        ids.next();
        ids.begin();
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn test_wrap_skips_zero() {
        let ids = SessionIds::new();
        ids.last.store(u32::MAX - 1, Ordering::Relaxed);
        assert_eq!(ids.next(), u32::MAX);
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn test_global_ids_are_distinct() {
        let a = next_id();
        let b = next_id();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }
}
