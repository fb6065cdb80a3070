use core::cell::Cell;

use crate::diagnostics::{contract, Violation};

/// A plain, non-atomic reference count.
///
/// Owned by exactly one buffer and shared by every handle pointing at that buffer.
/// Handles built on it are neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct RefCount {
    count: Cell<usize>,
}

impl RefCount {
    /// A fresh count of one, held by the handle that creates the buffer.
    #[inline]
    pub const fn init() -> Self {
        RefCount { count: Cell::new(1) }
    }

    /// Adds a reference and returns the new count.
    #[inline]
    pub fn add_ref(&self) -> usize {
        let count = self.count.get() + 1;
        self.count.set(count);

        count
    }

    /// Drops a reference and returns the new count.
    ///
    /// The buffer must be destroyed by whoever observes the count reaching zero.
    #[inline]
    #[track_caller]
    pub fn release(&self) -> usize {
        let count = self.count.get();
        contract!(count > 0, Violation::InvalidArgument {
            location: "RefCount::release",
            what: "reference count is already zero",
        });

        let count = count.wrapping_sub(1);
        self.count.set(count);

        count
    }

    /// Returns true if more than one handle references the buffer.
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.count.get() > 1
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.count.get()
    }
}

impl Default for RefCount {
    fn default() -> Self {
        RefCount::init()
    }
}

#[test]
fn counting() {
    let rc = RefCount::init();
    assert_eq!(rc.get(), 1);
    assert!(!rc.is_shared());

    assert_eq!(rc.add_ref(), 2);
    assert!(rc.is_shared());
    assert_eq!(rc.add_ref(), 3);

    assert_eq!(rc.release(), 2);
    assert!(rc.is_shared());
    assert_eq!(rc.release(), 1);
    assert!(!rc.is_shared());
    assert_eq!(rc.release(), 0);
}

#[test]
#[cfg(feature = "checks")]
#[should_panic(expected = "reference count is already zero")]
fn release_past_zero() {
    let rc = RefCount::init();
    rc.release();
    rc.release();
}
