use core::alloc::Layout;
use core::mem;

use crate::diagnostics::CollectionError;

pub(crate) const fn is_zst<T>() -> bool {
    mem::size_of::<T>() == 0
}

/// Layout of the element storage of an array buffer holding `cap` items.
pub(crate) fn array_layout<T>(cap: usize) -> Result<Layout, CollectionError> {
    Layout::array::<T>(cap).map_err(|_| CollectionError::CapacityOverflow)
}

/// Smallest power of two that is greater than or equal to `requested`.
///
/// Capacities of array buffers are always zero or a power of two.
pub(crate) fn grow_pow2(requested: usize) -> Result<usize, CollectionError> {
    const MAX: usize = isize::MAX as usize;

    let cap = requested
        .max(1)
        .checked_next_power_of_two()
        .ok_or(CollectionError::CapacityOverflow)?;

    if cap > MAX {
        return Err(CollectionError::CapacityOverflow);
    }

    Ok(cap)
}

// Waiting for `non_null_convenience` to be stabilized.
pub(crate) mod nnptr {
    use core::ptr::{self, NonNull};

    #[inline(always)]
    pub unsafe fn read<T>(src: NonNull<T>) -> T {
        ptr::read(src.as_ptr())
    }

    #[inline(always)]
    pub unsafe fn write<T>(dst: NonNull<T>, val: T) {
        ptr::write(dst.as_ptr(), val)
    }

    #[inline(always)]
    pub unsafe fn copy<T>(src: NonNull<T>, dst: NonNull<T>, count: usize) {
        ptr::copy(src.as_ptr(), dst.as_ptr(), count)
    }

    #[inline(always)]
    pub unsafe fn add<T>(p: NonNull<T>, count: usize) -> NonNull<T> {
        NonNull::new_unchecked(p.as_ptr().add(count))
    }
}

#[test]
fn pow2_growth() {
    assert_eq!(grow_pow2(0).ok(), Some(1));
    assert_eq!(grow_pow2(1).ok(), Some(1));
    assert_eq!(grow_pow2(2).ok(), Some(2));
    assert_eq!(grow_pow2(3).ok(), Some(4));
    assert_eq!(grow_pow2(4).ok(), Some(4));
    assert_eq!(grow_pow2(17).ok(), Some(32));
    assert!(grow_pow2(usize::MAX).is_err());
}
