use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

use allocator_api2::alloc::Allocator;

use crate::diagnostics::{fatal, CollectionError};
use crate::ref_count::RefCount;
use crate::util::nnptr;

/// A heap buffer that can be referenced by several handles at once.
pub(crate) trait SharedBuffer: Sized {
    type Alloc: Allocator + Clone;

    /// Used in diagnostics.
    const NAME: &'static str;

    fn ref_count(&self) -> &RefCount;

    fn allocator(&self) -> &Self::Alloc;

    /// Returns an independent copy of the buffer with a fresh reference count of one.
    ///
    /// Allocation failures are fatal.
    fn deep_copy(&self) -> Self;
}

/// Owns one reference to a buffer allocated in the buffer's own allocator.
///
/// Cloning a handle only bumps the count. The handle that drops the count to zero
/// destroys the buffer.
pub(crate) struct SharedHandle<B: SharedBuffer> {
    ptr: NonNull<B>,
    _marker: PhantomData<B>,
}

impl<B: SharedBuffer> SharedHandle<B> {
    /// Moves `data` into a new heap block. Its reference count must be one.
    #[track_caller]
    pub fn new(data: B) -> Self {
        debug_assert_eq!(data.ref_count().get(), 1);

        let layout = Layout::new::<B>();
        let ptr = match data.allocator().allocate(layout) {
            Ok(block) => block.cast::<B>(),
            Err(_) => {
                drop(data);
                fatal(CollectionError::Allocator { layout }.at(B::NAME));
            }
        };

        unsafe {
            nnptr::write(ptr, data);
        }

        SharedHandle {
            ptr,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn get(&self) -> &B {
        unsafe { self.ptr.as_ref() }
    }

    /// Gives mutable access to the buffer, detaching first if it is shared.
    #[inline]
    pub fn get_mut(&mut self) -> &mut B {
        self.detach();

        // SAFETY: after detaching this handle holds the only reference.
        unsafe { self.ptr.as_mut() }
    }

    /// Makes this handle the only owner of its buffer, duplicating the buffer if needed.
    #[inline]
    pub fn detach(&mut self) {
        if self.is_shared() {
            self.detach_slow();
        }
    }

    #[cold]
    #[inline(never)]
    fn detach_slow(&mut self) {
        let copy = SharedHandle::new(self.get().deep_copy());
        log::trace!(
            "{}: detaching from a buffer shared by {} handles",
            B::NAME,
            self.ref_count()
        );

        // Releases our reference on the shared buffer.
        *self = copy;
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.get().ref_count().is_shared()
    }

    #[inline]
    pub fn ref_count(&self) -> usize {
        self.get().ref_count().get()
    }

    /// Returns true if both handles point to the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<B: SharedBuffer> Clone for SharedHandle<B> {
    #[inline]
    fn clone(&self) -> Self {
        self.get().ref_count().add_ref();

        SharedHandle {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<B: SharedBuffer> Drop for SharedHandle<B> {
    fn drop(&mut self) {
        if self.get().ref_count().release() != 0 {
            return;
        }

        unsafe {
            let allocator = self.get().allocator().clone();
            ptr::drop_in_place(self.ptr.as_ptr());
            allocator.deallocate(self.ptr.cast::<u8>(), Layout::new::<B>());
        }
    }
}
