use core::ptr::NonNull;

use allocator_api2::alloc::Allocator;

use crate::diagnostics::{fatal, CollectionError};
use crate::ref_count::RefCount;
use crate::shared::SharedBuffer;
use crate::type_trait::{clone_into_uninit, TypeTrait};
use crate::util::{self, is_zst, nnptr};

/// The shared storage behind an [`Array`](crate::Array).
///
/// The capacity is zero or a power of two. The storage pointer is dangling when the
/// capacity is zero, and always for zero-sized element types which never touch the
/// allocator.
///
/// None of the methods check for uniqueness: the handle detaches before handing out
/// `&mut ArrayData`.
pub(crate) struct ArrayData<T, A: Allocator + Clone> {
    ref_count: RefCount,
    len: usize,
    cap: usize,
    data: NonNull<T>,
    allocator: A,
}

impl<T: TypeTrait, A: Allocator + Clone> ArrayData<T, A> {
    /// Creates an empty buffer without allocating.
    pub fn new_in(allocator: A) -> Self {
        ArrayData {
            ref_count: RefCount::init(),
            len: 0,
            cap: 0,
            data: NonNull::dangling(),
            allocator,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }

    #[inline]
    pub fn at(&self, index: usize) -> &T {
        debug_assert!(index < self.len);
        &self.as_slice()[index]
    }

    #[inline]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);
        &mut self.as_mut_slice()[index]
    }

    /// Makes room for one more element.
    ///
    /// The first element allocates a capacity of one, after that the capacity goes to the
    /// next power of two whenever the buffer is full.
    #[inline]
    fn grow_one(&mut self) {
        if self.len < self.cap {
            return;
        }

        let new_cap = self
            .len
            .checked_add(1)
            .ok_or(CollectionError::CapacityOverflow)
            .and_then(util::grow_pow2);

        match new_cap {
            Ok(new_cap) => self.realloc(new_cap),
            Err(err) => self.failed_alloc_purge(err, "ArrayData::resize"),
        }
    }

    /// Ensures a capacity of at least `n`, rounded up to a power of two.
    ///
    /// Does nothing (and does not allocate) if the capacity is already sufficient, in
    /// particular when `n` is zero.
    pub fn reserve(&mut self, n: usize) {
        if n <= self.cap {
            return;
        }

        match util::grow_pow2(n) {
            Ok(new_cap) => self.realloc(new_cap),
            Err(err) => self.failed_alloc_purge(err, "ArrayData::resize"),
        }
    }

    fn realloc(&mut self, new_cap: usize) {
        if let Err(err) = self.try_realloc(new_cap) {
            self.failed_alloc_purge(err, "ArrayData::realloc");
        }
    }

    /// Resizes the storage in place if the allocator can, moving it otherwise.
    fn try_realloc(&mut self, new_cap: usize) -> Result<(), CollectionError> {
        debug_assert!(new_cap >= self.len);
        debug_assert!(new_cap.is_power_of_two());

        if is_zst::<T>() {
            self.cap = new_cap;
            return Ok(());
        }

        let new_layout = util::array_layout::<T>(new_cap)?;
        let result = if self.cap == 0 {
            self.allocator.allocate(new_layout)
        } else {
            let old_layout = util::array_layout::<T>(self.cap)?;
            unsafe {
                self.allocator
                    .grow(self.data.cast::<u8>(), old_layout, new_layout)
            }
        };

        let block = result.map_err(|_| CollectionError::Allocator { layout: new_layout })?;

        log::trace!("ArrayData: capacity {} -> {}", self.cap, new_cap);
        self.data = block.cast::<T>();
        self.cap = new_cap;

        Ok(())
    }

    /// Drops the content, frees the storage and reports the allocation failure.
    #[cold]
    #[inline(never)]
    #[track_caller]
    fn failed_alloc_purge(&mut self, err: CollectionError, location: &'static str) -> ! {
        log::debug!(
            "ArrayData: allocation failure with {} items and capacity {}, purging",
            self.len,
            self.cap
        );

        self.clear();
        self.deallocate();

        fatal(err.at(location));
    }

    /// Frees the storage. The elements must have been dropped already.
    fn deallocate(&mut self) {
        debug_assert_eq!(self.len, 0);

        if self.cap != 0 && !is_zst::<T>() {
            if let Ok(layout) = util::array_layout::<T>(self.cap) {
                unsafe {
                    self.allocator.deallocate(self.data.cast::<u8>(), layout);
                }
            }
        }

        self.data = NonNull::dangling();
        self.cap = 0;
    }

    /// Appends an element to the back of the buffer.
    #[inline]
    pub fn push(&mut self, val: T) {
        self.grow_one();

        unsafe {
            nnptr::write(nnptr::add(self.data, self.len), val);
        }
        self.len += 1;
    }

    /// Appends copies of the elements of `items`.
    ///
    /// Grows at most once, to the power of two covering the capacity deficit.
    pub fn extend_from_slice(&mut self, items: &[T]) {
        let n = items.len();
        let required = match self.len.checked_add(n) {
            Some(required) => required,
            None => self.failed_alloc_purge(CollectionError::CapacityOverflow, "ArrayData::append"),
        };

        if required > self.cap {
            let deficit = required - self.cap;
            self.reserve(self.cap + deficit);
        }

        unsafe {
            let dst = nnptr::add(self.data, self.len).as_ptr();
            clone_into_uninit(items.as_ptr(), dst, n, &mut self.len);
        }
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (min_len, _) = iter.size_hint();
        if let Some(required) = self.len.checked_add(min_len) {
            self.reserve(required);
        }

        for item in iter {
            self.push(item);
        }
    }

    /// Inserts an element at position `index`, shifting all elements after it to the right.
    ///
    /// Inserting at the end, or into an empty buffer, appends.
    ///
    /// # Panics
    ///
    /// Panics if `index > len` on a non-empty buffer.
    pub fn insert(&mut self, index: usize, val: T) {
        #[cold]
        #[inline(never)]
        #[track_caller]
        fn assert_failed(index: usize, len: usize) -> ! {
            panic!("insertion index (is {index}) should be <= len (is {len})");
        }

        let len = self.len;
        if index == len || len == 0 {
            self.push(val);
            return;
        }

        if index > len {
            assert_failed(index, len);
        }

        self.grow_one();

        unsafe {
            let p = nnptr::add(self.data, index);
            // Shift everything over to make space. (Duplicating the
            // `index`th element into two consecutive places.)
            nnptr::copy(p, nnptr::add(p, 1), len - index);
            // Write it in, overwriting the first copy of the `index`th
            // element.
            nnptr::write(p, val);
        }
        self.len += 1;
    }

    #[inline]
    pub fn prepend(&mut self, val: T) {
        self.insert(0, val);
    }

    /// Removes and returns the element at position `index`, shifting all elements after
    /// it to the left.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        #[cold]
        #[inline(never)]
        #[track_caller]
        fn assert_failed(index: usize, len: usize) -> ! {
            panic!("remove: index {index} should be < len {len}.");
        }

        if index >= self.len {
            assert_failed(index, self.len);
        }

        unsafe {
            // The place we are taking from.
            let ptr = nnptr::add(self.data, index);
            // Copy it out, unsafely having a copy of the value on
            // the stack and in the buffer at the same time.
            let ret = nnptr::read(ptr);

            // Shift everything down to fill in that spot.
            nnptr::copy(nnptr::add(ptr, 1), ptr, self.len - index - 1);
            self.len -= 1;

            ret
        }
    }

    /// Removes the last element and returns it, or `None` if the buffer is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        unsafe { Some(nnptr::read(nnptr::add(self.data, self.len))) }
    }

    /// Drops the elements past `len`, keeping the storage.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }

        unsafe {
            let tail = nnptr::add(self.data, len).as_ptr();
            let tail: *mut [T] = core::ptr::slice_from_raw_parts_mut(tail, self.len - len);
            self.len = len;
            core::ptr::drop_in_place(tail);
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    fn try_deep_copy(&self) -> Result<Self, CollectionError> {
        let mut copy = ArrayData::new_in(self.allocator.clone());
        if self.cap == 0 {
            return Ok(copy);
        }

        if !is_zst::<T>() {
            let layout = util::array_layout::<T>(self.cap)?;
            let block = self
                .allocator
                .allocate(layout)
                .map_err(|_| CollectionError::Allocator { layout })?;
            copy.data = block.cast::<T>();
        }
        copy.cap = self.cap;

        unsafe {
            clone_into_uninit(self.data.as_ptr(), copy.data.as_ptr(), self.len, &mut copy.len);
        }

        Ok(copy)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> SharedBuffer for ArrayData<T, A> {
    type Alloc = A;
    const NAME: &'static str = "ArrayData";

    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Copies the live elements into a fresh block of the same capacity.
    #[track_caller]
    fn deep_copy(&self) -> Self {
        match self.try_deep_copy() {
            Ok(copy) => copy,
            Err(err) => fatal(err.at("ArrayData::deep_copy")),
        }
    }
}

impl<T, A: Allocator + Clone> Drop for ArrayData<T, A> {
    fn drop(&mut self) {
        unsafe {
            let elems: *mut [T] = core::slice::from_raw_parts_mut(self.data.as_ptr(), self.len);
            self.len = 0;
            core::ptr::drop_in_place(elems);

            if self.cap != 0 && !is_zst::<T>() {
                if let Ok(layout) = util::array_layout::<T>(self.cap) {
                    self.allocator.deallocate(self.data.cast::<u8>(), layout);
                }
            }
        }
    }
}
