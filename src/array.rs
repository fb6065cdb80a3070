//! A copy-on-write resizable array.

use core::fmt;
use core::ops::{Index, IndexMut, Shl, ShlAssign};
use core::slice;

use allocator_api2::alloc::{Allocator, Global};

use crate::array_data::ArrayData;
use crate::diagnostics::{contract, fatal, Violation};
use crate::shared::{SharedBuffer, SharedHandle};
use crate::type_trait::TypeTrait;

/// A contiguous growable array whose storage is shared between clones.
///
/// Cloning an `Array` is a reference count increment. Every method that can modify the
/// content first detaches the handle, copying the storage if another handle still
/// points to it. Read-only methods never copy.
///
/// Capacity is zero or a power of two.
///
/// Two arrays are equal if they share the same storage. Compare
/// [`as_slice`](Array::as_slice) to compare the elements.
///
/// ```
/// use cow_containers::Array;
///
/// let mut a = Array::new();
/// a.push(1u32);
/// a.push(2);
///
/// let b = a.clone();
/// a[0] = 10;
///
/// assert_eq!(a.as_slice(), &[10, 2]);
/// assert_eq!(b.as_slice(), &[1, 2]);
/// ```
pub struct Array<T: TypeTrait, A: Allocator + Clone = Global> {
    inner: SharedHandle<ArrayData<T, A>>,
}

impl<T: TypeTrait> Array<T, Global> {
    /// Creates an empty array. Only the shared header is allocated.
    #[track_caller]
    pub fn new() -> Self {
        Array::new_in(Global)
    }

    /// Creates an empty array with room for at least `cap` elements.
    #[track_caller]
    pub fn with_capacity(cap: usize) -> Self {
        Array::with_capacity_in(cap, Global)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Array<T, A> {
    #[track_caller]
    pub fn new_in(allocator: A) -> Self {
        Array {
            inner: SharedHandle::new(ArrayData::new_in(allocator)),
        }
    }

    #[track_caller]
    pub fn with_capacity_in(cap: usize, allocator: A) -> Self {
        let mut data = ArrayData::new_in(allocator);
        data.reserve(cap);

        Array {
            inner: SharedHandle::new(data),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.get().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.get().is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.get().capacity()
    }

    /// Returns true if the storage is referenced by other handles.
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.inner.is_shared()
    }

    /// Returns true if both arrays point to the same storage.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    pub fn allocator(&self) -> &A {
        self.inner.get().allocator()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.get().as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.inner.get_mut().as_mut_slice()
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<T> {
        self.as_slice().iter()
    }

    /// Iterates over mutable references, detaching first.
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<T> {
        self.as_mut_slice().iter_mut()
    }

    /// Returns a reference to the element at `index`.
    #[inline]
    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        self.check_index("Array::at", index);
        self.inner.get().at(index)
    }

    /// Returns a mutable reference to the element at `index`, detaching first.
    #[inline]
    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        self.check_index("Array::at", index);
        self.inner.get_mut().at_mut(index)
    }

    /// Like [`at`](Array::at) but returns `None` for an out of range index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    #[track_caller]
    pub fn first(&self) -> &T {
        self.check_not_empty("Array::first");
        &self.as_slice()[0]
    }

    #[track_caller]
    pub fn first_mut(&mut self) -> &mut T {
        self.check_not_empty("Array::first");
        &mut self.as_mut_slice()[0]
    }

    #[track_caller]
    pub fn last(&self) -> &T {
        self.check_not_empty("Array::last");
        &self.as_slice()[self.len() - 1]
    }

    #[track_caller]
    pub fn last_mut(&mut self) -> &mut T {
        self.check_not_empty("Array::last");
        let slice = self.as_mut_slice();
        &mut slice[slice.len() - 1]
    }

    /// Ensures a capacity of at least `n`, rounded up to a power of two.
    #[track_caller]
    pub fn reserve(&mut self, n: usize) {
        self.inner.get_mut().reserve(n);
    }

    /// Appends an element to the back of the array.
    #[inline]
    #[track_caller]
    pub fn push(&mut self, value: T) {
        self.inner.get_mut().push(value);
    }

    /// Appends copies of all elements of `other`.
    #[track_caller]
    pub fn append(&mut self, other: &Array<T, A>) {
        // Detaching keeps `other` alive on the old storage if both share it.
        self.inner.get_mut().extend_from_slice(other.as_slice());
    }

    #[track_caller]
    pub fn extend_from_slice(&mut self, items: &[T]) {
        self.inner.get_mut().extend_from_slice(items);
    }

    /// Inserts an element at `index`, shifting the following ones to the right.
    ///
    /// Inserting at `len()` appends.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) {
        let len = self.len();
        contract!(
            index <= len,
            Violation::OutOfRange {
                location: "Array::insert",
                index,
                len,
            }
        );

        self.inner.get_mut().insert(index, value);
    }

    #[track_caller]
    pub fn prepend(&mut self, value: T) {
        self.inner.get_mut().prepend(value);
    }

    /// Removes and drops the element at `index`.
    #[track_caller]
    pub fn remove(&mut self, index: usize) {
        self.check_index("Array::remove", index);
        drop(self.inner.get_mut().remove(index));
    }

    #[track_caller]
    pub fn remove_first(&mut self) {
        self.check_not_empty("Array::remove_first");
        self.remove(0);
    }

    #[track_caller]
    pub fn remove_last(&mut self) {
        self.check_not_empty("Array::remove_last");
        drop(self.take_last());
    }

    /// Removes the element at `index` and returns it.
    #[track_caller]
    pub fn take(&mut self, index: usize) -> T {
        self.check_index("Array::take", index);
        self.inner.get_mut().remove(index)
    }

    #[track_caller]
    pub fn take_first(&mut self) -> T {
        self.check_not_empty("Array::take_first");
        self.take(0)
    }

    #[track_caller]
    pub fn take_last(&mut self) -> T {
        self.check_not_empty("Array::take_last");
        match self.inner.get_mut().pop() {
            Some(value) => value,
            None => fatal(Violation::Empty {
                location: "Array::take_last",
            }),
        }
    }

    /// Shortens the array to `len` elements. Does nothing if it is already shorter.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }

        self.inner.get_mut().truncate(len);
    }

    /// Removes all elements.
    ///
    /// A shared array lets go of the storage instead of copying it first.
    pub fn clear(&mut self) {
        if self.is_shared() {
            let allocator = self.allocator().clone();
            *self = Array::new_in(allocator);
            return;
        }

        self.inner.get_mut().clear();
    }

    #[inline]
    #[track_caller]
    fn check_index(&self, location: &'static str, index: usize) {
        let len = self.len();
        contract!(
            index < len,
            Violation::OutOfRange {
                location,
                index,
                len,
            }
        );
    }

    #[inline]
    #[track_caller]
    fn check_not_empty(&self, location: &'static str) {
        contract!(!self.is_empty(), Violation::Empty { location });
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Clone for Array<T, A> {
    #[inline]
    fn clone(&self) -> Self {
        Array {
            inner: self.inner.clone(),
        }
    }
}

impl<T: TypeTrait, A: Allocator + Clone + Default> Default for Array<T, A> {
    #[track_caller]
    fn default() -> Self {
        Array::new_in(A::default())
    }
}

impl<T: TypeTrait + fmt::Debug, A: Allocator + Clone> fmt::Debug for Array<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: TypeTrait, A: Allocator + Clone> PartialEq for Array<T, A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Eq for Array<T, A> {}

impl<T: TypeTrait, A: Allocator + Clone> Index<usize> for Array<T, A> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.check_index("Array::index", index);
        self.inner.get().at(index)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> IndexMut<usize> for Array<T, A> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.check_index("Array::index", index);
        self.inner.get_mut().at_mut(index)
    }
}

/// Streaming append: `array << a << b`.
impl<T: TypeTrait, A: Allocator + Clone> Shl<T> for Array<T, A> {
    type Output = Self;

    #[track_caller]
    fn shl(mut self, value: T) -> Self {
        self.push(value);
        self
    }
}

impl<T: TypeTrait, A: Allocator + Clone> ShlAssign<T> for Array<T, A> {
    #[track_caller]
    fn shl_assign(&mut self, value: T) {
        self.push(value);
    }
}

/// Streaming append of another array: `array << &other`.
impl<'a, T: TypeTrait, A: Allocator + Clone> Shl<&'a Array<T, A>> for Array<T, A> {
    type Output = Self;

    #[track_caller]
    fn shl(mut self, other: &'a Array<T, A>) -> Self {
        self.append(other);
        self
    }
}

impl<'a, T: TypeTrait, A: Allocator + Clone> ShlAssign<&'a Array<T, A>> for Array<T, A> {
    #[track_caller]
    fn shl_assign(&mut self, other: &'a Array<T, A>) {
        self.append(other);
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Extend<T> for Array<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.inner.get_mut().extend(iter);
    }
}

impl<T: TypeTrait> FromIterator<T> for Array<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Array::new();
        array.extend(iter);
        array
    }
}

impl<'a, T: TypeTrait> From<&'a [T]> for Array<T, Global> {
    fn from(items: &'a [T]) -> Self {
        let mut array = Array::with_capacity(items.len());
        array.extend_from_slice(items);
        array
    }
}

impl<'a, T: TypeTrait, A: Allocator + Clone> IntoIterator for &'a Array<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T: TypeTrait, A: Allocator + Clone> IntoIterator for &'a mut Array<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> slice::IterMut<'a, T> {
        self.iter_mut()
    }
}
