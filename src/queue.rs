//! A copy-on-write FIFO queue.

use core::fmt;
use core::ops::{Index, IndexMut, Shl, ShlAssign};

use allocator_api2::alloc::{Allocator, Global};

use crate::diagnostics::{contract, fatal, Violation};
use crate::queue_data::QueueData;
use crate::shared::{SharedBuffer, SharedHandle};
use crate::type_trait::TypeTrait;

pub use crate::queue_data::{Iter, IterMut};

/// A first in, first out queue whose nodes are shared between clones.
///
/// Like [`Array`](crate::Array), cloning a queue only bumps a reference count and the
/// nodes are copied by the first clone that modifies them.
///
/// [`first`](Queue::first) and [`last`](Queue::last) take `&mut self` and detach, even
/// though they only read.
///
/// ```
/// use cow_containers::Queue;
///
/// let mut q = Queue::new() << 'a' << 'b' << 'c';
/// assert_eq!(q.dequeue(), 'a');
/// assert_eq!(q.dequeue(), 'b');
/// assert_eq!(q.dequeue(), 'c');
/// assert!(q.is_empty());
/// ```
pub struct Queue<T: TypeTrait, A: Allocator + Clone = Global> {
    inner: SharedHandle<QueueData<T, A>>,
}

impl<T: TypeTrait> Queue<T, Global> {
    #[track_caller]
    pub fn new() -> Self {
        Queue::new_in(Global)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Queue<T, A> {
    /// Creates an empty queue. Allocates the shared header and the sentinel node.
    #[track_caller]
    pub fn new_in(allocator: A) -> Self {
        Queue {
            inner: SharedHandle::new(QueueData::new_in(allocator)),
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
    pub fn is_shared(&self) -> bool {
        self.inner.is_shared()
    }

    /// Returns true if both queues point to the same nodes.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    pub fn allocator(&self) -> &A {
        self.inner.get().allocator()
    }

    /// Adds a value at the back of the queue.
    #[track_caller]
    pub fn enqueue(&mut self, value: T) {
        self.inner.get_mut().enqueue(value);
    }

    /// Removes the value at the front of the queue and returns it.
    #[track_caller]
    pub fn dequeue(&mut self) -> T {
        contract!(
            !self.is_empty(),
            Violation::Empty {
                location: "Queue::dequeue"
            }
        );

        self.inner.get_mut().dequeue()
    }

    /// Returns the value `index` positions from the front.
    ///
    /// Walks the chain of nodes.
    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        self.check_index("Queue::at", index);
        self.inner.get().at(index)
    }

    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        self.check_index("Queue::at", index);
        self.inner.get_mut().at_mut(index)
    }

    /// The value at the front. Detaches.
    #[track_caller]
    pub fn first(&mut self) -> &T {
        match self.inner.get_mut().first() {
            Some(value) => value,
            None => fatal(Violation::Empty {
                location: "Queue::first",
            }),
        }
    }

    /// The value at the back. Detaches.
    #[track_caller]
    pub fn last(&mut self) -> &T {
        match self.inner.get_mut().last() {
            Some(value) => value,
            None => fatal(Violation::Empty {
                location: "Queue::last",
            }),
        }
    }

    #[track_caller]
    pub fn first_mut(&mut self) -> &mut T {
        match self.inner.get_mut().first_mut() {
            Some(value) => value,
            None => fatal(Violation::Empty {
                location: "Queue::first",
            }),
        }
    }

    #[track_caller]
    pub fn last_mut(&mut self) -> &mut T {
        match self.inner.get_mut().last_mut() {
            Some(value) => value,
            None => fatal(Violation::Empty {
                location: "Queue::last",
            }),
        }
    }

    /// Iterates from front to back without detaching.
    pub fn iter(&self) -> Iter<T> {
        self.inner.get().iter()
    }

    /// Iterates over mutable references from front to back, detaching first.
    pub fn iter_mut(&mut self) -> IterMut<T> {
        self.inner.get_mut().iter_mut()
    }

    /// Removes all values.
    pub fn clear(&mut self) {
        if self.is_shared() {
            let allocator = self.allocator().clone();
            *self = Queue::new_in(allocator);
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
}

impl<T: TypeTrait, A: Allocator + Clone> Clone for Queue<T, A> {
    #[inline]
    fn clone(&self) -> Self {
        Queue {
            inner: self.inner.clone(),
        }
    }
}

impl<T: TypeTrait, A: Allocator + Clone + Default> Default for Queue<T, A> {
    #[track_caller]
    fn default() -> Self {
        Queue::new_in(A::default())
    }
}

impl<T: TypeTrait + fmt::Debug, A: Allocator + Clone> fmt::Debug for Queue<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: TypeTrait, A: Allocator + Clone> PartialEq for Queue<T, A> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Eq for Queue<T, A> {}

impl<T: TypeTrait, A: Allocator + Clone> Index<usize> for Queue<T, A> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.check_index("Queue::index", index);
        self.inner.get().at(index)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> IndexMut<usize> for Queue<T, A> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.check_index("Queue::index", index);
        self.inner.get_mut().at_mut(index)
    }
}

/// Streaming enqueue: `queue << a << b`.
impl<T: TypeTrait, A: Allocator + Clone> Shl<T> for Queue<T, A> {
    type Output = Self;

    #[track_caller]
    fn shl(mut self, value: T) -> Self {
        self.enqueue(value);
        self
    }
}

impl<T: TypeTrait, A: Allocator + Clone> ShlAssign<T> for Queue<T, A> {
    #[track_caller]
    fn shl_assign(&mut self, value: T) {
        self.enqueue(value);
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Extend<T> for Queue<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let data = self.inner.get_mut();
        for value in iter {
            data.enqueue(value);
        }
    }
}

impl<T: TypeTrait> FromIterator<T> for Queue<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Queue::new();
        queue.extend(iter);
        queue
    }
}

impl<'a, T: TypeTrait, A: Allocator + Clone> IntoIterator for &'a Queue<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T: TypeTrait, A: Allocator + Clone> IntoIterator for &'a mut Queue<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_alloc::LimitedAllocator;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn num(val: u32) -> Box<u32> {
        Box::new(val)
    }

    fn values<T: TypeTrait>(q: &Queue<T>) -> std::vec::Vec<T> {
        q.iter().cloned().collect()
    }

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        q.enqueue(num(1));
        q.enqueue(num(2));
        q.enqueue(num(3));
        assert_eq!(q.len(), 3);

        assert_eq!(q.dequeue(), num(1));
        assert_eq!(q.dequeue(), num(2));
        assert_eq!(q.dequeue(), num(3));
        assert!(q.is_empty());

        q.enqueue(num(4));
        assert_eq!(q.dequeue(), num(4));
    }

    #[test]
    #[cfg_attr(feature = "checks", should_panic(expected = "Queue::dequeue : container is empty"))]
    #[cfg_attr(not(feature = "checks"), should_panic)]
    fn dequeue_empty() {
        let mut q = Queue::new();
        q.enqueue(1u32);
        q.dequeue();
        q.dequeue();
    }

    #[test]
    fn copy_then_mutate() {
        let a: Queue<Box<u32>> = (1..=3).map(num).collect();
        let mut b = a.clone();
        assert!(a == b);

        b.enqueue(num(4));
        assert!(a != b);
        assert_eq!(values(&a), vec![num(1), num(2), num(3)]);
        assert_eq!(values(&b), vec![num(1), num(2), num(3), num(4)]);

        let mut c = a.clone();
        assert_eq!(c.dequeue(), num(1));
        assert_eq!(a.len(), 3);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn reads_do_not_detach() {
        let a: Queue<u32> = (0..5).collect();
        let b = a.clone();

        assert_eq!(*b.at(4), 4);
        assert_eq!(b[2], 2);
        assert_eq!(b.iter().rev().copied().collect::<std::vec::Vec<_>>(), vec![4, 3, 2, 1, 0]);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn endpoints_detach() {
        let a: Queue<u32> = (0..5).collect();

        let mut b = a.clone();
        assert_eq!(*b.first(), 0);
        assert!(!a.ptr_eq(&b));

        let mut b = a.clone();
        assert_eq!(*b.last(), 4);
        assert!(!a.ptr_eq(&b));
        assert!(!b.is_shared());

        *b.first_mut() = 10;
        *b.last_mut() = 40;
        assert_eq!(values(&b), vec![10, 1, 2, 3, 40]);
        assert_eq!(values(&a), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn positional_writes() {
        let a: Queue<String> = ["a", "b", "c"].iter().map(|s| String::from(*s)).collect();
        let mut b = a.clone();
        b[1].push('x');
        b.at_mut(2).push('y');
        for value in b.iter_mut() {
            value.push('!');
        }

        assert_eq!(values(&a), vec!["a", "b", "c"]);
        assert_eq!(values(&b), vec!["a!", "bx!", "cy!"]);
    }

    #[test]
    fn identity_equality() {
        let a: Queue<u32> = (0..3).collect();
        let b: Queue<u32> = (0..3).collect();
        assert!(a != b);
        assert_eq!(values(&a), values(&b));

        // Assignment shares the nodes.
        let mut c = Queue::new();
        assert!(c != a);
        c = a.clone();
        assert!(c == a);
    }

    #[test]
    fn streaming_and_debug() {
        let mut q = Queue::new() << 1u8 << 2;
        q <<= 3;
        assert_eq!(format!("{:?}", q), "[1, 2, 3]");

        let empty: Queue<u8> = Queue::default();
        assert_eq!(format!("{:?}", empty), "[]");
    }

    #[test]
    fn clear_shared() {
        let a: Queue<Box<u32>> = (0..4).map(num).collect();
        let mut b = a.clone();
        b.clear();
        assert!(b.is_empty());
        assert_eq!(a.len(), 4);
        assert!(!a.is_shared());

        b.enqueue(num(7));
        assert_eq!(values(&b), vec![num(7)]);
    }

    #[test]
    fn releases_nodes() {
        let allocator = LimitedAllocator::new(64);
        {
            let mut a = Queue::new_in(&allocator);
            for i in 0..10 {
                a.enqueue(num(i));
            }
            let mut b = a.clone();
            b.dequeue();
            b.enqueue(num(10));
            a.dequeue();
        }
        assert_eq!(allocator.live_allocations(), 0);
    }

    #[test]
    #[cfg_attr(feature = "checks", should_panic(expected = "Queue::at : index out of range"))]
    #[cfg_attr(not(feature = "checks"), should_panic(expected = "QueueData::at : index out of range"))]
    fn at_len() {
        let q: Queue<u32> = (0..3).collect();
        q.at(3);
    }

    #[test]
    #[cfg_attr(feature = "checks", should_panic(expected = "Queue::at : index out of range"))]
    #[cfg_attr(not(feature = "checks"), should_panic(expected = "QueueData::at : index out of range"))]
    fn at_minus_one() {
        let mut q: Queue<u32> = (0..3).collect();
        q.dequeue();
        q.at(usize::MAX);
    }

    #[test]
    #[cfg_attr(feature = "checks", should_panic(expected = "Queue::index : index out of range"))]
    #[cfg_attr(not(feature = "checks"), should_panic(expected = "QueueData::at : index out of range"))]
    fn index_mut_minus_one() {
        let mut q: Queue<u32> = (0..3).collect();
        q[usize::MAX] = 0;
    }

    #[test]
    #[should_panic(expected = "Queue::first : container is empty")]
    fn first_of_empty() {
        let mut q: Queue<u32> = Queue::new();
        q.first();
    }

    proptest! {
        #[test]
        fn behaves_like_vec_deque(ops in proptest::collection::vec(proptest::option::of(any::<u32>()), 0..200)) {
            let mut q = Queue::new();
            let mut shadow = VecDeque::new();
            let mut snapshots = std::vec::Vec::new();

            for op in ops {
                match op {
                    Some(v) => {
                        q.enqueue(num(v));
                        shadow.push_back(v);
                    }
                    None if !shadow.is_empty() => {
                        prop_assert_eq!(*q.dequeue(), shadow.pop_front().unwrap_or_default());
                        snapshots.push((q.clone(), shadow.clone()));
                    }
                    None => {}
                }
                prop_assert_eq!(q.len(), shadow.len());
            }

            for (q, shadow) in snapshots {
                let unboxed: std::vec::Vec<u32> = q.iter().map(|v| **v).collect();
                prop_assert_eq!(unboxed, shadow.into_iter().collect::<std::vec::Vec<_>>());
            }
        }
    }
}
