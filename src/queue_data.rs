use core::alloc::Layout;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use allocator_api2::alloc::Allocator;
use allocator_api2::vec::Vec;

use crate::diagnostics::{fatal, CollectionError, Violation};
use crate::ref_count::RefCount;
use crate::shared::SharedBuffer;
use crate::type_trait::{duplicate, TypeTrait};

/// Index of a node in the arena of a queue buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

struct Node<T> {
    /// `None` for the sentinel and for recycled slots.
    value: Option<T>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl<T> Node<T> {
    fn new(value: Option<T>) -> Self {
        Node {
            value,
            prev: None,
            next: None,
        }
    }
}

/// The shared storage behind a [`Queue`](crate::Queue).
///
/// A doubly linked chain of nodes stored in an arena and terminated by a permanent,
/// data-less sentinel. The last node links to the sentinel and the sentinel links
/// back to the last node (or to nothing when the queue is empty). Dequeued slots are
/// chained through their `next` link and reused by later enqueues.
pub(crate) struct QueueData<T, A: Allocator + Clone> {
    ref_count: RefCount,
    len: usize,
    first: Option<NodeId>,
    last: Option<NodeId>,
    sentinel: NodeId,
    free: Option<NodeId>,
    nodes: Vec<Node<T>, A>,
}

impl<T, A: Allocator + Clone> QueueData<T, A> {
    /// Creates an empty queue with room for `cap` elements besides the sentinel.
    fn try_with_capacity_in(cap: usize, allocator: A) -> Result<Self, CollectionError> {
        let mut nodes = Vec::new_in(allocator);
        let slots = cap.checked_add(1).ok_or(CollectionError::CapacityOverflow)?;
        nodes.try_reserve_exact(slots).map_err(|_| CollectionError::Allocator {
            layout: Layout::new::<Node<T>>(),
        })?;
        nodes.push(Node::new(None));

        Ok(QueueData {
            ref_count: RefCount::init(),
            len: 0,
            first: None,
            last: None,
            sentinel: NodeId(0),
            free: None,
            nodes,
        })
    }

    #[track_caller]
    pub fn new_in(allocator: A) -> Self {
        match Self::try_with_capacity_in(0, allocator) {
            Ok(data) => data,
            Err(err) => fatal(err.at("QueueData::new")),
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
    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }

    /// The next real node after `id`, `None` at the sentinel.
    #[inline]
    fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next.filter(|&next| next != self.sentinel)
    }

    /// Stores `value` in a recycled slot, or in a new one at the end of the arena.
    #[track_caller]
    fn alloc_node(&mut self, value: T) -> NodeId {
        if let Some(id) = self.free {
            let node = self.node_mut(id);
            let next_free = node.next;
            *node = Node::new(Some(value));
            self.free = next_free;

            return id;
        }

        if self.nodes.try_reserve(1).is_err() {
            self.failed_alloc_purge(CollectionError::Allocator {
                layout: Layout::new::<Node<T>>(),
            });
        }

        self.nodes.push(Node::new(Some(value)));
        NodeId(self.nodes.len() - 1)
    }

    /// Drops the content and reports the allocation failure.
    #[cold]
    #[inline(never)]
    #[track_caller]
    fn failed_alloc_purge(&mut self, err: CollectionError) -> ! {
        log::debug!("QueueData: allocation failure with {} items, purging", self.len);
        self.clear();

        fatal(err.at("QueueData::enqueue"));
    }

    /// Appends `value` after the last node.
    #[track_caller]
    pub fn enqueue(&mut self, value: T) {
        let id = self.alloc_node(value);
        let sentinel = self.sentinel;

        match self.last {
            Some(last) => {
                self.node_mut(last).next = Some(id);
                self.node_mut(id).prev = Some(last);
            }
            None => self.first = Some(id),
        }

        self.last = Some(id);
        self.node_mut(id).next = Some(sentinel);
        self.node_mut(sentinel).prev = Some(id);
        self.len += 1;
    }

    /// Removes and returns the first value.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn dequeue(&mut self) -> T {
        #[cold]
        #[inline(never)]
        #[track_caller]
        fn empty() -> ! {
            panic!("dequeue on an empty queue");
        }

        let Some(id) = self.first else { empty() };
        let next = self.next_of(id);
        let free = self.free;

        let node = self.node_mut(id);
        let Some(value) = node.value.take() else { empty() };
        node.prev = None;
        node.next = free;
        self.free = Some(id);
        self.len -= 1;

        match next {
            Some(next) => {
                self.node_mut(next).prev = None;
                self.first = Some(next);
            }
            None => {
                let sentinel = self.sentinel;
                self.first = None;
                self.last = None;
                self.node_mut(sentinel).prev = None;
            }
        }

        value
    }

    /// Walks `index` links from the first node, stopping at the sentinel.
    #[track_caller]
    fn node_at(&self, index: usize) -> NodeId {
        let mut cursor = self.first;
        for _ in 0..index {
            match cursor {
                Some(id) => cursor = self.next_of(id),
                None => break,
            }
        }

        match cursor {
            Some(id) => id,
            None => fatal(Violation::OutOfRange {
                location: "QueueData::at",
                index,
                len: self.len,
            }),
        }
    }

    #[track_caller]
    pub fn at(&self, index: usize) -> &T {
        let id = self.node_at(index);
        match self.node(id).value.as_ref() {
            Some(value) => value,
            None => unreachable!("live node without a value"),
        }
    }

    #[track_caller]
    pub fn at_mut(&mut self, index: usize) -> &mut T {
        let id = self.node_at(index);
        match self.node_mut(id).value.as_mut() {
            Some(value) => value,
            None => unreachable!("live node without a value"),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.first.and_then(|id| self.node(id).value.as_ref())
    }

    pub fn last(&self) -> Option<&T> {
        self.last.and_then(|id| self.node(id).value.as_ref())
    }

    pub fn first_mut(&mut self) -> Option<&mut T> {
        let id = self.first?;
        self.node_mut(id).value.as_mut()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        let id = self.last?;
        self.node_mut(id).value.as_mut()
    }

    /// Drops every value, walking backward from the last node, and releases the slots.
    pub fn clear(&mut self) {
        let mut cursor = self.last;
        while let Some(id) = cursor {
            let node = self.node_mut(id);
            cursor = node.prev;
            node.value = None;
        }

        let sentinel = self.sentinel;
        self.nodes.truncate(sentinel.0 + 1);
        *self.node_mut(sentinel) = Node::new(None);
        self.first = None;
        self.last = None;
        self.free = None;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<T> {
        Iter {
            nodes: self.nodes.as_slice(),
            front: self.first,
            back: self.last,
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<T> {
        IterMut {
            nodes: self.nodes.as_mut_ptr(),
            front: self.first,
            back: self.last,
            remaining: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T: TypeTrait, A: Allocator + Clone> QueueData<T, A> {
    fn try_deep_copy(&self) -> Result<Self, CollectionError> {
        let allocator = self.nodes.allocator().clone();
        let mut copy = QueueData::try_with_capacity_in(self.len, allocator)?;

        // Slots are reserved: the copy is compacted in chain order and never reallocates.
        for value in self.iter() {
            copy.enqueue(duplicate(value));
        }

        Ok(copy)
    }
}

impl<T: TypeTrait, A: Allocator + Clone> SharedBuffer for QueueData<T, A> {
    type Alloc = A;
    const NAME: &'static str = "QueueData";

    fn ref_count(&self) -> &RefCount {
        &self.ref_count
    }

    fn allocator(&self) -> &A {
        self.nodes.allocator()
    }

    #[track_caller]
    fn deep_copy(&self) -> Self {
        match self.try_deep_copy() {
            Ok(copy) => copy,
            Err(err) => fatal(err.at("QueueData::deep_copy")),
        }
    }
}

impl<T, A: Allocator + Clone> Drop for QueueData<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Front to back iterator over the values of a queue.
pub struct Iter<'a, T> {
    nodes: &'a [Node<T>],
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }

        let node = &self.nodes[self.front?.0];
        self.front = node.next;
        self.remaining -= 1;

        node.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }

        let node = &self.nodes[self.back?.0];
        self.back = node.prev;
        self.remaining -= 1;

        node.value.as_ref()
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

/// Front to back iterator over mutable references to the values of a queue.
pub struct IterMut<'a, T> {
    nodes: *mut Node<T>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }

        // SAFETY: the `remaining` count keeps the front and back cursors from
        // yielding the same node twice.
        let node = unsafe { &mut *self.nodes.add(self.front?.0) };
        self.front = node.next;
        self.remaining -= 1;

        node.value.as_mut()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }

        let node = unsafe { &mut *self.nodes.add(self.back?.0) };
        self.back = node.prev;
        self.remaining -= 1;

        node.value.as_mut()
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}
impl<'a, T> FusedIterator for IterMut<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_alloc::LimitedAllocator;
    use allocator_api2::alloc::Global;

    fn num(val: u32) -> Box<u32> {
        Box::new(val)
    }

    fn values<T: Clone, A: Allocator + Clone>(q: &QueueData<T, A>) -> std::vec::Vec<T> {
        q.iter().cloned().collect()
    }

    #[test]
    fn fifo() {
        let mut q = QueueData::new_in(Global);
        q.enqueue(num(1));
        q.enqueue(num(2));
        q.enqueue(num(3));
        assert_eq!(q.len(), 3);
        assert_eq!(q.first(), Some(&num(1)));
        assert_eq!(q.last(), Some(&num(3)));

        assert_eq!(q.dequeue(), num(1));
        assert_eq!(q.dequeue(), num(2));
        assert_eq!(q.dequeue(), num(3));
        assert!(q.is_empty());
        assert_eq!(q.first(), None);
        assert_eq!(q.last(), None);
    }

    #[test]
    fn sentinel_links() {
        let mut q = QueueData::new_in(Global);
        assert_eq!(q.node(q.sentinel).prev, None);

        q.enqueue(1u32);
        q.enqueue(2);
        let last = q.last.unwrap();
        assert_eq!(q.node(q.sentinel).prev, Some(last));
        assert_eq!(q.node(last).next, Some(q.sentinel));
        assert_eq!(q.node(q.first.unwrap()).prev, None);

        q.dequeue();
        q.dequeue();
        assert_eq!(q.node(q.sentinel).prev, None);
        assert_eq!(q.first, None);
        assert_eq!(q.last, None);
    }

    #[test]
    fn slots_are_recycled() {
        let mut q = QueueData::new_in(Global);
        for i in 0..4u32 {
            q.enqueue(i);
        }
        assert_eq!(q.nodes.len(), 5);

        for i in 0..100u32 {
            assert_eq!(q.dequeue(), i);
            q.enqueue(i + 4);
        }

        assert_eq!(q.nodes.len(), 5);
        assert_eq!(values(&q), vec![100, 101, 102, 103]);
    }

    #[test]
    fn positional_access() {
        let mut q = QueueData::new_in(Global);
        q.enqueue(num(10));
        q.enqueue(num(20));
        q.enqueue(num(30));

        assert_eq!(*q.at(0), num(10));
        assert_eq!(*q.at(2), num(30));

        *q.at_mut(1) = num(21);
        assert_eq!(values(&q), vec![num(10), num(21), num(30)]);
    }

    #[test]
    #[should_panic(expected = "QueueData::at : index out of range")]
    fn walk_past_the_end() {
        let mut q = QueueData::new_in(Global);
        q.enqueue(1u32);
        q.enqueue(2);
        q.at(2);
    }

    #[test]
    #[should_panic(expected = "QueueData::at : index out of range")]
    fn walk_stops_at_the_sentinel() {
        let mut q = QueueData::new_in(Global);
        q.enqueue(1u32);
        q.at(usize::MAX);
    }

    #[test]
    fn iterate_both_ways() {
        let mut q = QueueData::new_in(Global);
        for i in 1..=5u32 {
            q.enqueue(i);
        }
        q.dequeue();

        let forward: std::vec::Vec<u32> = q.iter().copied().collect();
        assert_eq!(forward, vec![2, 3, 4, 5]);
        let backward: std::vec::Vec<u32> = q.iter().rev().copied().collect();
        assert_eq!(backward, vec![5, 4, 3, 2]);

        let mut iter = q.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next_back(), Some(&5));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);

        for value in q.iter_mut() {
            *value *= 10;
        }
        assert_eq!(values(&q), vec![20, 30, 40, 50]);

        if let Some(last) = q.iter_mut().next_back() {
            *last = 0;
        }
        assert_eq!(values(&q), vec![20, 30, 40, 0]);
    }

    #[test]
    fn deep_copy_compacts() {
        let mut q = QueueData::new_in(Global);
        for i in 0..6u32 {
            q.enqueue(num(i));
        }
        q.dequeue();
        q.dequeue();

        let mut copy = q.deep_copy();
        assert_eq!(copy.ref_count().get(), 1);
        assert_eq!(copy.len(), 4);
        assert_eq!(copy.nodes.len(), 5);
        assert_eq!(values(&copy), values(&q));
        assert!(!core::ptr::eq(&**copy.at(0), &**q.at(0)));

        copy.enqueue(num(6));
        *copy.at_mut(0) = num(42);
        assert_eq!(values(&q), vec![num(2), num(3), num(4), num(5)]);
        assert_eq!(values(&copy), vec![num(42), num(3), num(4), num(5), num(6)]);

        let empty: QueueData<u32, Global> = QueueData::new_in(Global);
        let copy = empty.deep_copy();
        assert!(copy.is_empty());
        assert_eq!(copy.node(copy.sentinel).prev, None);
    }

    #[test]
    fn clear_releases_everything() {
        let allocator = LimitedAllocator::new(64);
        {
            let mut q = QueueData::new_in(&allocator);
            for i in 0..10u32 {
                q.enqueue(num(i));
            }
            q.clear();
            assert!(q.is_empty());
            assert_eq!(q.nodes.len(), 1);

            q.enqueue(num(1));
            assert_eq!(values(&q), vec![num(1)]);
        }
        assert_eq!(allocator.live_allocations(), 0);
    }

    #[test]
    #[should_panic(expected = "QueueData::enqueue : bad alloc")]
    fn failed_enqueue() {
        // The sentinel slot, then nothing.
        let allocator = LimitedAllocator::new(1);
        let mut q = QueueData::new_in(&allocator);
        q.enqueue(1u32);
    }
}
