//! A last in, first out adapter over [`Array`].

use core::fmt;

use allocator_api2::alloc::{Allocator, Global};

use crate::array::Array;
use crate::diagnostics::{contract, Violation};
use crate::type_trait::TypeTrait;

/// A stack backed by a copy-on-write [`Array`]. The top is the last element.
pub struct Stack<T: TypeTrait, A: Allocator + Clone = Global> {
    array: Array<T, A>,
}

impl<T: TypeTrait> Stack<T, Global> {
    #[track_caller]
    pub fn new() -> Self {
        Stack { array: Array::new() }
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Stack<T, A> {
    #[track_caller]
    pub fn new_in(allocator: A) -> Self {
        Stack {
            array: Array::new_in(allocator),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.array.is_shared()
    }

    #[inline]
    #[track_caller]
    pub fn push(&mut self, value: T) {
        self.array.push(value);
    }

    /// Removes the top element and returns it.
    #[track_caller]
    pub fn pop(&mut self) -> T {
        self.check_not_empty("Stack::pop");
        self.array.take_last()
    }

    #[track_caller]
    pub fn top(&self) -> &T {
        self.check_not_empty("Stack::top");
        self.array.last()
    }

    #[track_caller]
    pub fn top_mut(&mut self) -> &mut T {
        self.check_not_empty("Stack::top");
        self.array.last_mut()
    }

    /// The elements from bottom to top.
    pub fn as_array(&self) -> &Array<T, A> {
        &self.array
    }

    pub fn into_array(self) -> Array<T, A> {
        self.array
    }

    #[inline]
    #[track_caller]
    fn check_not_empty(&self, location: &'static str) {
        contract!(!self.is_empty(), Violation::Empty { location });
    }
}

impl<T: TypeTrait, A: Allocator + Clone> From<Array<T, A>> for Stack<T, A> {
    fn from(array: Array<T, A>) -> Self {
        Stack { array }
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Clone for Stack<T, A> {
    fn clone(&self) -> Self {
        Stack {
            array: self.array.clone(),
        }
    }
}

impl<T: TypeTrait, A: Allocator + Clone + Default> Default for Stack<T, A> {
    #[track_caller]
    fn default() -> Self {
        Stack {
            array: Array::default(),
        }
    }
}

impl<T: TypeTrait + fmt::Debug, A: Allocator + Clone> fmt::Debug for Stack<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.array, f)
    }
}

/// Same storage, like [`Array`].
impl<T: TypeTrait, A: Allocator + Clone> PartialEq for Stack<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.array == other.array
    }
}

impl<T: TypeTrait, A: Allocator + Clone> Eq for Stack<T, A> {}

impl<T: TypeTrait, A: Allocator + Clone> Extend<T> for Stack<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.array.extend(iter);
    }
}

impl<T: TypeTrait> FromIterator<T> for Stack<T, Global> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Stack {
            array: Array::from_iter(iter),
        }
    }
}

#[test]
fn lifo() {
    let mut s = Stack::new();
    s.push(Box::new(1u32));
    s.push(Box::new(2));
    s.push(Box::new(3));
    assert_eq!(s.len(), 3);
    assert_eq!(**s.top(), 3);

    assert_eq!(*s.pop(), 3);
    assert_eq!(*s.pop(), 2);
    **s.top_mut() = 10;
    assert_eq!(*s.pop(), 10);
    assert!(s.is_empty());
}

#[test]
fn shares_like_array() {
    let a: Stack<u32> = (0..4).collect();
    let mut b = a.clone();
    assert!(a == b);
    assert!(a.is_shared());

    assert_eq!(b.pop(), 3);
    assert!(a != b);
    assert_eq!(a.as_array().as_slice(), &[0, 1, 2, 3]);
    assert_eq!(b.into_array().as_slice(), &[0, 1, 2]);

    let c = Stack::from(Array::from(&[5u8][..]));
    assert_eq!(format!("{:?}", c), "[5]");
}

#[test]
#[cfg_attr(feature = "checks", should_panic(expected = "Stack::pop : container is empty"))]
#[cfg_attr(not(feature = "checks"), should_panic)]
fn pop_empty() {
    let mut s: Stack<u32> = Stack::default();
    s.push(1);
    s.pop();
    s.pop();
}
