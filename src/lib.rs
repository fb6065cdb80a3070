//! Copy-on-write containers for targets without the standard library.
//!
//! [`Array`], [`Queue`] and [`Stack`] are cheap handles: cloning one only bumps the
//! reference count of the buffer it points to. The buffer is duplicated the first time
//! a handle that shares it is about to mutate it.
//!
//! ```
//! use cow_containers::Array;
//!
//! let a: Array<u32> = Array::from(&[1, 2, 3][..]);
//! let mut b = a.clone();
//! assert!(a == b);
//!
//! b.push(4);
//! assert_eq!(a.as_slice(), &[1, 2, 3]);
//! assert_eq!(b.as_slice(), &[1, 2, 3, 4]);
//! assert!(a != b);
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub use allocator_api2::alloc::{AllocError, Allocator, Global};

mod util;
pub mod diagnostics;
pub mod ref_count;
pub mod type_trait;
mod shared;
mod array_data;
mod queue_data;
pub mod array;
pub mod queue;
pub mod stack;

pub use array::Array;
pub use diagnostics::{Violation, CONTRACT_CHECKS};
pub use queue::Queue;
pub use ref_count::RefCount;
pub use stack::Stack;
pub use type_trait::{TypeInfo, TypeTrait};

#[cfg(test)]
pub(crate) mod test_alloc;
