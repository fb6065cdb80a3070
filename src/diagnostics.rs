//! Fatal reporting.
//!
//! The containers have no recoverable error path. A broken precondition or an exhausted
//! allocator is described by a [`Violation`] and handed to [`fatal`], which logs it and
//! panics. Build with `panic = "abort"` to terminate the process on the spot.

use core::alloc::Layout;
use core::fmt;
use core::panic::Location;

/// Whether handle-level contract checks are compiled in (the `checks` feature).
///
/// Without them an out-of-range index still hits the bounds check of the underlying
/// slice, but the report only carries the core panic message.
pub const CONTRACT_CHECKS: bool = cfg!(feature = "checks");

/// A broken contract or an allocation failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// An index was not within the bounds of the container.
    OutOfRange {
        location: &'static str,
        index: usize,
        len: usize,
    },
    /// An element was requested from an empty container.
    Empty { location: &'static str },
    /// An argument that does not satisfy the operation's precondition.
    InvalidArgument {
        location: &'static str,
        what: &'static str,
    },
    /// The allocator could not satisfy a request.
    AllocFailed {
        location: &'static str,
        layout: Layout,
    },
    /// The requested capacity does not fit in the address space.
    CapacityOverflow { location: &'static str },
}

impl Violation {
    /// The operation that detected the violation, e.g. `"Array::at"`.
    pub fn location(&self) -> &'static str {
        match *self {
            Violation::OutOfRange { location, .. }
            | Violation::Empty { location }
            | Violation::InvalidArgument { location, .. }
            | Violation::AllocFailed { location, .. }
            | Violation::CapacityOverflow { location } => location,
        }
    }

    /// Short description of the failed condition.
    pub fn condition(&self) -> &'static str {
        match *self {
            Violation::OutOfRange { .. } => "index out of range",
            Violation::Empty { .. } => "container is empty",
            Violation::InvalidArgument { what, .. } => what,
            Violation::AllocFailed { .. } => "bad alloc",
            Violation::CapacityOverflow { .. } => "capacity overflow",
        }
    }

    pub fn is_alloc_failure(&self) -> bool {
        matches!(self, Violation::AllocFailed { .. } | Violation::CapacityOverflow { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} : {}", self.location(), self.condition())?;
        match *self {
            Violation::OutOfRange { index, len, .. } => write!(f, " (index {index}, len {len})"),
            Violation::AllocFailed { layout, .. } => {
                write!(f, " ({} bytes, align {})", layout.size(), layout.align())
            }
            _ => Ok(()),
        }
    }
}

/// Reports `violation` and never returns.
///
/// The report goes through the `log` facade at the error level along with the source
/// location of the caller, then the current thread panics with the same message.
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(violation: Violation) -> ! {
    let caller = Location::caller();
    log::error!(
        "{} | file : {}, line : {}",
        violation,
        caller.file(),
        caller.line()
    );

    panic!("{violation}");
}

/// Reports `$violation` through [`fatal`] if `$cond` does not hold.
///
/// Folds away entirely when [`CONTRACT_CHECKS`] is false.
macro_rules! contract {
    ($cond:expr, $violation:expr) => {
        if $crate::diagnostics::CONTRACT_CHECKS && !$cond {
            $crate::diagnostics::fatal($violation);
        }
    };
}

pub(crate) use contract;

/// Failure of an internal allocation helper.
///
/// Never escapes the crate: every caller turns it into a [`Violation`] and reports it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum CollectionError {
    /// Overflow of `isize::MAX` or other error during size computation.
    CapacityOverflow,
    /// The allocator returned an error.
    Allocator { layout: Layout },
}

impl CollectionError {
    pub(crate) fn at(self, location: &'static str) -> Violation {
        match self {
            CollectionError::CapacityOverflow => Violation::CapacityOverflow { location },
            CollectionError::Allocator { layout } => Violation::AllocFailed { location, layout },
        }
    }
}

#[test]
fn violation_messages() {
    let v = Violation::OutOfRange { location: "Array::at", index: 3, len: 3 };
    assert_eq!(v.to_string(), "Array::at : index out of range (index 3, len 3)");
    assert_eq!(v.location(), "Array::at");
    assert!(!v.is_alloc_failure());

    let v = Violation::Empty { location: "Queue::dequeue" };
    assert_eq!(v.to_string(), "Queue::dequeue : container is empty");

    let layout = Layout::from_size_align(64, 8).unwrap();
    let v = CollectionError::Allocator { layout }.at("ArrayData::realloc");
    assert_eq!(v.to_string(), "ArrayData::realloc : bad alloc (64 bytes, align 8)");
    assert!(v.is_alloc_failure());

    let v = CollectionError::CapacityOverflow.at("ArrayData::reserve");
    assert_eq!(v.condition(), "capacity overflow");
    assert!(v.is_alloc_failure());
}

#[test]
#[should_panic(expected = "Queue::dequeue : container is empty")]
fn fatal_panics() {
    fatal(Violation::Empty { location: "Queue::dequeue" });
}
