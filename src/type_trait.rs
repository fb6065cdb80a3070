//! Element type classification.
//!
//! Buffers pick their copy strategy from [`TypeTrait::IS_ATOMIC`]: atomic elements are
//! duplicated with a raw byte copy, everything else goes through `Clone` so that the
//! resources an element owns are duplicated properly. The choice is made per type at
//! compile time.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::mem;
use core::ptr::{self, NonNull};

/// Describes how an element type can be copied.
///
/// # Safety
///
/// `IS_ATOMIC` may only be `true` for types that are `Copy`: a bitwise copy of the value
/// must be a valid, independent value and dropping it must be a no-op. The
/// [`atomic_types!`](crate::atomic_types) macro checks this statically.
pub unsafe trait TypeTrait: Clone {
    /// Field-less enumeration.
    const IS_STATIC: bool = false;
    /// Raw pointer or reference.
    const IS_POINTER: bool = false;
    /// Integral or floating point scalar, duplicated with a byte copy.
    const IS_ATOMIC: bool = false;
    /// Needs its own copy and drop logic.
    const IS_COMPLEX: bool = !Self::IS_STATIC && !Self::IS_ATOMIC && !Self::IS_POINTER;
    /// Bigger than a machine word.
    const IS_LARGE: bool = mem::size_of::<Self>() > mem::size_of::<usize>();
    const SIZE_OF: usize = mem::size_of::<Self>();
}

/// The classification of a type as a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    pub is_static: bool,
    pub is_pointer: bool,
    pub is_atomic: bool,
    pub is_complex: bool,
    pub is_large: bool,
    pub size_of: usize,
}

impl TypeInfo {
    pub const fn of<T: TypeTrait>() -> Self {
        TypeInfo {
            is_static: T::IS_STATIC,
            is_pointer: T::IS_POINTER,
            is_atomic: T::IS_ATOMIC,
            is_complex: T::IS_COMPLEX,
            is_large: T::IS_LARGE,
            size_of: T::SIZE_OF,
        }
    }
}

/// Classifies `Copy` types as atomic.
///
/// ```
/// #[derive(Copy, Clone)]
/// struct Rgba(u8, u8, u8, u8);
///
/// cow_containers::atomic_types!(Rgba);
///
/// assert!(cow_containers::TypeInfo::of::<Rgba>().is_atomic);
/// ```
#[macro_export]
macro_rules! atomic_types {
    ($($t:ty),* $(,)?) => {
        $(
            const _: fn() = || {
                fn assert_copy<T: ::core::marker::Copy>() {}
                assert_copy::<$t>();
            };

            unsafe impl $crate::TypeTrait for $t {
                const IS_ATOMIC: bool = true;
            }
        )*
    };
}

/// Classifies types as complex: they are always duplicated through `Clone`.
#[macro_export]
macro_rules! complex_types {
    ($($t:ty),* $(,)?) => {
        $(
            unsafe impl $crate::TypeTrait for $t {}
        )*
    };
}

/// Classifies field-less enums.
///
/// They are neither atomic nor complex and are copied through `Clone`.
#[macro_export]
macro_rules! static_types {
    ($($t:ty),* $(,)?) => {
        $(
            unsafe impl $crate::TypeTrait for $t {
                const IS_STATIC: bool = true;
            }
        )*
    };
}

atomic_types!(
    bool, char, i8, u8, i16, u16, i32, u32, i64, u64, i128, u128, isize, usize, f32, f64,
);

complex_types!(String);

unsafe impl TypeTrait for () {
    const IS_LARGE: bool = false;
    const IS_COMPLEX: bool = false;
}

unsafe impl<T: ?Sized> TypeTrait for *const T {
    const IS_POINTER: bool = true;
    const IS_LARGE: bool = false;
}

unsafe impl<T: ?Sized> TypeTrait for *mut T {
    const IS_POINTER: bool = true;
    const IS_LARGE: bool = false;
}

unsafe impl<T: ?Sized> TypeTrait for NonNull<T> {
    const IS_POINTER: bool = true;
    const IS_LARGE: bool = false;
}

unsafe impl<'a, T: ?Sized> TypeTrait for &'a T {
    const IS_POINTER: bool = true;
    const IS_LARGE: bool = false;
}

unsafe impl<T: Clone> TypeTrait for Box<T> {}
unsafe impl<T: Clone> TypeTrait for Vec<T> {}
unsafe impl<T: ?Sized> TypeTrait for Rc<T> {}
unsafe impl<T: Clone> TypeTrait for Option<T> {}

unsafe impl<T: TypeTrait, const N: usize> TypeTrait for [T; N] {
    const IS_ATOMIC: bool = T::IS_ATOMIC;
}

/// Writes clones of `n` elements from `src` into the uninitialized `dst`, counting each
/// completed write in `written`.
///
/// # Safety
///
/// `src` must be valid for `n` reads and `dst` for `n` writes, and the two ranges must
/// not overlap.
pub(crate) unsafe fn clone_into_uninit<T: TypeTrait>(
    src: *const T,
    dst: *mut T,
    n: usize,
    written: &mut usize,
) {
    if T::IS_ATOMIC {
        ptr::copy_nonoverlapping(src, dst, n);
        *written += n;
        return;
    }

    // `written` tracks progress so that a panicking `clone` leaves the
    // destination with a consistent length.
    for i in 0..n {
        ptr::write(dst.add(i), (*src.add(i)).clone());
        *written += 1;
    }
}

/// Duplicates a single element with the strategy of its type.
#[inline]
pub(crate) fn duplicate<T: TypeTrait>(value: &T) -> T {
    if T::IS_ATOMIC {
        // SAFETY: atomic types are `Copy`.
        unsafe { ptr::read(value) }
    } else {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Named {
        name: String,
    }

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Mode {
        Idle,
        Run,
    }

    crate::atomic_types!(Point);
    crate::complex_types!(Named);
    crate::static_types!(Mode);

    #[test]
    fn scalars_are_atomic() {
        let info = TypeInfo::of::<u32>();
        assert!(info.is_atomic);
        assert!(!info.is_complex);
        assert!(!info.is_pointer);
        assert!(!info.is_large);
        assert_eq!(info.size_of, 4);

        assert!(f64::IS_ATOMIC);
        assert!(bool::IS_ATOMIC);
        assert!(u128::IS_LARGE);
        assert!(!u8::IS_LARGE);
    }

    #[test]
    fn pointers() {
        let info = TypeInfo::of::<*const String>();
        assert!(info.is_pointer);
        assert!(!info.is_atomic);
        assert!(!info.is_complex);
        assert_eq!(info.size_of, mem::size_of::<usize>());

        assert!(<&str>::IS_POINTER);
        assert!(!<&str>::IS_LARGE);
    }

    #[test]
    fn owning_types_are_complex() {
        assert!(String::IS_COMPLEX);
        assert!(<Box<u32>>::IS_COMPLEX);
        assert!(<Vec<u8>>::IS_COMPLEX);
        assert!(<Option<u8>>::IS_COMPLEX);
        assert!(Named::IS_COMPLEX);
        assert!(!Named::IS_ATOMIC);
    }

    #[test]
    fn user_types() {
        assert!(Point::IS_ATOMIC);
        assert!(!Point::IS_COMPLEX);

        assert!(Mode::IS_STATIC);
        assert!(!Mode::IS_ATOMIC);
        assert!(!Mode::IS_COMPLEX);
        let _ = Mode::Idle;
        let _ = Mode::Run;

        assert!(<[u16; 4]>::IS_ATOMIC);
        assert!(!<[String; 2]>::IS_ATOMIC);
        assert!(<[u16; 8]>::IS_LARGE);

        let void = TypeInfo::of::<()>();
        assert_eq!(void.size_of, 0);
        assert!(!void.is_complex && !void.is_atomic && !void.is_pointer);
    }

    #[test]
    fn copy_strategies_agree() {
        let atomic = [1u32, 2, 3, 4];
        let mut dst = [0u32; 4];
        let mut written = 0;
        unsafe {
            clone_into_uninit(atomic.as_ptr(), dst.as_mut_ptr(), 4, &mut written);
        }
        assert_eq!(written, 4);
        assert_eq!(dst, atomic);

        let complex = [Box::new(1u32), Box::new(2), Box::new(3)];
        let mut dst: [mem::MaybeUninit<Box<u32>>; 3] = [
            mem::MaybeUninit::uninit(),
            mem::MaybeUninit::uninit(),
            mem::MaybeUninit::uninit(),
        ];
        let mut written = 0;
        unsafe {
            clone_into_uninit(complex.as_ptr(), dst.as_mut_ptr() as *mut Box<u32>, 3, &mut written);
        }
        assert_eq!(written, 3);
        let copied: Vec<Box<u32>> = dst.into_iter().map(|item| unsafe { item.assume_init() }).collect();
        assert_eq!(copied, complex.to_vec());
        assert!(!ptr::eq(&*copied[0], &*complex[0]));

        assert_eq!(duplicate(&7u8), 7);
        assert_eq!(duplicate(&Named { name: "a".into() }), Named { name: "a".into() });
    }
}
