//! Secure Memory Zeroization
//!
//! Wipes kernel records whose contents must not outlive their owner.
//!
//! # Design
//! - `Zeroize` trait for types that can be securely cleared
//! - Volatile writes followed by a compiler fence, so the stores cannot be
//!   elided even when the value is about to be overwritten anyway

use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

/// Trait for types that can be securely zeroed.
///
/// Implementations must overwrite every field in a way that cannot be
/// optimized away.
pub trait Zeroize {
    /// Overwrite this value with zeros.
    fn zeroize(&mut self);
}

macro_rules! impl_zeroize_scalar {
    ($($ty:ty),*) => {
        $(
            impl Zeroize for $ty {
                fn zeroize(&mut self) {
                    // SAFETY: `self` is a valid, aligned, exclusive reference.
                    unsafe {
                        ptr::write_volatile(self, 0);
                    }
                    compiler_fence(Ordering::SeqCst);
                }
            }
        )*
    };
}

impl_zeroize_scalar!(u32, u64, usize);

/// Zeroize implementation for word slices (message payloads).
impl Zeroize for [u64] {
    fn zeroize(&mut self) {
        for word in self.iter_mut() {
            // SAFETY: each element is a valid exclusive reference.
            unsafe {
                ptr::write_volatile(word, 0);
            }
        }
        compiler_fence(Ordering::SeqCst);
    }
}

impl<const N: usize> Zeroize for [u64; N] {
    fn zeroize(&mut self) {
        self.as_mut_slice().zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroize_words() {
        let mut data = [0x4242_4242u64; 6];
        data.zeroize();
        assert!(data.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_zeroize_scalars() {
        let mut a = 7u32;
        let mut b = usize::MAX;
        a.zeroize();
        b.zeroize();
        assert_eq!((a, b), (0, 0));
    }
}
