//! Interrupt-Safe Spinlock
//!
//! Every mutation of a capability table or run queue happens inside a
//! critical section: local interrupts off, then the spinlock held.
//! The guard undoes both on drop, so early returns and error paths cannot
//! leave a lock behind.
//!
//! Interrupt masking is modelled as a per-core nesting depth. The hosted
//! build has no interrupt controller, so the depth is the whole state.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::{Mutex, MutexGuard};

/// Nesting depth of interrupt-disabled sections on this core.
static IRQ_DISABLE_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Disable local interrupts.
#[inline]
fn irq_disable() {
    IRQ_DISABLE_DEPTH.fetch_add(1, Ordering::Acquire);
}

/// Undo one [`irq_disable`]; interrupts come back at depth zero.
#[inline]
fn irq_restore() {
    IRQ_DISABLE_DEPTH.fetch_sub(1, Ordering::Release);
}

/// Spinlock that also masks local interrupts while held.
pub struct IrqSpinLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqSpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(data),
        }
    }

    /// Enter the critical section.
    pub fn lock(&self) -> IrqGuard<'_, T> {
        irq_disable();
        IrqGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
        }
    }

    /// Enter the critical section only if the lock is free.
    pub fn try_lock(&self) -> Option<IrqGuard<'_, T>> {
        irq_disable();
        match self.inner.try_lock() {
            Some(guard) => Some(IrqGuard {
                guard: ManuallyDrop::new(guard),
            }),
            None => {
                irq_restore();
                None
            }
        }
    }

    /// Mutable access without locking; `&mut self` proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

/// Proof that interrupts are disabled and the lock is held.
pub struct IrqGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
}

impl<T> Deref for IrqGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for IrqGuard<'_, T> {
    fn drop(&mut self) {
        // Unlock first, interrupts back on last.
        // SAFETY: the guard is dropped exactly once, here.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        irq_restore();
    }
}
