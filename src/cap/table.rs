//! Capability Table
//!
//! A per-process, fixed-size array of capability slots managed as a slot map.
//!
//! # Design
//! - Slots are handed out from a stack of free indices (`free_list`)
//! - `free_head` counts the free indices; it never exceeds the table size
//! - Each slot carries a generation bumped on free, so a `CapHandle`
//!   taken before a free can never reach the slot's next occupant
//! - Every index is either on the free stack or allocated, never both
//!
//! The table never consults the epoch registry when storing: callers stamp
//! the template's epoch. Only [`CapTable::is_valid_for_ipc`] reads it.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::capability::{CapHandle, Capability};
use super::epoch::EpochRegistry;
use crate::error::{KernelError, KernelResult};
use crate::security::Zeroize;
use crate::sync::IrqSpinLock;

struct TableInner {
    caps: Box<[Capability]>,
    generations: Box<[u32]>,
    allocated: Box<[bool]>,
    free_list: Box<[u32]>,
}

/// Capability table owned by exactly one process.
pub struct CapTable {
    size: usize,
    free_head: AtomicUsize,
    inner: IrqSpinLock<TableInner>,
}

impl CapTable {
    /// Create a table with `size` empty slots.
    ///
    /// # Panics
    /// If `size` is zero or not a power of two. This is a caller contract,
    /// not a runtime error.
    pub fn new(size: usize) -> Self {
        assert!(
            size != 0 && size.is_power_of_two(),
            "capability table size must be a nonzero power of two, got {}",
            size
        );
        assert!(size <= u32::MAX as usize);

        let free_list: Vec<u32> = (0..size as u32).collect();
        Self {
            size,
            free_head: AtomicUsize::new(size),
            inner: IrqSpinLock::new(TableInner {
                caps: vec![Capability::null(); size].into_boxed_slice(),
                generations: vec![0u32; size].into_boxed_slice(),
                allocated: vec![false; size].into_boxed_slice(),
                free_list: free_list.into_boxed_slice(),
            }),
        }
    }

    /// Number of slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of unallocated slots.
    #[inline]
    pub fn available(&self) -> usize {
        self.free_head.load(Ordering::Acquire)
    }

    /// Number of allocated slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.size - self.available()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `template` in a free slot and return its index.
    pub fn alloc(&self, template: Capability) -> KernelResult<u32> {
        self.alloc_handle(template).map(|h| h.index)
    }

    /// Store `template` in a free slot and return a generation-checked handle.
    pub fn alloc_handle(&self, template: Capability) -> KernelResult<CapHandle> {
        if template.is_null() {
            return Err(KernelError::InvalidArgument);
        }

        let mut inner = self.inner.lock();
        let head = self.free_head.load(Ordering::Relaxed);
        if head == 0 {
            return Err(KernelError::OutOfCapacity);
        }

        let index = inner.free_list[head - 1];
        let slot = index as usize;
        if inner.allocated[slot] {
            log::error!("cap table: free list hands out live slot {}", index);
            return Err(KernelError::InternalInvariantViolation);
        }

        inner.caps[slot] = template;
        inner.allocated[slot] = true;
        self.free_head.store(head - 1, Ordering::Release);

        Ok(CapHandle {
            index,
            generation: inner.generations[slot],
        })
    }

    /// Return slot `index` to the free stack and scrub it.
    pub fn free(&self, index: u32) -> KernelResult<()> {
        let slot = index as usize;
        if slot >= self.size {
            return Err(KernelError::InvalidArgument);
        }

        let mut inner = self.inner.lock();
        if !inner.allocated[slot] {
            return Err(KernelError::InvalidArgument);
        }

        let head = self.free_head.load(Ordering::Relaxed);
        if head >= self.size {
            log::error!("cap table: free list overfull while freeing slot {}", index);
            return Err(KernelError::InternalInvariantViolation);
        }

        inner.free_list[head] = index;
        inner.allocated[slot] = false;
        inner.caps[slot].zeroize();
        let generation = inner.generations[slot].wrapping_add(1);
        inner.generations[slot] = generation;
        self.free_head.store(head + 1, Ordering::Release);
        Ok(())
    }

    /// Free the slot named by `handle`, rejecting stale handles.
    pub fn free_handle(&self, handle: CapHandle) -> KernelResult<()> {
        self.check_handle(handle)?;
        self.free(handle.index)
    }

    /// O(1) read of slot `index`, taken under the table lock so it never
    /// observes a slot halfway through `alloc` or `free`.
    ///
    /// Returns None for out-of-range or unallocated slots. A returned
    /// capability is NOT thereby authorized; IPC callers must go through
    /// [`CapTable::is_valid_for_ipc`].
    pub fn lookup(&self, index: u32) -> Option<Capability> {
        let slot = index as usize;
        if slot >= self.size {
            return None;
        }
        let inner = self.inner.lock();
        if inner.allocated[slot] {
            Some(inner.caps[slot])
        } else {
            None
        }
    }

    /// Read through a slot-map handle.
    pub fn lookup_handle(&self, handle: CapHandle) -> KernelResult<Capability> {
        self.check_handle(handle)?;
        self.lookup(handle.index).ok_or(KernelError::InvalidArgument)
    }

    /// The only authorization primitive the IPC path trusts: the slot is
    /// allocated, its service is in registry range, and its stamped epoch
    /// equals the service's current epoch.
    pub fn is_valid_for_ipc(&self, index: u32, registry: &EpochRegistry) -> bool {
        match self.lookup(index) {
            Some(cap) => registry.is_current(cap.service_id(), cap.epoch()),
            None => false,
        }
    }

    /// Free every allocated slot. Returns how many were released.
    pub fn clear(&self) -> usize {
        let live: Vec<u32> = {
            let inner = self.inner.lock();
            (0..self.size as u32)
                .filter(|&i| inner.allocated[i as usize])
                .collect()
        };
        live.into_iter().filter(|&i| self.free(i).is_ok()).count()
    }

    /// Current generation of slot `index`.
    pub fn generation(&self, index: u32) -> Option<u32> {
        let slot = index as usize;
        if slot >= self.size {
            return None;
        }
        Some(self.inner.lock().generations[slot])
    }

    fn check_handle(&self, handle: CapHandle) -> KernelResult<()> {
        match self.generation(handle.index) {
            Some(current) if current == handle.generation => Ok(()),
            _ => Err(KernelError::InvalidArgument),
        }
    }
}

impl core::fmt::Debug for CapTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CapTable")
            .field("size", &self.size)
            .field("available", &self.available())
            .finish()
    }
}
