//! Process Arena
//!
//! Processes live in a fixed number of slots. Every cross-process link the
//! IPC core keeps (sender queues, async markers, blocked-on targets) is a
//! slot index into this arena, never a reference.
//!
//! # Design
//! - Each slot carries a generation that is bumped when its process is
//!   removed, so endpoints naming the old occupant stop resolving

use alloc::vec::Vec;

use super::endpoint::Endpoint;
use super::process::Process;
use crate::error::{KernelError, KernelResult};

#[derive(Debug)]
pub struct ProcessTable {
    slots: Vec<Option<Process>>,
    generations: Vec<u16>,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            generations: alloc::vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place a new process in the lowest free slot.
    ///
    /// `build` receives the endpoint the process will be known by.
    pub fn insert<F>(&mut self, build: F) -> KernelResult<Endpoint>
    where
        F: FnOnce(Endpoint) -> Process,
    {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(KernelError::OutOfCapacity)?;
        let ep = Endpoint::new(slot, self.generations[slot]);
        self.slots[slot] = Some(build(ep));
        Ok(ep)
    }

    /// Slot of the live process named by `ep`.
    pub fn resolve(&self, ep: Endpoint) -> KernelResult<usize> {
        if ep.is_kernel_source() {
            return Err(KernelError::NoSuchProcess);
        }
        let slot = ep.slot();
        match self.slots.get(slot) {
            Some(Some(p)) if p.endpoint == ep => Ok(slot),
            _ => Err(KernelError::NoSuchProcess),
        }
    }

    pub fn get(&self, ep: Endpoint) -> KernelResult<&Process> {
        let slot = self.resolve(ep)?;
        self.at(slot)
    }

    pub fn get_mut(&mut self, ep: Endpoint) -> KernelResult<&mut Process> {
        let slot = self.resolve(ep)?;
        self.at_mut(slot)
    }

    /// Process in `slot`.
    pub fn at(&self, slot: usize) -> KernelResult<&Process> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(KernelError::NoSuchProcess)
    }

    pub fn at_mut(&mut self, slot: usize) -> KernelResult<&mut Process> {
        self.slots
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(KernelError::NoSuchProcess)
    }

    /// Take the process out of the arena and retire its endpoint.
    pub fn remove(&mut self, slot: usize) -> KernelResult<Process> {
        let proc = self
            .slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(KernelError::NoSuchProcess)?;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        Ok(proc)
    }

    /// Live processes with their slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Process)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Process)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, p)| p.as_mut().map(|p| (i, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::SchedParams;

    fn build(ep: Endpoint) -> Process {
        Process::new(ep, "t", 4, 2, SchedParams::new(7, 4))
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut t = ProcessTable::new(4);
        let a = t.insert(build).unwrap();
        let b = t.insert(build).unwrap();
        assert_eq!(t.resolve(a), Ok(0));
        assert_eq!(t.resolve(b), Ok(1));
        assert_eq!(t.get(b).unwrap().endpoint(), b);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_full_arena() {
        let mut t = ProcessTable::new(1);
        t.insert(build).unwrap();
        assert_eq!(t.insert(build), Err(KernelError::OutOfCapacity));
    }

    #[test]
    fn test_removed_endpoint_stops_resolving() {
        let mut t = ProcessTable::new(2);
        let a = t.insert(build).unwrap();
        t.remove(0).unwrap();
        assert_eq!(t.resolve(a), Err(KernelError::NoSuchProcess));
        let again = t.insert(build).unwrap();
        assert_eq!(again.slot(), a.slot());
        assert_ne!(again, a);
        assert_eq!(t.resolve(a), Err(KernelError::NoSuchProcess));
    }

    #[test]
    fn test_kernel_sources_do_not_resolve() {
        let t = ProcessTable::new(2);
        assert_eq!(t.resolve(Endpoint::HARDWARE), Err(KernelError::NoSuchProcess));
    }
}
