//! Epoch Registry
//!
//! One generation counter per trusted service. A capability is valid only
//! while the epoch stamped into it equals its service's counter here, so
//! storing a new value revokes every outstanding capability of that service
//! at once. No capability table is walked or written.
//!
//! # Lifecycle
//! - 0 at boot: the service is unregistered and owns no valid capability
//! - registration moves it to 1
//! - the resource authority bumps it to revoke
//!
//! Epochs only move forward. A service can never return to 0, so
//! registering it again cannot resurrect capabilities revoked earlier.
//!
//! Stores use Release and loads use Acquire so a bump on one core is seen
//! by the next validity check on any core without a read-side lock.
//! Wraparound is a design limit, not handled.

use core::sync::atomic::{AtomicU32, Ordering};

use super::capability::{Epoch, ServiceId};
use crate::config::MAX_SERVICES;
use crate::error::{KernelError, KernelResult};

/// Epoch of a service that has never been registered.
pub const UNREGISTERED: Epoch = 0;

/// Process-wide table of service generations.
pub struct EpochRegistry {
    epochs: [AtomicU32; MAX_SERVICES],
}

impl EpochRegistry {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU32 = AtomicU32::new(UNREGISTERED);
        Self {
            epochs: [ZERO; MAX_SERVICES],
        }
    }

    /// Number of services tracked.
    #[inline]
    pub const fn capacity(&self) -> usize {
        MAX_SERVICES
    }

    /// Current epoch of `service`, or None if out of range.
    #[inline]
    pub fn current(&self, service: ServiceId) -> Option<Epoch> {
        self.epochs
            .get(service.index())
            .map(|e| e.load(Ordering::Acquire))
    }

    /// True if `epoch` is the live generation of a registered `service`.
    #[inline]
    pub fn is_current(&self, service: ServiceId, epoch: Epoch) -> bool {
        match self.current(service) {
            Some(current) => current != UNREGISTERED && current == epoch,
            None => false,
        }
    }

    /// Move `service` out of the unregistered state.
    ///
    /// Returns the epoch the service now runs under. Registering an already
    /// registered service leaves its epoch untouched.
    pub fn register(&self, service: ServiceId) -> KernelResult<Epoch> {
        let slot = self
            .epochs
            .get(service.index())
            .ok_or(KernelError::InvalidArgument)?;
        match slot.compare_exchange(UNREGISTERED, 1, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(1),
            Err(current) => Ok(current),
        }
    }

    /// Publish a new epoch for `service` and return the previous one.
    ///
    /// `epoch` must be greater than the current value; anything else is
    /// `InvalidArgument` and leaves the registry untouched. The privilege
    /// check belongs to the caller.
    pub fn store(&self, service: ServiceId, epoch: Epoch) -> KernelResult<Epoch> {
        let slot = self
            .epochs
            .get(service.index())
            .ok_or(KernelError::InvalidArgument)?;
        slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (epoch > current).then_some(epoch)
        })
        .map_err(|_| KernelError::InvalidArgument)
    }
}

impl Default for EpochRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EpochRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registered = self
            .epochs
            .iter()
            .filter(|e| e.load(Ordering::Relaxed) != UNREGISTERED)
            .count();
        f.debug_struct("EpochRegistry")
            .field("registered", &registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_state_is_unregistered() {
        let reg = EpochRegistry::new();
        assert_eq!(reg.current(ServiceId::new(0)), Some(UNREGISTERED));
        assert!(!reg.is_current(ServiceId::new(0), 0));
    }

    #[test]
    fn test_register_once() {
        let reg = EpochRegistry::new();
        assert_eq!(reg.register(ServiceId::new(4)), Ok(1));
        reg.store(ServiceId::new(4), 5).unwrap();
        assert_eq!(reg.register(ServiceId::new(4)), Ok(5));
    }

    #[test]
    fn test_store_revokes_old_epoch() {
        let reg = EpochRegistry::new();
        let svc = ServiceId::new(2);
        reg.register(svc).unwrap();
        assert!(reg.is_current(svc, 1));
        assert_eq!(reg.store(svc, 2), Ok(1));
        assert!(!reg.is_current(svc, 1));
        assert!(reg.is_current(svc, 2));
    }

    #[test]
    fn test_store_never_moves_backwards() {
        let reg = EpochRegistry::new();
        let svc = ServiceId::new(6);
        reg.register(svc).unwrap();
        reg.store(svc, 3).unwrap();
        assert_eq!(reg.store(svc, 3), Err(KernelError::InvalidArgument));
        assert_eq!(reg.store(svc, 2), Err(KernelError::InvalidArgument));
        assert_eq!(reg.store(svc, UNREGISTERED), Err(KernelError::InvalidArgument));
        assert_eq!(reg.current(svc), Some(3));
        assert_eq!(reg.register(svc), Ok(3));
        assert!(!reg.is_current(svc, 1));
    }

    #[test]
    fn test_out_of_range() {
        let reg = EpochRegistry::new();
        let bad = ServiceId::new(MAX_SERVICES as u32);
        assert_eq!(reg.current(bad), None);
        assert_eq!(reg.store(bad, 1), Err(KernelError::InvalidArgument));
        assert!(!reg.is_current(ServiceId::INVALID, 0));
    }
}
