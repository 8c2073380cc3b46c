//! Kernel Configuration
//!
//! Compile-time limits and the boot-time configuration injected into the
//! [`Kernel`](crate::kernel::Kernel) context.
//!
//! # Design
//! - Constants size the fixed arrays (registry, pending set, run queues)
//! - `KernelConfig` carries the values a boot image may choose, including
//!   the identity of the resource authority

use crate::error::{KernelError, KernelResult};
use crate::proc::Endpoint;

/// Number of slots in a freshly created capability table.
/// Must be a power of two.
pub const DEFAULT_CAP_TABLE_SIZE: usize = 64;

/// Number of trusted services the epoch registry can track.
pub const MAX_SERVICES: usize = 32;

/// Capacity of each process's pending-notification set.
pub const MAX_PENDING_NOTIFICATIONS: usize = 8;

/// Number of scheduling queues. Queue 0 has the highest priority,
/// the last queue belongs to the idle process.
pub const NR_SCHED_QUEUES: usize = 16;

/// Queue of the idle process.
pub const IDLE_QUEUE: u8 = (NR_SCHED_QUEUES - 1) as u8;

/// Default user-process priority.
pub const USER_QUEUE: u8 = 7;

/// Ticks in a fresh quantum.
pub const DEFAULT_QUANTUM_TICKS: u32 = 8;

/// Upper bound on simultaneously live processes (endpoint slot space).
pub const MAX_PROCS: usize = 256;

/// Upper bound on the entries in one batched asynchronous send.
pub const MAX_ASYNC_ENTRIES: usize = 16 * MAX_PROCS;

/// Boot-time kernel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Slots per process capability table (power of two).
    pub cap_table_size: usize,
    /// Pending notifications kept per process.
    pub pending_capacity: usize,
    /// Process arena size.
    pub max_procs: usize,
    /// Quantum handed to processes that do not ask for one.
    pub default_quantum: u32,
    /// The single process allowed to bump epochs and bind services.
    /// `None` until the authority has been spawned.
    pub resource_authority: Option<Endpoint>,
}

impl KernelConfig {
    /// Check the invariants the rest of the kernel relies on.
    pub fn validate(&self) -> KernelResult<()> {
        if self.cap_table_size == 0 || !self.cap_table_size.is_power_of_two() {
            return Err(KernelError::InvalidArgument);
        }
        if self.pending_capacity == 0 || self.pending_capacity > MAX_PENDING_NOTIFICATIONS {
            return Err(KernelError::InvalidArgument);
        }
        if self.max_procs < 2 || self.max_procs > MAX_PROCS {
            return Err(KernelError::InvalidArgument);
        }
        if self.default_quantum == 0 {
            return Err(KernelError::InvalidArgument);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cap_table_size: DEFAULT_CAP_TABLE_SIZE,
            pending_capacity: MAX_PENDING_NOTIFICATIONS,
            max_procs: MAX_PROCS,
            default_quantum: DEFAULT_QUANTUM_TICKS,
            resource_authority: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two_table() {
        let cfg = KernelConfig {
            cap_table_size: 48,
            ..KernelConfig::default()
        };
        assert_eq!(cfg.validate(), Err(KernelError::InvalidArgument));
    }

    #[test]
    fn test_rejects_oversized_pending_set() {
        let cfg = KernelConfig {
            pending_capacity: MAX_PENDING_NOTIFICATIONS + 1,
            ..KernelConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
