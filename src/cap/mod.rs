//! Capability-Based Security System
//!
//! Per-process capability tables with epoch-based mass revocation.
//!
//! # Design
//! - Each process owns a `CapTable` (slot map of fixed-size capabilities)
//! - Trusted services mint capabilities stamped with their current epoch
//! - The resource authority revokes a service's capabilities by bumping
//!   its epoch in the `EpochRegistry`
//!
//! # Security Properties
//! - Capabilities cannot be forged: only the kernel writes table slots
//! - Rights can only be reduced, never increased
//! - Validity is re-checked against the registry on every IPC use

pub mod capability;
pub mod epoch;
pub mod table;

pub use capability::{CapHandle, Capability, Epoch, Permissions, ServiceId, CACHE_LINE_SIZE};
pub use epoch::{EpochRegistry, UNREGISTERED};
pub use table::CapTable;
