//! exocore - capability and IPC core of a library-OS microkernel
//!
//! Untrusted library operating systems build their services in user space
//! on top of two kernel mechanisms kept here:
//! - Per-process capability tables with epoch-based mass revocation
//! - Rendezvous message passing with notifications, batched asynchronous
//!   send and a capability-gated fast path
//!
//! # Security Features
//! - A capability is re-validated against its service epoch on every use
//! - One atomic store revokes every capability a service ever issued
//! - Only the resource authority may bump epochs or bind service identities
//! - Freed capability slots are scrubbed and their handles go stale
//!
//! # Architecture
//! - [`kernel::Kernel`] owns all state; every entry point is a method on it
//! - [`syscall::dispatch`] maps call numbers to those methods
//! - Critical sections mask interrupts through [`sync::IrqSpinLock`]

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod cap;
pub mod config;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod proc;
pub mod sched;
pub mod security;
pub mod sync;
pub mod syscall;

pub use cap::{CapHandle, CapTable, Capability, Epoch, EpochRegistry, Permissions, ServiceId};
pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use ipc::{IpcFlags, IpcOutcome, Message, ProcState};
pub use kernel::{AccessPolicy, AllowAll, Kernel, Operation};
pub use proc::{Endpoint, SourceFilter};
