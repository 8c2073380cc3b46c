//! System Call Interface
//!
//! The entry point user processes reach the kernel through.
//!
//! # Security Model
//! - Whitelist approach: only calls in the dispatch table exist
//! - All register arguments are validated before use
//! - Invalid inputs return errors, never panic
//!
//! # Calls
//! - 1-5: send, receive, sendrec, notify, non-blocking send
//! - 16-17: batched asynchronous send, cancel one entry
//! - 32-34: send through a capability, release, duplicate
//! - 48-50: grant, epoch update, service registration (privileged)

mod handler;
pub mod validate;

pub use handler::{dispatch, numbers, Syscall, SyscallFrame};
