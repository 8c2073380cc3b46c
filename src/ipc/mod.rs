//! Inter-Process Communication
//!
//! Synchronous rendezvous, notifications, batched asynchronous send and the
//! capability-gated fast path. Every operation is a method on
//! [`Kernel`](crate::kernel::Kernel).
//!
//! # Submodules
//! - `message`: the fixed-size message buffer
//! - `notify`: per-process pending-notification set
//! - `state`: per-process IPC state and call outcomes
//! - `deadlock`: cycle detection before blocking
//! - `rendezvous`: send, receive, send-receive, notify
//! - `asyn`: batched asynchronous send
//! - `fastpath`: send through a capability

mod asyn;
mod deadlock;
mod fastpath;
mod message;
mod notify;
mod rendezvous;
mod state;

pub use asyn::{AsyncFlags, AsyncMessage, AsyncStatus};
pub use message::{Message, MessageBody, NotifyInfo, NotifySet, MESSAGE_WORDS, NOTIFY_MESSAGE};
pub use notify::PendingNotifications;
pub use state::{IpcAccounting, IpcFlags, IpcOutcome, IpcState, ProcState};
