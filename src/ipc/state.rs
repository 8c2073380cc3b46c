//! Per-process IPC state.
//!
//! The send and receive halves are tracked separately because the combined
//! send-receive call can hold both at once: blocked sending, and already
//! committed to receive the reply.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use bitflags::bitflags;

use super::asyn::AsyncEntry;
use super::message::Message;
use super::notify::PendingNotifications;
use crate::error::KernelError;
use crate::proc::{Endpoint, SourceFilter};

bitflags! {
    /// Flags accepted by send and receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IpcFlags: u32 {
        /// Fail with `WouldBlock` instead of suspending.
        const NON_BLOCKING = 1 << 0;
    }
}

/// Result of an IPC call that did not fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IpcOutcome {
    /// Finished inside the call; receives carry the message.
    Completed(Option<Message>),
    /// The caller was parked; completion arrives later in its inbox.
    Blocked,
}

impl IpcOutcome {
    pub fn message(self) -> Option<Message> {
        match self {
            Self::Completed(m) => m,
            Self::Blocked => None,
        }
    }

    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

/// Observable scheduling state of a process.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProcState {
    Runnable,
    /// Blocked sending; also waiting for the reply if it was a send-receive.
    Sending(Endpoint),
    Receiving(SourceFilter),
}

/// An undelivered send parked on the destination's sender queue.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PendingSend {
    /// Arena slot of the destination.
    pub dest: usize,
    pub target: Endpoint,
    pub msg: Message,
}

/// IPC bookkeeping carried by every process.
#[derive(Debug)]
pub struct IpcState {
    pub(crate) sending: Option<PendingSend>,
    pub(crate) receiving: Option<SourceFilter>,
    /// Set while a send-receive waits for its reply; suppresses
    /// notification delivery to this process.
    pub(crate) reply_pending: bool,

    /// Head and tail of the queue of processes blocked sending to us.
    pub(crate) queue_head: Option<usize>,
    pub(crate) queue_tail: Option<usize>,
    /// Our link in the destination's sender queue.
    pub(crate) next_sender: Option<usize>,

    pub(crate) pending: PendingNotifications,
    pub(crate) int_pending: u64,
    pub(crate) sig_pending: u64,

    /// Our batched asynchronous send table.
    pub(crate) async_table: Vec<AsyncEntry>,
    /// Slots of processes with deferred async entries addressed to us.
    pub(crate) async_pending: BTreeSet<usize>,

    /// Message delivered while we were blocked.
    pub(crate) inbox: Option<Message>,
    /// Failure delivered while we were blocked.
    pub(crate) error: Option<KernelError>,

    pub(crate) accounting: IpcAccounting,
}

/// Per-process IPC call counters.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IpcAccounting {
    pub sync_calls: u64,
    pub async_calls: u64,
    pub dropped_notifications: u64,
}

impl IpcState {
    pub fn new(pending_capacity: usize) -> Self {
        Self {
            sending: None,
            receiving: None,
            reply_pending: false,
            queue_head: None,
            queue_tail: None,
            next_sender: None,
            pending: PendingNotifications::new(pending_capacity),
            int_pending: 0,
            sig_pending: 0,
            async_table: Vec::new(),
            async_pending: BTreeSet::new(),
            inbox: None,
            error: None,
            accounting: IpcAccounting::default(),
        }
    }

    /// Neither sending nor receiving.
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.sending.is_none() && self.receiving.is_none()
    }

    /// Ready to accept a message from `source` right now.
    #[inline]
    pub fn will_receive(&self, source: Endpoint) -> bool {
        self.sending.is_none() && self.receiving.is_some_and(|f| f.matches(source))
    }

    pub fn pending_notifications(&self) -> &PendingNotifications {
        &self.pending
    }

    pub fn accounting(&self) -> IpcAccounting {
        self.accounting
    }
}
