//! Batched asynchronous send
//!
//! A process installs a table of messages in one call. Each entry whose
//! destination is already waiting is delivered on the spot; the rest stay
//! pending and are picked up by the destination's next `receive`. The
//! sender never blocks.
//!
//! The destination keeps only a set of sender slots with something
//! pending for it; the messages themselves stay in the sender's table.

use alloc::vec::Vec;

use bitflags::bitflags;

use super::message::Message;
use crate::config::MAX_ASYNC_ENTRIES;
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::proc::{Endpoint, SourceFilter};
use crate::security::Zeroize;

bitflags! {
    /// Per-entry options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AsyncFlags: u32 {
        /// Notify the sender from `ASYNCM` once a deferred entry is delivered.
        const NOTIFY = 1 << 0;
    }
}

/// Outcome of one entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AsyncStatus {
    Pending,
    Delivered,
    Failed(KernelError),
    Cancelled,
}

/// One message as supplied by the caller.
#[derive(Clone, Copy, Debug)]
pub struct AsyncMessage {
    pub dest: Endpoint,
    pub msg: Message,
    pub flags: AsyncFlags,
}

impl AsyncMessage {
    pub fn new(dest: Endpoint, msg: Message) -> Self {
        Self {
            dest,
            msg,
            flags: AsyncFlags::empty(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct AsyncEntry {
    pub dest: Endpoint,
    pub msg: Message,
    pub flags: AsyncFlags,
    pub status: AsyncStatus,
}

impl Kernel {
    /// Install `table` as the caller's asynchronous send table.
    ///
    /// Entries still pending from a previous table are cancelled. Returns
    /// how many entries were delivered immediately.
    pub fn senda(&mut self, caller: Endpoint, table: Vec<AsyncMessage>) -> KernelResult<usize> {
        if table.len() > MAX_ASYNC_ENTRIES {
            return Err(KernelError::InvalidArgument);
        }
        let src = self.procs.resolve(caller)?;
        self.procs.at_mut(src)?.ipc.accounting.async_calls += 1;
        self.retire_async_table(src)?;

        let mut entries = Vec::with_capacity(table.len());
        let mut delivered = 0;
        for item in table {
            let mut msg = item.msg;
            msg.source = caller;
            let status = match self.procs.resolve(item.dest) {
                Err(e) => AsyncStatus::Failed(e),
                Ok(dst) if dst == src => AsyncStatus::Failed(KernelError::Deadlock),
                Ok(dst) => {
                    let ipc = &self.procs.at(dst)?.ipc;
                    if ipc.will_receive(caller) {
                        self.deliver(dst, msg)?;
                        delivered += 1;
                        AsyncStatus::Delivered
                    } else {
                        self.procs.at_mut(dst)?.ipc.async_pending.insert(src);
                        AsyncStatus::Pending
                    }
                }
            };
            entries.push(AsyncEntry {
                dest: item.dest,
                msg,
                flags: item.flags,
                status,
            });
        }

        log::trace!(
            "{:?} senda: {} entries, {} delivered",
            caller,
            entries.len(),
            delivered
        );
        self.procs.at_mut(src)?.ipc.async_table = entries;
        Ok(delivered)
    }

    /// Cancel entry `index` of the caller's table if it is still pending.
    pub fn cancel_async(&mut self, caller: Endpoint, index: usize) -> KernelResult<()> {
        let src = self.procs.resolve(caller)?;
        let entry = self
            .procs
            .at_mut(src)?
            .ipc
            .async_table
            .get_mut(index)
            .ok_or(KernelError::InvalidArgument)?;
        if entry.status != AsyncStatus::Pending {
            return Err(KernelError::InvalidArgument);
        }
        entry.status = AsyncStatus::Cancelled;
        entry.msg.zeroize();
        let dest = entry.dest;

        self.unmark_async(src, dest)?;
        log::trace!("{:?} cancelled async entry {}", caller, index);
        Ok(())
    }

    /// Per-entry outcome of the caller's current table.
    pub fn async_status(&self, caller: Endpoint) -> KernelResult<Vec<AsyncStatus>> {
        Ok(self
            .procs
            .get(caller)?
            .ipc
            .async_table
            .iter()
            .map(|e| e.status)
            .collect())
    }

    /// Take the first deferred message for `me` accepted by `filter`.
    pub(crate) fn try_async(
        &mut self,
        me: usize,
        filter: SourceFilter,
    ) -> KernelResult<Option<Message>> {
        let me_ep = self.procs.at(me)?.endpoint;
        let senders: Vec<usize> = self.procs.at(me)?.ipc.async_pending.iter().copied().collect();

        for s in senders {
            let sender = self.procs.at_mut(s)?;
            if !filter.matches(sender.endpoint) {
                continue;
            }
            let found = sender
                .ipc
                .async_table
                .iter()
                .position(|e| e.status == AsyncStatus::Pending && e.dest == me_ep);
            let Some(i) = found else {
                self.procs.at_mut(me)?.ipc.async_pending.remove(&s);
                continue;
            };

            let entry = &mut sender.ipc.async_table[i];
            entry.status = AsyncStatus::Delivered;
            let msg = entry.msg;
            let notify = entry.flags.contains(AsyncFlags::NOTIFY);

            self.unmark_async(s, me_ep)?;
            if notify {
                self.post_notification(s, Endpoint::ASYNCM, i as u64)?;
            }
            return Ok(Some(msg));
        }
        Ok(None)
    }

    /// Drop `dest`'s marker for `src` if nothing else is pending for it.
    fn unmark_async(&mut self, src: usize, dest: Endpoint) -> KernelResult<()> {
        let still_pending = self
            .procs
            .at(src)?
            .ipc
            .async_table
            .iter()
            .any(|e| e.status == AsyncStatus::Pending && e.dest == dest);
        if !still_pending {
            if let Ok(dst) = self.procs.get_mut(dest) {
                dst.ipc.async_pending.remove(&src);
            }
        }
        Ok(())
    }

    /// Cancel every pending entry of `src`'s table and clear its markers.
    pub(crate) fn retire_async_table(&mut self, src: usize) -> KernelResult<usize> {
        let table = core::mem::take(&mut self.procs.at_mut(src)?.ipc.async_table);
        let mut cancelled = 0;
        for entry in table.iter().filter(|e| e.status == AsyncStatus::Pending) {
            if let Ok(dst) = self.procs.get_mut(entry.dest) {
                dst.ipc.async_pending.remove(&src);
            }
            cancelled += 1;
        }
        Ok(cancelled)
    }

    /// Fail every entry addressed to `dead` that is still pending.
    pub(crate) fn fail_async_to(&mut self, dead: usize) -> KernelResult<()> {
        let dead_ep = self.procs.at(dead)?.endpoint;
        let senders = core::mem::take(&mut self.procs.at_mut(dead)?.ipc.async_pending);
        for s in senders {
            if let Ok(sender) = self.procs.at_mut(s) {
                for e in sender
                    .ipc
                    .async_table
                    .iter_mut()
                    .filter(|e| e.status == AsyncStatus::Pending && e.dest == dead_ep)
                {
                    e.status = AsyncStatus::Failed(KernelError::NoSuchProcess);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KernelConfig, USER_QUEUE};
    use crate::ipc::IpcFlags;
    use alloc::vec;

    fn kernel() -> (Kernel, Endpoint, Endpoint, Endpoint) {
        let mut k = Kernel::new(KernelConfig::default()).unwrap();
        let a = k.spawn("a", USER_QUEUE).unwrap();
        let b = k.spawn("b", USER_QUEUE).unwrap();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        (k, a, b, c)
    }

    #[test]
    fn test_immediate_and_deferred_delivery() {
        let (mut k, a, b, c) = kernel();
        k.receive(b, SourceFilter::Any, IpcFlags::empty()).unwrap();
        let n = k
            .senda(
                a,
                vec![
                    AsyncMessage::new(b, Message::empty(1)),
                    AsyncMessage::new(c, Message::empty(2)),
                ],
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            k.async_status(a).unwrap(),
            [AsyncStatus::Delivered, AsyncStatus::Pending]
        );
        assert_eq!(k.take_message(b).unwrap().unwrap().source, a);

        // sender is not blocked
        assert!(k.is_ready(a));

        let got = k.receive(c, SourceFilter::Any, IpcFlags::empty()).unwrap();
        let got = got.message().unwrap();
        assert_eq!((got.source, got.m_type), (a, 2));
        assert_eq!(k.async_status(a).unwrap()[1], AsyncStatus::Delivered);
        assert!(k.process(c).unwrap().ipc().async_pending.is_empty());
    }

    #[test]
    fn test_bad_destination_fails_entry_only() {
        let (mut k, a, b, _) = kernel();
        let bogus = Endpoint::new(200, 3);
        k.senda(
            a,
            vec![
                AsyncMessage::new(bogus, Message::empty(1)),
                AsyncMessage::new(a, Message::empty(1)),
                AsyncMessage::new(b, Message::empty(1)),
            ],
        )
        .unwrap();
        assert_eq!(
            k.async_status(a).unwrap(),
            [
                AsyncStatus::Failed(KernelError::NoSuchProcess),
                AsyncStatus::Failed(KernelError::Deadlock),
                AsyncStatus::Pending,
            ]
        );
    }

    #[test]
    fn test_cancel_pending_entry() {
        let (mut k, a, b, _) = kernel();
        k.senda(a, vec![AsyncMessage::new(b, Message::new(1, [7; 6]))])
            .unwrap();
        k.cancel_async(a, 0).unwrap();
        assert_eq!(k.async_status(a).unwrap(), [AsyncStatus::Cancelled]);
        assert_eq!(k.cancel_async(a, 0), Err(KernelError::InvalidArgument));
        assert_eq!(k.cancel_async(a, 5), Err(KernelError::InvalidArgument));
        assert_eq!(
            k.receive(b, SourceFilter::Any, IpcFlags::NON_BLOCKING),
            Err(KernelError::WouldBlock)
        );
    }

    #[test]
    fn test_notify_flag_reports_delivery() {
        let (mut k, a, b, _) = kernel();
        let mut entry = AsyncMessage::new(b, Message::empty(1));
        entry.flags = AsyncFlags::NOTIFY;
        k.senda(a, vec![entry]).unwrap();
        k.receive(b, SourceFilter::Any, IpcFlags::empty()).unwrap();

        let n = k
            .receive(a, SourceFilter::From(Endpoint::ASYNCM), IpcFlags::empty())
            .unwrap()
            .message()
            .unwrap();
        assert_eq!(n.source, Endpoint::ASYNCM);
        assert_eq!(n.notify_info().unwrap().badge, 0);
    }

    #[test]
    fn test_new_table_cancels_old_pending() {
        let (mut k, a, b, c) = kernel();
        k.senda(a, vec![AsyncMessage::new(b, Message::empty(1))])
            .unwrap();
        k.senda(a, vec![AsyncMessage::new(c, Message::empty(2))])
            .unwrap();
        assert!(k.process(b).unwrap().ipc().async_pending.is_empty());
        assert_eq!(
            k.receive(b, SourceFilter::Any, IpcFlags::NON_BLOCKING),
            Err(KernelError::WouldBlock)
        );
    }

    #[test]
    fn test_oversized_table_rejected() {
        let (mut k, a, b, _) = kernel();
        let table = vec![AsyncMessage::new(b, Message::empty(0)); MAX_ASYNC_ENTRIES + 1];
        assert_eq!(k.senda(a, table), Err(KernelError::InvalidArgument));
        assert_eq!(k.process(a).unwrap().ipc().accounting().async_calls, 0);
    }
}
