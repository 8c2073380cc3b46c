//! Synchronous IPC Core
//!
//! Rendezvous message passing between processes in the arena.
//!
//! # State machine
//! - `send`: a destination already waiting in a matching receive gets the
//!   message copied straight into its inbox and becomes runnable.
//!   Otherwise the sender joins the destination's sender queue and blocks
//! - `receive`: pending notifications first, then deferred asynchronous
//!   messages, then the first queued sender accepted by the filter.
//!   Otherwise the caller blocks
//! - `sendrec`: send, then receive from the same destination. Notification
//!   delivery is held back until the reply arrives
//! - `notify`: never blocks and never fails on capacity. Delivered at once
//!   to an eligible receiver, recorded in its pending set otherwise, and
//!   dropped with a warning when that set is full
//!
//! Only a runnable process may start `send`, `receive` or `sendrec`; a
//! caller that is still parked is refused before anything is touched.
//! A message delivered while blocked stays in the inbox until it is taken,
//! either by `take_message` or by the next `receive`.
//!
//! Calls that fail leave every queue and inbox as they were.

use super::deadlock::{self, CallKind};
use super::message::{Message, NotifyInfo, NotifySet};
use super::state::{IpcFlags, IpcOutcome, PendingSend};
use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::proc::{Endpoint, SourceFilter};

impl Kernel {
    /// Send `msg` to `dest`, blocking unless `NON_BLOCKING` is set.
    pub fn send(
        &mut self,
        caller: Endpoint,
        dest: Endpoint,
        msg: Message,
        flags: IpcFlags,
    ) -> KernelResult<IpcOutcome> {
        let src = self.ipc_caller(caller)?;
        self.procs.at_mut(src)?.ipc.accounting.sync_calls += 1;
        self.mini_send(src, dest, msg, flags)
    }

    /// Receive a message accepted by `filter`.
    pub fn receive(
        &mut self,
        caller: Endpoint,
        filter: SourceFilter,
        flags: IpcFlags,
    ) -> KernelResult<IpcOutcome> {
        let me = self.ipc_caller(caller)?;
        self.procs.at_mut(me)?.ipc.accounting.sync_calls += 1;
        self.mini_receive(me, filter, flags)
    }

    /// Send a request to `dest` and wait for its reply.
    pub fn sendrec(
        &mut self,
        caller: Endpoint,
        dest: Endpoint,
        msg: Message,
    ) -> KernelResult<IpcOutcome> {
        let me = self.ipc_caller(caller)?;
        let ipc = &mut self.procs.at_mut(me)?.ipc;
        if ipc.inbox.is_some() {
            log::warn!("{:?} sendrec with an uncollected message", caller);
            return Err(KernelError::InvalidArgument);
        }
        ipc.accounting.sync_calls += 1;
        ipc.reply_pending = true;

        let result = match self.mini_send(me, dest, msg, IpcFlags::empty()) {
            Ok(IpcOutcome::Blocked) => {
                self.procs.at_mut(me)?.ipc.receiving = Some(SourceFilter::From(dest));
                Ok(IpcOutcome::Blocked)
            }
            Ok(IpcOutcome::Completed(_)) => {
                self.mini_receive(me, SourceFilter::From(dest), IpcFlags::empty())
            }
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.procs.at_mut(me)?.ipc.reply_pending = false;
        }
        result
    }

    /// Post a notification carrying `badge` to `dest`.
    pub fn notify(&mut self, caller: Endpoint, dest: Endpoint, badge: u64) -> KernelResult<()> {
        let src = self.procs.resolve(caller)?;
        let dst = self.procs.resolve(dest)?;
        self.procs.at_mut(src)?.ipc.accounting.sync_calls += 1;
        self.post_notification(dst, caller, badge)
    }

    /// Mark interrupt lines pending for `dest`; delivered from `HARDWARE`.
    pub fn raise_interrupt(&mut self, dest: Endpoint, irq_bits: u64) -> KernelResult<()> {
        let dst = self.procs.resolve(dest)?;
        self.procs.at_mut(dst)?.ipc.int_pending |= irq_bits;
        self.flush_kernel_notification(dst, Endpoint::HARDWARE)
    }

    /// Mark signals pending for `dest`; delivered from `SYSTEM`.
    pub fn raise_signal(&mut self, dest: Endpoint, sig_bits: u64) -> KernelResult<()> {
        let dst = self.procs.resolve(dest)?;
        self.procs.at_mut(dst)?.ipc.sig_pending |= sig_bits;
        self.flush_kernel_notification(dst, Endpoint::SYSTEM)
    }

    /// Slot of `caller`, which must not be parked in another call.
    pub(crate) fn ipc_caller(&self, caller: Endpoint) -> KernelResult<usize> {
        let slot = self.procs.resolve(caller)?;
        if !self.procs.at(slot)?.ipc.is_runnable() {
            log::warn!("{:?} is blocked and cannot start another call", caller);
            return Err(KernelError::InvalidArgument);
        }
        Ok(slot)
    }

    pub(crate) fn mini_send(
        &mut self,
        src: usize,
        dest: Endpoint,
        mut msg: Message,
        flags: IpcFlags,
    ) -> KernelResult<IpcOutcome> {
        let dst = self.procs.resolve(dest)?;
        if dst == src {
            return Err(KernelError::Deadlock);
        }
        let caller = self.procs.at(src)?.endpoint;
        msg.source = caller;

        if self.procs.at(dst)?.ipc.will_receive(caller) {
            self.deliver(dst, msg)?;
            log::trace!("{:?} -> {:?}: rendezvous", caller, dest);
            return Ok(IpcOutcome::Completed(None));
        }

        if flags.contains(IpcFlags::NON_BLOCKING) {
            return Err(KernelError::WouldBlock);
        }

        if let Some(group) = deadlock::detect(&self.procs, src, dst, CallKind::Send) {
            log::warn!("{:?} -> {:?}: would close a cycle of {}", caller, dest, group);
            return Err(KernelError::Deadlock);
        }

        self.procs.at_mut(src)?.ipc.sending = Some(PendingSend {
            dest: dst,
            target: dest,
            msg,
        });
        self.link_sender(dst, src)?;
        self.make_unready(src);
        log::trace!("{:?} -> {:?}: blocked sending", caller, dest);
        Ok(IpcOutcome::Blocked)
    }

    pub(crate) fn mini_receive(
        &mut self,
        me: usize,
        filter: SourceFilter,
        flags: IpcFlags,
    ) -> KernelResult<IpcOutcome> {
        if let SourceFilter::From(ep) = filter {
            if !ep.is_kernel_source() {
                self.procs.resolve(ep)?;
            }
        }

        let ipc = &mut self.procs.at_mut(me)?.ipc;
        if let Some(msg) = ipc.inbox {
            if !filter.matches(msg.source) {
                log::warn!("uncollected message from {:?} not accepted", msg.source);
                return Err(KernelError::InvalidArgument);
            }
            ipc.inbox = None;
            return Ok(IpcOutcome::Completed(Some(msg)));
        }

        if let Some(msg) = self.take_ready_message(me, filter)? {
            self.procs.at_mut(me)?.ipc.reply_pending = false;
            log::trace!("{:?} <- {:?}", self.procs.at(me)?.endpoint, msg.source);
            return Ok(IpcOutcome::Completed(Some(msg)));
        }

        if flags.contains(IpcFlags::NON_BLOCKING) {
            return Err(KernelError::WouldBlock);
        }

        if let SourceFilter::From(ep) = filter {
            if !ep.is_kernel_source() {
                let peer = ep.slot();
                if let Some(group) = deadlock::detect(&self.procs, me, peer, CallKind::Receive) {
                    log::warn!("receive from {:?}: would close a cycle of {}", ep, group);
                    return Err(KernelError::Deadlock);
                }
            }
        }

        self.procs.at_mut(me)?.ipc.receiving = Some(filter);
        self.make_unready(me);
        Ok(IpcOutcome::Blocked)
    }

    /// Hand `msg` to a process waiting in receive and wake it.
    pub(crate) fn deliver(&mut self, dst: usize, msg: Message) -> KernelResult<()> {
        let ipc = &mut self.procs.at_mut(dst)?.ipc;
        ipc.inbox = Some(msg);
        ipc.receiving = None;
        ipc.reply_pending = false;
        self.make_ready(dst);
        Ok(())
    }

    /// Deliver or record a notification. Capacity drops are not errors.
    pub(crate) fn post_notification(
        &mut self,
        dst: usize,
        source: Endpoint,
        badge: u64,
    ) -> KernelResult<()> {
        let ipc = &self.procs.at(dst)?.ipc;
        if ipc.will_receive(source) && !ipc.reply_pending {
            let info = NotifyInfo {
                timestamp: self.clock,
                badge,
                set: NotifySet::None,
            };
            return self.deliver(dst, Message::notification(source, info));
        }

        let proc = self.procs.at_mut(dst)?;
        if !proc.ipc.pending.push(source, badge) {
            proc.ipc.accounting.dropped_notifications += 1;
            log::warn!(
                "pending set of {:?} full, dropped notification from {:?}",
                proc.endpoint,
                source
            );
        }
        Ok(())
    }

    fn flush_kernel_notification(&mut self, dst: usize, source: Endpoint) -> KernelResult<()> {
        let ipc = &self.procs.at(dst)?.ipc;
        if !ipc.will_receive(source) || ipc.reply_pending {
            return Ok(());
        }
        if let Some(msg) = self.take_notification(dst, SourceFilter::From(source))? {
            self.deliver(dst, msg)?;
        }
        Ok(())
    }

    fn take_ready_message(
        &mut self,
        me: usize,
        filter: SourceFilter,
    ) -> KernelResult<Option<Message>> {
        if let Some(msg) = self.take_notification(me, filter)? {
            return Ok(Some(msg));
        }
        if let Some(msg) = self.try_async(me, filter)? {
            return Ok(Some(msg));
        }
        self.take_queued_sender(me, filter)
    }

    /// Oldest notification accepted by `filter`. Kernel sources come first;
    /// nothing is taken while a reply is pending.
    fn take_notification(
        &mut self,
        me: usize,
        filter: SourceFilter,
    ) -> KernelResult<Option<Message>> {
        let now = self.clock;
        let ipc = &mut self.procs.at_mut(me)?.ipc;
        if ipc.reply_pending {
            return Ok(None);
        }

        let kernel_set = if filter.matches(Endpoint::HARDWARE) && ipc.int_pending != 0 {
            Some((
                Endpoint::HARDWARE,
                NotifySet::Interrupts(core::mem::take(&mut ipc.int_pending)),
            ))
        } else if filter.matches(Endpoint::SYSTEM) && ipc.sig_pending != 0 {
            Some((
                Endpoint::SYSTEM,
                NotifySet::Signals(core::mem::take(&mut ipc.sig_pending)),
            ))
        } else {
            None
        };
        if let Some((source, set)) = kernel_set {
            let info = NotifyInfo {
                timestamp: now,
                badge: 0,
                set,
            };
            return Ok(Some(Message::notification(source, info)));
        }

        Ok(ipc.pending.take(filter).map(|(source, badge)| {
            let info = NotifyInfo {
                timestamp: now,
                badge,
                set: NotifySet::None,
            };
            Message::notification(source, info)
        }))
    }

    /// Unqueue the first blocked sender accepted by `filter` and take its
    /// message. The sender wakes unless it still waits for a reply.
    fn take_queued_sender(
        &mut self,
        me: usize,
        filter: SourceFilter,
    ) -> KernelResult<Option<Message>> {
        let mut cursor = self.procs.at(me)?.ipc.queue_head;
        let mut found = None;
        while let Some(s) = cursor {
            let sender = self.procs.at(s)?;
            if filter.matches(sender.endpoint) {
                found = Some(s);
                break;
            }
            cursor = sender.ipc.next_sender;
        }
        let Some(s) = found else {
            return Ok(None);
        };

        self.unlink_sender(me, s)?;
        let sender = self.procs.at_mut(s)?;
        let pending = sender.ipc.sending.take().ok_or_else(|| {
            log::error!("{:?} queued without a pending send", sender.endpoint);
            KernelError::InternalInvariantViolation
        })?;
        if sender.ipc.receiving.is_none() {
            self.make_ready(s);
        }
        Ok(Some(pending.msg))
    }

    /// Append `src` to `dst`'s sender queue.
    pub(crate) fn link_sender(&mut self, dst: usize, src: usize) -> KernelResult<()> {
        let tail = self.procs.at(dst)?.ipc.queue_tail;
        self.procs.at_mut(src)?.ipc.next_sender = None;
        match tail {
            Some(t) => self.procs.at_mut(t)?.ipc.next_sender = Some(src),
            None => self.procs.at_mut(dst)?.ipc.queue_head = Some(src),
        }
        self.procs.at_mut(dst)?.ipc.queue_tail = Some(src);
        Ok(())
    }

    /// Remove `src` from `dst`'s sender queue. Returns false if absent.
    pub(crate) fn unlink_sender(&mut self, dst: usize, src: usize) -> KernelResult<bool> {
        let mut prev: Option<usize> = None;
        let mut cursor = self.procs.at(dst)?.ipc.queue_head;
        while let Some(s) = cursor {
            let next = self.procs.at(s)?.ipc.next_sender;
            if s == src {
                match prev {
                    Some(p) => self.procs.at_mut(p)?.ipc.next_sender = next,
                    None => self.procs.at_mut(dst)?.ipc.queue_head = next,
                }
                let queue = &mut self.procs.at_mut(dst)?.ipc;
                if queue.queue_tail == Some(src) {
                    queue.queue_tail = prev;
                }
                self.procs.at_mut(src)?.ipc.next_sender = None;
                return Ok(true);
            }
            prev = cursor;
            cursor = next;
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KernelConfig, USER_QUEUE};
    use crate::ipc::ProcState;

    fn kernel() -> (Kernel, Endpoint, Endpoint) {
        let mut k = Kernel::new(KernelConfig::default()).unwrap();
        let a = k.spawn("a", USER_QUEUE).unwrap();
        let b = k.spawn("b", USER_QUEUE).unwrap();
        (k, a, b)
    }

    fn msg(tag: u32) -> Message {
        Message::new(tag, [tag as u64; 6])
    }

    #[test]
    fn test_send_to_waiting_receiver() {
        let (mut k, a, b) = kernel();
        assert!(k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap().is_blocked());
        assert!(!k.is_ready(a));
        let out = k.send(b, a, msg(5), IpcFlags::empty()).unwrap();
        assert_eq!(out, IpcOutcome::Completed(None));
        assert!(k.is_ready(a));
        let got = k.take_message(a).unwrap().unwrap();
        assert_eq!(got.source, b);
        assert_eq!(got.m_type, 5);
    }

    #[test]
    fn test_receive_takes_queued_sender() {
        let (mut k, a, b) = kernel();
        assert!(k.send(b, a, msg(6), IpcFlags::empty()).unwrap().is_blocked());
        assert_eq!(k.state(b), Ok(ProcState::Sending(a)));
        let got = k
            .receive(a, SourceFilter::From(b), IpcFlags::empty())
            .unwrap()
            .message()
            .unwrap();
        assert_eq!(got.source, b);
        assert_eq!(k.state(b), Ok(ProcState::Runnable));
        assert!(k.is_ready(b));
    }

    #[test]
    fn test_sender_stamp_cannot_be_forged() {
        let (mut k, a, b) = kernel();
        let mut m = msg(1);
        m.source = Endpoint::HARDWARE;
        k.send(b, a, m, IpcFlags::empty()).unwrap();
        let got = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert_eq!(got.message().unwrap().source, b);
    }

    #[test]
    fn test_non_blocking_send_leaves_no_trace() {
        let (mut k, a, b) = kernel();
        assert_eq!(
            k.send(b, a, msg(1), IpcFlags::NON_BLOCKING),
            Err(KernelError::WouldBlock)
        );
        assert!(k.is_ready(b));
        assert_eq!(
            k.receive(a, SourceFilter::Any, IpcFlags::NON_BLOCKING),
            Err(KernelError::WouldBlock)
        );
    }

    #[test]
    fn test_self_send_is_deadlock() {
        let (mut k, a, _) = kernel();
        assert_eq!(
            k.send(a, a, msg(1), IpcFlags::empty()),
            Err(KernelError::Deadlock)
        );
    }

    #[test]
    fn test_send_to_dead_process() {
        let (mut k, a, b) = kernel();
        k.terminate(a).unwrap();
        assert_eq!(
            k.send(b, a, msg(1), IpcFlags::empty()),
            Err(KernelError::NoSuchProcess)
        );
    }

    #[test]
    fn test_senders_queue_in_order() {
        let (mut k, a, b) = kernel();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        k.send(b, a, msg(1), IpcFlags::empty()).unwrap();
        k.send(c, a, msg(2), IpcFlags::empty()).unwrap();
        let first = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        let second = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert_eq!(first.message().unwrap().source, b);
        assert_eq!(second.message().unwrap().source, c);
    }

    #[test]
    fn test_filtered_receive_skips_other_senders() {
        let (mut k, a, b) = kernel();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        k.send(b, a, msg(1), IpcFlags::empty()).unwrap();
        k.send(c, a, msg(2), IpcFlags::empty()).unwrap();
        let got = k.receive(a, SourceFilter::From(c), IpcFlags::empty()).unwrap();
        assert_eq!(got.message().unwrap().m_type, 2);
        assert_eq!(k.state(b), Ok(ProcState::Sending(a)));
        let got = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert_eq!(got.message().unwrap().m_type, 1);
    }

    #[test]
    fn test_sendrec_round_trip() {
        let (mut k, client, server) = kernel();
        k.receive(server, SourceFilter::Any, IpcFlags::empty()).unwrap();
        let out = k.sendrec(client, server, msg(10)).unwrap();
        assert!(out.is_blocked());
        assert_eq!(k.state(client), Ok(ProcState::Receiving(SourceFilter::From(server))));

        let req = k.take_message(server).unwrap().unwrap();
        assert_eq!(req.m_type, 10);
        k.send(server, client, msg(11), IpcFlags::empty()).unwrap();
        assert_eq!(k.take_message(client).unwrap().unwrap().m_type, 11);
        assert_eq!(k.state(client), Ok(ProcState::Runnable));
    }

    #[test]
    fn test_sendrec_holds_back_notifications() {
        let (mut k, client, server) = kernel();
        let other = k.spawn("other", USER_QUEUE).unwrap();
        k.receive(server, SourceFilter::Any, IpcFlags::empty()).unwrap();
        k.sendrec(client, server, msg(1)).unwrap();
        k.take_message(server).unwrap();

        k.notify(other, client, 3).unwrap();
        assert_eq!(k.process(client).unwrap().ipc().pending_notifications().len(), 1);
        assert!(k.take_message(client).unwrap().is_none());

        k.send(server, client, msg(2), IpcFlags::empty()).unwrap();
        assert_eq!(k.take_message(client).unwrap().unwrap().m_type, 2);
        let n = k.receive(client, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert_eq!(n.message().unwrap().notify_info().unwrap().badge, 3);
    }

    #[test]
    fn test_notify_wakes_receiver() {
        let (mut k, a, b) = kernel();
        k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        k.notify(b, a, 0xbeef).unwrap();
        let m = k.take_message(a).unwrap().unwrap();
        assert!(m.is_notification());
        assert_eq!(m.source, b);
        assert_eq!(m.notify_info().unwrap().badge, 0xbeef);
    }

    #[test]
    fn test_notifications_beat_queued_senders() {
        let (mut k, a, b) = kernel();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        k.send(b, a, msg(1), IpcFlags::empty()).unwrap();
        k.notify(c, a, 1).unwrap();
        let first = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert!(first.message().unwrap().is_notification());
    }

    #[test]
    fn test_interrupt_bits_accumulate() {
        let (mut k, a, _) = kernel();
        k.raise_interrupt(a, 0b01).unwrap();
        k.raise_interrupt(a, 0b10).unwrap();
        let m = k
            .receive(a, SourceFilter::From(Endpoint::HARDWARE), IpcFlags::empty())
            .unwrap()
            .message()
            .unwrap();
        assert_eq!(m.source, Endpoint::HARDWARE);
        assert_eq!(m.notify_info().unwrap().set, NotifySet::Interrupts(0b11));
    }

    #[test]
    fn test_signal_delivered_to_waiting_receiver() {
        let (mut k, a, _) = kernel();
        k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        k.raise_signal(a, 1 << 9).unwrap();
        let m = k.take_message(a).unwrap().unwrap();
        assert_eq!(m.source, Endpoint::SYSTEM);
        assert_eq!(m.notify_info().unwrap().set, NotifySet::Signals(1 << 9));
        assert!(k.is_ready(a));
    }

    #[test]
    fn test_blocked_sender_cannot_send_again() {
        let (mut k, a, b) = kernel();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        let d = k.spawn("d", USER_QUEUE).unwrap();
        k.send(b, a, msg(1), IpcFlags::empty()).unwrap();
        k.send(c, a, msg(2), IpcFlags::empty()).unwrap();

        assert_eq!(
            k.send(b, d, msg(3), IpcFlags::empty()),
            Err(KernelError::InvalidArgument)
        );
        assert_eq!(
            k.receive(b, SourceFilter::Any, IpcFlags::empty()),
            Err(KernelError::InvalidArgument)
        );
        assert_eq!(k.sendrec(b, d, msg(3)), Err(KernelError::InvalidArgument));
        assert_eq!(k.state(b), Ok(ProcState::Sending(a)));

        let first = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        let second = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert_eq!(first.message().unwrap().m_type, 1);
        assert_eq!(second.message().unwrap().m_type, 2);
        assert_eq!(k.state(c), Ok(ProcState::Runnable));
        assert_eq!(
            k.receive(d, SourceFilter::Any, IpcFlags::NON_BLOCKING),
            Err(KernelError::WouldBlock)
        );
    }

    #[test]
    fn test_blocked_receiver_cannot_receive_again() {
        let (mut k, a, b) = kernel();
        k.receive(a, SourceFilter::From(b), IpcFlags::empty()).unwrap();
        assert_eq!(
            k.receive(a, SourceFilter::Any, IpcFlags::empty()),
            Err(KernelError::InvalidArgument)
        );
        assert_eq!(k.state(a), Ok(ProcState::Receiving(SourceFilter::From(b))));
    }

    #[test]
    fn test_uncollected_message_is_kept() {
        let (mut k, a, b) = kernel();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        k.send(b, a, msg(1), IpcFlags::empty()).unwrap();

        let first = k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        assert_eq!(first.message().unwrap().m_type, 1);

        assert!(k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap().is_blocked());
        k.send(c, a, msg(2), IpcFlags::empty()).unwrap();
        assert_eq!(k.take_message(a).unwrap().unwrap().m_type, 2);
        assert!(k.take_message(a).unwrap().is_none());
    }

    #[test]
    fn test_uncollected_message_outside_filter() {
        let (mut k, a, b) = kernel();
        let c = k.spawn("c", USER_QUEUE).unwrap();
        k.receive(a, SourceFilter::Any, IpcFlags::empty()).unwrap();
        k.send(b, a, msg(1), IpcFlags::empty()).unwrap();
        assert_eq!(
            k.receive(a, SourceFilter::From(c), IpcFlags::empty()),
            Err(KernelError::InvalidArgument)
        );
        assert_eq!(k.sendrec(a, c, msg(2)), Err(KernelError::InvalidArgument));
        assert_eq!(k.state(a), Ok(ProcState::Runnable));
        assert_eq!(k.take_message(a).unwrap().unwrap().m_type, 1);
    }

    #[test]
    fn test_sendrec_deadlock_leaves_caller_untouched() {
        let (mut k, a, b) = kernel();
        k.send(a, b, msg(1), IpcFlags::empty()).unwrap();
        assert_eq!(k.sendrec(b, a, msg(2)), Err(KernelError::Deadlock));
        assert_eq!(k.state(b), Ok(ProcState::Runnable));
        assert!(k.is_ready(b));
        assert!(!k.process(b).unwrap().ipc.reply_pending);
        assert_eq!(k.process(a).unwrap().ipc.queue_head, None);

        // notifications still reach b after the failed call
        let c = k.spawn("c", USER_QUEUE).unwrap();
        k.notify(c, b, 4).unwrap();
        let n = k.receive(b, SourceFilter::Any, IpcFlags::NON_BLOCKING).unwrap();
        assert_eq!(n.message().unwrap().notify_info().unwrap().badge, 4);
    }

    #[test]
    fn test_accounting_counts_calls() {
        let (mut k, a, b) = kernel();
        k.notify(a, b, 0).unwrap();
        let _ = k.send(a, b, msg(1), IpcFlags::NON_BLOCKING);
        assert_eq!(k.process(a).unwrap().ipc().accounting().sync_calls, 2);
    }
}
