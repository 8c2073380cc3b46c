//! Deadlock detection
//!
//! Before a process blocks, follow the chain of "who is X waiting on"
//! starting at the peer. A chain that comes back to the caller is a cycle
//! of processes that can never wake each other.
//!
//! The one cycle allowed is the two-party rendezvous: the caller sends
//! while the peer waits to receive from it, or the caller receives while
//! the peer waits to send to it. Either side completing unblocks both.

use crate::proc::{Process, ProcessTable, SourceFilter};

/// Direction of the call about to block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum CallKind {
    Send,
    Receive,
}

/// Slot `proc` waits on, if it is blocked on a single process.
///
/// A pending send wins over a pending receive; `Any` ends the chain.
fn blocked_on(proc: &Process) -> Option<usize> {
    if let Some(send) = &proc.ipc.sending {
        return Some(send.dest);
    }
    match proc.ipc.receiving {
        Some(SourceFilter::From(ep)) if !ep.is_kernel_source() => Some(ep.slot()),
        _ => None,
    }
}

/// Size of the cycle `caller` would close by blocking on `peer`, or `None`
/// if blocking is safe.
pub(crate) fn detect(
    procs: &ProcessTable,
    caller: usize,
    peer: usize,
    kind: CallKind,
) -> Option<usize> {
    let mut group = 1;
    let mut next = peer;

    // A chain longer than the arena must repeat without reaching the caller.
    for _ in 0..procs.capacity() {
        let xp = procs.at(next).ok()?;
        let on = blocked_on(xp)?;
        group += 1;

        if on == caller {
            if group == 2 {
                let peer_sending = xp.ipc.sending.is_some();
                let rendezvous = match kind {
                    CallKind::Send => !peer_sending,
                    CallKind::Receive => peer_sending,
                };
                if rendezvous {
                    return None;
                }
            }
            return Some(group);
        }
        next = on;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::state::PendingSend;
    use crate::ipc::Message;
    use crate::proc::Endpoint;
    use crate::sched::SchedParams;

    fn table(n: usize) -> ProcessTable {
        let mut t = ProcessTable::new(n);
        for _ in 0..n {
            t.insert(|ep| Process::new(ep, "p", 4, 2, SchedParams::new(7, 4)))
                .unwrap();
        }
        t
    }

    fn block_send(t: &mut ProcessTable, from: usize, to: usize) {
        let target = t.at(to).unwrap().endpoint();
        t.at_mut(from).unwrap().ipc.sending = Some(PendingSend {
            dest: to,
            target,
            msg: Message::empty(0),
        });
    }

    fn ep(slot: usize) -> Endpoint {
        Endpoint::new(slot, 0)
    }

    #[test]
    fn test_mutual_send_is_cycle() {
        let mut t = table(2);
        block_send(&mut t, 1, 0);
        assert_eq!(detect(&t, 0, 1, CallKind::Send), Some(2));
    }

    #[test]
    fn test_send_to_receiver_is_rendezvous() {
        let mut t = table(2);
        t.at_mut(1).unwrap().ipc.receiving = Some(SourceFilter::From(ep(0)));
        assert_eq!(detect(&t, 0, 1, CallKind::Send), None);
    }

    #[test]
    fn test_receive_from_sender_is_rendezvous() {
        let mut t = table(2);
        block_send(&mut t, 1, 0);
        assert_eq!(detect(&t, 0, 1, CallKind::Receive), None);
    }

    #[test]
    fn test_three_party_cycle() {
        let mut t = table(3);
        // 1 -> 2 -> 0, and 0 now wants to send to 1
        block_send(&mut t, 1, 2);
        block_send(&mut t, 2, 0);
        assert_eq!(detect(&t, 0, 1, CallKind::Send), Some(3));
    }

    #[test]
    fn test_any_breaks_chain() {
        let mut t = table(3);
        block_send(&mut t, 1, 2);
        t.at_mut(2).unwrap().ipc.receiving = Some(SourceFilter::Any);
        assert_eq!(detect(&t, 0, 1, CallKind::Send), None);
    }

    #[test]
    fn test_foreign_cycle_terminates() {
        let mut t = table(3);
        block_send(&mut t, 1, 2);
        block_send(&mut t, 2, 1);
        assert_eq!(detect(&t, 0, 1, CallKind::Send), None);
    }
}
