//! Process lifecycle and the scheduler tick.

use alloc::vec::Vec;

use super::Kernel;
use crate::config::IDLE_QUEUE;
use crate::error::{KernelError, KernelResult};
use crate::proc::{Endpoint, Process, SourceFilter};
use crate::sched::SchedParams;

impl Kernel {
    /// Create a runnable process in queue `priority`, which is also the
    /// best queue it can climb back to.
    pub fn spawn(&mut self, name: &str, priority: u8) -> KernelResult<Endpoint> {
        if priority >= IDLE_QUEUE {
            return Err(KernelError::InvalidArgument);
        }
        let cfg = self.config;
        let sched = SchedParams::new(priority, cfg.default_quantum);
        let ep = self.procs.insert(|ep| {
            Process::new(ep, name, cfg.cap_table_size, cfg.pending_capacity, sched)
        })?;
        self.make_ready(ep.slot());
        log::debug!("spawned {} as {:?} at priority {}", name, ep, priority);
        Ok(ep)
    }

    /// Tear a process down.
    ///
    /// Everything blocked on it wakes with `NoSuchProcess`, asynchronous
    /// entries in either direction are settled, its capabilities are
    /// scrubbed and its endpoint stops resolving.
    pub fn terminate(&mut self, ep: Endpoint) -> KernelResult<()> {
        let slot = self.procs.resolve(ep)?;
        if ep == self.idle {
            return Err(KernelError::InvalidArgument);
        }
        self.make_unready(slot);

        let sending = self.procs.at(slot)?.ipc.sending;
        if let Some(send) = sending {
            self.unlink_sender(send.dest, slot)?;
        }

        // Senders queued on us.
        loop {
            let head = self.procs.at(slot)?.ipc.queue_head;
            let Some(s) = head else { break };
            self.unlink_sender(slot, s)?;
            let sender = self.procs.at_mut(s)?;
            sender.ipc.sending = None;
            sender.ipc.receiving = None;
            sender.ipc.reply_pending = false;
            sender.ipc.error = Some(KernelError::NoSuchProcess);
            self.make_ready(s);
        }

        // Receivers waiting on us by name, including send-receive callers
        // whose request was already taken.
        let waiting: Vec<usize> = self
            .procs
            .iter()
            .filter(|(_, p)| p.ipc.receiving == Some(SourceFilter::From(ep)))
            .map(|(i, _)| i)
            .collect();
        for w in waiting {
            let ipc = &mut self.procs.at_mut(w)?.ipc;
            ipc.receiving = None;
            ipc.reply_pending = false;
            ipc.error = Some(KernelError::NoSuchProcess);
            self.make_ready(w);
        }

        self.retire_async_table(slot)?;
        self.fail_async_to(slot)?;
        for (_, p) in self.procs.iter_mut() {
            p.ipc.pending.purge(ep);
        }

        let proc = self.procs.remove(slot)?;
        let scrubbed = proc.caps.clear();
        if self.config.resource_authority == Some(ep) {
            log::warn!("resource authority {:?} terminated", ep);
            self.config.resource_authority = None;
        }
        log::debug!(
            "terminated {} ({:?}), {} capabilities scrubbed",
            proc.name,
            ep,
            scrubbed
        );
        Ok(())
    }

    /// Pick the process to run next.
    pub fn schedule(&mut self) -> Endpoint {
        let picked = self.run_queues.lock().pick();
        self.current = picked;
        picked
            .and_then(|slot| self.procs.at(slot).ok())
            .map(|p| p.endpoint)
            .unwrap_or(self.idle)
    }

    /// Process picked by the last `schedule`, if it is still runnable.
    pub fn current(&self) -> Option<Endpoint> {
        self.current
            .and_then(|slot| self.procs.at(slot).ok())
            .map(|p| p.endpoint)
    }

    /// Advance the clock one tick and charge it to the running process.
    /// A process that used up its quantum is requeued, which refills the
    /// quantum and adjusts its priority. Returns the process to run next.
    pub fn tick(&mut self) -> Endpoint {
        self.clock += 1;
        if let Some(slot) = self.current {
            if let Ok(p) = self.procs.at_mut(slot) {
                p.sched.ticks_left = p.sched.ticks_left.saturating_sub(1);
                if p.sched.ticks_left == 0 {
                    let mut rq = self.run_queues.lock();
                    rq.dequeue(slot, &mut p.sched);
                    rq.enqueue(slot, &mut p.sched);
                    log::trace!(
                        "{:?} quantum expired, now priority {}",
                        p.endpoint,
                        p.sched.priority
                    );
                }
            }
        }
        self.schedule()
    }
}
