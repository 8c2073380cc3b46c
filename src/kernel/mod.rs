//! Kernel Context
//!
//! One value owns everything the core mutates: the process arena, the epoch
//! registry, the run queues, the resource-authority identity and the
//! access-policy hook. Every entry point is a method on [`Kernel`], so no
//! call reads ambient global state.
//!
//! # Design
//! - Boot creates the idle process in the last run queue; it is never
//!   blocked, so the scheduler always finds something to run
//! - The resource authority is a plain endpoint compared on every
//!   privileged call
//! - Run-queue updates go through an interrupt-masking spinlock, the same
//!   discipline the capability tables use
//!
//! # Submodules
//! - `grant`: capability minting, service registration, epoch updates
//! - `lifecycle`: spawn, terminate, tick and schedule
//! - `policy`: the access-control hook

mod grant;
mod lifecycle;
mod policy;

pub use policy::{AccessPolicy, AllowAll, Operation};

use alloc::boxed::Box;

use crate::cap::EpochRegistry;
use crate::config::KernelConfig;
use crate::error::{KernelError, KernelResult};
use crate::ipc::{Message, ProcState};
use crate::proc::{Endpoint, Process, ProcessTable};
use crate::sched::{RunQueues, SchedParams};
use crate::sync::IrqSpinLock;

/// The kernel context.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) procs: ProcessTable,
    pub(crate) registry: EpochRegistry,
    pub(crate) run_queues: IrqSpinLock<RunQueues>,
    pub(crate) policy: Box<dyn AccessPolicy>,
    /// Ticks since boot; stamped into notifications.
    pub(crate) clock: u64,
    pub(crate) idle: Endpoint,
    /// Slot of the process picked by the last `schedule`.
    pub(crate) current: Option<usize>,
}

impl Kernel {
    /// Boot a kernel with the permissive access policy.
    pub fn new(config: KernelConfig) -> KernelResult<Self> {
        Self::with_policy(config, Box::new(AllowAll))
    }

    pub fn with_policy(config: KernelConfig, policy: Box<dyn AccessPolicy>) -> KernelResult<Self> {
        config.validate()?;

        let mut kernel = Self {
            config,
            procs: ProcessTable::new(config.max_procs),
            registry: EpochRegistry::new(),
            run_queues: IrqSpinLock::new(RunQueues::new()),
            policy,
            clock: 0,
            idle: Endpoint::from_raw(0),
            current: None,
        };

        let idle = kernel.procs.insert(|ep| {
            Process::new(
                ep,
                "idle",
                config.cap_table_size,
                config.pending_capacity,
                SchedParams::idle(),
            )
        })?;
        kernel.idle = idle;
        kernel.make_ready(idle.slot());

        log::info!(
            "kernel up: {} proc slots, {} cap slots each, authority {:?}",
            config.max_procs,
            config.cap_table_size,
            config.resource_authority
        );
        Ok(kernel)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn registry(&self) -> &EpochRegistry {
        &self.registry
    }

    pub fn resource_authority(&self) -> Option<Endpoint> {
        self.config.resource_authority
    }

    pub fn idle(&self) -> Endpoint {
        self.idle
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Replace the access-policy hook.
    pub fn set_policy(&mut self, policy: Box<dyn AccessPolicy>) {
        self.policy = policy;
    }

    pub fn process(&self, ep: Endpoint) -> KernelResult<&Process> {
        self.procs.get(ep)
    }

    pub fn state(&self, ep: Endpoint) -> KernelResult<ProcState> {
        Ok(self.procs.get(ep)?.state())
    }

    /// True if `ep` sits on a run queue.
    pub fn is_ready(&self, ep: Endpoint) -> bool {
        self.procs
            .get(ep)
            .map(|p| p.sched.is_queued())
            .unwrap_or(false)
    }

    /// Collect the message a blocking call delivered to `ep`.
    pub fn take_message(&mut self, ep: Endpoint) -> KernelResult<Option<Message>> {
        Ok(self.procs.get_mut(ep)?.ipc.inbox.take())
    }

    /// Collect the failure a blocking call delivered to `ep`.
    pub fn take_error(&mut self, ep: Endpoint) -> KernelResult<Option<KernelError>> {
        Ok(self.procs.get_mut(ep)?.ipc.error.take())
    }

    /// Put `slot` on its run queue.
    pub(crate) fn make_ready(&mut self, slot: usize) {
        if let Ok(p) = self.procs.at_mut(slot) {
            self.run_queues.lock().enqueue(slot, &mut p.sched);
            log::trace!("{:?} ready at priority {}", p.endpoint, p.sched.priority);
        }
    }

    /// Take `slot` off its run queue.
    pub(crate) fn make_unready(&mut self, slot: usize) {
        if let Ok(p) = self.procs.at_mut(slot) {
            self.run_queues.lock().dequeue(slot, &mut p.sched);
            log::trace!("{:?} blocked", p.endpoint);
        }
        if self.current == Some(slot) {
            self.current = None;
        }
    }
}

impl core::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernel")
            .field("config", &self.config)
            .field("procs", &self.procs.len())
            .field("registry", &self.registry)
            .field("clock", &self.clock)
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IDLE_QUEUE;

    #[test]
    fn test_boot_creates_ready_idle() {
        let k = Kernel::new(KernelConfig::default()).unwrap();
        let idle = k.idle();
        assert!(k.is_ready(idle));
        assert_eq!(k.process(idle).unwrap().sched().priority, IDLE_QUEUE);
        assert_eq!(k.state(idle), Ok(ProcState::Runnable));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = KernelConfig {
            cap_table_size: 3,
            ..KernelConfig::default()
        };
        assert_eq!(Kernel::new(cfg).err(), Some(KernelError::InvalidArgument));
    }
}
