//! Process descriptor.

use alloc::string::String;

use super::endpoint::Endpoint;
use crate::cap::{CapTable, ServiceId};
use crate::ipc::{IpcState, ProcState};
use crate::sched::SchedParams;

/// Everything the core knows about one process.
#[derive(Debug)]
pub struct Process {
    pub(crate) endpoint: Endpoint,
    pub(crate) name: String,
    /// Service identity bound by the resource authority.
    pub(crate) service: Option<ServiceId>,
    pub(crate) caps: CapTable,
    pub(crate) ipc: IpcState,
    pub(crate) sched: SchedParams,
}

impl Process {
    pub(crate) fn new(
        endpoint: Endpoint,
        name: &str,
        cap_table_size: usize,
        pending_capacity: usize,
        sched: SchedParams,
    ) -> Self {
        Self {
            endpoint,
            name: String::from(name),
            service: None,
            caps: CapTable::new(cap_table_size),
            ipc: IpcState::new(pending_capacity),
            sched,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> Option<ServiceId> {
        self.service
    }

    pub fn caps(&self) -> &CapTable {
        &self.caps
    }

    pub fn ipc(&self) -> &IpcState {
        &self.ipc
    }

    pub fn sched(&self) -> &SchedParams {
        &self.sched
    }

    /// Where this process stands in the IPC state machine.
    ///
    /// A send-receive still waiting to hand over its request reports
    /// `Sending`; once the request is taken it reports `Receiving`.
    pub fn state(&self) -> ProcState {
        if let Some(send) = &self.ipc.sending {
            return ProcState::Sending(send.target);
        }
        match self.ipc.receiving {
            Some(filter) => ProcState::Receiving(filter),
            None => ProcState::Runnable,
        }
    }
}
