//! Capability-gated send
//!
//! One call resolves a local capability index to a destination and forwards
//! the message, replacing "open, check rights, route".
//!
//! # Security Properties
//! - The epoch check runs on every call; a slot that merely exists proves
//!   nothing
//! - The access policy only runs on capabilities that passed the epoch check
//! - The destination comes from the capability, never from the caller

use super::message::Message;
use super::state::{IpcFlags, IpcOutcome};
use crate::cap::Permissions;
use crate::error::{KernelError, KernelResult};
use crate::kernel::{Kernel, Operation};
use crate::proc::Endpoint;

impl Kernel {
    /// Send `msg` to the endpoint named by the caller's capability at
    /// `cap_index`.
    pub fn send_cap(
        &mut self,
        caller: Endpoint,
        cap_index: u32,
        msg: Message,
        flags: IpcFlags,
    ) -> KernelResult<IpcOutcome> {
        let src = self.ipc_caller(caller)?;
        let caps = &self.procs.at(src)?.caps;

        let cap = caps.lookup(cap_index).ok_or(KernelError::InvalidArgument)?;
        if !caps.is_valid_for_ipc(cap_index, &self.registry) {
            log::warn!(
                "{:?} used revoked capability {} of {:?}",
                caller,
                cap_index,
                cap.service_id()
            );
            return Err(KernelError::PermissionDenied);
        }
        if !self.policy.check(caller, &cap, Operation::Send) {
            return Err(KernelError::AccessDenied);
        }
        if !cap.has_permissions(Permissions::SEND) {
            return Err(KernelError::PermissionDenied);
        }

        let raw =
            u32::try_from(cap.endpoint_or_obj()).map_err(|_| KernelError::InvalidArgument)?;
        let dest = Endpoint::from_raw(raw);

        self.procs.at_mut(src)?.ipc.accounting.sync_calls += 1;
        self.mini_send(src, dest, msg, flags)
    }
}
