//! Capability Granting and Revocation
//!
//! Privileged entry points around the epoch registry.
//!
//! # Security Properties
//! - A grant is stamped with the registry's current epoch for the
//!   caller's *true* service identity, bound earlier by the authority;
//!   the identity the caller claims is only compared, never trusted
//! - A grant made against a stale epoch is refused, so a service that
//!   missed a revocation cannot mint capabilities that are born dead
//! - Epoch updates touch one atomic and no capability table

use crate::cap::{Capability, Epoch, Permissions, ServiceId, UNREGISTERED};
use crate::error::{KernelError, KernelResult};
use crate::proc::Endpoint;

use super::{Kernel, Operation};

impl Kernel {
    /// Name the single resource authority. Allowed once.
    pub fn designate_authority(&mut self, ep: Endpoint) -> KernelResult<()> {
        self.procs.resolve(ep)?;
        if self.config.resource_authority.is_some() {
            log::warn!("authority already designated, refusing {:?}", ep);
            return Err(KernelError::PermissionDenied);
        }
        self.config.resource_authority = Some(ep);
        log::info!("resource authority is {:?}", ep);
        Ok(())
    }

    fn require_authority(&self, caller: Endpoint, what: &str) -> KernelResult<()> {
        if self.config.resource_authority == Some(caller) {
            Ok(())
        } else {
            log::warn!("{}: {:?} is not the resource authority", what, caller);
            Err(KernelError::PermissionDenied)
        }
    }

    /// Bind `service_ep` to `service` and register the service.
    ///
    /// Returns the service's current epoch (1 on first registration).
    pub fn register_service(
        &mut self,
        caller: Endpoint,
        service_ep: Endpoint,
        service: ServiceId,
    ) -> KernelResult<Epoch> {
        self.require_authority(caller, "register_service")?;
        if service.index() >= self.registry.capacity() {
            return Err(KernelError::InvalidArgument);
        }

        let proc = self.procs.get_mut(service_ep)?;
        match proc.service {
            Some(bound) if bound != service => return Err(KernelError::InvalidArgument),
            _ => proc.service = Some(service),
        }

        let epoch = self.registry.register(service)?;
        log::debug!("{:?} bound to {:?} at epoch {}", service_ep, service, epoch);
        Ok(epoch)
    }

    /// Advance `service`'s epoch, revoking every capability stamped with
    /// an older one. The new epoch must be greater than the current one.
    pub fn update_service_epoch(
        &mut self,
        caller: Endpoint,
        service: ServiceId,
        new_epoch: Epoch,
    ) -> KernelResult<()> {
        self.require_authority(caller, "update_service_epoch")?;
        let old = self.registry.store(service, new_epoch).map_err(|e| {
            log::warn!("{:?} epoch update to {} refused", service, new_epoch);
            e
        })?;
        log::info!("{:?} epoch {} -> {}", service, old, new_epoch);
        Ok(())
    }

    /// Mint a capability into `client`'s table on behalf of the caller's
    /// service. Returns the slot index in the client's table.
    pub fn create_user_capability(
        &mut self,
        caller: Endpoint,
        client: Endpoint,
        permissions: Permissions,
        object: usize,
        claimed_service: ServiceId,
        claimed_epoch: Epoch,
    ) -> KernelResult<u32> {
        let granter = self.procs.get(caller)?;
        if granter.service != Some(claimed_service) {
            log::warn!(
                "{:?} claimed {:?} but is bound to {:?}",
                caller,
                claimed_service,
                granter.service
            );
            return Err(KernelError::PermissionDenied);
        }

        let current = self
            .registry
            .current(claimed_service)
            .ok_or(KernelError::InvalidArgument)?;
        if current == UNREGISTERED || current != claimed_epoch {
            log::warn!(
                "{:?} granted with stale epoch {} (current {})",
                claimed_service,
                claimed_epoch,
                current
            );
            return Err(KernelError::PermissionDenied);
        }

        let template = Capability::template(claimed_service, current, permissions, object);
        if !self.policy.check(caller, &template, Operation::Grant) {
            return Err(KernelError::AccessDenied);
        }

        let index = self.procs.get(client)?.caps.alloc(template)?;
        log::debug!(
            "{:?} granted {:?} to {:?} at index {}",
            caller,
            permissions,
            client,
            index
        );
        Ok(index)
    }

    /// Free a slot in the caller's own table.
    pub fn release_capability(&mut self, caller: Endpoint, index: u32) -> KernelResult<()> {
        self.procs.get(caller)?.caps.free(index)
    }

    /// Copy a still-valid capability into a fresh slot of the caller's own
    /// table. The copy carries the same epoch and dies with the original.
    ///
    /// With `rights`, the copy is derived with reduced rights, which needs
    /// GRANT on the original.
    pub fn duplicate_capability(
        &mut self,
        caller: Endpoint,
        index: u32,
        rights: Option<Permissions>,
    ) -> KernelResult<u32> {
        let proc = self.procs.get(caller)?;
        let cap = proc.caps.lookup(index).ok_or(KernelError::InvalidArgument)?;
        if !proc.caps.is_valid_for_ipc(index, &self.registry) {
            return Err(KernelError::PermissionDenied);
        }
        if !self.policy.check(caller, &cap, Operation::Duplicate) {
            return Err(KernelError::AccessDenied);
        }
        let copy = match rights {
            Some(r) => cap.derive(r).ok_or(KernelError::PermissionDenied)?,
            None => cap,
        };
        proc.caps.alloc(copy)
    }

    /// Validity of the caller's capability at `index` right now.
    pub fn is_capability_valid(&self, caller: Endpoint, index: u32) -> KernelResult<bool> {
        Ok(self
            .procs
            .get(caller)?
            .caps
            .is_valid_for_ipc(index, &self.registry))
    }
}
