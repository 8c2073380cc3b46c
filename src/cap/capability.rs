//! Capability Records and Permissions
//!
//! Defines the fixed-layout capability stored in every table slot.
//!
//! # Capability Structure
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Capability (64 bytes)                    │
//! ├──────────────────────────────────────────────────────────┤
//! │  service_id: u32        - Issuing service                │
//! │  epoch: u32             - Service generation at grant    │
//! │  permissions: u32       - Permitted operations           │
//! │  endpoint_or_obj: usize - Destination or object handle   │
//! │  padding                - Rest of the cache line         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The padding is part of the binary interface: neighbouring slots never
//! share a cache line.

use core::ptr;
use core::sync::atomic::{compiler_fence, Ordering};

use bitflags::bitflags;

use crate::security::Zeroize;

/// Size of one capability slot.
pub const CACHE_LINE_SIZE: usize = 64;

/// Service generation counter.
pub type Epoch = u32;

bitflags! {
    /// Rights granted by a capability.
    ///
    /// When deriving a capability, rights can only be reduced, never
    /// increased.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Read the referenced object.
        const READ = 1 << 0;
        /// Write the referenced object.
        const WRITE = 1 << 1;
        /// Execute (code pages).
        const EXECUTE = 1 << 2;
        /// Duplicate or derive further capabilities.
        const GRANT = 1 << 3;
        /// Revoke derived capabilities.
        const REVOKE = 1 << 4;
        /// Send messages to the referenced endpoint.
        const SEND = 1 << 5;
        /// Receive from the referenced endpoint.
        const RECEIVE = 1 << 6;
        /// Post notifications to the referenced endpoint.
        const NOTIFY = 1 << 7;
    }
}

/// Identifier of a trusted service in the epoch registry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct ServiceId(u32);

impl ServiceId {
    /// Sentinel stored in freed slots. Never in range of the registry.
    pub const INVALID: Self = Self(u32::MAX);

    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slot-map handle: index plus the slot generation observed at allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CapHandle {
    pub index: u32,
    pub generation: u32,
}

/// A capability: an unforgeable token granting rights over an object or
/// endpoint, stamped with the issuing service's epoch.
///
/// A capability is usable for IPC only while its epoch equals the
/// registry's current epoch for its service. That check is never cached.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(64))]
pub struct Capability {
    service_id: ServiceId,
    epoch: Epoch,
    permissions: Permissions,
    endpoint_or_obj: usize,
}

const _: () = assert!(core::mem::size_of::<Capability>() == CACHE_LINE_SIZE);
const _: () = assert!(core::mem::align_of::<Capability>() == CACHE_LINE_SIZE);

impl Capability {
    /// The empty capability held by unallocated slots.
    pub const fn null() -> Self {
        Self {
            service_id: ServiceId::INVALID,
            epoch: 0,
            permissions: Permissions::empty(),
            endpoint_or_obj: 0,
        }
    }

    /// Build an allocation template.
    ///
    /// The caller stamps `epoch` from the registry; tables never read it.
    pub const fn template(
        service_id: ServiceId,
        epoch: Epoch,
        permissions: Permissions,
        endpoint_or_obj: usize,
    ) -> Self {
        Self {
            service_id,
            epoch,
            permissions,
            endpoint_or_obj,
        }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.service_id.raw() == ServiceId::INVALID.raw()
    }

    #[inline]
    pub const fn service_id(&self) -> ServiceId {
        self.service_id
    }

    #[inline]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[inline]
    pub const fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Destination endpoint or opaque object handle.
    #[inline]
    pub const fn endpoint_or_obj(&self) -> usize {
        self.endpoint_or_obj
    }

    #[inline]
    pub fn has_permissions(&self, required: Permissions) -> bool {
        self.permissions.contains(required)
    }

    /// Derive a copy with reduced rights.
    ///
    /// Returns None if this capability lacks GRANT or the requested rights
    /// are not a subset of the current ones. Service and epoch carry over,
    /// so the copy is revoked together with its parent.
    pub fn derive(&self, new_rights: Permissions) -> Option<Self> {
        if !self.has_permissions(Permissions::GRANT) {
            return None;
        }
        if !self.permissions.contains(new_rights) {
            return None;
        }
        Some(Self {
            permissions: new_rights,
            ..*self
        })
    }
}

impl Default for Capability {
    fn default() -> Self {
        Self::null()
    }
}

impl Zeroize for Capability {
    fn zeroize(&mut self) {
        // SAFETY: every field is a valid exclusive place inside `self`.
        unsafe {
            ptr::write_volatile(&mut self.permissions, Permissions::empty());
            ptr::write_volatile(&mut self.endpoint_or_obj, 0);
            ptr::write_volatile(&mut self.service_id, ServiceId::INVALID);
            ptr::write_volatile(&mut self.epoch, 0);
        }
        compiler_fence(Ordering::SeqCst);
    }
}

impl core::fmt::Debug for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_null() {
            write!(f, "Cap(null)")
        } else {
            write!(
                f,
                "Cap(svc={}, epoch={}, perms={:?}, obj={:#x})",
                self.service_id.raw(),
                self.epoch,
                self.permissions,
                self.endpoint_or_obj
            )
        }
    }
}
