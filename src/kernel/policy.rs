//! Access-control hook.
//!
//! Consulted after the epoch check, never instead of it: a policy can only
//! narrow what a valid capability allows.

use crate::cap::Capability;
use crate::proc::Endpoint;

/// What the caller is about to do with a capability.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operation {
    /// Fast-path send through the capability.
    Send,
    /// Mint a capability into a client table.
    Grant,
    /// Copy a capability within the caller's own table.
    Duplicate,
}

/// Additional per-call access check.
pub trait AccessPolicy: Send + Sync {
    /// Return false to refuse; the caller then gets `AccessDenied`.
    fn check(&self, caller: Endpoint, cap: &Capability, op: Operation) -> bool;
}

/// Policy that refuses nothing.
#[derive(Clone, Copy, Default, Debug)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn check(&self, _caller: Endpoint, _cap: &Capability, _op: Operation) -> bool {
        true
    }
}
