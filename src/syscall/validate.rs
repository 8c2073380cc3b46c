//! System Call Argument Validation
//!
//! Decodes raw argument registers into typed kernel values.
//!
//! # Security Principles
//! - Validate ALL register arguments before use
//! - Fail-secure: a value that does not fit its type is `InvalidArgument`,
//!   never truncated
//! - Message buffers arrive already copied into kernel memory; a missing
//!   copy means the caller's pointer was bad

use crate::cap::{Epoch, Permissions, ServiceId};
use crate::config::{MAX_ASYNC_ENTRIES, MAX_SERVICES};
use crate::error::{KernelError, KernelResult};
use crate::ipc::{IpcFlags, Message};
use crate::proc::{Endpoint, SourceFilter};

fn narrow(raw: u64) -> KernelResult<u32> {
    u32::try_from(raw).map_err(|_| KernelError::InvalidArgument)
}

/// Destination endpoint.
pub fn endpoint(raw: u64) -> KernelResult<Endpoint> {
    narrow(raw).map(Endpoint::from_raw)
}

/// Receive source filter; `ANY_RAW` selects any sender.
pub fn source_filter(raw: u64) -> KernelResult<SourceFilter> {
    narrow(raw).map(SourceFilter::from_raw)
}

/// Local capability-table index. Range against the table is checked by the
/// table itself.
pub fn cap_index(raw: u64) -> KernelResult<u32> {
    narrow(raw)
}

/// Permission mask with no unknown bits.
pub fn permissions(raw: u64) -> KernelResult<Permissions> {
    Permissions::from_bits(narrow(raw)?).ok_or(KernelError::InvalidArgument)
}

/// IPC flags with no unknown bits.
pub fn ipc_flags(raw: u64) -> KernelResult<IpcFlags> {
    IpcFlags::from_bits(narrow(raw)?).ok_or(KernelError::InvalidArgument)
}

/// Service identifier within the registry.
pub fn service(raw: u64) -> KernelResult<ServiceId> {
    let id = narrow(raw)?;
    if id as usize >= MAX_SERVICES {
        return Err(KernelError::InvalidArgument);
    }
    Ok(ServiceId::new(id))
}

pub fn epoch(raw: u64) -> KernelResult<Epoch> {
    narrow(raw)
}

/// Object handle stored in a capability.
pub fn object(raw: u64) -> KernelResult<usize> {
    usize::try_from(raw).map_err(|_| KernelError::InvalidArgument)
}

/// Announced length of an asynchronous table.
///
/// # Security Checks
/// 1. Length within the per-call bound
/// 2. Length matches what was actually copied in
pub fn async_len(raw: u64, copied: usize) -> KernelResult<usize> {
    let len = usize::try_from(raw).map_err(|_| KernelError::InvalidArgument)?;
    if len > MAX_ASYNC_ENTRIES {
        return Err(KernelError::InvalidArgument);
    }
    if len != copied {
        return Err(KernelError::BadAddress);
    }
    Ok(len)
}

/// The copied-in message buffer.
pub fn message(copied: Option<Message>) -> KernelResult<Message> {
    copied.ok_or(KernelError::BadAddress)
}
