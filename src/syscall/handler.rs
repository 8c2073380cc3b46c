//! System Call Handler
//!
//! Decodes the call number and runs the matching handler from a table.
//!
//! # Security Considerations
//! - Call numbers outside the table return ENOSYS
//! - Each handler validates its own registers before touching the kernel
//! - Errors reach the caller only as negative errno values

use alloc::vec::Vec;

use super::validate;
use crate::error::{KernelError, KernelResult};
use crate::ipc::{AsyncMessage, IpcFlags, IpcOutcome, Message};
use crate::kernel::Kernel;
use crate::proc::Endpoint;

/// System call numbers
pub mod numbers {
    pub const SYS_SEND: usize = 1;
    pub const SYS_RECEIVE: usize = 2;
    pub const SYS_SENDREC: usize = 3;
    pub const SYS_NOTIFY: usize = 4;
    pub const SYS_SENDNB: usize = 5;
    pub const SYS_SENDA: usize = 16;
    pub const SYS_CANCEL_ASYNC: usize = 17;
    pub const SYS_SEND_CAP: usize = 32;
    pub const SYS_RELEASE_CAP: usize = 33;
    pub const SYS_DUP_CAP: usize = 34;
    pub const SYS_CREATE_USER_CAPABILITY: usize = 48;
    pub const SYS_UPDATE_SERVICE_EPOCH: usize = 49;
    pub const SYS_REGISTER_SERVICE: usize = 50;
}

/// Every call the kernel accepts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Syscall {
    Send,
    Receive,
    SendRec,
    Notify,
    SendNb,
    SendA,
    CancelAsync,
    SendCap,
    ReleaseCap,
    DupCap,
    CreateUserCapability,
    UpdateServiceEpoch,
    RegisterService,
}

impl TryFrom<usize> for Syscall {
    type Error = KernelError;

    fn try_from(nr: usize) -> Result<Self, Self::Error> {
        use numbers::*;
        Ok(match nr {
            SYS_SEND => Self::Send,
            SYS_RECEIVE => Self::Receive,
            SYS_SENDREC => Self::SendRec,
            SYS_NOTIFY => Self::Notify,
            SYS_SENDNB => Self::SendNb,
            SYS_SENDA => Self::SendA,
            SYS_CANCEL_ASYNC => Self::CancelAsync,
            SYS_SEND_CAP => Self::SendCap,
            SYS_RELEASE_CAP => Self::ReleaseCap,
            SYS_DUP_CAP => Self::DupCap,
            SYS_CREATE_USER_CAPABILITY => Self::CreateUserCapability,
            SYS_UPDATE_SERVICE_EPOCH => Self::UpdateServiceEpoch,
            SYS_REGISTER_SERVICE => Self::RegisterService,
            _ => return Err(KernelError::UnknownCall),
        })
    }
}

/// Saved caller state for one call.
#[derive(Clone, Debug, Default)]
pub struct SyscallFrame {
    /// Argument registers x0-x5.
    pub gpr: [u64; 6],
    /// The caller's message buffer, copied in before dispatch. `None` if
    /// the buffer could not be read.
    pub message: Option<Message>,
    /// The caller's asynchronous table, copied in for `SENDA`.
    pub async_table: Vec<AsyncMessage>,
    /// Message to copy back into the caller's buffer.
    pub reply: Option<Message>,
    /// The caller was parked; its result arrives when it is woken.
    pub suspended: bool,
}

impl SyscallFrame {
    pub fn new(gpr: [u64; 6]) -> Self {
        Self {
            gpr,
            ..Self::default()
        }
    }

    pub fn with_message(gpr: [u64; 6], msg: Message) -> Self {
        Self {
            gpr,
            message: Some(msg),
            ..Self::default()
        }
    }

    fn finish(&mut self, outcome: IpcOutcome) -> i64 {
        match outcome {
            IpcOutcome::Completed(reply) => self.reply = reply,
            IpcOutcome::Blocked => self.suspended = true,
        }
        0
    }
}

type Handler = fn(&mut Kernel, Endpoint, &mut SyscallFrame) -> KernelResult<i64>;

/// Call table. Adding a call is adding a row.
static HANDLERS: &[(Syscall, Handler)] = &[
    (Syscall::Send, sys_send),
    (Syscall::Receive, sys_receive),
    (Syscall::SendRec, sys_sendrec),
    (Syscall::Notify, sys_notify),
    (Syscall::SendNb, sys_sendnb),
    (Syscall::SendA, sys_senda),
    (Syscall::CancelAsync, sys_cancel_async),
    (Syscall::SendCap, sys_send_cap),
    (Syscall::ReleaseCap, sys_release_cap),
    (Syscall::DupCap, sys_dup_cap),
    (Syscall::CreateUserCapability, sys_create_user_capability),
    (Syscall::UpdateServiceEpoch, sys_update_service_epoch),
    (Syscall::RegisterService, sys_register_service),
];

/// Dispatch a system call
///
/// # Arguments
/// * `kernel` - Kernel context
/// * `caller` - Endpoint of the calling process
/// * `call_nr` - System call number (from x8)
/// * `frame` - Argument registers and copied-in buffers
///
/// # Returns
/// Result value to be placed in x0: zero or a result, or a negative errno
pub fn dispatch(
    kernel: &mut Kernel,
    caller: Endpoint,
    call_nr: usize,
    frame: &mut SyscallFrame,
) -> i64 {
    let call = match Syscall::try_from(call_nr) {
        Ok(call) => call,
        Err(e) => {
            log::warn!("unknown syscall {} from {:?}", call_nr, caller);
            return e.errno();
        }
    };
    let Some((_, handler)) = HANDLERS.iter().find(|(c, _)| *c == call) else {
        return KernelError::UnknownCall.errno();
    };
    match handler(kernel, caller, frame) {
        Ok(v) => v,
        Err(e) => {
            log::trace!("{:?} from {:?} failed: {}", call, caller, e);
            e.errno()
        }
    }
}

fn sys_send(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let dest = validate::endpoint(f.gpr[0])?;
    let flags = validate::ipc_flags(f.gpr[1])?;
    let msg = validate::message(f.message)?;
    let out = k.send(caller, dest, msg, flags)?;
    Ok(f.finish(out))
}

fn sys_sendnb(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let dest = validate::endpoint(f.gpr[0])?;
    let msg = validate::message(f.message)?;
    let out = k.send(caller, dest, msg, IpcFlags::NON_BLOCKING)?;
    Ok(f.finish(out))
}

fn sys_receive(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let filter = validate::source_filter(f.gpr[0])?;
    let flags = validate::ipc_flags(f.gpr[1])?;
    let out = k.receive(caller, filter, flags)?;
    Ok(f.finish(out))
}

fn sys_sendrec(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let dest = validate::endpoint(f.gpr[0])?;
    let msg = validate::message(f.message)?;
    let out = k.sendrec(caller, dest, msg)?;
    Ok(f.finish(out))
}

fn sys_notify(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let dest = validate::endpoint(f.gpr[0])?;
    k.notify(caller, dest, f.gpr[1])?;
    Ok(0)
}

fn sys_senda(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    validate::async_len(f.gpr[0], f.async_table.len())?;
    let table = core::mem::take(&mut f.async_table);
    let delivered = k.senda(caller, table)?;
    Ok(delivered as i64)
}

fn sys_cancel_async(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let index = usize::try_from(f.gpr[0]).map_err(|_| KernelError::InvalidArgument)?;
    k.cancel_async(caller, index)?;
    Ok(0)
}

fn sys_send_cap(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let index = validate::cap_index(f.gpr[0])?;
    let flags = validate::ipc_flags(f.gpr[1])?;
    let msg = validate::message(f.message)?;
    let out = k.send_cap(caller, index, msg, flags)?;
    Ok(f.finish(out))
}

fn sys_release_cap(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    k.release_capability(caller, validate::cap_index(f.gpr[0])?)?;
    Ok(0)
}

fn sys_dup_cap(k: &mut Kernel, caller: Endpoint, f: &mut SyscallFrame) -> KernelResult<i64> {
    let index = validate::cap_index(f.gpr[0])?;
    // zero keeps the original rights
    let rights = match f.gpr[1] {
        0 => None,
        raw => Some(validate::permissions(raw)?),
    };
    let copy = k.duplicate_capability(caller, index, rights)?;
    Ok(i64::from(copy))
}

fn sys_create_user_capability(
    k: &mut Kernel,
    caller: Endpoint,
    f: &mut SyscallFrame,
) -> KernelResult<i64> {
    let client = validate::endpoint(f.gpr[0])?;
    let perms = validate::permissions(f.gpr[1])?;
    let object = validate::object(f.gpr[2])?;
    let service = validate::service(f.gpr[3])?;
    let epoch = validate::epoch(f.gpr[4])?;
    let index = k.create_user_capability(caller, client, perms, object, service, epoch)?;
    Ok(i64::from(index))
}

fn sys_update_service_epoch(
    k: &mut Kernel,
    caller: Endpoint,
    f: &mut SyscallFrame,
) -> KernelResult<i64> {
    let service = validate::service(f.gpr[0])?;
    let epoch = validate::epoch(f.gpr[1])?;
    k.update_service_epoch(caller, service, epoch)?;
    Ok(0)
}

fn sys_register_service(
    k: &mut Kernel,
    caller: Endpoint,
    f: &mut SyscallFrame,
) -> KernelResult<i64> {
    let service_ep = validate::endpoint(f.gpr[0])?;
    let service = validate::service(f.gpr[1])?;
    let epoch = k.register_service(caller, service_ep, service)?;
    Ok(i64::from(epoch))
}
