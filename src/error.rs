//! Kernel Error Codes
//!
//! Every kernel entry point returns a [`KernelResult`]. Errors travel back
//! to the caller through the syscall return register as negative errno
//! values; there is no other propagation mechanism.

/// Raw errno values written into the return register.
pub mod errno {
    pub const EPERM: i64 = -1;
    pub const ESRCH: i64 = -3;
    pub const EAGAIN: i64 = -11;
    pub const ENOMEM: i64 = -12;
    pub const EACCES: i64 = -13;
    pub const EFAULT: i64 = -14;
    pub const EINVAL: i64 = -22;
    pub const EDEADLK: i64 = -35;
    pub const ENOSYS: i64 = -38;
}

/// Errors surfaced by capability, IPC and scheduling operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Bad index, malformed template, bad table size or bad endpoint.
    InvalidArgument,
    /// Capability table or other fixed-capacity structure is full.
    OutOfCapacity,
    /// Internal bookkeeping is corrupt. Never expected at runtime.
    InternalInvariantViolation,
    /// Spoofed service identity, stale epoch or non-authority caller.
    PermissionDenied,
    /// The access-policy hook refused the operation.
    AccessDenied,
    /// Unknown or dead endpoint.
    NoSuchProcess,
    /// A non-blocking call could not complete immediately.
    WouldBlock,
    /// Blocking would close a cycle of waiting processes.
    Deadlock,
    /// Bad syscall dispatch number.
    UnknownCall,
    /// A caller-supplied buffer could not be read.
    BadAddress,
}

impl KernelError {
    /// Negative errno for the syscall return register.
    pub const fn errno(self) -> i64 {
        match self {
            Self::InvalidArgument => errno::EINVAL,
            Self::OutOfCapacity => errno::ENOMEM,
            Self::InternalInvariantViolation => errno::EFAULT,
            Self::PermissionDenied => errno::EPERM,
            Self::AccessDenied => errno::EACCES,
            Self::NoSuchProcess => errno::ESRCH,
            Self::WouldBlock => errno::EAGAIN,
            Self::Deadlock => errno::EDEADLK,
            Self::UnknownCall => errno::ENOSYS,
            Self::BadAddress => errno::EFAULT,
        }
    }
}

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::OutOfCapacity => write!(f, "out of capacity"),
            Self::InternalInvariantViolation => write!(f, "internal invariant violated"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::AccessDenied => write!(f, "access denied by policy"),
            Self::NoSuchProcess => write!(f, "no such process"),
            Self::WouldBlock => write!(f, "operation would block"),
            Self::Deadlock => write!(f, "deadlock detected"),
            Self::UnknownCall => write!(f, "unknown call"),
            Self::BadAddress => write!(f, "bad address"),
        }
    }
}

/// Result alias used across the kernel.
pub type KernelResult<T> = Result<T, KernelError>;
