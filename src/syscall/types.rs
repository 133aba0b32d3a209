//! Syscall numbers, result types, and raw ABI encoding.

/// Stable syscall numbers exposed through the `int 0x80` gate.
pub struct SyscallId;

impl SyscallId {
    /// Reschedule without blocking.
    pub const YIELD: u64 = 0;
    /// Terminate the caller; never returns.
    pub const EXIT: u64 = 1;
    /// Block for at least `arg0` milliseconds.
    pub const SLEEP: u64 = 2;
    /// Return the caller's priority (0 with no current process).
    pub const GETPRIORITY: u64 = 3;
    /// Set the caller's priority, silently clamped.
    pub const SETPRIORITY: u64 = 4;
    /// Create a kernel thread: `arg0` = entry address, `arg1` = priority.
    pub const CREATE_THREAD: u64 = 5;
    pub const LOCK_INIT: u64 = 6;
    pub const LOCK_ACQUIRE: u64 = 7;
    pub const LOCK_RELEASE: u64 = 8;
    pub const CONDITION_INIT: u64 = 9;
    /// `arg0` = condition handle, `arg1` = lock handle.
    pub const CONDITION_WAIT: u64 = 10;
    pub const CONDITION_SIGNAL: u64 = 11;
    pub const CONDITION_BROADCAST: u64 = 12;
    /// `arg0` = initial value; negative values are rejected.
    pub const SEMAPHORE_INIT: u64 = 13;
    pub const SEMAPHORE_DOWN: u64 = 14;
    pub const SEMAPHORE_UP: u64 = 15;
    /// `arg0` = rendezvous threshold; values below 1 are rejected.
    pub const BARRIER_INIT: u64 = 16;
    pub const BARRIER_WAIT: u64 = 17;
}

/// Unknown syscall number.
pub const SYSCALL_ERR_UNSUPPORTED: u64 = u64::MAX;

/// Invalid argument combination for a known syscall.
pub const SYSCALL_ERR_INVALID_ARG: u64 = u64::MAX - 1;

/// A fixed kernel pool (PCB table or sync-object pool) is exhausted.
pub const SYSCALL_ERR_EXHAUSTED: u64 = u64::MAX - 2;

/// Successful syscall return code for void-like operations.
pub const SYSCALL_OK: u64 = 0;

/// Kernel-internal syscall error space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    Unsupported,
    InvalidArg,
    Exhausted,
}

pub type SyscallResult<T> = Result<T, SyscallError>;

/// Encodes a typed dispatch result into the sentinel-based raw ABI value.
#[inline]
pub fn syscall_result_to_raw(result: SyscallResult<u64>) -> u64 {
    match result {
        Ok(value) => value,
        Err(SyscallError::Unsupported) => SYSCALL_ERR_UNSUPPORTED,
        Err(SyscallError::InvalidArg) => SYSCALL_ERR_INVALID_ARG,
        Err(SyscallError::Exhausted) => SYSCALL_ERR_EXHAUSTED,
    }
}

/// Caller-facing syscall error space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    /// Unknown syscall number.
    Enosys,
    /// Invalid syscall arguments.
    Einval,
    /// Out of PCBs or sync objects.
    Enomem,
    /// Any unclassified return value in the error range.
    Unknown(u64),
}

/// Decodes a raw syscall return value into `Result`.
#[inline]
pub fn decode_result(raw: u64) -> Result<u64, SysError> {
    match raw {
        SYSCALL_ERR_UNSUPPORTED => Err(SysError::Enosys),
        SYSCALL_ERR_INVALID_ARG => Err(SysError::Einval),
        SYSCALL_ERR_EXHAUSTED => Err(SysError::Enomem),
        x if x >= SYSCALL_ERR_EXHAUSTED => Err(SysError::Unknown(x)),
        value => Ok(value),
    }
}
