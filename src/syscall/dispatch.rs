//! Kernel-side syscall dispatcher (`int 0x80` path).
//!
//! Responsibilities of this module:
//! - decode syscall number + ABI arguments,
//! - route to the corresponding kernel-state operation,
//! - enforce minimal argument validation at the syscall boundary,
//! - return stable numeric result/error codes to the caller context.
//!
//! ABI for [`dispatch`] (provided by the interrupt entry glue):
//! - `RAX` -> `syscall_nr`
//! - `RDI` -> `arg0`
//! - `RSI` -> `arg1`
//!
//! The dispatcher takes the kernel aggregate by reference instead of
//! touching the global singleton, so the entry glue decides the locking
//! scope and host tests can drive the full surface on a local [`Kernel`].

use core::sync::atomic::{AtomicBool, Ordering};

use crate::logging;
use crate::sched::{Kernel, ThreadEntry};
use crate::sync::{BarrierId, CondId, LockId, SemId, SyncError};

use super::types::{
    syscall_result_to_raw, SyscallError, SyscallId, SyscallResult, SYSCALL_OK,
};

/// Global switch for per-syscall trace logging (`[SYSCALL] ...` lines).
static SYSCALL_TRACE_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable/disable syscall trace logging.
pub fn set_syscall_trace_enabled(enabled: bool) {
    SYSCALL_TRACE_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns whether syscall trace logging is currently enabled.
pub fn syscall_trace_enabled() -> bool {
    SYSCALL_TRACE_ENABLED.load(Ordering::Relaxed)
}

/// Returns the stable human-readable name for a raw syscall number.
///
/// Used by dispatcher logging so serial traces remain understandable
/// without an external number-to-name table.
pub const fn syscall_name_for_number(syscall_nr: u64) -> &'static str {
    match syscall_nr {
        SyscallId::YIELD => "Yield",
        SyscallId::EXIT => "Exit",
        SyscallId::SLEEP => "Sleep",
        SyscallId::GETPRIORITY => "GetPriority",
        SyscallId::SETPRIORITY => "SetPriority",
        SyscallId::CREATE_THREAD => "CreateThread",
        SyscallId::LOCK_INIT => "LockInit",
        SyscallId::LOCK_ACQUIRE => "LockAcquire",
        SyscallId::LOCK_RELEASE => "LockRelease",
        SyscallId::CONDITION_INIT => "ConditionInit",
        SyscallId::CONDITION_WAIT => "ConditionWait",
        SyscallId::CONDITION_SIGNAL => "ConditionSignal",
        SyscallId::CONDITION_BROADCAST => "ConditionBroadcast",
        SyscallId::SEMAPHORE_INIT => "SemaphoreInit",
        SyscallId::SEMAPHORE_DOWN => "SemaphoreDown",
        SyscallId::SEMAPHORE_UP => "SemaphoreUp",
        SyscallId::BARRIER_INIT => "BarrierInit",
        SyscallId::BARRIER_WAIT => "BarrierWait",
        _ => "Unknown",
    }
}

impl From<SyncError> for SyscallError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidHandle | SyncError::InvalidArgument => SyscallError::InvalidArg,
            SyncError::Exhausted => SyscallError::Exhausted,
        }
    }
}

/// Resolves the syscall number and dispatches to the corresponding kernel
/// operation, returning kernel-internal typed results. Raw sentinel
/// conversion happens only at the ABI boundary in [`dispatch`].
pub fn dispatch_checked(
    kernel: &mut Kernel,
    syscall_nr: u64,
    arg0: u64,
    arg1: u64,
) -> SyscallResult<u64> {
    let result = match syscall_nr {
        SyscallId::YIELD => syscall_yield_impl(kernel),
        SyscallId::EXIT => syscall_exit_impl(kernel),
        SyscallId::SLEEP => syscall_sleep_impl(kernel, arg0),
        SyscallId::GETPRIORITY => syscall_getpriority_impl(kernel),
        SyscallId::SETPRIORITY => syscall_setpriority_impl(kernel, arg0),
        SyscallId::CREATE_THREAD => syscall_create_thread_impl(kernel, arg0, arg1),
        SyscallId::LOCK_INIT => kernel.lock_init().map(|id| id.0 as u64).map_err(Into::into),
        SyscallId::LOCK_ACQUIRE => void(kernel.lock_acquire(LockId(arg0 as usize))),
        SyscallId::LOCK_RELEASE => void(kernel.lock_release(LockId(arg0 as usize))),
        SyscallId::CONDITION_INIT => kernel
            .condition_init()
            .map(|id| id.0 as u64)
            .map_err(Into::into),
        SyscallId::CONDITION_WAIT => void(
            kernel.condition_wait(CondId(arg0 as usize), LockId(arg1 as usize)),
        ),
        SyscallId::CONDITION_SIGNAL => void(kernel.condition_signal(CondId(arg0 as usize))),
        SyscallId::CONDITION_BROADCAST => {
            void(kernel.condition_broadcast(CondId(arg0 as usize)))
        }
        SyscallId::SEMAPHORE_INIT => syscall_semaphore_init_impl(kernel, arg0),
        SyscallId::SEMAPHORE_DOWN => void(kernel.semaphore_down(SemId(arg0 as usize))),
        SyscallId::SEMAPHORE_UP => void(kernel.semaphore_up(SemId(arg0 as usize))),
        SyscallId::BARRIER_INIT => kernel
            .barrier_init(arg0 as u32)
            .map(|id| id.0 as u64)
            .map_err(Into::into),
        SyscallId::BARRIER_WAIT => void(kernel.barrier_wait(BarrierId(arg0 as usize))),
        _ => Err(SyscallError::Unsupported),
    };

    if syscall_trace_enabled() {
        logging::logln(
            "syscall",
            format_args!(
                "[SYSCALL] nr={} name={} arg0={:#x} arg1={:#x} ret={:#x}",
                syscall_nr,
                syscall_name_for_number(syscall_nr),
                arg0,
                arg1,
                syscall_result_to_raw(result)
            ),
        );
    }

    result
}

/// ABI-compatible raw dispatcher (`Result` encoded to sentinel `u64`s).
pub fn dispatch(kernel: &mut Kernel, syscall_nr: u64, arg0: u64, arg1: u64) -> u64 {
    syscall_result_to_raw(dispatch_checked(kernel, syscall_nr, arg0, arg1))
}

#[inline]
fn void(result: Result<(), SyncError>) -> SyscallResult<u64> {
    result.map(|()| SYSCALL_OK).map_err(Into::into)
}

/// Implements `Yield`: rotation plus dispatch. The entry glue performs the
/// actual stack switch from the updated current slot after dispatch.
fn syscall_yield_impl(kernel: &mut Kernel) -> SyscallResult<u64> {
    kernel.yield_now();
    Ok(SYSCALL_OK)
}

/// Implements `Exit`: the caller's PCB becomes `Exited` and a successor is
/// dispatched; the exited context is never resumed.
fn syscall_exit_impl(kernel: &mut Kernel) -> SyscallResult<u64> {
    kernel.exit_current();
    Ok(SYSCALL_OK)
}

/// Implements `Sleep(ms)`.
fn syscall_sleep_impl(kernel: &mut Kernel, ms: u64) -> SyscallResult<u64> {
    kernel.sleep_ms(ms);
    Ok(SYSCALL_OK)
}

/// Implements `GetPriority`. Returns 0 when there is no current process.
fn syscall_getpriority_impl(kernel: &mut Kernel) -> SyscallResult<u64> {
    Ok(kernel.priority() as u64)
}

/// Implements `SetPriority(p)`. Out-of-range values are silently clamped,
/// matching the cooperative-caller error model.
fn syscall_setpriority_impl(kernel: &mut Kernel, raw: u64) -> SyscallResult<u64> {
    let priority = (raw as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    kernel.set_priority(priority);
    Ok(SYSCALL_OK)
}

/// Implements `SemaphoreInit(value)`. A negative initial value (the raw
/// argument interpreted as a signed count) is rejected.
fn syscall_semaphore_init_impl(kernel: &mut Kernel, raw: u64) -> SyscallResult<u64> {
    let value = raw as i64;
    if value < 0 || value > u32::MAX as i64 {
        return Err(SyscallError::InvalidArg);
    }

    kernel
        .semaphore_init(value as u32)
        .map(|id| id.0 as u64)
        .map_err(Into::into)
}

/// Implements `CreateThread(entry, priority)`. Fails with an exhaustion
/// error when the PCB table is full.
fn syscall_create_thread_impl(kernel: &mut Kernel, entry: u64, priority: u64) -> SyscallResult<u64> {
    if entry == 0 {
        return Err(SyscallError::InvalidArg);
    }

    // SAFETY:
    // - This requires `unsafe` because an integer is reinterpreted as a
    //   function pointer, which Rust cannot validate.
    // - The caller is kernel-mode code passing the address of an
    //   `extern "C" fn() -> !`; a bogus address is a programmer error in
    //   the same class as a wild jump.
    let entry: ThreadEntry = unsafe { core::mem::transmute(entry) };
    let priority = (priority as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32;

    kernel
        .spawn(entry, priority)
        .map(|slot| kernel.pcb(slot).pid)
        .map_err(|_| SyscallError::Exhausted)
}
