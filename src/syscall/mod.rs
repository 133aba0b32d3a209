//! Syscall table and dispatcher entry point.
//!
//! The low-level `int 0x80` glue passes `(syscall_nr, arg0, arg1)` into
//! [`dispatch`]. Types and ABI constants live in `types`, kernel dispatch
//! logic in `dispatch`.

mod dispatch;
mod types;

pub use dispatch::{
    dispatch, dispatch_checked, set_syscall_trace_enabled, syscall_name_for_number,
    syscall_trace_enabled,
};
pub use types::{
    decode_result, syscall_result_to_raw, SysError, SyscallError, SyscallId, SyscallResult,
    SYSCALL_ERR_EXHAUSTED, SYSCALL_ERR_INVALID_ARG, SYSCALL_ERR_UNSUPPORTED, SYSCALL_OK,
};
