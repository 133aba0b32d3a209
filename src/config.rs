//! Compile-time kernel configuration.

/// Capacity of the process table. PCBs are allocated from this fixed pool;
/// there is no dynamic allocation anywhere in the kernel.
pub const MAX_PROCESSES: usize = 32;

/// Periodic timer frequency programmed into PIT channel 0.
pub const TIMER_HZ: u32 = 100;

/// Milliseconds of wall time per timer tick.
pub const MS_PER_TICK: u64 = 1000 / TIMER_HZ as u64;

/// Lowest assignable process priority. Zero is reserved as the
/// "no current process" sentinel returned by `getpriority`.
pub const MIN_PRIORITY: i32 = 1;

/// Highest assignable process priority.
pub const MAX_PRIORITY: i32 = 64;

/// Priority given to freshly allocated PCBs.
pub const DEFAULT_PRIORITY: i32 = 32;

/// Size of each statically reserved kernel thread stack.
pub const KERNEL_STACK_SIZE: usize = 16 * 1024;

/// Pool capacities for kernel synchronization objects.
pub const MAX_LOCKS: usize = 16;
pub const MAX_CONDITIONS: usize = 16;
pub const MAX_SEMAPHORES: usize = 16;
pub const MAX_BARRIERS: usize = 8;
