//! Scheduler module facade.
//!
//! The kernel state machine lives in `kernel.rs`; PCBs and their table in
//! `pcb.rs`, the index-linked FIFO in `queue.rs`, and the sleep subsystem
//! in `sleep.rs`. Everything is re-exported here so call sites can stay on
//! `crate::sched::*`.

mod kernel;
pub(crate) mod pcb;
pub(crate) mod queue;
mod sleep;

pub use kernel::{Kernel, SchedulerStats, SpawnError, ThreadEntry};
pub use pcb::{Pcb, PcbTable, ProcessStatus, Slot};
pub use queue::FifoQueue;
pub use sleep::ms_to_ticks;

use crate::sync::gate::GateLock;

/// The kernel-state singleton reached from the interrupt trampolines.
///
/// All scheduler and synchronization state is owned by one [`Kernel`]
/// aggregate; this static exists only because the IRQ0 and `int 0x80` entry
/// stubs cannot take parameters. Every other caller (and every test) goes
/// through a `&mut Kernel`.
pub static KERNEL: GateLock<Kernel> = GateLock::new(Kernel::new());
