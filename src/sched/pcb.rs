//! Process control blocks and the fixed-capacity process table.
//!
//! Layout contract:
//! - `saved_sp` must stay the **first** field of [`Pcb`]. The interrupt
//!   trampolines save and reload the kernel stack pointer through the raw
//!   address of the current PCB, so `&pcb as *const _` must equal
//!   `&pcb.saved_sp as *const _`. The struct is `#[repr(C)]` and the offset
//!   is pinned by a layout test; do not rely on declaration order alone.

use core::ops::{Index, IndexMut};

use crate::config::{DEFAULT_PRIORITY, MAX_PROCESSES};
use crate::sched::queue::QueueNode;

/// Index of a PCB in the process table. Queues, the current-running slot,
/// and all waiter bookkeeping speak in slots.
pub type Slot = usize;

/// Lifecycle state of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Table entry is unoccupied; `pid` is 0.
    Free,
    /// Runnable, linked into the ready queue.
    Ready,
    /// On the CPU; never linked into any queue.
    Running,
    /// Blocked until `wakeup_tick`, linked into the sleeping queue.
    Sleeping,
    /// Blocked on a synchronization object, linked into its waiter queue.
    Waiting,
    /// Terminated. The slot stays reserved until explicitly released.
    Exited,
}

/// Per-process kernel record.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Pcb {
    /// Saved kernel stack pointer. Must remain at offset 0 (see module doc).
    pub saved_sp: u64,
    /// Process identifier; positive when live, 0 when the slot is free.
    pub pid: u64,
    pub status: ProcessStatus,
    /// Advisory only: stored and clamped, never consulted for dispatch.
    pub priority: i32,
    /// Syscall nesting depth. Non-zero means the process is mid-syscall and
    /// must not be preempted by the timer.
    pub nesting: u32,
    /// Tick at or after which a `Sleeping` process becomes runnable.
    pub wakeup_tick: u64,
    /// Top of this process's kernel stack, used for the first dispatch.
    pub kernel_stack_top: u64,
    /// When a process woken from a condition wait is dispatched, it must
    /// first re-take this lock (pool index); it re-parks on the lock's
    /// waiter queue if some other process got there first.
    pub(crate) pending_lock: Option<usize>,
    /// Embedded queue linkage; a PCB is in at most one queue at a time.
    pub(crate) node: QueueNode,
}

impl Pcb {
    pub(crate) const EMPTY: Pcb = Pcb {
        saved_sp: 0,
        pid: 0,
        status: ProcessStatus::Free,
        priority: DEFAULT_PRIORITY,
        nesting: 0,
        wakeup_tick: 0,
        kernel_stack_top: 0,
        pending_lock: None,
        node: QueueNode::new(),
    };

    pub fn is_free(&self) -> bool {
        self.status == ProcessStatus::Free
    }
}

/// Fixed pool of PCBs with a monotonically increasing PID counter.
///
/// PIDs are never reused within a boot; a table slot is reused only after
/// its occupant has been released back to `Free`.
pub struct PcbTable {
    entries: [Pcb; MAX_PROCESSES],
    next_pid: u64,
}

impl PcbTable {
    pub const fn new() -> Self {
        Self {
            entries: [Pcb::EMPTY; MAX_PROCESSES],
            next_pid: 1,
        }
    }

    /// Claims the first free slot: assigns the next PID, resets the record
    /// to `Ready` with default priority. The caller is expected to enqueue
    /// the slot on the ready queue. Returns `None` when the table is full.
    pub fn allocate(&mut self) -> Option<Slot> {
        let slot = self.entries.iter().position(Pcb::is_free)?;

        let pid = self.next_pid;
        self.next_pid += 1;

        self.entries[slot] = Pcb {
            pid,
            status: ProcessStatus::Ready,
            ..Pcb::EMPTY
        };
        Some(slot)
    }

    /// Returns `slot` to the free pool. The caller must have unlinked it
    /// from every queue first.
    pub fn release(&mut self, slot: Slot) {
        debug_assert!(
            !self.entries[slot].node.is_linked(),
            "releasing PCB slot {} while still linked into a queue",
            slot
        );
        self.entries[slot].status = ProcessStatus::Free;
        self.entries[slot].pid = 0;
    }

    /// PID lookup over the table, skipping free slots.
    pub fn find_by_pid(&self, pid: u64) -> Option<Slot> {
        self.entries
            .iter()
            .position(|pcb| pcb.pid == pid && !pcb.is_free())
    }

    pub const fn capacity() -> usize {
        MAX_PROCESSES
    }

    pub(crate) fn node(&self, slot: Slot) -> &QueueNode {
        &self.entries[slot].node
    }

    pub(crate) fn node_mut(&mut self, slot: Slot) -> &mut QueueNode {
        &mut self.entries[slot].node
    }
}

impl Default for PcbTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Slot> for PcbTable {
    type Output = Pcb;

    fn index(&self, slot: Slot) -> &Pcb {
        &self.entries[slot]
    }
}

impl IndexMut<Slot> for PcbTable {
    fn index_mut(&mut self, slot: Slot) -> &mut Pcb {
        &mut self.entries[slot]
    }
}
