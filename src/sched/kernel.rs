//! The kernel state machine: process table, ready queue, current-running
//! slot, dispatcher, and the timer-driven preemption path.
//!
//! Every piece of mutable scheduler state is a field of [`Kernel`] and every
//! operation is a method taking `&mut self`; under the critical-section gate
//! the whole aggregate behaves as one linearizable object. The hardware
//! trampolines only ever touch it through [`crate::sched::KERNEL`].

use crate::arch::context;
use crate::config::{MAX_BARRIERS, MAX_CONDITIONS, MAX_LOCKS, MAX_PRIORITY, MAX_SEMAPHORES, MIN_PRIORITY};
use crate::sched::pcb::{PcbTable, ProcessStatus, Slot};
use crate::sched::queue::FifoQueue;
use crate::sync::barrier::BarrierObj;
use crate::sync::condvar::CondObj;
use crate::sync::lock::LockObj;
use crate::sync::semaphore::SemObj;

/// Entry point type for kernel threads.
///
/// Threads are entered through a synthetic interrupt-return frame on their
/// own kernel stack and are expected to never return; a return trap below
/// the initial frame routes an accidental return into `exit`.
pub type ThreadEntry = extern "C" fn() -> !;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// Every PCB slot is occupied.
    TableFull,
}

/// Snapshot of scheduler occupancy, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub ready: usize,
    pub sleeping: usize,
    /// PID of the current-running process, 0 when idle.
    pub current_pid: u64,
}

/// Process-wide kernel state aggregate.
pub struct Kernel {
    /// Timer interrupts since boot. Written exactly once per tick, always
    /// with the gate held, so 64-bit tearing cannot be observed.
    pub(crate) ticks: u64,
    pub(crate) pcbs: PcbTable,
    pub(crate) ready: FifoQueue,
    pub(crate) sleeping: FifoQueue,
    /// The PCB currently on the CPU; `None` when idle.
    pub(crate) current: Option<Slot>,
    pub(crate) locks: [LockObj; MAX_LOCKS],
    pub(crate) conditions: [CondObj; MAX_CONDITIONS],
    pub(crate) semaphores: [SemObj; MAX_SEMAPHORES],
    pub(crate) barriers: [BarrierObj; MAX_BARRIERS],
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            pcbs: PcbTable::new(),
            ready: FifoQueue::new(),
            sleeping: FifoQueue::new(),
            current: None,
            locks: [LockObj::EMPTY; MAX_LOCKS],
            conditions: [CondObj::EMPTY; MAX_CONDITIONS],
            semaphores: [SemObj::EMPTY; MAX_SEMAPHORES],
            barriers: [BarrierObj::EMPTY; MAX_BARRIERS],
        }
    }

    /// Creates a kernel thread: allocates a PCB, prepares its kernel stack
    /// so the first dispatch enters `entry`, and appends it to the ready
    /// queue. `priority` is clamped to the configured range.
    pub fn spawn(&mut self, entry: ThreadEntry, priority: i32) -> Result<Slot, SpawnError> {
        let slot = self.pcbs.allocate().ok_or(SpawnError::TableFull)?;

        let (saved_sp, stack_top) = context::prepare_thread_stack(slot, entry);
        self.pcbs[slot].saved_sp = saved_sp;
        self.pcbs[slot].kernel_stack_top = stack_top;
        self.pcbs[slot].priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);

        self.ready.put(&mut self.pcbs, slot);
        Ok(slot)
    }

    /// Marks `slot` runnable and appends it to the ready queue.
    pub fn add_ready(&mut self, slot: Slot) {
        self.pcbs[slot].status = ProcessStatus::Ready;
        self.ready.put(&mut self.pcbs, slot);
    }

    /// Dispatcher: installs the next runnable process as current-running.
    ///
    /// Pops the ready queue head; with an empty queue the current slot is
    /// left empty (idle) and the surrounding interrupt frame resumes the
    /// interrupted context. A process woken from a condition wait first
    /// re-takes its recorded lock here; if the lock is held again it goes
    /// back to that lock's waiter queue and the next ready head is tried.
    ///
    /// The dispatcher itself never switches stacks. The interrupt epilogue
    /// performs the switch by reloading the stack pointer through the
    /// `saved_sp` slot of whatever this installed as current.
    pub fn dispatch(&mut self) {
        while let Some(next) = self.ready.get(&mut self.pcbs) {
            if let Some(lock) = self.pcbs[next].pending_lock {
                if self.locks[lock].held {
                    // Mesa semantics: somebody else won the lock between the
                    // signal and this dispatch. Wait in line for the holder.
                    self.pcbs[next].status = ProcessStatus::Waiting;
                    self.locks[lock].waiters.put(&mut self.pcbs, next);
                    continue;
                }
                self.locks[lock].held = true;
                self.locks[lock].owner = Some(next);
                self.pcbs[next].pending_lock = None;
            }

            self.pcbs[next].status = ProcessStatus::Running;
            self.pcbs[next].nesting = 0;
            self.current = Some(next);
            return;
        }
        self.current = None;
    }

    /// Rotates the current process to the ready-queue tail (round-robin).
    ///
    /// No-op when idle or when the current process is no longer `Running`
    /// (it may already have gone to sleep or started waiting earlier in the
    /// same interrupt window).
    pub fn requeue_current(&mut self) {
        if let Some(current) = self.current {
            if self.pcbs[current].status == ProcessStatus::Running {
                self.pcbs[current].status = ProcessStatus::Ready;
                self.ready.put(&mut self.pcbs, current);
            }
        }
    }

    /// Voluntary reschedule: rotation plus dispatch in one gate section.
    pub fn yield_now(&mut self) {
        self.requeue_current();
        self.dispatch();
    }

    /// Terminates the current process and dispatches a successor.
    ///
    /// The PCB stays `Exited` and keeps its slot so the record remains
    /// inspectable; reclamation is an explicit
    /// [`release_pcb`](Self::release_pcb) by a supervisor.
    pub fn exit_current(&mut self) {
        if let Some(current) = self.current {
            self.pcbs[current].status = ProcessStatus::Exited;
        }
        self.dispatch();
    }

    /// Priority of the current process, or 0 when idle.
    pub fn priority(&self) -> i32 {
        match self.current {
            Some(current) => self.pcbs[current].priority,
            None => 0,
        }
    }

    /// Sets the current process's priority, silently clamped.
    pub fn set_priority(&mut self, priority: i32) {
        if let Some(current) = self.current {
            self.pcbs[current].priority = priority.clamp(MIN_PRIORITY, MAX_PRIORITY);
        }
    }

    /// Full software path of one timer interrupt: tick the clock, wake due
    /// sleepers, then preempt or defer.
    pub fn timer_tick(&mut self) {
        self.tick_increment();
        self.wake_sleepers();
        self.preempt_or_defer();
    }

    /// Advances the 64-bit tick counter. Called with the gate held.
    pub fn tick_increment(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    /// Round-robin rotation, unless the current process is mid-syscall.
    ///
    /// A non-zero nesting depth means the process owns kernel invariants
    /// that cannot be abandoned, so the context switch is deferred to a
    /// later tick; sleepers were already woken by the caller because wake-ups
    /// are pure queue mutations and always safe.
    pub fn preempt_or_defer(&mut self) {
        if let Some(current) = self.current {
            if self.pcbs[current].nesting != 0 {
                return;
            }
        }
        self.requeue_current();
        self.dispatch();
    }

    /// Marks syscall entry for the current process (preemption off).
    pub fn syscall_enter(&mut self) {
        if let Some(current) = self.current {
            self.pcbs[current].nesting += 1;
        }
    }

    /// Marks syscall exit. A process that blocked during the syscall is no
    /// longer current and has its depth reset on its next dispatch, so the
    /// decrement only applies when the depth is still positive.
    pub fn syscall_leave(&mut self) {
        if let Some(current) = self.current {
            if self.pcbs[current].nesting > 0 {
                self.pcbs[current].nesting -= 1;
            }
        }
    }

    /// Records the interrupted stack pointer into the current PCB.
    pub fn record_current_sp(&mut self, sp: u64) {
        if let Some(current) = self.current {
            self.pcbs[current].saved_sp = sp;
        }
    }

    /// Stack pointer to resume after dispatch, `None` when idle.
    pub fn resume_sp(&self) -> Option<u64> {
        self.current.map(|current| self.pcbs[current].saved_sp)
    }

    pub fn current_slot(&self) -> Option<Slot> {
        self.current
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read-only view of one PCB.
    pub fn pcb(&self, slot: Slot) -> &crate::sched::pcb::Pcb {
        &self.pcbs[slot]
    }

    pub fn find_by_pid(&self, pid: u64) -> Option<Slot> {
        self.pcbs.find_by_pid(pid)
    }

    /// Returns an `Exited` PCB to the free pool.
    pub fn release_pcb(&mut self, slot: Slot) {
        debug_assert!(
            self.current != Some(slot),
            "releasing the current-running PCB"
        );
        self.pcbs.release(slot);
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks,
            ready: self.ready.len(),
            sleeping: self.sleeping.len(),
            current_pid: match self.current {
                Some(current) => self.pcbs[current].pid,
                None => 0,
            },
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
