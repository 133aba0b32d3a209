//! Condition variables with Mesa semantics.
//!
//! `wait` releases the associated lock and parks the caller in one gate
//! section, so no wakeup can be lost between the release and the block.
//! `signal` makes the head waiter runnable but does not transfer the lock;
//! the waiter re-takes it at dispatch time (see [`Kernel::dispatch`]) and
//! re-parks on the lock's waiter queue if another process got there first.
//! The waiter therefore holds the lock again before it returns to its
//! caller, while lock contention stays ordinary FIFO.

use crate::config::MAX_CONDITIONS;
use crate::sched::pcb::ProcessStatus;
use crate::sched::queue::FifoQueue;
use crate::sched::Kernel;
use crate::sync::lock::LockId;
use crate::sync::SyncError;

/// Handle to a condition variable (index into the condition pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CondId(pub usize);

#[derive(Clone, Copy)]
pub(crate) struct CondObj {
    pub(crate) in_use: bool,
    pub(crate) waiters: FifoQueue,
}

impl CondObj {
    pub(crate) const EMPTY: CondObj = CondObj {
        in_use: false,
        waiters: FifoQueue::new(),
    };
}

impl Kernel {
    /// Claims a condition variable from the pool.
    pub fn condition_init(&mut self) -> Result<CondId, SyncError> {
        let id = self
            .conditions
            .iter()
            .position(|cond| !cond.in_use)
            .ok_or(SyncError::Exhausted)?;

        self.conditions[id] = CondObj {
            in_use: true,
            ..CondObj::EMPTY
        };
        Ok(CondId(id))
    }

    /// Atomically releases `lock` and blocks the caller on `cond`.
    ///
    /// The caller must hold `lock`; calling without it is a programmer
    /// error. Upon wake-up the process re-acquires the lock (possibly
    /// blocking again) before execution returns to its caller.
    pub fn condition_wait(&mut self, cond: CondId, lock: LockId) -> Result<(), SyncError> {
        self.check_condition(cond)?;
        self.check_lock(lock)?;
        let Some(current) = self.current else {
            return Ok(());
        };
        debug_assert!(
            self.locks[lock.0].owner == Some(current),
            "condition_wait on cond {} without holding lock {}",
            cond.0,
            lock.0
        );

        self.lock_release(lock)?;
        self.pcbs[current].pending_lock = Some(lock.0);
        self.pcbs[current].status = ProcessStatus::Waiting;
        self.conditions[cond.0].waiters.put(&mut self.pcbs, current);
        self.dispatch();
        Ok(())
    }

    /// Moves at most one waiter (the head) to the ready queue. No-op when
    /// nobody waits; the associated lock is not transferred.
    pub fn condition_signal(&mut self, cond: CondId) -> Result<(), SyncError> {
        self.check_condition(cond)?;
        if let Some(waiter) = self.conditions[cond.0].waiters.get(&mut self.pcbs) {
            self.pcbs[waiter].status = ProcessStatus::Ready;
            self.ready.put(&mut self.pcbs, waiter);
        }
        Ok(())
    }

    /// Moves every current waiter to the ready queue, preserving arrival
    /// order.
    pub fn condition_broadcast(&mut self, cond: CondId) -> Result<(), SyncError> {
        self.check_condition(cond)?;
        while let Some(waiter) = self.conditions[cond.0].waiters.get(&mut self.pcbs) {
            self.pcbs[waiter].status = ProcessStatus::Ready;
            self.ready.put(&mut self.pcbs, waiter);
        }
        Ok(())
    }

    /// Number of processes parked on `cond` (diagnostics and tests).
    pub fn condition_waiter_count(&self, cond: CondId) -> Result<usize, SyncError> {
        self.check_condition(cond)?;
        Ok(self.conditions[cond.0].waiters.len())
    }

    fn check_condition(&self, cond: CondId) -> Result<(), SyncError> {
        if cond.0 < MAX_CONDITIONS && self.conditions[cond.0].in_use {
            Ok(())
        } else {
            Err(SyncError::InvalidHandle)
        }
    }
}
