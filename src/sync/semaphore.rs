//! Counting semaphores with direct handoff.
//!
//! `up` never increments the count while a waiter exists: the permit moves
//! straight from the releaser to the head waiter. This is what keeps the
//! accounting exact: at all times the count plus the number of `down`
//! calls that have completed equals the number of `up` calls plus the
//! initial value, and the count never goes negative.

use crate::config::MAX_SEMAPHORES;
use crate::sched::pcb::ProcessStatus;
use crate::sched::queue::FifoQueue;
use crate::sched::Kernel;
use crate::sync::SyncError;

/// Handle to a counting semaphore (index into the semaphore pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemId(pub usize);

#[derive(Clone, Copy)]
pub(crate) struct SemObj {
    pub(crate) in_use: bool,
    pub(crate) value: u32,
    pub(crate) waiters: FifoQueue,
}

impl SemObj {
    pub(crate) const EMPTY: SemObj = SemObj {
        in_use: false,
        value: 0,
        waiters: FifoQueue::new(),
    };
}

impl Kernel {
    /// Claims a semaphore from the pool with the given initial value.
    pub fn semaphore_init(&mut self, value: u32) -> Result<SemId, SyncError> {
        let id = self
            .semaphores
            .iter()
            .position(|sem| !sem.in_use)
            .ok_or(SyncError::Exhausted)?;

        self.semaphores[id] = SemObj {
            in_use: true,
            value,
            waiters: FifoQueue::new(),
        };
        Ok(SemId(id))
    }

    /// P operation: takes a permit, or parks the caller when none is
    /// available.
    pub fn semaphore_down(&mut self, id: SemId) -> Result<(), SyncError> {
        self.check_semaphore(id)?;
        let Some(current) = self.current else {
            return Ok(());
        };

        if self.semaphores[id.0].value > 0 {
            self.semaphores[id.0].value -= 1;
            return Ok(());
        }

        self.pcbs[current].status = ProcessStatus::Waiting;
        self.semaphores[id.0].waiters.put(&mut self.pcbs, current);
        self.dispatch();
        Ok(())
    }

    /// V operation: hands the permit to the head waiter if one exists
    /// (the count is deliberately not incremented), otherwise bumps the
    /// count.
    pub fn semaphore_up(&mut self, id: SemId) -> Result<(), SyncError> {
        self.check_semaphore(id)?;

        if let Some(waiter) = self.semaphores[id.0].waiters.get(&mut self.pcbs) {
            self.pcbs[waiter].status = ProcessStatus::Ready;
            self.ready.put(&mut self.pcbs, waiter);
        } else {
            self.semaphores[id.0].value += 1;
        }
        Ok(())
    }

    /// Current count (diagnostics and tests).
    pub fn semaphore_value(&self, id: SemId) -> Result<u32, SyncError> {
        self.check_semaphore(id)?;
        Ok(self.semaphores[id.0].value)
    }

    /// Number of processes parked on the semaphore (diagnostics and tests).
    pub fn semaphore_waiter_count(&self, id: SemId) -> Result<usize, SyncError> {
        self.check_semaphore(id)?;
        Ok(self.semaphores[id.0].waiters.len())
    }

    fn check_semaphore(&self, id: SemId) -> Result<(), SyncError> {
        if id.0 < MAX_SEMAPHORES && self.semaphores[id.0].in_use {
            Ok(())
        } else {
            Err(SyncError::InvalidHandle)
        }
    }
}
