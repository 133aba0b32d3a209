//! Blocking mutex over the scheduler's waiter machinery.
//!
//! `release` hands the lock directly to the head waiter instead of marking
//! it free and letting everyone race: the waiter becomes owner while still
//! parked-to-ready, so FIFO acquisition order is exact.

use crate::config::MAX_LOCKS;
use crate::sched::pcb::ProcessStatus;
use crate::sched::queue::FifoQueue;
use crate::sched::Kernel;
use crate::sync::SyncError;

/// Handle to a kernel mutex (index into the lock pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockId(pub usize);

#[derive(Clone, Copy)]
pub(crate) struct LockObj {
    pub(crate) in_use: bool,
    pub(crate) held: bool,
    pub(crate) owner: Option<crate::sched::pcb::Slot>,
    pub(crate) waiters: FifoQueue,
}

impl LockObj {
    pub(crate) const EMPTY: LockObj = LockObj {
        in_use: false,
        held: false,
        owner: None,
        waiters: FifoQueue::new(),
    };
}

impl Kernel {
    /// Claims a lock from the pool, initially free.
    pub fn lock_init(&mut self) -> Result<LockId, SyncError> {
        let id = self
            .locks
            .iter()
            .position(|lock| !lock.in_use)
            .ok_or(SyncError::Exhausted)?;

        self.locks[id] = LockObj {
            in_use: true,
            ..LockObj::EMPTY
        };
        Ok(LockId(id))
    }

    /// Acquires the lock for the current process, parking it on the lock's
    /// waiter queue (and dispatching a successor) if the lock is held.
    pub fn lock_acquire(&mut self, id: LockId) -> Result<(), SyncError> {
        self.check_lock(id)?;
        let Some(current) = self.current else {
            return Ok(());
        };

        if !self.locks[id.0].held {
            self.locks[id.0].held = true;
            self.locks[id.0].owner = Some(current);
            return Ok(());
        }

        self.pcbs[current].status = ProcessStatus::Waiting;
        self.locks[id.0].waiters.put(&mut self.pcbs, current);
        self.dispatch();
        Ok(())
    }

    /// Releases the lock. With waiters present, ownership transfers to the
    /// head waiter and it becomes ready; otherwise the lock is marked free.
    pub fn lock_release(&mut self, id: LockId) -> Result<(), SyncError> {
        self.check_lock(id)?;
        debug_assert!(
            self.locks[id.0].owner == self.current,
            "lock {} released by a process that does not hold it",
            id.0
        );

        if let Some(waiter) = self.locks[id.0].waiters.get(&mut self.pcbs) {
            self.locks[id.0].owner = Some(waiter);
            self.pcbs[waiter].pending_lock = None;
            self.pcbs[waiter].status = ProcessStatus::Ready;
            self.ready.put(&mut self.pcbs, waiter);
        } else {
            self.locks[id.0].held = false;
            self.locks[id.0].owner = None;
        }
        Ok(())
    }

    /// Whether the lock is currently held (diagnostics and tests).
    pub fn lock_is_held(&self, id: LockId) -> Result<bool, SyncError> {
        self.check_lock(id)?;
        Ok(self.locks[id.0].held)
    }

    /// Whether the current process owns the lock.
    pub fn lock_held_by_current(&self, id: LockId) -> Result<bool, SyncError> {
        self.check_lock(id)?;
        Ok(self.current.is_some() && self.locks[id.0].owner == self.current)
    }

    pub(crate) fn check_lock(&self, id: LockId) -> Result<(), SyncError> {
        if id.0 < MAX_LOCKS && self.locks[id.0].in_use {
            Ok(())
        } else {
            Err(SyncError::InvalidHandle)
        }
    }
}
