//! Reusable barriers.
//!
//! The first `n - 1` arrivers park on the waiter queue; the `n`-th resets
//! the arrival count, releases everyone, and returns without blocking.
//! Because both the count and the queue are reset before the release, the
//! same barrier object is immediately usable for the next generation.

use crate::config::MAX_BARRIERS;
use crate::sched::pcb::ProcessStatus;
use crate::sched::queue::FifoQueue;
use crate::sched::Kernel;
use crate::sync::SyncError;

/// Handle to a barrier (index into the barrier pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierId(pub usize);

#[derive(Clone, Copy)]
pub(crate) struct BarrierObj {
    pub(crate) in_use: bool,
    /// Rendezvous threshold, fixed at init.
    pub(crate) n: u32,
    /// Arrivals in the current generation, always in `0..n`.
    pub(crate) arrived: u32,
    pub(crate) waiters: FifoQueue,
}

impl BarrierObj {
    pub(crate) const EMPTY: BarrierObj = BarrierObj {
        in_use: false,
        n: 0,
        arrived: 0,
        waiters: FifoQueue::new(),
    };
}

impl Kernel {
    /// Claims a barrier from the pool. Rejects a threshold below 1.
    pub fn barrier_init(&mut self, n: u32) -> Result<BarrierId, SyncError> {
        if n < 1 {
            return Err(SyncError::InvalidArgument);
        }

        let id = self
            .barriers
            .iter()
            .position(|barrier| !barrier.in_use)
            .ok_or(SyncError::Exhausted)?;

        self.barriers[id] = BarrierObj {
            in_use: true,
            n,
            arrived: 0,
            waiters: FifoQueue::new(),
        };
        Ok(BarrierId(id))
    }

    /// Arrives at the barrier; parks unless this is the `n`-th arrival, in
    /// which case the whole generation is released and the caller keeps
    /// running.
    pub fn barrier_wait(&mut self, id: BarrierId) -> Result<(), SyncError> {
        self.check_barrier(id)?;
        let Some(current) = self.current else {
            return Ok(());
        };

        self.barriers[id.0].arrived += 1;
        if self.barriers[id.0].arrived < self.barriers[id.0].n {
            self.pcbs[current].status = ProcessStatus::Waiting;
            self.barriers[id.0].waiters.put(&mut self.pcbs, current);
            self.dispatch();
            return Ok(());
        }

        self.barriers[id.0].arrived = 0;
        while let Some(waiter) = self.barriers[id.0].waiters.get(&mut self.pcbs) {
            self.pcbs[waiter].status = ProcessStatus::Ready;
            self.ready.put(&mut self.pcbs, waiter);
        }
        Ok(())
    }

    /// Arrival count of the current generation (diagnostics and tests).
    pub fn barrier_arrived(&self, id: BarrierId) -> Result<u32, SyncError> {
        self.check_barrier(id)?;
        Ok(self.barriers[id.0].arrived)
    }

    fn check_barrier(&self, id: BarrierId) -> Result<(), SyncError> {
        if id.0 < MAX_BARRIERS && self.barriers[id.0].in_use {
            Ok(())
        } else {
            Err(SyncError::InvalidHandle)
        }
    }
}
