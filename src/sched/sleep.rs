//! Blocking sleep: wakeup-tick bookkeeping and the per-tick wake-up scan.

use crate::config::MS_PER_TICK;
use crate::sched::kernel::Kernel;
use crate::sched::pcb::ProcessStatus;

/// Ticks needed to cover at least `ms` milliseconds, rounded up.
pub const fn ms_to_ticks(ms: u64) -> u64 {
    ms.div_ceil(MS_PER_TICK)
}

impl Kernel {
    /// Blocks the current process for at least `ms` milliseconds.
    ///
    /// Records the wakeup tick, parks the caller on the sleeping queue, and
    /// dispatches the next ready process (leaving the CPU idle if there is
    /// none). Control leaves the caller when the surrounding interrupt frame
    /// restores the new current process.
    pub fn sleep_ms(&mut self, ms: u64) {
        let Some(current) = self.current else {
            return;
        };

        self.pcbs[current].wakeup_tick = self.ticks + ms_to_ticks(ms);
        self.pcbs[current].status = ProcessStatus::Sleeping;
        self.sleeping.put(&mut self.pcbs, current);
        self.dispatch();
    }

    /// One pass over the sleeping queue, moving every due process
    /// (`ticks >= wakeup_tick`) to the ready queue.
    ///
    /// The queue is unsorted (arrival order), so the scan re-appends
    /// not-yet-due sleepers behind the cursor. Bounding the pass by the
    /// queue's size at entry guarantees termination and a per-tick cost
    /// proportional to the number of sleepers.
    pub fn wake_sleepers(&mut self) {
        let pending = self.sleeping.len();
        for _ in 0..pending {
            let Some(slot) = self.sleeping.get(&mut self.pcbs) else {
                break;
            };

            if self.ticks >= self.pcbs[slot].wakeup_tick {
                self.pcbs[slot].status = ProcessStatus::Ready;
                self.ready.put(&mut self.pcbs, slot);
            } else {
                self.sleeping.put(&mut self.pcbs, slot);
            }
        }
    }
}
