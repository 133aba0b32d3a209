//! Synchronization primitive tests: mutex handoff, Mesa condition
//! variables, semaphore accounting, and barrier rendezvous.

use kronos_kernel::config::{MAX_BARRIERS, MAX_CONDITIONS, MAX_LOCKS, MAX_SEMAPHORES};
use kronos_kernel::sched::{Kernel, ProcessStatus};
use kronos_kernel::sync::SyncError;

extern "C" fn thread_main() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

fn kernel_with(count: usize) -> Kernel {
    let mut kernel = Kernel::new();
    for _ in 0..count {
        kernel.spawn(thread_main, 10).expect("spawn within capacity");
    }
    kernel.dispatch();
    kernel
}

// ─── locks ───

#[test]
fn uncontended_lock_is_taken_without_blocking() {
    let mut kernel = kernel_with(1);
    let lock = kernel.lock_init().unwrap();

    kernel.lock_acquire(lock).unwrap();
    assert!(kernel.lock_is_held(lock).unwrap());
    assert!(kernel.lock_held_by_current(lock).unwrap());

    kernel.lock_release(lock).unwrap();
    assert!(!kernel.lock_is_held(lock).unwrap());
}

#[test]
fn contended_lock_parks_and_hands_off_fifo() {
    let mut kernel = kernel_with(3);
    let lock = kernel.lock_init().unwrap();
    let holder = kernel.current_slot().unwrap();

    kernel.lock_acquire(lock).unwrap();
    kernel.yield_now();

    // Second process contends and parks.
    let second = kernel.current_slot().unwrap();
    kernel.lock_acquire(lock).unwrap();
    assert_eq!(kernel.pcb(second).status, ProcessStatus::Waiting);

    // Third process contends and parks behind it.
    let third = kernel.current_slot().unwrap();
    kernel.lock_acquire(lock).unwrap();
    assert_eq!(kernel.pcb(third).status, ProcessStatus::Waiting);

    // Holder runs again and releases: ownership hands off to the first
    // waiter without ever marking the lock free.
    assert_eq!(kernel.current_slot(), Some(holder));
    kernel.lock_release(lock).unwrap();
    assert!(kernel.lock_is_held(lock).unwrap());
    assert_eq!(kernel.pcb(second).status, ProcessStatus::Ready);
    assert_eq!(kernel.pcb(third).status, ProcessStatus::Waiting);

    kernel.yield_now();
    assert_eq!(kernel.current_slot(), Some(second));
    assert!(kernel.lock_held_by_current(lock).unwrap());

    kernel.lock_release(lock).unwrap();
    assert_eq!(kernel.pcb(third).status, ProcessStatus::Ready);
}

#[test]
fn lock_handle_validation() {
    let mut kernel = kernel_with(1);
    assert_eq!(
        kernel.lock_acquire(kronos_kernel::sync::LockId(3)),
        Err(SyncError::InvalidHandle)
    );

    for _ in 0..MAX_LOCKS {
        kernel.lock_init().unwrap();
    }
    assert_eq!(kernel.lock_init(), Err(SyncError::Exhausted));
}

// ─── condition variables ───

#[test]
fn condition_wait_releases_lock_and_parks() {
    let mut kernel = kernel_with(2);
    let lock = kernel.lock_init().unwrap();
    let cond = kernel.condition_init().unwrap();
    let consumer = kernel.current_slot().unwrap();

    kernel.lock_acquire(lock).unwrap();
    kernel.condition_wait(cond, lock).unwrap();

    assert_eq!(kernel.pcb(consumer).status, ProcessStatus::Waiting);
    assert!(!kernel.lock_is_held(lock).unwrap(), "wait must release the lock");
    assert_eq!(kernel.condition_waiter_count(cond).unwrap(), 1);
    assert_ne!(kernel.current_slot(), Some(consumer));
}

#[test]
fn signal_wakes_one_waiter_which_reacquires_the_lock() {
    // Producer/consumer handshake: the consumer holds the lock again
    // before its wait returns.
    let mut kernel = kernel_with(2);
    let lock = kernel.lock_init().unwrap();
    let cond = kernel.condition_init().unwrap();
    let consumer = kernel.current_slot().unwrap();

    kernel.lock_acquire(lock).unwrap();
    kernel.condition_wait(cond, lock).unwrap();

    // Producer: lock, "write", signal, unlock.
    let producer = kernel.current_slot().unwrap();
    kernel.lock_acquire(lock).unwrap();
    kernel.condition_signal(cond).unwrap();
    assert_eq!(kernel.condition_waiter_count(cond).unwrap(), 0);
    assert_eq!(kernel.pcb(consumer).status, ProcessStatus::Ready);
    kernel.lock_release(lock).unwrap();

    kernel.yield_now();
    assert_eq!(kernel.current_slot(), Some(consumer));
    assert!(
        kernel.lock_held_by_current(lock).unwrap(),
        "woken waiter must hold the lock before returning"
    );
    let _ = producer;
}

#[test]
fn woken_waiter_reparks_when_lock_is_still_contended() {
    let mut kernel = kernel_with(2);
    let lock = kernel.lock_init().unwrap();
    let cond = kernel.condition_init().unwrap();
    let consumer = kernel.current_slot().unwrap();

    kernel.lock_acquire(lock).unwrap();
    kernel.condition_wait(cond, lock).unwrap();

    // Producer signals while still holding the lock, then yields without
    // releasing: the woken consumer must fall back to the lock queue.
    let producer = kernel.current_slot().unwrap();
    kernel.lock_acquire(lock).unwrap();
    kernel.condition_signal(cond).unwrap();
    kernel.yield_now();

    assert_eq!(kernel.current_slot(), Some(producer));
    assert_eq!(kernel.pcb(consumer).status, ProcessStatus::Waiting);

    // Release hands the lock straight to the consumer.
    kernel.lock_release(lock).unwrap();
    assert_eq!(kernel.pcb(consumer).status, ProcessStatus::Ready);
    kernel.yield_now();
    assert_eq!(kernel.current_slot(), Some(consumer));
    assert!(kernel.lock_held_by_current(lock).unwrap());
}

#[test]
fn signal_on_empty_condition_is_a_noop() {
    let mut kernel = kernel_with(1);
    let cond = kernel.condition_init().unwrap();
    kernel.condition_signal(cond).unwrap();
    assert_eq!(kernel.condition_waiter_count(cond).unwrap(), 0);
}

#[test]
fn broadcast_wakes_all_waiters_in_arrival_order() {
    let mut kernel = kernel_with(4);
    let lock = kernel.lock_init().unwrap();
    let cond = kernel.condition_init().unwrap();

    let mut waiters = Vec::new();
    for _ in 0..3 {
        waiters.push(kernel.current_slot().unwrap());
        kernel.lock_acquire(lock).unwrap();
        kernel.condition_wait(cond, lock).unwrap();
    }
    assert_eq!(kernel.condition_waiter_count(cond).unwrap(), 3);

    kernel.condition_broadcast(cond).unwrap();
    assert_eq!(kernel.condition_waiter_count(cond).unwrap(), 0);
    for &waiter in &waiters {
        assert_eq!(kernel.pcb(waiter).status, ProcessStatus::Ready);
    }

    // The lock is free, so the waiters reacquire it one at a time in the
    // order they originally waited.
    kernel.yield_now();
    assert_eq!(kernel.current_slot(), Some(waiters[0]));
    assert!(kernel.lock_held_by_current(lock).unwrap());
}

#[test]
fn condition_pool_exhaustion() {
    let mut kernel = kernel_with(1);
    for _ in 0..MAX_CONDITIONS {
        kernel.condition_init().unwrap();
    }
    assert_eq!(kernel.condition_init(), Err(SyncError::Exhausted));
}

// ─── semaphores ───

#[test]
fn semaphore_down_consumes_available_permits() {
    let mut kernel = kernel_with(1);
    let sem = kernel.semaphore_init(2).unwrap();

    kernel.semaphore_down(sem).unwrap();
    kernel.semaphore_down(sem).unwrap();
    assert_eq!(kernel.semaphore_value(sem).unwrap(), 0);
    assert_eq!(kernel.semaphore_waiter_count(sem).unwrap(), 0);
}

#[test]
fn three_downs_two_ups_leave_one_waiter() {
    // Semaphore initialized to 0; three processes call down, two ups
    // arrive. Exactly two down-callers resume, one stays waiting, and the
    // count remains 0 throughout (direct handoff).
    let mut kernel = kernel_with(4);
    let sem = kernel.semaphore_init(0).unwrap();

    let mut downers = Vec::new();
    for _ in 0..3 {
        downers.push(kernel.current_slot().unwrap());
        kernel.semaphore_down(sem).unwrap();
    }
    assert_eq!(kernel.semaphore_waiter_count(sem).unwrap(), 3);

    kernel.semaphore_up(sem).unwrap();
    kernel.semaphore_up(sem).unwrap();

    assert_eq!(kernel.pcb(downers[0]).status, ProcessStatus::Ready);
    assert_eq!(kernel.pcb(downers[1]).status, ProcessStatus::Ready);
    assert_eq!(kernel.pcb(downers[2]).status, ProcessStatus::Waiting);
    assert_eq!(kernel.semaphore_value(sem).unwrap(), 0, "handoff must not bump the count");
    assert_eq!(kernel.semaphore_waiter_count(sem).unwrap(), 1);
}

#[test]
fn up_without_waiters_increments_value() {
    let mut kernel = kernel_with(1);
    let sem = kernel.semaphore_init(0).unwrap();

    kernel.semaphore_up(sem).unwrap();
    kernel.semaphore_up(sem).unwrap();
    assert_eq!(kernel.semaphore_value(sem).unwrap(), 2);
}

#[test]
fn semaphore_wakes_in_fifo_order() {
    let mut kernel = kernel_with(3);
    let sem = kernel.semaphore_init(0).unwrap();

    let first = kernel.current_slot().unwrap();
    kernel.semaphore_down(sem).unwrap();
    let second = kernel.current_slot().unwrap();
    kernel.semaphore_down(sem).unwrap();

    kernel.semaphore_up(sem).unwrap();
    assert_eq!(kernel.pcb(first).status, ProcessStatus::Ready);
    assert_eq!(kernel.pcb(second).status, ProcessStatus::Waiting);
}

#[test]
fn semaphore_pool_exhaustion() {
    let mut kernel = kernel_with(1);
    for _ in 0..MAX_SEMAPHORES {
        kernel.semaphore_init(1).unwrap();
    }
    assert_eq!(kernel.semaphore_init(1), Err(SyncError::Exhausted));
}

// ─── barriers ───

#[test]
fn barrier_init_rejects_zero_threshold() {
    let mut kernel = kernel_with(1);
    assert_eq!(kernel.barrier_init(0), Err(SyncError::InvalidArgument));
    assert!(kernel.barrier_init(1).is_ok());
}

#[test]
fn barrier_of_one_never_blocks() {
    let mut kernel = kernel_with(1);
    let barrier = kernel.barrier_init(1).unwrap();
    let only = kernel.current_slot().unwrap();

    kernel.barrier_wait(barrier).unwrap();
    assert_eq!(kernel.current_slot(), Some(only));
    assert_eq!(kernel.barrier_arrived(barrier).unwrap(), 0);
}

#[test]
fn barrier_rendezvous_releases_all_and_is_reusable() {
    // Four processes arrive at staggered times; none returns before the
    // fourth enters, then all four proceed and the barrier resets for an
    // identical second round.
    let mut kernel = kernel_with(4);
    let barrier = kernel.barrier_init(4).unwrap();

    for round in 0..2 {
        let mut early = Vec::new();
        for _ in 0..3 {
            early.push(kernel.current_slot().unwrap());
            kernel.barrier_wait(barrier).unwrap();
        }
        for &slot in &early {
            assert_eq!(kernel.pcb(slot).status, ProcessStatus::Waiting);
        }
        assert_eq!(kernel.barrier_arrived(barrier).unwrap(), 3);

        let last = kernel.current_slot().unwrap();
        kernel.barrier_wait(barrier).unwrap();
        assert_eq!(
            kernel.current_slot(),
            Some(last),
            "last arriver must not block (round {})",
            round
        );
        for &slot in &early {
            assert_eq!(kernel.pcb(slot).status, ProcessStatus::Ready);
        }
        assert_eq!(kernel.barrier_arrived(barrier).unwrap(), 0);

        // Let the released processes run so the next round starts clean.
        kernel.yield_now();
    }
}

#[test]
fn barrier_pool_exhaustion() {
    let mut kernel = kernel_with(1);
    for _ in 0..MAX_BARRIERS {
        kernel.barrier_init(2).unwrap();
    }
    assert_eq!(kernel.barrier_init(2), Err(SyncError::Exhausted));
}
