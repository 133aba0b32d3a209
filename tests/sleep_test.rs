//! Sleep subsystem tests: wakeup arithmetic, the per-tick scan, and the
//! all-asleep idle path.
//!
//! `MS_PER_TICK` is 10, so `sleep(50)` means "ready no earlier than five
//! ticks from now".

use kronos_kernel::config::MS_PER_TICK;
use kronos_kernel::sched::{ms_to_ticks, Kernel, ProcessStatus};

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
    kernel
}

#[test]
fn sleep_records_rounded_up_wakeup_tick() {
    let mut kernel = kernel_with(2);
    kernel.dispatch();
    let sleeper = kernel.current_slot().unwrap();

    kernel.sleep_ms(45);
    assert_eq!(kernel.pcb(sleeper).status, ProcessStatus::Sleeping);
    assert_eq!(kernel.pcb(sleeper).wakeup_tick, ms_to_ticks(45));
    assert_eq!(kernel.pcb(sleeper).wakeup_tick, 5, "45 ms rounds up to 5 ticks");
}

#[test]
fn sleeper_wakes_no_earlier_than_its_deadline() {
    // Process A sleeps 50 ms at tick 0; B runs in the meantime. A becomes
    // ready no earlier than tick 5 and is running by tick 6.
    let mut kernel = kernel_with(2);
    kernel.dispatch();
    let a = kernel.current_slot().unwrap();

    kernel.sleep_ms(5 * MS_PER_TICK);
    let b = kernel.current_slot().unwrap();
    assert_ne!(a, b);

    for _ in 1..=4 {
        kernel.timer_tick();
        assert_eq!(
            kernel.pcb(a).status,
            ProcessStatus::Sleeping,
            "woke early at tick {}",
            kernel.ticks()
        );
        assert_eq!(kernel.current_slot(), Some(b));
    }

    kernel.timer_tick();
    assert_eq!(kernel.ticks(), 5);
    assert_ne!(kernel.pcb(a).status, ProcessStatus::Sleeping);
    assert!(
        kernel.ticks() <= 6 && kernel.current_slot() == Some(a),
        "woken sleeper should be dispatched at the next opportunity"
    );
}

#[test]
fn all_processes_asleep_leaves_cpu_idle() {
    let mut kernel = kernel_with(2);
    kernel.dispatch();
    kernel.sleep_ms(3 * MS_PER_TICK);
    kernel.sleep_ms(7 * MS_PER_TICK);

    assert_eq!(kernel.current_slot(), None);
    assert_eq!(kernel.stats().sleeping, 2);

    for _ in 1..=2 {
        kernel.timer_tick();
        assert_eq!(kernel.current_slot(), None, "idle until the shortest sleep");
    }

    kernel.timer_tick();
    assert_eq!(kernel.ticks(), 3);
    let woken = kernel.current_slot().expect("shortest sleeper runs first");
    assert_eq!(kernel.pcb(woken).pid, 1);
    assert_eq!(kernel.stats().sleeping, 1);
}

#[test]
fn scan_tolerates_unsorted_wakeup_order() {
    // The long sleeper enters the queue first; the short sleeper must
    // still wake first.
    let mut kernel = kernel_with(3);
    kernel.dispatch();
    kernel.sleep_ms(9 * MS_PER_TICK); // pid 1, enqueued first
    kernel.sleep_ms(2 * MS_PER_TICK); // pid 2, enqueued second

    for _ in 0..2 {
        kernel.timer_tick();
    }
    assert_eq!(kernel.find_by_pid(2).map(|s| kernel.pcb(s).status), Some(ProcessStatus::Running));
    assert_eq!(kernel.find_by_pid(1).map(|s| kernel.pcb(s).status), Some(ProcessStatus::Sleeping));

    for _ in 0..7 {
        kernel.timer_tick();
    }
    assert_ne!(
        kernel.find_by_pid(1).map(|s| kernel.pcb(s).status),
        Some(ProcessStatus::Sleeping)
    );
}

#[test]
fn simultaneous_wakeups_preserve_sleep_order() {
    let mut kernel = kernel_with(3);
    kernel.dispatch();
    kernel.sleep_ms(2 * MS_PER_TICK); // pid 1
    kernel.sleep_ms(2 * MS_PER_TICK); // pid 2

    // pid 3 keeps running; both sleepers become ready on tick 2 in the
    // order they went to sleep.
    kernel.timer_tick();
    kernel.timer_tick();

    let first = kernel.find_by_pid(1).unwrap();
    let second = kernel.find_by_pid(2).unwrap();
    let running: Vec<u64> = (0..3)
        .map(|_| {
            let pid = kernel.stats().current_pid;
            kernel.yield_now();
            pid
        })
        .collect();

    assert!(kernel.pcb(first).status != ProcessStatus::Sleeping);
    assert!(kernel.pcb(second).status != ProcessStatus::Sleeping);
    let pos1 = running.iter().position(|&pid| pid == 1);
    let pos2 = running.iter().position(|&pid| pid == 2);
    assert!(pos1 < pos2, "FIFO wake order violated: {:?}", running);
}

#[test]
fn sleep_while_idle_is_a_noop() {
    let mut kernel = Kernel::new();
    kernel.sleep_ms(50);
    assert_eq!(kernel.current_slot(), None);
    assert_eq!(kernel.stats().sleeping, 0);
}

#[test]
fn zero_ms_sleep_wakes_on_next_tick() {
    let mut kernel = kernel_with(2);
    kernel.dispatch();
    let sleeper = kernel.current_slot().unwrap();

    kernel.sleep_ms(0);
    assert_eq!(kernel.pcb(sleeper).wakeup_tick, 0);
    kernel.timer_tick();
    assert_ne!(kernel.pcb(sleeper).status, ProcessStatus::Sleeping);
}
