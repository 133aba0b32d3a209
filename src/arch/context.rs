//! Context frames and kernel thread stacks.
//!
//! A suspended process is exactly its saved stack pointer: the interrupt
//! trampolines push a [`SavedRegisters`] block beneath the CPU-pushed
//! [`InterruptStackFrame`], record `rsp` in the PCB, and resume a process
//! by reloading `rsp` from the PCB and popping. A freshly spawned thread
//! is given a synthetic pair of those frames on its own stack so that its
//! very first dispatch looks like a return from an interrupt into `entry`.
//!
//! On hosted builds (tests) there are no real stacks to prepare; the twin
//! implementation hands out distinct synthetic addresses so the table
//! bookkeeping stays observable.

/// Saved general-purpose register state as pushed by the IRQ trampolines.
///
/// Layout contract:
/// - Must match the push/pop order in the interrupt stubs.
/// - Any change requires synchronized updates in assembly and tests.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SavedRegisters {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rbp: u64,
    pub rbx: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rax: u64,
}

/// Hardware interrupt return frame for `iretq` in 64-bit long mode.
///
/// Layout contract:
/// - In IA-32e mode `iretq` unconditionally pops all five values (RIP, CS,
///   RFLAGS, RSP, SS), regardless of privilege-level change.
/// - Must match the push order used by the CPU on interrupt entry.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct InterruptStackFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Flat-model selectors installed by the bootstrap GDT.
pub const KERNEL_CODE_SELECTOR: u64 = 0x08;
pub const KERNEL_DATA_SELECTOR: u64 = 0x10;

/// RFLAGS for new threads: IF=1 so the timer preempts them, plus the
/// architecturally required reserved bit 1.
pub const DEFAULT_RFLAGS: u64 = 0x202;

/// Bytes reserved on a fresh thread stack below the stack top: the saved
/// register block, the interrupt return frame, and one return-address slot
/// for the return trap.
pub const INITIAL_FRAME_RESERVATION: u64 = (core::mem::size_of::<SavedRegisters>()
    + core::mem::size_of::<InterruptStackFrame>()
    + 8) as u64;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod hw {
    use core::cell::UnsafeCell;
    use core::mem::size_of;
    use core::ptr;

    use super::{
        InterruptStackFrame, SavedRegisters, DEFAULT_RFLAGS, KERNEL_CODE_SELECTOR,
        KERNEL_DATA_SELECTOR,
    };
    use crate::config::{KERNEL_STACK_SIZE, MAX_PROCESSES};
    use crate::sched::ThreadEntry;
    use crate::syscall::SyscallId;

    const IDLE_STACK_SIZE: usize = 4096;

    #[repr(align(16))]
    struct StackPool {
        threads: UnsafeCell<[[u8; KERNEL_STACK_SIZE]; MAX_PROCESSES]>,
        idle: UnsafeCell<[u8; IDLE_STACK_SIZE]>,
    }

    // SAFETY:
    // - The kernel is single-core; stack regions are handed out per PCB
    //   slot and written only under the critical-section gate.
    unsafe impl Sync for StackPool {}

    static STACKS: StackPool = StackPool {
        threads: UnsafeCell::new([[0; KERNEL_STACK_SIZE]; MAX_PROCESSES]),
        idle: UnsafeCell::new([0; IDLE_STACK_SIZE]),
    };

    #[inline]
    const fn align_down(value: usize, align: usize) -> usize {
        value & !(align - 1)
    }

    extern "C" fn thread_return_trap() -> ! {
        // A thread entry returned: terminate it through the normal exit
        // syscall so scheduling state stays consistent.
        // SAFETY:
        // - This requires `unsafe` because inline assembly is outside
        //   Rust's static safety model.
        // - `int 0x80` enters the syscall gate in ring 0, which holds for
        //   kernel threads.
        unsafe {
            core::arch::asm!("int 0x80", in("rax") SyscallId::EXIT, options(nomem));
        }
        loop {
            core::hint::spin_loop();
        }
    }

    extern "C" fn idle_loop() -> ! {
        loop {
            x86_64::instructions::hlt();
        }
    }

    /// Writes a synthetic interrupt context entering `rip` onto the stack
    /// region ending at `stack_top`, returning the stack pointer the
    /// trampoline epilogue should resume from.
    ///
    /// # Safety
    ///
    /// `stack_top` must be the end of a writable region of at least
    /// `INITIAL_FRAME_RESERVATION` bytes that no other context is using.
    unsafe fn write_initial_frame(stack_top: usize, rip: u64, return_addr: Option<u64>) -> u64 {
        let entry_rsp = align_down(stack_top, 16) - 8;
        let iret_addr = entry_rsp - size_of::<InterruptStackFrame>();
        let frame_addr = iret_addr - size_of::<SavedRegisters>();

        if let Some(trap) = return_addr {
            ptr::write(entry_rsp as *mut u64, trap);
        }
        ptr::write(frame_addr as *mut SavedRegisters, SavedRegisters::default());
        ptr::write(
            iret_addr as *mut InterruptStackFrame,
            InterruptStackFrame {
                rip,
                cs: KERNEL_CODE_SELECTOR,
                rflags: DEFAULT_RFLAGS,
                rsp: entry_rsp as u64,
                ss: KERNEL_DATA_SELECTOR,
            },
        );

        frame_addr as u64
    }

    pub fn prepare_thread_stack(slot: usize, entry: ThreadEntry) -> (u64, u64) {
        // SAFETY:
        // - `slot` indexes a PCB the allocator just claimed, so its stack
        //   region is not in use by any live context.
        // - Each slot owns a disjoint region of `STACKS.threads`.
        unsafe {
            let stacks = &mut *STACKS.threads.get();
            let stack_top = stacks[slot].as_mut_ptr() as usize + KERNEL_STACK_SIZE;
            let saved_sp = write_initial_frame(
                stack_top,
                entry as usize as u64,
                Some(thread_return_trap as usize as u64),
            );
            (saved_sp, stack_top as u64)
        }
    }

    /// Builds a fresh idle context and returns its stack pointer.
    ///
    /// Called whenever the dispatcher leaves the current slot empty. The
    /// frame is rebuilt from the top of the idle stack each time, so an
    /// abandoned idle context never accumulates.
    pub fn idle_frame_sp() -> u64 {
        // SAFETY:
        // - Only the interrupt epilogue consumes idle frames, and it runs
        //   with interrupts disabled, so no live context uses this stack
        //   while the frame is rewritten.
        unsafe {
            let stack_top = STACKS.idle.get() as usize + IDLE_STACK_SIZE;
            write_initial_frame(stack_top, idle_loop as usize as u64, None)
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use hw::{idle_frame_sp, prepare_thread_stack};

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod hosted {
    use super::INITIAL_FRAME_RESERVATION;
    use crate::config::KERNEL_STACK_SIZE;
    use crate::sched::ThreadEntry;

    /// Base of the synthetic stack window handed out on hosted builds.
    const HOSTED_STACK_BASE: u64 = 0x0000_6000_0000_0000;

    pub fn prepare_thread_stack(slot: usize, _entry: ThreadEntry) -> (u64, u64) {
        let stack_top = HOSTED_STACK_BASE + (slot as u64 + 1) * KERNEL_STACK_SIZE as u64;
        (stack_top - INITIAL_FRAME_RESERVATION, stack_top)
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub use hosted::prepare_thread_stack;
