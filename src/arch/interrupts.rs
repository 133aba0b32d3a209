//! IDT wiring and the IRQ0/`int 0x80` trampolines.
//!
//! The trampolines are the only stack-switch points in the kernel. Both
//! follow the same shape:
//!
//! 1. hardware has cleared IF and pushed the `iretq` frame,
//! 2. the stub pushes all general-purpose registers,
//! 3. a Rust dispatcher runs under the critical-section gate and returns
//!    the stack pointer of whatever context should resume,
//! 4. the stub reloads `rsp` from that value, pops, and `iretq`s.
//!
//! Because a suspended process's `saved_sp` points at exactly such a
//! register block, step 4 is the whole context switch.

use core::arch::global_asm;

use spin::Lazy;
use x86_64::instructions::port::Port;
use x86_64::set_general_handler;
use x86_64::structures::idt::InterruptDescriptorTable;
use x86_64::{PrivilegeLevel, VirtAddr};

use super::context::{self, SavedRegisters};
use super::{pic, pit_divisor_for_hz, IRQ0_PIT_TIMER_VECTOR, SYSCALL_INT80_VECTOR};
use crate::config::TIMER_HZ;
use crate::logging;
use crate::sched::KERNEL;
use crate::sync::gate;
use crate::syscall;

const PIT_COMMAND: u16 = 0x43;
const PIT_CHANNEL0: u16 = 0x40;
const PIT_MODE_RATE_GENERATOR: u8 = 0x36;

extern "C" {
    fn irq0_pit_timer_stub();
    fn int80_syscall_stub();
}

macro_rules! trampoline_stub_asm {
    ($name:ident, $dispatch:ident) => {
        global_asm!(concat!(
            ".section .text\n",
            ".global ",
            stringify!($name),
            "\n",
            stringify!($name),
            ":\n",
            "    cli\n",
            "    push rax\n",
            "    push rcx\n",
            "    push rdx\n",
            "    push rbx\n",
            "    push rbp\n",
            "    push rsi\n",
            "    push rdi\n",
            "    push r8\n",
            "    push r9\n",
            "    push r10\n",
            "    push r11\n",
            "    push r12\n",
            "    push r13\n",
            "    push r14\n",
            "    push r15\n",
            "    mov rdi, rsp\n",
            "    and rsp, -16\n",
            "    call ",
            stringify!($dispatch),
            "\n",
            "    mov rsp, rax\n",
            "    pop r15\n",
            "    pop r14\n",
            "    pop r13\n",
            "    pop r12\n",
            "    pop r11\n",
            "    pop r10\n",
            "    pop r9\n",
            "    pop r8\n",
            "    pop rdi\n",
            "    pop rsi\n",
            "    pop rbp\n",
            "    pop rbx\n",
            "    pop rdx\n",
            "    pop rcx\n",
            "    pop rax\n",
            "    iretq\n",
        ));
    };
}

trampoline_stub_asm!(irq0_pit_timer_stub, timer_irq_rust);
trampoline_stub_asm!(int80_syscall_stub, syscall_irq_rust);

static IDT: Lazy<InterruptDescriptorTable> = Lazy::new(|| {
    let mut idt = InterruptDescriptorTable::new();

    set_general_handler!(&mut idt, unexpected_interrupt);

    // SAFETY:
    // - Both stubs preserve the full register state and end in `iretq`,
    //   which is the handler contract `set_handler_addr` cannot check.
    unsafe {
        idt[IRQ0_PIT_TIMER_VECTOR]
            .set_handler_addr(VirtAddr::new(irq0_pit_timer_stub as usize as u64));
        idt[SYSCALL_INT80_VECTOR]
            .set_handler_addr(VirtAddr::new(int80_syscall_stub as usize as u64))
            .set_privilege_level(PrivilegeLevel::Ring3);
    }

    idt
});

fn unexpected_interrupt(
    frame: x86_64::structures::idt::InterruptStackFrame,
    index: u8,
    error_code: Option<u64>,
) {
    panic!(
        "unexpected interrupt: vector={} error={:?} rip={:#x}",
        index,
        error_code,
        frame.instruction_pointer.as_u64()
    );
}

/// Loads the IDT, remaps the PIC, and programs the periodic timer.
/// Interrupts stay disabled; the caller enables them once the first
/// processes are spawned.
pub fn init() {
    IDT.load();
    pic::init();
    init_periodic_timer(TIMER_HZ);
    logging::logln(
        "arch",
        format_args!("interrupts wired: IRQ0 timer at {} Hz, int 0x80 syscalls", TIMER_HZ),
    );
}

/// Programs PIT channel 0 as a rate generator at (approximately) `hz`.
pub fn init_periodic_timer(hz: u32) {
    let divisor = pit_divisor_for_hz(hz);
    let mut command: Port<u8> = Port::new(PIT_COMMAND);
    let mut channel0: Port<u8> = Port::new(PIT_CHANNEL0);

    // SAFETY:
    // - The three-write sequence (mode, divisor low, divisor high) is the
    //   documented PIT programming protocol.
    // - Callers run with interrupts disabled so the sequence cannot be
    //   interleaved with an IRQ0 delivery.
    unsafe {
        command.write(PIT_MODE_RATE_GENERATOR);
        channel0.write((divisor & 0xFF) as u8);
        channel0.write((divisor >> 8) as u8);
    }
}

/// Timer interrupt dispatcher: account the hardware interrupt disable,
/// tick the clock, acknowledge the controller, wake sleepers, and rotate
/// the ready queue unless the interrupted process is mid-syscall.
#[no_mangle]
extern "C" fn timer_irq_rust(current_rsp: u64) -> u64 {
    gate::interrupt_prologue();

    let resume = {
        let mut kernel = KERNEL.lock();
        kernel.record_current_sp(current_rsp);
        kernel.tick_increment();
        pic::end_of_interrupt(IRQ0_PIT_TIMER_VECTOR);
        kernel.wake_sleepers();
        kernel.preempt_or_defer();
        kernel.resume_sp()
    };

    gate::interrupt_epilogue();
    resume.unwrap_or_else(context::idle_frame_sp)
}

/// Syscall dispatcher: reads the ABI registers out of the saved frame,
/// runs the typed dispatch under the gate, and stores the result into the
/// invoker's saved `rax` (the frame belongs to the invoker even if it
/// blocked and another process resumes first).
#[no_mangle]
extern "C" fn syscall_irq_rust(current_rsp: u64) -> u64 {
    gate::interrupt_prologue();

    // SAFETY:
    // - The stub pushed a full `SavedRegisters` block at `current_rsp`
    //   immediately before calling here.
    let frame = unsafe { &mut *(current_rsp as *mut SavedRegisters) };
    let (syscall_nr, arg0, arg1) = (frame.rax, frame.rdi, frame.rsi);

    let resume = {
        let mut kernel = KERNEL.lock();
        kernel.record_current_sp(current_rsp);
        kernel.syscall_enter();
        frame.rax = syscall::dispatch(&mut kernel, syscall_nr, arg0, arg1);
        kernel.syscall_leave();
        kernel.resume_sp()
    };

    gate::interrupt_epilogue();
    resume.unwrap_or_else(context::idle_frame_sp)
}
