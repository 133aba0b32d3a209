//! Architecture layer: interrupt vectors, PIT timing, context frames.
//!
//! Only the constants and the frame/stack preparation in [`context`] are
//! target-independent; IDT/PIC/PIT wiring and the interrupt trampolines
//! exist solely on bare-metal x86_64 builds.

pub mod context;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod interrupts;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod pic;

/// First vector of the remapped PIC range.
pub const IRQ_BASE: u8 = 32;

/// IRQ0: the PIT timer, the kernel's only preemption source.
pub const IRQ0_PIT_TIMER_VECTOR: u8 = IRQ_BASE;

/// Software interrupt vector for the syscall gate.
pub const SYSCALL_INT80_VECTOR: u8 = 0x80;

/// PIT input clock in Hz.
pub const PIT_INPUT_HZ: u32 = 1_193_182;

/// PIT channel-0 divisor producing (approximately) `hz` interrupts per
/// second. A divisor of 0 means 65536 to the PIT, which is also what the
/// clamp below degrades to for out-of-range requests.
pub const fn pit_divisor_for_hz(hz: u32) -> u16 {
    if hz == 0 {
        return 0;
    }
    let divisor = PIT_INPUT_HZ / hz;
    if divisor > u16::MAX as u32 {
        0
    } else if divisor == 0 {
        1
    } else {
        divisor as u16
    }
}
