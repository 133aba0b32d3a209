//! Layout contracts the interrupt trampolines depend on.

use core::mem::{align_of, offset_of, size_of};

use kronos_kernel::arch::context::{
    InterruptStackFrame, SavedRegisters, INITIAL_FRAME_RESERVATION,
};
use kronos_kernel::arch::{pit_divisor_for_hz, PIT_INPUT_HZ};
use kronos_kernel::sched::Pcb;

#[test]
fn pcb_saved_sp_is_the_first_field() {
    // The IRQ prologue stores/reloads RSP through the raw PCB address.
    assert_eq!(offset_of!(Pcb, saved_sp), 0);
}

#[test]
fn saved_registers_match_the_fifteen_stub_pushes() {
    assert_eq!(size_of::<SavedRegisters>(), 15 * 8);
    assert_eq!(align_of::<SavedRegisters>(), 8);

    // First pushed register (rax) ends up at the highest address.
    assert_eq!(offset_of!(SavedRegisters, r15), 0);
    assert_eq!(offset_of!(SavedRegisters, rdi), 8 * 8);
    assert_eq!(offset_of!(SavedRegisters, rax), 14 * 8);
}

#[test]
fn iret_frame_matches_long_mode_layout() {
    assert_eq!(size_of::<InterruptStackFrame>(), 5 * 8);
    assert_eq!(offset_of!(InterruptStackFrame, rip), 0);
    assert_eq!(offset_of!(InterruptStackFrame, ss), 4 * 8);
}

#[test]
fn initial_frame_reservation_covers_both_frames_and_the_trap_slot() {
    assert_eq!(
        INITIAL_FRAME_RESERVATION,
        (size_of::<SavedRegisters>() + size_of::<InterruptStackFrame>() + 8) as u64
    );
}

#[test]
fn pit_divisor_arithmetic() {
    assert_eq!(pit_divisor_for_hz(100), (PIT_INPUT_HZ / 100) as u16);
    assert_eq!(pit_divisor_for_hz(100), 11931);

    // Too slow for a 16-bit divisor degrades to the hardware maximum.
    assert_eq!(pit_divisor_for_hz(18), 0);
    assert_eq!(pit_divisor_for_hz(0), 0);

    // Faster than the input clock clamps to the minimum divisor.
    assert_eq!(pit_divisor_for_hz(PIT_INPUT_HZ), 1);
    assert_eq!(pit_divisor_for_hz(u32::MAX), 1);
}
