//! Legacy 8259 PIC wiring.
//!
//! IRQ 0-15 are remapped above the CPU exception range (PIC1 to vectors
//! 32-39, PIC2 to 40-47). Only the timer line is unmasked; every other
//! device is outside this kernel's scope.

use pic8259::ChainedPics;
use spin::Mutex;

use super::IRQ_BASE;

pub const PIC_1_OFFSET: u8 = IRQ_BASE;
pub const PIC_2_OFFSET: u8 = IRQ_BASE + 8;

// SAFETY:
// - The offsets relocate both PICs outside the exception vector range.
pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Remaps both PICs and unmasks IRQ0 only.
pub fn init() {
    let mut pics = PICS.lock();
    // SAFETY:
    // - Runs once during boot with interrupts disabled.
    // - The mask leaves only the timer line (bit 0 of PIC1) enabled.
    unsafe {
        pics.initialize();
        pics.write_masks(0b1111_1110, 0b1111_1111);
    }
}

/// Edge-acknowledges `vector` at the controller (End-Of-Interrupt).
pub fn end_of_interrupt(vector: u8) {
    // SAFETY:
    // - Called from the interrupt handler for `vector` exactly once per
    //   delivery, which is the EOI contract.
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}
