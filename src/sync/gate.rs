//! Nestable critical-section gate.
//!
//! The uniprocessor kernel has exactly one source of concurrency: the timer
//! interrupt. The gate excludes it by disabling hardware interrupts, with a
//! depth counter so critical sections nest; interrupts are physically
//! enabled again only when the outermost section leaves.
//!
//! Interrupt entry itself also participates: the hardware clears IF before
//! the prologue runs, so the prologue accounts for that with
//! [`interrupt_prologue`] (depth up, no port/flag touch) and the epilogue
//! with [`interrupt_epilogue`] (depth down, `iretq` restores IF).

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

/// Interrupt-disable nesting depth. Interrupts are enabled iff this is zero
/// and the CPU is not inside an interrupt prologue.
static DEPTH: AtomicUsize = AtomicUsize::new(0);

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[inline]
fn hw_disable() {
    x86_64::instructions::interrupts::disable();
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[inline]
fn hw_enable() {
    x86_64::instructions::interrupts::enable();
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
#[inline]
fn hw_disable() {}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
#[inline]
fn hw_enable() {}

/// Enters a critical section: disables interrupts, then bumps the depth.
pub fn enter_critical() {
    hw_disable();
    DEPTH.fetch_add(1, Ordering::Relaxed);
}

/// Leaves a critical section: drops the depth and re-enables interrupts iff
/// the section was outermost. An unmatched leave is a kernel bug.
pub fn leave_critical() {
    let previous = DEPTH.fetch_sub(1, Ordering::Relaxed);
    debug_assert!(previous > 0, "unbalanced leave_critical");
    if previous == 1 {
        hw_enable();
    }
}

/// Accounts for the hardware interrupt-disable performed by the CPU on
/// interrupt entry. Pure bookkeeping; IF is already clear.
pub fn interrupt_prologue() {
    DEPTH.fetch_add(1, Ordering::Relaxed);
}

/// Balances [`interrupt_prologue`] just before `iretq`, which re-enables
/// interrupts by restoring the saved RFLAGS. Deliberately does not `sti`:
/// doing so would open an interrupt window inside the handler's epilogue.
pub fn interrupt_epilogue() {
    let previous = DEPTH.fetch_sub(1, Ordering::Relaxed);
    debug_assert!(previous > 0, "unbalanced interrupt_epilogue");
}

/// Current gate depth.
pub fn depth() -> usize {
    DEPTH.load(Ordering::Relaxed)
}

/// Interior-mutability container whose guard holds the critical-section
/// gate for its lifetime.
///
/// This is how the kernel-state aggregate is published to the interrupt
/// stubs: `lock()` enters the gate, the guard hands out `&mut T`, and drop
/// leaves the gate. On this uniprocessor there is no second CPU to spin
/// against; exclusion comes entirely from interrupt masking.
pub struct GateLock<T> {
    data: UnsafeCell<T>,
}

impl<T> GateLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            data: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> GateLockGuard<'_, T> {
        enter_critical();
        GateLockGuard { lock: self }
    }
}

pub struct GateLockGuard<'a, T> {
    lock: &'a GateLock<T>,
}

impl<T> Deref for GateLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY:
        // - The gate is held for the guard's lifetime, so no interrupt
        //   handler can run and create a second reference.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for GateLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY:
        // - The gate is held for the guard's lifetime, so no interrupt
        //   handler can run and create a second reference.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for GateLockGuard<'_, T> {
    fn drop(&mut self) {
        leave_critical();
    }
}

// SAFETY:
// - Access to `data` is serialized by the interrupt-masking gate on a
//   single CPU.
// - `T: Send` keeps cross-context handoff of the contained value sound.
unsafe impl<T: Send> Sync for GateLock<T> {}
unsafe impl<T: Send> Send for GateLock<T> {}
