//! Panic handler for bare-metal builds.
//!
//! Hosted builds (tests) use the standard library's panic machinery.

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    crate::logging::logln("panic", format_args!("!!! KERNEL PANIC !!! {}", info));

    loop {
        // SAFETY:
        // - This requires `unsafe` because privileged CPU instructions are
        //   outside Rust's static safety model.
        // - The panic path intentionally stops all forward progress;
        //   `cli`/`hlt` are valid in ring 0.
        unsafe {
            core::arch::asm!("cli");
            core::arch::asm!("hlt");
        }
    }
}
