//! COM1 serial output, the kernel's log sink.

use spin::{Lazy, Mutex};
use uart_16550::SerialPort;

const COM1_PORT_BASE: u16 = 0x3F8;

static COM1: Lazy<Mutex<SerialPort>> = Lazy::new(|| {
    // SAFETY:
    // - 0x3F8 is the standard COM1 I/O port base and is not shared with
    //   any other driver in this kernel.
    let mut port = unsafe { SerialPort::new(COM1_PORT_BASE) };
    port.init();
    Mutex::new(port)
});

pub fn write_fmt(args: core::fmt::Arguments<'_>) {
    use core::fmt::Write;
    let _ = COM1.lock().write_fmt(args);
}
