//! Central kernel logging with optional in-memory capture.
//!
//! Log lines go to the serial port on bare-metal builds. The capture
//! buffer works on every target and is what host tests read to observe
//! kernel log traffic.

use core::fmt::{self, Write as _};

use spin::Mutex;

const CAPTURE_BUF_SIZE: usize = 16 * 1024;

struct LogState {
    capture_enabled: bool,
    capture_len: usize,
    capture_overflow: bool,
    capture_buf: [u8; CAPTURE_BUF_SIZE],
}

static LOGGER: Mutex<LogState> = Mutex::new(LogState {
    capture_enabled: false,
    capture_len: 0,
    capture_overflow: false,
    capture_buf: [0; CAPTURE_BUF_SIZE],
});

struct BufferWriter<'a> {
    state: &'a mut LogState,
}

impl fmt::Write for BufferWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self
            .state
            .capture_buf
            .len()
            .saturating_sub(self.state.capture_len);
        let write_len = remaining.min(bytes.len());

        if write_len > 0 {
            let start = self.state.capture_len;
            self.state.capture_buf[start..start + write_len].copy_from_slice(&bytes[..write_len]);
            self.state.capture_len = start + write_len;
        }
        if write_len < bytes.len() {
            self.state.capture_overflow = true;
        }
        Ok(())
    }
}

fn capture_target_line(target: &str, args: fmt::Arguments<'_>) {
    let mut state = LOGGER.lock();
    if !state.capture_enabled {
        return;
    }

    let mut writer = BufferWriter { state: &mut *state };
    let _ = writer.write_str(target);
    let _ = writer.write_char('|');
    let _ = fmt::write(&mut writer, args);
    let _ = writer.write_char('\n');
}

/// Central target-based log function (serial output + optional capture).
pub fn logln(target: &str, args: fmt::Arguments<'_>) {
    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    crate::drivers::serial::write_fmt(format_args!("{}\n", args));

    capture_target_line(target, args);
}

/// Enable/disable the capture buffer and reset it.
pub fn set_capture_enabled(enabled: bool) {
    let mut state = LOGGER.lock();
    state.capture_enabled = enabled;
    state.capture_len = 0;
    state.capture_overflow = false;
}

/// Whether capture has dropped bytes since it was last reset.
pub fn capture_overflowed() -> bool {
    LOGGER.lock().capture_overflow
}

/// Runs `f` over the captured `target|message` lines.
pub fn with_captured<R>(f: impl FnOnce(&str) -> R) -> R {
    let state = LOGGER.lock();
    let text = core::str::from_utf8(&state.capture_buf[..state.capture_len]).unwrap_or("");
    f(text)
}

/// Logs one line under the `debug` target.
#[macro_export]
macro_rules! debugln {
    () => {
        $crate::logging::logln("debug", format_args!(""))
    };
    ($($arg:tt)*) => {
        $crate::logging::logln("debug", format_args!($($arg)*))
    };
}
