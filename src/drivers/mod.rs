//! Device drivers. Only the serial log sink survives in this kernel's
//! scope, and only on bare-metal builds.

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod serial;
