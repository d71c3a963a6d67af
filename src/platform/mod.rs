pub mod types;

pub use types::{ActivityDriver, DisplayBounds, DriverError};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub use macos::MacOSDriver as NativeDriver;

#[cfg(target_os = "linux")]
pub use linux::LinuxDriver as NativeDriver;

// Stub for platforms without a native input backend. Operations succeed as
// no-ops so the scheduler keeps its cadence.
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub struct NativeDriver;

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl NativeDriver {
    pub fn new() -> Result<Self, DriverError> {
        Ok(Self)
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl ActivityDriver for NativeDriver {
    fn cursor_position(&self) -> Result<(i32, i32), DriverError> {
        Ok((0, 0))
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), DriverError> {
        log::debug!("no input backend on this platform, dropping move ({dx}, {dy})");
        Ok(())
    }

    fn null_click(&mut self) -> Result<(), DriverError> {
        log::debug!("no input backend on this platform, dropping null click");
        Ok(())
    }
}
