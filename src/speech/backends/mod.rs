//! Platform-specific speech backends

// macOS `say`
pub mod macos;

// Windows SAPI through PowerShell
pub mod windows;

// espeak-ng / espeak / festival / spd-say
pub mod linux;

pub use linux::{LinuxBackend, LinuxEngine};
pub use macos::MacOsEngine;
pub use windows::WindowsEngine;
