//! Android SDK tool discovery and invocation: `d8`, `aapt2`, and `adb`.

pub mod adb;
pub mod error;
pub mod invoke;
pub mod sdk;

pub use adb::{parse_devices, select_device, Adb, Device};
pub use error::ToolError;
pub use invoke::{
    Aapt2CompileCommand, Aapt2LinkCommand, D8Command, Diagnostic, DiagnosticLevel, ToolResult,
};
pub use sdk::{locate_adb, AndroidSdk, Toolchain};
