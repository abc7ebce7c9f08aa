//! Error types for flxpack-tools.

use std::path::PathBuf;

/// Errors produced by SDK discovery and external tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No Android SDK could be located.
    #[error("Android SDK not found — install it and set ANDROID_HOME (or ANDROID_SDK_ROOT)")]
    SdkNotFound,

    /// The SDK root from the environment does not exist.
    #[error("Android SDK directory {path} does not exist — check ANDROID_HOME")]
    SdkMissing { path: PathBuf },

    /// No usable build-tools directory was found.
    #[error("no build-tools found in {path} — install them with `sdkmanager \"build-tools;{hint}\"`")]
    BuildToolsNotFound { path: PathBuf, hint: String },

    /// The configured platform (android.jar) is not installed.
    #[error("android-{compile_sdk} platform not found at {path} — install it with `sdkmanager \"platforms;android-{compile_sdk}\"`")]
    PlatformNotFound { compile_sdk: u32, path: PathBuf },

    /// A tool binary was not found in the SDK or on PATH.
    #[error("{tool} not found (looked in {searched})")]
    ToolNotFound { tool: String, searched: String },

    /// A tool was invoked without inputs.
    #[error("no inputs given to {tool}")]
    NoInputs { tool: String },

    /// A tool was invoked without an output path.
    #[error("no output path given to {tool}")]
    NoOutput { tool: String },

    /// A tool ran and reported failure.
    #[error("{tool} failed with {error_count} error(s)")]
    Failed { tool: String, error_count: usize },

    /// No device is attached.
    #[error("no device attached — connect a device with USB debugging enabled")]
    NoDevice,

    /// More than one device is attached and none was chosen.
    #[error("multiple devices attached ({serials}) — pick one with --serial")]
    MultipleDevices { serials: String },

    /// The requested device is not attached.
    #[error("device {serial} is not attached")]
    DeviceNotFound { serial: String },

    /// The device is attached but not usable (e.g. unauthorized).
    #[error("device {serial} is {state} — accept the debugging prompt on the device")]
    DeviceUnavailable { serial: String, state: String },

    /// An error propagated from flxpack-util.
    #[error("{0}")]
    Util(#[from] flxpack_util::error::UtilError),
}
