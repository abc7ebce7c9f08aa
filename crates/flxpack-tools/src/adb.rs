//! Device discovery and file transfer through `adb`.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;
use crate::invoke::{parse_diagnostics, ToolResult};

/// A device line from `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device serial (e.g. `emulator-5554`).
    pub serial: String,
    /// Connection state: `device`, `unauthorized`, `offline`, ...
    pub state: String,
}

impl Device {
    /// Whether the device accepts commands.
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

/// Parse the output of `adb devices` (with or without `-l`).
pub fn parse_devices(stdout: &str) -> Vec<Device> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*')
        })
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?;
            let state = fields.next()?;
            Some(Device {
                serial: serial.to_owned(),
                state: state.to_owned(),
            })
        })
        .collect()
}

/// Pick the target device.
///
/// With `serial`, that device must be attached and ready. Without it, exactly
/// one ready device must be attached.
///
/// # Errors
/// Returns an error if no suitable device is found or the choice is ambiguous.
pub fn select_device(devices: &[Device], serial: Option<&str>) -> Result<Device, ToolError> {
    if let Some(serial) = serial {
        let device = devices
            .iter()
            .find(|d| d.serial == serial)
            .ok_or_else(|| ToolError::DeviceNotFound {
                serial: serial.to_owned(),
            })?;
        if !device.is_ready() {
            return Err(ToolError::DeviceUnavailable {
                serial: device.serial.clone(),
                state: device.state.clone(),
            });
        }
        return Ok(device.clone());
    }

    let ready: Vec<&Device> = devices.iter().filter(|d| d.is_ready()).collect();
    match ready.as_slice() {
        [device] => Ok((*device).clone()),
        [] => match devices.first() {
            Some(device) => Err(ToolError::DeviceUnavailable {
                serial: device.serial.clone(),
                state: device.state.clone(),
            }),
            None => Err(ToolError::NoDevice),
        },
        many => Err(ToolError::MultipleDevices {
            serials: many
                .iter()
                .map(|d| d.serial.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// An `adb` binary, optionally bound to one device serial.
#[derive(Debug, Clone)]
pub struct Adb {
    program: PathBuf,
    serial: Option<String>,
}

impl Adb {
    /// Use the `adb` binary at `program`.
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            serial: None,
        }
    }

    /// Address every following command to `serial` (`-s`).
    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = Some(serial.to_owned());
        self
    }

    /// Build the argument list for an `adb` subcommand.
    pub fn build_args(&self, subcommand: &[&str]) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(serial) = &self.serial {
            args.push("-s".to_owned());
            args.push(serial.clone());
        }
        args.extend(subcommand.iter().map(|s| (*s).to_owned()));
        args
    }

    /// List attached devices.
    ///
    /// # Errors
    /// Returns an error if `adb` cannot be run or exits with failure.
    pub fn devices(&self) -> Result<Vec<Device>, ToolError> {
        let result = self.run("adb devices", &["devices"])?;
        Ok(parse_devices(&result.raw_stdout))
    }

    /// Create `remote_dir` (and parents) on the device.
    ///
    /// # Errors
    /// Returns an error if `adb shell mkdir` fails.
    pub fn mkdir(&self, remote_dir: &str) -> Result<(), ToolError> {
        self.run("adb shell", &["shell", "mkdir", "-p", remote_dir])?;
        Ok(())
    }

    /// Push `local` to `remote` on the device.
    ///
    /// # Errors
    /// Returns an error if `adb push` fails.
    pub fn push(&self, local: &Path, remote: &str) -> Result<ToolResult, ToolError> {
        let local_arg = local.display().to_string();
        self.run("adb push", &["push", &local_arg, remote])
    }

    fn run(&self, tool: &str, subcommand: &[&str]) -> Result<ToolResult, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(subcommand));
        let out = flxpack_util::process::run_command(&mut cmd)?;
        tracing::debug!(tool, success = out.success, stdout = %out.stdout.trim(), "adb finished");

        ToolResult {
            tool: tool.to_owned(),
            success: out.success,
            diagnostics: parse_diagnostics(&out.stderr),
            raw_stdout: out.stdout,
            raw_stderr: out.stderr,
        }
        .into_checked()
    }
}
