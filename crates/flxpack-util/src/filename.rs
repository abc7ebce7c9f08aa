//! Portable file name validation.
//!
//! Archive names are used verbatim on the build host and on the device, so a
//! name must be valid on Windows, macOS, Linux and Android storage alike.

use crate::error::UtilError;

/// Maximum length of a file name component in bytes (ext4, APFS, NTFS).
pub const MAX_FILENAME_BYTES: usize = 255;

const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Whether `name` can be used as a single file name component.
pub fn is_valid_filename(name: &str) -> bool {
    validate_filename(name).is_ok()
}

/// Validate that `name` can be used as a single file name component.
///
/// # Errors
/// Returns `UtilError::InvalidFilename` naming the first rule the name breaks.
pub fn validate_filename(name: &str) -> Result<(), UtilError> {
    let reject = |reason: &str| {
        Err(UtilError::InvalidFilename {
            name: name.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if name.trim().is_empty() {
        return reject("name is empty");
    }
    if name.len() > MAX_FILENAME_BYTES {
        return reject("name is longer than 255 bytes");
    }
    if name == "." || name == ".." {
        return reject("name is a relative directory reference");
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return reject(&format!("character '{c}' is not allowed"));
    }
    if name.chars().any(char::is_control) {
        return reject("control characters are not allowed");
    }
    if name.ends_with('.') || name.ends_with(' ') {
        return reject("name must not end with a dot or a space");
    }

    let stem = name.split('.').next().unwrap_or(name);
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        return reject("name is reserved on Windows");
    }

    Ok(())
}
