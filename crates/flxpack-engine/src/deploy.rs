//! `deployWithAdb`: push the archive and catalog to an attached device.

use std::path::Path;

use flxpack_tools::adb::{select_device, Adb};

use crate::error::EngineError;
use crate::project::Project;

/// Outcome of a deployment.
#[derive(Debug)]
pub struct DeployReport {
    pub serial: String,
    pub remote_dir: String,
    /// Remote paths written.
    pub pushed: Vec<String>,
}

/// `<deploy.remote_dir>/<package>` on the device.
///
/// # Errors
/// Returns an error if the project has no `[package]`.
pub fn remote_dir(project: &Project) -> Result<String, EngineError> {
    Ok(format!(
        "{}/{}",
        project.manifest.deploy.remote_dir.trim_end_matches('/'),
        project.package_name()?
    ))
}

/// Push `build/<name>.flx` and the `catalog` (an `updater.json`) using the
/// `adb` at `adb_path`.
///
/// # Errors
/// Returns an error if an artifact is missing, no suitable device is attached,
/// or an `adb` command fails.
pub fn deploy_with_adb(
    project: &Project,
    adb_path: &Path,
    catalog: &Path,
    serial: Option<&str>,
) -> Result<DeployReport, EngineError> {
    let archive = project.layout.archive(project.manifest.provider_name()?);
    if !archive.is_file() {
        return Err(EngineError::MissingIntermediate {
            path: archive.display().to_string(),
            task: "make".to_owned(),
        });
    }
    if !catalog.is_file() {
        return Err(EngineError::MissingIntermediate {
            path: catalog.display().to_string(),
            task: "generateUpdaterJson".to_owned(),
        });
    }

    let adb = Adb::new(adb_path);
    let device = select_device(&adb.devices()?, serial)?;
    let adb = adb.with_serial(&device.serial);

    let remote = remote_dir(project)?;
    adb.mkdir(&remote)?;

    let mut pushed = Vec::new();
    for local in [archive.as_path(), catalog] {
        let Some(file_name) = local.file_name() else {
            continue;
        };
        let target = format!("{remote}/{}", file_name.to_string_lossy());
        adb.push(local, &target)?;
        tracing::debug!(serial = %device.serial, target = %target, "pushed");
        pushed.push(target);
    }

    Ok(DeployReport {
        serial: device.serial,
        remote_dir: remote,
        pushed,
    })
}
