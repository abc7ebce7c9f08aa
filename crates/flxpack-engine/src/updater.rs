//! `generateUpdaterJson`: write the provider catalog.

use std::path::PathBuf;

use flxpack_model::{catalog_to_json, ProviderData};

use crate::error::EngineError;
use crate::metadata::create_provider_data;
use crate::project::Project;

/// Write `build/updater.json` under `root` with one entry per catalog member,
/// in member order.
///
/// # Errors
/// Returns an error if a member cannot be loaded or the file cannot be written.
pub fn generate_updater_json(root: &Project) -> Result<(PathBuf, Vec<ProviderData>), EngineError> {
    let entries = root
        .catalog_members()?
        .iter()
        .map(create_provider_data)
        .collect::<Result<Vec<_>, _>>()?;

    let path = root.layout.updater_json();
    flxpack_util::fs::write_file(&path, catalog_to_json(&entries)?)?;
    Ok((path, entries))
}
