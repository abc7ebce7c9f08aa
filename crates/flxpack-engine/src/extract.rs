//! `extractRequiredDependencies`: unpack the fat bundle for d8.

use std::path::PathBuf;

use crate::error::EngineError;
use crate::project::Project;

/// Unpack `build/libs/dependencies.jar` into a fresh
/// `intermediates/compiled_dependencies/`. Returns the directory and the
/// number of files extracted.
///
/// # Errors
/// Returns an error if the bundle is missing, an entry escapes the
/// destination, or the files cannot be written.
pub fn extract_required_dependencies(project: &Project) -> Result<(PathBuf, usize), EngineError> {
    let bundle = project.layout.dependencies_jar();
    if !bundle.is_file() {
        return Err(EngineError::MissingIntermediate {
            path: bundle.display().to_string(),
            task: "compileRequiredDependencies".to_owned(),
        });
    }

    let dest = project.layout.compiled_dependencies();
    flxpack_util::fs::remove_dir_all_if_exists(&dest)?;
    flxpack_util::fs::ensure_dir(&dest)?;
    let count = flxpack_util::archive::extract(&bundle, &dest)?;
    tracing::debug!(files = count, dest = %dest.display(), "extracted dependency bundle");
    Ok((dest, count))
}
