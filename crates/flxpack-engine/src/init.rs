//! Project scaffolding for `flxpack init`.

use std::path::Path;

use flxpack_config::manifest::{Android, Manifest, Package, Provider, MANIFEST_FILE};

use crate::error::EngineError;

/// Scaffold a new provider project.
///
/// Creates the project directory (if it doesn't exist), a `flxpack.toml`
/// manifest with version code 1 and a namespace derived from `name`, and a
/// `.gitignore` covering `build/`.
///
/// # Errors
/// Returns an error if:
/// - A `flxpack.toml` already exists in `dir`
/// - The directory or files cannot be created
/// - The manifest cannot be serialized
pub fn init_project(name: &str, dir: &Path) -> Result<(), EngineError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        return Err(EngineError::ProjectExists {
            path: manifest_path.display().to_string(),
        });
    }

    flxpack_util::fs::ensure_dir(&dir.join("src/main/res"))?;

    let manifest = Manifest {
        package: Some(Package {
            name: name.to_owned(),
        }),
        provider: Provider {
            version_code: 1,
            ..Provider::default()
        },
        android: Android {
            namespace: Some(format!("com.example.{}", namespace_segment(name))),
            ..Android::default()
        },
        ..Manifest::default()
    };
    flxpack_util::fs::write_file(&manifest_path, manifest.to_toml()?)?;
    flxpack_util::fs::write_file(&dir.join(".gitignore"), "/build/\n")?;

    Ok(())
}

/// Lower-case `name` into a valid Java package segment.
fn namespace_segment(name: &str) -> String {
    let mut segment: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if segment.is_empty() {
        segment.push_str("provider");
    } else if segment.starts_with(|c: char| c.is_ascii_digit()) {
        segment.insert(0, '_');
    }
    segment
}
