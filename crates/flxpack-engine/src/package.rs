//! `make`: assemble `build/<name>.flx` from the task intermediates.

use std::path::PathBuf;

use flxpack_model::{ModelError, ProviderManifest, ARCHIVE_EXTENSION, DEX_FILE, MANIFEST_FILE};
use flxpack_util::archive::ArchiveWriter;
use flxpack_util::error::UtilError;

use crate::error::EngineError;
use crate::metadata::{create_provider_manifest, resolve_class_name};
use crate::project::Project;

/// Entry of `res.apk` that never goes into the archive.
const APK_MANIFEST: &str = "AndroidManifest.xml";

/// Outcome of packaging.
#[derive(Debug)]
pub struct MakeReport {
    pub archive: PathBuf,
    pub manifest: ProviderManifest,
    /// Archive entries in write order.
    pub entries: Vec<String>,
    pub sha256: String,
}

/// Check the name a provider archive will be written under.
///
/// # Errors
/// Returns [`EngineError::InvalidArchiveName`] if `<name>.flx` is not a
/// valid file name.
pub fn validate_archive_name(provider_name: &str) -> Result<String, EngineError> {
    let file_name = format!("{provider_name}.{ARCHIVE_EXTENSION}");
    if provider_name.trim().is_empty() {
        return Err(EngineError::InvalidArchiveName {
            name: file_name,
            reason: "the provider name is empty".to_owned(),
        });
    }
    match flxpack_util::filename::validate_filename(&file_name) {
        Ok(()) => Ok(file_name),
        Err(UtilError::InvalidFilename { reason, .. }) => Err(EngineError::InvalidArchiveName {
            name: file_name,
            reason,
        }),
        Err(other) => Err(other.into()),
    }
}

/// Package the provider.
///
/// Fails before writing anything if the version code is not positive, the
/// provider class is unresolved, or the archive name is invalid. Resource
/// entries are included only when the provider requires resources.
///
/// # Errors
/// Returns an error on any of the checks above, a missing intermediate, or an
/// archive write failure.
pub fn make(project: &Project) -> Result<MakeReport, EngineError> {
    let version_code = project.manifest.provider.version_code;
    if version_code <= 0 {
        return Err(ModelError::NonPositiveVersionCode { version_code }.into());
    }
    let class_name = resolve_class_name(project)?;
    let manifest = create_provider_manifest(project, &class_name)?;
    manifest.validate()?;

    let provider_name = project.manifest.provider_name()?;
    validate_archive_name(provider_name)?;

    let layout = &project.layout;
    let dex = layout.classes_dex();
    if !dex.is_file() {
        return Err(EngineError::MissingIntermediate {
            path: dex.display().to_string(),
            task: "compileDex".to_owned(),
        });
    }
    let res_apk = layout.res_apk();
    if manifest.requires_resources && !res_apk.is_file() {
        return Err(EngineError::MissingIntermediate {
            path: res_apk.display().to_string(),
            task: "compileResources".to_owned(),
        });
    }

    let json = manifest.to_json()?;
    flxpack_util::fs::write_file(&layout.manifest_json(), &json)?;

    let archive = layout.archive(provider_name);
    let mut writer = ArchiveWriter::create(&archive)?;
    let mut entries = Vec::new();
    writer.add_bytes(MANIFEST_FILE, json.as_bytes())?;
    entries.push(MANIFEST_FILE.to_owned());
    writer.add_file(DEX_FILE, &dex)?;
    entries.push(DEX_FILE.to_owned());
    if manifest.requires_resources {
        entries.extend(writer.copy_entries_from(&res_apk, |name| name != APK_MANIFEST)?);
    }
    writer.finish()?;

    let sha256 = flxpack_util::hash::sha256_file(&archive)?;
    tracing::info!(
        archive = %archive.display(),
        entries = entries.len(),
        sha256 = %sha256,
        "provider archive written"
    );

    Ok(MakeReport {
        archive,
        manifest,
        entries,
        sha256,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use flxpack_config::manifest::Manifest;
    use flxpack_util::archive::{list_entries, read_entry};

    use super::*;

    fn project(root: &std::path::Path, provider: &str) -> Project {
        let toml = format!(
            "[package]\nname = \"tmdb\"\n\n[provider]\nclass_name = \"com.example.TmdbProvider\"\n{provider}"
        );
        let project = Project::new(root, Manifest::parse(&toml, "test").unwrap());
        fs::create_dir_all(project.layout.intermediates()).unwrap();
        fs::write(project.layout.classes_dex(), b"dex\n035").unwrap();
        project
    }

    fn res_apk(project: &Project) {
        let mut writer = ArchiveWriter::create(&project.layout.res_apk()).unwrap();
        writer.add_bytes("AndroidManifest.xml", b"bin").unwrap();
        writer.add_bytes("resources.arsc", b"table").unwrap();
        writer.add_bytes("res/drawable/icon.png", b"png").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn packages_manifest_and_dex() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = 2\nname = \"TMDB\"\n");
        res_apk(&project);

        let report = make(&project).unwrap();
        assert_eq!(report.archive, tmp.path().join("build/TMDB.flx"));
        assert_eq!(
            list_entries(&report.archive).unwrap(),
            vec!["manifest.json", "classes.dex"]
        );

        let json = read_entry(&report.archive, "manifest.json").unwrap();
        let parsed = ProviderManifest::from_json(std::str::from_utf8(&json).unwrap()).unwrap();
        assert_eq!(parsed, report.manifest);
        assert_eq!(parsed.provider_class_name, "com.example.TmdbProvider");
        assert_eq!(parsed.package_name, "tmdb");
        assert!(project.layout.manifest_json().is_file());
    }

    #[test]
    fn resources_are_merged_without_apk_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = 2\nrequires_resources = true\n");
        res_apk(&project);

        let report = make(&project).unwrap();
        assert_eq!(
            list_entries(&report.archive).unwrap(),
            vec![
                "manifest.json",
                "classes.dex",
                "resources.arsc",
                "res/drawable/icon.png"
            ]
        );
        assert!(report.manifest.requires_resources);
    }

    #[test]
    fn missing_res_apk_when_required() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = 2\nrequires_resources = true\n");
        let err = make(&project).unwrap_err().to_string();
        assert!(err.contains("compileResources"), "error was: {err}");
    }

    #[test]
    fn zero_version_is_rejected_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "");
        let err = make(&project).unwrap_err().to_string();
        assert!(err.contains("no version is set"), "error was: {err}");
        assert!(!project.layout.archive("tmdb").exists());
        assert!(!project.layout.manifest_json().exists());
    }

    #[test]
    fn negative_version_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = -5\n");
        assert!(matches!(
            make(&project),
            Err(EngineError::Model(ModelError::NonPositiveVersionCode { version_code: -5 }))
        ));
    }

    #[test]
    fn invalid_name_is_rejected_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = 1\nname = \"bad/name\"\n");
        let err = make(&project).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArchiveName { .. }), "{err}");
        assert!(!project.layout.manifest_json().exists());
    }

    #[test]
    fn missing_dex_points_at_compile_dex() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = 1\n");
        fs::remove_file(project.layout.classes_dex()).unwrap();
        let err = make(&project).unwrap_err().to_string();
        assert!(err.contains("compileDex"), "error was: {err}");
    }

    #[test]
    fn archives_are_reproducible() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "version_code = 1\n");
        let first = make(&project).unwrap().sha256;
        let second = make(&project).unwrap().sha256;
        assert_eq!(first, second);
    }

    #[test]
    fn archive_name_validation() {
        assert_eq!(validate_archive_name("TMDB").unwrap(), "TMDB.flx");
        for bad in ["a/b", "a:b", "", "CON"] {
            assert!(validate_archive_name(bad).is_err(), "{bad} accepted");
        }
    }
}
