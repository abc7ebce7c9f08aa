//! Build the archive manifest and catalog entry from project configuration.

use flxpack_model::{Language, ModelError, ProviderData, ProviderManifest, ProviderType};

use crate::error::EngineError;
use crate::project::Project;

/// Provider class for packaging: `provider.class_name` if set, otherwise the
/// name `compileDex` recorded in `intermediates/providerClass`.
///
/// # Errors
/// Returns [`ModelError::MissingProviderClass`] if neither yields a name.
pub fn resolve_class_name(project: &Project) -> Result<String, EngineError> {
    if let Some(name) = &project.manifest.provider.class_name {
        if !name.trim().is_empty() {
            return Ok(name.trim().to_owned());
        }
    }
    let path = project.layout.provider_class();
    if path.is_file() {
        let recorded = flxpack_util::fs::read_to_string(&path)?;
        let recorded = recorded.trim();
        if !recorded.is_empty() {
            return Ok(recorded.to_owned());
        }
    }
    Err(ModelError::MissingProviderClass.into())
}

/// The manifest written into the archive.
///
/// # Errors
/// Returns an error if the project has no `[package]`.
pub fn create_provider_manifest(
    project: &Project,
    provider_class_name: &str,
) -> Result<ProviderManifest, EngineError> {
    let provider = &project.manifest.provider;
    Ok(ProviderManifest {
        provider_class_name: provider_class_name.to_owned(),
        package_name: project.package_name()?.to_owned(),
        version_name: project.manifest.version_name(),
        version_code: provider.version_code,
        update_url: provider.update_url.clone(),
        requires_resources: provider.requires_resources,
    })
}

/// The catalog entry for `updater.json`.
///
/// `%s` in `provider.build_url` is replaced with the package name.
///
/// # Errors
/// Returns an error if the project has no `[package]`.
pub fn create_provider_data(project: &Project) -> Result<ProviderData, EngineError> {
    let provider = &project.manifest.provider;
    let package = project.package_name()?;
    Ok(ProviderData {
        build_url: provider
            .build_url
            .as_ref()
            .map(|url| url.replace("%s", package)),
        status: provider.status,
        version_name: project.manifest.version_name(),
        version_code: provider.version_code,
        display_name: project.manifest.provider_name()?.to_owned(),
        adult: provider.adult,
        authors: provider.authors.clone(),
        description: provider.description.clone(),
        repository_url: provider.repository_url.clone(),
        language: Language {
            language_code: provider.language.clone(),
        },
        icon_url: provider.icon_url.clone(),
        provider_type: ProviderType {
            kind: provider.provider_type.clone(),
        },
        changelog: provider.changelog.clone(),
    })
}
