use std::path::Path;

use flxpack_model::ProviderStatus;
use serde::{Deserialize, Serialize};

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "flxpack.toml";

/// The `flxpack.toml` project manifest.
///
/// A provider project has a `[package]` table. A workspace root that only
/// aggregates the catalog has a `[workspace]` table instead; a root may have both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<Package>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Workspace>,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub android: Android,
    #[serde(default)]
    pub build: Build,
    /// Compile-only dependencies merged into the fat bundle, in merge order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub deploy: Deploy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Project name; written to the archive manifest as the provider package name.
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workspace {
    /// Provider project directories relative to the workspace root.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Provider metadata for the archive manifest and the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Display name; also the archive base name. Defaults to the package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Explicit provider class. When unset, the annotation scan decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub version_code: i64,
    /// Defaults to the version code rendered as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    /// Catalog download URL; `%s` is replaced with the package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
    #[serde(default)]
    pub requires_resources: bool,
    #[serde(default)]
    pub status: ProviderStatus,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default = "default_provider_type")]
    pub provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            name: None,
            class_name: None,
            version_code: 0,
            version_name: None,
            update_url: None,
            build_url: None,
            requires_resources: false,
            status: ProviderStatus::default(),
            adult: false,
            authors: Vec::new(),
            description: None,
            repository_url: None,
            language: default_language(),
            icon_url: None,
            provider_type: default_provider_type(),
            changelog: None,
        }
    }
}

fn default_language() -> String {
    "en".to_owned()
}

fn default_provider_type() -> String {
    "Unknown".to_owned()
}

/// Android SDK settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Android {
    #[serde(default = "default_min_sdk")]
    pub min_sdk: u32,
    #[serde(default = "default_compile_sdk")]
    pub compile_sdk: u32,
    /// Build-tools version; the highest installed one when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_tools: Option<String>,
    /// Application manifest to link resources against. Generated when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    /// Package used for the generated application manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default = "default_resources")]
    pub resources: String,
}

impl Default for Android {
    fn default() -> Self {
        Self {
            min_sdk: default_min_sdk(),
            compile_sdk: default_compile_sdk(),
            build_tools: None,
            manifest: None,
            namespace: None,
            resources: default_resources(),
        }
    }
}

fn default_min_sdk() -> u32 {
    21
}

fn default_compile_sdk() -> u32 {
    34
}

fn default_resources() -> String {
    "src/main/res".to_owned()
}

/// Inputs and policies of the packaging pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Class output directories of the Kotlin and Java compilers.
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    /// Fully qualified name of the annotation marking the provider class.
    #[serde(default = "default_annotation")]
    pub annotation: String,
    /// Entry globs dropped from the fat bundle.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Dependency coordinate globs skipped entirely (nested provider artifacts).
    #[serde(default = "default_exclude_dependencies")]
    pub exclude_dependencies: Vec<String>,
}

impl Default for Build {
    fn default() -> Self {
        Self {
            classes: default_classes(),
            annotation: default_annotation(),
            exclude: default_exclude(),
            exclude_dependencies: default_exclude_dependencies(),
        }
    }
}

fn default_classes() -> Vec<String> {
    vec![
        "build/classes/kotlin/main".to_owned(),
        "build/classes/java/main".to_owned(),
    ]
}

fn default_annotation() -> String {
    "com.flixclusive.provider.FlixclusiveProvider".to_owned()
}

fn default_exclude() -> Vec<String> {
    vec!["*.aar".to_owned(), "*.bin".to_owned(), "META-INF/**".to_owned()]
}

fn default_exclude_dependencies() -> Vec<String> {
    vec!["com.github.flixclusive*:provider:*".to_owned()]
}

/// A resolved compile-only dependency jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Jar path relative to the project root.
    pub path: String,
    /// Maven coordinate (`group:artifact:version`) used for exclusion matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deploy {
    /// Directory on the device that receives archives.
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,
}

impl Default for Deploy {
    fn default() -> Self {
        Self {
            remote_dir: default_remote_dir(),
        }
    }
}

fn default_remote_dir() -> String {
    "/storage/emulated/0/Flixclusive/providers".to_owned()
}

impl Manifest {
    /// Read and parse a `flxpack.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// has neither a `[package]` nor a `[workspace]` table.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse manifest content; `origin` names the source in error messages.
    ///
    /// # Errors
    /// Returns an error if the content is invalid TOML or fails validation.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: origin.to_owned(),
            source: e,
        })?;
        manifest.validate(origin)?;
        Ok(manifest)
    }

    /// Serialize back to TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        toml::to_string_pretty(self).map_err(|e| ManifestError::Serialize {
            message: e.to_string(),
        })
    }

    /// The `[package]` table, required for every packaging operation.
    ///
    /// # Errors
    /// Returns an error if this manifest only declares a workspace.
    pub fn package(&self) -> Result<&Package, ManifestError> {
        self.package.as_ref().ok_or(ManifestError::NotAProvider)
    }

    /// Display name of the provider, falling back to the package name.
    ///
    /// # Errors
    /// Returns an error if this manifest only declares a workspace.
    pub fn provider_name(&self) -> Result<&str, ManifestError> {
        match &self.provider.name {
            Some(name) => Ok(name),
            None => Ok(&self.package()?.name),
        }
    }

    /// Version name, falling back to the version code.
    pub fn version_name(&self) -> String {
        self.provider
            .version_name
            .clone()
            .unwrap_or_else(|| self.provider.version_code.to_string())
    }

    fn validate(&self, origin: &str) -> Result<(), ManifestError> {
        let invalid = |message: &str| ManifestError::Invalid {
            path: origin.to_owned(),
            message: message.to_owned(),
        };

        if self.package.is_none() && self.workspace.is_none() {
            return Err(invalid("expected a [package] or [workspace] table"));
        }
        if let Some(package) = &self.package {
            if package.name.trim().is_empty() {
                return Err(invalid("package.name must not be empty"));
            }
        }
        if self.build.annotation.trim().is_empty() {
            return Err(invalid("build.annotation must not be empty"));
        }
        if self.android.min_sdk > self.android.compile_sdk {
            return Err(invalid("android.min_sdk must not exceed android.compile_sdk"));
        }
        if let Some(dep) = self.dependencies.iter().find(|d| d.path.trim().is_empty()) {
            let label = dep.coordinate.as_deref().unwrap_or("<unnamed>");
            return Err(invalid(&format!("dependency {label} has an empty path")));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid flxpack.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid flxpack.toml at {path}: {message}")]
    Invalid { path: String, message: String },
    #[error("cannot serialize flxpack.toml: {message}")]
    Serialize { message: String },
    #[error("flxpack.toml has no [package] table — this command needs a provider project")]
    NotAProvider,
}
