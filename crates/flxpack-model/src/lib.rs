//! JSON contracts shared with the provider loader and the update catalog.
//!
//! `manifest.json` inside every `.flx` archive is a [`ProviderManifest`];
//! `updater.json` is an array of [`ProviderData`]. Absent optional fields are
//! omitted from the output rather than written as `null`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// File name of the manifest entry inside a `.flx` archive.
pub const MANIFEST_FILE: &str = "manifest.json";

/// File name of the bytecode entry inside a `.flx` archive.
pub const DEX_FILE: &str = "classes.dex";

/// Extension of provider archives.
pub const ARCHIVE_EXTENSION: &str = "flx";

/// The manifest the provider loader reads from an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderManifest {
    /// Fully qualified name of the class annotated as the provider entry point.
    pub provider_class_name: String,
    /// Project (package) name of the provider.
    #[serde(rename = "name")]
    pub package_name: String,
    pub version_name: String,
    pub version_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    #[serde(default)]
    pub requires_resources: bool,
}

impl ProviderManifest {
    /// Check the invariants the loader relies on.
    ///
    /// # Errors
    /// Returns an error if the version code is not positive or the provider
    /// class name is blank.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version_code <= 0 {
            return Err(ModelError::NonPositiveVersionCode {
                version_code: self.version_code,
            });
        }
        if self.provider_class_name.trim().is_empty() {
            return Err(ModelError::MissingProviderClass);
        }
        Ok(())
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(self).map_err(ModelError::from)
    }

    /// Parse a manifest from JSON.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or required fields are missing.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(ModelError::from)
    }
}

/// Availability state advertised in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderStatus {
    Down,
    Maintenance,
    #[default]
    Beta,
    Working,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Down => "Down",
            Self::Maintenance => "Maintenance",
            Self::Beta => "Beta",
            Self::Working => "Working",
        };
        f.write_str(s)
    }
}

/// Content language of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub language_code: String,
}

impl Default for Language {
    fn default() -> Self {
        Self {
            language_code: "en".to_owned(),
        }
    }
}

/// Kind of content a provider serves (e.g. "Movies", "TV Shows").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderType {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for ProviderType {
    fn default() -> Self {
        Self {
            kind: "Unknown".to_owned(),
        }
    }
}

/// A catalog entry describing one provider in `updater.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
    pub status: ProviderStatus,
    pub version_name: String,
    pub version_code: i64,
    #[serde(rename = "name")]
    pub display_name: String,
    pub adult: bool,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub provider_type: ProviderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
}

/// Serialize a catalog (the contents of `updater.json`).
///
/// # Errors
/// Returns an error if serialization fails.
pub fn catalog_to_json(entries: &[ProviderData]) -> Result<String, ModelError> {
    serde_json::to_string_pretty(entries).map_err(ModelError::from)
}

/// Parse a catalog.
///
/// # Errors
/// Returns an error if the JSON is not an array of catalog entries.
pub fn catalog_from_json(json: &str) -> Result<Vec<ProviderData>, ModelError> {
    serde_json::from_str(json).map_err(ModelError::from)
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no version is set — version code must be greater than 0, got {version_code}")]
    NonPositiveVersionCode { version_code: i64 },

    #[error("no provider class found, make sure your provider class is annotated with @FlixclusiveProvider")]
    MissingProviderClass,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
