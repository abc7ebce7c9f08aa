//! Build directory layout shared by every task.
//!
//! ```text
//! build/
//!   <providerName>.flx
//!   updater.json
//!   libs/dependencies.jar
//!   intermediates/
//!     compiled_dependencies/   (removed after compileDex)
//!     providerClass
//!     classes.dex
//!     AndroidManifest.xml
//!     compiled_res.zip
//!     res.apk
//!     manifest.json
//! ```

use std::path::{Path, PathBuf};

use flxpack_model::{ARCHIVE_EXTENSION, DEX_FILE, MANIFEST_FILE};

/// Paths of every build output for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    build_dir: PathBuf,
}

impl BuildLayout {
    /// Layout under `<project_root>/build`.
    pub fn new(project_root: &Path) -> Self {
        Self {
            build_dir: project_root.join("build"),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn intermediates(&self) -> PathBuf {
        self.build_dir.join("intermediates")
    }

    /// Fat bundle of compile-only dependencies.
    pub fn dependencies_jar(&self) -> PathBuf {
        self.build_dir.join("libs").join("dependencies.jar")
    }

    /// Extraction directory of the fat bundle.
    pub fn compiled_dependencies(&self) -> PathBuf {
        self.intermediates().join("compiled_dependencies")
    }

    /// Side output of `compileDex`: the provider class binary name.
    pub fn provider_class(&self) -> PathBuf {
        self.intermediates().join("providerClass")
    }

    /// Scratch output directory handed to d8.
    pub fn dex_output_dir(&self) -> PathBuf {
        self.intermediates().join("dex")
    }

    /// Argument file listing every d8 input.
    pub fn d8_inputs(&self) -> PathBuf {
        self.intermediates().join("d8-inputs.txt")
    }

    pub fn classes_dex(&self) -> PathBuf {
        self.intermediates().join(DEX_FILE)
    }

    pub fn processed_manifest(&self) -> PathBuf {
        self.intermediates().join("AndroidManifest.xml")
    }

    pub fn compiled_resources(&self) -> PathBuf {
        self.intermediates().join("compiled_res.zip")
    }

    pub fn res_apk(&self) -> PathBuf {
        self.intermediates().join("res.apk")
    }

    pub fn manifest_json(&self) -> PathBuf {
        self.intermediates().join(MANIFEST_FILE)
    }

    /// `build/<name>.flx`
    pub fn archive(&self, provider_name: &str) -> PathBuf {
        self.build_dir
            .join(format!("{provider_name}.{ARCHIVE_EXTENSION}"))
    }

    pub fn updater_json(&self) -> PathBuf {
        self.build_dir.join("updater.json")
    }
}
