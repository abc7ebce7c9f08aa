//! A loaded provider project: its root, manifest, and build layout.

use std::path::{Path, PathBuf};

use flxpack_config::manifest::{Manifest, MANIFEST_FILE};

use crate::error::EngineError;
use crate::layout::BuildLayout;

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest: Manifest,
    pub layout: BuildLayout,
}

impl Project {
    /// Read `flxpack.toml` from `root`.
    ///
    /// # Errors
    /// Returns an error if the manifest is missing or invalid.
    pub fn load(root: &Path) -> Result<Self, EngineError> {
        let manifest = Manifest::from_path(&root.join(MANIFEST_FILE))?;
        Ok(Self::new(root, manifest))
    }

    pub fn new(root: &Path, manifest: Manifest) -> Self {
        Self {
            root: root.to_path_buf(),
            layout: BuildLayout::new(root),
            manifest,
        }
    }

    /// Package name, used as the manifest `name` and in build URLs.
    ///
    /// # Errors
    /// Returns an error if the manifest declares no `[package]`.
    pub fn package_name(&self) -> Result<&str, EngineError> {
        Ok(&self.manifest.package()?.name)
    }

    /// Whether this manifest describes a provider (not only a workspace).
    pub fn is_provider(&self) -> bool {
        self.manifest.package.is_some()
    }

    /// Resolve a manifest path relative to the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// The project's own compiled class directories, in configured order.
    pub fn class_dirs(&self) -> Vec<PathBuf> {
        self.manifest
            .build
            .classes
            .iter()
            .map(|c| self.resolve(c))
            .collect()
    }

    /// Providers the catalog covers: this project (if it is one) followed by
    /// every `[workspace]` member in declared order.
    ///
    /// # Errors
    /// Returns an error if a member cannot be loaded or the set is empty.
    pub fn catalog_members(&self) -> Result<Vec<Project>, EngineError> {
        let mut members = Vec::new();
        if self.is_provider() {
            members.push(self.clone());
        }
        if let Some(workspace) = &self.manifest.workspace {
            for member in &workspace.members {
                let dir = self.resolve(member);
                if !dir.join(MANIFEST_FILE).is_file() {
                    return Err(EngineError::MemberNotFound {
                        member: member.clone(),
                        path: dir.display().to_string(),
                    });
                }
                members.push(Project::load(&dir)?);
            }
        }
        if members.is_empty() {
            return Err(EngineError::EmptyWorkspace {
                path: self.root.display().to_string(),
            });
        }
        Ok(members)
    }
}
