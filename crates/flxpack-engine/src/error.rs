//! Error types for flxpack-engine.

use crate::classfile::ClassFileError;

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] flxpack_util::error::UtilError),

    /// A manifest operation failed.
    #[error("{0}")]
    Manifest(#[from] flxpack_config::manifest::ManifestError),

    /// A provider manifest or catalog violated its contract.
    #[error("{0}")]
    Model(#[from] flxpack_model::ModelError),

    /// An SDK tool could not be located or failed.
    #[error("{0}")]
    Tool(#[from] flxpack_tools::ToolError),

    /// The task graph contains a cycle.
    #[error("task cycle detected: {cycle}")]
    DependencyCycle { cycle: String },

    /// A configured dependency jar does not exist.
    #[error("dependency {path} does not exist — check [[dependencies]] in flxpack.toml")]
    DependencyNotFound { path: String },

    /// A class file could not be parsed.
    #[error("cannot read class file {path}: {source}")]
    ClassFile {
        path: String,
        source: ClassFileError,
    },

    /// More than one class carries the provider annotation.
    #[error("found {count} classes annotated with @{annotation} ({classes}) — a provider must have exactly one, or set provider.class_name")]
    MultipleProviderClasses {
        annotation: String,
        count: usize,
        classes: String,
    },

    /// Nothing to convert to DEX.
    #[error("no .class files found (looked in {searched}) — compile the project first")]
    NoClasses { searched: String },

    /// d8 produced something other than a single `classes.dex`.
    #[error("expected d8 to produce a single classes.dex, found [{found}] — reduce the method count or raise android.min_sdk")]
    DexOutput { found: String },

    /// An intermediate file that an earlier task produces is missing.
    #[error("{path} not found — run `{task}` first")]
    MissingIntermediate { path: String, task: String },

    /// The resource directory is missing while resources are required.
    #[error("resource directory {path} does not exist but provider.requires_resources is set")]
    ResourcesMissing { path: String },

    /// The application manifest is malformed.
    #[error("invalid Android manifest {path}: {message}")]
    AndroidManifest { path: String, message: String },

    /// No package name is available for the processed Android manifest.
    #[error("cannot determine the Android package — set android.namespace in flxpack.toml")]
    MissingNamespace,

    /// The provider name cannot be used as the archive file name.
    #[error("cannot name the archive \"{name}\": {reason}")]
    InvalidArchiveName { name: String, reason: String },

    /// A project already exists at the target path.
    #[error("flxpack.toml already exists at {path} — cannot initialize over an existing project")]
    ProjectExists { path: String },

    /// A workspace member has no `flxpack.toml`.
    #[error("workspace member `{member}` not found at {path}")]
    MemberNotFound { member: String, path: String },

    /// A workspace lists no providers.
    #[error("workspace at {path} has no members")]
    EmptyWorkspace { path: String },
}
