//! Error types for flxpack-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A command failed to execute.
    #[error("cannot execute {program}: {source}")]
    CommandExec {
        program: String,
        source: std::io::Error,
    },

    /// A zip archive could not be read or written.
    #[error("cannot process archive {path}: {source}")]
    Zip {
        path: String,
        source: zip::result::ZipError,
    },

    /// A zip entry attempted to escape the extraction directory.
    #[error("archive {archive} contains entry \"{entry}\" that escapes {dest}")]
    PathTraversal {
        archive: String,
        entry: String,
        dest: String,
    },

    /// A name cannot be used as a file name on common filesystems.
    #[error("invalid file name \"{name}\": {reason}")]
    InvalidFilename { name: String, reason: String },
}
