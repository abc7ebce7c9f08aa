//! Parse and validate `flxpack.toml`.

pub mod manifest;

pub use manifest::{Manifest, ManifestError, MANIFEST_FILE};
