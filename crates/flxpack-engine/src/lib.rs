//! Task graph and pipeline for packaging Flixclusive providers into `.flx` archives.

pub mod bundle;
pub mod classfile;
pub mod deploy;
mod diagnostics;
pub mod dex;
pub mod error;
pub mod extract;
pub mod init;
pub mod layout;
pub mod metadata;
pub mod package;
pub mod pipeline;
pub mod project;
pub mod resources;
pub mod scan;
pub mod tasks;
pub mod updater;

#[cfg(test)]
mod testutil;

pub use error::EngineError;
pub use init::init_project;
pub use package::{make, validate_archive_name, MakeReport};
pub use pipeline::{clean, run, BuildOptions, RunReport, TaskOutput};
pub use project::Project;
pub use tasks::{plan, Plan, Task};
