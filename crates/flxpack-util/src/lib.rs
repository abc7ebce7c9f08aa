#![forbid(unsafe_code)]
//! Filesystem, hashing, zip, and process helpers for flxpack.

pub mod archive;
pub mod error;
pub mod filename;
pub mod fs;
pub mod hash;
pub mod process;
