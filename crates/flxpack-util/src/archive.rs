//! Zip reading and deterministic zip writing.
//!
//! Jars, `res.apk` and `.flx` archives are all plain zip files. Everything
//! written here uses a fixed entry timestamp so identical inputs produce
//! byte-identical archives.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::UtilError;

fn zip_err(path: &Path, source: zip::result::ZipError) -> UtilError {
    UtilError::Zip {
        path: path.display().to_string(),
        source,
    }
}

fn io_err(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, UtilError> {
    let file = File::open(path).map_err(|source| io_err(path, source))?;
    ZipArchive::new(file).map_err(|source| zip_err(path, source))
}

/// List the names of all file entries (directories excluded) in archive order.
///
/// # Errors
/// Returns an error if the archive cannot be opened or an entry cannot be read.
pub fn list_entries(path: &Path) -> Result<Vec<String>, UtilError> {
    let mut archive = open_archive(path)?;
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|source| zip_err(path, source))?;
        if !entry.is_dir() {
            names.push(entry.name().to_owned());
        }
    }
    Ok(names)
}

/// Read a single entry into memory.
///
/// # Errors
/// Returns an error if the archive cannot be opened or has no entry named `name`.
pub fn read_entry(path: &Path, name: &str) -> Result<Vec<u8>, UtilError> {
    let mut archive = open_archive(path)?;
    let mut entry = archive
        .by_name(name)
        .map_err(|source| zip_err(path, source))?;
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|source| io_err(path, source))?;
    Ok(contents)
}

/// Extract every file entry of the archive at `path` into `dest`.
///
/// Entries whose path would resolve outside `dest` (absolute paths, `..`
/// components) are rejected before anything is written for them.
///
/// Returns the number of files written.
///
/// # Errors
/// Returns an error if the archive cannot be read, an entry escapes `dest`,
/// or a file cannot be written.
pub fn extract(path: &Path, dest: &Path) -> Result<usize, UtilError> {
    let mut archive = open_archive(path)?;
    crate::fs::ensure_dir(dest)?;

    let mut written = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| zip_err(path, source))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(UtilError::PathTraversal {
                archive: path.display().to_string(),
                entry: entry.name().to_owned(),
                dest: dest.display().to_string(),
            });
        };
        let target: PathBuf = dest.join(relative);

        if entry.is_dir() {
            crate::fs::ensure_dir(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            crate::fs::ensure_dir(parent)?;
        }
        let mut out = File::create(&target).map_err(|source| io_err(&target, source))?;
        std::io::copy(&mut entry, &mut out).map_err(|source| io_err(&target, source))?;
        written = written.saturating_add(1);
    }

    Ok(written)
}

/// A zip writer that produces reproducible archives.
///
/// Entry names are unique: the first entry written under a name wins and later
/// attempts are reported as skipped.
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<File>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl ArchiveWriter {
    /// Create (or truncate) the archive at `path`.
    ///
    /// # Errors
    /// Returns an error if the parent directory or the file cannot be created.
    pub fn create(path: &Path) -> Result<Self, UtilError> {
        if let Some(parent) = path.parent() {
            crate::fs::ensure_dir(parent)?;
        }
        let file = File::create(path).map_err(|source| io_err(path, source))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(file),
            options,
            names: HashSet::new(),
        })
    }

    /// Add an entry from memory. Returns `false` if the name was already taken.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be written.
    pub fn add_bytes(&mut self, name: &str, contents: &[u8]) -> Result<bool, UtilError> {
        if !self.names.insert(name.to_owned()) {
            tracing::debug!(entry = name, archive = %self.path.display(), "duplicate entry skipped");
            return Ok(false);
        }
        self.zip
            .start_file(name, self.options)
            .map_err(|source| zip_err(&self.path, source))?;
        self.zip
            .write_all(contents)
            .map_err(|source| io_err(&self.path, source))?;
        Ok(true)
    }

    /// Add an entry from a file on disk. Returns `false` if the name was already taken.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the entry cannot be written.
    pub fn add_file(&mut self, name: &str, source_path: &Path) -> Result<bool, UtilError> {
        let contents = crate::fs::read(source_path)?;
        self.add_bytes(name, &contents)
    }

    /// Copy the file entries of another archive, in its order, for which `keep`
    /// returns `true`. Returns the names that were actually added.
    ///
    /// # Errors
    /// Returns an error if the source archive cannot be read or an entry cannot be written.
    pub fn copy_entries_from<F>(&mut self, source: &Path, keep: F) -> Result<Vec<String>, UtilError>
    where
        F: Fn(&str) -> bool,
    {
        let mut archive = open_archive(source)?;
        let mut added = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|source_err| zip_err(source, source_err))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_owned();
            if !keep(&name) {
                continue;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|source_err| io_err(source, source_err))?;
            if self.add_bytes(&name, &contents)? {
                added.push(name);
            }
        }
        Ok(added)
    }

    /// Finish writing the central directory and return the archive path.
    ///
    /// # Errors
    /// Returns an error if the archive cannot be finalized.
    pub fn finish(self) -> Result<PathBuf, UtilError> {
        self.zip
            .finish()
            .map_err(|source| zip_err(&self.path, source))?;
        Ok(self.path)
    }
}
