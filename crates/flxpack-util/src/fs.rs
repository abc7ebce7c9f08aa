//! Filesystem utilities for flxpack.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

fn io_err(path: &Path, source: std::io::Error) -> UtilError {
    UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| io_err(path, source))
}

/// Write `contents` to `path`, creating parent directories first.
///
/// # Errors
/// Returns an error if the parent directory cannot be created or the file cannot be written.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), UtilError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    std::fs::write(path, contents).map_err(|source| io_err(path, source))
}

/// Read a UTF-8 file into a string.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid UTF-8.
pub fn read_to_string(path: &Path) -> Result<String, UtilError> {
    std::fs::read_to_string(path).map_err(|source| io_err(path, source))
}

/// Read a file into memory.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read(path: &Path) -> Result<Vec<u8>, UtilError> {
    std::fs::read(path).map_err(|source| io_err(path, source))
}

/// Remove a file. No error if the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn remove_file_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_err(path, source)),
    }
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_err(path, source)),
    }
}

/// Collect all files with the given `extension` under `dir`, recursively, sorted by path.
///
/// # Errors
/// Returns an error if `dir` cannot be read.
pub fn collect_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, UtilError> {
    let mut files = Vec::new();
    collect_files_recursive(dir, Some(extension), &mut files)?;
    files.sort();
    Ok(files)
}

/// Collect every regular file under `dir`, recursively, sorted by path.
///
/// # Errors
/// Returns an error if `dir` cannot be read.
pub fn collect_all_files(dir: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let mut files = Vec::new();
    collect_files_recursive(dir, None, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files_recursive(
    dir: &Path,
    extension: Option<&str>,
    out: &mut Vec<PathBuf>,
) -> Result<(), UtilError> {
    let entries = std::fs::read_dir(dir).map_err(|source| io_err(dir, source))?;

    for entry in entries {
        let entry = entry.map_err(|source| io_err(dir, source))?;
        let path = entry.path();

        if path.is_dir() {
            collect_files_recursive(&path, extension, out)?;
        } else if extension.is_none_or(|wanted| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == wanted)
        }) {
            out.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn ensure_dir_existing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_dir(tmp.path()).unwrap();
    }

    #[test]
    fn write_file_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("build").join("intermediates").join("providerClass");
        write_file(&dest, "com.example.Provider").unwrap();
        assert_eq!(read_to_string(&dest).unwrap(), "com.example.Provider");
    }

    #[test]
    fn read_missing_file_reports_path() {
        let err = read(Path::new("/nonexistent/flxpack/file")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flxpack/file"));
    }

    #[test]
    fn remove_file_if_exists_absent_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        remove_file_if_exists(&tmp.path().join("missing.dex")).unwrap();
    }

    #[test]
    fn remove_dir_all_if_exists_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("compiled_dependencies");
        fs::create_dir_all(dir.join("okhttp3")).unwrap();
        fs::write(dir.join("okhttp3").join("Call.class"), b"x").unwrap();

        remove_dir_all_if_exists(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn remove_dir_all_if_exists_absent_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        remove_dir_all_if_exists(&tmp.path().join("nonexistent")).unwrap();
    }

    #[test]
    fn collect_files_finds_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("com").join("example");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("B.class"), b"").unwrap();
        fs::write(sub.join("A.class"), b"").unwrap();
        fs::write(tmp.path().join("C.class"), b"").unwrap();
        fs::write(tmp.path().join("readme.md"), b"").unwrap();

        let files = collect_files(tmp.path(), "class").unwrap();
        assert_eq!(files.len(), 3);
        for pair in files.windows(2) {
            assert!(pair.first() <= pair.get(1));
        }
    }

    #[test]
    fn collect_all_files_includes_every_extension() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("values")).unwrap();
        fs::write(tmp.path().join("values").join("strings.xml"), b"").unwrap();
        fs::write(tmp.path().join("icon.png"), b"").unwrap();

        let files = collect_all_files(tmp.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn collect_files_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(collect_files(tmp.path(), "class").unwrap().is_empty());
    }
}
