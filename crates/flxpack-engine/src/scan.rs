//! Provider-annotation scan over compiled class directories.

use std::path::{Path, PathBuf};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use crate::classfile::parse_class;
use crate::error::EngineError;

/// Find the single class annotated with `annotation` under `class_dirs`.
///
/// Missing directories are skipped. Returns `None` when no class carries the
/// annotation.
///
/// # Errors
/// Returns an error if a class file cannot be read or parsed, or if more than
/// one class carries the annotation.
pub fn find_provider_class(
    class_dirs: &[PathBuf],
    annotation: &str,
) -> Result<Option<String>, EngineError> {
    let mut class_files = Vec::new();
    for dir in class_dirs.iter().filter(|d| d.is_dir()) {
        class_files.extend(flxpack_util::fs::collect_files(dir, "class")?);
    }

    let hits: Vec<Result<Option<String>, EngineError>> = class_files
        .par_iter()
        .map(|path| annotated_class_name(path, annotation))
        .collect();

    let mut found = Vec::new();
    for hit in hits {
        if let Some(name) = hit? {
            found.push(name);
        }
    }
    found.sort();
    found.dedup();

    tracing::debug!(
        scanned = class_files.len(),
        annotation,
        found = ?found,
        "provider annotation scan"
    );

    match found.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(single.clone())),
        many => Err(EngineError::MultipleProviderClasses {
            annotation: annotation.to_owned(),
            count: many.len(),
            classes: many.join(", "),
        }),
    }
}

fn annotated_class_name(path: &Path, annotation: &str) -> Result<Option<String>, EngineError> {
    let bytes = flxpack_util::fs::read(path)?;
    let info = parse_class(&bytes).map_err(|source| EngineError::ClassFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(info.has_annotation(annotation).then_some(info.name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;
    use crate::classfile::tests::class_bytes;

    const ANNOTATION: &str = "com.flixclusive.provider.FlixclusiveProvider";

    fn write_class(dir: &Path, name: &str, annotations: &[&str]) {
        let rel = format!("{}.class", name.replace('.', "/"));
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, class_bytes(name, annotations, &[])).unwrap();
    }

    #[test]
    fn finds_the_annotated_class() {
        let tmp = tempfile::tempdir().unwrap();
        let kotlin = tmp.path().join("kotlin");
        let java = tmp.path().join("java");
        write_class(&kotlin, "com.example.Api", &["kotlin.Metadata"]);
        write_class(&kotlin, "com.example.TmdbProvider", &["kotlin.Metadata", ANNOTATION]);
        write_class(&java, "com.example.Helper", &[]);

        let found = find_provider_class(&[kotlin, java], ANNOTATION).unwrap();
        assert_eq!(found.as_deref(), Some("com.example.TmdbProvider"));
    }

    #[test]
    fn none_when_nothing_is_annotated() {
        let tmp = tempfile::tempdir().unwrap();
        write_class(tmp.path(), "a.B", &["kotlin.Metadata"]);
        assert!(find_provider_class(&[tmp.path().to_path_buf()], ANNOTATION)
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = vec![tmp.path().join("absent")];
        assert!(find_provider_class(&dirs, ANNOTATION).unwrap().is_none());
    }

    #[test]
    fn two_annotated_classes_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_class(tmp.path(), "a.First", &[ANNOTATION]);
        write_class(tmp.path(), "a.Second", &[ANNOTATION]);
        let err = find_provider_class(&[tmp.path().to_path_buf()], ANNOTATION)
            .unwrap_err()
            .to_string();
        assert!(err.contains("a.First, a.Second"), "error was: {err}");
    }

    #[test]
    fn corrupt_class_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("Broken.class"), b"nope").unwrap();
        let err = find_provider_class(&[tmp.path().to_path_buf()], ANNOTATION)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Broken.class"), "error was: {err}");
    }
}
