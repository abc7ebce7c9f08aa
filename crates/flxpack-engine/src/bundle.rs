//! `compileRequiredDependencies`: merge compile-only dependencies into one fat jar.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use flxpack_config::manifest::Dependency;
use flxpack_util::archive::ArchiveWriter;
use flxpack_util::error::UtilError;

use crate::error::EngineError;
use crate::project::Project;

/// Outcome of bundling.
#[derive(Debug)]
pub struct BundleReport {
    /// Path of the written fat jar.
    pub path: PathBuf,
    /// Dependencies merged into the bundle.
    pub merged: usize,
    /// Dependencies skipped because their coordinate is excluded.
    pub skipped: Vec<String>,
    /// File entries written.
    pub entries: usize,
}

/// Exclusion rules for entries and whole dependencies.
#[derive(Debug)]
pub struct ExcludeRules {
    entries: Vec<Pattern>,
    coordinates: Vec<Pattern>,
}

// `*` also crosses `/`, so `*.bin` drops `.bin` files at any depth.
const MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, UtilError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| UtilError::GlobPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

impl ExcludeRules {
    /// Compile entry and coordinate glob patterns.
    ///
    /// # Errors
    /// Returns an error if any pattern is not a valid glob.
    pub fn new(entries: &[String], coordinates: &[String]) -> Result<Self, UtilError> {
        Ok(Self {
            entries: compile(entries)?,
            coordinates: compile(coordinates)?,
        })
    }

    pub fn excludes_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|p| p.matches_with(name, MATCH))
    }

    /// Whether the whole dependency is skipped (e.g. another provider).
    pub fn excludes_dependency(&self, dependency: &Dependency) -> bool {
        dependency
            .coordinate
            .as_deref()
            .is_some_and(|c| self.coordinates.iter().any(|p| p.matches_with(c, MATCH)))
    }
}

/// Write `build/libs/dependencies.jar` from the configured dependencies.
///
/// Dependencies are merged in declared order; the first occurrence of an entry
/// wins. A dependency may be a jar or a directory of classes. An empty bundle
/// is still written so extraction always has an input.
///
/// # Errors
/// Returns an error if a pattern is invalid, a dependency is missing, or the
/// bundle cannot be written.
pub fn compile_required_dependencies(project: &Project) -> Result<BundleReport, EngineError> {
    let build = &project.manifest.build;
    let rules = ExcludeRules::new(&build.exclude, &build.exclude_dependencies)?;
    let out = project.layout.dependencies_jar();

    let mut writer = ArchiveWriter::create(&out)?;
    let mut merged = 0;
    let mut skipped = Vec::new();
    let mut entries = 0;

    for dependency in &project.manifest.dependencies {
        let label = dependency
            .coordinate
            .clone()
            .unwrap_or_else(|| dependency.path.clone());
        if rules.excludes_dependency(dependency) {
            tracing::debug!(dependency = %label, "excluded from bundle");
            skipped.push(label);
            continue;
        }

        let path = project.resolve(&dependency.path);
        let added = if path.is_dir() {
            add_directory(&mut writer, &path, &rules)?
        } else if path.is_file() {
            writer
                .copy_entries_from(&path, |name| !rules.excludes_entry(name))?
                .len()
        } else {
            return Err(EngineError::DependencyNotFound {
                path: path.display().to_string(),
            });
        };
        tracing::debug!(dependency = %label, entries = added, "merged into bundle");
        merged += 1;
        entries += added;
    }

    let path = writer.finish()?;
    Ok(BundleReport {
        path,
        merged,
        skipped,
        entries,
    })
}

fn add_directory(
    writer: &mut ArchiveWriter,
    dir: &Path,
    rules: &ExcludeRules,
) -> Result<usize, EngineError> {
    let mut added = 0;
    for file in flxpack_util::fs::collect_all_files(dir)? {
        let Ok(rel) = file.strip_prefix(dir) else {
            continue;
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if rules.excludes_entry(&name) {
            continue;
        }
        if writer.add_file(&name, &file)? {
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use flxpack_config::manifest::Manifest;
    use flxpack_util::archive::{list_entries, read_entry};

    use super::*;

    fn jar(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ArchiveWriter::create(path).unwrap();
        for (name, contents) in entries {
            writer.add_bytes(name, contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn project(root: &Path, deps: &str) -> Project {
        let toml = format!("[package]\nname = \"tmdb\"\n{deps}");
        Project::new(root, Manifest::parse(&toml, "test").unwrap())
    }

    #[test]
    fn default_rules() {
        let manifest = Manifest::parse("[package]\nname = \"x\"\n", "test").unwrap();
        let rules =
            ExcludeRules::new(&manifest.build.exclude, &manifest.build.exclude_dependencies)
                .unwrap();
        assert!(rules.excludes_entry("META-INF/MANIFEST.MF"));
        assert!(rules.excludes_entry("META-INF/versions/9/module-info.class"));
        assert!(rules.excludes_entry("lib.aar"));
        assert!(rules.excludes_entry("nested/data.bin"));
        assert!(!rules.excludes_entry("com/example/A.class"));

        let provider = Dependency {
            path: "x.jar".to_owned(),
            coordinate: Some("com.github.flixclusive.providers:provider:1.0".to_owned()),
        };
        let library = Dependency {
            path: "y.jar".to_owned(),
            coordinate: Some("org.jsoup:jsoup:1.17.2".to_owned()),
        };
        assert!(rules.excludes_dependency(&provider));
        assert!(!rules.excludes_dependency(&library));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = ExcludeRules::new(&["[".to_owned()], &[]).unwrap_err();
        assert!(err.to_string().contains("invalid glob pattern"));
    }

    #[test]
    fn merges_in_order_first_wins() {
        let tmp = tempfile::tempdir().unwrap();
        jar(
            &tmp.path().join("libs/a.jar"),
            &[("a/A.class", "A1"), ("shared/S.class", "from-a"), ("META-INF/MANIFEST.MF", "m")],
        );
        jar(
            &tmp.path().join("libs/b.jar"),
            &[("shared/S.class", "from-b"), ("b/B.class", "B1"), ("x.bin", "blob")],
        );
        let project = project(
            tmp.path(),
            "[[dependencies]]\npath = \"libs/a.jar\"\n[[dependencies]]\npath = \"libs/b.jar\"\n",
        );

        let report = compile_required_dependencies(&project).unwrap();
        assert_eq!(report.merged, 2);
        assert_eq!(report.entries, 3);
        assert_eq!(
            list_entries(&report.path).unwrap(),
            vec!["a/A.class", "shared/S.class", "b/B.class"]
        );
        assert_eq!(read_entry(&report.path, "shared/S.class").unwrap(), b"from-a");
    }

    #[test]
    fn provider_dependencies_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        jar(&tmp.path().join("p.jar"), &[("p/P.class", "P")]);
        let project = project(
            tmp.path(),
            "[[dependencies]]\npath = \"p.jar\"\ncoordinate = \"com.github.flixclusive:provider:2.0\"\n",
        );
        let report = compile_required_dependencies(&project).unwrap();
        assert_eq!(report.merged, 0);
        assert_eq!(report.skipped, vec!["com.github.flixclusive:provider:2.0"]);
        assert!(list_entries(&report.path).unwrap().is_empty());
    }

    #[test]
    fn class_directories_are_merged() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("extra");
        fs::create_dir_all(dir.join("com/x")).unwrap();
        fs::create_dir_all(dir.join("META-INF")).unwrap();
        fs::write(dir.join("com/x/X.class"), b"X").unwrap();
        fs::write(dir.join("META-INF/x.kotlin_module"), b"k").unwrap();
        let project = project(tmp.path(), "[[dependencies]]\npath = \"extra\"\n");

        let report = compile_required_dependencies(&project).unwrap();
        assert_eq!(list_entries(&report.path).unwrap(), vec!["com/x/X.class"]);
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let project = project(tmp.path(), "[[dependencies]]\npath = \"nope.jar\"\n");
        let err = compile_required_dependencies(&project).unwrap_err().to_string();
        assert!(err.contains("nope.jar"), "error was: {err}");
    }

    #[test]
    fn no_dependencies_writes_empty_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let report = compile_required_dependencies(&project(tmp.path(), "")).unwrap();
        assert!(report.path.is_file());
        assert_eq!(report.entries, 0);
    }
}
