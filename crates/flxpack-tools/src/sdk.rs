//! Android SDK discovery: build-tools, platform jars, and platform-tools.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::error::ToolError;

/// A located Android SDK installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidSdk {
    /// SDK root directory (contains `build-tools/`, `platforms/`, `platform-tools/`).
    pub root: PathBuf,
}

/// The tool paths one packaging run needs.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// `d8` bytecode converter.
    pub d8: PathBuf,
    /// `aapt2` resource compiler.
    pub aapt2: PathBuf,
    /// `android.jar` of the compile SDK, used as library classpath.
    pub android_jar: PathBuf,
    /// Build-tools version the tools were taken from.
    pub build_tools_version: String,
}

/// Append the platform executable suffix to a tool name.
pub fn exe_name(tool: &str) -> String {
    if cfg!(windows) {
        match tool {
            "d8" => "d8.bat".to_owned(),
            other => format!("{other}.exe"),
        }
    } else {
        tool.to_owned()
    }
}

impl AndroidSdk {
    /// Locate the SDK from `ANDROID_HOME`, then `ANDROID_SDK_ROOT`.
    ///
    /// # Errors
    /// Returns an error if neither variable is set or the directory does not exist.
    pub fn locate() -> Result<Self, ToolError> {
        let root = std::env::var_os("ANDROID_HOME")
            .filter(|v| !v.is_empty())
            .or_else(|| std::env::var_os("ANDROID_SDK_ROOT").filter(|v| !v.is_empty()))
            .map(PathBuf::from)
            .ok_or(ToolError::SdkNotFound)?;
        Self::at(&root)
    }

    /// Use the SDK rooted at `root`.
    ///
    /// # Errors
    /// Returns an error if `root` is not a directory.
    pub fn at(root: &Path) -> Result<Self, ToolError> {
        if !root.is_dir() {
            return Err(ToolError::SdkMissing {
                path: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Installed build-tools versions, highest first.
    ///
    /// Directories whose names are not version-like are ignored.
    ///
    /// # Errors
    /// Returns an error if the `build-tools/` directory cannot be read.
    pub fn build_tools_versions(&self) -> Result<Vec<String>, ToolError> {
        let dir = self.root.join("build-tools");
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&dir).map_err(|source| {
            ToolError::Util(flxpack_util::error::UtilError::Io {
                path: dir.display().to_string(),
                source,
            })
        })?;

        let mut versions: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_owned))
            .filter(|name| version_key(name).is_some())
            .collect();
        versions.sort_by(|a, b| compare_versions(b, a));
        Ok(versions)
    }

    /// Directory of the requested build-tools version, or the highest installed one.
    ///
    /// # Errors
    /// Returns an error if the version is not installed or none is installed.
    pub fn build_tools_dir(&self, version: Option<&str>) -> Result<(String, PathBuf), ToolError> {
        let base = self.root.join("build-tools");
        let chosen = match version {
            Some(v) => {
                if !base.join(v).is_dir() {
                    return Err(ToolError::BuildToolsNotFound {
                        path: base.join(v),
                        hint: v.to_owned(),
                    });
                }
                v.to_owned()
            }
            None => self
                .build_tools_versions()?
                .into_iter()
                .next()
                .ok_or_else(|| ToolError::BuildToolsNotFound {
                    path: base.clone(),
                    hint: "<version>".to_owned(),
                })?,
        };
        let dir = base.join(&chosen);
        Ok((chosen, dir))
    }

    /// `platforms/android-<compile_sdk>/android.jar`.
    ///
    /// # Errors
    /// Returns an error if the platform is not installed.
    pub fn android_jar(&self, compile_sdk: u32) -> Result<PathBuf, ToolError> {
        let path = self
            .root
            .join("platforms")
            .join(format!("android-{compile_sdk}"))
            .join("android.jar");
        if path.is_file() {
            Ok(path)
        } else {
            Err(ToolError::PlatformNotFound { compile_sdk, path })
        }
    }

    /// Resolve every tool needed to package a provider.
    ///
    /// # Errors
    /// Returns an error if build-tools, `d8`, `aapt2`, or the platform jar is missing.
    pub fn toolchain(
        &self,
        compile_sdk: u32,
        build_tools: Option<&str>,
    ) -> Result<Toolchain, ToolError> {
        let (version, dir) = self.build_tools_dir(build_tools)?;
        let d8 = require_tool(&dir, "d8")?;
        let aapt2 = require_tool(&dir, "aapt2")?;
        let android_jar = self.android_jar(compile_sdk)?;

        tracing::debug!(
            build_tools = %version,
            d8 = %d8.display(),
            aapt2 = %aapt2.display(),
            android_jar = %android_jar.display(),
            "resolved Android toolchain"
        );

        Ok(Toolchain {
            d8,
            aapt2,
            android_jar,
            build_tools_version: version,
        })
    }
}

fn require_tool(dir: &Path, tool: &str) -> Result<PathBuf, ToolError> {
    let path = dir.join(exe_name(tool));
    if path.is_file() {
        Ok(path)
    } else {
        Err(ToolError::ToolNotFound {
            tool: tool.to_owned(),
            searched: dir.display().to_string(),
        })
    }
}

/// Locate `adb`: `<sdk>/platform-tools/adb` first, then `PATH`.
///
/// # Errors
/// Returns an error if `adb` is found in neither place.
pub fn locate_adb(sdk: Option<&AndroidSdk>) -> Result<PathBuf, ToolError> {
    let name = exe_name("adb");
    if let Some(sdk) = sdk {
        let candidate = sdk.root.join("platform-tools").join(&name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    flxpack_util::process::which(&name).ok_or_else(|| ToolError::ToolNotFound {
        tool: "adb".to_owned(),
        searched: match sdk {
            Some(sdk) => format!("{}/platform-tools and PATH", sdk.root.display()),
            None => "PATH".to_owned(),
        },
    })
}

/// Split a build-tools directory name like `34.0.0` or `35.0.0-rc1` into
/// numeric components and an optional pre-release tag.
fn version_key(name: &str) -> Option<(Vec<u64>, Option<&str>)> {
    let (numbers, pre) = match name.split_once('-') {
        Some((n, p)) => (n, Some(p)),
        None => (name, None),
    };
    let parts: Option<Vec<u64>> = numbers.split('.').map(|p| p.parse().ok()).collect();
    let parts = parts?;
    if parts.is_empty() {
        return None;
    }
    Some((parts, pre))
}

/// Order version strings; a pre-release sorts below its release.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (version_key(a), version_key(b)) {
        (Some((na, pa)), Some((nb, pb))) => na.cmp(&nb).then_with(|| match (pa, pb) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(y),
        }),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    fn fake_sdk(versions: &[&str], platforms: &[u32]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for v in versions {
            let dir = tmp.path().join("build-tools").join(v);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(exe_name("d8")), b"#!/bin/sh\n").unwrap();
            fs::write(dir.join(exe_name("aapt2")), b"").unwrap();
        }
        for p in platforms {
            let dir = tmp.path().join("platforms").join(format!("android-{p}"));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("android.jar"), b"PK").unwrap();
        }
        tmp
    }

    #[test]
    fn at_rejects_missing_root() {
        let err = AndroidSdk::at(Path::new("/nonexistent/sdk")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sdk"));
    }

    #[test]
    fn build_tools_versions_sorted_highest_first() {
        let tmp = fake_sdk(&["30.0.3", "34.0.0", "35.0.0-rc1", "9.0.0"], &[]);
        fs::create_dir_all(tmp.path().join("build-tools").join("not-a-version")).unwrap();
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        assert_eq!(
            sdk.build_tools_versions().unwrap(),
            vec!["35.0.0-rc1", "34.0.0", "30.0.3", "9.0.0"]
        );
    }

    #[test]
    fn build_tools_dir_defaults_to_highest() {
        let tmp = fake_sdk(&["33.0.1", "34.0.0"], &[]);
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        let (version, dir) = sdk.build_tools_dir(None).unwrap();
        assert_eq!(version, "34.0.0");
        assert!(dir.ends_with("build-tools/34.0.0"));
    }

    #[test]
    fn build_tools_dir_honours_explicit_version() {
        let tmp = fake_sdk(&["33.0.1", "34.0.0"], &[]);
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        let (version, _) = sdk.build_tools_dir(Some("33.0.1")).unwrap();
        assert_eq!(version, "33.0.1");
        assert!(sdk.build_tools_dir(Some("99.0.0")).is_err());
    }

    #[test]
    fn build_tools_dir_errors_when_none_installed() {
        let tmp = fake_sdk(&[], &[]);
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        let err = sdk.build_tools_dir(None).unwrap_err().to_string();
        assert!(err.contains("no build-tools found"), "error was: {err}");
    }

    #[test]
    fn toolchain_resolves_all_tools() {
        let tmp = fake_sdk(&["34.0.0"], &[34]);
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        let toolchain = sdk.toolchain(34, None).unwrap();
        assert_eq!(toolchain.build_tools_version, "34.0.0");
        assert!(toolchain.d8.is_file());
        assert!(toolchain.aapt2.is_file());
        assert!(toolchain.android_jar.ends_with("android-34/android.jar"));
    }

    #[test]
    fn toolchain_reports_missing_platform() {
        let tmp = fake_sdk(&["34.0.0"], &[33]);
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        let err = sdk.toolchain(34, None).unwrap_err().to_string();
        assert!(err.contains("platforms;android-34"), "error was: {err}");
    }

    #[test]
    fn toolchain_reports_missing_tool() {
        let tmp = fake_sdk(&["34.0.0"], &[34]);
        fs::remove_file(
            tmp.path()
                .join("build-tools")
                .join("34.0.0")
                .join(exe_name("aapt2")),
        )
        .unwrap();
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        let err = sdk.toolchain(34, None).unwrap_err().to_string();
        assert!(err.contains("aapt2 not found"), "error was: {err}");
    }

    #[test]
    fn locate_adb_prefers_platform_tools() {
        let tmp = fake_sdk(&[], &[]);
        let dir = tmp.path().join("platform-tools");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(exe_name("adb")), b"").unwrap();
        let sdk = AndroidSdk::at(tmp.path()).unwrap();
        assert_eq!(locate_adb(Some(&sdk)).unwrap(), dir.join(exe_name("adb")));
    }

    #[test]
    fn compare_versions_orders_numerically() {
        assert_eq!(compare_versions("10.0.0", "9.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("34.0.0", "34.0.0-rc1"), Ordering::Greater);
        assert_eq!(compare_versions("34.0.0-rc1", "34.0.0-rc2"), Ordering::Less);
        assert_eq!(compare_versions("34.0.0", "34.0.0"), Ordering::Equal);
    }
}
