//! `compileResources`: process the Android manifest and build `res.apk` with aapt2.

use std::path::{Path, PathBuf};

use flxpack_tools::invoke::{Aapt2CompileCommand, Aapt2LinkCommand};
use flxpack_tools::sdk::Toolchain;

use crate::diagnostics::print_diagnostics;
use crate::error::EngineError;
use crate::pipeline::BuildOptions;
use crate::project::Project;

/// Produce the manifest text aapt2 links against.
///
/// A configured manifest is used as-is when it carries a `package`
/// attribute (which must agree with `android.namespace` if both are set);
/// otherwise the namespace is inserted. Without a configured manifest a
/// minimal one is generated from the namespace.
///
/// # Errors
/// Returns an error if the manifest is malformed or no package can be determined.
pub fn processed_manifest(project: &Project) -> Result<String, EngineError> {
    let namespace = project.manifest.android.namespace.as_deref();

    let Some(configured) = &project.manifest.android.manifest else {
        let package = namespace.ok_or(EngineError::MissingNamespace)?;
        check_package(package, "android.namespace")?;
        return Ok(minimal_manifest(package));
    };

    let path = project.resolve(configured);
    let text = flxpack_util::fs::read_to_string(&path)?;
    process_manifest_text(&text, namespace, &path)
}

fn process_manifest_text(
    text: &str,
    namespace: Option<&str>,
    path: &Path,
) -> Result<String, EngineError> {
    let invalid = |message: String| EngineError::AndroidManifest {
        path: path.display().to_string(),
        message,
    };

    let doc = roxmltree::Document::parse(text).map_err(|e| invalid(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "manifest" {
        return Err(invalid(format!(
            "root element is <{}>, expected <manifest>",
            root.tag_name().name()
        )));
    }

    match (root.attribute("package"), namespace) {
        (Some(package), Some(ns)) if package != ns => Err(invalid(format!(
            "package \"{package}\" does not match android.namespace \"{ns}\""
        ))),
        (Some(package), _) => {
            check_package(package, &path.display().to_string())?;
            Ok(text.to_owned())
        }
        (None, Some(ns)) => {
            check_package(ns, "android.namespace")?;
            // Insert right after the `<manifest` tag name.
            let at = root.range().start + "<manifest".len();
            let (head, tail) = text
                .split_at_checked(at)
                .ok_or_else(|| invalid("cannot locate the <manifest> tag".to_owned()))?;
            Ok(format!("{head} package=\"{ns}\"{tail}"))
        }
        (None, None) => Err(EngineError::MissingNamespace),
    }
}

fn minimal_manifest(package: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <manifest xmlns:android=\"http://schemas.android.com/apk/res/android\" package=\"{package}\">\n    \
         <application />\n\
         </manifest>\n"
    )
}

/// Dotted Java package name with at least two segments.
fn check_package(package: &str, origin: &str) -> Result<(), EngineError> {
    let segments: Vec<&str> = package.split('.').collect();
    let valid = segments.len() >= 2
        && segments.iter().all(|s| {
            let mut chars = s.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(EngineError::AndroidManifest {
            path: origin.to_owned(),
            message: format!("\"{package}\" is not a valid package name"),
        })
    }
}

/// Compile and link the resource tree into `intermediates/res.apk`.
///
/// # Errors
/// Returns an error if the resource directory or manifest are unusable, or aapt2 fails.
pub fn compile_resources(
    project: &Project,
    toolchain: &Toolchain,
    options: &BuildOptions,
) -> Result<PathBuf, EngineError> {
    let layout = &project.layout;
    let android = &project.manifest.android;

    let res_dir = project.resolve(&android.resources);
    if !res_dir.is_dir() {
        return Err(EngineError::ResourcesMissing {
            path: res_dir.display().to_string(),
        });
    }

    let manifest_path = layout.processed_manifest();
    flxpack_util::fs::write_file(&manifest_path, processed_manifest(project)?)?;

    let compiled = layout.compiled_resources();
    let result = Aapt2CompileCommand::new()
        .res_dir(&res_dir)
        .output(&compiled)
        .execute(&toolchain.aapt2)?;
    print_diagnostics(&result, options.verbose);
    result.into_checked()?;

    let apk = layout.res_apk();
    let result = Aapt2LinkCommand::new()
        .android_jar(&toolchain.android_jar)
        .manifest(&manifest_path)
        .compiled(std::slice::from_ref(&compiled))
        .min_sdk(android.min_sdk)
        .target_sdk(android.compile_sdk)
        .output(&apk)
        .execute(&toolchain.aapt2)?;
    print_diagnostics(&result, options.verbose);
    result.into_checked()?;

    flxpack_util::fs::remove_file_if_exists(&compiled)?;
    Ok(apk)
}
