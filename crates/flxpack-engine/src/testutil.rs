//! Fixtures for engine tests: provider projects and stand-in SDK tools.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};

use flxpack_tools::sdk::Toolchain;
use flxpack_util::archive::ArchiveWriter;

use crate::classfile::tests::class_bytes;
use crate::project::Project;

pub(crate) const ANNOTATION: &str = "com.flixclusive.provider.FlixclusiveProvider";

/// Write a provider project with one annotated class and return it loaded.
pub(crate) fn provider_project(root: &Path, extra_toml: &str) -> Project {
    fs::create_dir_all(root).unwrap();
    fs::write(
        root.join("flxpack.toml"),
        format!(
            "[package]\nname = \"tmdb\"\n\n[provider]\nversion_code = 3\nversion_name = \"1.0.2\"\n{extra_toml}"
        ),
    )
    .unwrap();
    write_class(
        &root.join("build/classes/kotlin/main"),
        "com.example.tmdb.TmdbProvider",
        &["kotlin.Metadata", ANNOTATION],
    );
    write_class(
        &root.join("build/classes/java/main"),
        "com.example.tmdb.Helper",
        &[],
    );
    Project::load(root).unwrap()
}

pub(crate) fn write_class(dir: &Path, name: &str, annotations: &[&str]) {
    let path = dir.join(format!("{}.class", name.replace('.', "/")));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, class_bytes(name, annotations, &[])).unwrap();
}

#[cfg(unix)]
fn script(path: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// Stand-in `d8`, `aapt2`, and `android.jar` under `dir`.
///
/// `d8` writes a `classes.dex` into `--output`; `aapt2 link` copies a prepared
/// `res.apk` holding a manifest, a resource table, and one layout.
#[cfg(unix)]
pub(crate) fn fake_toolchain(dir: &Path) -> Toolchain {
    let apk = dir.join("fixture-res.apk");
    let mut writer = ArchiveWriter::create(&apk).unwrap();
    writer.add_bytes("AndroidManifest.xml", b"binary-xml").unwrap();
    writer.add_bytes("resources.arsc", b"table").unwrap();
    writer.add_bytes("res/layout/item.xml", b"layout").unwrap();
    writer.finish().unwrap();

    let d8 = script(
        &dir.join("bin/d8"),
        "while [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--output\" ]; then out=\"$2\"; fi\n  shift\ndone\nprintf 'dex\\n035' > \"$out/classes.dex\"\n",
    );
    let aapt2 = script(
        &dir.join("bin/aapt2"),
        &format!(
            "cmd=\"$1\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n  shift\ndone\nif [ \"$cmd\" = compile ]; then printf flat > \"$out\"; else cp '{}' \"$out\"; fi\n",
            apk.display()
        ),
    );
    let android_jar = dir.join("android.jar");
    fs::write(&android_jar, b"PK").unwrap();

    Toolchain {
        d8,
        aapt2,
        android_jar,
        build_tools_version: "34.0.0".to_owned(),
    }
}

/// Stand-in `adb` that reports `devices_output` and logs every call.
#[cfg(unix)]
pub(crate) fn fake_adb(dir: &Path, devices_output: &str) -> PathBuf {
    let log = dir.join("adb.log");
    script(
        &dir.join("bin/adb"),
        &format!(
            "echo \"$@\" >> '{}'\nfor a in \"$@\"; do\n  if [ \"$a\" = devices ]; then printf '{}'; fi\ndone\n",
            log.display(),
            devices_output
        ),
    )
}

/// Stand-in SDK root under `dir/sdk` with build-tools `34.0.0`, platform
/// `android-34`, and a logging `adb` in `platform-tools/`.
///
/// The `adb` call log is written to `dir/fixtures/adb.log`.
#[cfg(unix)]
pub(crate) fn fake_sdk(dir: &Path, devices_output: &str) -> PathBuf {
    let fixtures = dir.join("fixtures");
    let tools = fake_toolchain(&fixtures);
    let adb = fake_adb(&fixtures, devices_output);

    let sdk = dir.join("sdk");
    for (from, to) in [
        (&tools.d8, "build-tools/34.0.0/d8"),
        (&tools.aapt2, "build-tools/34.0.0/aapt2"),
        (&tools.android_jar, "platforms/android-34/android.jar"),
        (&adb, "platform-tools/adb"),
    ] {
        let target = sdk.join(to);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::copy(from, target).unwrap();
    }
    sdk
}
