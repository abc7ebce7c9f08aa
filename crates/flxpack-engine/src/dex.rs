//! `compileDex`: resolve the provider class and convert classes to `classes.dex`.

use std::path::PathBuf;

use flxpack_tools::invoke::D8Command;
use flxpack_tools::sdk::Toolchain;
use flxpack_util::fs;

use crate::diagnostics::print_diagnostics;
use crate::error::EngineError;
use crate::pipeline::BuildOptions;
use crate::project::Project;
use crate::scan::find_provider_class;

/// Outcome of DEX compilation.
#[derive(Debug)]
pub struct DexReport {
    pub dex: PathBuf,
    /// Provider class written to `intermediates/providerClass`, if one was found.
    pub provider_class: Option<String>,
    /// Number of `.class` files handed to d8.
    pub inputs: usize,
}

/// Configured `provider.class_name`, otherwise the annotation scan result.
///
/// # Errors
/// Returns an error if the scan fails or finds more than one provider class.
pub fn resolve_provider_class(project: &Project) -> Result<Option<String>, EngineError> {
    if let Some(name) = &project.manifest.provider.class_name {
        return Ok(Some(name.clone()));
    }
    find_provider_class(&project.class_dirs(), &project.manifest.build.annotation)
}

/// Run `d8` over the project classes plus the extracted dependencies.
///
/// Writes `intermediates/classes.dex` and `intermediates/providerClass`, then
/// deletes the dependency extraction directory.
///
/// # Errors
/// Returns an error if no classes exist, the scan fails, d8 fails, or d8 does
/// not produce exactly one `classes.dex`.
pub fn compile_dex(
    project: &Project,
    toolchain: &Toolchain,
    options: &BuildOptions,
) -> Result<DexReport, EngineError> {
    let layout = &project.layout;

    let provider_class = resolve_provider_class(project)?;
    match &provider_class {
        Some(name) => fs::write_file(&layout.provider_class(), name)?,
        None => {
            fs::remove_file_if_exists(&layout.provider_class())?;
            tracing::warn!(
                annotation = %project.manifest.build.annotation,
                "no annotated provider class found"
            );
        }
    }

    let mut search = project.class_dirs();
    search.push(layout.compiled_dependencies());
    let mut inputs = Vec::new();
    for dir in search.iter().filter(|d| d.is_dir()) {
        inputs.extend(
            fs::collect_files(dir, "class")?
                .into_iter()
                .filter(|p| p.file_name().is_some_and(|n| n != "module-info.class")),
        );
    }
    if inputs.is_empty() {
        return Err(EngineError::NoClasses {
            searched: search
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let out_dir = layout.dex_output_dir();
    fs::remove_dir_all_if_exists(&out_dir)?;

    let result = D8Command::new()
        .inputs(&inputs)
        .output_dir(&out_dir)
        .min_api(project.manifest.android.min_sdk)
        .libraries(std::slice::from_ref(&toolchain.android_jar))
        .release(options.release)
        .arg_file(&layout.d8_inputs())
        .execute(&toolchain.d8)?;
    print_diagnostics(&result, options.verbose);
    result.into_checked()?;

    let produced = fs::collect_files(&out_dir, "dex")?;
    let names: Vec<String> = produced
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    let [single] = produced.as_slice() else {
        return Err(EngineError::DexOutput {
            found: names.join(", "),
        });
    };
    if names.first().map(String::as_str) != Some(flxpack_model::DEX_FILE) {
        return Err(EngineError::DexOutput {
            found: names.join(", "),
        });
    }

    let dex = layout.classes_dex();
    fs::remove_file_if_exists(&dex)?;
    std::fs::rename(single, &dex).map_err(|source| EngineError::Io {
        path: dex.display().to_string(),
        source,
    })?;

    fs::remove_dir_all_if_exists(&out_dir)?;
    fs::remove_file_if_exists(&layout.d8_inputs())?;
    fs::remove_dir_all_if_exists(&layout.compiled_dependencies())?;

    Ok(DexReport {
        dex,
        provider_class,
        inputs: inputs.len(),
    })
}
