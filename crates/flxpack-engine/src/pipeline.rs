//! Pipeline orchestration: plan a goal, resolve the SDK, run tasks level by level.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use flxpack_tools::sdk::{locate_adb, AndroidSdk, Toolchain};
use flxpack_tools::ToolError;

use crate::bundle::compile_required_dependencies;
use crate::deploy::deploy_with_adb;
use crate::dex::compile_dex;
use crate::diagnostics::status;
use crate::error::EngineError;
use crate::extract::extract_required_dependencies;
use crate::package::make;
use crate::project::Project;
use crate::resources::compile_resources;
use crate::tasks::{plan, Task};
use crate::updater::generate_updater_json;

/// Options controlling a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Print raw tool output.
    pub verbose: bool,
    /// Pass `--release` to d8.
    pub release: bool,
    /// Device serial for `deployWithAdb`.
    pub serial: Option<String>,
    /// Android SDK root; `ANDROID_HOME`/`ANDROID_SDK_ROOT` when unset.
    pub sdk_root: Option<PathBuf>,
}

/// Output of one executed task.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    /// Package name of the project the task ran for, or the workspace root path.
    pub project: String,
    pub task: Task,
    /// Main file or directory the task produced.
    pub path: PathBuf,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunReport {
    /// Task outputs in completion order.
    pub outputs: Vec<TaskOutput>,
    pub duration: Duration,
}

impl RunReport {
    /// Output path of the last run of `task`, if it ran.
    pub fn output(&self, task: Task) -> Option<&Path> {
        self.outputs
            .iter()
            .rev()
            .find(|o| o.task == task)
            .map(|o| o.path.as_path())
    }
}

/// Run `goal` and everything it depends on for the project at `root`.
///
/// A provider project runs its own plan. A root that only declares a
/// `[workspace]` runs the goal for each member in parallel. For a workspace
/// root, `generateUpdaterJson` packages every member and writes a single
/// catalog at the root; `deployWithAdb` does the same and then pushes each
/// member's archive together with that root catalog, one device at a time.
///
/// # Errors
/// Returns the first error of any task; later levels do not run.
pub fn run(root: &Path, goal: Task, options: &BuildOptions) -> Result<RunReport, EngineError> {
    let start = Instant::now();
    let project = Project::load(root)?;

    let outputs = if project.is_provider() {
        run_project(&project, goal, options)?
    } else {
        run_workspace(&project, goal, options)?
    };

    Ok(RunReport {
        outputs,
        duration: start.elapsed(),
    })
}

fn run_workspace(
    root: &Project,
    goal: Task,
    options: &BuildOptions,
) -> Result<Vec<TaskOutput>, EngineError> {
    let members = root.catalog_members()?;

    match goal {
        Task::GenerateUpdaterJson => {
            let mut outputs = run_members(&members, Task::Make, options)?;
            outputs.push(write_catalog(root)?);
            Ok(outputs)
        }
        Task::DeployWithAdb => {
            let mut outputs = run_members(&members, Task::Make, options)?;
            let catalog = write_catalog(root)?;
            let catalog_path = catalog.path.clone();
            outputs.push(catalog);

            let adb = resolve_adb(options)?;
            for member in &members {
                outputs.push(deploy(member, &adb, &catalog_path, options)?);
            }
            Ok(outputs)
        }
        _ => run_members(&members, goal, options),
    }
}

fn run_members(
    members: &[Project],
    goal: Task,
    options: &BuildOptions,
) -> Result<Vec<TaskOutput>, EngineError> {
    let results: Vec<Result<Vec<TaskOutput>, EngineError>> = members
        .par_iter()
        .map(|member| run_project(member, goal, options))
        .collect();

    let mut outputs = Vec::new();
    for result in results {
        outputs.extend(result?);
    }
    Ok(outputs)
}

/// Run the plan for `goal` in a single provider project.
///
/// # Errors
/// Returns the first task error.
pub fn run_project(
    project: &Project,
    goal: Task,
    options: &BuildOptions,
) -> Result<Vec<TaskOutput>, EngineError> {
    let requires_resources = project.manifest.provider.requires_resources;
    if goal == Task::CompileResources && !requires_resources {
        status(
            "Skipping",
            &format!(
                "{} resources (provider.requires_resources is false)",
                project.package_name()?
            ),
        );
        return Ok(Vec::new());
    }

    let plan = plan(goal, requires_resources)?;
    tracing::debug!(
        project = %project.root.display(),
        goal = %goal,
        tasks = ?plan.tasks().map(Task::name).collect::<Vec<_>>(),
        "planned"
    );

    let toolchain = if plan.needs_toolchain() {
        Some(resolve_toolchain(project, options)?)
    } else {
        None
    };

    let mut outputs = Vec::new();
    for level in plan.levels() {
        let results: Vec<Result<TaskOutput, EngineError>> = level
            .par_iter()
            .map(|&task| run_task(project, task, toolchain.as_ref(), options))
            .collect();
        for result in results {
            outputs.push(result?);
        }
    }
    Ok(outputs)
}

/// The SDK at `options.sdk_root`, or the one named by the environment.
fn locate_sdk(options: &BuildOptions) -> Result<AndroidSdk, ToolError> {
    match &options.sdk_root {
        Some(root) => AndroidSdk::at(root),
        None => AndroidSdk::locate(),
    }
}

fn resolve_toolchain(project: &Project, options: &BuildOptions) -> Result<Toolchain, EngineError> {
    let android = &project.manifest.android;
    let sdk = locate_sdk(options)?;
    Ok(sdk.toolchain(android.compile_sdk, android.build_tools.as_deref())?)
}

fn resolve_adb(options: &BuildOptions) -> Result<PathBuf, EngineError> {
    let sdk = locate_sdk(options).ok();
    Ok(locate_adb(sdk.as_ref())?)
}

fn run_task(
    project: &Project,
    task: Task,
    toolchain: Option<&Toolchain>,
    options: &BuildOptions,
) -> Result<TaskOutput, EngineError> {
    let name = project.package_name()?;
    tracing::info!(project = name, task = %task, "running task");

    let path = match task {
        Task::CompileRequiredDependencies => {
            let report = compile_required_dependencies(project)?;
            for skipped in &report.skipped {
                status("Skipping", &format!("{skipped} (excluded dependency)"));
            }
            status(
                "Bundling",
                &format!(
                    "{name} ({} dependencies, {} entries)",
                    report.merged, report.entries
                ),
            );
            report.path
        }
        Task::ExtractRequiredDependencies => {
            let (dir, count) = extract_required_dependencies(project)?;
            status("Extracting", &format!("{name} ({count} entries)"));
            dir
        }
        Task::CompileDex => {
            let report = compile_dex(project, require(toolchain)?, options)?;
            let provider_class = report.provider_class.as_deref().unwrap_or("none found");
            status(
                "Compiling",
                &format!(
                    "{name} classes.dex ({} classes, provider {provider_class})",
                    report.inputs
                ),
            );
            report.dex
        }
        Task::CompileResources => {
            let apk = compile_resources(project, require(toolchain)?, options)?;
            status("Compiling", &format!("{name} resources"));
            apk
        }
        Task::Make => {
            let report = make(project)?;
            status(
                "Packaging",
                &format!(
                    "{name} v{} \u{2192} {}",
                    report.manifest.version_name,
                    report.archive.display()
                ),
            );
            report.archive
        }
        Task::GenerateUpdaterJson => {
            let others: Vec<Project> = project
                .catalog_members()?
                .into_iter()
                .filter(|m| m.root != project.root)
                .collect();
            run_members(&others, Task::Make, options)?;
            return write_catalog(project);
        }
        Task::DeployWithAdb => {
            let adb = resolve_adb(options)?;
            return deploy(project, &adb, &project.layout.updater_json(), options);
        }
    };

    Ok(TaskOutput {
        project: name.to_owned(),
        task,
        path,
    })
}

fn deploy(
    project: &Project,
    adb: &Path,
    catalog: &Path,
    options: &BuildOptions,
) -> Result<TaskOutput, EngineError> {
    let name = project.package_name()?;
    let report = deploy_with_adb(project, adb, catalog, options.serial.as_deref())?;
    status(
        "Deploying",
        &format!("{name} to {} ({})", report.serial, report.remote_dir),
    );
    Ok(TaskOutput {
        project: name.to_owned(),
        task: Task::DeployWithAdb,
        path: PathBuf::from(report.remote_dir),
    })
}

fn write_catalog(root: &Project) -> Result<TaskOutput, EngineError> {
    let (path, entries) = generate_updater_json(root)?;
    status(
        "Writing",
        &format!("{} ({} providers)", path.display(), entries.len()),
    );
    Ok(TaskOutput {
        project: match root.package_name() {
            Ok(name) => name.to_owned(),
            Err(_) => root.root.display().to_string(),
        },
        task: Task::GenerateUpdaterJson,
        path,
    })
}

fn require(toolchain: Option<&Toolchain>) -> Result<&Toolchain, EngineError> {
    toolchain.ok_or(EngineError::Tool(ToolError::SdkNotFound))
}

/// Remove the project's `build/` directory.
///
/// # Errors
/// Returns an error if the directory cannot be removed.
pub fn clean(root: &Path) -> Result<(), EngineError> {
    let project = Project::load(root)?;
    flxpack_util::fs::remove_dir_all_if_exists(project.layout.build_dir())?;
    Ok(())
}
