#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use flxpack_config::manifest::MANIFEST_FILE;
use flxpack_engine::{BuildOptions, Project, Task};
use flxpack_tools::{locate_adb, AndroidSdk};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "flxpack", about = "Package Flixclusive providers into .flx archives")]
#[command(version)]
struct Cli {
    /// Show raw tool output and debug logs
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Android SDK root (defaults to ANDROID_HOME, then ANDROID_SDK_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    sdk: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new provider project
    Init {
        /// Project name
        #[arg(long)]
        name: Option<String>,
    },
    /// Merge compile-only dependencies into the fat bundle
    Bundle,
    /// Convert classes and bundled dependencies to classes.dex
    Dex {
        /// Build without debug info
        #[arg(long)]
        release: bool,
    },
    /// Compile and link Android resources into res.apk
    Resources,
    /// Build the provider archive
    Make {
        /// Build without debug info
        #[arg(long)]
        release: bool,
    },
    /// Build every provider and write updater.json
    Updater {
        /// Build without debug info
        #[arg(long)]
        release: bool,
    },
    /// Build and push the archive to a device with adb
    Deploy {
        /// Device serial (defaults to the only attached device)
        #[arg(long, short = 's')]
        serial: Option<String>,
        /// Build without debug info
        #[arg(long)]
        release: bool,
    },
    /// Print the planned task order
    Tasks {
        /// Goal task to plan for
        #[arg(default_value = "make")]
        goal: Task,
    },
    /// Remove build artifacts
    Clean,
    /// Check the Android SDK and project setup
    Doctor,
}

impl Command {
    /// Pipeline goal run by this command, if it runs one.
    fn goal(&self) -> Option<Task> {
        match self {
            Self::Bundle => Some(Task::CompileRequiredDependencies),
            Self::Dex { .. } => Some(Task::CompileDex),
            Self::Resources => Some(Task::CompileResources),
            Self::Make { .. } => Some(Task::Make),
            Self::Updater { .. } => Some(Task::GenerateUpdaterJson),
            Self::Deploy { .. } => Some(Task::DeployWithAdb),
            Self::Init { .. } | Self::Tasks { .. } | Self::Clean | Self::Doctor => None,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = if let Some(goal) = cli.command.goal() {
        let (release, serial) = match cli.command {
            Command::Dex { release } | Command::Make { release } | Command::Updater { release } => {
                (release, None)
            }
            Command::Deploy { serial, release } => (release, serial),
            _ => (false, None),
        };
        let options = BuildOptions {
            verbose: cli.verbose,
            release,
            serial,
            sdk_root: cli.sdk,
        };
        cmd_run(goal, &options)
    } else {
        match cli.command {
            Command::Init { name } => cmd_init(name),
            Command::Tasks { goal } => cmd_tasks(goal),
            Command::Clean => cmd_clean(),
            Command::Doctor => cmd_doctor(cli.sdk.as_deref()),
            // Commands with a goal ran above.
            _ => Ok(()),
        }
    };

    if let Err(msg) = result {
        eprintln!("error: {msg}");
        process::exit(1);
    }
}

/// Log filter from `FLXPACK_LOG`; `--verbose` defaults it to `debug`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FLXPACK_LOG").unwrap_or_else(|_| default.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Find the project root by looking for `flxpack.toml` in the current directory.
fn project_root() -> Result<PathBuf, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    if !cwd.join(MANIFEST_FILE).exists() {
        return Err(
            "no flxpack.toml found in current directory — run `flxpack init` to create a project"
                .into(),
        );
    }
    Ok(cwd)
}

fn cmd_init(name: Option<String>) -> CliResult {
    let cwd = std::env::current_dir()?;

    let project_name = name.unwrap_or_else(|| {
        cwd.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("my-provider")
            .to_owned()
    });

    let project_dir = cwd.join(&project_name);
    flxpack_engine::init_project(&project_name, &project_dir)?;

    eprintln!(
        "     Created provider `{project_name}` at {}",
        project_dir.display()
    );
    eprintln!();
    eprintln!("  To get started:");
    eprintln!("    cd {project_name}");
    eprintln!("    flxpack make");
    Ok(())
}

/// The `requires_resources` flag of the project at `root`.
fn requires_resources(root: &Path) -> Result<bool, Box<dyn Error>> {
    let project = Project::load(root)?;
    Ok(project.manifest.provider.requires_resources)
}

fn cmd_run(goal: Task, options: &BuildOptions) -> CliResult {
    let root = project_root()?;
    tracing::debug!(root = %root.display(), goal = %goal, release = options.release, "starting run");

    let report = flxpack_engine::run(&root, goal, options)?;

    let profile = if options.release { "release" } else { "debug" };
    eprintln!(
        "    Finished `{goal}` ({profile}) in {:.2}s",
        report.duration.as_secs_f64()
    );
    Ok(())
}

fn cmd_tasks(goal: Task) -> CliResult {
    let root = project_root()?;
    let plan = flxpack_engine::plan(goal, requires_resources(&root)?)?;
    for (index, level) in plan.levels().iter().enumerate() {
        let names: Vec<&str> = level.iter().map(|t| t.name()).collect();
        println!("{}: {}", index.saturating_add(1), names.join(", "));
    }
    Ok(())
}

fn cmd_clean() -> CliResult {
    let root = project_root()?;
    flxpack_engine::clean(&root)?;
    eprintln!("    Cleaned build artifacts");
    Ok(())
}

fn cmd_doctor(sdk_root: Option<&Path>) -> CliResult {
    eprintln!("Checking environment...");
    eprintln!();

    let mut issues = 0u32;

    let located = match sdk_root {
        Some(root) => AndroidSdk::at(root),
        None => AndroidSdk::locate(),
    };
    let sdk = match located {
        Ok(sdk) => {
            eprintln!("  [ok] Android SDK: {}", sdk.root.display());
            Some(sdk)
        }
        Err(e) => {
            eprintln!("  [!!] Android SDK: {e}");
            issues = issues.saturating_add(1);
            None
        }
    };

    match locate_adb(sdk.as_ref()) {
        Ok(path) => eprintln!("  [ok] adb: {}", path.display()),
        Err(e) => eprintln!("  [--] adb: {e} — needed only for `flxpack deploy`"),
    }

    let cwd = std::env::current_dir()?;
    if !cwd.join(MANIFEST_FILE).exists() {
        eprintln!("  [--] No flxpack.toml in current directory");
    } else {
        match Project::load(&cwd).and_then(|p| p.catalog_members()) {
            Ok(members) => {
                for member in &members {
                    issues = issues.saturating_add(check_project(member, sdk.as_ref()));
                }
            }
            Err(e) => {
                eprintln!("  [!!] flxpack.toml: {e}");
                issues = issues.saturating_add(1);
            }
        }
    }

    eprintln!();
    if issues > 0 {
        eprintln!("{issues} issue(s) found — fix them before packaging");
        Err(format!("{issues} issue(s) found").into())
    } else {
        eprintln!("All checks passed");
        Ok(())
    }
}

fn report_issue(issues: &mut u32, what: &str, e: &dyn std::fmt::Display) {
    eprintln!("  [!!] {what}: {e}");
    *issues = issues.saturating_add(1);
}

/// Report the configuration of one provider. Returns the number of issues.
fn check_project(project: &Project, sdk: Option<&AndroidSdk>) -> u32 {
    let mut issues = 0u32;

    let name = match project.manifest.provider_name() {
        Ok(name) => name.to_owned(),
        Err(e) => {
            report_issue(&mut issues, "flxpack.toml", &e);
            return issues;
        }
    };
    eprintln!(
        "  [ok] Provider: {name} [{}] ({})",
        project.manifest.provider.status,
        project.root.display()
    );

    let version_code = project.manifest.provider.version_code;
    if version_code <= 0 {
        report_issue(
            &mut issues,
            "provider.version_code",
            &format!("{version_code} is not positive"),
        );
    }
    if let Err(e) = flxpack_engine::validate_archive_name(&name) {
        report_issue(&mut issues, "provider.name", &e);
    }

    if let Some(sdk) = sdk {
        let android = &project.manifest.android;
        match sdk.toolchain(android.compile_sdk, android.build_tools.as_deref()) {
            Ok(toolchain) => eprintln!(
                "  [ok] build-tools {} and android-{}",
                toolchain.build_tools_version, android.compile_sdk
            ),
            Err(e) => report_issue(&mut issues, "toolchain", &e),
        }
    }

    if project.manifest.provider.requires_resources {
        if let Err(e) = flxpack_engine::resources::processed_manifest(project) {
            report_issue(&mut issues, "Android manifest", &e);
        }
        let res = project.resolve(&project.manifest.android.resources);
        if !res.is_dir() {
            report_issue(
                &mut issues,
                "resources",
                &format!("{} does not exist", res.display()),
            );
        }
    }

    issues
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;
    use clap::Parser;

    // ── Subcommand parsing ─────────────────────────────────────────

    #[test]
    fn parse_init_defaults() {
        let cli = Cli::try_parse_from(["flxpack", "init"]).unwrap();
        match cli.command {
            Command::Init { name } => assert!(name.is_none()),
            other => panic!("expected Init, got {other:?}"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_init_with_name() {
        let cli = Cli::try_parse_from(["flxpack", "init", "--name", "tmdb"]).unwrap();
        match cli.command {
            Command::Init { name } => assert_eq!(name.as_deref(), Some("tmdb")),
            other => panic!("expected Init, got {other:?}"),
        }
    }

    #[test]
    fn parse_make_defaults() {
        let cli = Cli::try_parse_from(["flxpack", "make"]).unwrap();
        match cli.command {
            Command::Make { release } => assert!(!release),
            other => panic!("expected Make, got {other:?}"),
        }
    }

    #[test]
    fn parse_make_release() {
        let cli = Cli::try_parse_from(["flxpack", "make", "--release"]).unwrap();
        assert!(matches!(cli.command, Command::Make { release: true }));
    }

    #[test]
    fn verbose_is_global() {
        let before = Cli::try_parse_from(["flxpack", "--verbose", "dex"]).unwrap();
        assert!(before.verbose);
        let after = Cli::try_parse_from(["flxpack", "dex", "-v"]).unwrap();
        assert!(after.verbose);
        assert!(matches!(after.command, Command::Dex { release: false }));
    }

    #[test]
    fn parse_deploy_defaults() {
        let cli = Cli::try_parse_from(["flxpack", "deploy"]).unwrap();
        match cli.command {
            Command::Deploy { serial, release } => {
                assert!(serial.is_none());
                assert!(!release);
            }
            other => panic!("expected Deploy, got {other:?}"),
        }
    }

    #[test]
    fn parse_deploy_serial() {
        let cli = Cli::try_parse_from(["flxpack", "deploy", "-s", "emulator-5554"]).unwrap();
        match cli.command {
            Command::Deploy { serial, .. } => {
                assert_eq!(serial.as_deref(), Some("emulator-5554"));
            }
            other => panic!("expected Deploy, got {other:?}"),
        }
    }

    #[test]
    fn bundle_runs_only_the_dependency_bundle() {
        let cli = Cli::try_parse_from(["flxpack", "bundle"]).unwrap();
        assert_eq!(cli.command.goal(), Some(Task::CompileRequiredDependencies));
    }

    #[test]
    fn commands_map_to_goals() {
        let goal = |args: &[&str]| Cli::try_parse_from(args).unwrap().command.goal();
        assert_eq!(goal(&["flxpack", "dex"]), Some(Task::CompileDex));
        assert_eq!(goal(&["flxpack", "resources"]), Some(Task::CompileResources));
        assert_eq!(goal(&["flxpack", "make", "--release"]), Some(Task::Make));
        assert_eq!(goal(&["flxpack", "updater"]), Some(Task::GenerateUpdaterJson));
        assert_eq!(goal(&["flxpack", "deploy", "-s", "x"]), Some(Task::DeployWithAdb));
        assert_eq!(goal(&["flxpack", "clean"]), None);
        assert_eq!(goal(&["flxpack", "doctor"]), None);
    }

    #[test]
    fn parse_sdk_root() {
        let cli = Cli::try_parse_from(["flxpack", "bundle", "--sdk", "/opt/android"]).unwrap();
        assert!(matches!(cli.command, Command::Bundle));
        assert_eq!(cli.sdk.as_deref(), Some(Path::new("/opt/android")));
        let cli = Cli::try_parse_from(["flxpack", "bundle"]).unwrap();
        assert!(cli.sdk.is_none());
    }

    #[test]
    fn parse_tasks_default_goal() {
        let cli = Cli::try_parse_from(["flxpack", "tasks"]).unwrap();
        match cli.command {
            Command::Tasks { goal } => assert_eq!(goal, Task::Make),
            other => panic!("expected Tasks, got {other:?}"),
        }
    }

    #[test]
    fn parse_tasks_named_goal() {
        let cli = Cli::try_parse_from(["flxpack", "tasks", "deployWithAdb"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tasks {
                goal: Task::DeployWithAdb
            }
        ));
    }

    #[test]
    fn parse_clean_and_doctor() {
        let cli = Cli::try_parse_from(["flxpack", "clean"]).unwrap();
        assert!(matches!(cli.command, Command::Clean));
        let cli = Cli::try_parse_from(["flxpack", "doctor"]).unwrap();
        assert!(matches!(cli.command, Command::Doctor));
    }

    // ── Invalid arguments ──────────────────────────────────────────

    #[test]
    fn error_no_subcommand() {
        let err = Cli::try_parse_from(["flxpack"]).unwrap_err();
        let expected = ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand;
        assert_eq!(err.kind(), expected);
    }

    #[test]
    fn error_unknown_subcommand() {
        let err = Cli::try_parse_from(["flxpack", "publish"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn error_unknown_task() {
        let err = Cli::try_parse_from(["flxpack", "tasks", "assemble"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(err.to_string().contains("unknown task `assemble`"));
    }

    #[test]
    fn error_serial_missing_value() {
        let err = Cli::try_parse_from(["flxpack", "deploy", "--serial"]).unwrap_err();
        assert!(
            err.kind() == ErrorKind::InvalidValue
                || err.kind() == ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn error_resources_takes_no_release() {
        let err = Cli::try_parse_from(["flxpack", "resources", "--release"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn error_clean_takes_no_args() {
        let err = Cli::try_parse_from(["flxpack", "clean", "--all"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    // ── Help and version output ────────────────────────────────────

    #[test]
    fn help_flag_on_root() {
        let err = Cli::try_parse_from(["flxpack", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let output = err.to_string();
        assert!(output.contains("Package Flixclusive providers"));
        assert!(output.contains("Commands:"));
    }

    #[test]
    fn version_flag() {
        let err = Cli::try_parse_from(["flxpack", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn root_help_render_includes_all_subcommands() {
        let mut cmd = Cli::command();
        let help = cmd.render_help().to_string();
        for subcommand in [
            "init",
            "bundle",
            "dex",
            "resources",
            "make",
            "updater",
            "deploy",
            "tasks",
            "clean",
            "doctor",
        ] {
            assert!(help.contains(subcommand), "{subcommand} missing");
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
