//! `d8` and `aapt2` invocation and diagnostics normalization.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;

/// Severity level of a tool diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

/// A single structured diagnostic from a tool.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Human-readable message.
    pub message: String,
    /// Source file path, if available.
    pub file: Option<String>,
    /// Line number in the source file, if available.
    pub line: Option<u32>,
}

/// Result of one tool invocation.
#[derive(Debug)]
pub struct ToolResult {
    /// Tool name used in messages ("d8", "aapt2 link", ...).
    pub tool: String,
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Parsed diagnostics from tool output.
    pub diagnostics: Vec<Diagnostic>,
    /// Raw stdout from the tool.
    pub raw_stdout: String,
    /// Raw stderr from the tool.
    pub raw_stderr: String,
}

impl ToolResult {
    /// Count the number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Error)
            .count()
    }

    /// Count the number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .count()
    }

    /// Format a human-readable summary of the invocation.
    pub fn summary(&self) -> String {
        if self.success {
            let warnings = self.warning_count();
            if warnings > 0 {
                format!("{} succeeded with {warnings} warning(s)", self.tool)
            } else {
                format!("{} succeeded", self.tool)
            }
        } else {
            format!("{} failed with {} error(s)", self.tool, self.error_count())
        }
    }

    /// Convert a failed result into an error.
    ///
    /// A failure without any parsed diagnostic still counts as one error.
    ///
    /// # Errors
    /// Returns [`ToolError::Failed`] if the tool did not succeed.
    pub fn into_checked(self) -> Result<Self, ToolError> {
        if self.success {
            return Ok(self);
        }
        let error_count = self.error_count().max(1);
        Err(ToolError::Failed {
            tool: self.tool,
            error_count,
        })
    }
}

/// Builder for a `d8` invocation.
#[derive(Debug, Default)]
pub struct D8Command {
    inputs: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    min_api: Option<u32>,
    libraries: Vec<PathBuf>,
    release: bool,
    arg_file: Option<PathBuf>,
}

impl D8Command {
    /// Create a new empty command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `.class`/`.jar` inputs.
    pub fn inputs(mut self, paths: &[PathBuf]) -> Self {
        self.inputs = paths.to_vec();
        self
    }

    /// Set the directory `classes.dex` is written to.
    pub fn output_dir(mut self, path: &Path) -> Self {
        self.output_dir = Some(path.to_path_buf());
        self
    }

    /// Set the minimum API level.
    pub fn min_api(mut self, level: u32) -> Self {
        self.min_api = Some(level);
        self
    }

    /// Add library classpath entries (`android.jar`).
    pub fn libraries(mut self, paths: &[PathBuf]) -> Self {
        self.libraries = paths.to_vec();
        self
    }

    /// Compile in release mode (`--release`), otherwise `--debug`.
    pub fn release(mut self, enabled: bool) -> Self {
        self.release = enabled;
        self
    }

    /// List inputs in an argument file passed as `@file`.
    pub fn arg_file(mut self, path: &Path) -> Self {
        self.arg_file = Some(path.to_path_buf());
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if inputs or the output directory are not set.
    pub fn build_args(&self) -> Result<Vec<String>, ToolError> {
        if self.inputs.is_empty() {
            return Err(ToolError::NoInputs {
                tool: "d8".to_owned(),
            });
        }
        let Some(output) = &self.output_dir else {
            return Err(ToolError::NoOutput {
                tool: "d8".to_owned(),
            });
        };

        let mut args = vec![
            if self.release { "--release" } else { "--debug" }.to_owned(),
            "--output".to_owned(),
            output.display().to_string(),
        ];

        if let Some(level) = self.min_api {
            args.push("--min-api".to_owned());
            args.push(level.to_string());
        }

        for lib in &self.libraries {
            args.push("--lib".to_owned());
            args.push(lib.display().to_string());
        }

        match &self.arg_file {
            Some(file) => args.push(format!("@{}", file.display())),
            None => args.extend(self.inputs.iter().map(|p| p.display().to_string())),
        }

        Ok(args)
    }

    /// Contents of the argument file: one input per line.
    pub fn arg_file_contents(&self) -> String {
        let mut out = String::new();
        for input in &self.inputs {
            out.push_str(&input.display().to_string());
            out.push('\n');
        }
        out
    }

    /// Run `d8` at `program`.
    ///
    /// # Errors
    /// Returns an error if arguments are incomplete, the argument file cannot
    /// be written, or `d8` cannot be spawned.
    pub fn execute(&self, program: &Path) -> Result<ToolResult, ToolError> {
        let args = self.build_args()?;
        let Some(output_dir) = &self.output_dir else {
            return Err(ToolError::NoOutput {
                tool: "d8".to_owned(),
            });
        };
        if let Some(file) = &self.arg_file {
            flxpack_util::fs::write_file(file, self.arg_file_contents())?;
        }
        flxpack_util::fs::ensure_dir(output_dir)?;

        let mut cmd = Command::new(program);
        cmd.args(&args);
        run("d8", &mut cmd)
    }
}

/// Builder for `aapt2 compile --dir`.
#[derive(Debug, Default)]
pub struct Aapt2CompileCommand {
    res_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl Aapt2CompileCommand {
    /// Create a new empty command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resource source directory.
    pub fn res_dir(mut self, path: &Path) -> Self {
        self.res_dir = Some(path.to_path_buf());
        self
    }

    /// Set the output zip of compiled (flat) resources.
    pub fn output(mut self, path: &Path) -> Self {
        self.output = Some(path.to_path_buf());
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if the resource directory or output are not set.
    pub fn build_args(&self) -> Result<Vec<String>, ToolError> {
        let Some(res_dir) = &self.res_dir else {
            return Err(ToolError::NoInputs {
                tool: "aapt2 compile".to_owned(),
            });
        };
        let Some(output) = &self.output else {
            return Err(ToolError::NoOutput {
                tool: "aapt2 compile".to_owned(),
            });
        };
        Ok(vec![
            "compile".to_owned(),
            "--dir".to_owned(),
            res_dir.display().to_string(),
            "-o".to_owned(),
            output.display().to_string(),
        ])
    }

    /// Run `aapt2 compile` at `program`.
    ///
    /// # Errors
    /// Returns an error if arguments are incomplete or `aapt2` cannot be spawned.
    pub fn execute(&self, program: &Path) -> Result<ToolResult, ToolError> {
        let args = self.build_args()?;
        let Some(output) = &self.output else {
            return Err(ToolError::NoOutput {
                tool: "aapt2 compile".to_owned(),
            });
        };
        if let Some(parent) = output.parent() {
            flxpack_util::fs::ensure_dir(parent)?;
        }
        let mut cmd = Command::new(program);
        cmd.args(&args);
        run("aapt2 compile", &mut cmd)
    }
}

/// Builder for `aapt2 link`.
#[derive(Debug, Default)]
pub struct Aapt2LinkCommand {
    android_jar: Option<PathBuf>,
    manifest: Option<PathBuf>,
    compiled: Vec<PathBuf>,
    min_sdk: Option<u32>,
    target_sdk: Option<u32>,
    output: Option<PathBuf>,
}

impl Aapt2LinkCommand {
    /// Create a new empty command builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the platform `android.jar` to link against (`-I`).
    pub fn android_jar(mut self, path: &Path) -> Self {
        self.android_jar = Some(path.to_path_buf());
        self
    }

    /// Set the processed application manifest.
    pub fn manifest(mut self, path: &Path) -> Self {
        self.manifest = Some(path.to_path_buf());
        self
    }

    /// Add compiled resource archives (`-R`).
    pub fn compiled(mut self, paths: &[PathBuf]) -> Self {
        self.compiled = paths.to_vec();
        self
    }

    /// Set `--min-sdk-version`.
    pub fn min_sdk(mut self, level: u32) -> Self {
        self.min_sdk = Some(level);
        self
    }

    /// Set `--target-sdk-version`.
    pub fn target_sdk(mut self, level: u32) -> Self {
        self.target_sdk = Some(level);
        self
    }

    /// Set the output `.apk` path.
    pub fn output(mut self, path: &Path) -> Self {
        self.output = Some(path.to_path_buf());
        self
    }

    /// Build the argument list without executing.
    ///
    /// # Errors
    /// Returns an error if the manifest, platform jar, or output are not set.
    pub fn build_args(&self) -> Result<Vec<String>, ToolError> {
        let (Some(android_jar), Some(manifest)) = (&self.android_jar, &self.manifest) else {
            return Err(ToolError::NoInputs {
                tool: "aapt2 link".to_owned(),
            });
        };
        let Some(output) = &self.output else {
            return Err(ToolError::NoOutput {
                tool: "aapt2 link".to_owned(),
            });
        };

        let mut args = vec![
            "link".to_owned(),
            "-I".to_owned(),
            android_jar.display().to_string(),
            "--manifest".to_owned(),
            manifest.display().to_string(),
            "--auto-add-overlay".to_owned(),
        ];

        if let Some(level) = self.min_sdk {
            args.push("--min-sdk-version".to_owned());
            args.push(level.to_string());
        }
        if let Some(level) = self.target_sdk {
            args.push("--target-sdk-version".to_owned());
            args.push(level.to_string());
        }

        for compiled in &self.compiled {
            args.push("-R".to_owned());
            args.push(compiled.display().to_string());
        }

        args.push("-o".to_owned());
        args.push(output.display().to_string());
        Ok(args)
    }

    /// Run `aapt2 link` at `program`.
    ///
    /// # Errors
    /// Returns an error if arguments are incomplete or `aapt2` cannot be spawned.
    pub fn execute(&self, program: &Path) -> Result<ToolResult, ToolError> {
        let args = self.build_args()?;
        let mut cmd = Command::new(program);
        cmd.args(&args);
        run("aapt2 link", &mut cmd)
    }
}

fn run(tool: &str, cmd: &mut Command) -> Result<ToolResult, ToolError> {
    let out = flxpack_util::process::run_command(cmd)?;

    let mut diagnostics = parse_diagnostics(&out.stderr);
    detect_toolchain_errors(&out.stderr, &mut diagnostics);

    tracing::debug!(
        tool,
        success = out.success,
        exit_code = ?out.exit_code,
        diagnostics = diagnostics.len(),
        "tool finished"
    );

    Ok(ToolResult {
        tool: tool.to_owned(),
        success: out.success,
        diagnostics,
        raw_stdout: out.stdout,
        raw_stderr: out.stderr,
    })
}

/// Parse tool stderr into structured diagnostics.
///
/// Handles the formats `aapt2` and `d8` print:
/// - `res/values/strings.xml:10: error: message`
/// - `res/layout/main.xml:10:5: error: message`
/// - `error: message` / `Error: message` / `ERROR: message`
/// - `Error in Foo.class: message`
/// - `warning: message` / `Warning: message`
pub fn parse_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for line in stderr.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(diag) = try_parse_located_diagnostic(trimmed) {
            diagnostics.push(diag);
        } else if let Some(diag) = try_parse_in_file_diagnostic(trimmed) {
            diagnostics.push(diag);
        } else if let Some(diag) = try_parse_bare_diagnostic(trimmed) {
            diagnostics.push(diag);
        }
    }

    diagnostics
}

/// `file:10:5: error: message` or `file:10: error: message`
fn try_parse_located_diagnostic(line: &str) -> Option<Diagnostic> {
    let (location, rest) = split_file_location(line)?;
    let (level, message) = parse_level_message(rest)?;

    Some(Diagnostic {
        level,
        message,
        file: Some(location.file),
        line: Some(location.line),
    })
}

struct FileLocation {
    file: String,
    line: u32,
}

fn split_file_location(line: &str) -> Option<(FileLocation, &str)> {
    let lower = line.to_ascii_lowercase();
    for level_prefix in [": error:", ": warning:", ": info:"] {
        if let Some(pos) = lower.find(level_prefix) {
            let before = line.get(..pos)?;
            let after = line.get(pos + 2..)?;

            if let Some(loc) = parse_file_and_line(before) {
                return Some((loc, after));
            }
        }
    }
    None
}

fn parse_file_and_line(s: &str) -> Option<FileLocation> {
    let mut parts: Vec<&str> = s.rsplitn(3, ':').collect();
    parts.reverse();

    match parts.as_slice() {
        [file, line, col] => {
            // `file:line:col`, unless the "file" part was itself split (`C:\x.xml:10`)
            match (line.parse::<u32>(), col.parse::<u32>()) {
                (Ok(line), Ok(_)) => Some(FileLocation {
                    file: (*file).to_owned(),
                    line,
                }),
                (_, Ok(line)) => Some(FileLocation {
                    file: format!("{file}:{}", parts.get(1)?),
                    line,
                }),
                _ => None,
            }
        }
        [file, line] => Some(FileLocation {
            file: (*file).to_owned(),
            line: line.parse().ok()?,
        }),
        _ => None,
    }
}

/// `Error in Foo.class: message` (d8)
fn try_parse_in_file_diagnostic(line: &str) -> Option<Diagnostic> {
    let (level, rest) = if let Some(rest) = line.strip_prefix("Error in ") {
        (DiagnosticLevel::Error, rest)
    } else if let Some(rest) = line.strip_prefix("Warning in ") {
        (DiagnosticLevel::Warning, rest)
    } else {
        return None;
    };
    let (file, message) = rest.split_once(':').unwrap_or((rest, ""));
    Some(Diagnostic {
        level,
        message: message.trim().to_owned(),
        file: Some(file.trim().to_owned()),
        line: None,
    })
}

/// `error: message`, case-insensitive on the level.
fn try_parse_bare_diagnostic(line: &str) -> Option<Diagnostic> {
    let (level, message) = parse_level_message(line)?;
    Some(Diagnostic {
        level,
        message,
        file: None,
        line: None,
    })
}

fn parse_level_message(s: &str) -> Option<(DiagnosticLevel, String)> {
    let prefixes = [
        ("error:", DiagnosticLevel::Error),
        ("warning:", DiagnosticLevel::Warning),
        ("info:", DiagnosticLevel::Info),
    ];

    prefixes.into_iter().find_map(|(prefix, level)| {
        let head = s.get(..prefix.len())?;
        if head.eq_ignore_ascii_case(prefix) {
            s.get(prefix.len()..)
                .map(|msg| (level, msg.trim().to_owned()))
        } else {
            None
        }
    })
}

/// Detect environment problems and add actionable diagnostics.
fn detect_toolchain_errors(stderr: &str, diagnostics: &mut Vec<Diagnostic>) {
    if stderr.contains("JAVA_HOME is not set")
        || stderr.contains("no 'java' command could be found")
        || stderr.contains("java: command not found")
    {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: "no Java runtime found — d8 needs a JDK; install one and set JAVA_HOME"
                .to_owned(),
            file: None,
            line: None,
        });
    }

    if stderr.contains("UnsupportedClassVersionError") {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: "the Java runtime is too old for these build-tools — use JDK 17 or newer"
                .to_owned(),
            file: None,
            line: None,
        });
    }
}
