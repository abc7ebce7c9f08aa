//! Shared status and diagnostic printing for pipeline tasks.

use flxpack_tools::invoke::{DiagnosticLevel, ToolResult};

/// Print a right-aligned status line to stderr, e.g. `   Compiling tmdb`.
pub(crate) fn status(verb: &str, message: &str) {
    eprintln!("{verb:>12} {message}");
}

/// Print structured diagnostics from a tool result to stderr.
///
/// When `verbose` is true, raw tool stdout/stderr is also printed.
pub(crate) fn print_diagnostics(result: &ToolResult, verbose: bool) {
    for diag in &result.diagnostics {
        let prefix = match diag.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        };
        match (&diag.file, diag.line) {
            (Some(file), Some(line)) => eprintln!("{prefix}: {file}:{line}: {}", diag.message),
            (Some(file), None) => eprintln!("{prefix}: {file}: {}", diag.message),
            _ => eprintln!("{prefix}: {}", diag.message),
        }
    }
    if result.success && result.warning_count() > 0 {
        status("Warning", &result.summary());
    }

    if verbose || (!result.success && result.diagnostics.is_empty()) {
        if !result.raw_stdout.is_empty() {
            eprintln!("{}", result.raw_stdout);
        }
        if !result.raw_stderr.is_empty() {
            eprintln!("{}", result.raw_stderr);
        }
    }
}
