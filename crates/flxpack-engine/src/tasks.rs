//! The packaging task graph and its planner.
//!
//! Tasks declare what they depend on; [`plan`] orders everything a goal needs
//! into levels. Every dependency of a task lies in an earlier level, so the
//! tasks within one level can run in parallel.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// One step of the packaging pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Task {
    /// Merge compile-only dependency jars into the fat bundle.
    CompileRequiredDependencies,
    /// Unpack the fat bundle into `intermediates/compiled_dependencies/`.
    ExtractRequiredDependencies,
    /// Convert project and dependency classes into `classes.dex`.
    CompileDex,
    /// Compile and link the resource tree into `res.apk`.
    CompileResources,
    /// Assemble `build/<name>.flx`.
    Make,
    /// Write the `updater.json` catalog.
    GenerateUpdaterJson,
    /// Push the archive and catalog to a device.
    DeployWithAdb,
}

impl Task {
    pub const ALL: [Task; 7] = [
        Task::CompileRequiredDependencies,
        Task::ExtractRequiredDependencies,
        Task::CompileDex,
        Task::CompileResources,
        Task::Make,
        Task::GenerateUpdaterJson,
        Task::DeployWithAdb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Task::CompileRequiredDependencies => "compileRequiredDependencies",
            Task::ExtractRequiredDependencies => "extractRequiredDependencies",
            Task::CompileDex => "compileDex",
            Task::CompileResources => "compileResources",
            Task::Make => "make",
            Task::GenerateUpdaterJson => "generateUpdaterJson",
            Task::DeployWithAdb => "deployWithAdb",
        }
    }

    /// Direct dependencies. `compileResources` only feeds `make` when the
    /// provider requires resources.
    pub fn depends_on(self, requires_resources: bool) -> Vec<Task> {
        match self {
            Task::CompileRequiredDependencies | Task::CompileResources => Vec::new(),
            Task::ExtractRequiredDependencies => vec![Task::CompileRequiredDependencies],
            Task::CompileDex => vec![Task::ExtractRequiredDependencies],
            Task::Make if requires_resources => vec![Task::CompileDex, Task::CompileResources],
            Task::Make => vec![Task::CompileDex],
            Task::GenerateUpdaterJson => vec![Task::Make],
            Task::DeployWithAdb => vec![Task::Make, Task::GenerateUpdaterJson],
        }
    }

    /// Whether the task shells out to SDK build-tools.
    pub fn needs_toolchain(self) -> bool {
        matches!(self, Task::CompileDex | Task::CompileResources)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown task `{s}`"))
    }
}

/// An execution plan: tasks grouped into dependency levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    levels: Vec<Vec<Task>>,
}

impl Plan {
    pub fn levels(&self) -> &[Vec<Task>] {
        &self.levels
    }

    /// All tasks in execution order.
    pub fn tasks(&self) -> impl Iterator<Item = Task> + '_ {
        self.levels.iter().flatten().copied()
    }

    pub fn contains(&self, task: Task) -> bool {
        self.tasks().any(|t| t == task)
    }

    pub fn needs_toolchain(&self) -> bool {
        self.tasks().any(Task::needs_toolchain)
    }
}

/// Plan every task `goal` transitively depends on, plus `goal` itself.
///
/// # Errors
/// Returns an error if the task graph has a cycle.
pub fn plan(goal: Task, requires_resources: bool) -> Result<Plan, EngineError> {
    let levels = plan_levels(&[goal], |t| t.depends_on(requires_resources))?;
    Ok(Plan { levels })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Group the transitive closure of `goals` into levels.
///
/// A node's level is one more than the deepest of its dependencies; nodes
/// without dependencies are on level 0. Nodes within a level are sorted.
///
/// # Errors
/// Returns [`EngineError::DependencyCycle`] naming the cycle if one is reachable.
pub fn plan_levels<N, F>(goals: &[N], deps: F) -> Result<Vec<Vec<N>>, EngineError>
where
    N: Copy + Ord + fmt::Display,
    F: Fn(N) -> Vec<N>,
{
    let mut marks: BTreeMap<N, Mark> = BTreeMap::new();
    let mut depth: BTreeMap<N, usize> = BTreeMap::new();
    let mut stack: Vec<N> = Vec::new();

    for &goal in goals {
        visit(goal, &deps, &mut marks, &mut depth, &mut stack)?;
    }

    let mut levels: Vec<Vec<N>> = Vec::new();
    for (node, level) in depth {
        while levels.len() <= level {
            levels.push(Vec::new());
        }
        if let Some(bucket) = levels.get_mut(level) {
            bucket.push(node);
        }
    }
    Ok(levels)
}

fn visit<N, F>(
    node: N,
    deps: &F,
    marks: &mut BTreeMap<N, Mark>,
    depth: &mut BTreeMap<N, usize>,
    stack: &mut Vec<N>,
) -> Result<usize, EngineError>
where
    N: Copy + Ord + fmt::Display,
    F: Fn(N) -> Vec<N>,
{
    match marks.get(&node) {
        Some(Mark::Done) => return Ok(depth.get(&node).copied().unwrap_or(0)),
        Some(Mark::InProgress) => {
            let start = stack.iter().position(|n| *n == node).unwrap_or(0);
            let cycle = stack
                .get(start..)
                .unwrap_or(stack.as_slice())
                .iter()
                .chain(std::iter::once(&node))
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(EngineError::DependencyCycle { cycle });
        }
        None => {}
    }

    marks.insert(node, Mark::InProgress);
    stack.push(node);

    let mut level = 0;
    for dep in deps(node) {
        level = level.max(visit(dep, deps, marks, depth, stack)? + 1);
    }

    stack.pop();
    marks.insert(node, Mark::Done);
    depth.insert(node, level);
    Ok(level)
}
