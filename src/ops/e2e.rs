//! End-to-end scenario driver.
//!
//! Each `*.yaml` descriptor in the scenario directory is one scenario: the
//! application under test runs as `<executable> --config <descriptor>` and
//! passes when it exits zero within the timeout. Output is captured and
//! shown only for failing scenarios.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::util::process::ProcessBuilder;
use crate::util::shell::{format_duration, Shell, Status};

/// Extension of scenario descriptors.
pub const SCENARIO_EXTENSION: &str = "yaml";

/// Inputs to one driver run.
#[derive(Debug, Clone)]
pub struct E2eOptions {
    pub executable: PathBuf,
    pub scenario_dir: PathBuf,
    /// Substring that scenario file names must contain.
    pub filter: Option<String>,
    /// Print the commands instead of running them.
    pub dry_run: bool,
    pub timeout: Duration,
}

/// How a single scenario ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioResult {
    Passed { elapsed: Duration },
    Failed { code: i32, stdout: String, stderr: String },
    TimedOut,
    LaunchFailed(String),
    DryRun,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        matches!(self, ScenarioResult::Passed { .. } | ScenarioResult::DryRun)
    }
}

/// Totals over all scenarios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct E2eSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl E2eSummary {
    /// At least one scenario ran and none failed.
    pub fn success(&self) -> bool {
        self.total > 0 && self.failed == 0
    }
}

impl std::fmt::Display for E2eSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total: {}, Passed: {}, Failed: {}",
            self.total, self.passed, self.failed
        )
    }
}

/// Scenario descriptors in `dir`, sorted, keeping names that contain `filter`.
///
/// A missing directory yields no scenarios.
pub fn find_scenarios(dir: &Path, filter: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        SCENARIO_EXTENSION
    );

    let mut scenarios = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid scenario pattern {}", pattern))? {
        match entry {
            Ok(path) if path.is_file() => scenarios.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("glob error: {}", e),
        }
    }

    scenarios.sort();
    if let Some(filter) = filter {
        scenarios.retain(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().contains(filter))
                .unwrap_or(false)
        });
    }
    Ok(scenarios)
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The command that runs `scenario`.
pub fn scenario_command(executable: &Path, scenario: &Path) -> ProcessBuilder {
    ProcessBuilder::new(absolute(executable))
        .arg("--config")
        .arg(absolute(scenario))
}

/// Run one scenario.
pub fn run_scenario(options: &E2eOptions, scenario: &Path) -> ScenarioResult {
    let cmd = scenario_command(&options.executable, scenario);
    if options.dry_run {
        return ScenarioResult::DryRun;
    }

    let start = Instant::now();
    match cmd.launch_with_timeout(options.timeout) {
        None => ScenarioResult::TimedOut,
        Some(outcome) if outcome.launch_failed => ScenarioResult::LaunchFailed(outcome.stderr),
        Some(outcome) if outcome.success() => ScenarioResult::Passed {
            elapsed: start.elapsed(),
        },
        Some(outcome) => ScenarioResult::Failed {
            code: outcome.exit_code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        },
    }
}

/// Run every matching scenario in order and print per-scenario results.
pub fn run_scenarios(shell: &Shell, options: &E2eOptions) -> Result<E2eSummary> {
    let scenarios = find_scenarios(&options.scenario_dir, options.filter.as_deref())?;
    let mut summary = E2eSummary {
        total: scenarios.len(),
        ..Default::default()
    };

    if scenarios.is_empty() {
        return Ok(summary);
    }

    shell.note(format!("found {} scenarios", scenarios.len()));

    for scenario in &scenarios {
        let name = scenario
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        shell.status(Status::Running, &name);

        let result = run_scenario(options, scenario);
        match &result {
            ScenarioResult::Passed { elapsed } => {
                shell.status(Status::Passed, format!("{} ({})", name, format_duration(*elapsed)))
            }
            ScenarioResult::DryRun => shell.note(format!(
                "would run: {}",
                scenario_command(&options.executable, scenario).display_command()
            )),
            ScenarioResult::Failed { code, stdout, stderr } => shell.block(
                Status::Failed,
                format!("{} (exit code {})", name, code),
                &format!("--- stdout ---\n{}\n--- stderr ---\n{}", stdout.trim_end(), stderr.trim_end()),
            ),
            ScenarioResult::TimedOut => shell.status(
                Status::Failed,
                format!("{} (timed out after {}s)", name, options.timeout.as_secs()),
            ),
            ScenarioResult::LaunchFailed(message) => {
                shell.status(Status::Failed, format!("{} ({})", name, message))
            }
        }

        if result.passed() {
            summary.passed += 1;
        } else {
            summary.failed += 1;
        }
    }

    if summary.success() {
        shell.success(summary);
    } else {
        shell.error(summary);
    }
    Ok(summary)
}
