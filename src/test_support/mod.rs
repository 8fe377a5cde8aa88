//! Test utilities and mocks for Keel unit tests.
//!
//! [`MockRunner`] stands in for the external tools: it matches command
//! lines against scripted expectations, returns canned outcomes and records
//! every call. It is `Sync`, so the parallel analysis runner can share it
//! across workers.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel::test_support::MockRunner;
//! use keel::util::ProcessOutcome;
//!
//! let runner = MockRunner::new();
//! runner.expect_prefix("ctest", ProcessOutcome::exited(8));
//! // Hand `&runner` to an Executor or the analysis runner...
//! assert_eq!(runner.call_count(), 1);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::util::process::{Capture, ProcessBuilder, ProcessOutcome};
use crate::util::shell::{ColorChoice, Shell, Verbosity};
use crate::ops::executor::CommandRunner;

/// Pattern for matching command lines in [`MockRunner`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on the full command line.
    Exact(String),
    /// Match if the command line starts with prefix.
    StartsWith(String),
    /// Match if the command line contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
    /// Match any command.
    Any,
}

impl CommandPattern {
    /// Check if this pattern matches the given command line.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

/// Expectation for a command execution.
#[derive(Debug, Clone)]
pub struct CommandExpectation {
    /// Pattern to match against command lines.
    pub pattern: CommandPattern,
    /// Outcome to return when matched.
    pub outcome: ProcessOutcome,
    /// Number of times this expectation can be used (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this expectation has been used.
    pub used: usize,
    /// File written when the expectation fires, standing in for a tool's
    /// on-disk side effect.
    pub creates: Option<PathBuf>,
}

impl CommandExpectation {
    /// Create a new expectation.
    pub fn new(pattern: CommandPattern, outcome: ProcessOutcome) -> Self {
        CommandExpectation {
            pattern,
            outcome,
            times: None,
            used: 0,
            creates: None,
        }
    }

    /// Set the number of times this expectation can be used.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Create `path` (empty) whenever this expectation matches.
    pub fn creates(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates = Some(path.into());
        self
    }

    /// Check if this expectation can still be used.
    pub fn available(&self) -> bool {
        match self.times {
            Some(n) => self.used < n,
            None => true,
        }
    }
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub capture: Capture,
}

/// Scripted [`CommandRunner`].
///
/// Unmatched commands return the default outcome if one is set, otherwise
/// a launch failure naming the command, so a missing expectation shows up
/// as a test failure rather than a hang.
#[derive(Debug, Default)]
pub struct MockRunner {
    expectations: Mutex<Vec<CommandExpectation>>,
    calls: Mutex<Vec<RecordedCall>>,
    default_outcome: Mutex<Option<ProcessOutcome>>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// A runner that answers every command with `outcome`.
    pub fn always(outcome: ProcessOutcome) -> Self {
        let runner = MockRunner::new();
        runner.set_default(outcome);
        runner
    }

    /// Add an expectation for an exact command line.
    pub fn expect(&self, cmd: &str, outcome: ProcessOutcome) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Exact(cmd.to_string()),
            outcome,
        ))
    }

    /// Add an expectation for a command line starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, outcome: ProcessOutcome) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::StartsWith(prefix.to_string()),
            outcome,
        ))
    }

    /// Add an expectation for a command line containing a substring.
    pub fn expect_contains(&self, substring: &str, outcome: ProcessOutcome) -> &Self {
        self.expect_pattern(CommandExpectation::new(
            CommandPattern::Contains(substring.to_string()),
            outcome,
        ))
    }

    /// Add a custom expectation.
    pub fn expect_pattern(&self, expectation: CommandExpectation) -> &Self {
        lock(&self.expectations).push(expectation);
        self
    }

    /// Set the outcome for commands that match no expectation.
    pub fn set_default(&self, outcome: ProcessOutcome) -> &Self {
        *lock(&self.default_outcome) = Some(outcome);
        self
    }

    /// Every recorded invocation, in call order.
    pub fn recorded(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Every recorded command line, in call order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.command.clone()).collect()
    }

    /// Number of commands run.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of recorded command lines matching `pattern`.
    pub fn count_matching(&self, pattern: &CommandPattern) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| pattern.matches(&c.command))
            .count()
    }

    /// Assert that a command was called.
    pub fn assert_called(&self, pattern: &CommandPattern) {
        assert!(
            self.count_matching(pattern) > 0,
            "expected command matching {:?}, got {:?}",
            pattern,
            self.calls()
        );
    }

    /// Assert that no command matching `pattern` was called.
    pub fn assert_not_called(&self, pattern: &CommandPattern) {
        assert_eq!(
            self.count_matching(pattern),
            0,
            "unexpected command matching {:?} in {:?}",
            pattern,
            self.calls()
        );
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder, capture: Capture) -> ProcessOutcome {
        let command = cmd.display_command();
        lock(&self.calls).push(RecordedCall {
            command: command.clone(),
            cwd: cmd.get_cwd().map(Path::to_path_buf),
            capture,
        });

        let matched = {
            let mut expectations = lock(&self.expectations);
            expectations
                .iter_mut()
                .find(|exp| exp.available() && exp.pattern.matches(&command))
                .map(|exp| {
                    exp.used += 1;
                    (exp.outcome.clone(), exp.creates.clone())
                })
        };

        if let Some((outcome, creates)) = matched {
            if let Some(path) = creates {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(&path, "").unwrap();
            }
            return outcome;
        }

        lock(&self.default_outcome)
            .clone()
            .unwrap_or_else(|| ProcessOutcome::launch_failure(format!("unexpected command: {}", command)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A shell that prints errors only.
pub fn quiet_shell() -> Shell {
    Shell::new(Verbosity::Quiet, ColorChoice::Never)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pattern_matching() {
        assert!(CommandPattern::Exact("cmake --version".into()).matches("cmake --version"));
        assert!(!CommandPattern::Exact("cmake".into()).matches("cmake --version"));
        assert!(CommandPattern::StartsWith("ctest".into()).matches("ctest --preset x"));
        assert!(CommandPattern::Contains("--no-tests=error".into()).matches("ctest --no-tests=error"));
        assert!(CommandPattern::Regex(r"--parallel \d+".into()).matches("cmake --build --parallel 8"));
        assert!(CommandPattern::Any.matches("anything"));
    }

    #[test]
    fn test_expectation_times() {
        let runner = MockRunner::new();
        runner.expect_pattern(
            CommandExpectation::new(
                CommandPattern::StartsWith("cmake".into()),
                ProcessOutcome::exited(1),
            )
            .times(1),
        );
        runner.set_default(ProcessOutcome::exited(0));

        let cmd = ProcessBuilder::new("cmake");
        assert_eq!(runner.run(&cmd, Capture::Inherit).exit_code, 1);
        assert_eq!(runner.run(&cmd, Capture::Inherit).exit_code, 0);
        assert_eq!(runner.call_count(), 2);
    }

    #[test]
    fn test_unmatched_command_is_a_launch_failure() {
        let runner = MockRunner::new();
        let outcome = runner.run(&ProcessBuilder::new("cpack"), Capture::Piped);
        assert!(outcome.launch_failed);
        assert!(outcome.stderr.contains("unexpected command: cpack"));
    }
}
