//! Process execution for lifecycle actions.
//!
//! [`CommandRunner`] is the seam between the engine and the operating
//! system; [`Executor`] layers the policy on top: echo the command, apply
//! the negotiated environment and working directory, and decide whether a
//! non-zero exit is terminal.

use std::path::Path;

use crate::builder::env::EnvironmentMap;
use crate::util::errors::ActionError;
use crate::util::process::{Capture, ProcessBuilder, ProcessOutcome};
use crate::util::shell::{Shell, Status};

/// Runs a fully described command and reports how it ended.
///
/// Implementations must be shareable across the analysis worker pool.
pub trait CommandRunner: Sync {
    fn run(&self, cmd: &ProcessBuilder, capture: Capture) -> ProcessOutcome;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder, capture: Capture) -> ProcessOutcome {
        cmd.launch(capture)
    }
}

/// Executes commands under one negotiated environment.
pub struct Executor<'a> {
    runner: &'a dyn CommandRunner,
    shell: &'a Shell,
    env: &'a EnvironmentMap,
}

impl<'a> Executor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, shell: &'a Shell, env: &'a EnvironmentMap) -> Self {
        Executor { runner, shell, env }
    }

    pub fn shell(&self) -> &Shell {
        self.shell
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner
    }

    /// Run `cmd` in `cwd`.
    ///
    /// A launch failure is always an error. With `fail_fast`, so is a
    /// non-zero exit; otherwise the outcome is returned for the caller to
    /// interpret.
    pub fn run(
        &self,
        cmd: ProcessBuilder,
        cwd: &Path,
        capture: Capture,
        fail_fast: bool,
    ) -> Result<ProcessOutcome, ActionError> {
        let cmd = self.prepare(cmd, cwd);
        let command = cmd.display_command();

        self.shell.status(Status::Executing, &command);
        tracing::debug!("cwd: {}", cwd.display());

        let outcome = self.runner.run(&cmd, capture);

        if outcome.launch_failed {
            return Err(ActionError::Launch {
                program: cmd.get_program().display().to_string(),
                message: outcome.stderr,
            });
        }

        if fail_fast && !outcome.success() {
            self.shell
                .status(Status::Failed, format!("`{}` exited with code {}", command, outcome.exit_code));
            return Err(ActionError::ToolFailed {
                command,
                code: outcome.exit_code,
                hint: None,
            });
        }

        Ok(outcome)
    }

    /// Run `cmd` and treat any non-zero exit as failure.
    pub fn run_checked(&self, cmd: ProcessBuilder, cwd: &Path) -> Result<(), ActionError> {
        self.run(cmd, cwd, Capture::Inherit, true).map(|_| ())
    }

    /// Apply the negotiated environment and working directory.
    pub fn prepare(&self, cmd: ProcessBuilder, cwd: &Path) -> ProcessBuilder {
        let cmd = cmd.cwd(cwd);
        if self.env.is_empty() {
            cmd
        } else {
            cmd.env_exact(self.env)
        }
    }
}
