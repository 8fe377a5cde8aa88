//! The lifecycle state machine.
//!
//! Each [`ActionKind`] has one handler. Dependencies between actions are
//! explicit pre-steps inside those handlers: `test` builds first unless told
//! not to, and `package` configures and builds when the packaging
//! configuration is missing.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::cmake::{CMakeTools, ConfigureOptions, CPACK_CONFIG};
use crate::builder::preset::{resolve_preset, BuildLayout};
use crate::core::platform::{host_parallelism, PlatformId};
use crate::core::request::{ActionKind, ActionRequest};
use crate::ops::executor::Executor;
use crate::ops::test_outcome::TestOutcome;
use crate::util::config::Config;
use crate::util::errors::{ActionError, BUILD_HINT};
use crate::util::fs::{display_relative, remove_dir_all_if_exists};
use crate::util::process::{Capture, ProcessBuilder};
use crate::util::shell::Status;

/// Drives one [`ActionRequest`] to completion.
pub struct Dispatcher<'a> {
    request: &'a ActionRequest,
    project_root: &'a Path,
    platform: PlatformId,
    exec: Executor<'a>,
    tools: CMakeTools,
    configure_args: Vec<String>,
    preset: String,
    build_dir: PathBuf,
    jobs: usize,
    e2e_executable: String,
    e2e_driver: Vec<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        request: &'a ActionRequest,
        project_root: &'a Path,
        platform: PlatformId,
        config: &Config,
        exec: Executor<'a>,
    ) -> Self {
        let preset = resolve_preset(request.config, platform, request.preset.as_deref());

        let directory = request
            .build_dir
            .clone()
            .or_else(|| config.build.directory.clone())
            .map(|dir| project_root.join(dir));
        let build_dir = BuildLayout::new(project_root.join(config.build_root()))
            .with_directory(directory)
            .build_dir(&preset, platform);

        let jobs = request
            .jobs
            .or(config.build.jobs)
            .filter(|j| *j > 0)
            .unwrap_or_else(host_parallelism);

        let e2e_driver = config
            .test
            .e2e_driver
            .clone()
            .filter(|argv| !argv.is_empty())
            .unwrap_or_else(default_e2e_driver);

        Dispatcher {
            request,
            project_root,
            platform,
            exec,
            tools: CMakeTools::from_config(config),
            configure_args: config.build.configure_args.clone(),
            preset,
            build_dir,
            jobs,
            e2e_executable: config.e2e_executable().to_string(),
            e2e_driver,
        }
    }

    /// Replace the end-to-end driver's argument prefix.
    pub fn with_e2e_driver(mut self, argv: Vec<String>) -> Self {
        self.e2e_driver = argv;
        self
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run the requested actions in order, cleaning first if asked.
    pub fn run(&self) -> Result<()> {
        tracing::debug!(
            "preset {} on {}, build directory {}",
            self.preset,
            self.platform,
            self.build_dir.display()
        );

        if self.request.clean {
            self.clean()?;
        }

        for action in self.request.actions() {
            self.exec
                .shell()
                .status(Status::Action, format!("{} ({})", action, self.preset));
            self.dispatch(action)?;
        }

        Ok(())
    }

    /// Run a single action, including its implicit pre-steps.
    pub fn dispatch(&self, action: ActionKind) -> Result<(), ActionError> {
        match action {
            ActionKind::Configure => self.configure(),
            ActionKind::Build => self.build(self.requested_target()),
            ActionKind::Test => self.test(),
            ActionKind::Install => self.install(),
            ActionKind::Package => self.package(),
        }
    }

    fn clean(&self) -> Result<()> {
        let shell = self.exec.shell();
        if remove_dir_all_if_exists(&self.build_dir)? {
            shell.status(
                Status::Removed,
                display_relative(&self.build_dir, self.project_root),
            );
        } else {
            shell.note(format!(
                "nothing to clean at {}",
                display_relative(&self.build_dir, self.project_root)
            ));
        }
        Ok(())
    }

    fn requested_target(&self) -> Option<&str> {
        if self.request.has_specific_target() {
            Some(self.request.target.as_str())
        } else {
            None
        }
    }

    fn configure(&self) -> Result<(), ActionError> {
        let cmd = self.tools.configure(
            &self.preset,
            &ConfigureOptions {
                tests_enabled: self.request.tests_enabled(),
                extra_args: &self.configure_args,
                defines: &self.request.features.defines,
            },
        );
        self.exec.run_checked(cmd, self.project_root)
    }

    fn build(&self, target: Option<&str>) -> Result<(), ActionError> {
        let cmd = self.tools.build(&self.preset, self.jobs, target);
        self.exec
            .run_checked(cmd, self.project_root)
            .map_err(|e| e.with_hint(BUILD_HINT))
    }

    fn test(&self) -> Result<(), ActionError> {
        if !self.request.no_build {
            self.build(self.requested_target())?;
        }

        if self.request.test_filter.is_e2e() {
            return self.end_to_end();
        }

        if let Some(pattern) = &self.request.test_filter.regex {
            regex::Regex::new(pattern).map_err(|e| {
                ActionError::precondition(
                    format!("invalid test regex `{}`: {}", pattern, e),
                    "pass a valid regular expression to --test-regex",
                )
            })?;
        }

        let filter = self.request.effective_test_filter();
        let cmd = self.tools.test(
            &self.preset,
            filter.as_deref(),
            self.request.test_filter.label.as_deref(),
        );
        let outcome = self
            .exec
            .run(cmd, self.project_root, Capture::Inherit, false)?;

        let verdict = TestOutcome::classify(&outcome, filter.as_deref());
        let shell = self.exec.shell();
        match &verdict {
            TestOutcome::Passed => shell.status(Status::Passed, verdict.message()),
            TestOutcome::NoTestsMatched { .. } => shell.warn(verdict.message()),
            TestOutcome::Failed { .. } => shell.status(Status::Failed, verdict.message()),
        }
        verdict.into_result()
    }

    /// Location of the executable the end-to-end driver exercises.
    pub fn e2e_executable_path(&self) -> PathBuf {
        self.build_dir.join("bin").join(format!(
            "{}{}",
            self.e2e_executable,
            self.platform.exe_suffix()
        ))
    }

    fn end_to_end(&self) -> Result<(), ActionError> {
        let executable = self.e2e_executable_path();
        if !executable.is_file() {
            return Err(ActionError::precondition(
                format!("end-to-end executable not found at {}", executable.display()),
                "build the project first with `keel --action build`",
            ));
        }

        let (program, prefix) = match self.e2e_driver.split_first() {
            Some(split) => split,
            None => {
                return Err(ActionError::precondition(
                    "no end-to-end driver configured",
                    "set [test].e2e_driver in keel.toml",
                ))
            }
        };

        let mut cmd = ProcessBuilder::new(program)
            .args(prefix)
            .arg("--executable")
            .arg(&executable);
        if let Some(filter) = self.request.effective_test_filter() {
            cmd = cmd.arg("--filter").arg(filter);
        }

        let outcome = self
            .exec
            .run(cmd, self.project_root, Capture::Inherit, false)?;
        if outcome.success() {
            self.exec
                .shell()
                .status(Status::Passed, "end-to-end scenarios passed");
            Ok(())
        } else {
            self.exec.shell().status(
                Status::Failed,
                format!("end-to-end driver exited with code {}", outcome.exit_code),
            );
            Err(ActionError::TestsFailed {
                code: outcome.exit_code,
            })
        }
    }

    fn install(&self) -> Result<(), ActionError> {
        let cmd = self.tools.install(&self.build_dir);
        self.exec.run_checked(cmd, self.project_root)
    }

    fn package(&self) -> Result<(), ActionError> {
        let config_file = self.build_dir.join(CPACK_CONFIG);

        if !config_file.is_file() {
            self.exec.shell().warn(format!(
                "{} not found; configuring and building first",
                display_relative(&config_file, self.project_root)
            ));
            self.configure()?;
            self.build(None)?;
        }

        if !config_file.is_file() {
            return Err(ActionError::precondition(
                format!("packaging configuration not found at {}", config_file.display()),
                "make sure the project includes CPack and that configure succeeded",
            ));
        }

        let cmd = self.tools.package(&config_file);
        self.exec.run_checked(cmd, &self.build_dir)
    }
}

/// `<this executable> e2e`, or `keel e2e` if the path is unknown.
fn default_e2e_driver() -> Vec<String> {
    let exe = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "keel".to_string());
    vec![exe, "e2e".to_string()]
}
