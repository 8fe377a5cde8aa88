//! Source formatting through clang-format.

use std::path::{Path, PathBuf};

use crate::ops::executor::Executor;
use crate::util::fs::display_relative;
use crate::util::process::{Capture, ProcessBuilder};
use crate::util::shell::Status;

/// Whether files are rewritten or only checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    #[default]
    InPlace,
    /// Report files that would change without touching them.
    Check,
}

/// `clang-format` invocation for one file.
pub fn format_command(tool: &Path, file: &Path, mode: FormatMode) -> ProcessBuilder {
    let cmd = ProcessBuilder::new(tool);
    let cmd = match mode {
        FormatMode::InPlace => cmd.arg("-i"),
        FormatMode::Check => cmd.args(["--dry-run", "-Werror"]),
    };
    cmd.arg("-style=file").arg(file)
}

/// Files the formatter failed on, or would change in check mode.
#[derive(Debug, Clone, Default)]
pub struct FormatSummary {
    pub total: usize,
    pub failed: Vec<PathBuf>,
}

impl FormatSummary {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Format `files` one at a time.
///
/// A failing file is reported with its captured output and does not stop
/// the remaining files.
pub fn format_files(
    exec: &Executor<'_>,
    tool: &Path,
    files: &[PathBuf],
    mode: FormatMode,
    cwd: &Path,
) -> FormatSummary {
    let shell = exec.shell();
    let verb = match mode {
        FormatMode::InPlace => "formatting",
        FormatMode::Check => "checking",
    };
    shell.status(Status::Formatting, format!("{} {} files", verb, files.len()));

    let pb = shell.progress(files.len() as u64, verb);
    let mut summary = FormatSummary {
        total: files.len(),
        failed: Vec::new(),
    };

    for file in files {
        let cmd = exec.prepare(format_command(tool, file, mode), cwd);
        let outcome = exec.runner().run(&cmd, Capture::Piped);
        pb.inc(1);

        if !outcome.success() {
            let body = [outcome.stdout.trim_end(), outcome.stderr.trim_end()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            pb.suspend(|| {
                shell.block(Status::Failed, display_relative(file, cwd), &body);
            });
            summary.failed.push(file.clone());
        } else if shell.is_verbose() {
            shell.status(Status::Formatting, display_relative(file, cwd));
        }
    }

    pb.finish_and_clear();

    if summary.success() {
        shell.success(format!("{} {} files", verb, summary.total));
    } else {
        shell.error(format!(
            "{} of {} files failed {}",
            summary.failed.len(),
            summary.total,
            verb
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::env::EnvironmentMap;
    use crate::test_support::{quiet_shell, MockRunner};
    use crate::util::process::ProcessOutcome;

    #[test]
    fn test_format_command_modes() {
        let cmd = format_command(Path::new("clang-format"), Path::new("src/a.cpp"), FormatMode::InPlace);
        assert_eq!(cmd.display_command(), "clang-format -i -style=file src/a.cpp");

        let cmd = format_command(Path::new("clang-format"), Path::new("src/a.cpp"), FormatMode::Check);
        assert_eq!(
            cmd.display_command(),
            "clang-format --dry-run -Werror -style=file src/a.cpp"
        );
    }

    #[test]
    fn test_failures_are_collected_without_stopping() {
        let runner = MockRunner::new();
        runner.expect_contains(
            "broken.cpp",
            ProcessOutcome {
                exit_code: 1,
                stderr: "error: invalid configuration".to_string(),
                ..Default::default()
            },
        );
        runner.set_default(ProcessOutcome::exited(0));
        let shell = quiet_shell();
        let env = EnvironmentMap::default();
        let exec = Executor::new(&runner, &shell, &env);

        let files = vec![
            PathBuf::from("src/a.cpp"),
            PathBuf::from("src/broken.cpp"),
            PathBuf::from("src/c.h"),
        ];
        let summary = format_files(&exec, Path::new("clang-format"), &files, FormatMode::InPlace, Path::new("."));

        assert_eq!(runner.call_count(), 3);
        assert_eq!(summary.failed, vec![PathBuf::from("src/broken.cpp")]);
        assert!(!summary.success());
    }
}
