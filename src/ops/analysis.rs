//! Static analysis fan-out.
//!
//! [`AnalysisRunner::run_parallel`] runs the analysis tool once per file on
//! a bounded worker pool, capturing each file's output so concurrent
//! processes never share the console. Results are reported in completion
//! order. Every file is attempted; findings never abort the run and never
//! turn into an error, they only select the closing message.
//!
//! [`AnalysisRunner::run_batched`] is the older sequential mode: fixed-size
//! groups of files per invocation, streamed output, one status per batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::core::platform::host_parallelism;
use crate::ops::executor::Executor;
use crate::util::config::DEFAULT_PROGRESS_EVERY;
use crate::util::fs::display_relative;
use crate::util::process::{Capture, ProcessBuilder, ProcessOutcome};
use crate::util::shell::{format_duration, Status};

/// The analysis tool and the database it reads flags from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTool {
    pub program: PathBuf,
    /// Directory holding `compile_commands.json`.
    pub database_dir: PathBuf,
}

impl AnalysisTool {
    pub fn new(program: impl Into<PathBuf>, database_dir: impl Into<PathBuf>) -> Self {
        AnalysisTool {
            program: program.into(),
            database_dir: database_dir.into(),
        }
    }

    /// `<tool> -p <db_dir> <files...>`
    pub fn command<P: AsRef<Path>>(&self, files: &[P]) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .arg("-p")
            .arg(&self.database_dir)
            .args(files.iter().map(|f| f.as_ref().as_os_str()))
    }
}

/// One file's analysis result.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: ProcessOutcome,
}

impl FileReport {
    /// A non-zero exit or any output counts as a finding.
    pub fn has_issues(&self) -> bool {
        !self.outcome.success() || self.outcome.has_output()
    }

    fn output(&self) -> String {
        let mut text = self.outcome.stdout.trim_end().to_string();
        let stderr = self.outcome.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        if text.is_empty() {
            text = format!("exited with code {}", self.outcome.exit_code);
        }
        text
    }
}

/// Aggregate over a whole run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    /// Number of files (parallel) or batches (sequential) attempted.
    pub attempted: usize,
    /// Files or batches that reported issues.
    pub flagged: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl AnalysisSummary {
    pub fn issues_found(&self) -> bool {
        !self.flagged.is_empty()
    }
}

/// Runs the analysis tool over a file set.
pub struct AnalysisRunner<'a> {
    exec: &'a Executor<'a>,
    cwd: &'a Path,
    workers: usize,
    progress_every: usize,
}

impl<'a> AnalysisRunner<'a> {
    pub fn new(exec: &'a Executor<'a>, cwd: &'a Path) -> Self {
        AnalysisRunner {
            exec,
            cwd,
            workers: host_parallelism(),
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }

    /// Set the worker pool size; zero means the host's parallelism.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { host_parallelism() } else { workers };
        self
    }

    /// Emit a progress line every `n` completions (and on the last one).
    pub fn progress_every(mut self, n: usize) -> Self {
        self.progress_every = n.max(1);
        self
    }

    /// Analyze each file separately on the worker pool.
    pub fn run_parallel(&self, tool: &AnalysisTool, files: &[PathBuf]) -> Result<AnalysisSummary> {
        let shell = self.exec.shell();
        let total = files.len();
        let start = Instant::now();

        shell.status(
            Status::Analyzing,
            format!("{} files with {} workers", total, self.workers),
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .context("failed to start analysis worker pool")?;

        let completed = AtomicUsize::new(0);
        let flagged = Mutex::new(Vec::new());

        pool.install(|| {
            files.par_iter().for_each(|file| {
                let report = self.analyze_one(tool, file);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                if report.has_issues() {
                    shell.block(
                        Status::Warning,
                        display_relative(&report.path, self.cwd),
                        &report.output(),
                    );
                    flagged
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(report.path);
                }

                if done % self.progress_every == 0 || done == total {
                    shell.status(
                        Status::Analyzing,
                        format!("[{}/{}] {} elapsed", done, total, format_duration(start.elapsed())),
                    );
                }
            });
        });

        let summary = AnalysisSummary {
            attempted: completed.into_inner(),
            flagged: flagged.into_inner().unwrap_or_else(|e| e.into_inner()),
            elapsed: start.elapsed(),
        };
        self.report(&summary, "files");
        Ok(summary)
    }

    fn analyze_one(&self, tool: &AnalysisTool, file: &Path) -> FileReport {
        let cmd = self.exec.prepare(tool.command(&[file]), self.cwd);
        tracing::debug!("{}", cmd.display_command());
        FileReport {
            path: file.to_path_buf(),
            outcome: self.exec.runner().run(&cmd, Capture::Piped),
        }
    }

    /// Analyze files in sequential groups of `batch_size`.
    ///
    /// Output is streamed, so a batch is flagged only by its exit status.
    /// Flagged entries are the first file of each failing batch.
    pub fn run_batched(
        &self,
        tool: &AnalysisTool,
        files: &[PathBuf],
        batch_size: usize,
    ) -> Result<AnalysisSummary> {
        let shell = self.exec.shell();
        let start = Instant::now();
        let batches: Vec<&[PathBuf]> = files.chunks(batch_size.max(1)).collect();
        let mut summary = AnalysisSummary::default();

        for (index, batch) in batches.iter().enumerate() {
            shell.status(
                Status::Analyzing,
                format!("batch {}/{} ({} files)", index + 1, batches.len(), batch.len()),
            );
            let outcome = self
                .exec
                .run(tool.command(batch), self.cwd, Capture::Inherit, false)?;
            summary.attempted += 1;
            if !outcome.success() {
                shell.warn(format!(
                    "batch {} reported issues (exit code {})",
                    index + 1,
                    outcome.exit_code
                ));
                summary.flagged.extend(batch.first().cloned());
            }
        }

        summary.elapsed = start.elapsed();
        self.report(&summary, "batches");
        Ok(summary)
    }

    fn report(&self, summary: &AnalysisSummary, unit: &str) {
        let shell = self.exec.shell();
        let elapsed = format_duration(summary.elapsed);
        if summary.issues_found() {
            shell.warn(format!(
                "static analysis reported issues in {} of {} {} ({})",
                summary.flagged.len(),
                summary.attempted,
                unit,
                elapsed
            ));
        } else {
            shell.success(format!(
                "static analysis clean: {} {} in {}",
                summary.attempted, unit, elapsed
            ));
        }
    }
}
