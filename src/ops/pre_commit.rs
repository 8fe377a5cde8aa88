//! Pre-commit hook: format staged sources, re-stage them, then analyze.
//!
//! Formatting is mandatory, so a missing clang-format is fatal. Analysis is
//! best effort: without clang-tidy or a compilation database it is skipped
//! with a warning. Analysis findings block the commit.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use git2::{Delta, DiffOptions, Repository};

use crate::ops::analysis::{AnalysisRunner, AnalysisTool};
use crate::ops::executor::Executor;
use crate::ops::format::{format_files, FormatMode};
use crate::ops::sources::{
    database_uses_msvc, filter_for_database, find_compile_database, has_extension,
    is_module_interface,
};
use crate::util::config::Config;
use crate::util::errors::ActionError;
use crate::util::process::locate_tool;

/// Files staged for commit (added, copied, modified or renamed), as paths
/// inside the working tree. Deleted files are not included.
pub fn staged_files(repo: &Repository) -> Result<Vec<PathBuf>> {
    let workdir = repo
        .workdir()
        .context("cannot run pre-commit checks in a bare repository")?;

    // An unborn branch has no HEAD; everything in the index is new.
    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().context("failed to read HEAD tree")?),
        Err(_) => None,
    };

    let mut opts = DiffOptions::new();
    let mut diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
        .context("failed to diff HEAD against the index")?;
    diff.find_similar(None)?;

    let mut files: Vec<PathBuf> = diff
        .deltas()
        .filter(|d| {
            matches!(
                d.status(),
                Delta::Added | Delta::Copied | Delta::Modified | Delta::Renamed
            )
        })
        .filter_map(|d| d.new_file().path().map(|p| workdir.join(p)))
        .collect();
    files.sort();
    Ok(files)
}

/// Add `files` back to the index after they were rewritten.
pub fn restage(repo: &Repository, files: &[PathBuf]) -> Result<()> {
    let workdir = repo
        .workdir()
        .context("cannot re-stage files in a bare repository")?;
    let mut index = repo.index().context("failed to open git index")?;

    for file in files {
        let relative = file.strip_prefix(workdir).unwrap_or(file.as_path());
        index
            .add_path(relative)
            .with_context(|| format!("failed to stage {}", relative.display()))?;
    }

    index.write().context("failed to write git index")?;
    Ok(())
}

/// How the hook ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreCommitVerdict {
    NothingStaged,
    Passed,
    /// Analysis reported issues in these files.
    Blocked { files: Vec<PathBuf> },
}

/// The pre-commit pipeline over one repository.
pub struct PreCommit<'a> {
    exec: &'a Executor<'a>,
    config: &'a Config,
    project_root: &'a Path,
    preferred_database: Option<PathBuf>,
}

impl<'a> PreCommit<'a> {
    pub fn new(exec: &'a Executor<'a>, config: &'a Config, project_root: &'a Path) -> Self {
        PreCommit {
            exec,
            config,
            project_root,
            preferred_database: None,
        }
    }

    /// Prefer this build directory's compilation database.
    pub fn with_preferred_database(mut self, dir: Option<PathBuf>) -> Self {
        self.preferred_database = dir;
        self
    }

    pub fn run(&self, repo: &Repository) -> Result<PreCommitVerdict> {
        let shell = self.exec.shell();
        let staged = staged_files(repo)?;
        if staged.is_empty() {
            shell.note("no staged files");
            return Ok(PreCommitVerdict::NothingStaged);
        }

        let format_exts = self.config.format_extensions();
        let to_format: Vec<PathBuf> = staged
            .iter()
            .filter(|f| f.is_file() && has_extension(f, &format_exts))
            .cloned()
            .collect();

        if !to_format.is_empty() {
            self.format_and_restage(repo, &to_format)?;
        }

        let analysis_exts = self.config.analysis_extensions();
        let to_analyze: Vec<PathBuf> = staged
            .into_iter()
            .filter(|f| f.is_file() && (has_extension(f, &analysis_exts) || is_module_interface(f)))
            .collect();

        if to_analyze.is_empty() {
            return Ok(PreCommitVerdict::Passed);
        }

        self.analyze(to_analyze)
    }

    fn format_and_restage(&self, repo: &Repository, files: &[PathBuf]) -> Result<()> {
        let tool = locate_tool(self.config.tools.clang_format.as_deref(), "clang-format")
            .ok_or_else(|| {
                ActionError::precondition(
                    "clang-format not found",
                    "install clang-format or set [tools].clang_format in keel.toml",
                )
            })?;

        let summary = format_files(self.exec, &tool, files, FormatMode::InPlace, self.project_root);
        if !summary.success() {
            bail!("clang-format failed on {} staged files", summary.failed.len());
        }

        restage(repo, files)?;
        self.exec
            .shell()
            .note(format!("re-staged {} formatted files", files.len()));
        Ok(())
    }

    fn analyze(&self, files: Vec<PathBuf>) -> Result<PreCommitVerdict> {
        let shell = self.exec.shell();

        let Some(tidy) = locate_tool(self.config.tools.clang_tidy.as_deref(), "clang-tidy") else {
            shell.warn("clang-tidy not found; skipping static analysis");
            return Ok(PreCommitVerdict::Passed);
        };

        let build_root = self.project_root.join(self.config.build_root());
        let Some(database) = find_compile_database(&build_root, self.preferred_database.as_deref())
        else {
            shell.warn(format!(
                "no compile_commands.json under {}; run `keel --action configure` to enable analysis",
                build_root.display()
            ));
            return Ok(PreCommitVerdict::Passed);
        };

        let msvc = database_uses_msvc(&database).unwrap_or_else(|e| {
            tracing::warn!("{:#}", e);
            false
        });
        let files = filter_for_database(files, msvc);
        if files.is_empty() {
            return Ok(PreCommitVerdict::Passed);
        }

        let summary = AnalysisRunner::new(self.exec, self.project_root)
            .progress_every(self.config.progress_every())
            .run_parallel(&AnalysisTool::new(tidy, database), &files)?;

        if summary.issues_found() {
            Ok(PreCommitVerdict::Blocked {
                files: summary.flagged,
            })
        } else {
            Ok(PreCommitVerdict::Passed)
        }
    }
}
