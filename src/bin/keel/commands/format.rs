//! `keel format` command

use anyhow::{bail, Result};

use keel::builder::EnvironmentMap;
use keel::ops::sources::discover_sources;
use keel::ops::{format_files, Executor, FormatMode, SystemRunner};
use keel::util::process::locate_tool;
use keel::util::{ActionError, Shell};

use super::Workspace;
use crate::cli::FormatArgs;

pub fn execute(args: FormatArgs, ws: &Workspace, shell: &Shell) -> Result<()> {
    let config = &ws.config;

    let tool = locate_tool(config.tools.clang_format.as_deref(), "clang-format").ok_or_else(|| {
        ActionError::precondition(
            "clang-format not found",
            "install clang-format or set [tools].clang_format in keel.toml",
        )
    })?;

    let files = if args.files.is_empty() {
        discover_sources(&ws.root, &config.format_sources(), &config.format_extensions())
    } else {
        args.files.iter().map(|f| ws.root.join(f)).collect()
    };
    if files.is_empty() {
        shell.warn("no files to format");
        return Ok(());
    }

    let mode = if args.check {
        FormatMode::Check
    } else {
        FormatMode::InPlace
    };

    let env = EnvironmentMap::default();
    let runner = SystemRunner;
    let exec = Executor::new(&runner, shell, &env);
    let summary = format_files(&exec, &tool, &files, mode, &ws.root);

    if !summary.success() {
        match mode {
            FormatMode::Check => bail!("{} files need formatting", summary.failed.len()),
            FormatMode::InPlace => bail!("clang-format failed on {} files", summary.failed.len()),
        }
    }
    Ok(())
}
