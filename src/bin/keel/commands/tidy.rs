//! `keel tidy` command
//!
//! Runs clang-tidy over the project sources. Findings are reported but
//! never fail the command.

use anyhow::Result;

use keel::builder::resolve_environment;
use keel::ops::sources::{
    database_uses_msvc, discover_sources, filter_for_database, find_compile_database,
};
use keel::ops::{AnalysisRunner, AnalysisTool, Executor, SystemRunner};
use keel::util::process::locate_tool;
use keel::util::{ActionError, Shell};

use super::Workspace;
use crate::cli::TidyArgs;

pub fn execute(args: TidyArgs, ws: &Workspace, shell: &Shell) -> Result<()> {
    let config = &ws.config;

    let program = locate_tool(config.tools.clang_tidy.as_deref(), "clang-tidy").ok_or_else(|| {
        ActionError::precondition(
            "clang-tidy not found",
            "install clang-tidy or set [tools].clang_tidy in keel.toml",
        )
    })?;

    let build_root = ws.root.join(config.build_root());
    let preferred = ws.preferred_database_dir(args.config, args.preset.as_deref());
    let database = find_compile_database(&build_root, Some(&preferred)).ok_or_else(|| {
        ActionError::precondition(
            format!("no compile_commands.json under {}", build_root.display()),
            "run `keel --action configure` first",
        )
    })?;
    tracing::debug!("using compilation database in {}", database.display());

    let files = if args.files.is_empty() {
        discover_sources(&ws.root, &config.analysis_sources(), &config.analysis_extensions())
    } else {
        args.files.iter().map(|f| ws.root.join(f)).collect()
    };

    let msvc = database_uses_msvc(&database).unwrap_or_else(|e| {
        tracing::warn!("{:#}", e);
        false
    });
    let files = filter_for_database(files, msvc);
    if files.is_empty() {
        shell.warn("no source files to analyze");
        return Ok(());
    }

    let env = resolve_environment(ws.platform);
    let runner = SystemRunner;
    let exec = Executor::new(&runner, shell, &env);
    let tool = AnalysisTool::new(program, database);
    let analysis = AnalysisRunner::new(&exec, &ws.root)
        .workers(args.jobs.unwrap_or(0))
        .progress_every(config.progress_every());

    if args.sequential {
        analysis.run_batched(&tool, &files, config.batch_size())?;
    } else {
        analysis.run_parallel(&tool, &files)?;
    }
    Ok(())
}
