//! Keel CLI - preset-driven CMake lifecycle and code quality driver

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Workspace;
use keel::util::errors::{exit_code_for, help_for};
use keel::util::Shell;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        if let Some(help) = help_for(&e) {
            eprintln!("help: {}", help);
        }
        std::process::exit(exit_code_for(&e));
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("keel=debug")
    } else {
        EnvFilter::new("keel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color_choice());

    // Completions need no project
    let command = match cli.command {
        Some(Commands::Completions(args)) => return commands::completions::execute(args),
        other => other,
    };

    let ws = Workspace::load(cli.project_dir.as_deref())?;

    match command {
        None => commands::run::execute(&cli.action, &ws, &shell),
        Some(Commands::Tidy(args)) => commands::tidy::execute(args, &ws, &shell),
        Some(Commands::Format(args)) => commands::format::execute(args, &ws, &shell),
        Some(Commands::PreCommit(args)) => commands::pre_commit::execute(args, &ws, &shell),
        Some(Commands::E2e(args)) => commands::e2e::execute(args, &ws, &shell),
        Some(Commands::Env(args)) => commands::env::execute(args, &ws, &shell),
        Some(Commands::Completions(args)) => commands::completions::execute(args),
    }
}
