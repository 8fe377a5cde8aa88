//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use keel::core::{ActionKind, ActionRequest, BuildConfiguration, FeatureFlags, TestFilter};
use keel::util::shell::ColorChoice;

/// Keel - preset-driven build, test, install and packaging for CMake projects
///
/// Without a subcommand, runs the requested lifecycle action (or configure
/// followed by build). Action flags are ignored when a subcommand is given.
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Color output: auto, always or never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(flatten)]
    pub action: ActionArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn color_choice(&self) -> ColorChoice {
        if self.no_color {
            ColorChoice::Never
        } else {
            self.color
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run clang-tidy over the project sources
    Tidy(TidyArgs),

    /// Format sources with clang-format
    Format(FormatArgs),

    /// Format and re-stage staged files, then analyze them (git hook)
    PreCommit(PreCommitArgs),

    /// Run end-to-end scenarios against an executable
    E2e(E2eArgs),

    /// Print the toolchain environment used for builds
    Env(EnvArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Default)]
pub struct ActionArgs {
    /// Build configuration (Debug or Release)
    #[arg(long, value_name = "CONFIG", default_value = "Debug")]
    pub config: BuildConfiguration,

    /// Target to build, or `all`
    #[arg(long, default_value = "all")]
    pub target: String,

    /// Action to run: configure, build, test, install or package
    /// (default: configure then build)
    #[arg(long)]
    pub action: Option<ActionKind>,

    /// Use this preset instead of the platform default
    #[arg(long)]
    pub preset: Option<String>,

    /// Remove the build directory first
    #[arg(long)]
    pub clean: bool,

    /// Only run tests whose names match this regex
    #[arg(long, value_name = "REGEX")]
    pub test_regex: Option<String>,

    /// Only run tests with this label (`e2e` runs the end-to-end suite)
    #[arg(long, value_name = "LABEL")]
    pub test_label: Option<String>,

    /// Do not build before testing
    #[arg(long)]
    pub no_build: bool,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Configure with tests enabled even when not testing
    #[arg(long)]
    pub enable_tests: bool,

    /// Use this build directory instead of the derived one
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Extra configure cache entry (repeatable)
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,
}

impl ActionArgs {
    pub fn to_request(&self) -> ActionRequest {
        ActionRequest {
            action: self.action,
            config: self.config,
            target: self.target.clone(),
            preset: self.preset.clone(),
            build_dir: self.build_dir.clone(),
            test_filter: TestFilter {
                regex: self.test_regex.clone(),
                label: self.test_label.clone(),
            },
            no_build: self.no_build,
            jobs: self.jobs,
            clean: self.clean,
            features: FeatureFlags {
                enable_tests: self.enable_tests,
                defines: self.defines.clone(),
            },
        }
    }
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}

#[derive(Args)]
pub struct TidyArgs {
    /// Run in sequential batches instead of one process per file
    #[arg(long)]
    pub sequential: bool,

    /// Number of parallel workers (default: number of cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Build configuration whose compilation database is preferred
    #[arg(long, value_name = "CONFIG", default_value = "Debug")]
    pub config: BuildConfiguration,

    /// Preset whose compilation database is preferred
    #[arg(long)]
    pub preset: Option<String>,

    /// Files to analyze (default: all sources under [analysis].sources)
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct FormatArgs {
    /// Check formatting without modifying files
    #[arg(long)]
    pub check: bool,

    /// Files to format (default: all sources under [format].sources)
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct PreCommitArgs {
    /// Preset whose compilation database is preferred
    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Args)]
pub struct E2eArgs {
    /// Path to the executable under test
    #[arg(long)]
    pub executable: PathBuf,

    /// Only run scenarios whose file name contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Directory holding scenario descriptors (default: [test].scenario_dir)
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Print commands without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Per-scenario timeout in seconds (default: [test].timeout_secs)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Print as a JSON object
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
