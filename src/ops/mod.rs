//! High-level operations.
//!
//! This module contains the lifecycle dispatcher and the collaborators the
//! Keel subcommands drive (analysis, formatting, pre-commit, end-to-end).

pub mod analysis;
pub mod dispatch;
pub mod e2e;
pub mod executor;
pub mod format;
pub mod pre_commit;
pub mod sources;
pub mod test_outcome;

pub use analysis::{AnalysisRunner, AnalysisSummary, AnalysisTool, FileReport};
pub use dispatch::Dispatcher;
pub use e2e::{run_scenarios, E2eOptions, E2eSummary};
pub use executor::{CommandRunner, Executor, SystemRunner};
pub use format::{format_files, FormatMode, FormatSummary};
pub use pre_commit::{PreCommit, PreCommitVerdict};
pub use test_outcome::TestOutcome;
