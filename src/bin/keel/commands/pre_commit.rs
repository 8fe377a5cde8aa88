//! `keel pre-commit` command
//!
//! Meant to be installed as the repository's pre-commit hook.

use anyhow::{bail, Context, Result};
use git2::Repository;

use keel::builder::EnvironmentMap;
use keel::core::BuildConfiguration;
use keel::ops::{Executor, PreCommit, PreCommitVerdict, SystemRunner};
use keel::util::Shell;

use super::Workspace;
use crate::cli::PreCommitArgs;

pub fn execute(args: PreCommitArgs, ws: &Workspace, shell: &Shell) -> Result<()> {
    let repo = Repository::discover(&ws.root)
        .with_context(|| format!("{} is not inside a git repository", ws.root.display()))?;

    let env = EnvironmentMap::default();
    let runner = SystemRunner;
    let exec = Executor::new(&runner, shell, &env);

    let preferred = ws.preferred_database_dir(BuildConfiguration::Debug, args.preset.as_deref());
    let verdict = PreCommit::new(&exec, &ws.config, &ws.root)
        .with_preferred_database(Some(preferred))
        .run(&repo)?;

    match verdict {
        PreCommitVerdict::NothingStaged | PreCommitVerdict::Passed => Ok(()),
        PreCommitVerdict::Blocked { files } => {
            bail!(
                "commit blocked: static analysis reported issues in {} files",
                files.len()
            )
        }
    }
}
