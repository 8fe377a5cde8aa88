//! `keel e2e` command

use std::time::Duration;

use anyhow::{bail, Result};

use keel::ops::{run_scenarios, E2eOptions};
use keel::util::Shell;

use super::Workspace;
use crate::cli::E2eArgs;

pub fn execute(args: E2eArgs, ws: &Workspace, shell: &Shell) -> Result<()> {
    let scenario_dir = ws
        .root
        .join(args.config_dir.unwrap_or_else(|| ws.config.scenario_dir()));
    let timeout = Duration::from_secs(args.timeout.unwrap_or_else(|| ws.config.e2e_timeout_secs()));

    let options = E2eOptions {
        executable: args.executable,
        scenario_dir,
        filter: args.filter,
        dry_run: args.dry_run,
        timeout,
    };

    let summary = run_scenarios(shell, &options)?;
    if summary.total == 0 {
        bail!("no scenarios found in {}", options.scenario_dir.display());
    }
    if !summary.success() {
        bail!("{} of {} scenarios failed", summary.failed, summary.total);
    }
    Ok(())
}
