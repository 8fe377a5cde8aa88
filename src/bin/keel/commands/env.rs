//! `keel env` command
//!
//! Prints the environment every build subprocess receives.

use anyhow::{Context, Result};

use keel::builder::env::negotiate;
use keel::builder::msvc;
use keel::builder::{EnvironmentMap, EnvironmentSource};
use keel::util::Shell;

use super::Workspace;
use crate::cli::EnvArgs;

pub fn execute(args: EnvArgs, ws: &Workspace, shell: &Shell) -> Result<()> {
    let negotiated = negotiate(ws.platform, EnvironmentMap::from_current(), msvc::activate);

    match &negotiated.source {
        EnvironmentSource::Inherited => shell.note("inherited from the current shell"),
        EnvironmentSource::AlreadyActivated => shell.note("MSVC environment already active"),
        EnvironmentSource::Activated => shell.note("captured from vcvarsall.bat"),
        EnvironmentSource::Fallback(reason) => {
            shell.warn(format!("activation failed ({}); using the current shell", reason))
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(negotiated.env.as_map())
            .context("failed to serialize environment")?;
        println!("{}", json);
    } else {
        for (key, value) in &negotiated.env {
            println!("{}={}", key, value);
        }
    }
    Ok(())
}
