//! Lifecycle actions (`keel --action ...`)

use anyhow::Result;

use keel::builder::cmake::is_cmake_project;
use keel::builder::resolve_environment;
use keel::ops::{Dispatcher, Executor, SystemRunner};
use keel::util::Shell;

use super::Workspace;
use crate::cli::ActionArgs;

pub fn execute(args: &ActionArgs, ws: &Workspace, shell: &Shell) -> Result<()> {
    let request = args.to_request();
    if !is_cmake_project(&ws.root) {
        shell.warn(format!("no CMakeLists.txt in {}", ws.root.display()));
    }

    let env = resolve_environment(ws.platform);
    let runner = SystemRunner;
    let exec = Executor::new(&runner, shell, &env);

    let dispatcher = Dispatcher::new(&request, &ws.root, ws.platform, &ws.config, exec);
    dispatcher.run()?;

    let actions: Vec<String> = request.actions().iter().map(|a| a.to_string()).collect();
    shell.success(format!(
        "{} ({}, {})",
        actions.join(" + "),
        dispatcher.preset(),
        request.config
    ));
    Ok(())
}
