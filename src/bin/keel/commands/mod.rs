//! Command implementations

pub mod completions;
pub mod e2e;
pub mod env;
pub mod format;
pub mod pre_commit;
pub mod run;
pub mod tidy;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use keel::builder::{resolve_preset, BuildLayout};
use keel::core::{BuildConfiguration, PlatformId};
use keel::util::config::{global_config_path, load_config, PROJECT_CONFIG_NAME};
use keel::util::fs::find_project_root;
use keel::util::Config;

/// Everything a command needs to know about where it runs.
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub platform: PlatformId,
}

impl Workspace {
    /// Locate the project root from the current directory (or `-C`) and
    /// load the merged configuration.
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to determine current directory")?;
        let start = match project_dir {
            Some(dir) => cwd.join(dir),
            None => cwd,
        };
        if !start.is_dir() {
            anyhow::bail!("project directory {} does not exist", start.display());
        }

        let root = find_project_root(&start);
        let config = load_config(
            global_config_path().as_deref(),
            &root.join(PROJECT_CONFIG_NAME),
        );
        tracing::debug!("project root: {}", root.display());

        Ok(Workspace {
            root,
            config,
            platform: PlatformId::host(),
        })
    }

    /// Build directory of the preset analysis tools should prefer.
    pub fn preferred_database_dir(
        &self,
        config: BuildConfiguration,
        preset: Option<&str>,
    ) -> PathBuf {
        let preset = resolve_preset(config, self.platform, preset);
        BuildLayout::new(self.root.join(self.config.build_root()))
            .with_directory(self.config.build.directory.as_ref().map(|d| self.root.join(d)))
            .build_dir(&preset, self.platform)
    }
}
