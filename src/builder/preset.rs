//! Preset and build-directory resolution.
//!
//! The preset name handed to the meta-build tool and the directory the tool
//! writes into are derived independently: on Linux the presets are short
//! (`linux-debug`) while the directory carries an architecture token
//! (`linux-x64-debug`). Clean, install and package need the directory
//! without asking the tool first, so it is reconstructed here.

use std::path::{Path, PathBuf};

use crate::core::platform::{BuildConfiguration, PlatformId};

/// Architecture token inserted into Linux build directory names.
pub const DEFAULT_ARCH_TOKEN: &str = "x64";

/// Tokens that already identify an architecture inside a preset name.
const ARCH_TOKENS: &[&str] = &["x64", "x86", "x86_64", "amd64", "arm64", "aarch64", "arm"];

/// Map a configuration and platform to a preset name.
///
/// An explicit override always wins and is returned unchanged.
pub fn resolve_preset(
    config: BuildConfiguration,
    platform: PlatformId,
    override_preset: Option<&str>,
) -> String {
    if let Some(preset) = override_preset {
        return preset.to_string();
    }

    let config = config.as_lower();
    match platform {
        PlatformId::Windows => format!("msvc-x64-{}", config),
        PlatformId::Linux => format!("linux-{}", config),
        PlatformId::MacOs => format!("macos-{}", config),
        PlatformId::Other => format!("default-{}", config),
    }
}

/// Whether a preset name already names an architecture.
pub fn has_arch_token(preset: &str) -> bool {
    preset
        .split('-')
        .any(|part| ARCH_TOKENS.contains(&part.to_lowercase().as_str()))
}

/// Directory name the meta-build tool uses for `preset` on `platform`.
pub fn build_directory_name(preset: &str, platform: PlatformId) -> String {
    if platform != PlatformId::Linux || has_arch_token(preset) {
        return preset.to_string();
    }

    match preset.split_once('-') {
        Some((head, rest)) => format!("{}-{}-{}", head, DEFAULT_ARCH_TOKEN, rest),
        None => format!("{}-{}", preset, DEFAULT_ARCH_TOKEN),
    }
}

/// Resolve the build directory for `preset` under `root`.
pub fn resolve_build_directory(root: &Path, preset: &str, platform: PlatformId) -> PathBuf {
    root.join(build_directory_name(preset, platform))
}

/// Where build directories live, with an optional hard override.
///
/// The override covers projects whose presets do not follow the naming
/// convention; it is used verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// Root that per-preset directories are placed under.
    pub root: PathBuf,
    /// Explicit directory, bypassing the convention.
    pub directory: Option<PathBuf>,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BuildLayout {
            root: root.into(),
            directory: None,
        }
    }

    pub fn with_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.directory = directory;
        self
    }

    /// The build directory for `preset`.
    pub fn build_dir(&self, preset: &str, platform: PlatformId) -> PathBuf {
        match &self.directory {
            Some(dir) => dir.clone(),
            None => resolve_build_directory(&self.root, preset, platform),
        }
    }
}
