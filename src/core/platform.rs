//! Build configuration and host platform identity.
//!
//! Both values are selected once per invocation and never change during a
//! run. Everything downstream (preset names, build directories, toolchain
//! activation) is derived from them.

use std::fmt;
use std::str::FromStr;

/// Build configuration passed to the meta-build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildConfiguration {
    #[default]
    Debug,
    Release,
}

impl BuildConfiguration {
    /// Canonical spelling, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildConfiguration::Debug => "Debug",
            BuildConfiguration::Release => "Release",
        }
    }

    /// Lowercase spelling used inside preset names.
    pub fn as_lower(&self) -> &'static str {
        match self {
            BuildConfiguration::Debug => "debug",
            BuildConfiguration::Release => "release",
        }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildConfiguration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildConfiguration::Debug),
            "release" => Ok(BuildConfiguration::Release),
            _ => Err(format!(
                "invalid build configuration '{}'; expected 'Debug' or 'Release'",
                s
            )),
        }
    }
}

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformId {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl PlatformId {
    /// Detect the platform this process is running on.
    pub fn host() -> Self {
        PlatformId::from_os(std::env::consts::OS)
    }

    /// Map a Rust `target_os` string to a platform.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => PlatformId::Windows,
            "linux" => PlatformId::Linux,
            "macos" => PlatformId::MacOs,
            _ => PlatformId::Other,
        }
    }

    /// Whether compiler tools need an explicit activation step before use.
    pub fn requires_toolchain_activation(&self) -> bool {
        matches!(self, PlatformId::Windows)
    }

    /// Suffix appended to executable file names.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            PlatformId::Windows => ".exe",
            _ => "",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlatformId::Windows => "Windows",
            PlatformId::Linux => "Linux",
            PlatformId::MacOs => "macOS",
            PlatformId::Other => "Other",
        };
        f.write_str(name)
    }
}

/// Fallback worker count when the host cannot report its parallelism.
pub const FALLBACK_PARALLELISM: usize = 4;

/// Number of hardware threads available to this process.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_PARALLELISM)
}
