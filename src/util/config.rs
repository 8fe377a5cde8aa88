//! Configuration file support for Keel.
//!
//! Keel reads two optional configuration files:
//! - Global: `~/.keel/config.toml` - User-wide defaults
//! - Project: `keel.toml` at the project root - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Project configuration file name.
pub const PROJECT_CONFIG_NAME: &str = "keel.toml";

/// Keel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build directory layout and configure defaults
    pub build: BuildConfig,

    /// External tool locations
    pub tools: ToolsConfig,

    /// Test and end-to-end settings
    pub test: TestConfig,

    /// Static analysis settings
    pub analysis: AnalysisConfig,

    /// Formatting settings
    pub format: FormatConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root under which per-preset build directories live (default `build`)
    pub root: Option<PathBuf>,

    /// Explicit build directory, bypassing the preset naming convention
    pub directory: Option<PathBuf>,

    /// Default number of parallel jobs (None = host core count)
    pub jobs: Option<usize>,

    /// Extra arguments appended to every configure invocation
    pub configure_args: Vec<String>,
}

/// External tool locations. Unset entries are looked up on PATH.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub cmake: Option<PathBuf>,
    pub ctest: Option<PathBuf>,
    pub cpack: Option<PathBuf>,
    pub clang_tidy: Option<PathBuf>,
    pub clang_format: Option<PathBuf>,
}

/// Test-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// File stem of the end-to-end executable under `<build>/bin`
    pub executable: Option<String>,

    /// Argument vector of the end-to-end driver (default: `keel e2e`)
    pub e2e_driver: Option<Vec<String>>,

    /// Directory of end-to-end scenario descriptors
    pub scenario_dir: Option<PathBuf>,

    /// Per-scenario wall-clock timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Static analysis configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directories scanned for implementation files
    pub sources: Option<Vec<PathBuf>>,

    /// File extensions (without the dot) to analyze
    pub extensions: Option<Vec<String>>,

    /// Emit a progress line every N completed files
    pub progress_every: Option<usize>,

    /// Files per invocation for the sequential batched mode
    pub batch_size: Option<usize>,
}

/// Formatting configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Directories scanned for files to format
    pub sources: Option<Vec<PathBuf>>,

    /// File extensions (without the dot) to format
    pub extensions: Option<Vec<String>>,
}

pub const DEFAULT_BUILD_ROOT: &str = "build";
pub const DEFAULT_E2E_EXECUTABLE: &str = "app";
pub const DEFAULT_SCENARIO_DIR: &str = "tests/e2e/configs";
pub const DEFAULT_E2E_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PROGRESS_EVERY: usize = 10;
pub const DEFAULT_BATCH_SIZE: usize = 50;

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Build settings
        if other.build.root.is_some() {
            self.build.root = other.build.root;
        }
        if other.build.directory.is_some() {
            self.build.directory = other.build.directory;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if !other.build.configure_args.is_empty() {
            self.build.configure_args = other.build.configure_args;
        }

        // Tools
        if other.tools.cmake.is_some() {
            self.tools.cmake = other.tools.cmake;
        }
        if other.tools.ctest.is_some() {
            self.tools.ctest = other.tools.ctest;
        }
        if other.tools.cpack.is_some() {
            self.tools.cpack = other.tools.cpack;
        }
        if other.tools.clang_tidy.is_some() {
            self.tools.clang_tidy = other.tools.clang_tidy;
        }
        if other.tools.clang_format.is_some() {
            self.tools.clang_format = other.tools.clang_format;
        }

        // Test settings
        if other.test.executable.is_some() {
            self.test.executable = other.test.executable;
        }
        if other.test.e2e_driver.is_some() {
            self.test.e2e_driver = other.test.e2e_driver;
        }
        if other.test.scenario_dir.is_some() {
            self.test.scenario_dir = other.test.scenario_dir;
        }
        if other.test.timeout_secs.is_some() {
            self.test.timeout_secs = other.test.timeout_secs;
        }

        // Analysis settings
        if other.analysis.sources.is_some() {
            self.analysis.sources = other.analysis.sources;
        }
        if other.analysis.extensions.is_some() {
            self.analysis.extensions = other.analysis.extensions;
        }
        if other.analysis.progress_every.is_some() {
            self.analysis.progress_every = other.analysis.progress_every;
        }
        if other.analysis.batch_size.is_some() {
            self.analysis.batch_size = other.analysis.batch_size;
        }

        // Format settings
        if other.format.sources.is_some() {
            self.format.sources = other.format.sources;
        }
        if other.format.extensions.is_some() {
            self.format.extensions = other.format.extensions;
        }
    }

    /// Build root relative to the project.
    pub fn build_root(&self) -> PathBuf {
        self.build
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_ROOT))
    }

    pub fn cmake(&self) -> PathBuf {
        tool_or(&self.tools.cmake, "cmake")
    }

    pub fn ctest(&self) -> PathBuf {
        tool_or(&self.tools.ctest, "ctest")
    }

    pub fn cpack(&self) -> PathBuf {
        tool_or(&self.tools.cpack, "cpack")
    }

    /// End-to-end executable stem.
    pub fn e2e_executable(&self) -> &str {
        self.test
            .executable
            .as_deref()
            .unwrap_or(DEFAULT_E2E_EXECUTABLE)
    }

    pub fn scenario_dir(&self) -> PathBuf {
        self.test
            .scenario_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCENARIO_DIR))
    }

    pub fn e2e_timeout_secs(&self) -> u64 {
        self.test.timeout_secs.unwrap_or(DEFAULT_E2E_TIMEOUT_SECS)
    }

    pub fn analysis_sources(&self) -> Vec<PathBuf> {
        self.analysis
            .sources
            .clone()
            .unwrap_or_else(|| vec![PathBuf::from("src")])
    }

    pub fn analysis_extensions(&self) -> Vec<String> {
        self.analysis
            .extensions
            .clone()
            .unwrap_or_else(|| to_strings(&["cpp", "cc", "c"]))
    }

    pub fn progress_every(&self) -> usize {
        self.analysis
            .progress_every
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PROGRESS_EVERY)
    }

    pub fn batch_size(&self) -> usize {
        self.analysis
            .batch_size
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn format_sources(&self) -> Vec<PathBuf> {
        self.format
            .sources
            .clone()
            .unwrap_or_else(|| vec![PathBuf::from("src"), PathBuf::from("tests")])
    }

    pub fn format_extensions(&self) -> Vec<String> {
        self.format
            .extensions
            .clone()
            .unwrap_or_else(|| to_strings(&["cpp", "h", "hpp", "ixx", "cppm", "c", "cc"]))
    }
}

fn tool_or(configured: &Option<PathBuf>, default: &str) -> PathBuf {
    configured
        .clone()
        .unwrap_or_else(|| PathBuf::from(default))
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Get the global keel config directory (~/.keel).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keel"))
}

/// Get the global config path (~/.keel/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (keel.toml)
/// 2. Global config (~/.keel/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global) = global_path {
        if global.exists() {
            config.merge(Config::load_or_default(global));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
