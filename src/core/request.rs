//! Action requests.
//!
//! An [`ActionRequest`] is built once from caller input and is read-only
//! afterwards. The dispatcher derives every concrete command line from it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::platform::BuildConfiguration;

/// Target name meaning "build everything".
pub const ALL_TARGETS: &str = "all";

/// Test label that diverts the test action to the end-to-end driver.
pub const E2E_LABEL: &str = "e2e";

/// The five lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Configure,
    Build,
    Test,
    Install,
    Package,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Configure => "configure",
            ActionKind::Build => "build",
            ActionKind::Test => "test",
            ActionKind::Install => "install",
            ActionKind::Package => "package",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "configure" => Ok(ActionKind::Configure),
            "build" => Ok(ActionKind::Build),
            "test" => Ok(ActionKind::Test),
            "install" => Ok(ActionKind::Install),
            "package" => Ok(ActionKind::Package),
            _ => Err(format!(
                "invalid action '{}'; expected one of configure, build, test, install, package",
                s
            )),
        }
    }
}

/// Test selection given by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    /// Regular expression over test names (`-R`).
    pub regex: Option<String>,
    /// Test label (`-L`), or [`E2E_LABEL`] to divert to the end-to-end driver.
    pub label: Option<String>,
}

impl TestFilter {
    /// Whether the end-to-end driver should run instead of the test runner.
    pub fn is_e2e(&self) -> bool {
        self.label.as_deref() == Some(E2E_LABEL)
    }
}

/// Feature switches that shape the configure step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Force the test-enabling configure arguments.
    pub enable_tests: bool,
    /// Extra `-DKEY=VALUE` cache entries.
    pub defines: Vec<(String, String)>,
}

/// A single invocation's worth of caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Explicit action; `None` runs the default configure + build sequence.
    pub action: Option<ActionKind>,
    pub config: BuildConfiguration,
    /// Target name, or [`ALL_TARGETS`].
    pub target: String,
    /// Preset override; bypasses the platform mapping.
    pub preset: Option<String>,
    /// Build directory override; bypasses the directory convention.
    pub build_dir: Option<PathBuf>,
    pub test_filter: TestFilter,
    /// Skip the implicit build before `test`.
    pub no_build: bool,
    pub jobs: Option<usize>,
    pub clean: bool,
    pub features: FeatureFlags,
}

impl Default for ActionRequest {
    fn default() -> Self {
        ActionRequest {
            action: None,
            config: BuildConfiguration::default(),
            target: ALL_TARGETS.to_string(),
            preset: None,
            build_dir: None,
            test_filter: TestFilter::default(),
            no_build: false,
            jobs: None,
            clean: false,
            features: FeatureFlags::default(),
        }
    }
}

impl ActionRequest {
    /// The explicitly requested actions, in order.
    ///
    /// Implicit pre-steps (build before test, configure + build before
    /// package) are added by the dispatcher, not here.
    pub fn actions(&self) -> Vec<ActionKind> {
        match self.action {
            Some(kind) => vec![kind],
            None => vec![ActionKind::Configure, ActionKind::Build],
        }
    }

    /// Whether the target is a specific one rather than the `all` sentinel.
    pub fn has_specific_target(&self) -> bool {
        !self.target.is_empty() && self.target != ALL_TARGETS
    }

    /// Whether configure should enable test building.
    pub fn tests_enabled(&self) -> bool {
        self.features.enable_tests || self.action == Some(ActionKind::Test)
    }

    /// The filter handed to whichever test driver runs.
    ///
    /// Precedence: explicit regex, then a specific target name, then none.
    pub fn effective_test_filter(&self) -> Option<String> {
        if let Some(regex) = &self.test_filter.regex {
            return Some(regex.clone());
        }
        if self.has_specific_target() {
            return Some(self.target.clone());
        }
        None
    }
}
