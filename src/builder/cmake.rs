//! Command lines for the CMake tool family.
//!
//! Each method returns a [`ProcessBuilder`] without environment or working
//! directory; the dispatcher fills those in.

use std::path::{Path, PathBuf};

use crate::util::config::Config;
use crate::util::process::ProcessBuilder;

/// Flag making the test runner exit with 8 when no test matches.
pub const NO_TESTS_IS_ERROR: &str = "--no-tests=error";

/// Package configuration file written by configure into the build directory.
pub const CPACK_CONFIG: &str = "CPackConfig.cmake";

/// Manifest feature that pulls in test-only dependencies.
pub const TEST_MANIFEST_FEATURE: &str = "-DVCPKG_MANIFEST_FEATURES=tests";
pub const BUILD_TESTING_ON: &str = "-DBUILD_TESTING=ON";
pub const BUILD_TESTING_OFF: &str = "-DBUILD_TESTING=OFF";

/// Configure-time switches.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions<'a> {
    pub tests_enabled: bool,
    /// Arguments appended verbatim (from configuration).
    pub extra_args: &'a [String],
    /// `-DKEY=VALUE` cache entries.
    pub defines: &'a [(String, String)],
}

/// Locations of `cmake`, `ctest` and `cpack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeTools {
    pub cmake: PathBuf,
    pub ctest: PathBuf,
    pub cpack: PathBuf,
}

impl Default for CMakeTools {
    fn default() -> Self {
        CMakeTools {
            cmake: PathBuf::from("cmake"),
            ctest: PathBuf::from("ctest"),
            cpack: PathBuf::from("cpack"),
        }
    }
}

impl CMakeTools {
    pub fn from_config(config: &Config) -> Self {
        CMakeTools {
            cmake: config.cmake(),
            ctest: config.ctest(),
            cpack: config.cpack(),
        }
    }

    /// Arguments derived from feature flags.
    ///
    /// Tests are always switched explicitly on or off so the configure
    /// result never depends on a cache left behind by an earlier run.
    pub fn feature_args(tests_enabled: bool) -> Vec<String> {
        if tests_enabled {
            vec![TEST_MANIFEST_FEATURE.to_string(), BUILD_TESTING_ON.to_string()]
        } else {
            vec![BUILD_TESTING_OFF.to_string()]
        }
    }

    /// `cmake --preset <preset> ...`
    pub fn configure(&self, preset: &str, opts: &ConfigureOptions<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("--preset")
            .arg(preset)
            .args(Self::feature_args(opts.tests_enabled))
            .args(opts.extra_args);

        for (key, value) in opts.defines {
            cmd = cmd.arg(format!("-D{}={}", key, value));
        }

        cmd
    }

    /// `cmake --build --preset <preset> --parallel <jobs> [--target <target>]`
    pub fn build(&self, preset: &str, jobs: usize, target: Option<&str>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.cmake)
            .args(["--build", "--preset", preset])
            .arg("--parallel")
            .arg(jobs.to_string());

        if let Some(target) = target {
            cmd = cmd.arg("--target").arg(target);
        }

        cmd
    }

    /// `ctest --preset <preset> --output-on-failure --no-tests=error [-R ..] [-L ..]`
    pub fn test(&self, preset: &str, regex: Option<&str>, label: Option<&str>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.ctest)
            .args(["--preset", preset, "--output-on-failure", NO_TESTS_IS_ERROR]);

        if let Some(regex) = regex {
            cmd = cmd.arg("-R").arg(regex);
        }
        if let Some(label) = label {
            cmd = cmd.arg("-L").arg(label);
        }

        cmd
    }

    /// `cmake --install <build_dir>`
    pub fn install(&self, build_dir: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.cmake).arg("--install").arg(build_dir)
    }

    /// `cpack --config <config_file> -V`
    pub fn package(&self, config_file: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.cpack)
            .arg("--config")
            .arg(config_file)
            .arg("-V")
    }
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}
