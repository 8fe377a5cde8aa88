//! CLI integration tests for Keel.
//!
//! The CMake tool family is replaced by small shell scripts configured
//! through `keel.toml`, so these tests exercise the real binary end to end
//! without a C++ toolchain.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the keel binary command.
fn keel() -> Command {
    Command::cargo_bin("keel").unwrap()
}

/// A project directory whose tools are stub scripts.
struct Project {
    tmp: TempDir,
}

impl Project {
    fn new() -> Self {
        Project {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.tmp.path()
    }

    /// Write an executable shell script at `name` (relative to the project).
    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Stub `cmake`, `ctest` and `cpack` and point keel.toml at them.
    #[cfg(unix)]
    fn with_tools(self, cmake: &str, ctest: &str, cpack: &str) -> Self {
        let cmake = self.script("stubs/cmake", cmake);
        let ctest = self.script("stubs/ctest", ctest);
        let cpack = self.script("stubs/cpack", cpack);
        self.write_config(&format!(
            "[build]\ndirectory = \"out\"\njobs = 2\n\n[tools]\ncmake = \"{}\"\nctest = \"{}\"\ncpack = \"{}\"\n",
            cmake.display(),
            ctest.display(),
            cpack.display()
        ));
        self
    }

    fn write_config(&self, contents: &str) {
        fs::write(self.path().join("keel.toml"), contents).unwrap();
    }

    fn keel(&self) -> Command {
        let mut cmd = keel();
        cmd.current_dir(self.path())
            .env("KEEL_TEST_LOG", self.path().join("calls.log"));
        cmd
    }

    fn log(&self) -> String {
        fs::read_to_string(self.path().join("calls.log")).unwrap_or_default()
    }
}

/// Stub body that logs its arguments and exits with `code`.
///
/// Tools may run from the build directory, so the log path comes from the
/// environment rather than the working directory.
fn logging(code: i32) -> String {
    format!("echo \"$0 $@\" >> \"$KEEL_TEST_LOG\"\nexit {}", code)
}

// ============================================================================
// Lifecycle actions
// ============================================================================

#[cfg(unix)]
#[test]
fn test_default_runs_configure_then_build() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));

    project.keel().assert().success();

    let log = project.log();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2, "{}", log);
    assert!(lines[0].contains("--preset"));
    assert!(lines[0].contains("-DBUILD_TESTING=OFF"));
    assert!(lines[1].contains("--build --preset"));
    assert!(lines[1].contains("--parallel 2"));
}

#[cfg(unix)]
#[test]
fn test_configure_forwards_defines() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "configure", "--enable-tests", "-D", "ENABLE_GPU=ON"])
        .assert()
        .success();

    let log = project.log();
    assert!(log.contains("-DBUILD_TESTING=ON"));
    assert!(log.contains("-DENABLE_GPU=ON"));
}

#[cfg(unix)]
#[test]
fn test_passing_tests_succeed() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "test", "--test-regex", "^Face"])
        .assert()
        .success()
        .stderr(predicate::str::contains("all tests passed"));

    let log = project.log();
    assert!(log.contains("--build --preset"), "test builds first: {}", log);
    assert!(log.contains("--no-tests=error -R ^Face"));
}

#[cfg(unix)]
#[test]
fn test_no_tests_matched_exits_8() {
    let project = Project::new().with_tools(&logging(0), &logging(8), &logging(0));

    project
        .keel()
        .args(["--action", "test", "--no-build", "--test-regex", "Missing"])
        .assert()
        .code(8)
        .stderr(predicate::str::contains("no tests matched filter `Missing`"));

    assert!(!project.log().contains("--build"));
}

#[cfg(unix)]
#[test]
fn test_failing_tests_propagate_code() {
    let project = Project::new().with_tools(&logging(0), &logging(3), &logging(0));

    project
        .keel()
        .args(["--action", "test", "--no-build"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("tests failed with exit code 3"));
}

#[cfg(unix)]
#[test]
fn test_invalid_regex_never_launches_runner() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "test", "--no-build", "--test-regex", "("])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid test regex"));

    assert!(project.log().is_empty());
}

#[cfg(unix)]
#[test]
fn test_build_failure_reports_hint() {
    let project = Project::new().with_tools(&logging(2), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "build", "--target", "engine"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed with exit code 2"))
        .stderr(predicate::str::contains("run `keel --action configure` first"));

    assert!(project.log().contains("--target engine"));
}

#[cfg(unix)]
#[test]
fn test_install_propagates_exit_code() {
    let project = Project::new().with_tools(&logging(42), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "install"])
        .assert()
        .code(42);

    assert!(project.log().contains("--install"));
}

#[cfg(unix)]
#[test]
fn test_package_without_packaging_config_fails() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "package"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("packaging configuration not found"));

    let log = project.log();
    assert!(log.contains("--preset"), "package configures first: {}", log);
    assert!(log.contains("--build"), "package builds first: {}", log);
    assert!(!log.contains("cpack"));
}

#[cfg(unix)]
#[test]
fn test_package_after_configure_writes_packaging_config() {
    let cmake = "echo \"$0 $@\" >> \"$KEEL_TEST_LOG\"\n\
                 if [ \"$1\" = \"--preset\" ]; then mkdir -p out && touch out/CPackConfig.cmake; fi";
    let project = Project::new().with_tools(cmake, &logging(0), &logging(0));

    project.keel().args(["--action", "package"]).assert().success();

    let log = project.log();
    assert!(log.contains("cpack --config"), "{}", log);
    assert!(log.contains("CPackConfig.cmake -V"));
}

#[cfg(unix)]
#[test]
fn test_clean_removes_build_directory() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));
    fs::create_dir_all(project.path().join("out/stale")).unwrap();

    project
        .keel()
        .args(["--clean", "--action", "configure"])
        .assert()
        .success();

    assert!(!project.path().join("out/stale").exists());
}

#[cfg(unix)]
#[test]
fn test_missing_tool_is_a_launch_error() {
    let project = Project::new();
    project.write_config("[tools]\ncmake = \"/nonexistent/cmake\"\n");

    project
        .keel()
        .args(["--action", "configure"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not launch"));
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[cfg(unix)]
fn scenarios(project: &Project, names: &[&str]) {
    let dir = project.path().join("tests/e2e/configs");
    fs::create_dir_all(&dir).unwrap();
    for name in names {
        fs::write(dir.join(name), "pipeline: []\n").unwrap();
    }
}

#[cfg(unix)]
#[test]
fn test_e2e_without_scenarios_fails() {
    let project = Project::new();
    let app = project.script("app", "exit 0");

    project
        .keel()
        .args(["e2e", "--executable"])
        .arg(&app)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no scenarios found"));
}

#[cfg(unix)]
#[test]
fn test_e2e_runs_each_scenario() {
    let project = Project::new();
    scenarios(&project, &["swap.yaml", "enhance.yaml"]);
    let app = project.script("app", "echo \"$2\" >> \"$KEEL_TEST_LOG\"");

    project
        .keel()
        .args(["e2e", "--executable"])
        .arg(&app)
        .assert()
        .success()
        .stderr(predicate::str::contains("Total: 2, Passed: 2, Failed: 0"));

    assert_eq!(project.log().lines().count(), 2);
}

#[cfg(unix)]
#[test]
fn test_test_label_e2e_diverts_to_driver() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));
    scenarios(&project, &["swap.yaml"]);
    project.script("out/bin/app", "case \"$2\" in *swap*) exit 5;; esac");

    project
        .keel()
        .args(["--action", "test", "--no-build", "--test-label", "e2e"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("end-to-end driver exited with code 1"));

    assert!(!project.log().contains("ctest"));
}

#[cfg(unix)]
#[test]
fn test_e2e_executable_missing_is_precondition() {
    let project = Project::new().with_tools(&logging(0), &logging(0), &logging(0));

    project
        .keel()
        .args(["--action", "test", "--no-build", "--test-label", "e2e"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("end-to-end executable not found"));
}

// ============================================================================
// Code quality
// ============================================================================

#[test]
fn test_tidy_without_tool_fails() {
    let project = Project::new();
    project.write_config("[tools]\nclang_tidy = \"/nonexistent/clang-tidy\"\n");

    project
        .keel()
        .arg("tidy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("clang-tidy not found"));
}

#[cfg(unix)]
#[test]
fn test_tidy_findings_do_not_fail() {
    let project = Project::new();
    fs::create_dir_all(project.path().join("build/dev")).unwrap();
    fs::write(
        project.path().join("build/dev/compile_commands.json"),
        r#"[{"directory": ".", "command": "g++ -c src/a.cpp", "file": "src/a.cpp"}]"#,
    )
    .unwrap();
    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::write(project.path().join("src/a.cpp"), "int main() {}\n").unwrap();
    fs::write(project.path().join("src/b.cpp"), "int f() { return 0; }\n").unwrap();
    let tidy = project.script(
        "stubs/clang-tidy",
        "case \"$3\" in *a.cpp) echo 'warning: magic number'; exit 1;; esac",
    );
    project.write_config(&format!("[tools]\nclang_tidy = \"{}\"\n", tidy.display()));

    project
        .keel()
        .arg("tidy")
        .assert()
        .success()
        .stderr(predicate::str::contains("magic number"))
        .stderr(predicate::str::contains("issues in 1 of 2 files"));
}

#[cfg(unix)]
#[test]
fn test_tidy_honors_configured_extensions() {
    let project = Project::new();
    fs::create_dir_all(project.path().join("build/dev")).unwrap();
    fs::write(
        project.path().join("build/dev/compile_commands.json"),
        r#"[{"directory": ".", "command": "clang++ -c src/a.cpp", "file": "src/a.cpp"}]"#,
    )
    .unwrap();
    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::write(project.path().join("src/a.cpp"), "import engine;\n").unwrap();
    fs::write(project.path().join("src/engine.ixx"), "export module engine;\n").unwrap();
    let tidy = project.script("stubs/clang-tidy", &logging(0));
    project.write_config(&format!(
        "[tools]\nclang_tidy = \"{}\"\n\n[analysis]\nextensions = [\"cpp\"]\n",
        tidy.display()
    ));

    project.keel().arg("tidy").assert().success();

    let log = project.log();
    assert!(log.contains("a.cpp"), "{}", log);
    assert!(!log.contains("engine.ixx"), "{}", log);
}

#[cfg(unix)]
#[test]
fn test_format_check_reports_files() {
    let project = Project::new();
    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::write(project.path().join("src/a.cpp"), "int main(){}\n").unwrap();
    let format = project.script("stubs/clang-format", "exit 1");
    project.write_config(&format!("[tools]\nclang_format = \"{}\"\n", format.display()));

    project
        .keel()
        .args(["format", "--check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("1 files need formatting"));
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_env_prints_environment() {
    let project = Project::new();

    project
        .keel()
        .arg("env")
        .env("KEEL_TEST_MARKER", "present")
        .assert()
        .success()
        .stdout(predicate::str::contains("KEEL_TEST_MARKER=present"));
}

#[test]
fn test_env_json() {
    let project = Project::new();

    let output = project
        .keel()
        .args(["env", "--json"])
        .env("KEEL_TEST_MARKER", "present")
        .output()
        .unwrap();
    assert!(output.status.success());

    let vars: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(vars["KEEL_TEST_MARKER"], "present");
}

#[test]
fn test_completions_bash() {
    keel()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keel"));
}

#[test]
fn test_invalid_action_is_usage_error() {
    keel()
        .args(["--action", "deploy"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid action"));
}

#[test]
fn test_help_lists_subcommands() {
    keel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pre-commit"))
        .stdout(predicate::str::contains("tidy"));
}
