//! Failure taxonomy for lifecycle actions.
//!
//! Every variant knows the process exit status it maps to, so the binary
//! can surface tool exit codes unchanged to the invoking shell.

use miette::Diagnostic;
use thiserror::Error;

/// Exit code the test runner uses for "no tests matched the filter".
pub const NO_TESTS_EXIT_CODE: i32 = 8;

/// Exit code used for failures that did not come from an external tool.
pub const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

/// Hint attached to build failures.
pub const BUILD_HINT: &str =
    "the build directory may be missing or stale; run `keel --action configure` first";

/// Error from a lifecycle action.
#[derive(Debug, Error, Diagnostic)]
pub enum ActionError {
    /// The tool binary could not be found or started.
    #[error("could not launch `{program}`: {message}")]
    #[diagnostic(
        code(keel::launch),
        help("check that the tool is installed and on PATH, or set it under [tools] in keel.toml")
    )]
    Launch { program: String, message: String },

    /// The tool ran and exited non-zero.
    #[error("`{command}` failed with exit code {code}")]
    #[diagnostic(code(keel::tool_failed))]
    ToolFailed {
        command: String,
        code: i32,
        #[help]
        hint: Option<String>,
    },

    /// The test runner found no test matching the active filter.
    #[error("no tests matched filter `{}`", .filter.as_deref().unwrap_or("<none>"))]
    #[diagnostic(
        code(keel::no_tests),
        help("verify the tests are registered and that the filter matches their names")
    )]
    NoTestsMatched { filter: Option<String> },

    /// One or more tests failed.
    #[error("tests failed with exit code {code}")]
    #[diagnostic(code(keel::tests_failed))]
    TestsFailed { code: i32 },

    /// A dependency of the action is missing.
    #[error("{message}")]
    #[diagnostic(code(keel::precondition))]
    Precondition {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl ActionError {
    /// A precondition failure with a remediation hint.
    pub fn precondition(message: impl Into<String>, help: impl Into<String>) -> Self {
        ActionError::Precondition {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Attach a remediation hint to a tool failure; other variants pass through.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        match self {
            ActionError::ToolFailed { command, code, .. } => ActionError::ToolFailed {
                command,
                code,
                hint: Some(hint.into()),
            },
            other => other,
        }
    }

    /// The process exit status this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            ActionError::ToolFailed { code, .. } | ActionError::TestsFailed { code } => {
                nonzero(*code)
            }
            ActionError::NoTestsMatched { .. } => NO_TESTS_EXIT_CODE,
            ActionError::Launch { .. } | ActionError::Precondition { .. } => {
                GENERIC_FAILURE_EXIT_CODE
            }
        }
    }

    /// Render the error with its hint, without miette's graphical handler.
    pub fn render(&self) -> String {
        let mut out = self.to_string();
        if let Some(help) = Diagnostic::help(self) {
            out.push_str(&format!("\nhelp: {}", help));
        }
        out
    }
}

/// Signal deaths surface as -1; keep those and zero from reading as
/// anything but a plain failure.
fn nonzero(code: i32) -> i32 {
    if code <= 0 {
        GENERIC_FAILURE_EXIT_CODE
    } else {
        code
    }
}

/// Find the exit code for an error chain, defaulting to 1.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ActionError>())
        .map(ActionError::exit_code)
        .unwrap_or(GENERIC_FAILURE_EXIT_CODE)
}

/// The remediation hint carried anywhere in an error chain.
pub fn help_for(err: &anyhow::Error) -> Option<String> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ActionError>())
        .and_then(|e| Diagnostic::help(e).map(|h| h.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_propagates_code() {
        let err = ActionError::ToolFailed {
            command: "cmake --install build/linux-x64-debug".to_string(),
            code: 42,
            hint: None,
        };
        assert_eq!(err.exit_code(), 42);
    }

    #[test]
    fn test_no_tests_maps_to_sentinel() {
        let err = ActionError::NoTestsMatched {
            filter: Some("^Nothing$".to_string()),
        };
        assert_eq!(err.exit_code(), NO_TESTS_EXIT_CODE);
        assert!(err.to_string().contains("^Nothing$"));
        assert!(err.render().contains("help: verify the tests are registered"));
    }

    #[test]
    fn test_launch_and_precondition_exit_one() {
        let err = ActionError::Launch {
            program: "cpack".to_string(),
            message: "not found".to_string(),
        };
        assert_eq!(err.exit_code(), 1);

        let err = ActionError::precondition("missing", "run build");
        assert_eq!(err.exit_code(), 1);
        assert!(err.render().ends_with("help: run build"));
    }

    #[test]
    fn test_build_hint_is_rendered() {
        let err = ActionError::ToolFailed {
            command: "cmake --build --preset linux-debug".to_string(),
            code: 2,
            hint: Some(BUILD_HINT.to_string()),
        };
        assert!(err.render().contains("run `keel --action configure` first"));
    }

    #[test]
    fn test_with_hint_only_touches_tool_failures() {
        let err = ActionError::ToolFailed {
            command: "cmake --build --preset linux-debug".to_string(),
            code: 2,
            hint: None,
        }
        .with_hint(BUILD_HINT);
        assert!(matches!(err, ActionError::ToolFailed { hint: Some(_), code: 2, .. }));

        let err = ActionError::Launch {
            program: "cmake".to_string(),
            message: "not found".to_string(),
        }
        .with_hint(BUILD_HINT);
        assert!(!err.render().contains("configure"));
    }

    #[test]
    fn test_exit_code_for_chain() {
        let err = anyhow::Error::new(ActionError::TestsFailed { code: 3 }).context("test action");
        assert_eq!(exit_code_for(&err), 3);

        let err = anyhow::anyhow!("plain failure");
        assert_eq!(exit_code_for(&err), 1);
        assert_eq!(help_for(&err), None);

        let err = anyhow::Error::new(ActionError::precondition("missing", "run build"));
        assert_eq!(help_for(&err).as_deref(), Some("run build"));
    }

    #[test]
    fn test_zero_code_never_reads_as_success() {
        let err = ActionError::TestsFailed { code: 0 };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_signal_death_exits_one() {
        let err = ActionError::ToolFailed {
            command: "ctest --preset linux-debug".to_string(),
            code: -1,
            hint: None,
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(ActionError::TestsFailed { code: -1 }.exit_code(), 1);
    }
}
