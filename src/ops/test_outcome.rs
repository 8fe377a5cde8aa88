//! Interpretation of the test runner's exit status.

use crate::util::errors::{ActionError, NO_TESTS_EXIT_CODE};
use crate::util::process::ProcessOutcome;

/// What a test run amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    /// The runner reported that the filter selected nothing.
    NoTestsMatched { filter: Option<String> },
    Failed { code: i32 },
}

impl TestOutcome {
    /// Classify a finished test run.
    pub fn classify(outcome: &ProcessOutcome, filter: Option<&str>) -> Self {
        match outcome.exit_code {
            0 if !outcome.launch_failed => TestOutcome::Passed,
            NO_TESTS_EXIT_CODE => TestOutcome::NoTestsMatched {
                filter: filter.map(str::to_string),
            },
            code => TestOutcome::Failed { code },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    /// The line shown to the user.
    pub fn message(&self) -> String {
        match self {
            TestOutcome::Passed => "all tests passed".to_string(),
            TestOutcome::NoTestsMatched { filter: Some(filter) } => {
                format!("no tests matched filter `{}`", filter)
            }
            TestOutcome::NoTestsMatched { filter: None } => "no tests were found".to_string(),
            TestOutcome::Failed { code } => format!("tests failed with exit code {}", code),
        }
    }

    /// Convert a non-passing outcome into the error the invocation ends with.
    pub fn into_result(self) -> Result<(), ActionError> {
        match self {
            TestOutcome::Passed => Ok(()),
            TestOutcome::NoTestsMatched { filter } => Err(ActionError::NoTestsMatched { filter }),
            TestOutcome::Failed { code } => Err(ActionError::TestsFailed { code }),
        }
    }
}
