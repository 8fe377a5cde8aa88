//! Shared utilities

pub mod config;
pub mod errors;
pub mod fs;
pub mod process;
pub mod shell;

pub use config::Config;
pub use errors::ActionError;
pub use process::{Capture, ProcessBuilder, ProcessOutcome};
pub use shell::{Shell, Status};
