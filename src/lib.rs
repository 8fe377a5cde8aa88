//! Keel - build lifecycle orchestration for CMake-preset projects
//!
//! This crate provides the core library functionality for Keel: preset
//! resolution, toolchain environment negotiation, the configure / build /
//! test / install / package state machine, and parallel static analysis.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for Keel unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted stand-in for external tools.
#[cfg(test)]
pub mod test_support;

pub use core::{ActionKind, ActionRequest, BuildConfiguration, PlatformId};
pub use ops::{Dispatcher, Executor};
pub use util::{ActionError, Config, Shell};
