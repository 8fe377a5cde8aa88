//! Meta-build tool integration.
//!
//! This module derives everything the dispatcher hands to CMake: the preset
//! and build directory, the toolchain environment, and the command lines.

pub mod cmake;
pub mod env;
pub mod msvc;
pub mod preset;

pub use cmake::{CMakeTools, ConfigureOptions, CPACK_CONFIG};
pub use env::{resolve_environment, EnvironmentMap, EnvironmentSource, NegotiatedEnvironment};
pub use preset::{resolve_build_directory, resolve_preset, BuildLayout};
