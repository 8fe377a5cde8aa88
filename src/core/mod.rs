//! Core data structures for Keel.
//!
//! - Build configuration and host platform identity
//! - Action requests (action kind, target, filters, feature flags)

pub mod platform;
pub mod request;

pub use platform::{BuildConfiguration, PlatformId};
pub use request::{ActionKind, ActionRequest, FeatureFlags, TestFilter, ALL_TARGETS, E2E_LABEL};
