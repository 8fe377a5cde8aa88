//! Toolchain environment negotiation.
//!
//! The environment used for every subprocess is an explicit value produced
//! once per invocation and threaded into each command, rather than a
//! mutation of this process's own environment.
//!
//! On platforms that need an explicit activation step (Windows/MSVC) the
//! negotiator loads the toolchain's variables; everywhere else it passes the
//! current environment through. Activation failures are never fatal: they
//! are logged as warnings and the current environment is used instead.

use std::collections::BTreeMap;

use crate::builder::msvc::{self, ActivationError};
use crate::core::platform::PlatformId;

/// A complete process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMap {
    vars: BTreeMap<String, String>,
}

impl EnvironmentMap {
    /// Snapshot of this process's environment.
    pub fn from_current() -> Self {
        std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect()
    }

    /// Look up a variable. Names are matched case-insensitively when no
    /// exact match exists, mirroring Windows semantics.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .or_else(|| {
                self.vars
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

impl FromIterator<(String, String)> for EnvironmentMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        EnvironmentMap {
            vars: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EnvironmentMap {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

/// Where the negotiated environment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentSource {
    /// The current process environment, unchanged.
    Inherited,
    /// The current shell was already activated.
    AlreadyActivated,
    /// Freshly captured from the toolchain's activation script.
    Activated,
    /// Activation failed; the current environment was used instead.
    Fallback(String),
}

/// Result of negotiation.
#[derive(Debug, Clone)]
pub struct NegotiatedEnvironment {
    pub env: EnvironmentMap,
    pub source: EnvironmentSource,
}

/// Produce the environment for `platform`.
pub fn resolve_environment(platform: PlatformId) -> EnvironmentMap {
    negotiate(platform, EnvironmentMap::from_current(), msvc::activate).env
}

/// Negotiate with an explicit base environment and activation routine.
pub fn negotiate<F>(platform: PlatformId, current: EnvironmentMap, activate: F) -> NegotiatedEnvironment
where
    F: FnOnce() -> Result<Vec<(String, String)>, ActivationError>,
{
    if !platform.requires_toolchain_activation() {
        return NegotiatedEnvironment {
            env: current,
            source: EnvironmentSource::Inherited,
        };
    }

    if msvc::already_activated(|key| current.get(key).map(str::to_string)) {
        tracing::debug!("MSVC environment already active in this shell");
        return NegotiatedEnvironment {
            env: current,
            source: EnvironmentSource::AlreadyActivated,
        };
    }

    tracing::info!("Detecting MSVC environment...");
    match activate() {
        Ok(vars) => NegotiatedEnvironment {
            env: vars.into_iter().collect(),
            source: EnvironmentSource::Activated,
        },
        Err(e) => {
            tracing::warn!("{}; continuing with the current environment", e);
            NegotiatedEnvironment {
                env: current,
                source: EnvironmentSource::Fallback(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn base_env() -> EnvironmentMap {
        [
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("HOME".to_string(), "/home/dev".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_non_windows_passes_through() {
        for platform in [PlatformId::Linux, PlatformId::MacOs, PlatformId::Other] {
            let negotiated = negotiate(platform, base_env(), || {
                panic!("activation must not run on {}", platform)
            });
            assert_eq!(negotiated.env, base_env());
            assert_eq!(negotiated.source, EnvironmentSource::Inherited);
        }
    }

    #[test]
    fn test_windows_uses_activated_environment() {
        let negotiated = negotiate(PlatformId::Windows, base_env(), || {
            Ok(vec![
                ("Path".to_string(), "C:\\VS\\bin".to_string()),
                ("INCLUDE".to_string(), "C:\\VS\\include".to_string()),
            ])
        });

        assert_eq!(negotiated.source, EnvironmentSource::Activated);
        assert_eq!(negotiated.env.get("PATH"), Some("C:\\VS\\bin"));
        assert_eq!(negotiated.env.get("INCLUDE"), Some("C:\\VS\\include"));
    }

    #[test]
    fn test_every_activation_failure_falls_back() {
        let failures = vec![
            ActivationError::DiscoveryToolMissing,
            ActivationError::NoInstallation,
            ActivationError::ActivationScriptMissing(PathBuf::from("C:/VS/vcvarsall.bat")),
            ActivationError::ActivationFailed("exit code 1".to_string()),
        ];

        for failure in failures {
            let message = failure.to_string();
            let negotiated = negotiate(PlatformId::Windows, base_env(), move || Err(failure));
            assert_eq!(negotiated.env, base_env());
            assert_eq!(negotiated.source, EnvironmentSource::Fallback(message));
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let env: EnvironmentMap = [("Path".to_string(), "x".to_string())].into_iter().collect();
        assert_eq!(env.get("PATH"), Some("x"));
        assert_eq!(env.get("Path"), Some("x"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn test_from_current_is_not_empty() {
        let env = EnvironmentMap::from_current();
        assert_eq!(env.len(), std::env::vars_os().count());
    }
}
