//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::PROJECT_CONFIG_NAME;

/// Files whose presence marks a project root.
pub const ROOT_MARKERS: &[&str] = &[PROJECT_CONFIG_NAME, "CMakePresets.json"];

/// Remove a directory and all its contents, if it exists.
///
/// Returns whether anything was removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Find the project root by walking up from `start`.
///
/// The nearest ancestor containing a [`ROOT_MARKERS`] file wins; if none
/// does, `start` itself is the root.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m).is_file()))
        .unwrap_or(start)
        .to_path_buf()
}

/// Display `path` relative to `base` when possible.
pub fn display_relative(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .filter(|p| !p.starts_with(".."))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
