//! Source discovery and compilation-database lookup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use walkdir::WalkDir;

/// File name of a compilation database.
pub const COMPILE_COMMANDS: &str = "compile_commands.json";

/// Extensions of C++ module interface units.
pub const MODULE_INTERFACE_EXTENSIONS: &[&str] = &["ixx", "cppm"];

/// Whether `path` has one of `extensions` (compared case-insensitively).
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.as_ref().eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Whether `path` is a module interface unit.
pub fn is_module_interface(path: &Path) -> bool {
    has_extension(path, MODULE_INTERFACE_EXTENSIONS)
}

/// Collect files under `dirs` (relative to `root`) with matching extensions.
///
/// Missing directories are skipped. Hidden directories are not entered.
/// The result is sorted so repeated runs visit files in the same order.
pub fn discover_sources<S: AsRef<str>>(root: &Path, dirs: &[PathBuf], extensions: &[S]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for dir in dirs {
        let dir = root.join(dir);
        if !dir.is_dir() {
            tracing::debug!("skipping missing source directory {}", dir.display());
            continue;
        }

        for entry in WalkDir::new(&dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    files
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Find the directory holding a compilation database.
///
/// `preferred` (normally the current preset's build directory) wins when it
/// has one; otherwise the first child of `build_root`, in name order.
pub fn find_compile_database(build_root: &Path, preferred: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = preferred {
        if dir.join(COMPILE_COMMANDS).is_file() {
            return Some(dir.to_path_buf());
        }
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(build_root)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .find(|dir| dir.join(COMPILE_COMMANDS).is_file())
}

#[derive(Debug, Deserialize)]
struct CompileCommand {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
}

impl CompileCommand {
    fn compiler(&self) -> Option<&str> {
        if let Some(first) = self.arguments.as_ref().and_then(|a| a.first()) {
            return Some(first.as_str());
        }
        let command = self.command.as_deref()?.trim_start();
        if let Some(rest) = command.strip_prefix('"') {
            return rest.split('"').next();
        }
        command.split_whitespace().next()
    }
}

/// Whether `compiler` names the MSVC driver (`cl` or `cl.exe`, any directory).
pub fn is_msvc_compiler(compiler: &str) -> bool {
    let name = compiler.rsplit(['/', '\\']).next().unwrap_or(compiler);
    let name = name.to_ascii_lowercase();
    name == "cl" || name == "cl.exe"
}

/// Whether the database in `db_dir` was produced for the MSVC compiler.
///
/// Only the first entry is inspected; a database mixes compilers rarely
/// enough that one entry decides.
pub fn database_uses_msvc(db_dir: &Path) -> Result<bool> {
    let path = db_dir.join(COMPILE_COMMANDS);
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let entries: Vec<CompileCommand> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(entries
        .first()
        .and_then(CompileCommand::compiler)
        .map(is_msvc_compiler)
        .unwrap_or(false))
}

/// Drop module interface units when the database comes from MSVC, whose
/// flags the analysis tool cannot apply to them.
pub fn filter_for_database(files: Vec<PathBuf>, msvc: bool) -> Vec<PathBuf> {
    if !msvc {
        return files;
    }
    files.into_iter().filter(|f| !is_module_interface(f)).collect()
}
