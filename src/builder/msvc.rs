//! MSVC environment activation.
//!
//! Locates Visual Studio with `vswhere.exe`, runs `vcvarsall.bat` for the
//! x64 target through a temporary batch file, and captures the resulting
//! environment from a `set` dump.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::util::process::{Capture, ProcessBuilder};

/// Component every usable installation must provide.
pub const REQUIRED_COMPONENT: &str = "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";

/// Architecture argument handed to `vcvarsall.bat`.
pub const TARGET_ARCH: &str = "x64";

/// Why activation did not produce an environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("vswhere.exe not found; MSVC environment might not be loaded correctly")]
    DiscoveryToolMissing,

    #[error("failed to find a Visual Studio installation via vswhere: {0}")]
    DiscoveryFailed(String),

    #[error("no Visual Studio installation with the C++ x86/x64 build tools found")]
    NoInstallation,

    #[error("vcvarsall.bat not found at {0}")]
    ActivationScriptMissing(PathBuf),

    #[error("vcvarsall.bat failed: {0}")]
    ActivationFailed(String),
}

/// Find vswhere.exe in its standard location or on PATH.
pub fn find_vswhere() -> Option<PathBuf> {
    let program_files_x86 = std::env::var("ProgramFiles(x86)")
        .unwrap_or_else(|_| "C:\\Program Files (x86)".to_string());

    let standard_path = PathBuf::from(&program_files_x86)
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");

    if standard_path.exists() {
        return Some(standard_path);
    }

    which::which("vswhere").ok()
}

/// Arguments selecting the newest installation with the C++ tools.
pub fn vswhere_args() -> [&'static str; 7] {
    [
        "-latest",
        "-products",
        "*",
        "-requires",
        REQUIRED_COMPONENT,
        "-property",
        "installationPath",
    ]
}

/// Location of the activation script inside an installation.
pub fn vcvarsall_path(installation: &Path) -> PathBuf {
    installation
        .join("VC")
        .join("Auxiliary")
        .join("Build")
        .join("vcvarsall.bat")
}

/// Batch script that activates the toolchain and dumps the environment.
pub fn activation_script(vcvarsall: &Path) -> String {
    format!(
        "@echo off\r\ncall \"{}\" {} >nul 2>&1\r\nif errorlevel 1 exit /b 1\r\nset\r\n",
        vcvarsall.display(),
        TARGET_ARCH
    )
}

/// Parse a `set` dump into key/value pairs.
///
/// Lines without `=` are skipped, as are cmd's hidden per-drive entries
/// (`=C:=C:\...`) which start with `=`.
pub fn parse_env_dump(dump: &str) -> Vec<(String, String)> {
    dump.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.trim_end_matches('\r').to_string()))
        .collect()
}

/// Whether the current process already runs inside an activated shell.
pub fn already_activated(lookup: impl Fn(&str) -> Option<String>) -> bool {
    let has_cl = lookup("PATH")
        .map(|path| {
            std::env::split_paths(&path).any(|dir| dir.join("cl.exe").is_file())
        })
        .unwrap_or(false);
    has_cl && lookup("INCLUDE").is_some() && lookup("LIB").is_some()
}

/// Run the full activation sequence and return the captured variables.
pub fn activate() -> Result<Vec<(String, String)>, ActivationError> {
    let vswhere = find_vswhere().ok_or(ActivationError::DiscoveryToolMissing)?;
    tracing::debug!("Found vswhere at: {}", vswhere.display());

    let outcome = ProcessBuilder::new(&vswhere)
        .args(vswhere_args())
        .launch(Capture::Piped);
    if !outcome.success() {
        return Err(ActivationError::DiscoveryFailed(outcome.stderr.trim().to_string()));
    }

    let installation = outcome.stdout.lines().next().unwrap_or("").trim().to_string();
    if installation.is_empty() {
        return Err(ActivationError::NoInstallation);
    }
    let installation = PathBuf::from(installation);
    tracing::debug!("Found Visual Studio at: {}", installation.display());

    let vcvarsall = vcvarsall_path(&installation);
    if !vcvarsall.exists() {
        return Err(ActivationError::ActivationScriptMissing(vcvarsall));
    }

    // A temporary batch file avoids cmd.exe quoting issues with spaces.
    let mut batch = tempfile::Builder::new()
        .prefix("keel_vcvars")
        .suffix(".bat")
        .tempfile()
        .map_err(|e| ActivationError::ActivationFailed(e.to_string()))?;
    batch
        .write_all(activation_script(&vcvarsall).as_bytes())
        .and_then(|_| batch.flush())
        .map_err(|e| ActivationError::ActivationFailed(e.to_string()))?;

    let outcome = ProcessBuilder::new("cmd")
        .arg("/c")
        .arg(batch.path())
        .launch(Capture::Piped);

    if !outcome.success() {
        let detail = if outcome.stderr.trim().is_empty() {
            format!("exit code {}", outcome.exit_code)
        } else {
            outcome.stderr.trim().to_string()
        };
        return Err(ActivationError::ActivationFailed(detail));
    }

    let vars = parse_env_dump(&outcome.stdout);
    if !vars.iter().any(|(k, v)| k.eq_ignore_ascii_case("PATH") && !v.is_empty()) {
        return Err(ActivationError::ActivationFailed(
            "activation produced an empty PATH".to_string(),
        ));
    }

    tracing::info!("Loaded MSVC environment from {}", vcvarsall.display());
    Ok(vars)
}
