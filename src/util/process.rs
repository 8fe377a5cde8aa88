//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How a child's stdout/stderr are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    /// Stream straight to the parent's console.
    #[default]
    Inherit,
    /// Collect into the returned [`ProcessOutcome`].
    Piped,
}

/// Result of running one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code; `-1` when the process was killed by a signal or never ran.
    pub exit_code: i32,
    /// Captured stdout (empty when streamed).
    pub stdout: String,
    /// Captured stderr (empty when streamed). Holds the OS error on launch failure.
    pub stderr: String,
    /// The program could not be found or started.
    pub launch_failed: bool,
}

impl ProcessOutcome {
    /// An outcome for a command that exited with `code` and printed nothing.
    pub fn exited(code: i32) -> Self {
        ProcessOutcome {
            exit_code: code,
            ..Default::default()
        }
    }

    /// An outcome for a command that could not be launched.
    pub fn launch_failure(message: impl Into<String>) -> Self {
        ProcessOutcome {
            exit_code: -1,
            stdout: String::new(),
            stderr: message.into(),
            launch_failed: true,
        }
    }

    /// Whether the tool ran and exited zero.
    pub fn success(&self) -> bool {
        !self.launch_failed && self.exit_code == 0
    }

    /// Whether anything was written to stdout or stderr.
    pub fn has_output(&self) -> bool {
        !self.stdout.trim().is_empty() || !self.stderr.trim().is_empty()
    }

    fn from_output(output: Output) -> Self {
        ProcessOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            launch_failed: false,
        }
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    env_clear: bool,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            env_clear: false,
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Replace the inherited environment with exactly `vars`.
    pub fn env_exact<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        self.env_clear = true;
        self.env = vars
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory, if set.
    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if self.env_clear {
            cmd.env_clear();
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Run the command to completion.
    ///
    /// Never returns an error: a program that cannot be started yields an
    /// outcome with `launch_failed` set, so callers decide how fatal that is.
    pub fn launch(&self, capture: Capture) -> ProcessOutcome {
        let mut cmd = self.build_command();

        let result = match capture {
            Capture::Piped => cmd
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
                .map(ProcessOutcome::from_output),
            Capture::Inherit => cmd.status().map(|status| ProcessOutcome {
                exit_code: status.code().unwrap_or(-1),
                ..Default::default()
            }),
        };

        result.unwrap_or_else(|e| {
            ProcessOutcome::launch_failure(format!(
                "failed to spawn `{}`: {}",
                self.program.display(),
                e
            ))
        })
    }

    /// Run with captured output, killing the process after `timeout`.
    ///
    /// Returns `None` when the deadline passed. Only the direct child is
    /// killed; output it produced before the deadline is discarded.
    pub fn launch_with_timeout(&self, timeout: Duration) -> Option<ProcessOutcome> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Some(ProcessOutcome::launch_failure(format!(
                    "failed to spawn `{}`: {}",
                    self.program.display(),
                    e
                )))
            }
        };

        // Drain both pipes while waiting so a chatty child cannot block.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
                Ok(None) | Err(_) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
            }
        };

        // After a kill, grandchildren may still hold the pipes open; the
        // drain threads are left detached instead of joined.
        let status = status?;
        Some(ProcessOutcome {
            exit_code: status.code().unwrap_or(-1),
            stdout: collect(stdout),
            stderr: collect(stderr),
            launch_failed: false,
        })
    }

    /// Display the command for echoing and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| {
            if a.contains(' ') {
                format!("\"{}\"", a)
            } else {
                a.clone()
            }
        }));
        parts.join(" ")
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Resolve a tool from its configured path, falling back to a PATH search.
///
/// A configured path that is neither a file nor found on PATH yields `None`.
pub fn locate_tool(configured: Option<&Path>, name: &str) -> Option<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Some(path.to_path_buf()),
        Some(path) => which::which(path).ok(),
        None => find_executable(name),
    }
}
