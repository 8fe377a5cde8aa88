//! Centralized shell output.
//!
//! Every user-facing line goes through [`Shell`]: a status word right-aligned
//! to 12 columns, colored by its [`Level`], followed by the message. Writes
//! are serialized through a mutex so concurrent workers never interleave
//! partial lines or multi-line blocks.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// --verbose: status lines, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Severity of a message; decides color and quiet-mode filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn color_code(&self) -> &'static str {
        match self {
            Level::Info => "\x1b[1;36m",
            Level::Success => "\x1b[1;32m",
            Level::Warning => "\x1b[1;33m",
            Level::Error => "\x1b[1;31m",
        }
    }
}

/// Status words for output messages.
///
/// Shell handles all formatting - callers just specify the semantic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Info
    Info,
    Executing,
    Action,
    Analyzing,
    Formatting,
    Running,

    // Success
    Finished,
    Passed,

    // Warning
    Warning,
    Skipped,
    Removed,

    // Error
    Failed,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Info => "Info",
            Status::Executing => "Executing",
            Status::Action => "Action",
            Status::Analyzing => "Analyzing",
            Status::Formatting => "Formatting",
            Status::Running => "Running",
            Status::Finished => "Finished",
            Status::Passed => "Passed",
            Status::Warning => "Warning",
            Status::Skipped => "Skipped",
            Status::Removed => "Removed",
            Status::Failed => "Failed",
            Status::Error => "error",
        }
    }

    /// The level this status is reported at.
    pub fn level(&self) -> Level {
        match self {
            Status::Info
            | Status::Executing
            | Status::Action
            | Status::Analyzing
            | Status::Formatting
            | Status::Running => Level::Info,
            Status::Finished | Status::Passed => Level::Success,
            Status::Warning | Status::Skipped | Status::Removed => Level::Warning,
            Status::Failed | Status::Error => Level::Error,
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Format one status line; pure function of (status, message, color).
pub fn format_line(status: Status, msg: impl Display, color: bool) -> String {
    let text = status.as_str();
    if color {
        format!(
            "{}{:>width$}\x1b[0m {}",
            status.level().color_code(),
            text,
            msg,
            width = STATUS_WIDTH
        )
    } else {
        format!("{:>width$} {}", text, msg, width = STATUS_WIDTH)
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
    out: Mutex<()>,
}

impl Shell {
    /// Create a new shell.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
            out: Mutex::new(()),
        }
    }

    /// Create a shell from CLI flags. Quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// In quiet mode, only error-level statuses are printed.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status.level() != Level::Error {
            return;
        }

        let line = format_line(status, msg, self.use_color);
        let _guard = self.out.lock().unwrap_or_else(|e| e.into_inner());
        eprintln!("{}", line);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a success message.
    pub fn success(&self, msg: impl Display) {
        self.status(Status::Finished, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Print a status header followed by a verbatim block, as one unit.
    ///
    /// Used for captured tool output so that concurrent reports never mix.
    pub fn block(&self, status: Status, header: impl Display, body: &str) {
        if self.is_quiet() && status.level() != Level::Error {
            return;
        }

        let line = format_line(status, header, self.use_color);
        let _guard = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{}", line);
        for body_line in body.lines() {
            let _ = writeln!(stderr, "{}", body_line);
        }
        let _ = stderr.flush();
    }

    /// Create a progress bar.
    ///
    /// In quiet or verbose mode, returns a hidden progress bar.
    pub fn progress(&self, total: u64, msg: impl Display) -> ProgressBar {
        if self.is_quiet() || self.is_verbose() || total <= 1 {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(Verbosity::Normal, ColorChoice::Auto)
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}
