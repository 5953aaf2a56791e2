/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::logger
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Structured, append-only logging for Kernup-Core sessions
    with a configurable echo threshold.

  Security / Safety Notes:
    Only package names, versions and paths are logged.

  Dependencies:
    chrono for UTC stamps, sha2 for session digests.

  Operational Scope:
    Shared by the CLI, the helper layer and the selector,
    which records one coded line per decision step.

  Revision History:
    2026-03-02 COD  Ported session logger to Kernup.
    2026-03-19 COD  Added level threshold and silent mode.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful error propagation on I/O failures
============================================================*/

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{KernupError, Result};

/// Structured log level, ordered from most to least verbose.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = KernupError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(KernupError::Config(format!("Unknown log level `{other}`"))),
        }
    }
}

/// Shared logger writing `stamp [LEVEL] [CODE] message` lines.
pub struct Logger {
    sink: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    echo_threshold: LogLevel,
    quiet: bool,
}

impl Logger {
    /// Build a logger that echoes to stderr and optionally appends to a file.
    ///
    /// Entries at or above `echo_threshold` are echoed; warnings and errors
    /// are always echoed.
    pub fn new(path: Option<PathBuf>, echo_threshold: LogLevel) -> Result<Self> {
        let sink = match path.as_deref() {
            Some(file_path) => Some(Mutex::new(BufWriter::new(open_log_file(file_path)?))),
            None => None,
        };

        Ok(Self {
            sink,
            path,
            echo_threshold,
            quiet: false,
        })
    }

    /// Logger that drops everything. Used by library callers and tests.
    pub fn silent() -> Self {
        Self {
            sink: None,
            path: None,
            echo_threshold: LogLevel::Error,
            quiet: true,
        }
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        if self.quiet {
            return;
        }
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = format!("{timestamp} [{level}] [{code}] {}", message.as_ref());

        if level >= self.echo_threshold || level >= LogLevel::Warn {
            eprintln!("{payload}");
        }

        let Some(sink) = &self.sink else {
            return;
        };
        if let Ok(mut guard) = sink.lock() {
            if writeln!(guard, "{payload}").and_then(|_| guard.flush()).is_err() {
                eprintln!("{timestamp} [{}] [LOGGER] Failed to write log file", LogLevel::Error);
            }
        }
    }

    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist the SHA-256 digest of the log file as `<log>.hash`.
    pub fn finalize(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let data = std::fs::read(path).map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);
        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        std::fs::write(&hash_path, format!("{digest:x}  {name}\n")).map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to create log directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| {
            KernupError::Filesystem(format!("Failed to open log file {}: {err}", path.display()))
        })
}
