/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::error
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Kernup-Core error types so catalog, helper and
    configuration failures share one taxonomy and exit scheme.

  Security / Safety Notes:
    Error contexts carry package names, versions and paths
    only; no credentials ever reach this layer.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Propagated by I/O facing modules. The selector converts
    every catalog error into "no recommendation" and logs it.

  Revision History:
    2026-03-02 COD  Established kernel error taxonomy.
    2026-04-11 COD  Split fetch, parse and unavailable-build
                    failures for catalog diagnostics.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Kernup-Core operations.
pub type Result<T> = std::result::Result<T, KernupError>;

/// Enumerates high-level error domains surfaced by Kernup-Core.
#[derive(Debug, Error)]
pub enum KernupError {
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    /// Timeout, connection failure or non-success HTTP status.
    #[error("Network: {0}")]
    Network(String),
    /// Malformed version, catalog or cache content.
    #[error("Parse: {0}")]
    Parse(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Mainline kernel {version} is unavailable (failed to build)")]
    KernelUnavailable { version: String },
    /// The data-gathering helper emitted its error sentinel.
    #[error("Kernel data helper reported a failure: {0}")]
    HelperReported(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl KernupError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            KernupError::CommandMissing { .. } => ExitCode::from(10),
            KernupError::CommandFailure { .. } => ExitCode::from(11),
            KernupError::HelperReported(_) => ExitCode::from(12),
            KernupError::Config(_) => ExitCode::from(20),
            KernupError::Network(_) => ExitCode::from(30),
            KernupError::Serialization(_) => ExitCode::from(31),
            KernupError::Parse(_) => ExitCode::from(32),
            KernupError::KernelUnavailable { .. } => ExitCode::from(33),
            KernupError::Filesystem(_) => ExitCode::from(40),
            KernupError::Io(_) => ExitCode::from(41),
            KernupError::Runtime(_) => ExitCode::from(50),
        }
    }

    /// True for failures that mean "no catalog data" rather than a defect.
    pub fn is_catalog_gap(&self) -> bool {
        matches!(
            self,
            KernupError::Network(_) | KernupError::Parse(_) | KernupError::KernelUnavailable { .. }
        )
    }
}
