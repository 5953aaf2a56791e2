/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::helper
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Invoke the external collaborators: the package snapshot
    command and the running kernel identity.

  Security / Safety Notes:
    Commands run without a shell, with piped output and a
    hard timeout. Nothing is written.

  Dependencies:
    tokio process and fs.

  Operational Scope:
    Input gathering for `recommend` and `kernels`.

  Revision History:
    2026-03-16 COD  Adapted command runner for kernel data.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Missing binaries and failed runs are distinct errors
    - Bounded waits on external processes
============================================================*/

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{KernupError, Result};
use crate::packages::PackageSnapshot;
use crate::selector::ActiveKernel;

const OSRELEASE_PATH: &str = "/proc/sys/kernel/osrelease";
const VERSION_PATH: &str = "/proc/sys/kernel/version";
const UNAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `argv` and decode its stdout as a package snapshot.
pub async fn load_snapshot(argv: &[String], limit: Duration) -> Result<PackageSnapshot> {
    let Some((program, args)) = argv.split_first() else {
        return Err(KernupError::Config(
            "No package snapshot command configured".into(),
        ));
    };
    let stdout = run_command(program, args, limit).await?;
    PackageSnapshot::from_json(&stdout)
}

/// Read a snapshot from a file, or from a command when no file is given.
pub async fn snapshot_from(
    file: Option<&Path>,
    argv: &[String],
    limit: Duration,
) -> Result<PackageSnapshot> {
    match file {
        Some(path) => PackageSnapshot::load(path),
        None => load_snapshot(argv, limit).await,
    }
}

/// The running kernel release and its build banner.
///
/// Reads procfs first and falls back to `uname`.
pub async fn active_kernel() -> Result<ActiveKernel> {
    let release = match tokio::fs::read_to_string(OSRELEASE_PATH).await {
        Ok(release) if !release.trim().is_empty() => release,
        _ => run_command("uname", &["-r".to_string()], UNAME_TIMEOUT).await?,
    };
    let banner = match tokio::fs::read_to_string(VERSION_PATH).await {
        Ok(banner) => banner,
        Err(_) => run_command("uname", &["-v".to_string()], UNAME_TIMEOUT)
            .await
            .unwrap_or_default(),
    };
    Ok(ActiveKernel::with_banner(release, &banner))
}

async fn run_command(program: &str, args: &[String], limit: Duration) -> Result<String> {
    let rendered = std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = timeout(limit, child)
        .await
        .map_err(|_| {
            KernupError::Runtime(format!(
                "`{rendered}` did not finish within {}s",
                limit.as_secs()
            ))
        })?
        .map_err(|err| map_spawn_error(err, program))?;

    if !output.status.success() {
        return Err(KernupError::CommandFailure {
            command: rendered,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|err| {
        KernupError::Serialization(format!("{rendered} emitted invalid UTF-8: {err}"))
    })
}

fn map_spawn_error(err: io::Error, command: &str) -> KernupError {
    if err.kind() == io::ErrorKind::NotFound {
        KernupError::CommandMissing {
            command: command.into(),
        }
    } else {
        KernupError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}
