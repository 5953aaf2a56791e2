/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::packages
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Package-origin lookup consumed by the selector and the
    inventory, plus the JSON package snapshot that backs it.

  Security / Safety Notes:
    Snapshots are read-only inputs produced by the privileged
    data-gathering helper; nothing here touches the package
    database.

  Dependencies:
    serde/serde_json for snapshot decoding.

  Operational Scope:
    One snapshot per refresh cycle; rebuilt from scratch on
    every refresh.

  Revision History:
    2026-03-06 COD  Replaced VersionInfo with package records.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Trait seam between the core and package sources
============================================================*/

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KernupError, Result};

/// One package as seen by the package manager at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    #[serde(default)]
    pub installed_version: Option<String>,
    #[serde(default)]
    pub candidate_version: Option<String>,
    /// Source package of the candidate (or installed) version.
    #[serde(default)]
    pub source_name: Option<String>,
    /// Every origin label across all known versions of the package.
    #[serde(default)]
    pub origins: BTreeSet<String>,
    /// Origin label of the candidate (or installed) version; empty for local.
    #[serde(default)]
    pub origin: Option<String>,
    /// Archive/pocket of that version, e.g. `jammy-updates`.
    #[serde(default)]
    pub archive: String,
    #[serde(default)]
    pub auto_installed: bool,
    /// Whether the candidate version can be fetched from a repository.
    #[serde(default)]
    pub downloadable: bool,
    /// Raw `Supported:` control field, e.g. `5y` or `9m`.
    #[serde(default)]
    pub supported: Option<String>,
}

impl PackageRecord {
    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// Version the package manager would act on: the candidate, else the
    /// installed one.
    pub fn effective_version(&self) -> Option<&str> {
        self.candidate_version
            .as_deref()
            .or(self.installed_version.as_deref())
    }

    pub fn source(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.name)
    }
}

/// Package-origin lookup used by the core.
pub trait PackageIndex {
    /// Look a package up by exact name.
    fn get(&self, name: &str) -> Option<&PackageRecord>;

    /// All known package names in ascending order.
    fn names(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// In-memory package snapshot keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct PackageSnapshot {
    packages: BTreeMap<String, PackageRecord>,
}

#[derive(Deserialize)]
struct SnapshotDocument {
    packages: Vec<PackageRecord>,
}

impl PackageSnapshot {
    pub fn from_records<I: IntoIterator<Item = PackageRecord>>(records: I) -> Self {
        let packages = records
            .into_iter()
            .map(|record| {
                // Multi-arch names such as `linux-generic:amd64` are keyed without the qualifier.
                let key = record.name.split(':').next().unwrap_or_default().to_string();
                (key, record)
            })
            .collect();
        Self { packages }
    }

    /// Decode a snapshot document `{"packages": [...]}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let document: SnapshotDocument = serde_json::from_str(text).map_err(|err| {
            KernupError::Serialization(format!("Failed to decode package snapshot: {err}"))
        })?;
        Ok(Self::from_records(document.packages))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to read package snapshot {}: {err}",
                path.display()
            ))
        })?;
        Self::from_json(&text)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PackageIndex for PackageSnapshot {
    fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.get(name)
    }

    fn names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.packages.keys().map(String::as_str))
    }
}
