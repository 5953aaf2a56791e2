/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::catalog
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Mainline catalog seam consumed by the selector and the
    on-disk JSON cache that backs it between check cycles.

  Security / Safety Notes:
    Cache files are only written by root so that unprivileged
    sessions cannot plant catalog data for the privileged
    helper. Readers tolerate absent or corrupt files.

  Dependencies:
    serde_json for cache files, libc for the euid check.

  Operational Scope:
    One cache directory shared by every check cycle.

  Revision History:
    2026-03-12 COD  Introduced catalog cache.
    2026-04-02 COD  Cached FAILED marker for unavailable builds.
    2026-06-04 COD  Overlay for file lists fetched during a run.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Readers degrade to "no data" instead of failing
    - Privileged writers only
============================================================*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KernupError, Result};
use crate::kernel::Flavor;
use crate::mainline::{BuildFile, DebName, MainlineBranch, SupportMap};

/// Minimum number of matching files for a build to be installable.
pub const MIN_BUILD_FILES: usize = 4;

const SUPPORT_STATUS_CACHE: &str = "mainline-support-status";
const FAILED_MARKER: &str = "FAILED";

/// Source of mainline catalog data.
///
/// Every method may fail; callers treat a failure as "no data".
pub trait MainlineCatalog {
    /// Versions of a versioned branch, newest first.
    fn available_versions(&self, branch: &MainlineBranch) -> Result<Vec<String>>;

    /// Date string of the newest build of a daily branch, e.g. `2023-11-01`.
    fn daily_build(&self, branch: &MainlineBranch) -> Result<String>;

    /// kernel.org status per `major.minor` series.
    fn support_status(&self) -> Result<SupportMap>;

    /// Installable files of `version`, already filtered for flavor and architecture.
    fn file_list(&self, branch: &MainlineBranch, version: &str) -> Result<Vec<BuildFile>>;
}

/// Cached file list of the last probed build of a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedBuild {
    Files(Vec<BuildFile>),
    Failed,
}

/// JSON cache directory for catalog data.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    dir: PathBuf,
    max_age: Option<Duration>,
}

impl CatalogCache {
    pub fn new(dir: PathBuf, max_age: Option<Duration>) -> Self {
        Self { dir, max_age }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Read a cache file; absent, stale or corrupt files read as `None`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.path(name);
        if let Some(max_age) = self.max_age {
            let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default();
            if age > max_age {
                return None;
            }
        }
        let text = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Write a cache file. Returns `false` without writing when not root.
    pub fn store<T: Serialize>(&self, name: &str, data: &T) -> Result<bool> {
        if !running_as_root() {
            return Ok(false);
        }
        self.write(name, data)?;
        Ok(true)
    }

    fn write<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to create cache directory {}: {err}",
                self.dir.display()
            ))
        })?;
        let path = self.path(name);
        let body = serde_json::to_string(data).map_err(|err| {
            KernupError::Serialization(format!("Failed to encode cache {name}: {err}"))
        })?;
        fs::write(&path, body).map_err(|err| {
            KernupError::Filesystem(format!("Failed to write cache {}: {err}", path.display()))
        })
    }

    pub fn load_versions(&self, branch: &MainlineBranch) -> Option<Vec<String>> {
        self.load::<Vec<String>>(&branch.cache_name())
            .filter(|versions| !versions.is_empty())
    }

    pub fn store_versions(&self, branch: &MainlineBranch, versions: &[String]) -> Result<bool> {
        if versions.is_empty() {
            return Ok(false);
        }
        self.store(&branch.cache_name(), &versions)
    }

    pub fn load_daily(&self, branch: &MainlineBranch) -> Option<String> {
        self.load::<String>(&branch.cache_name())
            .filter(|date| !date.is_empty())
    }

    pub fn store_daily(&self, branch: &MainlineBranch, date: &str) -> Result<bool> {
        if date.is_empty() {
            return Ok(false);
        }
        self.store(&branch.cache_name(), &date)
    }

    pub fn load_support_status(&self) -> Option<SupportMap> {
        self.load::<SupportMap>(SUPPORT_STATUS_CACHE)
            .filter(|map| !map.is_empty())
    }

    pub fn store_support_status(&self, map: &SupportMap) -> Result<bool> {
        if map.is_empty() {
            return Ok(false);
        }
        self.store(SUPPORT_STATUS_CACHE, map)
    }

    /// Cached file list of `version`; `None` when the cache holds another version.
    pub fn load_build(&self, branch: &MainlineBranch, version: &str) -> Option<CachedBuild> {
        let entry: Vec<serde_json::Value> = self.load(&build_cache_name(branch))?;
        let (head, files) = entry.split_first()?;
        if head.as_str() != Some(version) {
            return None;
        }
        if files.len() == 1 && files[0].as_str() == Some(FAILED_MARKER) {
            return Some(CachedBuild::Failed);
        }
        let files = files
            .iter()
            .map(|value| serde_json::from_value::<BuildFile>(value.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .ok()?;
        Some(CachedBuild::Files(files))
    }

    pub fn store_build(
        &self,
        branch: &MainlineBranch,
        version: &str,
        files: &[BuildFile],
    ) -> Result<bool> {
        if files.is_empty() {
            return Ok(false);
        }
        let mut entry = vec![serde_json::Value::String(version.to_string())];
        for file in files {
            entry.push(serde_json::to_value(file).map_err(|err| {
                KernupError::Serialization(format!("Failed to encode build file: {err}"))
            })?);
        }
        self.store(&build_cache_name(branch), &entry)
    }

    /// Record that `version` failed to build so it is not probed again.
    pub fn mark_unavailable(&self, branch: &MainlineBranch, version: &str) -> Result<bool> {
        self.store(&build_cache_name(branch), &[version, FAILED_MARKER])
    }
}

fn build_cache_name(branch: &MainlineBranch) -> String {
    format!("{}-kernel", branch.cache_name())
}

/// Whether the process runs with root privileges.
pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Catalog answering from the cache only.
pub struct CachedCatalog {
    cache: CatalogCache,
    flavor: Flavor,
    arch: String,
}

impl CachedCatalog {
    pub fn new(cache: CatalogCache, flavor: Flavor, arch: impl Into<String>) -> Self {
        Self {
            cache,
            flavor,
            arch: arch.into(),
        }
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }
}

impl MainlineCatalog for CachedCatalog {
    fn available_versions(&self, branch: &MainlineBranch) -> Result<Vec<String>> {
        if !self.flavor.has_mainline_builds() {
            return Ok(Vec::new());
        }
        self.cache.load_versions(branch).ok_or_else(|| {
            KernupError::Network(format!("No cached mainline index for branch {}", branch.name))
        })
    }

    fn daily_build(&self, branch: &MainlineBranch) -> Result<String> {
        if !self.flavor.has_mainline_builds() {
            return Err(KernupError::KernelUnavailable {
                version: format!("{} build for {}", branch.name, self.flavor),
            });
        }
        self.cache.load_daily(branch).ok_or_else(|| {
            KernupError::Network(format!("No cached daily build for branch {}", branch.name))
        })
    }

    fn support_status(&self) -> Result<SupportMap> {
        self.cache
            .load_support_status()
            .ok_or_else(|| KernupError::Network("No cached kernel.org support status".into()))
    }

    fn file_list(&self, branch: &MainlineBranch, version: &str) -> Result<Vec<BuildFile>> {
        match self.cache.load_build(branch, version) {
            Some(CachedBuild::Files(files)) => {
                let files = matching_files(files, self.flavor, &self.arch);
                if files.len() < MIN_BUILD_FILES {
                    return Err(KernupError::KernelUnavailable {
                        version: version.to_string(),
                    });
                }
                Ok(files)
            }
            Some(CachedBuild::Failed) => Err(KernupError::KernelUnavailable {
                version: version.to_string(),
            }),
            None => Err(KernupError::Network(format!(
                "No cached file list for mainline kernel {version}"
            ))),
        }
    }
}

/// Catalog answering file lists fetched during this run before asking the
/// wrapped catalog.
///
/// Unprivileged runs cannot write the build cache, so a list fetched for the
/// selector's target only lives here.
pub struct FetchedBuilds<'c> {
    inner: &'c dyn MainlineCatalog,
    builds: Vec<(MainlineBranch, String, Vec<BuildFile>)>,
}

impl<'c> FetchedBuilds<'c> {
    pub fn new(inner: &'c dyn MainlineCatalog) -> Self {
        Self {
            inner,
            builds: Vec::new(),
        }
    }

    pub fn with_build(
        mut self,
        branch: &MainlineBranch,
        version: impl Into<String>,
        files: Vec<BuildFile>,
    ) -> Self {
        self.builds.push((*branch, version.into(), files));
        self
    }
}

impl MainlineCatalog for FetchedBuilds<'_> {
    fn available_versions(&self, branch: &MainlineBranch) -> Result<Vec<String>> {
        self.inner.available_versions(branch)
    }

    fn daily_build(&self, branch: &MainlineBranch) -> Result<String> {
        self.inner.daily_build(branch)
    }

    fn support_status(&self) -> Result<SupportMap> {
        self.inner.support_status()
    }

    fn file_list(&self, branch: &MainlineBranch, version: &str) -> Result<Vec<BuildFile>> {
        match self
            .builds
            .iter()
            .find(|(fetched, fetched_version, _)| fetched == branch && fetched_version == version)
        {
            Some((_, _, files)) => Ok(files.clone()),
            None => self.inner.file_list(branch, version),
        }
    }
}

/// Keep the files that belong to a `flavor` install on `arch`.
pub fn matching_files(files: Vec<BuildFile>, flavor: Flavor, arch: &str) -> Vec<BuildFile> {
    files
        .into_iter()
        .filter(|file| {
            DebName::parse(&file.filename).is_some_and(|deb| deb.matches(flavor, arch))
        })
        .collect()
}
