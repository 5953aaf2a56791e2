/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::selector
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Decide the single kernel upgrade to recommend for the
    running kernel: a meta-package, a point release within
    the running series, or a mainline build.

  Security / Safety Notes:
    Pure decision logic over a package snapshot and catalog
    data fetched elsewhere. Never installs anything.

  Dependencies:
    globset for blacklist patterns, chrono for daily build
    dates, serde for the recommendation document.

  Operational Scope:
    Invoked once per refresh cycle, after priority updates
    have been ruled out.

  Revision History:
    2026-03-20 COD  Introduced KernelSelector state machine.
    2026-04-11 COD  EOL series cross only when both conditions hold.
    2026-05-14 COD  Flavor-qualified unsigned package checks.
    2026-06-04 COD  Split target choice from file lists; keep the
                    active long-term series.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit configuration instead of global settings
    - Every catalog failure degrades to "no recommendation"
    - One coded log line per decision step
============================================================*/

use std::collections::BTreeSet;

use chrono::Duration;
use globset::{Glob, GlobMatcher};
use serde::Serialize;

use crate::catalog::MainlineCatalog;
use crate::error::{KernupError, Result};
use crate::kernel::{Flavor, PRIMARY_ORIGIN};
use crate::logger::{LogLevel, Logger};
use crate::mainline::{
    build_package_version, catalog_series, filter_versions, is_end_of_life, total_size,
    BuildFile, MainlineBranch, MainlineFilter, SeriesStatus,
};
use crate::packages::{PackageIndex, PackageRecord};
use crate::support::parse_date;
use crate::version::{VersionKey, NULL_SERIES};

/// Package names of one kernel install. `VERSION` is the kernel version,
/// `-KERNELTYPE` the flavor suffix.
pub const KERNEL_PACKAGE_TEMPLATES: [&str; 8] = [
    "linux-headers-VERSION",
    "linux-headers-VERSION-KERNELTYPE",
    "linux-image-VERSION-KERNELTYPE",
    "linux-modules-VERSION-KERNELTYPE",
    "linux-modules-extra-VERSION-KERNELTYPE",
    "linux-image-extra-VERSION-KERNELTYPE",
    "linux-headers-VERSION-KERNELTYPE-amd64",
    "linux-image-VERSION-KERNELTYPE-amd64",
];

/// Compatibility meta that is honoured when installed but never recommended.
const VIRTUAL_META: &str = "linux-virtual";
const LIQUORIX_METAS: [&str; 2] = ["linux-headers-liquorix-amd64", "linux-image-liquorix-amd64"];
/// Source name used for blacklist checks of mainline builds.
const MAINLINE_SOURCE: &str = "linux";

pub const MAINLINE_WARNING: &str =
    "Mainline kernels are not supported by the distribution and are meant for testing only.";

/// User blacklist of `pattern` or `pattern=version` entries.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: Vec<BlacklistEntry>,
}

#[derive(Debug, Clone)]
struct BlacklistEntry {
    matcher: GlobMatcher,
    version: Option<String>,
}

impl Blacklist {
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut entries = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let (pattern, version) = match raw.split_once('=') {
                Some((pattern, version)) => (pattern, Some(version.to_string())),
                None => (raw, None),
            };
            let glob = Glob::new(pattern).map_err(|err| {
                KernupError::Config(format!("Invalid blacklist pattern `{raw}`: {err}"))
            })?;
            entries.push(BlacklistEntry {
                matcher: glob.compile_matcher(),
                version,
            });
        }
        Ok(Self { entries })
    }

    /// Whether `source` at `version` is blacklisted.
    pub fn matches(&self, source: &str, version: &str) -> bool {
        self.entries.iter().any(|entry| {
            entry.matcher.is_match(source)
                && entry.version.as_deref().map_or(true, |wanted| wanted == version)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Feature toggles of one selection run.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub flavor: Flavor,
    pub use_mainline: bool,
    pub include_rc: bool,
    pub include_longterm: bool,
    pub upgrade_eol_series: bool,
    /// Root URL of the mainline build archive.
    pub mainline_root: String,
    pub blacklist: Blacklist,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::Generic,
            use_mainline: false,
            include_rc: false,
            include_longterm: false,
            upgrade_eol_series: false,
            mainline_root: crate::config::DEFAULT_MAINLINE_URL.to_string(),
            blacklist: Blacklist::default(),
        }
    }
}

/// The running kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveKernel {
    /// Kernel release, e.g. `5.15.0-60-generic`.
    pub release: String,
    /// `YYYYMMDD` build date from the kernel version banner (`#202311010207 SMP ...`).
    pub build_date: Option<String>,
}

impl ActiveKernel {
    pub fn new(release: impl Into<String>) -> Self {
        Self {
            release: release.into().trim().to_string(),
            build_date: None,
        }
    }

    pub fn with_banner(release: impl Into<String>, banner: &str) -> Self {
        let build_date = banner
            .trim()
            .get(1..9)
            .filter(|date| date.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string);
        Self {
            build_date,
            ..Self::new(release)
        }
    }

    /// Flavor suffix of the release, e.g. `-generic`.
    pub fn flavor_suffix(&self) -> String {
        format!("-{}", self.release.rsplit('-').next().unwrap_or_default())
    }

    /// `major.minor` of the release, e.g. `6.2` of `6.2.0-060200-generic`.
    fn series_label(&self) -> String {
        self.release.split('.').take(2).collect::<Vec<_>>().join(".")
    }
}

/// A distro package to install or upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUpgrade {
    pub name: String,
    pub new_version: String,
    pub old_version: Option<String>,
    pub source_name: String,
    pub archive: String,
}

impl PackageUpgrade {
    fn from_record(name: &str, record: &PackageRecord) -> Option<Self> {
        Some(Self {
            name: name.to_string(),
            new_version: record.effective_version()?.to_string(),
            old_version: record.installed_version.clone(),
            source_name: record.source().to_string(),
            archive: record.archive.clone(),
        })
    }
}

/// A mainline build to download and install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainlineUpgrade {
    /// Version the installed packages will carry, e.g. `6.3.0-060300`.
    pub version: String,
    /// Catalog entry the build was picked from, e.g. `6.3` or `2023-11-01`.
    pub catalog_version: String,
    pub branch: String,
    pub title: String,
    pub files: Vec<BuildFile>,
    pub download_size: u64,
    pub base_url: String,
    pub old_version: String,
    /// Always set: mainline builds are unsupported testing kernels.
    pub unsupported: bool,
    pub warning: String,
}

/// Mainline build picked from the catalog, before its files are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainlineTarget {
    pub branch: &'static MainlineBranch,
    /// Catalog entry, e.g. `6.3` or `2023-11-01`.
    pub version: String,
}

/// Outcome of one selection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    None,
    SameSeriesMeta {
        package: PackageUpgrade,
    },
    HigherSeriesMeta {
        package: PackageUpgrade,
        /// The long-term meta replaced a further-ahead candidate.
        lts_override: bool,
    },
    /// Flavors without a real meta: every meta-like package at once.
    FlavorMetas {
        packages: Vec<PackageUpgrade>,
    },
    PointRelease {
        version: String,
        packages: Vec<PackageUpgrade>,
    },
    Mainline(MainlineUpgrade),
}

impl Recommendation {
    pub fn is_none(&self) -> bool {
        matches!(self, Recommendation::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::None => "none",
            Recommendation::SameSeriesMeta { .. } => "same-series meta-package",
            Recommendation::HigherSeriesMeta { .. } => "higher-series meta-package",
            Recommendation::FlavorMetas { .. } => "flavor meta-packages",
            Recommendation::PointRelease { .. } => "point release",
            Recommendation::Mainline(_) => "mainline build",
        }
    }
}

/// Meta-package candidate found during the scan.
struct MetaCandidate<'p> {
    name: String,
    record: &'p PackageRecord,
    key: VersionKey,
}

/// Kernel upgrade recommendation engine.
pub struct KernelSelector<'a> {
    packages: &'a dyn PackageIndex,
    catalog: Option<&'a dyn MainlineCatalog>,
    config: &'a SelectorConfig,
    logger: &'a Logger,
}

impl<'a> KernelSelector<'a> {
    pub fn new(packages: &'a dyn PackageIndex, config: &'a SelectorConfig, logger: &'a Logger) -> Self {
        Self {
            packages,
            catalog: None,
            config,
            logger,
        }
    }

    pub fn with_catalog(mut self, catalog: &'a dyn MainlineCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Recommend at most one kernel upgrade for `active`.
    ///
    /// Kernels are never priority updates, so a pending priority update skips
    /// the evaluation entirely.
    pub fn recommend(&self, active: &ActiveKernel, priority_pending: bool) -> Recommendation {
        if priority_pending {
            self.logger
                .info("SELECT", "Priority updates pending; kernel evaluation skipped");
            return Recommendation::None;
        }

        let active_key = VersionKey::parse(&active.release);
        let active_suffix = active.flavor_suffix();
        let flavor = self.config.flavor;
        let active_series = if active_suffix == flavor.suffix() {
            active_key.series()
        } else {
            self.logger.debug(
                "SELECT",
                format!(
                    "Active kernel {} is not of flavor {flavor}; treating its series as null",
                    active.release
                ),
            );
            NULL_SERIES
        };

        // Meta-packages.
        let active_origins = self.active_origins(&active.release);
        let meta_names = self.meta_names(&active_origins);
        let mut metas: Vec<(&str, &PackageRecord)> = Vec::new();
        let mut same_series: Option<MetaCandidate<'_>> = None;
        let mut higher_series: Option<MetaCandidate<'_>> = None;

        for name in &meta_names {
            let Some(record) = self.packages.get(name) else {
                continue;
            };
            metas.push((name.as_str(), record));
            if active_origins.is_disjoint(&record.origins) {
                self.logger
                    .debug("META", format!("{name} shares no origin with the active kernel"));
                continue;
            }
            let Some(version) = record.effective_version() else {
                continue;
            };
            let key = VersionKey::parse(version);
            if active_series > key.series() {
                continue;
            }
            if record.is_installed() {
                self.logger.info(
                    "META",
                    format!("{name} {version} is installed; no kernel recommendation"),
                );
                return Recommendation::None;
            }
            if name == VIRTUAL_META {
                continue;
            }

            let candidate = MetaCandidate {
                name: name.clone(),
                record,
                key,
            };
            if candidate.key.series() == active_series {
                if same_series.as_ref().map_or(true, |best| candidate.key > best.key) {
                    same_series = Some(candidate);
                }
            } else {
                let better = match &higher_series {
                    None => true,
                    Some(best) => {
                        candidate.key.series() < best.key.series()
                            || (candidate.key.series() == best.key.series()
                                && candidate.key > best.key)
                    }
                };
                if better {
                    higher_series = Some(candidate);
                }
            }
        }

        if flavor == Flavor::Liquorix {
            let packages: Vec<PackageUpgrade> = metas
                .into_iter()
                .filter(|(_, record)| !self.is_blacklisted(record))
                .filter_map(|(name, record)| PackageUpgrade::from_record(name, record))
                .collect();
            if packages.is_empty() {
                return Recommendation::None;
            }
            self.logger
                .info("META", format!("Recommending {} {flavor} packages", packages.len()));
            return Recommendation::FlavorMetas { packages };
        }

        if let Some(candidate) = same_series {
            return self.meta_recommendation(candidate, None);
        }

        if let Some(candidate) = higher_series {
            let lts_name = format!("linux{}", flavor.suffix());
            let mut lts_override = None;
            if candidate.name != lts_name {
                if let Some(lts) = self.packages.get(&lts_name) {
                    if let Some(version) = lts.effective_version() {
                        let lts_key = VersionKey::parse(version);
                        if active_series < lts_key.series() {
                            self.logger.info(
                                "META",
                                format!(
                                    "Active series is below long-term meta {lts_name}; preferring it over {}",
                                    candidate.name
                                ),
                            );
                            lts_override = Some(MetaCandidate {
                                name: lts_name.clone(),
                                record: lts,
                                key: lts_key,
                            });
                        }
                    }
                }
            }
            return match lts_override {
                Some(lts) => self.meta_recommendation(lts, Some(true)),
                None => self.meta_recommendation(candidate, Some(false)),
            };
        }

        // Point release within the active series.
        if let Some(recommendation) = self.point_release(&active_key, active_series, &active_suffix) {
            return recommendation;
        }

        if !self.config.use_mainline {
            return Recommendation::None;
        }
        self.mainline(active, &active_key, &active_suffix)
    }

    fn meta_recommendation(
        &self,
        candidate: MetaCandidate<'_>,
        lts_override: Option<bool>,
    ) -> Recommendation {
        if self.is_blacklisted(candidate.record) {
            return Recommendation::None;
        }
        let Some(package) = PackageUpgrade::from_record(&candidate.name, candidate.record) else {
            return Recommendation::None;
        };
        self.logger.info(
            "META",
            format!("Recommending {} {}", package.name, package.new_version),
        );
        match lts_override {
            None => Recommendation::SameSeriesMeta { package },
            Some(lts_override) => Recommendation::HigherSeriesMeta {
                package,
                lts_override,
            },
        }
    }

    /// Origins of the installed image package of the running kernel.
    fn active_origins(&self, release: &str) -> BTreeSet<String> {
        self.packages
            .names()
            .find(|name| name.starts_with("linux-image-") && name.ends_with(release))
            .and_then(|name| self.packages.get(name))
            .map(|record| record.origins.clone())
            .unwrap_or_default()
    }

    fn meta_names(&self, active_origins: &BTreeSet<String>) -> Vec<String> {
        let flavor = self.config.flavor;
        let prefix = format!("linux{}", flavor.suffix());
        let mut names: Vec<String> = self
            .packages
            .names()
            .filter(|name| name.starts_with(&prefix))
            .map(str::to_string)
            .collect();
        names.sort();
        match flavor {
            Flavor::Generic if active_origins.contains(PRIMARY_ORIGIN) => {
                names.push(VIRTUAL_META.to_string());
            }
            Flavor::Liquorix => names.extend(LIQUORIX_METAS.iter().map(|name| name.to_string())),
            _ => {}
        }
        names.dedup();
        names
    }

    fn point_release(
        &self,
        active_key: &VersionKey,
        active_series: [&str; 3],
        active_suffix: &str,
    ) -> Option<Recommendation> {
        let mut newest: Option<(VersionKey, &str)> = None;
        for name in self.packages.names() {
            let Some(version) = name
                .strip_prefix("linux-image-")
                .and_then(|rest| rest.strip_suffix(active_suffix))
            else {
                continue;
            };
            if version.len() < 2 || !version.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let key = VersionKey::parse(version);
            let current = newest.as_ref().map_or(active_key, |(key, _)| key);
            if key.series() == active_series && key > *current {
                newest = Some((key, version));
            }
        }
        let (_, version) = newest?;

        let mut found = false;
        let mut packages = Vec::new();
        for template in KERNEL_PACKAGE_TEMPLATES {
            let name = template
                .replace("VERSION", version)
                .replace("-KERNELTYPE", active_suffix);
            let Some(record) = self.packages.get(&name) else {
                continue;
            };
            if record.is_installed() {
                continue;
            }
            found = true;
            if self.is_blacklisted(record) {
                continue;
            }
            if let Some(upgrade) = PackageUpgrade::from_record(&name, record) {
                packages.push(upgrade);
            }
        }
        if !found {
            return None;
        }
        if packages.is_empty() {
            return Some(Recommendation::None);
        }
        self.logger.info(
            "POINT",
            format!("Recommending kernel {version} ({} packages)", packages.len()),
        );
        Some(Recommendation::PointRelease {
            version: version.to_string(),
            packages,
        })
    }

    fn mainline(
        &self,
        active: &ActiveKernel,
        active_key: &VersionKey,
        active_suffix: &str,
    ) -> Recommendation {
        let Some(catalog) = self.catalog else {
            self.logger
                .debug("MAINLINE", "No mainline catalog attached; skipping");
            return Recommendation::None;
        };
        let Some(branch) = self.mainline_branch(active, active_key) else {
            return Recommendation::None;
        };

        let outcome = self
            .pick_target(catalog, branch, active, active_key)
            .and_then(|target| match target {
                Some(target) => self.build_upgrade(catalog, &target, active, active_suffix),
                None => Ok(None),
            });
        match outcome {
            Ok(Some(upgrade)) => {
                self.logger.info(
                    "MAINLINE",
                    format!(
                        "Recommending unsupported mainline kernel {} ({} files, {} bytes)",
                        upgrade.version,
                        upgrade.files.len(),
                        upgrade.download_size
                    ),
                );
                Recommendation::Mainline(upgrade)
            }
            Ok(None) => Recommendation::None,
            Err(err) => {
                let level = if err.is_catalog_gap() {
                    LogLevel::Warn
                } else {
                    LogLevel::Error
                };
                self.logger.log(
                    level,
                    "MAINLINE",
                    format!("Mainline kernels skipped: {err}"),
                );
                Recommendation::None
            }
        }
    }

    /// Mainline build `active` would move to, before its file list is known.
    ///
    /// Only the mainline stage is evaluated; callers use it to fill a missing
    /// file list and then run [`KernelSelector::recommend`] again. Catalog
    /// errors read as no target.
    pub fn mainline_target(&self, active: &ActiveKernel) -> Option<MainlineTarget> {
        if !self.config.use_mainline {
            return None;
        }
        let catalog = self.catalog?;
        let active_key = VersionKey::parse(&active.release);
        let branch = self.mainline_branch(active, &active_key)?;
        self.pick_target(catalog, branch, active, &active_key)
            .ok()
            .flatten()
    }

    /// Branch of the running kernel when it is a locally installed mainline build.
    fn mainline_branch(
        &self,
        active: &ActiveKernel,
        active_key: &VersionKey,
    ) -> Option<&'static MainlineBranch> {
        // A signed image of the running version means it is a distro kernel.
        if self.is_installed(&format!("linux-image-{}", active.release)) {
            return None;
        }
        match self.packages.get(&format!("linux-image-unsigned-{}", active.release)) {
            Some(record) if record.is_installed() && !record.downloadable => {}
            _ => {
                self.logger.debug(
                    "MAINLINE",
                    format!("{} is not a locally installed mainline build", active.release),
                );
                return None;
            }
        }
        let branch_id = active_key.build_number().unwrap_or(0);
        let branch = MainlineBranch::by_id(branch_id);
        if branch.is_none() {
            self.logger.warn(
                "MAINLINE",
                format!("Unhandled kernel type installed (build {branch_id})"),
            );
        }
        branch
    }

    fn pick_target(
        &self,
        catalog: &dyn MainlineCatalog,
        branch: &'static MainlineBranch,
        active: &ActiveKernel,
        active_key: &VersionKey,
    ) -> Result<Option<MainlineTarget>> {
        if branch.is_daily {
            let version = catalog.daily_build(branch)?;
            let latest = daily_build_date(&version)?;
            if active.build_date.as_deref() == Some(latest.as_str()) {
                self.logger.info(
                    "MAINLINE",
                    format!("Already running the latest {} ({latest})", branch.title),
                );
                return Ok(None);
            }
            return Ok(Some(MainlineTarget { branch, version }));
        }

        let support = catalog.support_status()?;
        let active_series = active.series_label();
        let is_eol = is_end_of_life(&support, &active_series);
        let is_rc = !is_eol && active_key.is_release_candidate();
        let cross_series = is_eol && self.config.upgrade_eol_series;
        let filter = MainlineFilter {
            exclude_eol: !cross_series,
            exclude_longterm: false,
            allow_rc: self.config.include_rc || is_rc,
        };
        let available = catalog.available_versions(branch)?;
        let mut versions = filter_versions(&available, Some(&support), &filter);
        if !self.config.include_longterm {
            // Long-term series are only skipped when moving away from the active one.
            versions.retain(|version| match catalog_series(version) {
                Some((series, _)) => {
                    series == active_series
                        || support.get(&series) != Some(&SeriesStatus::Longterm)
                }
                None => false,
            });
        }
        if versions.is_empty() {
            return Err(KernupError::Network(
                "Could not retrieve available mainline kernel versions".into(),
            ));
        }

        let mut target: Option<(VersionKey, &str)> = None;
        for version in &versions {
            let key = VersionKey::parse(version);
            let current = target.as_ref().map_or(active_key, |(key, _)| key);
            if (cross_series || key.shortseries() == active_key.shortseries()) && key > *current {
                target = Some((key, version.as_str()));
            }
        }
        match target {
            Some((_, version)) => Ok(Some(MainlineTarget {
                branch,
                version: version.to_string(),
            })),
            None => {
                self.logger.info(
                    "MAINLINE",
                    format!("No newer mainline build for {}", active.release),
                );
                Ok(None)
            }
        }
    }

    fn build_upgrade(
        &self,
        catalog: &dyn MainlineCatalog,
        target: &MainlineTarget,
        active: &ActiveKernel,
        active_suffix: &str,
    ) -> Result<Option<MainlineUpgrade>> {
        let branch = target.branch;
        let files = catalog.file_list(branch, &target.version)?;
        let Some(package_version) = build_package_version(&files) else {
            return Err(KernupError::Parse(format!(
                "Mainline kernel {} lists no kernel packages",
                target.version
            )));
        };
        if self.config.blacklist.matches(MAINLINE_SOURCE, &package_version) {
            self.logger.info(
                "MAINLINE",
                format!("Mainline kernel {package_version} is blacklisted"),
            );
            return Ok(None);
        }

        let unsigned = format!("linux-image-unsigned-{package_version}{active_suffix}");
        if branch.is_daily {
            let Some(installed) = self
                .packages
                .get(&unsigned)
                .and_then(|record| record.installed_version.as_deref())
            else {
                self.logger
                    .info("MAINLINE", format!("{unsigned} is not installed"));
                return Ok(None);
            };
            let latest = daily_build_date(&target.version)?;
            let marker = format!(".0-{}.", branch.id);
            let installed_date = installed
                .split_once(&marker)
                .and_then(|(_, stamp)| stamp.get(..8));
            if installed_date == Some(latest.as_str()) {
                self.logger.info(
                    "MAINLINE",
                    format!("{} {latest} is installed but not active", branch.title),
                );
                return Ok(None);
            }
        } else if self.is_installed(&unsigned) {
            self.logger.info(
                "MAINLINE",
                format!("Mainline kernel {package_version} is installed but not active"),
            );
            return Ok(None);
        }
        Ok(Some(self.upgrade(branch, active, &target.version, package_version, files)))
    }

    fn upgrade(
        &self,
        branch: &MainlineBranch,
        active: &ActiveKernel,
        catalog_version: &str,
        package_version: String,
        files: Vec<BuildFile>,
    ) -> MainlineUpgrade {
        MainlineUpgrade {
            version: package_version,
            catalog_version: catalog_version.to_string(),
            branch: branch.name.to_string(),
            title: branch.display_title(),
            download_size: total_size(&files),
            files,
            base_url: branch.versioned_url(&self.config.mainline_root, catalog_version),
            old_version: active.release.clone(),
            unsupported: true,
            warning: MAINLINE_WARNING.to_string(),
        }
    }

    fn is_installed(&self, name: &str) -> bool {
        self.packages
            .get(name)
            .is_some_and(PackageRecord::is_installed)
    }

    fn is_blacklisted(&self, record: &PackageRecord) -> bool {
        let version = record.effective_version().unwrap_or_default();
        let blacklisted = self.config.blacklist.matches(record.source(), version);
        if blacklisted {
            self.logger.info(
                "BLACKLIST",
                format!("{} {version} is blacklisted", record.source()),
            );
        }
        blacklisted
    }
}

/// `YYYYMMDD` build date of a daily folder. Folders are dated the day after
/// the source snapshot the kernel banner carries.
fn daily_build_date(folder: &str) -> Result<String> {
    Ok((parse_date(folder)? - Duration::days(1))
        .format("%Y%m%d")
        .to_string())
}
