/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::mainline
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Mainline build vocabulary: build branches, folder name
    formatting, kernel.org series status, build file names
    and the catalog filtering policy.

  Security / Safety Notes:
    Pure computation over catalog data fetched elsewhere.

  Dependencies:
    serde for cache and report serialization.

  Operational Scope:
    Used by the selector, the catalog cache, the HTTP client
    and the inventory listing.

  Revision History:
    2026-03-11 COD  Authored mainline catalog policy.
    2026-04-11 COD  Treat series flagged eol like absent ones.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic filtering over newest-first catalogs
    - Explicit policy flags instead of global settings
============================================================*/

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::Flavor;

/// Support state of a kernel series as published on kernel.org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeriesStatus {
    Mainline,
    Stable,
    Longterm,
    Eol,
    Other(String),
}

impl From<String> for SeriesStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "mainline" => SeriesStatus::Mainline,
            "stable" => SeriesStatus::Stable,
            "longterm" => SeriesStatus::Longterm,
            "eol" => SeriesStatus::Eol,
            _ => SeriesStatus::Other(value),
        }
    }
}

impl From<SeriesStatus> for String {
    fn from(value: SeriesStatus) -> Self {
        match value {
            SeriesStatus::Mainline => "mainline".into(),
            SeriesStatus::Stable => "stable".into(),
            SeriesStatus::Longterm => "longterm".into(),
            SeriesStatus::Eol => "eol".into(),
            SeriesStatus::Other(other) => other,
        }
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesStatus::Mainline => f.write_str("Mainline"),
            SeriesStatus::Stable => f.write_str("Stable"),
            SeriesStatus::Longterm => f.write_str("Longterm"),
            SeriesStatus::Eol => f.write_str("End of Life"),
            SeriesStatus::Other(other) => {
                let mut chars = other.chars();
                match chars.next() {
                    Some(first) => write!(f, "{}{}", first.to_uppercase(), chars.as_str()),
                    None => Ok(()),
                }
            }
        }
    }
}

/// kernel.org status keyed by `major.minor`, e.g. `"6.6" -> longterm`.
pub type SupportMap = BTreeMap<String, SeriesStatus>;

/// True when the series is absent from the map or flagged end of life.
pub fn is_end_of_life(support: &SupportMap, series: &str) -> bool {
    !matches!(support.get(series), Some(status) if *status != SeriesStatus::Eol)
}

/// A folder of mainline builds on the kernel PPA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainlineBranch {
    /// Build number carried by running kernels of this branch; 0 for versioned builds.
    pub id: u32,
    pub name: &'static str,
    pub title: &'static str,
    pub is_daily: bool,
}

pub const VERSIONED_BUILDS: MainlineBranch = MainlineBranch {
    id: 0,
    name: "ppa",
    title: "",
    is_daily: false,
};

pub static BRANCHES: [MainlineBranch; 5] = [
    VERSIONED_BUILDS,
    MainlineBranch {
        id: 999,
        name: "daily",
        title: "daily build",
        is_daily: true,
    },
    MainlineBranch {
        id: 994,
        name: "drm-tip",
        title: "drm-tip build",
        is_daily: true,
    },
    MainlineBranch {
        id: 996,
        name: "drm-next",
        title: "drm-next build",
        is_daily: true,
    },
    MainlineBranch {
        id: 997,
        name: "drm-intel-next",
        title: "drm-intel-next build",
        is_daily: true,
    },
];

impl MainlineBranch {
    pub fn by_id(id: u32) -> Option<&'static MainlineBranch> {
        BRANCHES.iter().find(|branch| branch.id == id)
    }

    /// Index URL of this branch below the PPA root.
    pub fn base_url(&self, root: &str) -> String {
        let root = root.trim_end_matches('/');
        if self.is_daily {
            format!("{root}/{}/", self.name)
        } else {
            format!("{root}/")
        }
    }

    /// Folder URL holding the build files of `version`.
    pub fn versioned_url(&self, root: &str, version: &str) -> String {
        let folder = format_version(version, self.is_daily);
        if self.is_daily {
            format!("{}{folder}/", self.base_url(root))
        } else {
            format!("{}v{folder}/", self.base_url(root))
        }
    }

    pub fn changelog_url(&self, root: &str, version: &str) -> String {
        format!("{}CHANGES", self.versioned_url(root, version))
    }

    pub fn checksums_url(&self, root: &str, version: &str) -> String {
        format!("{}CHECKSUMS", self.versioned_url(root, version))
    }

    /// Cache file name of this branch's index.
    pub fn cache_name(&self) -> String {
        format!("mainline-{}", self.name)
    }

    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            "Ubuntu mainline kernel".to_string()
        } else {
            format!("Ubuntu mainline kernel - {}", self.title)
        }
    }
}

/// Folder name of a mainline version on the PPA.
///
/// `5.5.0-050500rc2-generic`, `5.5-rc2`, `5.5.0-rc2` and `050500rc2` all map
/// to `5.5-rc2`; `5.5.0-050500-generic`, `5.5`, `5.5.0`, `050500` and
/// `050500z` map to `5.5`. Daily versions are returned untouched.
pub fn format_version(version: &str, is_daily: bool) -> String {
    if is_daily {
        return version.to_string();
    }
    let mut version = version;
    if version.matches('-').count() > 1 {
        version = version.split('-').nth(1).unwrap_or(version);
    }
    let (base, suffix) = match version.split_once('-') {
        Some((base, suffix)) => (base, suffix),
        None => match version.find("rc") {
            Some(pos) if pos > 0 => (&version[..pos], &version[pos..]),
            _ => (version, ""),
        },
    };

    let mut base = if base.contains('.') {
        base.to_string()
    } else {
        match compact_tag_to_dotted(base) {
            Some(dotted) => dotted,
            None => return version.to_string(),
        }
    };
    if base.ends_with(".0") {
        base.truncate(base.len() - 2);
    }
    if suffix.is_empty() {
        base
    } else {
        format!("{base}-{suffix}")
    }
}

/// `050500` -> `5.5.0`.
fn compact_tag_to_dotted(tag: &str) -> Option<String> {
    let field = |range: std::ops::Range<usize>| tag.get(range)?.parse::<u32>().ok();
    Some(format!("{}.{}.{}", field(0..2)?, field(2..4)?, field(4..6)?))
}

/// `major.minor` of a catalog version plus whether it is a release candidate.
///
/// Only a `-rcN` directly after `major.minor` (`6.5-rc3`) counts as a
/// candidate marker, matching the PPA folder naming.
pub fn catalog_series(version: &str) -> Option<(String, bool)> {
    let (major, rest) = split_digits(version)?;
    let rest = rest.strip_prefix('.')?;
    let (minor, rest) = split_digits(rest)?;
    let is_rc = rest
        .strip_prefix("-rc")
        .is_some_and(|tail| tail.starts_with(|c: char| c.is_ascii_digit()));
    Some((format!("{major}.{minor}"), is_rc))
}

fn split_digits(text: &str) -> Option<(&str, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if end == 0 {
        return None;
    }
    Some(text.split_at(end))
}

/// Catalog filtering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainlineFilter {
    /// Drop series that are absent from the support map or flagged eol.
    pub exclude_eol: bool,
    /// Drop series flagged longterm.
    pub exclude_longterm: bool,
    /// Keep release candidates of series without a final release.
    pub allow_rc: bool,
}

impl MainlineFilter {
    /// Policy for listing available mainline kernels to the user.
    pub fn listing(include_rc: bool, include_longterm: bool) -> Self {
        Self {
            exclude_eol: true,
            exclude_longterm: !include_longterm,
            allow_rc: include_rc,
        }
    }
}

/// Filter a newest-first list of catalog versions.
///
/// A series becomes known once a final release of it is seen; release
/// candidates of known series are always dropped. Without a support map every
/// version fails the end of life check.
pub fn filter_versions(
    versions: &[String],
    support: Option<&SupportMap>,
    filter: &MainlineFilter,
) -> Vec<String> {
    let empty = SupportMap::new();
    let support = support.unwrap_or(&empty);
    let mut known_series: HashSet<String> = HashSet::new();
    let mut kept = Vec::new();

    for version in versions {
        let Some((series, is_rc)) = catalog_series(version) else {
            continue;
        };
        if !is_rc {
            known_series.insert(series.clone());
        }
        if filter.exclude_eol && is_end_of_life(support, &series) {
            continue;
        }
        if filter.exclude_longterm && support.get(&series) == Some(&SeriesStatus::Longterm) {
            continue;
        }
        if is_rc && (known_series.contains(&series) || !filter.allow_rc) {
            continue;
        }
        kept.push(version.clone());
    }
    kept
}

/// One downloadable artifact of a mainline build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

pub fn total_size(files: &[BuildFile]) -> u64 {
    files.iter().map(|file| file.size).sum()
}

/// Parts of a mainline `.deb` name such as
/// `linux-image-unsigned-6.3.0-060300-generic_6.3.0-060300.202304232030_amd64.deb`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebName<'a> {
    pub family: &'a str,
    pub kind: &'a str,
    pub kernel_version: &'a str,
    pub flavor: Option<&'a str>,
    pub package_version: &'a str,
    pub arch: &'a str,
}

impl<'a> DebName<'a> {
    /// Parse a file name; a leading folder such as `amd64/` is ignored.
    pub fn parse(filename: &'a str) -> Option<Self> {
        let filename = filename.rsplit('/').next()?;
        let stem = filename.strip_suffix(".deb")?;
        let mut fields = stem.split('_');
        let (name, package_version, arch) = (fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() || package_version.is_empty() || arch.is_empty() {
            return None;
        }

        let (family, after_family) = name.split_once('-')?;
        if family.is_empty() {
            return None;
        }
        // The kind is the shortest prefix followed by a kernel version.
        for (dash, _) in after_family.match_indices('-') {
            let kind = &after_family[..dash];
            let tail = &after_family[dash + 1..];
            let Some(len) = kernel_version_len(tail) else {
                continue;
            };
            if kind.is_empty() {
                continue;
            }
            let flavor = &tail[len..];
            if flavor == "-" || (!flavor.is_empty() && !flavor.starts_with('-')) {
                continue;
            }
            return Some(Self {
                family,
                kind,
                kernel_version: &tail[..len],
                flavor: (!flavor.is_empty()).then_some(flavor),
                package_version,
                arch,
            });
        }
        None
    }

    /// Whether this file belongs to a `flavor` kernel install on `arch`.
    pub fn matches(&self, flavor: Flavor, arch: &str) -> bool {
        self.family == "linux"
            && self.flavor.map_or(true, |tag| tag == flavor.suffix())
            && (self.arch == "all" || self.arch == arch)
    }
}

/// Length of a leading `M.m.p-NNNNNN[rcN]` kernel version.
fn kernel_version_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let digits = |pos: &mut usize, max: Option<usize>| {
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() && max.map_or(true, |m| *pos - start < m) {
            *pos += 1;
        }
        *pos > start
    };
    let literal = |pos: &mut usize, byte: u8| {
        if bytes.get(*pos) == Some(&byte) {
            *pos += 1;
            true
        } else {
            false
        }
    };

    if !(digits(&mut pos, Some(1))
        && literal(&mut pos, b'.')
        && digits(&mut pos, None)
        && literal(&mut pos, b'.')
        && digits(&mut pos, None)
        && literal(&mut pos, b'-')
        && digits(&mut pos, None))
    {
        return None;
    }
    if text[pos..].starts_with("rc") {
        let mut probe = pos + 2;
        if digits(&mut probe, None) {
            pos = probe;
        }
    }
    Some(pos)
}

/// Version the installed packages of a build will carry, e.g. `6.3.0-060300`.
pub fn build_package_version(files: &[BuildFile]) -> Option<String> {
    files
        .iter()
        .find_map(|file| DebName::parse(&file.filename))
        .map(|deb| deb.kernel_version.to_string())
}

/// Debian architecture name of the running machine.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64el",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(versions: &[&str]) -> Vec<String> {
        versions.iter().map(|v| v.to_string()).collect()
    }

    fn support(entries: &[(&str, SeriesStatus)]) -> SupportMap {
        entries
            .iter()
            .map(|(series, status)| (series.to_string(), status.clone()))
            .collect()
    }

    #[test]
    fn folder_names_collapse_every_input_form() {
        for input in ["5.5.0-050500rc2-generic", "5.5-rc2", "5.5.0-rc2", "050500rc2"] {
            assert_eq!(format_version(input, false), "5.5-rc2", "{input}");
        }
        for input in ["5.5.0-050500-generic", "5.5", "5.5.0", "050500", "050500z"] {
            assert_eq!(format_version(input, false), "5.5", "{input}");
        }
        assert_eq!(format_version("6.1.12", false), "6.1.12");
        assert_eq!(format_version("2023-11-01", true), "2023-11-01");
    }

    #[test]
    fn branch_urls() {
        let root = "https://kernel.ubuntu.com/mainline/";
        assert_eq!(
            VERSIONED_BUILDS.versioned_url(root, "6.5.0-060500-generic"),
            "https://kernel.ubuntu.com/mainline/v6.5/"
        );
        let daily = MainlineBranch::by_id(999).unwrap();
        assert_eq!(
            daily.checksums_url(root, "2023-11-01"),
            "https://kernel.ubuntu.com/mainline/daily/2023-11-01/CHECKSUMS"
        );
        assert_eq!(daily.cache_name(), "mainline-daily");
        assert!(MainlineBranch::by_id(60).is_none());
    }

    #[test]
    fn catalog_series_detects_candidates() {
        assert_eq!(catalog_series("6.5-rc3"), Some(("6.5".into(), true)));
        assert_eq!(catalog_series("6.5.2"), Some(("6.5".into(), false)));
        assert_eq!(catalog_series("6.10"), Some(("6.10".into(), false)));
        assert_eq!(catalog_series("2023-11-01"), None);
        assert_eq!(catalog_series("rc1"), None);
    }

    #[test]
    fn candidates_are_dropped_once_the_final_release_exists() {
        let versions = catalog(&["6.6-rc2", "6.5", "6.5-rc7", "6.5-rc3", "6.4.16"]);
        let map = support(&[
            ("6.6", SeriesStatus::Mainline),
            ("6.5", SeriesStatus::Stable),
            ("6.4", SeriesStatus::Stable),
        ]);
        let filter = MainlineFilter {
            exclude_eol: true,
            exclude_longterm: true,
            allow_rc: true,
        };
        assert_eq!(
            filter_versions(&versions, Some(&map), &filter),
            catalog(&["6.6-rc2", "6.5", "6.4.16"])
        );

        let no_rc = MainlineFilter { allow_rc: false, ..filter };
        assert_eq!(
            filter_versions(&versions, Some(&map), &no_rc),
            catalog(&["6.5", "6.4.16"])
        );
    }

    #[test]
    fn eol_and_longterm_series_follow_the_flags() {
        let versions = catalog(&["6.7.1", "6.6.10", "6.2.16", "5.19.17"]);
        let map = support(&[
            ("6.7", SeriesStatus::Stable),
            ("6.6", SeriesStatus::Longterm),
            ("6.2", SeriesStatus::Eol),
        ]);

        let listing = MainlineFilter::listing(false, false);
        assert_eq!(filter_versions(&versions, Some(&map), &listing), catalog(&["6.7.1"]));

        let with_longterm = MainlineFilter::listing(false, true);
        assert_eq!(
            filter_versions(&versions, Some(&map), &with_longterm),
            catalog(&["6.7.1", "6.6.10"])
        );

        let everything = MainlineFilter {
            exclude_eol: false,
            exclude_longterm: false,
            allow_rc: false,
        };
        assert_eq!(filter_versions(&versions, Some(&map), &everything), versions);
    }

    #[test]
    fn missing_support_map_excludes_everything_under_the_eol_filter() {
        let versions = catalog(&["6.7.1", "6.6.10"]);
        assert!(filter_versions(&versions, None, &MainlineFilter::listing(true, true)).is_empty());
    }

    #[test]
    fn series_status_round_trips_unknown_tags() {
        let status: SeriesStatus = serde_json::from_str("\"prepatch\"").unwrap();
        assert_eq!(status, SeriesStatus::Other("prepatch".into()));
        assert_eq!(status.to_string(), "Prepatch");
        assert_eq!(serde_json::to_string(&SeriesStatus::Longterm).unwrap(), "\"longterm\"");
    }

    #[test]
    fn deb_names_parse_and_match() {
        let image = DebName::parse(
            "linux-image-unsigned-6.3.0-060300-generic_6.3.0-060300.202304232030_amd64.deb",
        )
        .unwrap();
        assert_eq!(image.family, "linux");
        assert_eq!(image.kind, "image-unsigned");
        assert_eq!(image.kernel_version, "6.3.0-060300");
        assert_eq!(image.flavor, Some("-generic"));
        assert_eq!(image.arch, "amd64");
        assert!(image.matches(Flavor::Generic, "amd64"));
        assert!(!image.matches(Flavor::Lowlatency, "amd64"));
        assert!(!image.matches(Flavor::Generic, "arm64"));

        let headers =
            DebName::parse("linux-headers-6.5.0-060500rc3_6.5.0-060500rc3.202307232034_all.deb")
                .unwrap();
        assert_eq!(headers.kernel_version, "6.5.0-060500rc3");
        assert_eq!(headers.flavor, None);
        assert!(headers.matches(Flavor::Lowlatency, "arm64"));

        let nested = DebName::parse(
            "amd64/linux-modules-6.3.0-060300-generic_6.3.0-060300.202304232030_amd64.deb",
        )
        .unwrap();
        assert_eq!(nested.kind, "modules");

        assert!(DebName::parse("CHECKSUMS").is_none());
        assert!(DebName::parse("linux-6.3.0_x_amd64.deb").is_none());
    }

    #[test]
    fn package_version_comes_from_the_first_build_file() {
        let files = vec![
            BuildFile {
                filename: "linux-headers-6.3.0-060300_6.3.0-060300.202304232030_all.deb".into(),
                size: 12,
            },
            BuildFile {
                filename: "linux-image-unsigned-6.3.0-060300-generic_6.3.0-060300.202304232030_amd64.deb"
                    .into(),
                size: 30,
            },
        ];
        assert_eq!(build_package_version(&files).as_deref(), Some("6.3.0-060300"));
        assert_eq!(total_size(&files), 42);
    }
}
