/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::version
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Parse heterogeneous kernel version strings into a single
    canonical, totally ordered key.

  Security / Safety Notes:
    Pure computation; never panics on malformed input.

  Dependencies:
    None beyond std.

  Operational Scope:
    Every version comparison in the selector, the catalog
    filter, the inventory and the support classifier.

  Revision History:
    2026-03-04 COD  Introduced VersionKey.
    2026-05-21 COD  Zero-padded release candidate numbers.
    2026-06-04 COD  Documented the minimum field width.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic, side-effect free parsing
    - Documented canonical forms
============================================================*/

//! Canonical kernel version keys.
//!
//! Kernel versions arrive in several naming schemes that do not compare
//! natively. [`VersionKey::parse`] maps all of them onto fixed-width text
//! components so that plain lexicographic comparison equals semantic
//! comparison:
//!
//! | Source                     | Raw input                     | Key (`dotted`)                     |
//! |----------------------------|-------------------------------|------------------------------------|
//! | running distro kernel      | `5.15.0-60-generic`           | `005.015.000.060`                  |
//! | cloud flavor kernel        | `5.15.0-1040-azure`           | `005.015.000.1040`                 |
//! | distro package version     | `5.15.0-60.66`                | `005.015.000.060.066`              |
//! | meta-package version       | `5.15.0.91.88`                | `005.015.000.091.088`              |
//! | mainline folder            | `6.5`                         | `006.005.000.060500z`              |
//! | mainline folder, rc        | `6.5-rc3`                     | `006.005.000.060500rc03`           |
//! | running mainline build     | `6.2.0-060200-generic`        | `006.002.000.060200z`              |
//! | running mainline rc build  | `6.5.0-060500rc3-generic`     | `006.005.000.060500rc03`           |
//! | mainline package version   | `6.5.0-060500.202308271831`   | `006.005.000.060500z.202308271831` |
//! | daily folder               | `2023-11-01`                  | `2023.011.001.20231101z`           |
//! | bare series                | `5.15`                        | `005.015.000.051500z`              |
//!
//! The build component carries `z` for final releases and `rcNN` for
//! release candidates, so a candidate sorts after the previous final release
//! and before its own final release.
//!
//! [`FIELD_WIDTH`] is a lower bound: longer components keep their digits and
//! still compare as text, so `1000` sorts below `999`. Cloud and OEM flavors
//! carry four digit ABI numbers throughout and never cross that boundary
//! within one flavor.

use std::cmp::Ordering;
use std::fmt;

/// Minimum width of a numeric component; wider components are kept as is.
pub const FIELD_WIDTH: usize = 3;

/// Marker of a final (non release candidate) build; sorts after every `rcNN`.
const FINAL_MARKER: &str = "z";

const ZERO_FIELD: &str = "000";

/// Series of a kernel whose flavor does not match the configured one.
pub const NULL_SERIES: [&str; 3] = [ZERO_FIELD, ZERO_FIELD, ZERO_FIELD];

/// Canonical comparable representation of a kernel version.
///
/// Equality, ordering and hashing consider the canonical components only,
/// never the raw text.
#[derive(Debug, Clone)]
pub struct VersionKey {
    raw: String,
    major: String,
    minor: String,
    patch: String,
    build: String,
    trailing: Vec<String>,
}

impl VersionKey {
    /// Parse a raw version string. Unparseable input yields a best-effort key.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.replace('-', ".");
        let tokens: Vec<&str> = normalized.split('.').collect();

        let marker = tokens.iter().find_map(|token| RcMarker::find(token));
        let (strip, suffix) = match &marker {
            Some(marker) => (marker.text.clone(), marker.suffix()),
            None => (FINAL_MARKER.to_string(), FINAL_MARKER.to_string()),
        };

        let mut parts: Vec<String> = tokens
            .iter()
            .map(|token| token.replace(strip.as_str(), ""))
            .filter(|element| element.starts_with(|c: char| c.is_ascii_digit()))
            .map(|element| pad(&element))
            .collect();

        while parts.len() < 3 {
            parts.push(ZERO_FIELD.to_string());
        }
        if parts.len() == 3 {
            let tag: String = parts.iter().map(|part| compact(part)).collect();
            parts.push(format!("{tag}{suffix}"));
        } else if parts[3].chars().count() == 6 {
            parts[3].push_str(&suffix);
        }

        let mut parts = parts.into_iter();
        let mut next = || parts.next().unwrap_or_default();
        let (major, minor, patch, build) = (next(), next(), next(), next());
        Self {
            raw: raw.to_string(),
            major,
            minor,
            patch,
            build,
            trailing: parts.collect(),
        }
    }

    /// Rebuild a key from its dotted form as emitted in kernel records.
    pub fn from_dotted(raw: &str, dotted: &str) -> Option<Self> {
        let mut parts = dotted.split('.').map(str::to_string);
        let major = parts.next()?;
        let minor = parts.next()?;
        let patch = parts.next()?;
        let build = parts.next()?;
        Some(Self {
            raw: raw.to_string(),
            major,
            minor,
            patch,
            build,
            trailing: parts.collect(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> &str {
        &self.major
    }

    pub fn minor(&self) -> &str {
        &self.minor
    }

    pub fn patch(&self) -> &str {
        &self.patch
    }

    /// Fourth component: ABI/build number, mainline build tag or daily date.
    pub fn build(&self) -> &str {
        &self.build
    }

    /// Components after the build, e.g. upload numbers or build stamps.
    pub fn trailing(&self) -> &[String] {
        &self.trailing
    }

    /// `(major, minor, patch)`; two kernels are in the same series iff equal.
    pub fn series(&self) -> [&str; 3] {
        [&self.major, &self.minor, &self.patch]
    }

    /// `(major, minor)`.
    pub fn shortseries(&self) -> [&str; 2] {
        [&self.major, &self.minor]
    }

    /// True when the build component carries a release candidate marker.
    pub fn is_release_candidate(&self) -> bool {
        self.build.contains("rc")
    }

    /// Numeric value of a purely numeric build component (`999` for daily
    /// builds, the ABI number for distro kernels).
    pub fn build_number(&self) -> Option<u32> {
        if self.build.is_empty() || !self.build.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        self.build.parse().ok()
    }

    /// The 12 character build stamp carried by installed mainline packages.
    pub fn build_stamp(&self) -> Option<&str> {
        match self.trailing.as_slice() {
            [stamp] if stamp.chars().count() == 12 => Some(stamp.as_str()),
            _ => None,
        }
    }

    /// Components joined with dots, the form used on the kernel record wire.
    pub fn dotted(&self) -> String {
        let mut out = format!("{}.{}.{}.{}", self.major, self.minor, self.patch, self.build);
        for part in &self.trailing {
            out.push('.');
            out.push_str(part);
        }
        out
    }

    /// Human form of a mainline version, e.g. `6.5.0-060500rc03`.
    pub fn display_version(&self) -> String {
        format!(
            "{}.{}.{}-{}",
            numeric(&self.major),
            numeric(&self.minor),
            numeric(&self.patch),
            self.build.trim_matches('z')
        )
    }

    fn ordering_fields(&self) -> (&str, &str, &str, &str, &[String]) {
        (&self.major, &self.minor, &self.patch, &self.build, &self.trailing)
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.ordering_fields() == other.ordering_fields()
    }
}

impl Eq for VersionKey {}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_fields().cmp(&other.ordering_fields())
    }
}

impl std::hash::Hash for VersionKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ordering_fields().hash(state);
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for VersionKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Release candidate marker found in a token, e.g. `rc3` in `060500rc3`.
struct RcMarker {
    text: String,
    number: String,
}

impl RcMarker {
    fn find(token: &str) -> Option<Self> {
        let (_, rest) = token.split_once("rc")?;
        let number: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        Some(Self {
            text: format!("rc{number}"),
            number,
        })
    }

    /// Suffix with the candidate number padded so `rc10` sorts above `rc9`.
    fn suffix(&self) -> String {
        if self.number.is_empty() {
            "rc".to_string()
        } else {
            format!("rc{:0>2}", self.number)
        }
    }
}

fn pad(element: &str) -> String {
    format!("{:0>width$}", element, width = FIELD_WIDTH)
}

/// `005` -> `05`, `015` -> `15`, `100` -> `100`: the mainline build tag form.
fn compact(part: &str) -> String {
    let mut chars = part.chars();
    let head: String = chars.next().into_iter().filter(|c| *c != '0').collect();
    format!("{head}{}", chars.as_str())
}

fn numeric(part: &str) -> u64 {
    part.parse().unwrap_or(0)
}
