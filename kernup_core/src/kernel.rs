/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::kernel
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared kernel data contracts: flavors, origins, install
    state, support classification and the classified
    kernel candidate.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Dependencies:
    serde for report serialization.

  Operational Scope:
    Used by the record protocol, the inventory, the support
    classifier and the selector.

  Revision History:
    2026-03-04 COD  Introduced kernel data contracts.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Serializable structures for report output
============================================================*/

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{KernupError, Result};
use crate::mainline::SeriesStatus;
use crate::version::VersionKey;

/// Kernel variant tag, written with its leading dash on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Generic,
    Lowlatency,
    Aws,
    Azure,
    Gcp,
    Kvm,
    Oem,
    Oracle,
    Liquorix,
    Mfutex,
}

impl Flavor {
    pub const ALL: [Flavor; 10] = [
        Flavor::Generic,
        Flavor::Lowlatency,
        Flavor::Aws,
        Flavor::Azure,
        Flavor::Gcp,
        Flavor::Kvm,
        Flavor::Oem,
        Flavor::Oracle,
        Flavor::Liquorix,
        Flavor::Mfutex,
    ];

    /// Package name suffix, e.g. `-generic`.
    pub fn suffix(self) -> &'static str {
        match self {
            Flavor::Generic => "-generic",
            Flavor::Lowlatency => "-lowlatency",
            Flavor::Aws => "-aws",
            Flavor::Azure => "-azure",
            Flavor::Gcp => "-gcp",
            Flavor::Kvm => "-kvm",
            Flavor::Oem => "-oem",
            Flavor::Oracle => "-oracle",
            Flavor::Liquorix => "-liquorix",
            Flavor::Mfutex => "-mfutex",
        }
    }

    /// Flavors supported on this machine; Liquorix only ships for x86_64.
    pub fn supported() -> impl Iterator<Item = Flavor> {
        Self::ALL
            .into_iter()
            .filter(|flavor| *flavor != Flavor::Liquorix || std::env::consts::ARCH == "x86_64")
    }

    /// Mainline builds are only published for these flavors.
    pub fn has_mainline_builds(self) -> bool {
        matches!(self, Flavor::Generic | Flavor::Lowlatency)
    }

    /// Flavor of a running kernel release such as `5.15.0-60-generic`.
    pub fn of_release(release: &str) -> Option<Flavor> {
        let (_, tag) = release.rsplit_once('-')?;
        tag.parse().ok()
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Flavor {
    type Err = KernupError;

    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim();
        let wanted = wanted.strip_prefix('-').unwrap_or(wanted);
        Self::ALL
            .into_iter()
            .find(|flavor| &flavor.suffix()[1..] == wanted)
            .ok_or_else(|| KernupError::Parse(format!("Unknown kernel flavor `{value}`")))
    }
}

/// Where a kernel package comes from. Codes are stable on the record wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Primary,
    Secondary,
    Mainline,
    Other,
}

/// APT origin label of the primary distribution archive.
pub const PRIMARY_ORIGIN: &str = "Ubuntu";
/// APT origin label of the secondary distribution archive.
pub const SECONDARY_ORIGIN: &str = "Debian";

impl Origin {
    /// Classify an APT origin label; an empty label means a local package.
    pub fn from_apt(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            None | Some("") => Origin::Local,
            Some(PRIMARY_ORIGIN) => Origin::Primary,
            Some(SECONDARY_ORIGIN) => Origin::Secondary,
            Some(_) => Origin::Other,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Origin::Local => 0,
            Origin::Primary => 1,
            Origin::Secondary => 2,
            Origin::Mainline => 3,
            Origin::Other => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Origin::Local),
            1 => Some(Origin::Primary),
            2 => Some(Origin::Secondary),
            3 => Some(Origin::Mainline),
            4 => Some(Origin::Other),
            _ => None,
        }
    }
}

/// Install state as carried on the record wire (0, 1, 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    NotInstalled,
    Manual,
    Auto,
}

impl InstallState {
    pub fn code(self) -> u8 {
        match self {
            InstallState::NotInstalled => 0,
            InstallState::Manual => 1,
            InstallState::Auto => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(InstallState::NotInstalled),
            1 => Some(InstallState::Manual),
            2 => Some(InstallState::Auto),
            _ => None,
        }
    }

    pub fn is_installed(self) -> bool {
        self != InstallState::NotInstalled
    }
}

/// Support classification shown next to each kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SupportStatus {
    SupportedUntil { year: i32, month: u32 },
    Superseded,
    EndOfLife,
    Unknown,
    Unsupported,
    Daily,
    Upstream { series_status: SeriesStatus },
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportStatus::SupportedUntil { year, month } => {
                write!(f, "Supported until {year}-{month:02}")
            }
            SupportStatus::Superseded => f.write_str("Superseded"),
            SupportStatus::EndOfLife => f.write_str("End of Life"),
            SupportStatus::Unknown => f.write_str("Status Unknown"),
            SupportStatus::Unsupported => f.write_str("Unsupported"),
            SupportStatus::Daily => f.write_str("Daily build"),
            SupportStatus::Upstream { series_status } => write!(f, "{series_status}"),
        }
    }
}

/// One installed or installable kernel after support classification.
#[derive(Debug, Clone, Serialize)]
pub struct KernelCandidate {
    #[serde(skip)]
    pub key: VersionKey,
    pub sort_key: String,
    pub version: String,
    pub package_version: String,
    pub flavor: Flavor,
    pub origin: Origin,
    pub installed: bool,
    pub auto_installed: bool,
    pub in_use: bool,
    pub archive: String,
    pub support: SupportStatus,
}
