/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::config
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load the operator configuration file and derive the
    per-run settings handed to the selector, the catalog
    cache and the HTTP client.

  Security / Safety Notes:
    Read-only. Unknown keys are rejected so that typos do not
    silently fall back to defaults.

  Dependencies:
    serde + toml for parsing, dirs for XDG locations.

  Operational Scope:
    Loaded once per invocation by the CLI.

  Revision History:
    2026-03-10 COD  Introduced Kernup configuration.
    2026-04-02 COD  Added catalog cache age and helper settings.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Absent file means defaults, malformed file means error
    - Settings travel explicitly, never through globals
============================================================*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::CatalogCache;
use crate::error::{KernupError, Result};
use crate::kernel::Flavor;
use crate::selector::{Blacklist, SelectorConfig};
use crate::support::DISTRO_INFO_FILES;

pub const DEFAULT_MAINLINE_URL: &str = "https://kernel.ubuntu.com/mainline/";
pub const DEFAULT_SUPPORT_URL: &str = "https://www.kernel.org/releases.json";
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/kernup";

const APP_DIR: &str = "kernup";
const CONFIG_FILE: &str = "config.toml";
const REPORT_FILE: &str = "recommendation.json";

/// Top-level configuration file layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernupConfig {
    /// Configured kernel flavor, with or without the leading dash.
    pub flavor: String,
    /// `pattern` or `pattern=version` entries, glob matched on source names.
    pub blacklist: Vec<String>,
    pub mainline: MainlineConfig,
    pub paths: PathsConfig,
    pub helpers: HelperConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MainlineConfig {
    pub enabled: bool,
    pub include_rc: bool,
    pub include_longterm: bool,
    pub upgrade_eol_series: bool,
    pub base_url: String,
    pub support_url: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    pub max_retries: usize,
    pub max_parallel_requests: usize,
    pub cache_dir: Option<PathBuf>,
    /// Seconds after which cache files are ignored; unset keeps them forever.
    pub cache_max_age: Option<u64>,
}

impl Default for MainlineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            include_rc: false,
            include_longterm: false,
            upgrade_eol_series: false,
            base_url: DEFAULT_MAINLINE_URL.to_string(),
            support_url: DEFAULT_SUPPORT_URL.to_string(),
            timeout: 5,
            max_retries: 3,
            max_parallel_requests: 4,
            cache_dir: None,
            cache_max_age: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub log_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub distro_info: Vec<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            report: None,
            distro_info: DISTRO_INFO_FILES.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelperConfig {
    /// Program and arguments printing the package snapshot JSON on stdout.
    pub snapshot_command: Vec<String>,
    /// Seconds before the snapshot command is abandoned.
    pub timeout: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            snapshot_command: Vec::new(),
            timeout: 120,
        }
    }
}

impl Default for KernupConfig {
    fn default() -> Self {
        Self {
            flavor: Flavor::Generic.suffix().to_string(),
            blacklist: Vec::new(),
            mainline: MainlineConfig::default(),
            paths: PathsConfig::default(),
            helpers: HelperConfig::default(),
        }
    }
}

impl KernupConfig {
    /// Load from `path`, or from the XDG location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(KernupError::Config(format!(
                        "Configuration file {} does not exist",
                        path.display()
                    )));
                }
                Self::load(path)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            KernupError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&text)
            .map_err(|err| KernupError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| KernupError::Config(err.to_string()))
    }

    /// Configured flavor; unknown or unsupported values fall back to generic.
    pub fn flavor(&self) -> Flavor {
        self.flavor
            .parse::<Flavor>()
            .ok()
            .filter(|flavor| Flavor::supported().any(|supported| supported == *flavor))
            .unwrap_or(Flavor::Generic)
    }

    pub fn selector_config(&self) -> Result<SelectorConfig> {
        Ok(SelectorConfig {
            flavor: self.flavor(),
            use_mainline: self.mainline.enabled,
            include_rc: self.mainline.include_rc,
            include_longterm: self.mainline.include_longterm,
            upgrade_eol_series: self.mainline.upgrade_eol_series,
            mainline_root: self.mainline.base_url.clone(),
            blacklist: Blacklist::parse(&self.blacklist)?,
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.mainline
            .cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    pub fn catalog_cache(&self) -> CatalogCache {
        CatalogCache::new(
            self.cache_dir(),
            self.mainline.cache_max_age.map(Duration::from_secs),
        )
    }

    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("logs")
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.paths.report.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join(REPORT_FILE)
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
