/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::report
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Wrap a kernel recommendation in a JSON document for the
    update manager and render its one-line summary.

  Security / Safety Notes:
    Writes only to the configured report path.

  Dependencies:
    serde_json for the document, chrono for timestamps.

  Operational Scope:
    Output of the `recommend` command.

  Revision History:
    2026-03-20 COD  Adapted manifest writer into recommendation report.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic, self-describing output
    - Explicit filesystem error reporting
============================================================*/

use std::fs::File;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{KernupError, Result};
use crate::kernel::Flavor;
use crate::selector::{ActiveKernel, Recommendation, SelectorConfig};

/// Full report document.
#[derive(Debug, Serialize)]
pub struct RecommendationDocument {
    pub metadata: ReportMetadata,
    pub recommendation: Recommendation,
}

/// Context the recommendation was computed in.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub generated_by: String,
    pub active_release: String,
    pub active_build_date: Option<String>,
    pub flavor: Flavor,
    pub mainline_enabled: bool,
    pub blacklist_entries: usize,
    pub priority_pending: bool,
    /// Bytes to fetch; only known for mainline builds.
    pub download_size: u64,
}

pub fn build_report(
    active: &ActiveKernel,
    config: &SelectorConfig,
    priority_pending: bool,
    recommendation: Recommendation,
) -> RecommendationDocument {
    let download_size = match &recommendation {
        Recommendation::Mainline(upgrade) => upgrade.download_size,
        _ => 0,
    };
    RecommendationDocument {
        metadata: ReportMetadata {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            generated_by: "kernup_core".to_string(),
            active_release: active.release.clone(),
            active_build_date: active.build_date.clone(),
            flavor: config.flavor,
            mainline_enabled: config.use_mainline,
            blacklist_entries: config.blacklist.len(),
            priority_pending,
            download_size,
        },
        recommendation,
    }
}

/// Persist the report to the given path.
pub fn write_report(document: &RecommendationDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to create report directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(path).map_err(|err| {
        KernupError::Filesystem(format!(
            "Failed to create report file {}: {err}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, document).map_err(|err| {
        KernupError::Filesystem(format!("Failed to write report {}: {err}", path.display()))
    })
}

pub fn summary_line(document: &RecommendationDocument) -> String {
    let active = &document.metadata.active_release;
    match &document.recommendation {
        Recommendation::None => format!("→ {active}: no kernel upgrade recommended"),
        Recommendation::SameSeriesMeta { package } => format!(
            "→ {active}: install {} {} ({})",
            package.name,
            package.new_version,
            document.recommendation.label()
        ),
        Recommendation::HigherSeriesMeta {
            package,
            lts_override,
        } => format!(
            "→ {active}: install {} {} ({}{})",
            package.name,
            package.new_version,
            document.recommendation.label(),
            if *lts_override { ", long-term" } else { "" }
        ),
        Recommendation::FlavorMetas { packages } => format!(
            "→ {active}: install {} ({})",
            packages
                .iter()
                .map(|package| package.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            document.recommendation.label()
        ),
        Recommendation::PointRelease { version, packages } => format!(
            "→ {active}: upgrade to {version}, {} packages ({})",
            packages.len(),
            document.recommendation.label()
        ),
        Recommendation::Mainline(upgrade) => format!(
            "→ {active}: {} {} ({} files, {} bytes). {}",
            upgrade.title,
            upgrade.version,
            upgrade.files.len(),
            upgrade.download_size,
            upgrade.warning
        ),
    }
}

pub fn print_summary(document: &RecommendationDocument) {
    println!("{}", summary_line(document));
}
