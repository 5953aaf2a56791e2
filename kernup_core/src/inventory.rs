/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::inventory
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Enumerate installed and installable kernels from a
    package snapshot as kernel records, plus the available
    mainline builds.

  Security / Safety Notes:
    Read-only over the snapshot.

  Dependencies:
    None beyond crate modules.

  Operational Scope:
    Data-gathering side of the `kernels` listing.

  Revision History:
    2026-03-16 COD  Introduced kernel inventory.
  ------------------------------------------------------------
  SSE Principles Observed:
    - One record per kernel, signed builds preferred
    - Only offer installable kernels of the configured flavor
============================================================*/

use std::collections::HashSet;

use crate::kernel::{Flavor, InstallState, Origin};
use crate::packages::PackageIndex;
use crate::protocol::KernelRecord;
use crate::support::{duration_from_tag, ReleaseDates};
use crate::version::VersionKey;

const IMAGE_PREFIX: &str = "linux-image-";
const UNSIGNED_PREFIX: &str = "unsigned-";
const ARCH_SUFFIX: &str = "-amd64";

/// A kernel image package name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName<'a> {
    pub version: &'a str,
    pub flavor: Flavor,
    pub arch_suffix: &'a str,
}

impl<'a> ImageName<'a> {
    /// Parse `linux-image-[unsigned-]<version><flavor>[-amd64]`.
    pub fn parse(name: &'a str) -> Option<Self> {
        let rest = name.strip_prefix(IMAGE_PREFIX)?;
        let rest = rest.strip_prefix(UNSIGNED_PREFIX).unwrap_or(rest);
        Flavor::supported().find_map(|flavor| {
            let (body, arch_suffix) = match rest.strip_suffix(ARCH_SUFFIX) {
                Some(body) if body.ends_with(flavor.suffix()) => (body, ARCH_SUFFIX),
                _ => (rest, ""),
            };
            let version = body.strip_suffix(flavor.suffix())?;
            if version.len() < 2 || !version.starts_with(|c: char| c.is_ascii_digit()) {
                return None;
            }
            Some(Self {
                version,
                flavor,
                arch_suffix,
            })
        })
    }

    /// Kernel release as reported by the running kernel.
    pub fn release(&self) -> String {
        format!("{}{}{}", self.version, self.flavor.suffix(), self.arch_suffix)
    }
}

/// Kernel records for every kernel image in the snapshot.
///
/// Installed kernels of any flavor are listed; kernels that are not installed
/// are only offered for `flavor` and when downloadable. Unsigned images are
/// dropped when the signed image of the same release was already listed.
pub fn kernel_records(
    packages: &dyn PackageIndex,
    current_release: &str,
    flavor: Flavor,
    release_dates: &ReleaseDates,
) -> Vec<KernelRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for name in packages.names() {
        let Some(image) = ImageName::parse(name) else {
            continue;
        };
        let Some(record) = packages.get(name) else {
            continue;
        };
        if record.effective_version().is_none() {
            continue;
        }
        let release = image.release();
        let (package_version, in_use) = match record.installed_version.as_deref() {
            Some(installed) => (installed, release == current_release),
            None if image.flavor == flavor && record.downloadable => {
                match record.candidate_version.as_deref() {
                    Some(candidate) => (candidate, false),
                    None => continue,
                }
            }
            None => continue,
        };
        if !seen.insert(release) {
            continue;
        }

        let installed = match (record.is_installed(), record.auto_installed) {
            (true, true) => InstallState::Auto,
            (true, false) => InstallState::Manual,
            (false, _) => InstallState::NotInstalled,
        };
        let origin = Origin::from_apt(record.origin.as_deref());
        let support = duration_from_tag(
            record.supported.as_deref(),
            origin,
            &record.archive,
            record.source(),
            release_dates,
        );
        records.push(KernelRecord {
            key: VersionKey::parse(package_version),
            version: image.version.to_string(),
            package_version: package_version.to_string(),
            installed,
            in_use,
            origin,
            archive: record.archive.clone(),
            support,
            flavor: image.flavor,
        });
    }
    records
}

/// Append records for available mainline versions.
///
/// Versions whose key matches a locally installed kernel of `flavor` (first
/// four components) are skipped; this also folds rebuilds of one version.
pub fn append_mainline(records: &mut Vec<KernelRecord>, versions: &[String], flavor: Flavor) {
    let local: HashSet<String> = records
        .iter()
        .filter(|record| record.origin == Origin::Local && record.flavor == flavor)
        .map(|record| leading_components(&record.key))
        .collect();
    for version in versions {
        let record = KernelRecord::mainline(version, flavor);
        if local.contains(&leading_components(&record.key)) {
            continue;
        }
        records.push(record);
    }
}

fn leading_components(key: &VersionKey) -> String {
    format!(
        "{}.{}.{}.{}",
        key.major(),
        key.minor(),
        key.patch(),
        key.build()
    )
}

/// Render records as protocol lines.
pub fn render(records: &[KernelRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.encode());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::{PackageRecord, PackageSnapshot};
    use crate::protocol::{decode_batch, SupportDuration};

    fn image(name: &str, installed: Option<&str>, candidate: &str) -> PackageRecord {
        PackageRecord {
            name: name.into(),
            installed_version: installed.map(str::to_string),
            candidate_version: Some(candidate.into()),
            source_name: Some("linux-signed".into()),
            origin: Some("Ubuntu".into()),
            archive: "jammy-updates".into(),
            downloadable: true,
            supported: Some("5y".into()),
            ..PackageRecord::default()
        }
    }

    #[test]
    fn image_names_parse() {
        let parsed = ImageName::parse("linux-image-unsigned-6.5.0-060500-generic").unwrap();
        assert_eq!(parsed.version, "6.5.0-060500");
        assert_eq!(parsed.flavor, Flavor::Generic);
        assert_eq!(parsed.release(), "6.5.0-060500-generic");
        assert!(ImageName::parse("linux-image-generic").is_none());
        assert!(ImageName::parse("linux-image-5.15.0-60-rt").is_none());
        assert!(ImageName::parse("linux-headers-5.15.0-60-generic").is_none());
        if std::env::consts::ARCH == "x86_64" {
            let liquorix = ImageName::parse("linux-image-6.5.0-1-liquorix-amd64").unwrap();
            assert_eq!(liquorix.version, "6.5.0-1");
            assert_eq!(liquorix.release(), "6.5.0-1-liquorix-amd64");
        }
    }

    #[test]
    fn inventory_lists_installed_and_offers_same_flavor() {
        let mut running = image("linux-image-5.15.0-60-generic", Some("5.15.0-60.66"), "5.15.0-60.66");
        running.auto_installed = true;
        let mut unsigned_dup = image("linux-image-unsigned-5.15.0-60-generic", Some("5.15.0-60.66"), "5.15.0-60.66");
        unsigned_dup.source_name = Some("linux".into());
        let offered = image("linux-image-5.15.0-65-generic", None, "5.15.0-65.71");
        let other_flavor = image("linux-image-5.15.0-65-lowlatency", None, "5.15.0-65.71");
        let mut not_downloadable = image("linux-image-5.15.0-70-generic", None, "5.15.0-70.77");
        not_downloadable.downloadable = false;
        let mut hwe = image("linux-image-6.2.0-39-generic", None, "6.2.0-39.40~22.04.1");
        hwe.source_name = Some("linux-hwe-6.2".into());

        let snapshot = PackageSnapshot::from_records([
            running,
            unsigned_dup,
            offered,
            other_flavor,
            not_downloadable,
            hwe,
        ]);
        let records = kernel_records(&snapshot, "5.15.0-60-generic", Flavor::Generic, &ReleaseDates::default());
        let versions: Vec<&str> = records.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, ["5.15.0-60", "5.15.0-65", "6.2.0-39"]);

        assert!(records[0].in_use);
        assert_eq!(records[0].installed, InstallState::Auto);
        assert_eq!(records[0].origin, Origin::Primary);
        assert_eq!(records[0].support, SupportDuration::Months(60));
        assert_eq!(records[1].installed, InstallState::NotInstalled);
        assert_eq!(records[2].support, SupportDuration::HweWindow);
    }

    #[test]
    fn mainline_versions_skip_local_builds() {
        let mut local = image(
            "linux-image-unsigned-6.5.0-060500-generic",
            Some("6.5.0-060500.202308271831"),
            "6.5.0-060500.202308271831",
        );
        local.origin = None;
        local.archive = "now".into();
        local.downloadable = false;
        let snapshot = PackageSnapshot::from_records([local]);
        let mut records = kernel_records(&snapshot, "6.5.0-060500-generic", Flavor::Generic, &ReleaseDates::default());
        assert_eq!(records[0].origin, Origin::Local);

        append_mainline(&mut records, &["6.6".into(), "6.5".into()], Flavor::Generic);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].package_version, "6.6");
        assert_eq!(records[1].origin, Origin::Mainline);

        let decoded = decode_batch(&render(&records)).unwrap();
        assert_eq!(decoded, records);
    }
}
