/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::support
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Support-status computation for kernel records: distro
    release lifetimes, hardware enablement windows and the
    kernel.org series status of mainline builds.

  Security / Safety Notes:
    Reads distro-info CSV files; never writes.

  Dependencies:
    chrono for calendar arithmetic.

  Operational Scope:
    Classification step of the `kernels` listing.

  Revision History:
    2026-03-18 COD  Ported support classification.
    2026-05-02 COD  Capped out-of-turn HWE kernels.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic output for a fixed "today"
    - Absent data degrades to "unknown", never to errors
============================================================*/

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::error::{KernupError, Result};
use crate::kernel::{Flavor, InstallState, KernelCandidate, Origin, SupportStatus};
use crate::mainline::{MainlineBranch, SupportMap};
use crate::protocol::{KernelRecord, SupportDuration};

pub const DISTRO_INFO_FILES: [&str; 2] = [
    "/usr/share/distro-info/ubuntu.csv",
    "/usr/share/distro-info/debian.csv",
];

/// First and last day of support of a distro series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseWindow {
    pub released: NaiveDate,
    pub support_end: NaiveDate,
}

impl ReleaseWindow {
    /// Whole months between release and end of support.
    pub fn lifetime_months(&self) -> i64 {
        months_between(self.released, self.support_end)
    }
}

/// Distro series (`jammy`) to release window.
#[derive(Debug, Clone, Default)]
pub struct ReleaseDates {
    windows: BTreeMap<String, ReleaseWindow>,
}

impl ReleaseDates {
    /// Parse distro-info CSV text: series in column 3, release date in
    /// column 5, end of support in column 6. Malformed rows are skipped.
    pub fn parse_csv(&mut self, text: &str) {
        for line in text.lines().skip(1) {
            let columns: Vec<&str> = line.split(',').collect();
            if columns.len() < 6 {
                continue;
            }
            let parse = |field: &str| NaiveDate::parse_from_str(field.trim(), "%Y-%m-%d").ok();
            let (Some(released), Some(support_end)) = (parse(columns[4]), parse(columns[5])) else {
                continue;
            };
            self.windows.insert(
                columns[2].to_string(),
                ReleaseWindow {
                    released,
                    support_end,
                },
            );
        }
    }

    /// Load every readable file; missing files contribute nothing.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut dates = Self::default();
        for path in paths {
            if let Ok(text) = std::fs::read_to_string(path) {
                dates.parse_csv(&text);
            }
        }
        dates
    }

    pub fn get(&self, series: &str) -> Option<&ReleaseWindow> {
        self.windows.get(series)
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (i64::from(to.year()) - i64::from(from.year())) * 12 + i64::from(to.month())
        - i64::from(from.month())
}

/// Year and month in which `months` of maintenance starting at `release` end.
pub fn maintenance_end(release: NaiveDate, months: i64) -> (i32, u32) {
    let years = months.div_euclid(12);
    let extra = months.rem_euclid(12);
    let shifted = i64::from(release.month()) + extra;
    let mut year = i64::from(release.year()) + years + shifted / 12;
    let mut month = shifted % 12;
    if month == 0 {
        month = 12;
        year -= 1;
    }
    (year as i32, month as u32)
}

/// Support duration from a package's `Supported:` tag.
///
/// `Ny` is N years unless the source is a hardware enablement kernel, whose
/// window is derived later; `Nm` is N months. Primary distro kernels outside
/// `-proposed` without a tag take the distro lifetime.
pub fn duration_from_tag(
    tag: Option<&str>,
    origin: Origin,
    archive: &str,
    source_name: &str,
    release_dates: &ReleaseDates,
) -> SupportDuration {
    let derived;
    let tag = match tag.map(str::trim).filter(|tag| !tag.is_empty()) {
        Some(tag) => tag,
        None if origin == Origin::Primary && !archive.contains("-proposed") => {
            let distro = archive.split('-').next().unwrap_or_default();
            let Some(window) = release_dates.get(distro) else {
                return SupportDuration::Unsupported;
            };
            let lifetime = window.lifetime_months();
            derived = if lifetime >= 12 {
                format!("{}y", lifetime / 12)
            } else {
                format!("{lifetime}m")
            };
            derived.as_str()
        }
        None => return SupportDuration::Unsupported,
    };

    if let Some(years) = tag.strip_suffix('y') {
        if source_name.contains("-hwe") {
            return SupportDuration::HweWindow;
        }
        return years
            .parse::<u32>()
            .map(|years| SupportDuration::Months(years * 12))
            .unwrap_or(SupportDuration::Unsupported);
    }
    if let Some(months) = tag.strip_suffix('m') {
        return months
            .parse::<u32>()
            .map(SupportDuration::Months)
            .unwrap_or(SupportDuration::Unsupported);
    }
    SupportDuration::Unsupported
}

/// Computed support of one distro kernel series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSupport {
    pub series: String,
    pub months: i64,
    pub end: (i32, u32),
    pub end_of_life: bool,
}

/// Support windows per distro release, one entry per series in point-release order.
pub fn support_windows(
    records: &[KernelRecord],
    release_dates: &ReleaseDates,
    today: NaiveDate,
) -> HashMap<String, Vec<SeriesSupport>> {
    let mut ascending: Vec<&KernelRecord> = records.iter().collect();
    ascending.sort_by(|a, b| a.key.cmp(&b.key));

    let mut by_release: BTreeMap<String, Vec<(String, i64)>> = BTreeMap::new();
    for record in ascending {
        if record.origin != Origin::Primary || !record.support.is_supported() {
            continue;
        }
        let months = match record.support {
            SupportDuration::Months(months) => i64::from(months),
            _ => -1,
        };
        let entries = by_release.entry(record.release().to_string()).or_default();
        let series = record.series_label();
        if !entries.iter().any(|(known, _)| *known == series) {
            entries.push((series, months));
        }
    }

    let mut windows = HashMap::new();
    for (release, entries) in by_release {
        let Some(window) = release_dates.get(&release) else {
            continue;
        };
        let count = entries.len();
        let since_release = months_between(window.released, today);
        let mut computed: Vec<SeriesSupport> = Vec::with_capacity(count);

        for (point, (series, mut months)) in entries.into_iter().enumerate() {
            if months == -1 {
                if point >= 4 {
                    // Out-of-turn HWE kernels shift the LTS point release.
                    if count > 5 && point < count - 1 {
                        months = computed[3].months;
                    } else {
                        months = window.lifetime_months();
                    }
                }
                if point >= 1 && months == -1 {
                    let max_expected = (since_release - 3).div_euclid(6) + 1;
                    let point = point as i64;
                    months = if point > max_expected {
                        10 + max_expected * 6
                    } else {
                        10 + point * 6
                    };
                }
            }
            let end = maintenance_end(window.released, months);
            let end_of_life = today.year() > end.0
                || (today.year() == end.0 && today.month() > end.1);
            computed.push(SeriesSupport {
                series,
                months,
                end,
                end_of_life,
            });
        }
        windows.insert(release, computed);
    }
    windows
}

/// Classify kernel records, newest first.
pub fn classify(
    records: &[KernelRecord],
    release_dates: &ReleaseDates,
    upstream: Option<&SupportMap>,
    today: NaiveDate,
) -> Vec<KernelCandidate> {
    let windows = support_windows(records, release_dates, today);
    let upstream = upstream.filter(|map| !map.is_empty());

    let mut descending: Vec<&KernelRecord> = records.iter().collect();
    descending.sort_by(|a, b| b.key.cmp(&a.key));

    let mut supported_series: HashSet<(Flavor, String)> = HashSet::new();
    let mut upstream_series: HashSet<String> = HashSet::new();
    let mut candidates = Vec::with_capacity(descending.len());

    for record in descending {
        let series = record.series_label();
        let support = if record.support.is_supported() && record.origin == Origin::Primary {
            let info = windows
                .get(record.release())
                .and_then(|entries| entries.iter().find(|entry| entry.series == series));
            match info {
                Some(info) if !info.end_of_life => {
                    if supported_series.insert((record.flavor, series.clone())) {
                        SupportStatus::SupportedUntil {
                            year: info.end.0,
                            month: info.end.1,
                        }
                    } else {
                        SupportStatus::Superseded
                    }
                }
                Some(_) => SupportStatus::EndOfLife,
                None => SupportStatus::Unknown,
            }
        } else if is_mainline_build(record) {
            if upstream_series.insert(series.clone()) {
                match upstream {
                    None => SupportStatus::Unknown,
                    Some(map) => match map.get(&series) {
                        Some(status) => SupportStatus::Upstream {
                            series_status: status.clone(),
                        },
                        None => SupportStatus::EndOfLife,
                    },
                }
            } else if record
                .key
                .build_number()
                .and_then(MainlineBranch::by_id)
                .is_some_and(|branch| branch.is_daily)
            {
                SupportStatus::Daily
            } else {
                SupportStatus::Superseded
            }
        } else {
            SupportStatus::Unsupported
        };

        candidates.push(KernelCandidate {
            key: record.key.clone(),
            sort_key: record.key.dotted(),
            version: record.version.clone(),
            package_version: record.package_version.clone(),
            flavor: record.flavor,
            origin: record.origin,
            installed: record.installed.is_installed(),
            auto_installed: record.installed == InstallState::Auto,
            in_use: record.in_use,
            archive: record.archive.clone(),
            support,
        });
    }
    candidates
}

/// Mainline records, or installed local kernels carrying a mainline build stamp.
fn is_mainline_build(record: &KernelRecord) -> bool {
    record.origin == Origin::Mainline
        || (record.origin == Origin::Local
            && record.installed.is_installed()
            && record.key.build_stamp().is_some())
}

/// Parse a `YYYY-MM-DD` date, as used by daily branch folders.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|err| KernupError::Parse(format!("Invalid date `{text}`: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mainline::SeriesStatus;
    use crate::version::VersionKey;

    const UBUNTU_CSV: &str = "\
version,codename,series,created,release,eol,eol-server
20.04 LTS,Focal Fossa,focal,2019-10-17,2020-04-23,2025-05-29
22.04 LTS,Jammy Jellyfish,jammy,2021-10-21,2022-04-21,2027-06-01
23.10,Mantic Minotaur,mantic,2023-04-20,2023-10-12,2024-07-11
broken,row
";

    fn dates() -> ReleaseDates {
        let mut dates = ReleaseDates::default();
        dates.parse_csv(UBUNTU_CSV);
        dates
    }

    fn day(text: &str) -> NaiveDate {
        parse_date(text).unwrap()
    }

    fn distro(version: &str, package: &str, archive: &str, support: SupportDuration) -> KernelRecord {
        KernelRecord {
            key: VersionKey::parse(package),
            version: version.into(),
            package_version: package.into(),
            installed: InstallState::NotInstalled,
            in_use: false,
            origin: Origin::Primary,
            archive: archive.into(),
            support,
            flavor: Flavor::Generic,
        }
    }

    #[test]
    fn release_dates_parse_and_skip_bad_rows() {
        let dates = dates();
        let jammy = dates.get("jammy").unwrap();
        assert_eq!(jammy.released, day("2022-04-21"));
        assert_eq!(jammy.lifetime_months(), 62);
        assert!(dates.get("broken").is_none());
        assert!(ReleaseDates::load(&["/nonexistent/distro.csv"]).is_empty());
    }

    #[test]
    fn maintenance_end_wraps_years() {
        let release = day("2022-04-21");
        assert_eq!(maintenance_end(release, 60), (2027, 4));
        assert_eq!(maintenance_end(release, 8), (2022, 12));
        assert_eq!(maintenance_end(release, 9), (2023, 1));
        assert_eq!(maintenance_end(release, -1), (2022, 3));
    }

    #[test]
    fn tags_translate_to_durations() {
        let dates = dates();
        let d = |tag, origin, archive, source| duration_from_tag(tag, origin, archive, source, &dates);
        assert_eq!(d(Some("5y"), Origin::Primary, "jammy", "linux"), SupportDuration::Months(60));
        assert_eq!(d(Some("9m"), Origin::Primary, "jammy", "linux"), SupportDuration::Months(9));
        assert_eq!(
            d(Some("5y"), Origin::Primary, "jammy-updates", "linux-hwe-6.5"),
            SupportDuration::HweWindow
        );
        assert_eq!(d(None, Origin::Primary, "jammy-updates", "linux"), SupportDuration::Months(60));
        assert_eq!(d(None, Origin::Primary, "mantic-updates", "linux"), SupportDuration::Months(9));
        assert_eq!(d(None, Origin::Primary, "jammy-proposed", "linux"), SupportDuration::Unsupported);
        assert_eq!(d(None, Origin::Other, "jammy", "linux"), SupportDuration::Unsupported);
        assert_eq!(d(Some("forever"), Origin::Primary, "jammy", "linux"), SupportDuration::Unsupported);
    }

    #[test]
    fn newest_kernel_of_a_series_is_supported_older_ones_superseded() {
        let records = vec![
            distro("5.15.0-58", "5.15.0-58.64", "jammy-updates", SupportDuration::Months(60)),
            distro("5.15.0-60", "5.15.0-60.66", "jammy-updates", SupportDuration::Months(60)),
            distro("6.2.0-39", "6.2.0-39.40~22.04.1", "jammy-updates", SupportDuration::HweWindow),
        ];
        let classified = classify(&records, &dates(), None, day("2023-06-15"));
        let status: Vec<(&str, &SupportStatus)> = classified
            .iter()
            .map(|candidate| (candidate.version.as_str(), &candidate.support))
            .collect();
        assert_eq!(
            status,
            vec![
                ("6.2.0-39", &SupportStatus::SupportedUntil { year: 2023, month: 8 }),
                ("5.15.0-60", &SupportStatus::SupportedUntil { year: 2027, month: 4 }),
                ("5.15.0-58", &SupportStatus::Superseded),
            ]
        );
    }

    #[test]
    fn expired_hwe_windows_are_end_of_life() {
        let records = vec![
            distro("5.15.0-60", "5.15.0-60.66", "jammy-updates", SupportDuration::Months(60)),
            distro("5.19.0-50", "5.19.0-50.50~22.04.1", "jammy-updates", SupportDuration::HweWindow),
        ];
        let classified = classify(&records, &dates(), None, day("2024-01-10"));
        assert_eq!(classified[0].version, "5.19.0-50");
        assert_eq!(classified[0].support, SupportStatus::EndOfLife);
    }

    #[test]
    fn mainline_records_take_upstream_status_once_per_series() {
        let records = vec![
            KernelRecord::mainline("6.5.2", Flavor::Generic),
            KernelRecord::mainline("6.5.1", Flavor::Generic),
            KernelRecord::mainline("6.4.16", Flavor::Generic),
        ];
        let mut upstream = SupportMap::new();
        upstream.insert("6.5".into(), SeriesStatus::Stable);

        let classified = classify(&records, &dates(), Some(&upstream), day("2023-10-01"));
        assert_eq!(
            classified[0].support,
            SupportStatus::Upstream {
                series_status: SeriesStatus::Stable
            }
        );
        assert_eq!(classified[1].support, SupportStatus::Superseded);
        assert_eq!(classified[2].support, SupportStatus::EndOfLife);

        let unknown = classify(&records, &dates(), None, day("2023-10-01"));
        assert_eq!(unknown[0].support, SupportStatus::Unknown);
    }

    #[test]
    fn local_builds_are_classified_by_their_stamp() {
        let mut stamped = distro(
            "6.5.0-060500",
            "6.5.0-060500.202308271831",
            "now",
            SupportDuration::Unsupported,
        );
        stamped.origin = Origin::Local;
        stamped.installed = InstallState::Manual;
        let mut custom = stamped.clone();
        custom.key = VersionKey::parse("6.1.0-1");
        custom.version = "6.1.0-1".into();

        let classified = classify(&[stamped, custom], &dates(), None, day("2023-10-01"));
        assert_eq!(classified[0].support, SupportStatus::Unknown);
        assert_eq!(classified[1].support, SupportStatus::Unsupported);
        assert!(classified[0].installed && !classified[0].auto_installed);
    }
}
