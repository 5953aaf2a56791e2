use kernup_core::catalog::{CachedCatalog, CatalogCache, FetchedBuilds, MainlineCatalog};
use kernup_core::error::{KernupError, Result};
use kernup_core::kernel::{Flavor, PRIMARY_ORIGIN};
use kernup_core::logger::Logger;
use kernup_core::mainline::{
    filter_versions, BuildFile, MainlineBranch, MainlineFilter, SeriesStatus, SupportMap,
};
use kernup_core::packages::{PackageRecord, PackageSnapshot};
use kernup_core::selector::{
    ActiveKernel, Blacklist, KernelSelector, Recommendation, SelectorConfig,
};
use kernup_core::VersionKey;

const STAMP: &str = "202304232030";

struct FixedCatalog {
    versions: Vec<String>,
    support: SupportMap,
    /// Newest daily folder and the kernel version its packages carry.
    daily: Option<(String, String)>,
}

impl FixedCatalog {
    fn new(versions: &[&str], support: &[(&str, SeriesStatus)]) -> Self {
        Self {
            versions: versions.iter().map(|v| v.to_string()).collect(),
            support: support
                .iter()
                .map(|(series, status)| (series.to_string(), status.clone()))
                .collect(),
            daily: None,
        }
    }

    fn daily(folder: &str, kernel: &str) -> Self {
        Self {
            daily: Some((folder.to_string(), kernel.to_string())),
            ..Self::new(&[], &[])
        }
    }
}

impl MainlineCatalog for FixedCatalog {
    fn available_versions(&self, _branch: &MainlineBranch) -> Result<Vec<String>> {
        Ok(self.versions.clone())
    }

    fn daily_build(&self, branch: &MainlineBranch) -> Result<String> {
        match &self.daily {
            Some((folder, _)) if branch.is_daily => Ok(folder.clone()),
            _ => Err(KernupError::KernelUnavailable {
                version: branch.name.to_string(),
            }),
        }
    }

    fn support_status(&self) -> Result<SupportMap> {
        Ok(self.support.clone())
    }

    fn file_list(&self, branch: &MainlineBranch, version: &str) -> Result<Vec<BuildFile>> {
        let v = match &self.daily {
            Some((_, kernel)) if branch.is_daily => kernel.clone(),
            _ => VersionKey::parse(version).display_version(),
        };
        Ok([
            format!("linux-headers-{v}_{v}.{STAMP}_all.deb"),
            format!("linux-headers-{v}-generic_{v}.{STAMP}_amd64.deb"),
            format!("linux-image-unsigned-{v}-generic_{v}.{STAMP}_amd64.deb"),
            format!("linux-modules-{v}-generic_{v}.{STAMP}_amd64.deb"),
        ]
        .into_iter()
        .map(|filename| BuildFile { filename, size: 1000 })
        .collect())
    }
}

fn distro(name: &str, candidate: &str, installed: Option<&str>) -> PackageRecord {
    PackageRecord {
        name: name.into(),
        installed_version: installed.map(str::to_string),
        candidate_version: Some(candidate.into()),
        origins: [PRIMARY_ORIGIN.to_string()].into_iter().collect(),
        origin: Some(PRIMARY_ORIGIN.into()),
        archive: "jammy-updates".into(),
        downloadable: true,
        ..PackageRecord::default()
    }
}

fn local_mainline(release: &str, installed: &str) -> PackageRecord {
    PackageRecord {
        name: format!("linux-image-unsigned-{release}"),
        installed_version: Some(installed.into()),
        candidate_version: Some(installed.into()),
        archive: "now".into(),
        ..PackageRecord::default()
    }
}

fn mainline_config(upgrade_eol_series: bool) -> SelectorConfig {
    SelectorConfig {
        use_mainline: true,
        upgrade_eol_series,
        ..SelectorConfig::default()
    }
}

#[test]
fn higher_series_meta_wins_over_point_releases() {
    let snapshot = PackageSnapshot::from_records([
        distro("linux-image-5.15.0-60-generic", "5.15.0-60.66", Some("5.15.0-60.66")),
        distro("linux-generic-hwe-22.04", "5.19.0.40.41~22.04.17", None),
        distro("linux-image-5.15.0-65-generic", "5.15.0-65.71", None),
    ]);
    let config = SelectorConfig::default();
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger);

    match selector.recommend(&ActiveKernel::new("5.15.0-60-generic"), false) {
        Recommendation::HigherSeriesMeta {
            package,
            lts_override,
        } => {
            assert_eq!(package.name, "linux-generic-hwe-22.04");
            assert_eq!(package.new_version, "5.19.0.40.41~22.04.17");
            assert!(!lts_override);
        }
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn point_release_brings_its_package_set() {
    let snapshot = PackageSnapshot::from_records([
        distro("linux-image-5.15.0-60-generic", "5.15.0-60.66", Some("5.15.0-60.66")),
        distro("linux-image-5.15.0-65-generic", "5.15.0-65.71", None),
        distro("linux-headers-5.15.0-65", "5.15.0-65.71", None),
        distro("linux-headers-5.15.0-65-generic", "5.15.0-65.71", None),
        distro("linux-modules-5.15.0-65-generic", "5.15.0-65.71", None),
        distro("linux-image-5.15.0-62-generic", "5.15.0-62.69", None),
    ]);
    let config = SelectorConfig::default();
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger);

    match selector.recommend(&ActiveKernel::new("5.15.0-60-generic"), false) {
        Recommendation::PointRelease { version, packages } => {
            assert_eq!(version, "5.15.0-65");
            let mut names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
            names.sort();
            assert_eq!(
                names,
                [
                    "linux-headers-5.15.0-65",
                    "linux-headers-5.15.0-65-generic",
                    "linux-image-5.15.0-65-generic",
                    "linux-modules-5.15.0-65-generic",
                ]
            );
        }
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn end_of_life_series_stays_put_without_cross_series_upgrades() {
    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.2.0-060200-generic",
        "6.2.0-060200.202302191831",
    )]);
    let catalog = FixedCatalog::new(
        &["6.3", "6.2.16"],
        &[("6.3", SeriesStatus::Stable), ("6.2", SeriesStatus::Eol)],
    );
    let config = mainline_config(false);
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);

    assert!(selector
        .recommend(&ActiveKernel::new("6.2.0-060200-generic"), false)
        .is_none());
}

#[test]
fn end_of_life_mainline_moves_to_the_next_series() {
    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.2.0-060200-generic",
        "6.2.0-060200.202302191831",
    )]);
    let catalog = FixedCatalog::new(
        &["6.3", "6.3-rc7", "6.2.16"],
        &[("6.3", SeriesStatus::Stable), ("6.2", SeriesStatus::Eol)],
    );
    let config = mainline_config(true);
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);

    match selector.recommend(&ActiveKernel::new("6.2.0-060200-generic"), false) {
        Recommendation::Mainline(upgrade) => {
            assert_eq!(upgrade.catalog_version, "6.3");
            assert_eq!(upgrade.version, "6.3.0-060300");
            assert!(upgrade.unsupported);
            assert!(!upgrade.warning.is_empty());
            assert_eq!(upgrade.files.len(), 4);
            assert_eq!(upgrade.download_size, 4000);
            assert!(upgrade.base_url.ends_with("/v6.3/"));
            assert_eq!(upgrade.old_version, "6.2.0-060200-generic");
        }
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn supported_mainline_series_takes_its_newest_point_release() {
    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.2.0-060200-generic",
        "6.2.0-060200.202302191831",
    )]);
    let catalog = FixedCatalog::new(
        &["6.3", "6.2.16", "6.2.1"],
        &[("6.3", SeriesStatus::Stable), ("6.2", SeriesStatus::Stable)],
    );
    let config = mainline_config(false);
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);

    match selector.recommend(&ActiveKernel::new("6.2.0-060200-generic"), false) {
        Recommendation::Mainline(upgrade) => assert_eq!(upgrade.catalog_version, "6.2.16"),
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn signed_running_kernel_never_gets_mainline_builds() {
    let snapshot = PackageSnapshot::from_records([distro(
        "linux-image-6.2.0-39-generic",
        "6.2.0-39.40~22.04.1",
        Some("6.2.0-39.40~22.04.1"),
    )]);
    let catalog = FixedCatalog::new(&["6.3"], &[("6.3", SeriesStatus::Stable)]);
    let config = mainline_config(true);
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);

    assert!(selector
        .recommend(&ActiveKernel::new("6.2.0-39-generic"), false)
        .is_none());
}

#[test]
fn release_candidate_is_dropped_once_the_final_release_exists() {
    let versions: Vec<String> = ["6.6-rc1", "6.5", "6.5-rc3", "6.5-rc2"]
        .iter()
        .map(|v| v.to_string())
        .collect();
    let support: SupportMap = [
        ("6.6".to_string(), SeriesStatus::Mainline),
        ("6.5".to_string(), SeriesStatus::Stable),
    ]
    .into_iter()
    .collect();
    let filter = MainlineFilter {
        exclude_eol: true,
        exclude_longterm: true,
        allow_rc: true,
    };
    assert_eq!(
        filter_versions(&versions, Some(&support), &filter),
        ["6.6-rc1", "6.5"]
    );

    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.5.0-060500rc2-generic",
        "6.5.0-060500rc2.202307162133",
    )]);
    let catalog = FixedCatalog::new(
        &["6.5", "6.5-rc3", "6.5-rc2"],
        &[("6.5", SeriesStatus::Stable)],
    );
    let config = SelectorConfig {
        include_rc: true,
        ..mainline_config(false)
    };
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);
    match selector.recommend(&ActiveKernel::new("6.5.0-060500rc2-generic"), false) {
        Recommendation::Mainline(upgrade) => assert_eq!(upgrade.catalog_version, "6.5"),
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn configured_flavor_must_match_for_meta_series() {
    let snapshot = PackageSnapshot::from_records([
        distro(
            "linux-image-5.15.0-60-lowlatency",
            "5.15.0-60.66",
            Some("5.15.0-60.66"),
        ),
        distro("linux-image-5.15.0-60-generic", "5.15.0-60.66", Some("5.15.0-60.66")),
        distro("linux-lowlatency", "5.15.0.60.58", None),
    ]);
    let config = SelectorConfig {
        flavor: Flavor::Lowlatency,
        ..SelectorConfig::default()
    };
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger);
    match selector.recommend(&ActiveKernel::new("5.15.0-60-lowlatency"), false) {
        Recommendation::SameSeriesMeta { package } => assert_eq!(package.name, "linux-lowlatency"),
        other => panic!("unexpected recommendation {other:?}"),
    }

    // A generic kernel running under the lowlatency setting compares as series zero.
    match selector.recommend(&ActiveKernel::new("5.15.0-60-generic"), false) {
        Recommendation::HigherSeriesMeta { package, .. } => {
            assert_eq!(package.name, "linux-lowlatency")
        }
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn long_term_active_series_keeps_its_point_releases() {
    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.1.0-060100-generic",
        "6.1.0-060100.202212112131",
    )]);
    let catalog = FixedCatalog::new(
        &["6.6", "6.5", "6.1.50"],
        &[
            ("6.6", SeriesStatus::Longterm),
            ("6.5", SeriesStatus::Stable),
            ("6.1", SeriesStatus::Longterm),
        ],
    );
    let config = mainline_config(false);
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);
    match selector.recommend(&ActiveKernel::new("6.1.0-060100-generic"), false) {
        Recommendation::Mainline(upgrade) => assert_eq!(upgrade.catalog_version, "6.1.50"),
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn other_long_term_series_are_skipped_unless_enabled() {
    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.2.0-060200-generic",
        "6.2.0-060200.202302191831",
    )]);
    let catalog = FixedCatalog::new(
        &["6.6", "6.5", "6.2.16"],
        &[
            ("6.6", SeriesStatus::Longterm),
            ("6.5", SeriesStatus::Stable),
            ("6.2", SeriesStatus::Eol),
        ],
    );
    let logger = Logger::silent();
    let active = ActiveKernel::new("6.2.0-060200-generic");

    let config = mainline_config(true);
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);
    match selector.recommend(&active, false) {
        Recommendation::Mainline(upgrade) => assert_eq!(upgrade.catalog_version, "6.5"),
        other => panic!("unexpected recommendation {other:?}"),
    }

    let config = SelectorConfig {
        include_longterm: true,
        ..mainline_config(true)
    };
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);
    match selector.recommend(&active, false) {
        Recommendation::Mainline(upgrade) => assert_eq!(upgrade.catalog_version, "6.6"),
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn cached_catalog_without_a_file_list_names_the_build_to_fetch() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("mainline-ppa"), r#"["6.3","6.2.16"]"#).unwrap();
    std::fs::write(
        dir.path().join("mainline-support-status"),
        r#"{"6.2":"stable","6.3":"stable"}"#,
    )
    .unwrap();
    let cached = CachedCatalog::new(
        CatalogCache::new(dir.path().to_path_buf(), None),
        Flavor::Generic,
        "amd64",
    );
    let snapshot = PackageSnapshot::from_records([local_mainline(
        "6.2.0-060200-generic",
        "6.2.0-060200.202302191831",
    )]);
    let config = mainline_config(false);
    let logger = Logger::silent();
    let active = ActiveKernel::new("6.2.0-060200-generic");

    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&cached);
    assert!(selector.recommend(&active, false).is_none());
    let target = selector.mainline_target(&active).unwrap();
    assert_eq!(target.version, "6.2.16");
    assert!(!target.branch.is_daily);
    assert!(matches!(
        cached.file_list(target.branch, &target.version),
        Err(KernupError::Network(_))
    ));

    let files = FixedCatalog::new(&[], &[])
        .file_list(target.branch, &target.version)
        .unwrap();
    let fetched = FetchedBuilds::new(&cached).with_build(target.branch, &target.version, files);
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&fetched);
    match selector.recommend(&active, false) {
        Recommendation::Mainline(upgrade) => {
            assert_eq!(upgrade.catalog_version, "6.2.16");
            assert_eq!(upgrade.version, "6.2.16-060216");
            assert_eq!(upgrade.files.len(), 4);
            assert_eq!(upgrade.download_size, 4000);
        }
        other => panic!("unexpected recommendation {other:?}"),
    }
}

const DAILY_RELEASE: &str = "6.7.0-999-generic";

fn daily_recommendation(
    banner: &str,
    installed: &str,
    catalog: &FixedCatalog,
    config: &SelectorConfig,
) -> Recommendation {
    let snapshot = PackageSnapshot::from_records([local_mainline(DAILY_RELEASE, installed)]);
    let logger = Logger::silent();
    KernelSelector::new(&snapshot, config, &logger)
        .with_catalog(catalog)
        .recommend(&ActiveKernel::with_banner(DAILY_RELEASE, banner), false)
}

#[test]
fn daily_build_is_recommended_when_newer_than_running_and_installed() {
    let catalog = FixedCatalog::daily("2023-11-01", "6.7.0-999");
    match daily_recommendation(
        "#202310200207 SMP PREEMPT_DYNAMIC",
        "6.7.0-999.202310200207",
        &catalog,
        &mainline_config(false),
    ) {
        Recommendation::Mainline(upgrade) => {
            assert_eq!(upgrade.catalog_version, "2023-11-01");
            assert_eq!(upgrade.branch, "daily");
            assert_eq!(upgrade.version, "6.7.0-999");
            assert!(upgrade.base_url.ends_with("/daily/2023-11-01/"));
            assert!(upgrade.unsupported);
        }
        other => panic!("unexpected recommendation {other:?}"),
    }
}

#[test]
fn daily_build_already_running_is_not_offered() {
    // The folder is dated one day after the build the banner carries.
    let catalog = FixedCatalog::daily("2023-11-01", "6.7.0-999");
    let recommendation = daily_recommendation(
        "#202310310207 SMP PREEMPT_DYNAMIC",
        "6.7.0-999.202310310207",
        &catalog,
        &mainline_config(false),
    );
    assert!(recommendation.is_none());

    let snapshot =
        PackageSnapshot::from_records([local_mainline(DAILY_RELEASE, "6.7.0-999.202310310207")]);
    let config = mainline_config(false);
    let logger = Logger::silent();
    let selector = KernelSelector::new(&snapshot, &config, &logger).with_catalog(&catalog);
    let active = ActiveKernel::with_banner(DAILY_RELEASE, "#202310310207 SMP");
    assert!(selector.mainline_target(&active).is_none());
}

#[test]
fn daily_build_installed_but_not_active_is_not_offered() {
    let catalog = FixedCatalog::daily("2023-11-01", "6.7.0-999");
    let recommendation = daily_recommendation(
        "#202310200207 SMP PREEMPT_DYNAMIC",
        "6.7.0-999.202310310207",
        &catalog,
        &mainline_config(false),
    );
    assert!(recommendation.is_none());
}

#[test]
fn daily_build_of_a_kernel_that_is_not_installed_is_not_offered() {
    let catalog = FixedCatalog::daily("2023-11-01", "6.8.0-999");
    let recommendation = daily_recommendation(
        "#202310200207 SMP PREEMPT_DYNAMIC",
        "6.7.0-999.202310200207",
        &catalog,
        &mainline_config(false),
    );
    assert!(recommendation.is_none());
}

#[test]
fn blacklisted_daily_build_is_not_offered() {
    let catalog = FixedCatalog::daily("2023-11-01", "6.7.0-999");
    let config = SelectorConfig {
        blacklist: Blacklist::parse(&["linux=6.7.0-999"]).unwrap(),
        ..mainline_config(false)
    };
    let recommendation = daily_recommendation(
        "#202310200207 SMP PREEMPT_DYNAMIC",
        "6.7.0-999.202310200207",
        &catalog,
        &config,
    );
    assert!(recommendation.is_none());
}
