/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::main
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Kernup Core. Recommends the next kernel
    upgrade, lists kernel records for the update manager and
    maintains the mainline catalog cache.

  Security / Safety Notes:
    Runs with caller privileges. Cache writes and downloads
    happen only when run as root; installation is left to
    the package manager.

  Dependencies:
    clap for CLI parsing, chrono for session stamps.

  Operational Scope:
    Invoked by the update manager's refresh cycle or by
    operators for one-off checks.

  Revision History:
    2026-03-10 COD  Authored Kernup Core runtime.
    2026-03-22 COD  Split into recommend/kernels/mainline/download.
    2026-06-04 COD  Fetch the target's file list on a cache miss.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};

use kernup_core::catalog::{CachedCatalog, CatalogCache, FetchedBuilds, MainlineCatalog};
use kernup_core::client::MainlineClient;
use kernup_core::config::KernupConfig;
use kernup_core::error::{KernupError, Result};
use kernup_core::helper::{active_kernel, snapshot_from};
use kernup_core::inventory::{append_mainline, kernel_records, render};
use kernup_core::logger::{LogLevel, Logger};
use kernup_core::mainline::{
    filter_versions, host_arch, BuildFile, MainlineBranch, MainlineFilter, SupportMap, BRANCHES,
    VERSIONED_BUILDS,
};
use kernup_core::packages::PackageSnapshot;
use kernup_core::protocol::{error_line, KernelRecord};
use kernup_core::report::{build_report, print_summary, write_report};
use kernup_core::selector::{ActiveKernel, KernelSelector, MainlineTarget};
use kernup_core::support::{classify, ReleaseDates};

/// Command-line arguments for Kernup-Core.
#[derive(Debug, Parser)]
#[command(
    name = "Kernup-Core",
    version,
    author = "Synavera Systems",
    about = "Kernel upgrade recommendations for the update manager"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recommend at most one kernel upgrade for the running kernel.
    Recommend(RecommendArgs),
    /// Emit kernel records on stdout.
    Kernels(KernelsArgs),
    /// Refresh and list the mainline catalog.
    Mainline(MainlineArgs),
    /// Download and verify the files of one mainline build.
    Download(DownloadArgs),
}

#[derive(Debug, Args)]
struct SnapshotArgs {
    /// Read the package snapshot from a file instead of the helper command.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RecommendArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,
    /// Evaluate for this kernel release instead of the running one.
    #[arg(long, value_name = "RELEASE")]
    release: Option<String>,
    /// A priority update is pending; kernels wait for the next cycle.
    #[arg(long, action = ArgAction::SetTrue)]
    priority_pending: bool,
    /// Override report output path.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Do not write the report; print the summary only.
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct KernelsArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,
    /// Print support classification as JSON instead of records.
    #[arg(long, action = ArgAction::SetTrue)]
    classify: bool,
}

#[derive(Debug, Args)]
struct MainlineArgs {
    /// Branch name, e.g. `ppa` or `daily`.
    #[arg(long, default_value = "ppa")]
    branch: String,
    /// Fetch the kernel.org support status into the cache.
    #[arg(long, action = ArgAction::SetTrue)]
    refresh: bool,
    /// Store the newline-separated index listing in PATH as the branch catalog.
    #[arg(long, value_name = "PATH")]
    import: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct DownloadArgs {
    /// Catalog version, e.g. `6.5` or `2023-11-01`.
    version: String,
    #[arg(long, default_value = "ppa")]
    branch: String,
    /// Directory receiving the files.
    #[arg(long, value_name = "DIR")]
    dest: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Kernup-Core] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = KernupConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("core_{session_stamp}.log"))));
    let threshold = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let logger = Logger::new(log_path, threshold)?;
    logger.info("INIT", "Kernup Core awakening.");

    let outcome = match &cli.command {
        Command::Recommend(args) => recommend(&config, args, &logger).await,
        Command::Kernels(args) => kernels(&config, args, &logger).await,
        Command::Mainline(args) => mainline(&config, args, &logger).await,
        Command::Download(args) => download(&config, args, &logger).await,
    };
    if let Err(err) = &outcome {
        logger.error("FATAL", err.to_string());
    }
    logger.info("COMPLETE", "Kernup Core at rest.");
    logger.finalize()?;
    outcome.map(|()| ExitCode::SUCCESS)
}

async fn load_snapshot(
    config: &KernupConfig,
    args: &SnapshotArgs,
    logger: &Logger,
) -> Result<PackageSnapshot> {
    let snapshot = snapshot_from(
        args.snapshot.as_deref(),
        &config.helpers.snapshot_command,
        Duration::from_secs(config.helpers.timeout),
    )
    .await?;
    logger.info("PACKAGES", format!("Snapshot holds {} packages", snapshot.len()));
    Ok(snapshot)
}

async fn recommend(config: &KernupConfig, args: &RecommendArgs, logger: &Logger) -> Result<()> {
    let selector_config = config.selector_config()?;
    let snapshot = load_snapshot(config, &args.snapshot, logger).await?;
    let active = match &args.release {
        Some(release) => ActiveKernel::new(release.as_str()),
        None => active_kernel().await?,
    };
    logger.info(
        "ACTIVE",
        format!("Running kernel {} flavor {}", active.release, selector_config.flavor),
    );

    let catalog = CachedCatalog::new(config.catalog_cache(), selector_config.flavor, host_arch());
    let mut selector = KernelSelector::new(&snapshot, &selector_config, logger);
    if selector_config.use_mainline {
        selector = selector.with_catalog(&catalog);
    }
    let mut recommendation = selector.recommend(&active, args.priority_pending);

    // The build cache only remembers the last probed version; fetch the
    // target's file list when it is missing and decide again.
    if recommendation.is_none() && !args.priority_pending {
        if let Some(target) = selector.mainline_target(&active) {
            if let Err(KernupError::Network(_)) = catalog.file_list(target.branch, &target.version) {
                if let Some(files) = fetch_target(config, &catalog, &target, logger).await {
                    let fetched = FetchedBuilds::new(&catalog).with_build(
                        target.branch,
                        &target.version,
                        files,
                    );
                    recommendation = KernelSelector::new(&snapshot, &selector_config, logger)
                        .with_catalog(&fetched)
                        .recommend(&active, args.priority_pending);
                }
            }
        }
    }

    let document = build_report(&active, &selector_config, args.priority_pending, recommendation);
    if args.dry_run {
        print_summary(&document);
        return Ok(());
    }
    let report_path = args.report.clone().unwrap_or_else(|| config.report_path());
    write_report(&document, &report_path)?;
    logger.info("REPORT", format!("Report written to {}", report_path.display()));
    print_summary(&document);
    Ok(())
}

async fn fetch_target(
    config: &KernupConfig,
    catalog: &CachedCatalog,
    target: &MainlineTarget,
    logger: &Logger,
) -> Option<Vec<BuildFile>> {
    logger.info(
        "MAINLINE",
        format!("Fetching file list of mainline kernel {}", target.version),
    );
    let fetched = match MainlineClient::new(&config.mainline) {
        Ok(client) => {
            client
                .fetch_build(
                    catalog.cache(),
                    target.branch,
                    &target.version,
                    config.flavor(),
                    host_arch(),
                )
                .await
        }
        Err(err) => Err(err),
    };
    match fetched {
        Ok(files) => Some(files),
        Err(err) => {
            logger.warn(
                "MAINLINE",
                format!("File list of mainline kernel {} unavailable: {err}", target.version),
            );
            None
        }
    }
}

async fn kernels(config: &KernupConfig, args: &KernelsArgs, logger: &Logger) -> Result<()> {
    let gathered = gather_records(config, args, logger).await;
    let (records, upstream) = match gathered {
        Ok(gathered) => gathered,
        Err(err) => {
            // Consumers discard the whole batch on this line.
            println!("{}", error_line());
            return Err(err);
        }
    };

    if args.classify {
        let release_dates = ReleaseDates::load(&config.paths.distro_info);
        let today = Local::now().date_naive();
        let candidates = classify(&records, &release_dates, upstream.as_ref(), today);
        let body = serde_json::to_string_pretty(&candidates).map_err(|err| {
            KernupError::Serialization(format!("Failed to encode kernel list: {err}"))
        })?;
        println!("{body}");
    } else {
        print!("{}", render(&records));
    }
    Ok(())
}

async fn gather_records(
    config: &KernupConfig,
    args: &KernelsArgs,
    logger: &Logger,
) -> Result<(Vec<KernelRecord>, Option<SupportMap>)> {
    let flavor = config.flavor();
    let snapshot = load_snapshot(config, &args.snapshot, logger).await?;
    let active = active_kernel().await?;
    let release_dates = ReleaseDates::load(&config.paths.distro_info);
    if release_dates.is_empty() {
        logger.warn("DISTRO", "No distro release dates found");
    }
    let mut records = kernel_records(&snapshot, &active.release, flavor, &release_dates);
    logger.info("KERNELS", format!("{} distro and local kernels", records.len()));

    let catalog = CachedCatalog::new(config.catalog_cache(), flavor, host_arch());
    let upstream = catalog.support_status().ok();
    if config.mainline.enabled {
        let filter =
            MainlineFilter::listing(config.mainline.include_rc, config.mainline.include_longterm);
        match catalog.available_versions(&VERSIONED_BUILDS) {
            Ok(available) => {
                let versions = filter_versions(&available, upstream.as_ref(), &filter);
                logger.info("MAINLINE", format!("{} mainline kernels listed", versions.len()));
                append_mainline(&mut records, &versions, flavor);
            }
            Err(err) => logger.warn(
                "MAINLINE",
                format!("List of available mainline kernels could not be retrieved: {err}"),
            ),
        }
    }
    Ok((records, upstream))
}

async fn mainline(config: &KernupConfig, args: &MainlineArgs, logger: &Logger) -> Result<()> {
    let branch = branch_by_name(&args.branch)?;
    let cache = config.catalog_cache();

    if args.refresh {
        let client = MainlineClient::new(&config.mainline)?;
        let map = client.refresh_support_status(&cache).await?;
        logger.info("SUPPORT", format!("kernel.org lists {} series", map.len()));
    }
    if let Some(path) = &args.import {
        import_index(&cache, branch, path, logger)?;
    }

    let catalog = CachedCatalog::new(cache, config.flavor(), host_arch());
    if branch.is_daily {
        println!("{}", catalog.daily_build(branch)?);
        return Ok(());
    }
    let support = catalog.support_status().ok();
    let filter =
        MainlineFilter::listing(config.mainline.include_rc, config.mainline.include_longterm);
    let available = catalog.available_versions(branch)?;
    for version in filter_versions(&available, support.as_ref(), &filter) {
        println!("{version}");
    }
    Ok(())
}

fn import_index(
    cache: &CatalogCache,
    branch: &MainlineBranch,
    path: &Path,
    logger: &Logger,
) -> Result<()> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        KernupError::Filesystem(format!("Failed to read index {}: {err}", path.display()))
    })?;
    let entries: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    let stored = if branch.is_daily {
        match entries.first() {
            Some(latest) => cache.store_daily(branch, latest)?,
            None => false,
        }
    } else {
        cache.store_versions(branch, &entries)?
    };
    if stored {
        logger.info("CATALOG", format!("Cached {} index entries", entries.len()));
    } else {
        logger.warn("CATALOG", "Index not cached (empty listing or not root)");
    }
    Ok(())
}

async fn download(config: &KernupConfig, args: &DownloadArgs, logger: &Logger) -> Result<()> {
    let branch = branch_by_name(&args.branch)?;
    let client = MainlineClient::new(&config.mainline)?;
    let cache = config.catalog_cache();
    let arch = host_arch();

    let files = client
        .fetch_build(&cache, branch, &args.version, config.flavor(), arch)
        .await?;
    let base_url = branch.versioned_url(&config.mainline.base_url, &args.version);
    logger.info(
        "DOWNLOAD",
        format!("Fetching {} files from {base_url}", files.len()),
    );
    let paths = client.download(&base_url, &files, &args.dest).await?;
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}

fn branch_by_name(name: &str) -> Result<&'static MainlineBranch> {
    BRANCHES
        .iter()
        .find(|branch| branch.name == name)
        .ok_or_else(|| KernupError::Config(format!("Unknown mainline branch `{name}`")))
}
