/*============================================================
  Synavera Project: Kernup
  Module: kernup_core::client
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    HTTP side of the mainline catalog: kernel.org support
    status, build probes, file sizes, downloads and checksum
    verification against the published CHECKSUMS file.

  Security / Safety Notes:
    Every request carries a timeout. Remote file names are
    reduced to a bare file name before touching the disk. A
    failed or unverified download removes the whole set.

  Dependencies:
    reqwest for HTTP, tokio for concurrency and file IO,
    sha2 for digests, serde_json for kernel.org releases.

  Operational Scope:
    Privileged refresh of the catalog cache and the
    `download` command.

  Revision History:
    2026-03-18 COD  Adapted HTTP client for the mainline archive.
    2026-04-02 COD  Cache FAILED marker on broken builds.
    2026-05-07 COD  Remove partial downloads on any failure.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Bounded parallelism and retries
    - Verify before handing files to the installer
============================================================*/

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_LENGTH;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use crate::catalog::{matching_files, CachedBuild, CatalogCache, MIN_BUILD_FILES};
use crate::config::MainlineConfig;
use crate::error::{KernupError, Result};
use crate::kernel::Flavor;
use crate::mainline::{catalog_series, BuildFile, MainlineBranch, SeriesStatus, SupportMap};

const CHECKSUMS_FILE: &str = "CHECKSUMS";
const SHA256_SECTION: &str = "Checksums-Sha256:";
const READ_BLOCK: usize = 65536;

/// Client for the mainline build archive and kernel.org.
#[derive(Clone)]
pub struct MainlineClient {
    client: reqwest::Client,
    root: String,
    support_url: String,
    timeout: Duration,
    max_retries: usize,
    max_parallel_requests: usize,
}

impl MainlineClient {
    pub fn new(config: &MainlineConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout.max(1));
        // Downloads stream large bodies, so only connecting is bounded client-wide.
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("Kernup-Core/", env!("CARGO_PKG_VERSION"), " (linux)"))
            .build()
            .map_err(|err| KernupError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            root: config.base_url.clone(),
            support_url: config.support_url.clone(),
            timeout,
            max_retries: config.max_retries.max(1),
            max_parallel_requests: config.max_parallel_requests.max(1),
        })
    }

    /// Fetch the kernel.org series status and store it in the cache.
    pub async fn refresh_support_status(&self, cache: &CatalogCache) -> Result<SupportMap> {
        let body = self.get_text(&self.support_url).await?;
        let map = parse_releases(&body)?;
        cache.store_support_status(&map)?;
        Ok(map)
    }

    /// Probe the build folder of `version` and cache its installable files.
    ///
    /// A build page carrying the failure marker for `arch` is cached as
    /// FAILED and never probed again.
    pub async fn fetch_build(
        &self,
        cache: &CatalogCache,
        branch: &MainlineBranch,
        version: &str,
        flavor: Flavor,
        arch: &str,
    ) -> Result<Vec<BuildFile>> {
        let unavailable = || KernupError::KernelUnavailable {
            version: version.to_string(),
        };
        if let Some(CachedBuild::Failed) = cache.load_build(branch, version) {
            return Err(unavailable());
        }

        let folder = branch.versioned_url(&self.root, version);
        let page = self.get_text(&folder).await?;
        if page.contains(&format!("Build for {arch} failed")) {
            cache.mark_unavailable(branch, version)?;
            return Err(unavailable());
        }

        let checksums = self.get_text(&format!("{folder}{CHECKSUMS_FILE}")).await?;
        let entries = checksum_entries(&checksums).ok_or_else(|| {
            KernupError::Parse(format!("{folder}{CHECKSUMS_FILE} has no SHA-256 section"))
        })?;
        let listed: Vec<BuildFile> = entries
            .into_iter()
            .filter(|(_, name)| name.ends_with(".deb"))
            .map(|(_, name)| BuildFile {
                filename: name.to_string(),
                size: 0,
            })
            .collect();
        let mut files = matching_files(listed, flavor, arch);
        if files.len() < MIN_BUILD_FILES {
            return Err(unavailable());
        }

        self.fill_sizes(&folder, &mut files).await?;
        cache.store_build(branch, version, &files)?;
        Ok(files)
    }

    /// Fill zero sizes from `Content-Length`; unanswered probes keep zero.
    pub async fn fill_sizes(&self, base_url: &str, files: &mut [BuildFile]) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel_requests));
        let mut tasks = Vec::new();

        for (index, file) in files.iter().enumerate() {
            if file.size > 0 {
                continue;
            }
            let client = self.clone();
            let semaphore = semaphore.clone();
            let url = format!("{base_url}{}", file.filename);
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| KernupError::Runtime("Size probe semaphore closed".into()))?;
                Ok::<_, KernupError>((index, client.content_length(&url).await))
            }));
        }

        for task in tasks {
            let (index, size) = task
                .await
                .map_err(|err| KernupError::Runtime(format!("Size probe task failed: {err}")))??;
            if let Some(size) = size {
                files[index].size = size;
            }
        }
        Ok(())
    }

    async fn content_length(&self, url: &str) -> Option<u64> {
        let response = self
            .client
            .head(url)
            .timeout(self.timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
    }

    /// Download `files` from `base_url` into `dest` and verify them.
    ///
    /// Returns the local paths in input order. On any failure every file of
    /// the set is removed again.
    pub async fn download(
        &self,
        base_url: &str,
        files: &[BuildFile],
        dest: &Path,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dest).await.map_err(|err| {
            KernupError::Filesystem(format!(
                "Failed to create download directory {}: {err}",
                dest.display()
            ))
        })?;

        let mut downloaded = Vec::with_capacity(files.len());
        for file in files {
            let target = match local_name(&file.filename) {
                Ok(name) => dest.join(name),
                Err(err) => {
                    remove_files(&downloaded).await;
                    return Err(err);
                }
            };
            downloaded.push(target.clone());
            let url = format!("{base_url}{}", file.filename);
            if let Err(err) = self.download_file(&url, &target).await {
                remove_files(&downloaded).await;
                return Err(err);
            }
        }

        let verified = match self.get_text(&format!("{base_url}{CHECKSUMS_FILE}")).await {
            Ok(checksums) => verify_checksums(&checksums, &downloaded),
            Err(err) => Err(err),
        };
        match verified {
            Ok(true) => Ok(downloaded),
            Ok(false) => {
                remove_files(&downloaded).await;
                Err(KernupError::Network(
                    "Checksum verification of downloaded files failed".into(),
                ))
            }
            Err(err) => {
                remove_files(&downloaded).await;
                Err(err)
            }
        }
    }

    async fn download_file(&self, url: &str, target: &Path) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.fetch_to_file(url, target).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(err);
                    }
                    sleep(backoff(attempt)).await;
                }
            }
        }
    }

    async fn fetch_to_file(&self, url: &str, target: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| KernupError::Network(format!("Request to {url} failed: {err}")))?;
        if !response.status().is_success() {
            return Err(KernupError::Network(format!(
                "Request to {url} failed with status {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(target).await.map_err(|err| {
            KernupError::Filesystem(format!("Failed to create {}: {err}", target.display()))
        })?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| KernupError::Network(format!("Download of {url} failed: {err}")))?
        {
            file.write_all(&chunk).await.map_err(|err| {
                KernupError::Filesystem(format!("Failed to write {}: {err}", target.display()))
            })?;
        }
        file.flush().await.map_err(|err| {
            KernupError::Filesystem(format!("Failed to flush {}: {err}", target.display()))
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .get(url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|err| KernupError::Network(format!("Request to {url} failed: {err}")))?;
            let status = response.status();

            if status.is_success() {
                return response.text().await.map_err(|err| {
                    KernupError::Network(format!("Failed to read response from {url}: {err}"))
                });
            }
            attempt += 1;
            if status.is_client_error() || attempt >= self.max_retries {
                return Err(KernupError::Network(format!(
                    "Request {url} failed with status {status} after {attempt} attempts"
                )));
            }
            sleep(backoff(attempt)).await;
        }
    }
}

fn backoff(attempt: usize) -> Duration {
    let exponent = (attempt as u32).min(8);
    Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent))
}

async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        let _ = tokio::fs::remove_file(path).await;
    }
}

/// Bare file name of a remote entry such as `amd64/linux-...deb`.
fn local_name(filename: &str) -> Result<&str> {
    match filename.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name),
        _ => Err(KernupError::Parse(format!(
            "Refusing to store remote file `{filename}`"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ReleasesDocument {
    #[serde(default)]
    releases: Vec<ReleaseEntry>,
}

#[derive(Debug, Deserialize)]
struct ReleaseEntry {
    moniker: String,
    version: String,
    #[serde(default)]
    iseol: bool,
}

/// Series status map from kernel.org `releases.json`.
///
/// The first entry of a series wins; `linux-next` snapshots carry no series.
pub fn parse_releases(text: &str) -> Result<SupportMap> {
    let document: ReleasesDocument = serde_json::from_str(text).map_err(|err| {
        KernupError::Parse(format!("Failed to decode kernel.org releases: {err}"))
    })?;
    let mut map = SupportMap::new();
    for entry in document.releases {
        let Some((series, _)) = catalog_series(&entry.version) else {
            continue;
        };
        let status = if entry.iseol {
            SeriesStatus::Eol
        } else {
            SeriesStatus::from(entry.moniker)
        };
        map.entry(series).or_insert(status);
    }
    if map.is_empty() {
        return Err(KernupError::Parse("kernel.org lists no kernel series".into()));
    }
    Ok(map)
}

/// `(digest, path)` pairs of the SHA-256 section of a CHECKSUMS file.
pub fn checksum_entries(text: &str) -> Option<Vec<(&str, &str)>> {
    let (_, section) = text.split_once(SHA256_SECTION)?;
    Some(
        section
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                match (fields.next(), fields.next(), fields.next()) {
                    (Some(digest), Some(name), None) => Some((digest, name)),
                    _ => None,
                }
            })
            .collect(),
    )
}

/// Check every file against the SHA-256 section of `checksums`.
///
/// Files without a listed digest fail verification.
pub fn verify_checksums(checksums: &str, files: &[PathBuf]) -> Result<bool> {
    let Some(entries) = checksum_entries(checksums) else {
        return Ok(false);
    };
    for path in files {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return Ok(false);
        };
        let Some((expected, _)) = entries
            .iter()
            .find(|(_, listed)| listed.rsplit('/').next() == Some(name))
        else {
            return Ok(false);
        };
        if !sha256_file(path)?.eq_ignore_ascii_case(expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|err| {
        KernupError::Filesystem(format!("Failed to open {}: {err}", path.display()))
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; READ_BLOCK];
    loop {
        let read = file.read(&mut buffer).map_err(|err| {
            KernupError::Filesystem(format!("Failed to read {}: {err}", path.display()))
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &str = "linux-headers-6.3.0-060300_6.3.0-060300.202304232030_all.deb";
    const IMAGE: &str =
        "linux-image-unsigned-6.3.0-060300-generic_6.3.0-060300.202304232030_amd64.deb";

    fn digest(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    fn write(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn checksum_section_is_selected() {
        let text = format!(
            "# Checksums-Sha1:\nabc  {HEADERS}\n# Checksums-Sha256:\n{}  amd64/{IMAGE}\nnoise\n",
            "f".repeat(64)
        );
        let entries = checksum_entries(&text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, format!("amd64/{IMAGE}"));
        assert!(checksum_entries("nothing here").is_none());
    }

    #[test]
    fn downloaded_files_verify_against_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let headers = write(dir.path(), HEADERS, b"headers");
        let image = write(dir.path(), IMAGE, b"image");
        let checksums = format!(
            "Checksums-Sha256:\n{}  {HEADERS}\n{}  amd64/{IMAGE}\n",
            digest(b"headers"),
            digest(b"image")
        );
        assert!(verify_checksums(&checksums, &[headers.clone(), image.clone()]).unwrap());

        std::fs::write(&image, b"tampered").unwrap();
        assert!(!verify_checksums(&checksums, &[headers.clone(), image]).unwrap());

        let unlisted = write(dir.path(), "extra.deb", b"extra");
        assert!(!verify_checksums(&checksums, &[headers, unlisted]).unwrap());
        assert!(!verify_checksums("no section", &[]).unwrap());
    }

    #[test]
    fn kernel_org_releases_map_to_series_status() {
        let text = r#"{
            "latest_stable": {"version": "6.5.5"},
            "releases": [
                {"iseol": false, "version": "6.6-rc3", "moniker": "mainline"},
                {"iseol": false, "version": "6.5.5", "moniker": "stable"},
                {"iseol": true, "version": "6.4.16", "moniker": "stable"},
                {"iseol": false, "version": "6.1.55", "moniker": "longterm"},
                {"iseol": false, "version": "6.1.54", "moniker": "stable"},
                {"iseol": false, "version": "next-20230929", "moniker": "linux-next"}
            ]
        }"#;
        let map = parse_releases(text).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map["6.6"], SeriesStatus::Mainline);
        assert_eq!(map["6.5"], SeriesStatus::Stable);
        assert_eq!(map["6.4"], SeriesStatus::Eol);
        assert_eq!(map["6.1"], SeriesStatus::Longterm);

        assert!(matches!(parse_releases("{\"releases\": []}"), Err(KernupError::Parse(_))));
        assert!(matches!(parse_releases("<html>"), Err(KernupError::Parse(_))));
    }

    #[test]
    fn remote_names_are_reduced_to_file_names() {
        assert_eq!(local_name(&format!("amd64/{IMAGE}")).unwrap(), IMAGE);
        assert!(local_name("amd64/..").is_err());
        assert!(local_name("amd64/").is_err());
    }
}
