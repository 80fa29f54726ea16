use crate::error::{RodinError, Result};
use crate::types::{DownloadLink, GenerationResult};
use chrono::Utc;
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const DOWNLOAD_TIMEOUT_SECS: u64 = 60;
const FALLBACK_FILE_NAME: &str = "model.bin";

/// Streams generated artifacts to disk.
///
/// Download links are pre-signed, so requests are sent without the API key.
#[derive(Clone)]
pub struct DownloadFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl DownloadFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rodin3d/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
        })
    }

    /// Sets the per-file request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Downloads every link into `destination`, creating the directory if needed.
    ///
    /// The links are consumed: each one is fetched exactly once. Links that
    /// resolve to the same file name are saved as `name (1).ext`, `name (2).ext`
    /// and so on.
    ///
    /// # Errors
    ///
    /// - [`RodinError::ExpiredLink`] if a link's window has elapsed or the
    ///   storage host rejects it.
    /// - [`RodinError::Io`] if the file cannot be written.
    /// - [`RodinError::EmptyArtifact`] if the body was empty.
    ///
    /// A failed download never leaves its partial file behind.
    pub async fn fetch<P: AsRef<Path>>(
        &self,
        links: Vec<DownloadLink>,
        destination: P,
    ) -> Result<GenerationResult> {
        let destination = destination.as_ref();
        fs::create_dir_all(destination).await?;

        let mut files = Vec::with_capacity(links.len());
        let mut taken = HashSet::new();
        for link in links {
            let file_name = unique_name(artifact_file_name(&link), &mut taken);
            files.push(self.fetch_one(&link, destination, &file_name).await?);
        }
        Ok(GenerationResult { files })
    }

    async fn fetch_one(
        &self,
        link: &DownloadLink,
        destination: &Path,
        file_name: &str,
    ) -> Result<PathBuf> {
        if link.is_expired_at(Utc::now()) {
            return Err(RodinError::ExpiredLink(format!(
                "{} expired at {}",
                link.url,
                link.expires_at()
            )));
        }

        let file_path = destination.join(file_name);
        let part_path = destination.join(format!("{file_name}.part"));

        debug!(url = %link.url, path = %file_path.display(), "downloading artifact");
        let response = self
            .client
            .get(link.url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::GONE => {
                    RodinError::ExpiredLink(format!("{} answered {status}", link.url))
                }
                _ => RodinError::Api {
                    status: status.as_u16(),
                    message: format!("failed to download {}", link.url),
                },
            });
        }

        match stream_to_file(response, &part_path).await {
            Ok(0) => {
                discard(&part_path).await;
                Err(RodinError::EmptyArtifact(link.url.to_string()))
            }
            Ok(bytes) => {
                fs::rename(&part_path, &file_path).await?;
                info!(path = %file_path.display(), bytes, "artifact downloaded");
                Ok(file_path)
            }
            Err(e) => {
                discard(&part_path).await;
                Err(e)
            }
        }
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = fs::File::create(path).await?;
    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial download");
        }
    }
}

/// The declared artifact name, else the last URL path segment, reduced to a
/// bare file name so it cannot escape the destination directory.
fn artifact_file_name(link: &DownloadLink) -> String {
    let declared = Path::new(&link.name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty());
    let from_url = || {
        link.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
    };
    declared
        .or_else(from_url)
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let path = Path::new(&name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&name)
        .to_string();
    let extension = path.extension().and_then(|e| e.to_str());
    let mut n = 1;
    loop {
        let candidate = match extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
