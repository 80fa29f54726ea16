use crate::client::{RodinClient, Transport};
use crate::config::{ClientConfig, PollSettings};
use crate::download::DownloadFetcher;
use crate::error::{RodinError, Result};
use crate::poller::{Sleeper, TaskPoller, TokioSleeper};
use crate::types::{GenerationRequest, GenerationResult, TaskStatus};
use std::path::{Component, Path};
use tracing::{info, instrument, warn};

/// Runs the whole submit → poll → download workflow for one request.
///
/// A `Generator` holds no per-request state, so one instance can serve
/// concurrent `generate` calls. Callers must not point concurrent calls at
/// the same output directory with tasks that produce identically named files.
pub struct Generator<T = RodinClient, S = TokioSleeper> {
    transport: T,
    fetcher: DownloadFetcher,
    sleeper: S,
}

impl Generator {
    /// Builds a generator backed by the HTTP client.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(
            RodinClient::new(config)?,
            DownloadFetcher::new()?,
            TokioSleeper,
        ))
    }
}

impl<T: Transport, S: Sleeper + Clone> Generator<T, S> {
    pub fn new(transport: T, fetcher: DownloadFetcher, sleeper: S) -> Self {
        Self {
            transport,
            fetcher,
            sleeper,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Generates a model and downloads it to `<output_dir>/<task uuid>/`.
    ///
    /// Download links are requested and fetched in the same step that observes
    /// the task succeeding, so they are used well inside their validity window.
    ///
    /// # Errors
    ///
    /// - [`RodinError::GenerationFailed`] carrying the remote reason when the
    ///   task fails.
    /// - [`RodinError::Timeout`] unchanged from the poller.
    /// - Any error from submission, link retrieval or download.
    #[instrument(skip_all, fields(output = %output_dir.as_ref().display()))]
    pub async fn generate<P: AsRef<Path>>(
        &self,
        request: &GenerationRequest,
        output_dir: P,
        poll: PollSettings,
    ) -> Result<GenerationResult> {
        let task = self.transport.submit(request).await?;
        let task_dir = task_dir_name(&task.uuid)?;

        let poller = TaskPoller::with_sleeper(poll, self.sleeper.clone());
        let status = poller.wait_for_task(&self.transport, &task).await?;

        match status {
            TaskStatus::Succeeded => {
                let links = self
                    .transport
                    .fetch_download_links(&task, &status)
                    .await?;
                if links.is_empty() {
                    warn!(task = %task.uuid, "task succeeded but listed no files to download");
                }

                let destination = output_dir.as_ref().join(task_dir);
                let result = self.fetcher.fetch(links, &destination).await?;
                info!(task = %task.uuid, files = result.files.len(), "generation complete");
                Ok(result)
            }
            TaskStatus::Failed { reason } => Err(RodinError::GenerationFailed { reason }),
            other => Err(RodinError::State(format!(
                "poller returned non-terminal status {other} for task {}",
                task.uuid
            ))),
        }
    }
}

/// The task UUID must name exactly one directory below the output root.
fn task_dir_name(uuid: &str) -> Result<&str> {
    let mut components = Path::new(uuid).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == uuid => Ok(uuid),
        _ => Err(RodinError::State(format!(
            "task uuid {uuid:?} cannot be used as an output directory name"
        ))),
    }
}
