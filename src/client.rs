use crate::config::ClientConfig;
use crate::error::{RodinError, Result};
use crate::types::{
    ApiErrorBody, DownloadLink, DownloadQuery, DownloadResponse, GenerationOptions,
    GenerationRequest, InputSource, JobState, PromptSubmission, StatusQuery, StatusResponse,
    SubmitResponse, Task, TaskStatus,
};
use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info};
use url::Url;

/// The remote operations the generation workflow is built on.
///
/// [`RodinClient`] is the HTTP implementation. None of the methods retry;
/// the [`TaskPoller`](crate::TaskPoller) owns the retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submits a generation request and returns the created task.
    async fn submit(&self, request: &GenerationRequest) -> Result<Task>;

    /// Queries the current status of a task.
    async fn check_status(&self, task: &Task) -> Result<TaskStatus>;

    /// Requests the download links of a task whose last observed status is
    /// [`TaskStatus::Succeeded`].
    ///
    /// # Errors
    ///
    /// Returns [`RodinError::State`] without contacting the API if `status`
    /// is anything other than `Succeeded`.
    async fn fetch_download_links(
        &self,
        task: &Task,
        status: &TaskStatus,
    ) -> Result<Vec<DownloadLink>>;
}

/// The HTTP client for the Hyper3D Rodin API.
///
/// It holds the shared `reqwest::Client` and is cheap to clone.
#[derive(Clone)]
pub struct RodinClient {
    client: reqwest::Client,
    config: ClientConfig,
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Submit,
    Status,
    Download,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Submit => "rodin",
            Endpoint::Status => "status",
            Endpoint::Download => "download",
        }
    }
}

impl RodinClient {
    /// Creates a new `RodinClient` from explicit configuration.
    ///
    /// # Errors
    ///
    /// - `RodinError::Transport` if the internal HTTP client fails to build.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rodin3d/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url> {
        Ok(self.config.base_url.join(endpoint.path())?)
    }

    async fn image_form(
        &self,
        images: &[PathBuf],
        options: &GenerationOptions,
    ) -> Result<multipart::Form> {
        let mut form = multipart::Form::new()
            .text("tier", options.tier.as_str())
            .text("geometry_file_format", options.geometry_file_format.as_str())
            .text("material", options.material.as_str())
            .text("quality", options.quality.as_str())
            .text("mesh_mode", options.mesh_mode.as_str())
            .text("use_original_alpha", options.use_original_alpha.to_string())
            .text("TAPose", options.ta_pose.to_string())
            .text("preview_render", options.preview_render.to_string());

        if let Some(seed) = options.seed {
            form = form.text("seed", seed.to_string());
        }
        if let Some(quality_override) = options.quality_override {
            form = form.text("quality_override", quality_override.to_string());
        }
        if let Some(bbox) = &options.bbox_condition {
            let joined = bbox
                .as_array()
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            form = form.text("bbox_condition", joined);
        }
        if !options.addons.is_empty() {
            let joined = options
                .addons
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(",");
            form = form.text("addons", joined);
        }

        for image in images {
            let path = image.as_path();
            let file = File::open(path).await?;
            let stream = FramedRead::new(file, BytesCodec::new());
            let body = reqwest::Body::wrap_stream(stream);

            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    RodinError::Validation(format!(
                        "could not determine file name of {}",
                        path.display()
                    ))
                })?
                .to_string();
            let mime_type = mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string();

            let part = multipart::Part::stream(body)
                .file_name(file_name)
                .mime_str(&mime_type)?;
            form = form.part("images", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl Transport for RodinClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Task> {
        request.check_shape()?;
        if self.config.api_key.trim().is_empty() {
            return Err(RodinError::Auth(format!(
                "no API key configured; set {} or pass one explicitly",
                crate::config::API_KEY_ENV
            )));
        }

        let url = self.url(Endpoint::Submit)?;
        let builder = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.submit_timeout);

        let builder = match request.source() {
            InputSource::Images(images) => {
                info!(count = images.len(), "submitting image-to-model task");
                builder.multipart(self.image_form(images, request.options()).await?)
            }
            InputSource::Prompt(prompt) => {
                info!("submitting text-to-model task");
                builder.json(&PromptSubmission::new(prompt, request.options()))
            }
        };

        let response = builder.send().await?;
        let submitted: SubmitResponse = read_json(response, Endpoint::Submit).await?;
        info!(task = %submitted.uuid, "task submitted");

        Ok(Task {
            uuid: submitted.uuid,
            subscription_key: submitted.jobs.subscription_key,
        })
    }

    async fn check_status(&self, task: &Task) -> Result<TaskStatus> {
        let url = self.url(Endpoint::Status)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&StatusQuery {
                subscription_key: &task.subscription_key,
            })
            .send()
            .await?;
        let status: StatusResponse = read_json(response, Endpoint::Status).await?;

        if status.jobs.is_empty() {
            return Err(RodinError::NotFound(format!(
                "no jobs reported for task {}",
                task.uuid
            )));
        }

        let total = status.jobs.len();
        let done = status
            .jobs
            .iter()
            .filter(|job| job.status == JobState::Done)
            .count();
        debug!(task = %task.uuid, done, total, "status checked");

        if let Some(failed) = status.jobs.iter().find(|job| job.status == JobState::Failed) {
            let reason = failed
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            return Ok(TaskStatus::Failed { reason });
        }
        if done == total {
            return Ok(TaskStatus::Succeeded);
        }
        if status
            .jobs
            .iter()
            .any(|job| job.status == JobState::Generating)
        {
            return Ok(TaskStatus::Running);
        }
        Ok(TaskStatus::Queued)
    }

    async fn fetch_download_links(
        &self,
        task: &Task,
        status: &TaskStatus,
    ) -> Result<Vec<DownloadLink>> {
        if *status != TaskStatus::Succeeded {
            return Err(RodinError::State(format!(
                "download links requested for task {} while it is {status}",
                task.uuid
            )));
        }

        let url = self.url(Endpoint::Download)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.request_timeout)
            .json(&DownloadQuery {
                task_uuid: &task.uuid,
            })
            .send()
            .await?;
        let downloads: DownloadResponse = read_json(response, Endpoint::Download).await?;

        downloads
            .list
            .into_iter()
            .map(|item| -> Result<DownloadLink> {
                let url = Url::parse(&item.url)?;
                let name = item.name.unwrap_or_default();
                Ok(DownloadLink::new(url, name))
            })
            .collect()
    }
}

/// Decodes a JSON response, mapping HTTP statuses and in-body errors onto
/// [`RodinError`] variants.
async fn read_json<T: DeserializeOwned>(response: Response, endpoint: Endpoint) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(status_error(status, error_message(&body), endpoint));
    }

    if let Ok(ApiErrorBody { error }) = serde_json::from_slice::<ApiErrorBody>(&body) {
        if !error.is_null() {
            let message = match error {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(body_error(message, endpoint));
        }
    }

    Ok(serde_json::from_slice(&body)?)
}

fn status_error(status: StatusCode, message: String, endpoint: Endpoint) -> RodinError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RodinError::Auth(message),
        StatusCode::NOT_FOUND => RodinError::NotFound(message),
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY
            if matches!(endpoint, Endpoint::Submit) =>
        {
            RodinError::Validation(message)
        }
        _ => RodinError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Maps an `{"error": ...}` body returned with a success status.
fn body_error(message: String, endpoint: Endpoint) -> RodinError {
    match endpoint {
        Endpoint::Submit => RodinError::Api {
            status: StatusCode::OK.as_u16(),
            message,
        },
        Endpoint::Status => RodinError::NotFound(message),
        Endpoint::Download => RodinError::State(message),
    }
}

fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}
