#![allow(dead_code)]

use async_trait::async_trait;
use rodin3d::{
    ClientConfig, DownloadLink, GenerationRequest, Result, RodinClient, RodinError, Sleeper, Task,
    TaskStatus, Transport,
};
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const API_KEY: &str = "test_api_key";
pub const TASK_UUID: &str = "mock-task-uuid";
pub const SUBSCRIPTION_KEY: &str = "mock-subscription-key";

pub fn client_for(server: &MockServer) -> RodinClient {
    let config = ClientConfig::with_base_url(API_KEY, &format!("{}/api/v2/", server.uri())).unwrap();
    RodinClient::new(config).unwrap()
}

pub fn task() -> Task {
    Task {
        uuid: TASK_UUID.to_string(),
        subscription_key: SUBSCRIPTION_KEY.to_string(),
    }
}

pub async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v2/rodin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": TASK_UUID,
            "jobs": {
                "uuids": ["job-1"],
                "subscription_key": SUBSCRIPTION_KEY
            }
        })))
        .mount(server)
        .await;
}

pub fn job_status_body(status: &str) -> serde_json::Value {
    json!({ "jobs": [ { "uuid": "job-1", "status": status } ] })
}

/// Answers with the given bodies in order, repeating the last one.
pub struct SequenceResponder {
    bodies: Vec<serde_json::Value>,
    calls: AtomicUsize,
}

impl SequenceResponder {
    pub fn new(bodies: Vec<serde_json::Value>) -> Self {
        Self {
            bodies,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let count = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = &self.bodies[count.min(self.bodies.len() - 1)];
        ResponseTemplate::new(200).set_body_json(body.clone())
    }
}

/// Records requested delays instead of sleeping.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// One scripted answer of [`ScriptedTransport::check_status`].
#[derive(Clone)]
pub enum Step {
    Status(TaskStatus),
    /// A transient failure (HTTP 503).
    Unavailable,
    /// A permanent failure.
    Unknown,
}

/// An in-memory transport that replays a fixed status script.
///
/// When the script runs out, the task reports `Running` forever.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    checks: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn statuses(statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        Self::new(statuses.into_iter().map(Step::Status))
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn submit(&self, _request: &GenerationRequest) -> Result<Task> {
        Ok(task())
    }

    async fn check_status(&self, _task: &Task) -> Result<TaskStatus> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step.unwrap_or(Step::Status(TaskStatus::Running)) {
            Step::Status(status) => Ok(status),
            Step::Unavailable => Err(RodinError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            Step::Unknown => Err(RodinError::NotFound("no such task".to_string())),
        }
    }

    async fn fetch_download_links(
        &self,
        _task: &Task,
        _status: &TaskStatus,
    ) -> Result<Vec<DownloadLink>> {
        Ok(Vec::new())
    }
}

/// Writes a blank PNG of the given size.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::new(width, height).save(&path).unwrap();
    path
}
