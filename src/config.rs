use crate::error::Result;
use std::env;
use std::time::Duration;
use url::Url;

/// The production API root. Endpoint paths are joined onto it.
pub const DEFAULT_API_URL: &str = "https://api.hyper3d.com/api/v2/";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "HYPER3D_API_KEY";

/// Environment variable overriding [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "HYPER3D_API_URL";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 60;

/// Connection settings for [`RodinClient`](crate::RodinClient).
///
/// The key is plain data: nothing in the library reads the process
/// environment except [`ClientConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token. An empty key is accepted here and rejected at submission.
    pub api_key: String,
    pub base_url: Url,
    /// Timeout for the upload-heavy submission request.
    pub submit_timeout: Duration,
    /// Timeout for status and download-list requests.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Creates a config for the production API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Creates a config pointing at a custom API root, e.g. a mock server.
    ///
    /// A trailing slash is added if missing so that endpoint paths join
    /// underneath the root rather than replacing its last segment.
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            submit_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        })
    }

    /// Reads `HYPER3D_API_KEY` and `HYPER3D_API_URL` from the environment.
    ///
    /// A missing key is not an error here; it surfaces as an authentication
    /// failure when a task is submitted.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(API_KEY_ENV).unwrap_or_default();
        let base_url = env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::with_base_url(api_key, &base_url)
    }
}

/// How often and how many times the status of a task is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_retries: u32,
}

impl PollSettings {
    pub fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_RETRIES)
    }
}
