use crate::error::{RodinError, Result};
use crate::images;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// The maximum number of reference images a single request may carry.
pub const MAX_IMAGES: usize = 5;

/// How long a download link stays valid after the API issues it.
pub const DOWNLOAD_WINDOW_SECS: i64 = 600;

/// Declares a string-valued option enum with its wire names.
///
/// Every variant gets `Serialize`/`Deserialize`, `Display` and `clap::ValueEnum`
/// using the exact spelling the API expects, so the CLI, preset files and
/// request bodies all accept the same names.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }
        $(default $default:ident)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                #[value(name = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// The value sent to the API.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        $(
            impl Default for $name {
                fn default() -> Self {
                    $name::$default
                }
            }
        )?

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// The generation preset, trading speed for fidelity.
    Tier {
        Gen2 => "Gen-2",
        Detail => "Detail",
        Smooth => "Smooth",
        Regular => "Regular",
        Sketch => "Sketch",
    }
    default Gen2
}

wire_enum! {
    /// The file format of the generated geometry.
    GeometryFileFormat {
        Glb => "glb",
        Usdz => "usdz",
        Fbx => "fbx",
        Obj => "obj",
        Stl => "stl",
    }
    default Glb
}

wire_enum! {
    /// Polygon budget of the generated mesh.
    Quality {
        High => "high",
        Medium => "medium",
        Low => "low",
        ExtraLow => "extra-low",
    }
    default Medium
}

wire_enum! {
    /// Material type baked into the model.
    Material {
        Pbr => "PBR",
        Shaded => "Shaded",
        All => "All",
    }
    default Pbr
}

wire_enum! {
    /// Face topology of the generated mesh.
    MeshMode {
        /// Triangular faces.
        Raw => "Raw",
        /// Quadrilateral faces.
        Quad => "Quad",
    }
    default Quad
}

wire_enum! {
    /// Paid add-on features.
    Addon {
        /// 4K textures.
        HighPack => "HighPack",
    }
}

/// Bounding box constraint, in the order the API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
    pub length: u32,
}

impl BoundingBox {
    pub fn as_array(&self) -> [u32; 3] {
        [self.width, self.height, self.length]
    }
}

/// Every option recognised by the generation endpoint, with its default.
///
/// Deserializing rejects unknown keys, so a preset file with a typo fails
/// instead of being silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct GenerationOptions {
    pub tier: Tier,
    pub geometry_file_format: GeometryFileFormat,
    pub quality: Quality,
    pub material: Material,
    pub mesh_mode: MeshMode,
    pub use_original_alpha: bool,
    pub seed: Option<u16>,
    /// Custom polygon count, overriding `quality`.
    pub quality_override: Option<u32>,
    /// Generate a T/A pose for human-like models.
    #[serde(rename = "tapose")]
    pub ta_pose: bool,
    pub bbox_condition: Option<BoundingBox>,
    pub addons: Vec<Addon>,
    pub preview_render: bool,
}

impl GenerationOptions {
    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RodinError::Validation(format!("invalid generation options: {e}")))
    }

    fn validate(&self) -> Result<()> {
        if self.quality_override == Some(0) {
            return Err(RodinError::Validation(
                "quality_override must be a positive polygon count".to_string(),
            ));
        }
        if let Some(bbox) = &self.bbox_condition {
            if bbox.as_array().contains(&0) {
                return Err(RodinError::Validation(
                    "bbox_condition dimensions must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The primary content a model is generated from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// One to five local reference images.
    Images(Vec<PathBuf>),
    /// A text description of the model.
    Prompt(String),
}

/// A validated generation request.
///
/// Construction checks the whole request locally, so a value of this type is
/// always safe to submit without a round trip to the API to find out it is malformed.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    source: InputSource,
    options: GenerationOptions,
}

impl GenerationRequest {
    /// Builds an image-to-model request, validating each image on disk.
    pub fn from_images<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
        options: GenerationOptions,
    ) -> Result<Self> {
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        let request = Self {
            source: InputSource::Images(paths),
            options,
        };
        request.check_shape()?;
        if let InputSource::Images(paths) = &request.source {
            for path in paths {
                images::validate_image(path)?;
            }
        }
        Ok(request)
    }

    /// Builds a text-to-model request.
    pub fn from_prompt(prompt: impl Into<String>, options: GenerationOptions) -> Result<Self> {
        let request = Self {
            source: InputSource::Prompt(prompt.into()),
            options,
        };
        request.check_shape()?;
        Ok(request)
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Checks the structural invariants that need no filesystem access.
    pub(crate) fn check_shape(&self) -> Result<()> {
        match &self.source {
            InputSource::Images(images) if images.is_empty() => {
                return Err(RodinError::Validation(
                    "at least one image is required".to_string(),
                ));
            }
            InputSource::Images(images) if images.len() > MAX_IMAGES => {
                return Err(RodinError::Validation(format!(
                    "at most {MAX_IMAGES} images are allowed, got {}",
                    images.len()
                )));
            }
            InputSource::Prompt(prompt) if prompt.trim().is_empty() => {
                return Err(RodinError::Validation("prompt must not be empty".to_string()));
            }
            _ => {}
        }
        self.options.validate()
    }
}

/// A submitted generation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The task UUID, used to fetch download links.
    pub uuid: String,
    /// The key used to poll the status of the task's jobs.
    pub subscription_key: String,
}

/// The aggregated status of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting in the remote queue.
    Queued,
    /// At least one job is generating.
    Running,
    /// Every job finished.
    Succeeded,
    /// A job failed; `reason` is the remote explanation.
    Failed { reason: String },
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed { .. })
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Queued => f.write_str("queued"),
            TaskStatus::Running => f.write_str("running"),
            TaskStatus::Succeeded => f.write_str("succeeded"),
            TaskStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// A short-lived URL to one generated artifact.
///
/// Links are only created from a fresh download-list response and are not
/// serializable, so they cannot outlive the process that fetched them.
#[derive(Debug, Clone)]
pub struct DownloadLink {
    pub url: Url,
    /// The artifact's declared file name.
    pub name: String,
    pub issued_at: DateTime<Utc>,
}

impl DownloadLink {
    pub fn new(url: Url, name: impl Into<String>) -> Self {
        Self {
            url,
            name: name.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + ChronoDuration::seconds(DOWNLOAD_WINDOW_SECS)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// The local files produced by a successful generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub files: Vec<PathBuf>,
}

// Wire types.

/// (Internal) JSON body for a prompt-only submission.
#[derive(Serialize, Debug)]
pub(crate) struct PromptSubmission<'a> {
    pub(crate) prompt: &'a str,
    pub(crate) tier: Tier,
    pub(crate) geometry_file_format: GeometryFileFormat,
    pub(crate) material: Material,
    pub(crate) quality: Quality,
    pub(crate) mesh_mode: MeshMode,
    pub(crate) use_original_alpha: bool,
    #[serde(rename = "TAPose")]
    pub(crate) ta_pose: bool,
    pub(crate) preview_render: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) seed: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) quality_override: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) bbox_condition: Option<[u32; 3]>,
    #[serde(skip_serializing_if = "no_addons")]
    pub(crate) addons: &'a [Addon],
}

fn no_addons(addons: &&[Addon]) -> bool {
    addons.is_empty()
}

impl<'a> PromptSubmission<'a> {
    pub(crate) fn new(prompt: &'a str, options: &'a GenerationOptions) -> Self {
        Self {
            prompt,
            tier: options.tier,
            geometry_file_format: options.geometry_file_format,
            material: options.material,
            quality: options.quality,
            mesh_mode: options.mesh_mode,
            use_original_alpha: options.use_original_alpha,
            ta_pose: options.ta_pose,
            preview_render: options.preview_render,
            seed: options.seed,
            quality_override: options.quality_override,
            bbox_condition: options.bbox_condition.map(|b| b.as_array()),
            addons: &options.addons,
        }
    }
}

/// (Internal) The response to a submission.
#[derive(Deserialize, Debug)]
pub(crate) struct SubmitResponse {
    pub(crate) uuid: String,
    pub(crate) jobs: SubmittedJobs,
}

#[derive(Deserialize, Debug)]
pub(crate) struct SubmittedJobs {
    pub(crate) subscription_key: String,
}

/// (Internal) Body of a status query.
#[derive(Serialize, Debug)]
pub(crate) struct StatusQuery<'a> {
    pub(crate) subscription_key: &'a str,
}

/// (Internal) The per-job states reported by the status endpoint.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum JobState {
    Waiting,
    Generating,
    Done,
    Failed,
}

#[derive(Deserialize, Debug)]
pub(crate) struct JobStatus {
    pub(crate) status: JobState,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub(crate) jobs: Vec<JobStatus>,
}

/// (Internal) Body of a download-list query.
#[derive(Serialize, Debug)]
pub(crate) struct DownloadQuery<'a> {
    pub(crate) task_uuid: &'a str,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DownloadItem {
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DownloadResponse {
    #[serde(default)]
    pub(crate) list: Vec<DownloadItem>,
}

/// (Internal) An error reported inside an otherwise well-formed body.
#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorBody {
    pub(crate) error: serde_json::Value,
}
