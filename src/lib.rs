//! An unofficial Rust client for the Hyper3D Rodin 3D generation API.
//!
//! This crate submits image-to-model and text-to-model tasks, waits for them
//! to finish, and downloads the generated models.
//!
//! ## Features
//! - Text-to-3D and Image-to-3D generation with every Rodin option typed.
//! - Local validation of requests and reference images before upload.
//! - Bounded fixed-interval polling with an injectable sleep for tests.
//! - Streaming downloads that never leave partial files behind.
//! - Typed error handling with a distinct kind per failure class.
//!
//! ## Example
//!
//! ```no_run
//! use rodin3d::{ClientConfig, GenerationOptions, GenerationRequest, Generator, PollSettings};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let generator = Generator::from_config(ClientConfig::from_env()?)?;
//! let request = GenerationRequest::from_prompt("A wooden chair", GenerationOptions::default())?;
//! let result = generator
//!     .generate(&request, "output", PollSettings::default())
//!     .await?;
//! for file in &result.files {
//!     println!("{}", file.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod generator;
pub mod images;
pub mod poller;
pub mod types;

pub use client::{RodinClient, Transport};
pub use config::{ClientConfig, PollSettings};
pub use download::DownloadFetcher;
pub use error::{ErrorKind, Result, RodinError};
pub use generator::Generator;
pub use poller::{Sleeper, TaskPoller, TokioSleeper};
pub use types::{
    Addon, BoundingBox, DownloadLink, GenerationOptions, GenerationRequest, GenerationResult,
    GeometryFileFormat, InputSource, Material, MeshMode, Quality, Task, TaskStatus, Tier,
};
