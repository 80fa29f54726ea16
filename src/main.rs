//! rodin3d CLI - generate 3D models from images or a text prompt.

use anyhow::Context;
use clap::{Args, Parser};
use rodin3d::{
    Addon, BoundingBox, ClientConfig, GenerationOptions, GenerationRequest, GenerationResult,
    Generator, GeometryFileFormat, Material, MeshMode, PollSettings, Quality, RodinError, Tier,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rodin3d")]
#[command(about = "Generate 3D models with the Hyper3D Rodin API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    input: Input,

    /// Generation tier
    #[arg(long)]
    tier: Option<Tier>,

    /// Output geometry format
    #[arg(long)]
    geometry_file_format: Option<GeometryFileFormat>,

    /// Mesh quality level
    #[arg(long)]
    quality: Option<Quality>,

    /// Material type
    #[arg(long)]
    material: Option<Material>,

    /// Mesh mode (Raw for triangles, Quad for quadrilaterals)
    #[arg(long)]
    mesh_mode: Option<MeshMode>,

    /// Use the original alpha channel of the images
    #[arg(long)]
    use_original_alpha: bool,

    /// Seed value for randomization (0-65535)
    #[arg(long)]
    seed: Option<u16>,

    /// Custom polygon count
    #[arg(long)]
    quality_override: Option<u32>,

    /// Generate a T/A pose for human-like models
    #[arg(long)]
    tapose: bool,

    /// Bounding box condition
    #[arg(long, num_args = 3, value_names = ["WIDTH", "HEIGHT", "LENGTH"])]
    bbox_condition: Option<Vec<u32>>,

    /// Addon features (e.g. HighPack for 4K textures)
    #[arg(long, num_args = 1..)]
    addons: Vec<Addon>,

    /// Generate an additional preview render
    #[arg(long)]
    preview_render: bool,

    /// JSON file with generation options; flags given on the command line win
    #[arg(long, value_name = "PATH")]
    options_file: Option<PathBuf>,

    /// API key (defaults to HYPER3D_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Output directory; models land in <OUTPUT>/<task uuid>/
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,

    /// Maximum number of status checks
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: u32,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// Input image(s), up to 5
    #[arg(long = "image", value_name = "PATH", num_args = 1..)]
    images: Vec<PathBuf>,

    /// Text prompt to generate a model from
    #[arg(long)]
    prompt: Option<String>,
}

impl Cli {
    fn options(&self) -> anyhow::Result<GenerationOptions> {
        let mut options = match &self.options_file {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(RodinError::from)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                GenerationOptions::from_json(&json)?
            }
            None => GenerationOptions::default(),
        };

        if let Some(tier) = self.tier {
            options.tier = tier;
        }
        if let Some(format) = self.geometry_file_format {
            options.geometry_file_format = format;
        }
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        if let Some(material) = self.material {
            options.material = material;
        }
        if let Some(mesh_mode) = self.mesh_mode {
            options.mesh_mode = mesh_mode;
        }
        if self.seed.is_some() {
            options.seed = self.seed;
        }
        if self.quality_override.is_some() {
            options.quality_override = self.quality_override;
        }
        if let Some(&[width, height, length]) = self.bbox_condition.as_deref() {
            options.bbox_condition = Some(BoundingBox {
                width,
                height,
                length,
            });
        }
        if !self.addons.is_empty() {
            options.addons = self.addons.clone();
        }
        options.use_original_alpha |= self.use_original_alpha;
        options.ta_pose |= self.tapose;
        options.preview_render |= self.preview_render;

        Ok(options)
    }

    fn request(&self) -> anyhow::Result<GenerationRequest> {
        let options = self.options()?;
        let request = match &self.input.prompt {
            Some(prompt) => GenerationRequest::from_prompt(prompt.clone(), options)?,
            None => GenerationRequest::from_images(&self.input.images, options)?,
        };
        Ok(request)
    }
}

async fn run(cli: Cli) -> anyhow::Result<GenerationResult> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_key) = &cli.api_key {
        config.api_key = api_key.clone();
    }

    let request = cli.request()?;
    let poll = PollSettings::new(Duration::from_secs(cli.poll_interval), cli.max_retries);

    let generator = Generator::from_config(config)?;
    let result = generator.generate(&request, &cli.output, poll).await?;
    Ok(result)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rodin3d=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(result) => {
            if result.files.is_empty() {
                println!("Generation finished but no files were available for download.");
            } else {
                println!("Downloaded {} file(s):", result.files.len());
                for path in &result.files {
                    println!("- {}", path.display());
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => match err.downcast_ref::<RodinError>() {
            Some(rodin) => {
                let kind = rodin.kind();
                eprintln!("error[{kind}]: {err:#}");
                ExitCode::from(kind.exit_code())
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}
