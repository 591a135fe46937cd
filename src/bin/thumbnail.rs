//! splat-thumb: Render preview thumbnails of Gaussian splat scenes
//!
//! Usage:
//!   splat-thumb render scene.ply -o scene.jpg
//!   splat-thumb batch public/splats -o public/thumbnails -o dist/thumbnails
//!   splat-thumb print-config --config camera.json

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use splat_thumb::batch::{run_batch, thumbnail_file};
use splat_thumb::config::{Overrides, RenderConfig};

#[derive(Parser)]
#[command(name = "splat-thumb", version)]
#[command(about = "CPU thumbnail renderer for 3D Gaussian splat scenes")]
struct Cli {
    /// Log per-stage render counts
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RenderOptions {
    /// JSON render config (camera, max_splats, jpeg_quality)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Vertical field of view in degrees
    #[arg(long)]
    fov: Option<f32>,

    /// Keep only the N most opaque splats
    #[arg(long)]
    max_splats: Option<usize>,
}

impl RenderOptions {
    fn resolve(&self) -> Result<RenderConfig> {
        let overrides = Overrides {
            width: self.width,
            height: self.height,
            fov_degrees: self.fov,
            max_splats: self.max_splats,
        };
        RenderConfig::resolve(self.config.as_deref(), &overrides).context("invalid render config")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render one splat file
    Render {
        input: PathBuf,

        /// Output image (.jpg/.jpeg, or any format inferred from the extension)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: RenderOptions,
    },

    /// Render every .ply in a directory to <stem>.jpg
    Batch {
        splat_dir: PathBuf,

        /// Output directory; repeat to write the same thumbnails to several places
        #[arg(short, long, required = true)]
        output: Vec<PathBuf>,

        #[command(flatten)]
        options: RenderOptions,
    },

    /// Print the effective config as JSON
    PrintConfig {
        #[command(flatten)]
        options: RenderOptions,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Render {
            input,
            output,
            options,
        } => {
            let config = options.resolve()?;
            thumbnail_file(&input, std::slice::from_ref(&output), &config)
                .with_context(|| format!("failed to thumbnail {}", input.display()))?;
        }
        Commands::Batch {
            splat_dir,
            output,
            options,
        } => {
            let config = options.resolve()?;
            let summary = run_batch(&splat_dir, &output, &config)?;
            if summary.all_failed() {
                bail!("all {} splat file(s) failed", summary.failed.len());
            }
        }
        Commands::PrintConfig { options } => {
            let config = options.resolve()?;
            println!("{}", config.to_json_pretty()?);
        }
    }

    Ok(())
}
