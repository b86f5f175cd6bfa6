use clap::Parser;
use std::path::PathBuf;

use gazer::rig::RigPreset;
use gazer::{App, AppConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (RON); defaults to ./gazer.ron if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which figure to show (human, head)
    #[arg(long)]
    preset: Option<RigPreset>,

    /// Seed for the blink timer
    #[arg(long)]
    seed: Option<u64>,

    /// Drag to orbit the camera, wheel to zoom
    #[arg(long)]
    orbit: bool,

    /// Draw an opaque background instead of a transparent one
    #[arg(long)]
    opaque: bool,

    /// Vertical field of view in degrees
    #[arg(long)]
    fov: Option<f32>,
}

impl Args {
    /// Command-line flags win over file and environment settings.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(preset) = self.preset {
            config.scene.rig = preset;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if self.orbit {
            config.scene.allow_orbit_control = true;
        }
        if self.opaque {
            config.scene.background_transparent = false;
        }
        if let Some(fov) = self.fov {
            config.scene.field_of_view = fov;
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    args.apply(&mut config);

    log::info!(
        "Starting Gazer: rig={} orbit={} transparent={}",
        config.scene.rig,
        config.scene.allow_orbit_control,
        config.scene.background_transparent
    );
    pollster::block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let (app, event_loop) = App::new(config).await?;
    App::run(event_loop, app)
}
