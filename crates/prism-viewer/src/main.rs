use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use winit::dpi::LogicalSize;

use prism_engine::camera::CameraState;
use prism_engine::device::GpuInit;
use prism_engine::logging::{LoggingConfig, init_logging};
use prism_engine::window::{Runtime, RuntimeConfig};

mod fps;
mod scatter;
mod viewer;

use viewer::{CubeViewer, ViewerOptions};

/// Instanced cube viewer with live pipeline reload (Ctrl+R).
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of cubes to draw.
    #[arg(long, default_value_t = 1)]
    instances: usize,

    /// Seed for instance placement; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Half extent of the cube instances are scattered in.
    #[arg(long, default_value_t = 10.0)]
    spread: f32,

    /// Shader stage file (`*.vert.spv`, `*.frag.spv`, `*.vert.wgsl`,
    /// `*.frag.wgsl`). Repeat for each stage.
    #[arg(long = "shader", value_name = "PATH")]
    shaders: Vec<PathBuf>,

    /// Log filter, e.g. `debug` or `prism_engine=trace`.
    #[arg(long = "log", value_name = "FILTER")]
    log_filter: Option<String>,

    /// Camera fly speed in units per second.
    #[arg(long, default_value_t = 1.0)]
    fly_speed: f32,
}

fn bundled_shaders() -> Vec<PathBuf> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders");
    vec![dir.join("cube.vert.wgsl"), dir.join("cube.frag.wgsl")]
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        env_filter: args.log_filter.clone(),
        ..LoggingConfig::default()
    });

    let shaders = if args.shaders.is_empty() {
        bundled_shaders()
    } else {
        args.shaders
    };
    let instances = scatter::scatter(args.instances, args.spread, args.seed);
    log::info!("{} instance(s), shaders: {shaders:?}", instances.len());

    let viewer = CubeViewer::new(ViewerOptions {
        shaders,
        instances,
        camera: CameraState {
            fly_speed: args.fly_speed,
            ..CameraState::default()
        },
    });

    let config = RuntimeConfig {
        title: "prism".to_string(),
        initial_size: LogicalSize::new(1280.0, 720.0),
    };
    Runtime::run(config, GpuInit::default(), viewer)
}
