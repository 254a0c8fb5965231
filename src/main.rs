//! mapsim: headless map runner
//!
//! Usage:
//!   mapsim run level.ron --frames 600    # Load, spawn and simulate a map
//!   mapsim check level.ron               # Validate a map without running it
//!   mapsim demo demo.ron                 # Write the built-in demo map

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use mapsim::game::{HeadlessRenderer, Simulation};
use mapsim::world::{self, MapError};
use mapsim::{logging, SimConfig};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mapsim", version = VERSION)]
#[command(about = "Run entity and trigger simulations over map files")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a map and run it headless
    Run {
        map: PathBuf,
        /// Number of frames to simulate
        #[arg(long, default_value_t = 600)]
        frames: u64,
        /// Simulation tuning file (RON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a map file
    Check { map: PathBuf },
    /// Write the built-in demo map
    Demo { out: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Run { map, frames, config } => run(&map, frames, config.as_deref()),
        Commands::Check { map } => check(&map),
        Commands::Demo { out } => demo(&out),
    }
}

fn run(path: &Path, frames: u64, config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SimConfig::default(),
    };

    let scene = match world::load_scene(path) {
        Ok(scene) => scene,
        Err(MapError::NotFound(missing)) => {
            warn!("no map at {}, nothing to run", missing.display());
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to load map {}", path.display())),
    };

    let mut sim = Simulation::new(scene, config);
    for e in sim.spawn_all() {
        warn!("entity left inactive: {}", e);
    }

    let mut renderer = HeadlessRenderer::for_frames(frames);
    let ran = sim.run(&mut renderer);

    let alive = sim.scene.entities().iter().filter(|e| e.is_alive()).count();
    println!(
        "{}: {} frames, {} entities ({} alive)",
        path.display(),
        ran,
        sim.scene.entity_count(),
        alive
    );
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let map = world::load_map(path).with_context(|| format!("invalid map {}", path.display()))?;
    println!(
        "{}: ok ({} entities, {} brushes)",
        path.display(),
        map.entities.len(),
        map.brushes.len()
    );
    Ok(())
}

fn demo(out: &Path) -> Result<()> {
    let map = world::demo_map();
    world::save_map(&map, out).with_context(|| format!("failed to write {}", out.display()))?;
    info!("demo map written to {}", out.display());
    Ok(())
}
