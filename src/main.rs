//! Headless crowd simulation: runs the crowd plugin for a fixed number of
//! host frames and optionally writes the final object poses as JSON.

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use bevy_app::App;
use bevy_time::Time;
use clap::Parser;
use crowd_bridge::config::load_document;
use crowd_bridge::{init_logging, read_settings, CrowdPlugin, CrowdState, TomlNode, RESOURCE_PATH_ENV};
use log::info;

/// Headless crowd simulation driven through the Bevy host loop
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Crowd configuration file
    #[arg(short, long, default_value = "assets/config.toml")]
    config: PathBuf,

    /// Resource directory used when the configuration has no `resource_path`
    #[arg(long, env = RESOURCE_PATH_ENV)]
    resource_path: Option<PathBuf>,

    /// Number of host frames to run
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Host frames per second
    #[arg(long, default_value_t = 60.0)]
    frame_rate: f64,

    /// Write the final object poses as JSON to this file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    ensure!(
        args.frame_rate.is_finite() && args.frame_rate > 0.0,
        "frame rate must be positive, got {}",
        args.frame_rate
    );

    let document = load_document(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let report = read_settings(&TomlNode::root(&document), args.resource_path.as_deref())
        .with_context(|| format!("validating {}", args.config.display()))?;

    let mut app = App::new();
    app.add_plugins(CrowdPlugin::new(report.settings));
    ensure!(
        app.world().contains_resource::<CrowdState>(),
        "crowd bridge failed to initialise; see the log for details"
    );

    let frame = Duration::from_secs_f64(args.frame_rate.recip());
    for _ in 0..args.frames {
        app.world_mut().resource_mut::<Time>().advance_by(frame);
        app.update();
    }

    let state = app.world().resource::<CrowdState>();
    let snapshot = state.bridge().snapshot()?;
    info!(
        "simulated {:.2}s with {} objects",
        state.bridge().sim_time()?,
        snapshot.len()
    );
    if let Some(path) = &args.snapshot {
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &snapshot)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("snapshot written to {}", path.display());
    }
    Ok(())
}
