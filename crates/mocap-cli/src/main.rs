//! Mocap CLI - Command-line interface for the mocap toolkit

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{dance, info, play, pose, ranges, trail, Settings};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mocap")]
#[command(about = "Inspect, play back and recombine BVH motion capture", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ./mocap.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Normalize skeletons to this height
    #[arg(long, global = true)]
    height: Option<f32>,

    /// More log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the skeleton and clip summary of a BVH file
    Info {
        /// Path to BVH file
        file: PathBuf,
    },

    /// Print world positions of bones at one frame
    Pose {
        /// Path to BVH file
        file: PathBuf,

        /// Frame index (clamped to the clip)
        #[arg(long, default_value_t = 0)]
        frame: usize,

        /// Only print this bone
        #[arg(long)]
        bone: Option<String>,

        /// Scene placement added to the root (x,y,z)
        #[arg(long, value_parser = parse_vec3)]
        root_offset: Option<[f32; 3]>,

        /// Keep the root bone in its bind pose
        #[arg(long)]
        pin_root: bool,
    },

    /// Run playback headless and report the frames reached
    Play {
        /// Path to BVH file
        file: PathBuf,

        /// Playback rate (defaults to the clip's fps)
        #[arg(long)]
        fps: Option<f32>,

        /// Rate at which the driver is ticked
        #[arg(long, default_value_t = 60.0)]
        system_fps: f32,

        /// Wall-clock seconds to simulate
        #[arg(long, default_value_t = 1.0)]
        seconds: f32,

        /// Stop on the last frame instead of looping
        #[arg(long)]
        stop_at_end: bool,

        /// Print the root position at every applied frame
        #[arg(long)]
        trace: bool,
    },

    /// Print per-bone rotation limits in degrees
    Ranges {
        /// Path to BVH file
        file: PathBuf,
    },

    /// Print the path a bone traces through the clip
    Trail {
        /// Path to BVH file
        file: PathBuf,

        /// Bone to follow
        #[arg(long)]
        bone: String,
    },

    /// Stitch manifest segments into a dance
    Dance {
        /// Segment manifest (`<file> <start> <end>` per line)
        manifest: PathBuf,

        /// Number of segments to chain
        #[arg(long, default_value_t = 5)]
        segments: usize,

        /// RNG seed for a reproducible dance
        #[arg(long)]
        seed: Option<u64>,

        /// Cross-fade window in frames
        #[arg(long)]
        overlap: Option<usize>,
    },
}

fn parse_vec3(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected 3 comma-separated values, got {}", parts.len()));
    }
    let x: f32 = parts[0].trim().parse().map_err(|e| format!("invalid x: {}", e))?;
    let y: f32 = parts[1].trim().parse().map_err(|e| format!("invalid y: {}", e))?;
    let z: f32 = parts[2].trim().parse().map_err(|e| format!("invalid z: {}", e))?;
    Ok([x, y, z])
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref(), cli.height)?;
    debug!(config = ?settings.config, "resolved settings");

    match cli.command {
        Commands::Info { file } => info::run(&file, &settings),
        Commands::Pose {
            file,
            frame,
            bone,
            root_offset,
            pin_root,
        } => pose::run(
            pose::PoseArgs {
                file,
                frame,
                bone,
                root_offset,
                pin_root,
            },
            &settings,
        ),
        Commands::Play {
            file,
            fps,
            system_fps,
            seconds,
            stop_at_end,
            trace,
        } => play::run(
            play::PlayArgs {
                file,
                fps,
                system_fps,
                seconds,
                stop_at_end,
                trace,
            },
            &settings,
        ),
        Commands::Ranges { file } => ranges::run(&file, &settings),
        Commands::Trail { file, bone } => trail::run(&file, &bone, &settings),
        Commands::Dance {
            manifest,
            segments,
            seed,
            overlap,
        } => dance::run(&manifest, segments, seed, overlap, &settings),
    }
}
