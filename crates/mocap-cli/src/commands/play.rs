//! Headless playback command

use super::Settings;
use anyhow::{bail, Result};
use mocap_animation::{open_player, EndBehavior};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

pub struct PlayArgs {
    pub file: PathBuf,
    pub fps: Option<f32>,
    pub system_fps: f32,
    pub seconds: f32,
    pub stop_at_end: bool,
    pub trace: bool,
}

pub fn run(args: PlayArgs, settings: &Settings) -> Result<()> {
    if !(args.system_fps > 0.0) {
        bail!("--system-fps must be positive");
    }

    let mut player = open_player(&args.file, &settings.config)?;
    if let Some(fps) = args.fps {
        player.set_playback_fps(fps)?;
    }
    if args.stop_at_end {
        player.set_end_behavior(EndBehavior::Stop);
    }

    let applied = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&applied);
    player.register_listener(Box::new(move |_frame: usize| counter.set(counter.get() + 1)));

    let ticks = (args.seconds.max(0.0) * args.system_fps).round() as usize;
    let mut loops = 0;
    player.set_playing(true);
    for tick in 0..ticks {
        let before = player.current_frame();
        match player.update(args.system_fps) {
            Some(frame) if args.trace => {
                let root = player.skeleton().world_position(0).unwrap_or_default();
                println!(
                    "tick {:>5}  frame {:>5}  root ({:.3}, {:.3}, {:.3})",
                    tick, frame, root.x, root.y, root.z
                );
            }
            Some(_) => {}
            None => {
                if before.is_some() && player.current_frame().is_none() {
                    loops += 1;
                }
            }
        }
        if !player.is_playing() {
            break;
        }
    }

    println!(
        "Played {} ticks at {} Hz: {} frame updates, {} loop(s), ended on frame {}",
        ticks,
        args.system_fps,
        applied.get(),
        loops,
        player
            .current_frame()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}
