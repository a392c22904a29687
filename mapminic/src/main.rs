mod args;
mod canvas;
mod stats;

use crate::canvas::Canvas;
use crate::stats::Stats;

use clap::Parser;
use colored::*;
use log::{info, warn};
use mapmini::{
    render_tile, Display, MapConfig, MapFile, OverflowPolicy, StyleTable, TileRequest, View,
};

use std::path::{Path, PathBuf};

type Error = Box<dyn std::error::Error>;

fn config_from_args(args: &args::Args) -> MapConfig {
    MapConfig {
        arena_capacity: args.arena_size,
        overflow_policy: if args.truncate {
            OverflowPolicy::Truncate
        } else {
            OverflowPolicy::Abort
        },
        output_size: args.size,
        ..Default::default()
    }
}

/// Styles resolved by tag name when the file's tag table knows any road,
/// otherwise the fixed ids of the reference files.
fn styles_for(way_tags: &[String]) -> StyleTable {
    let styles = StyleTable::from_tag_names(way_tags);
    if styles.is_empty() {
        StyleTable::default()
    } else {
        styles
    }
}

/// Output path of `frame`; single frames are written to `output` as is.
fn frame_path(output: &Path, frame: u32, frames: u32) -> PathBuf {
    if frames <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = output
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".into());
    output.with_file_name(format!("{}-{:03}.{}", stem, frame, ext))
}

fn run(args: args::Args) -> Result<(), Error> {
    let config = config_from_args(&args);
    let mut map = MapFile::open(&args.input, config.clone())?;
    let header = map.header();
    info!(
        "Opened {} (version {}, {} way tags, {} zoom intervals)",
        args.input.display(),
        header.file_version,
        header.way_tags.len(),
        header.zoom_intervals.len()
    );
    let styles = styles_for(&header.way_tags);

    let mut arena = config.new_arena();
    let request = TileRequest::new(args.x, args.y, args.zoom).with_subtiles(args.subtiles);
    let tile = map.load_tile(&mut arena, &request)?;
    if tile.water {
        info!("Tile is water only, nothing to draw");
    }
    if tile.truncated {
        warn!("Arena too small, tile is incomplete");
    }

    let mut stats = Stats::from_tile(&tile);
    stats.arena_bytes = arena.used();
    stats.arena_capacity = arena.capacity();
    stats.bytes_read = map.reader().stats().bytes_read;

    let mut canvas = Canvas::new(args.width, args.height);
    let frames = args.frames.max(1);
    let base_view = View::new(args.width, args.height)
        .with_offset(args.offset_x, args.offset_y);
    for frame in 0..frames {
        let degrees = args.rotation + 360.0 * frame as f32 / frames as f32;
        let view = base_view.with_rotation(degrees.to_radians());

        canvas.clear();
        stats += render_tile(&mut canvas, &arena, &tile, &styles, &view)?;
        stats.bytes_flushed += canvas.flush();

        let path = frame_path(&args.output, frame, frames);
        canvas.write_png(&path)?;
        info!("Frame {} written to {}", frame, path.display());
    }

    println!("{stats}");
    Ok(())
}

fn main() {
    let args = args::Args::parse();
    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_module_path(false)
        .format_timestamp_nanos()
        .init();

    if let Err(e) = run(args) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}
