use std::num::ParseIntError;
use std::path::PathBuf;

use clap::Parser;

/// Renders the roads of one tile of a Mapsforge binary map file into a PNG
#[derive(Debug, Parser)]
#[clap(about, version, author)]
pub struct Args {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Input map file
    pub input: PathBuf,

    /// Output PNG file; with --frames a frame number is appended
    #[arg(short, long)]
    pub output: PathBuf,

    /// Tile column at the base zoom level of the zoom interval
    #[arg(long)]
    pub x: u32,

    /// Tile row at the base zoom level of the zoom interval
    #[arg(long)]
    pub y: u32,

    /// Zoom level selecting the zoom interval and the visible ways
    #[arg(long)]
    pub zoom: u8,

    /// Edge length in pixels the tile is scaled to
    #[arg(long, default_value_t = 128)]
    pub size: u16,

    /// Rotation around the display center in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotation: f32,

    /// Horizontal offset of the tile in pixels
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset_x: i32,

    /// Vertical offset of the tile in pixels
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub offset_y: i32,

    /// Subtile filter bitmap, e.g. 0xffff for the whole tile
    #[arg(long, default_value = "0xffff", value_parser = parse_bitmap)]
    pub subtiles: u16,

    /// Display width in pixels
    #[arg(long, default_value_t = 128)]
    pub width: u16,

    /// Display height in pixels
    #[arg(long, default_value_t = 128)]
    pub height: u16,

    /// Arena size in bytes for the geometry of the tile
    #[arg(long, default_value_t = mapmini::DEFAULT_ARENA_CAPACITY)]
    pub arena_size: usize,

    /// Keep the ways decoded so far when the arena runs out
    #[arg(long)]
    pub truncate: bool,

    /// Number of frames to render with increasing rotation
    #[arg(long, default_value_t = 1)]
    pub frames: u32,
}

fn parse_bitmap(s: &str) -> Result<u16, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
