//! Decoder for Mapsforge binary map tiles and a line renderer for small
//! fixed-resolution displays.
//!
//! All geometry of a tile is decoded into a single pre-allocated [`Arena`];
//! decoded ways only hold checked handles into it.

mod arena;
mod config;
mod display;
mod error;
mod header;
mod projection;
mod reader;
mod render;
mod style;
#[cfg(test)]
mod test_util;
mod tile;
mod way;

pub use crate::arena::*;
pub use crate::config::*;
pub use crate::display::*;
pub use crate::error::*;
pub use crate::header::*;
pub use crate::projection::*;
pub use crate::reader::*;
pub use crate::render::*;
pub use crate::style::*;
pub use crate::tile::*;
pub use crate::way::*;
