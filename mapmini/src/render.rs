//! Turns decoded ways into styled line segments.
//!
//! Rendering only reads the arena, so the same decoded tile can be drawn
//! any number of times with a different offset or rotation.

use crate::arena::Arena;
use crate::display::LineSink;
use crate::error::Result;
use crate::style::{Style, StyleTable};
use crate::tile::TileWays;
use crate::way::WayRecord;

use itertools::Itertools;
use log::trace;

use std::ops::AddAssign;

/// Placement of the tile on the display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Translation in pixels applied before rotating.
    pub offset: (i32, i32),
    /// Rotation around `center` in radians.
    pub rotation: f32,
    pub center: (i32, i32),
}

impl View {
    /// Untransformed view of a display of the given size.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            offset: (0, 0),
            rotation: 0.0,
            center: (i32::from(width) / 2, i32::from(height) / 2),
        }
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset = (x, y);
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    fn transformer(&self) -> impl Fn((i16, i16)) -> (i32, i32) {
        let (sin, cos) = self.rotation.sin_cos();
        let (ox, oy) = self.offset;
        let (cx, cy) = self.center;
        // saturates at the i32 range for offsets far off the display
        move |(x, y)| {
            let tx = ox.saturating_add(i32::from(x)).saturating_sub(cx) as f32;
            let ty = oy.saturating_add(i32::from(y)).saturating_sub(cy) as f32;
            (
                ((tx * cos - ty * sin).round() as i32).saturating_add(cx),
                ((ty * cos + tx * sin).round() as i32).saturating_add(cy),
            )
        }
    }

    /// Display position of pixel `p` of the tile.
    pub fn transform(&self, p: (i16, i16)) -> (i32, i32) {
        self.transformer()(p)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub ways_drawn: usize,
    /// Ways without a visible style.
    pub ways_unstyled: usize,
    pub segments: usize,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.ways_drawn += other.ways_drawn;
        self.ways_unstyled += other.ways_unstyled;
        self.segments += other.segments;
    }
}

/// Draws one line per pair of consecutive nodes and returns the number of
/// segments issued. Black styles draw nothing.
pub fn draw_way<S: LineSink + ?Sized>(
    sink: &mut S,
    arena: &Arena,
    way: &WayRecord,
    style: Style,
    view: &View,
) -> Result<usize> {
    if !style.is_visible() || way.node_count() < 2 {
        return Ok(0);
    }
    let transform = view.transformer();
    let mut segments = 0;
    for (from, to) in way.coords(arena)?.map(transform).tuple_windows() {
        sink.draw_line(from, to, style.half_width, style.color);
        segments += 1;
    }
    Ok(segments)
}

/// Draws every way of a decoded tile with the style of its first styled tag.
pub fn render_tile<S: LineSink + ?Sized>(
    sink: &mut S,
    arena: &Arena,
    tile: &TileWays,
    styles: &StyleTable,
    view: &View,
) -> Result<RenderStats> {
    let mut stats = RenderStats::default();
    for way in tile.iter(arena)? {
        match styles.style_for_way(arena, &way)? {
            Some(style) if style.is_visible() => {
                stats.segments += draw_way(sink, arena, &way, style, view)?;
                stats.ways_drawn += 1;
            }
            _ => stats.ways_unstyled += 1,
        }
    }
    trace!(
        "Rendered {} way(s) with {} segment(s), {} unstyled",
        stats.ways_drawn,
        stats.segments,
        stats.ways_unstyled
    );
    Ok(stats)
}
