use std::fmt;
use std::ops::AddAssign;

use mapmini::{RenderStats, TileWays};

#[derive(Debug, Default)]
pub struct Stats {
    pub num_ways: usize,
    pub num_skipped_ways: usize,
    pub num_unstyled_ways: usize,
    pub num_segments: usize,
    pub num_frames: usize,
    pub arena_bytes: usize,
    pub arena_capacity: usize,
    pub bytes_read: u64,
    pub bytes_flushed: usize,
}

impl Stats {
    pub fn from_tile(tile: &TileWays) -> Self {
        Self {
            num_ways: tile.len(),
            num_skipped_ways: tile.skipped,
            ..Default::default()
        }
    }
}

impl AddAssign<RenderStats> for Stats {
    #[inline]
    fn add_assign(&mut self, other: RenderStats) {
        self.num_unstyled_ways += other.ways_unstyled;
        self.num_segments += other.segments;
        self.num_frames += 1;
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            r#"Decoded:
  ways:         {}
  skipped:      {}
  bytes read:   {}
  arena:        {} of {} bytes
Rendered:
  frames:       {}
  unstyled:     {}
  segments:     {}
  bytes:        {}"#,
            self.num_ways,
            self.num_skipped_ways,
            self.bytes_read,
            self.arena_bytes,
            self.arena_capacity,
            self.num_frames,
            self.num_unstyled_ways,
            self.num_segments,
            self.bytes_flushed
        )
    }
}
