use crate::arena::Arena;

/// What to do when the arena runs out while the ways of a tile are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail the whole tile load with `MapError::ArenaOverflow`.
    #[default]
    Abort,
    /// Keep the ways decoded so far and mark the tile as truncated.
    Truncate,
}

/// Memory budget and structural limits of the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapConfig {
    /// Bytes available for the tag and geometry arrays of one tile load.
    pub arena_capacity: usize,
    /// Size of the streaming read window.
    pub read_buffer_size: usize,
    pub max_zoom_intervals: usize,
    /// Upper bound for each of the POI and way tag-name tables.
    pub max_tag_names: usize,
    pub max_ways_per_tile: usize,
    pub overflow_policy: OverflowPolicy,
    /// Edge length in pixels a full tile is scaled to.
    pub output_size: u16,
}

pub const DEFAULT_ARENA_CAPACITY: usize = 64 * 1024;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 512;
pub const MAX_ZOOM_INTERVALS: usize = 22;
pub const DEFAULT_OUTPUT_SIZE: u16 = 128;

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_zoom_intervals: MAX_ZOOM_INTERVALS,
            max_tag_names: 1024,
            max_ways_per_tile: 4096,
            overflow_policy: OverflowPolicy::Abort,
            output_size: DEFAULT_OUTPUT_SIZE,
        }
    }
}

impl MapConfig {
    /// Allocates the arena tiles are decoded into.
    pub fn new_arena(&self) -> Arena {
        Arena::new(self.arena_capacity)
    }
}
