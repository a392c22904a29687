//! Tile directory lookup and loading of the ways of one tile.

use crate::arena::{Arena, Region};
use crate::config::{MapConfig, OverflowPolicy};
use crate::error::{MapError, Result};
use crate::header::{decode_header, FileHeader, ZoomInterval};
use crate::projection::TileProjection;
use crate::reader::StreamReader;
use crate::way::{Decoded, WayDecoder, WayRecord, WAY_SLOT_BYTES};

use log::{debug, info, warn};

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

// debug files carry "+++IndexStart+++" in front of every tile directory
const INDEX_SIGNATURE_LEN: u64 = 16;
const TILE_SIGNATURE_LEN: u64 = 32;
const DIRECTORY_ENTRY_BYTES: usize = 5;

/// Packed 40-bit entry of a tile directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAddress(pub u64);

impl TileAddress {
    const WATER_MASK: u64 = 0x80_0000_0000;
    const OFFSET_MASK: u64 = 0x7f_ffff_ffff;

    /// The tile is covered by sea only and has no data.
    pub fn is_water(&self) -> bool {
        self.0 & Self::WATER_MASK != 0
    }

    /// Offset of the tile data relative to the start of the sub-file.
    pub fn offset(&self) -> u64 {
        self.0 & Self::OFFSET_MASK
    }
}

/// A tile to load, addressed in tiles of the base zoom level of the interval
/// serving `zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
    /// Ways whose subtile bitmap does not intersect the filter are skipped.
    pub subtile_filter: u16,
}

impl TileRequest {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self {
            x,
            y,
            zoom,
            subtile_filter: 0xffff,
        }
    }

    pub fn with_subtiles(mut self, subtile_filter: u16) -> Self {
        self.subtile_filter = subtile_filter;
        self
    }
}

/// Ways decoded from one tile.
///
/// The way records are stored in a fixed number of slots reserved from the
/// arena, next to their tags and geometry. Like every other arena handle the
/// list becomes stale when the arena is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileWays {
    slots: Region,
    capacity: usize,
    len: usize,
    /// The tile directory marks the tile as sea only.
    pub water: bool,
    /// The arena ran out and the remaining ways were dropped.
    pub truncated: bool,
    /// Ways rejected by the subtile filter.
    pub skipped: usize,
    /// Ways visible at the requested zoom according to the zoom table.
    pub declared: usize,
}

impl TileWays {
    /// Reserves slots for `capacity` ways in the arena.
    pub fn allocate(arena: &mut Arena, capacity: usize) -> Result<Self> {
        let size = capacity
            .checked_mul(WAY_SLOT_BYTES)
            .ok_or(MapError::LengthExceeded {
                what: "way slots",
                len: capacity,
                max: Arena::MAX_CAPACITY / WAY_SLOT_BYTES,
            })?;
        Ok(Self {
            slots: arena.allocate(size)?,
            capacity,
            ..Default::default()
        })
    }

    /// Stores `way` in the next free slot.
    pub fn push(&mut self, arena: &mut Arena, way: &WayRecord) -> Result<()> {
        if self.len == self.capacity {
            return Err(MapError::LengthExceeded {
                what: "way slots",
                len: self.len + 1,
                max: self.capacity,
            });
        }
        let start = self.len * WAY_SLOT_BYTES;
        way.write_slot(&mut arena.get_mut(self.slots)?[start..start + WAY_SLOT_BYTES]);
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, arena: &Arena, index: usize) -> Result<Option<WayRecord>> {
        if index >= self.len {
            return Ok(None);
        }
        let slots = arena.get(self.slots)?;
        let start = index * WAY_SLOT_BYTES;
        Ok(Some(WayRecord::read_slot(
            arena,
            &slots[start..start + WAY_SLOT_BYTES],
        )))
    }

    /// Ways in file order.
    pub fn iter<'a>(&self, arena: &'a Arena) -> Result<impl Iterator<Item = WayRecord> + 'a> {
        let slots = if self.len == 0 {
            &[][..]
        } else {
            &arena.get(self.slots)?[..self.len * WAY_SLOT_BYTES]
        };
        Ok(slots
            .chunks_exact(WAY_SLOT_BYTES)
            .map(move |slot| WayRecord::read_slot(arena, slot)))
    }
}

/// An open map file with its decoded header, ready for repeated tile loads.
pub struct MapFile<R> {
    reader: StreamReader<R>,
    header: FileHeader,
    config: MapConfig,
}

impl MapFile<File> {
    pub fn open<P: AsRef<Path>>(path: P, config: MapConfig) -> Result<Self> {
        let reader = StreamReader::open(path, config.read_buffer_size)?;
        Self::with_reader(reader, config)
    }
}

impl<R: Read + Seek> MapFile<R> {
    pub fn from_reader(inner: R, config: MapConfig) -> Result<Self> {
        let reader = StreamReader::new(inner, config.read_buffer_size)?;
        Self::with_reader(reader, config)
    }

    fn with_reader(mut reader: StreamReader<R>, config: MapConfig) -> Result<Self> {
        let header = decode_header(&mut reader, &config)?;
        Ok(Self {
            reader,
            header,
            config,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn reader(&self) -> &StreamReader<R> {
        &self.reader
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Decodes the ways of the requested tile into `arena`, scaled to the
    /// configured output size.
    ///
    /// The arena is not reset; callers reset it before reusing it for the
    /// next tile.
    pub fn load_tile(&mut self, arena: &mut Arena, request: &TileRequest) -> Result<TileWays> {
        let interval = *self
            .header
            .select_interval(request.zoom)
            .ok_or(MapError::NoZoomInterval(request.zoom))?;
        let index =
            interval
                .tile_index(request.x, request.y)
                .ok_or(MapError::TileOutOfBounds {
                    x: request.x,
                    y: request.y,
                    zoom: interval.base_zoom,
                })?;
        let debug_file = self.header.is_debug();

        let directory = if debug_file {
            checked_offset(interval.sub_file_offset, INDEX_SIGNATURE_LEN)?
        } else {
            interval.sub_file_offset
        };
        let entry_offset = checked_offset(directory, index * DIRECTORY_ENTRY_BYTES as u64)?;
        self.reader.seek_absolute(entry_offset)?;
        let address = TileAddress(self.reader.read_varint(DIRECTORY_ENTRY_BYTES)?);
        debug!(
            "Tile {}/{} at base zoom {}: directory entry {} = {:#012x}",
            request.x, request.y, interval.base_zoom, index, address.0
        );
        if address.is_water() {
            info!("Tile {}/{} is water only", request.x, request.y);
            return Ok(TileWays {
                water: true,
                ..Default::default()
            });
        }

        self.reader
            .seek_absolute(checked_offset(interval.sub_file_offset, address.offset())?)?;
        if debug_file {
            self.reader.skip(TILE_SIGNATURE_LEN)?;
        }
        let declared = self.read_zoom_table(&interval, request.zoom)?;
        let first_way_offset = u64::from(self.reader.read_vbe_u32()?);
        let first_way = checked_offset(self.reader.position(), first_way_offset)?;
        self.reader.seek_absolute(first_way)?;

        let mut result = match TileWays::allocate(arena, declared) {
            Ok(ways) => ways,
            Err(e) => return self.overflow(e, request, TileWays::default()),
        };
        result.declared = declared;

        let projection = TileProjection::for_tile(
            request.x,
            request.y,
            interval.base_zoom,
            f64::from(self.config.output_size),
        );
        let decoder = WayDecoder::new(request.subtile_filter, projection, debug_file);
        for _ in 0..declared {
            let way = match decoder.decode_way(&mut self.reader, arena) {
                Ok(Decoded::Way(way)) => way,
                Ok(Decoded::Skip) => {
                    result.skipped += 1;
                    continue;
                }
                Err(e) => return self.overflow(e, request, result),
            };
            result.push(arena, &way)?;
        }

        info!(
            "Loaded tile {}/{}/{}: {} way(s), {} skipped, {} bytes of arena",
            request.zoom,
            request.x,
            request.y,
            result.len(),
            result.skipped,
            arena.used()
        );
        Ok(result)
    }

    /// Applies the overflow policy to an error raised while filling `ways`.
    fn overflow(&self, e: MapError, request: &TileRequest, mut ways: TileWays) -> Result<TileWays> {
        match e {
            MapError::ArenaOverflow { .. }
                if self.config.overflow_policy == OverflowPolicy::Truncate =>
            {
                warn!(
                    "Truncating tile {}/{} after {} way(s): {}",
                    request.x,
                    request.y,
                    ways.len(),
                    e
                );
                ways.truncated = true;
                Ok(ways)
            }
            e => Err(e),
        }
    }

    /// Reads the (POI count, way count) rows of the zoom table and returns
    /// the number of ways visible at `zoom`.
    ///
    /// Ways are stored ordered by the zoom level they appear at, so the ways
    /// visible at `zoom` are the first ones in the tile.
    fn read_zoom_table(&mut self, interval: &ZoomInterval, zoom: u8) -> Result<usize> {
        let mut ways = 0_usize;
        for row_zoom in interval.min_zoom..=interval.max_zoom {
            let _pois = self.reader.read_vbe_u32()?;
            let row_ways = self.reader.read_vbe_u32()? as usize;
            if row_zoom <= zoom {
                ways = ways.saturating_add(row_ways);
            }
        }
        if ways > self.config.max_ways_per_tile {
            return Err(MapError::LengthExceeded {
                what: "ways per tile",
                len: ways,
                max: self.config.max_ways_per_tile,
            });
        }
        Ok(ways)
    }
}

fn checked_offset(base: u64, delta: u64) -> Result<u64> {
    base.checked_add(delta).ok_or(MapError::SeekFailure(base))
}

/// Opens the map file at `path` and loads a single tile.
pub fn load_tile<P: AsRef<Path>>(
    path: P,
    arena: &mut Arena,
    request: &TileRequest,
    config: &MapConfig,
) -> Result<TileWays> {
    let mut map = MapFile::open(path, config.clone())?;
    map.load_tile(arena, request)
}

/// Status code of the device API: the number of decoded ways on success,
/// a negative error code otherwise.
pub fn status_code(result: &Result<TileWays>) -> i32 {
    match result {
        Ok(tile) => i32::try_from(tile.len()).unwrap_or(i32::MAX),
        Err(e) => e.status_code(),
    }
}
