//! Decoding of way records into arena-backed geometry.

use crate::arena::{Arena, Region, REGION_BYTES};
use crate::error::{MapError, Result};
use crate::projection::TileProjection;
use crate::reader::StreamReader;

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use std::io::{Read, Seek};

pub(crate) const WAY_NAME: u8 = 0x80;
pub(crate) const WAY_HOUSE_NUMBER: u8 = 0x40;
pub(crate) const WAY_REFERENCE: u8 = 0x20;
pub(crate) const WAY_LABEL: u8 = 0x10;
pub(crate) const WAY_DATA_BLOCKS: u8 = 0x08;
pub(crate) const WAY_DOUBLE_DELTA: u8 = 0x04;

const WAY_SIGNATURE_LEN: u64 = 32;
// layers are stored shifted so that they fit into an unsigned nibble
const LAYER_SHIFT: i8 = 5;

const TAG_BYTES: usize = 2;
const COORD_BYTES: usize = 4;

/// Size of a [`WayRecord`] stored in the arena: subtile bitmap, layer, one
/// padding byte and the tag and coordinate handles.
pub(crate) const WAY_SLOT_BYTES: usize = 4 + 2 * REGION_BYTES;

/// A decoded way: one geometry block of display pixels plus its tag ids.
///
/// Tags and coordinates live in the [`Arena`] the way was decoded into and
/// are only readable until that arena is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WayRecord {
    pub subtile_bitmap: u16,
    pub layer: i8,
    tags: Region,
    coords: Region,
}

impl WayRecord {
    pub fn tag_count(&self) -> usize {
        self.tags.len() / TAG_BYTES
    }

    pub fn node_count(&self) -> usize {
        self.coords.len() / COORD_BYTES
    }

    /// Tag ids in file order, as indices into the header's way tag table.
    pub fn tags<'a>(&self, arena: &'a Arena) -> Result<impl Iterator<Item = u16> + Clone + 'a> {
        let bytes = arena.get(self.tags)?;
        Ok(bytes.chunks_exact(TAG_BYTES).map(LittleEndian::read_u16))
    }

    /// Node positions in pixels relative to the tile's north-west corner.
    pub fn coords<'a>(
        &self,
        arena: &'a Arena,
    ) -> Result<impl Iterator<Item = (i16, i16)> + Clone + 'a> {
        let bytes = arena.get(self.coords)?;
        Ok(bytes.chunks_exact(COORD_BYTES).map(|c| {
            (
                LittleEndian::read_i16(&c[0..2]),
                LittleEndian::read_i16(&c[2..4]),
            )
        }))
    }

    pub(crate) fn write_slot(&self, slot: &mut [u8]) {
        LittleEndian::write_u16(&mut slot[0..2], self.subtile_bitmap);
        slot[2] = self.layer as u8;
        slot[3] = 0;
        self.tags.write_to(&mut slot[4..4 + REGION_BYTES]);
        self.coords.write_to(&mut slot[4 + REGION_BYTES..WAY_SLOT_BYTES]);
    }

    pub(crate) fn read_slot(arena: &Arena, slot: &[u8]) -> Self {
        Self {
            subtile_bitmap: LittleEndian::read_u16(&slot[0..2]),
            layer: slot[2] as i8,
            tags: arena.read_region(&slot[4..4 + REGION_BYTES]),
            coords: arena.read_region(&slot[4 + REGION_BYTES..WAY_SLOT_BYTES]),
        }
    }
}

/// Outcome of decoding one way record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Way(WayRecord),
    /// The way does not touch any of the requested subtiles. The reader has
    /// moved past it, nothing was allocated.
    Skip,
}

/// Decodes the way records of one tile with shared projection parameters.
#[derive(Debug, Clone, Copy)]
pub struct WayDecoder {
    subtile_filter: u16,
    projection: TileProjection,
    debug: bool,
}

impl WayDecoder {
    pub fn new(subtile_filter: u16, projection: TileProjection, debug: bool) -> Self {
        Self {
            subtile_filter,
            projection,
            debug,
        }
    }

    /// Decodes the way at the current reader position and leaves the reader
    /// at the start of the next way.
    ///
    /// Only the first coordinate block of the first way-data block is kept;
    /// further blocks (inner rings, multi-polygons) are skipped.
    pub fn decode_way<R: Read + Seek>(
        &self,
        reader: &mut StreamReader<R>,
        arena: &mut Arena,
    ) -> Result<Decoded> {
        if self.debug {
            reader.skip(WAY_SIGNATURE_LEN)?;
        }
        let way_size = reader.read_vbe_u32()? as usize;
        let way_end = reader.position() + way_size as u64;
        reader.ensure_buffered(way_size)?;

        let subtile_bitmap = reader.read_u16()?;
        if subtile_bitmap & self.subtile_filter == 0 {
            trace!(
                "Skipping way with subtiles {:#06x} (filter {:#06x})",
                subtile_bitmap,
                self.subtile_filter
            );
            reader.seek_absolute(way_end)?;
            return Ok(Decoded::Skip);
        }

        let special = reader.read_u8()?;
        let layer = (special >> 4) as i8 - LAYER_SHIFT;
        let tag_count = usize::from(special & 0x0f);

        let tags = arena.allocate(tag_count * TAG_BYTES)?;
        for chunk in arena.get_mut(tags)?.chunks_exact_mut(TAG_BYTES) {
            let id = reader.read_vbe_u32()?;
            let id = u16::try_from(id).map_err(|_| MapError::LengthExceeded {
                what: "way tag id",
                len: id as usize,
                max: usize::from(u16::MAX),
            })?;
            LittleEndian::write_u16(chunk, id);
        }

        let flags = reader.read_u8()?;
        if flags & WAY_NAME != 0 {
            reader.skip_vbe_string()?;
        }
        if flags & WAY_HOUSE_NUMBER != 0 {
            reader.skip_vbe_string()?;
        }
        if flags & WAY_REFERENCE != 0 {
            reader.skip_vbe_string()?;
        }
        if flags & WAY_LABEL != 0 {
            reader.read_vbe_i32()?;
            reader.read_vbe_i32()?;
        }
        let data_blocks = if flags & WAY_DATA_BLOCKS != 0 {
            reader.read_vbe_u32()?
        } else {
            1
        };

        let node_count = if data_blocks > 0 && reader.read_vbe_u32()? > 0 {
            reader.read_vbe_u32()? as usize
        } else {
            0
        };
        // every node takes at least two bytes on the wire
        if node_count * 2 > way_size {
            return Err(MapError::LengthExceeded {
                what: "way nodes",
                len: node_count,
                max: way_size / 2,
            });
        }

        let coords = arena.allocate(node_count * COORD_BYTES)?;
        self.decode_nodes(
            reader,
            arena.get_mut(coords)?,
            flags & WAY_DOUBLE_DELTA != 0,
        )?;
        reader.seek_absolute(way_end)?;

        trace!(
            "Decoded way: layer {}, {} tag(s), {} node(s)",
            layer,
            tag_count,
            node_count
        );
        Ok(Decoded::Way(WayRecord {
            subtile_bitmap,
            layer,
            tags,
            coords,
        }))
    }

    /// The first node is an offset from the tile's north-west corner, every
    /// following node a delta to its predecessor. With double-delta encoding
    /// the deltas are themselves delta-encoded.
    fn decode_nodes<R: Read + Seek>(
        &self,
        reader: &mut StreamReader<R>,
        out: &mut [u8],
        double_delta: bool,
    ) -> Result<()> {
        let (mut lat, mut lon) = (0_i32, 0_i32);
        let (mut delta_lat, mut delta_lon) = (0_i32, 0_i32);
        for (i, chunk) in out.chunks_exact_mut(COORD_BYTES).enumerate() {
            let d_lat = reader.read_vbe_i32()?;
            let d_lon = reader.read_vbe_i32()?;
            if i == 0 {
                lat = d_lat;
                lon = d_lon;
            } else if double_delta {
                delta_lat = delta_lat.wrapping_add(d_lat);
                delta_lon = delta_lon.wrapping_add(d_lon);
                lat = lat.wrapping_add(delta_lat);
                lon = lon.wrapping_add(delta_lon);
            } else {
                lat = lat.wrapping_add(d_lat);
                lon = lon.wrapping_add(d_lon);
            }
            let (x, y) = self.projection.to_pixel(lat, lon);
            LittleEndian::write_i16(&mut chunk[0..2], x);
            LittleEndian::write_i16(&mut chunk[2..4], y);
        }
        Ok(())
    }
}
