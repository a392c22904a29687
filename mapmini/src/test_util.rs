//! Hand-built map files for tests.

use crate::header::{BoundingBox, MAGIC};
use crate::projection::{tile_x_to_lon, tile_y_to_lat, MICRO_DEGREES};
use crate::way::{WAY_DATA_BLOCKS, WAY_DOUBLE_DELTA, WAY_LABEL, WAY_NAME};

use byteorder::{BigEndian, WriteBytesExt};

use std::io::Write;

pub fn write_vbe_u32(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn write_vbe_i32(out: &mut Vec<u8>, value: i32) {
    let mut magnitude = value.unsigned_abs();
    while magnitude > 0x3f {
        out.push((magnitude & 0x7f) as u8 | 0x80);
        magnitude >>= 7;
    }
    out.push(magnitude as u8 | if value < 0 { 0x40 } else { 0 });
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8);
    out.extend(s.as_bytes());
}

fn write_vbe_string(out: &mut Vec<u8>, s: &str) {
    write_vbe_u32(out, s.len() as u32);
    out.extend(s.as_bytes());
}

/// Bounding box covering the tiles `x0..=x1`, `y0..=y1` at `zoom`, shrunk by
/// a small margin so that its edges fall strictly inside the outer tiles.
pub fn bbox_for_tiles(x0: u32, y0: u32, x1: u32, y1: u32, zoom: u8) -> BoundingBox {
    const MARGIN: i32 = 100;
    let micro = |deg: f64| (deg * MICRO_DEGREES).round() as i32;
    BoundingBox {
        min_lat: micro(tile_y_to_lat(i64::from(y1) + 1, zoom)) + MARGIN,
        min_lon: micro(tile_x_to_lon(i64::from(x0), zoom)) + MARGIN,
        max_lat: micro(tile_y_to_lat(i64::from(y0), zoom)) - MARGIN,
        max_lon: micro(tile_x_to_lon(i64::from(x1) + 1, zoom)) - MARGIN,
    }
}

/// Extent of a tile in micro-degrees as (latitude, longitude) span.
pub fn tile_span_micro(x: u32, y: u32, zoom: u8) -> (i32, i32) {
    let (x, y) = (i64::from(x), i64::from(y));
    let lat = tile_y_to_lat(y, zoom) - tile_y_to_lat(y + 1, zoom);
    let lon = tile_x_to_lon(x + 1, zoom) - tile_x_to_lon(x, zoom);
    (
        (lat * MICRO_DEGREES).round() as i32,
        (lon * MICRO_DEGREES).round() as i32,
    )
}

#[derive(Debug, Clone)]
pub struct WayFixture {
    pub subtile_bitmap: u16,
    pub layer: i8,
    pub tags: Vec<u32>,
    pub name: Option<String>,
    pub label: Option<(i32, i32)>,
    /// (latitude, longitude) offsets from the tile's north-west corner
    pub nodes: Vec<(i32, i32)>,
    pub double_delta: bool,
    /// Appends a second way-data block with an inner ring.
    pub extra_blocks: bool,
}

impl WayFixture {
    pub fn new(tags: &[u32], nodes: &[(i32, i32)]) -> Self {
        Self {
            subtile_bitmap: 0xffff,
            layer: 0,
            tags: tags.to_vec(),
            name: None,
            label: None,
            nodes: nodes.to_vec(),
            double_delta: false,
            extra_blocks: false,
        }
    }

    pub fn encode(&self, debug: bool, out: &mut Vec<u8>) {
        let mut body = Vec::new();
        body.write_u16::<BigEndian>(self.subtile_bitmap).unwrap();
        body.push((((self.layer + 5) as u8) << 4) | self.tags.len() as u8);
        for &tag in &self.tags {
            write_vbe_u32(&mut body, tag);
        }

        let mut flags = 0;
        if self.name.is_some() {
            flags |= WAY_NAME;
        }
        if self.label.is_some() {
            flags |= WAY_LABEL;
        }
        if self.extra_blocks {
            flags |= WAY_DATA_BLOCKS;
        }
        if self.double_delta {
            flags |= WAY_DOUBLE_DELTA;
        }
        body.push(flags);
        if let Some(ref name) = self.name {
            write_vbe_string(&mut body, name);
        }
        if let Some((lat, lon)) = self.label {
            write_vbe_i32(&mut body, lat);
            write_vbe_i32(&mut body, lon);
        }
        if self.extra_blocks {
            write_vbe_u32(&mut body, 2);
        }

        write_vbe_u32(&mut body, 1);
        self.encode_nodes(&mut body, &self.nodes);
        if self.extra_blocks {
            write_vbe_u32(&mut body, 2);
            self.encode_nodes(&mut body, &[(0, 0), (-500, 500), (0, 900)]);
            self.encode_nodes(&mut body, &[(-100, 100), (-200, 200)]);
        }

        if debug {
            out.extend(&[b'#'; 32]);
        }
        write_vbe_u32(out, body.len() as u32);
        out.extend(body);
    }

    fn encode_nodes(&self, out: &mut Vec<u8>, nodes: &[(i32, i32)]) {
        write_vbe_u32(out, nodes.len() as u32);
        let mut prev = (0, 0);
        let mut prev_delta = (0, 0);
        for (i, &(lat, lon)) in nodes.iter().enumerate() {
            if i == 0 {
                write_vbe_i32(out, lat);
                write_vbe_i32(out, lon);
            } else {
                let delta = (lat - prev.0, lon - prev.1);
                if self.double_delta {
                    write_vbe_i32(out, delta.0 - prev_delta.0);
                    write_vbe_i32(out, delta.1 - prev_delta.1);
                } else {
                    write_vbe_i32(out, delta.0);
                    write_vbe_i32(out, delta.1);
                }
                prev_delta = delta;
            }
            prev = (lat, lon);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TileFixture {
    /// (poi count, way count) per zoom level of the interval
    pub zoom_rows: Vec<(u32, u32)>,
    /// Opaque bytes standing in for the POI section.
    pub poi_bytes: Vec<u8>,
    pub ways: Vec<WayFixture>,
}

impl TileFixture {
    fn encode(&self, debug: bool, out: &mut Vec<u8>) {
        if debug {
            out.extend(&[b'#'; 32]);
        }
        for &(pois, ways) in &self.zoom_rows {
            write_vbe_u32(out, pois);
            write_vbe_u32(out, ways);
        }
        write_vbe_u32(out, self.poi_bytes.len() as u32);
        out.extend(&self.poi_bytes);
        for way in &self.ways {
            way.encode(debug, out);
        }
    }
}

#[derive(Debug, Clone)]
pub enum TileEntry {
    Water,
    Data(TileFixture),
}

#[derive(Debug, Clone)]
pub struct IntervalFixture {
    pub base_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Tiles of the interval grid in row-major order.
    pub tiles: Vec<TileEntry>,
}

impl IntervalFixture {
    fn encode(&self, debug: bool) -> Vec<u8> {
        let mut directory = Vec::new();
        if debug {
            directory.extend(b"+++IndexStart+++");
        }
        // tile offsets count from the start of the sub-file
        let directory_len = directory.len() + self.tiles.len() * 5;
        let mut data = Vec::new();
        for tile in &self.tiles {
            let entry = match tile {
                TileEntry::Water => 0x80_0000_0000,
                TileEntry::Data(fixture) => {
                    let offset = (directory_len + data.len()) as u64;
                    fixture.encode(debug, &mut data);
                    offset
                }
            };
            directory.write_uint::<BigEndian>(entry, 5).unwrap();
        }
        directory.extend(data);
        directory
    }
}

#[derive(Debug, Clone)]
pub struct MapWriter {
    pub file_version: u32,
    pub file_creation: i64,
    pub bounding_box: BoundingBox,
    pub tile_size: u16,
    pub projection: String,
    pub debug: bool,
    pub start_position: Option<(i32, i32)>,
    pub start_zoom: Option<u8>,
    pub language: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub poi_tags: Vec<String>,
    pub way_tags: Vec<String>,
    pub intervals: Vec<IntervalFixture>,
}

impl MapWriter {
    pub fn new(bounding_box: BoundingBox) -> Self {
        Self {
            file_version: 3,
            file_creation: 1_600_000_000_000,
            bounding_box,
            tile_size: 256,
            projection: "Mercator".into(),
            debug: false,
            start_position: None,
            start_zoom: None,
            language: None,
            comment: None,
            created_by: None,
            poi_tags: Vec::new(),
            way_tags: Vec::new(),
            intervals: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let sub_files: Vec<Vec<u8>> = self
            .intervals
            .iter()
            .map(|interval| interval.encode(self.debug))
            .collect();
        let sizes: Vec<u64> = sub_files.iter().map(|s| s.len() as u64).collect();

        let header_len = self.encode_header(&sizes, &sizes, 0).len() as u64;
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut next = header_len;
        for size in &sizes {
            offsets.push(next);
            next += size;
        }

        let mut out = self.encode_header(&offsets, &sizes, next);
        for sub_file in sub_files {
            out.extend(sub_file);
        }
        out
    }

    pub fn to_temp_file(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&self.to_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn encode_header(&self, offsets: &[u64], sizes: &[u64], file_size: u64) -> Vec<u8> {
        let mut body = Vec::new();
        body.write_u32::<BigEndian>(self.file_version).unwrap();
        body.write_u64::<BigEndian>(file_size).unwrap();
        body.write_i64::<BigEndian>(self.file_creation).unwrap();
        let bbox = &self.bounding_box;
        for value in [bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon] {
            body.write_i32::<BigEndian>(value).unwrap();
        }
        body.write_u16::<BigEndian>(self.tile_size).unwrap();
        write_string(&mut body, &self.projection);

        let mut flags = 0;
        if self.debug {
            flags |= 0x80;
        }
        if self.start_position.is_some() {
            flags |= 0x40;
        }
        if self.start_zoom.is_some() {
            flags |= 0x20;
        }
        if self.language.is_some() {
            flags |= 0x10;
        }
        if self.comment.is_some() {
            flags |= 0x08;
        }
        if self.created_by.is_some() {
            flags |= 0x04;
        }
        body.push(flags);
        if let Some((lat, lon)) = self.start_position {
            body.write_i32::<BigEndian>(lat).unwrap();
            body.write_i32::<BigEndian>(lon).unwrap();
        }
        if let Some(zoom) = self.start_zoom {
            body.push(zoom);
        }
        for s in [&self.language, &self.comment, &self.created_by]
            .into_iter()
            .flatten()
        {
            write_string(&mut body, s);
        }

        for table in [&self.poi_tags, &self.way_tags] {
            body.write_u16::<BigEndian>(table.len() as u16).unwrap();
            for name in table {
                write_string(&mut body, name);
            }
        }

        body.push(self.intervals.len() as u8);
        for (i, interval) in self.intervals.iter().enumerate() {
            body.push(interval.base_zoom);
            body.push(interval.min_zoom);
            body.push(interval.max_zoom);
            body.write_u64::<BigEndian>(offsets[i]).unwrap();
            body.write_u64::<BigEndian>(sizes[i]).unwrap();
        }

        let mut out = MAGIC.to_vec();
        out.write_u32::<BigEndian>(body.len() as u32).unwrap();
        out.extend(body);
        out
    }
}
