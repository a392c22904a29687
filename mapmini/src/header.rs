//! Map file header and zoom-interval table.

use crate::config::MapConfig;
use crate::error::{MapError, Result};
use crate::projection::{lat_to_tile_y, lon_to_tile_x, MICRO_DEGREES};
use crate::reader::StreamReader;

use log::debug;

use std::io::{Read, Seek};

pub const MAGIC: &[u8; 20] = b"mapsforge binary OSM";

const FLAG_DEBUG: u8 = 0x80;
const FLAG_START_POSITION: u8 = 0x40;
const FLAG_START_ZOOM: u8 = 0x20;
const FLAG_LANGUAGE: u8 = 0x10;
const FLAG_COMMENT: u8 = 0x08;
const FLAG_CREATED_BY: u8 = 0x04;

/// Bounding box of the map in micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub min_lat: i32,
    pub min_lon: i32,
    pub max_lat: i32,
    pub max_lon: i32,
}

impl BoundingBox {
    /// West and north edges as tile indices at `zoom`.
    pub fn origin_tile(&self, zoom: u8) -> (i64, i64) {
        (
            lon_to_tile_x(degrees(self.min_lon), zoom),
            lat_to_tile_y(degrees(self.max_lat), zoom),
        )
    }

    /// East and south edges as tile indices at `zoom`.
    pub fn end_tile(&self, zoom: u8) -> (i64, i64) {
        (
            lon_to_tile_x(degrees(self.max_lon), zoom),
            lat_to_tile_y(degrees(self.min_lat), zoom),
        )
    }
}

#[inline]
fn degrees(micro: i32) -> f64 {
    f64::from(micro) / MICRO_DEGREES
}

/// A zoom range stored as one sub-file with its own tile directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomInterval {
    pub base_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub sub_file_offset: u64,
    pub sub_file_size: u64,
    /// Tile column of the bounding box's west edge at `base_zoom`.
    pub origin_x: i64,
    /// Tile row of the bounding box's north edge at `base_zoom`.
    pub origin_y: i64,
    pub tile_count_x: i64,
    pub tile_count_y: i64,
}

impl ZoomInterval {
    pub fn new(
        base_zoom: u8,
        min_zoom: u8,
        max_zoom: u8,
        sub_file_offset: u64,
        sub_file_size: u64,
        bbox: &BoundingBox,
    ) -> Self {
        let (origin_x, origin_y) = bbox.origin_tile(base_zoom);
        let (end_x, end_y) = bbox.end_tile(base_zoom);
        Self {
            base_zoom,
            min_zoom,
            max_zoom,
            sub_file_offset,
            sub_file_size,
            origin_x,
            origin_y,
            tile_count_x: end_x - origin_x + 1,
            tile_count_y: end_y - origin_y + 1,
        }
    }

    /// Whether `zoom` lies strictly between the interval bounds.
    ///
    /// A zoom level equal to either bound is not contained.
    pub fn contains(&self, zoom: u8) -> bool {
        self.min_zoom < zoom && zoom < self.max_zoom
    }

    /// Position of base-zoom tile (`x`, `y`) in the row-major tile directory.
    pub fn tile_index(&self, x: u32, y: u32) -> Option<u64> {
        let dx = i64::from(x) - self.origin_x;
        let dy = i64::from(y) - self.origin_y;
        if dx < 0 || dy < 0 || dx >= self.tile_count_x || dy >= self.tile_count_y {
            return None;
        }
        Some((dy * self.tile_count_x + dx) as u64)
    }
}

/// Picks the first interval in table order strictly containing `zoom`.
pub fn select_interval(intervals: &[ZoomInterval], zoom: u8) -> Option<&ZoomInterval> {
    intervals.iter().find(|interval| interval.contains(zoom))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub header_size: u32,
    pub file_version: u32,
    pub file_size: u64,
    /// Milliseconds since the Unix epoch.
    pub file_creation: i64,
    pub bounding_box: BoundingBox,
    pub tile_size: u16,
    pub projection: String,
    pub flags: u8,
    /// (latitude, longitude) in micro-degrees
    pub start_position: Option<(i32, i32)>,
    pub start_zoom: Option<u8>,
    pub language: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub poi_tags: Vec<String>,
    pub way_tags: Vec<String>,
    pub zoom_intervals: Vec<ZoomInterval>,
}

impl FileHeader {
    /// Debug files carry signatures in front of every tile and way.
    pub fn is_debug(&self) -> bool {
        self.flags & FLAG_DEBUG != 0
    }

    pub fn select_interval(&self, zoom: u8) -> Option<&ZoomInterval> {
        select_interval(&self.zoom_intervals, zoom)
    }
}

fn read_short_string<R: Read + Seek>(reader: &mut StreamReader<R>) -> Result<String> {
    let len = reader.read_u8()?;
    reader.read_string(usize::from(len))
}

fn read_optional_string<R: Read + Seek>(
    reader: &mut StreamReader<R>,
    flags: u8,
    flag: u8,
) -> Result<Option<String>> {
    if flags & flag == 0 {
        return Ok(None);
    }
    read_short_string(reader).map(Some)
}

fn read_tag_names<R: Read + Seek>(
    reader: &mut StreamReader<R>,
    what: &'static str,
    max: usize,
) -> Result<Vec<String>> {
    let len = usize::from(reader.read_u16()?);
    if len > max {
        return Err(MapError::LengthExceeded { what, len, max });
    }
    let mut names = Vec::with_capacity(len);
    for _ in 0..len {
        names.push(read_short_string(reader)?);
    }
    Ok(names)
}

/// Decodes the file header at the current reader position, which must be
/// the start of the file.
///
/// The magic string is checked before anything else is read: a mismatch
/// leaves the reader right behind the 20 magic bytes.
pub fn decode_header<R: Read + Seek>(
    reader: &mut StreamReader<R>,
    config: &MapConfig,
) -> Result<FileHeader> {
    let mut magic = [0; 20];
    for byte in magic.iter_mut() {
        *byte = reader.read_u8()?;
    }
    if &magic != MAGIC {
        return Err(MapError::BadMagic);
    }

    let header_size = reader.read_u32()?;
    let file_version = reader.read_u32()?;
    let file_size = reader.read_u64()?;
    let file_creation = reader.read_i64()?;
    let bounding_box = BoundingBox {
        min_lat: reader.read_i32()?,
        min_lon: reader.read_i32()?,
        max_lat: reader.read_i32()?,
        max_lon: reader.read_i32()?,
    };
    let tile_size = reader.read_u16()?;
    let projection = read_short_string(reader)?;

    let flags = reader.read_u8()?;
    let start_position = if flags & FLAG_START_POSITION != 0 {
        Some((reader.read_i32()?, reader.read_i32()?))
    } else {
        None
    };
    let start_zoom = if flags & FLAG_START_ZOOM != 0 {
        Some(reader.read_u8()?)
    } else {
        None
    };
    let language = read_optional_string(reader, flags, FLAG_LANGUAGE)?;
    let comment = read_optional_string(reader, flags, FLAG_COMMENT)?;
    let created_by = read_optional_string(reader, flags, FLAG_CREATED_BY)?;

    let poi_tags = read_tag_names(reader, "POI tag names", config.max_tag_names)?;
    let way_tags = read_tag_names(reader, "way tag names", config.max_tag_names)?;

    let n_intervals = usize::from(reader.read_u8()?);
    if n_intervals > config.max_zoom_intervals {
        return Err(MapError::LengthExceeded {
            what: "zoom intervals",
            len: n_intervals,
            max: config.max_zoom_intervals,
        });
    }
    let mut zoom_intervals = Vec::with_capacity(n_intervals);
    for _ in 0..n_intervals {
        let base_zoom = reader.read_u8()?;
        let min_zoom = reader.read_u8()?;
        let max_zoom = reader.read_u8()?;
        let sub_file_offset = reader.read_u64()?;
        let sub_file_size = reader.read_u64()?;
        let interval = ZoomInterval::new(
            base_zoom,
            min_zoom,
            max_zoom,
            sub_file_offset,
            sub_file_size,
            &bounding_box,
        );
        debug!(
            "Zoom interval {}..{} (base {}): {}x{} tiles at offset {}",
            min_zoom,
            max_zoom,
            base_zoom,
            interval.tile_count_x,
            interval.tile_count_y,
            sub_file_offset
        );
        zoom_intervals.push(interval);
    }

    debug!(
        "Decoded header: version {}, {} POI tags, {} way tags, {} zoom intervals",
        file_version,
        poi_tags.len(),
        way_tags.len(),
        zoom_intervals.len()
    );

    Ok(FileHeader {
        header_size,
        file_version,
        file_size,
        file_creation,
        bounding_box,
        tile_size,
        projection,
        flags,
        start_position,
        start_zoom,
        language,
        comment,
        created_by,
        poi_tags,
        way_tags,
        zoom_intervals,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::{bbox_for_tiles, IntervalFixture, MapWriter, TileEntry};
    use std::io::Cursor;

    fn decode(bytes: Vec<u8>, config: &MapConfig) -> (Result<FileHeader>, u64) {
        let mut reader = StreamReader::new(Cursor::new(bytes), 64).unwrap();
        let result = decode_header(&mut reader, config);
        (result, reader.position())
    }

    fn interval(base_zoom: u8, min_zoom: u8, max_zoom: u8, tiles: usize) -> IntervalFixture {
        IntervalFixture {
            base_zoom,
            min_zoom,
            max_zoom,
            tiles: vec![TileEntry::Water; tiles],
        }
    }

    #[test]
    fn test_decode_all_fields() {
        let bbox = bbox_for_tiles(8800, 5370, 8803, 5372, 14);
        let mut writer = MapWriter::new(bbox);
        writer.start_position = Some((52_520_000, 13_404_000));
        writer.start_zoom = Some(14);
        writer.language = Some("de".into());
        writer.comment = Some("test fixture".into());
        writer.created_by = Some("mapmini".into());
        writer.poi_tags = vec!["amenity=pub".into(), "shop=bakery".into()];
        writer.way_tags = vec!["highway=service".into(), "highway=residential".into()];
        writer.intervals = vec![interval(14, 12, 16, 12), interval(7, 0, 11, 1)];
        let bytes = writer.to_bytes();
        let file_size = bytes.len() as u64;

        let (header, _) = decode(bytes, &MapConfig::default());
        let header = header.unwrap();

        assert_eq!(header.file_version, 3);
        assert_eq!(header.file_size, file_size);
        assert_eq!(header.file_creation, 1_600_000_000_000);
        assert_eq!(header.bounding_box, bbox);
        assert_eq!(header.tile_size, 256);
        assert_eq!(header.projection, "Mercator");
        assert!(!header.is_debug());
        assert_eq!(header.start_position, Some((52_520_000, 13_404_000)));
        assert_eq!(header.start_zoom, Some(14));
        assert_eq!(header.language.as_deref(), Some("de"));
        assert_eq!(header.comment.as_deref(), Some("test fixture"));
        assert_eq!(header.created_by.as_deref(), Some("mapmini"));
        assert_eq!(header.poi_tags, ["amenity=pub", "shop=bakery"]);
        assert_eq!(header.way_tags, ["highway=service", "highway=residential"]);

        assert_eq!(header.zoom_intervals.len(), 2);
        let first = &header.zoom_intervals[0];
        assert_eq!((first.base_zoom, first.min_zoom, first.max_zoom), (14, 12, 16));
        assert_eq!((first.origin_x, first.origin_y), (8800, 5370));
        assert_eq!((first.tile_count_x, first.tile_count_y), (4, 3));
        assert_eq!(first.sub_file_size, 12 * 5);
        let second = &header.zoom_intervals[1];
        assert_eq!(second.sub_file_offset, first.sub_file_offset + 12 * 5);
        assert_eq!((second.tile_count_x, second.tile_count_y), (1, 1));
        assert_eq!(
            u64::from(header.header_size) + 24,
            first.sub_file_offset,
            "header size counts the bytes after the size field"
        );
    }

    #[test]
    fn test_decode_without_optional_fields() {
        let mut writer = MapWriter::new(bbox_for_tiles(0, 0, 0, 0, 5));
        writer.intervals = vec![interval(5, 0, 8, 1)];
        let (header, _) = decode(writer.to_bytes(), &MapConfig::default());
        let header = header.unwrap();
        assert_eq!(header.flags, 0);
        assert_eq!(header.start_position, None);
        assert_eq!(header.start_zoom, None);
        assert_eq!(header.language, None);
        assert_eq!(header.comment, None);
        assert_eq!(header.created_by, None);
        assert!(header.poi_tags.is_empty());
        assert!(header.way_tags.is_empty());
    }

    #[test]
    fn test_bad_magic_consumes_nothing_more() {
        let mut bytes = MapWriter::new(BoundingBox::default()).to_bytes();
        bytes[10] = b'X';
        let (result, position) = decode(bytes, &MapConfig::default());
        assert!(matches!(result, Err(MapError::BadMagic)));
        assert_eq!(position, 20);
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = MapWriter::new(BoundingBox::default()).to_bytes();
        bytes.truncate(40);
        let (result, _) = decode(bytes, &MapConfig::default());
        assert!(matches!(result, Err(MapError::ShortRead { .. })));
    }

    #[test]
    fn test_limits() {
        let mut writer = MapWriter::new(bbox_for_tiles(0, 0, 0, 0, 5));
        writer.way_tags = (0..5).map(|i| format!("highway={}", i)).collect();
        writer.intervals = vec![interval(5, 0, 8, 1); 3];
        let bytes = writer.to_bytes();

        let config = MapConfig {
            max_tag_names: 4,
            ..Default::default()
        };
        let (result, _) = decode(bytes.clone(), &config);
        assert!(matches!(
            result,
            Err(MapError::LengthExceeded {
                len: 5,
                max: 4,
                ..
            })
        ));

        let config = MapConfig {
            max_zoom_intervals: 2,
            ..Default::default()
        };
        let (result, _) = decode(bytes, &config);
        assert!(matches!(
            result,
            Err(MapError::LengthExceeded {
                what: "zoom intervals",
                len: 3,
                max: 2
            })
        ));
    }

    #[test]
    fn test_interval_selection_is_strict() {
        let bbox = BoundingBox::default();
        let intervals = [
            ZoomInterval::new(12, 10, 14, 0, 0, &bbox),
            ZoomInterval::new(16, 14, 18, 0, 0, &bbox),
        ];
        assert_eq!(select_interval(&intervals, 14), None);
        assert_eq!(select_interval(&intervals, 10), None);
        assert_eq!(select_interval(&intervals, 18), None);
        assert_eq!(select_interval(&intervals, 11), Some(&intervals[0]));
        assert_eq!(select_interval(&intervals, 13), Some(&intervals[0]));
        assert_eq!(select_interval(&intervals, 15), Some(&intervals[1]));
    }

    #[test]
    fn test_first_matching_interval_wins() {
        let bbox = BoundingBox::default();
        let intervals = [
            ZoomInterval::new(12, 8, 16, 0, 0, &bbox),
            ZoomInterval::new(14, 10, 18, 100, 0, &bbox),
        ];
        assert_eq!(select_interval(&intervals, 12), Some(&intervals[0]));
        assert_eq!(select_interval(&intervals, 17), Some(&intervals[1]));
    }

    #[test]
    fn test_tile_index() {
        let bbox = bbox_for_tiles(100, 200, 103, 202, 10);
        let interval = ZoomInterval::new(10, 8, 12, 0, 0, &bbox);
        assert_eq!(interval.tile_index(100, 200), Some(0));
        assert_eq!(interval.tile_index(103, 200), Some(3));
        assert_eq!(interval.tile_index(101, 202), Some(9));
        assert_eq!(interval.tile_index(104, 200), None);
        assert_eq!(interval.tile_index(99, 201), None);
        assert_eq!(interval.tile_index(100, 203), None);
    }
}
