//! Mapping from way tags to line styles.

use crate::arena::Arena;
use crate::display::Rgb332;
use crate::error::Result;
use crate::way::WayRecord;

/// Color and pen size of a rendered way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub color: Rgb332,
    pub half_width: u8,
}

impl Style {
    pub const fn new(r: u8, g: u8, b: u8, half_width: u8) -> Self {
        Self {
            color: Rgb332::from_rgb(r, g, b),
            half_width,
        }
    }

    /// Black styles are never drawn.
    pub fn is_visible(&self) -> bool {
        !self.color.is_black()
    }
}

/// Road styles with the tag ids they have in the way tag table of the
/// reference map files.
const ROAD_STYLES: &[(u16, &str, Style)] = &[
    (26, "highway=pedestrian", Style::new(0xe5, 0xe0, 0xc2, 1)),
    (13, "highway=steps", Style::new(0xe5, 0xe0, 0xc2, 1)),
    (3, "highway=footway", Style::new(0xaa, 0x00, 0x00, 1)),
    (4, "highway=path", Style::new(0xaa, 0x00, 0x00, 1)),
    (2, "highway=track", Style::new(0xff, 0xfa, 0xf2, 1)),
    (14, "highway=cycleway", Style::new(0xff, 0xf2, 0xde, 1)),
    (32, "highway=bridleway", Style::new(0xd3, 0xcb, 0x98, 1)),
    (0, "highway=service", Style::new(0xff, 0xff, 0xff, 1)),
    (28, "highway=construction", Style::new(0xd0, 0xd0, 0xd0, 1)),
    (64, "highway=road", Style::new(0xd0, 0xd0, 0xd0, 2)),
    (1, "highway=residential", Style::new(0xff, 0xff, 0xff, 2)),
    (6, "highway=unclassified", Style::new(0xff, 0xff, 0xff, 2)),
    (30, "highway=living_street", Style::new(0xff, 0xff, 0xff, 2)),
    (8, "highway=tertiary", Style::new(0xff, 0xff, 0x90, 3)),
    (35, "highway=tertiary_link", Style::new(0xff, 0xff, 0x90, 3)),
    (12, "highway=secondary", Style::new(0xbb, 0x85, 0x0f, 3)),
    (34, "highway=secondary_link", Style::new(0xbb, 0x85, 0x0f, 3)),
    (7, "highway=primary", Style::new(0xfe, 0x85, 0x0c, 4)),
    (27, "highway=primary_link", Style::new(0xfe, 0x85, 0x0c, 3)),
    (11, "highway=trunk", Style::new(0x80, 0x00, 0x40, 4)),
    (24, "highway=trunk_link", Style::new(0x80, 0x00, 0x40, 3)),
    (21, "highway=motorway", Style::new(0x40, 0x00, 0x00, 3)),
    (23, "highway=motorway_link", Style::new(0x40, 0x00, 0x00, 3)),
];

/// Ordered list of (tag id, style) pairs. The first entry for a tag id wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    entries: Vec<(u16, Style)>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::from_pairs(ROAD_STYLES.iter().map(|&(id, _, style)| (id, style)))
    }
}

impl StyleTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u16, Style)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Builds the road table by resolving tag names such as
    /// `highway=primary` against the way tag table of a file header.
    ///
    /// Roads whose tag is not in the table are left out.
    pub fn from_tag_names(way_tags: &[String]) -> Self {
        let pairs = ROAD_STYLES.iter().filter_map(|&(_, name, style)| {
            let id = way_tags.iter().position(|tag| tag == name)?;
            Some((u16::try_from(id).ok()?, style))
        });
        Self::from_pairs(pairs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn style_for(&self, tag_id: u16) -> Option<Style> {
        self.entries
            .iter()
            .find(|(id, _)| *id == tag_id)
            .map(|&(_, style)| style)
    }

    /// Style of the first tag in `tags` that has one.
    pub fn style_for_tags(&self, tags: impl IntoIterator<Item = u16>) -> Option<Style> {
        tags.into_iter().find_map(|id| self.style_for(id))
    }

    pub fn style_for_way(&self, arena: &Arena, way: &WayRecord) -> Result<Option<Style>> {
        Ok(self.style_for_tags(way.tags(arena)?))
    }
}
