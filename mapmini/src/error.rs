use std::io;
use std::path::PathBuf;

/// Errors produced while decoding a map file or rendering its ways.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("map file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("not a map file: magic string mismatch")]
    BadMagic,
    #[error("arena overflow: requested {requested} bytes, {remaining} of {capacity} left")]
    ArenaOverflow {
        requested: usize,
        remaining: usize,
        capacity: usize,
    },
    #[error("short read at offset {offset}: {needed} more byte(s) needed")]
    ShortRead { offset: u64, needed: usize },
    #[error("seek to offset {0} failed")]
    SeekFailure(u64),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{what} exceeds limit: {len} > {max}")]
    LengthExceeded {
        what: &'static str,
        len: usize,
        max: usize,
    },
    #[error("no zoom interval strictly contains zoom level {0}")]
    NoZoomInterval(u8),
    #[error("tile {x}/{y} is outside of the map at base zoom {zoom}")]
    TileOutOfBounds { x: u32, y: u32, zoom: u8 },
    #[error("invalid UTF-8 string at offset {0}")]
    InvalidString(u64),
    #[error("arena region was invalidated by a reset or lies past the arena cursor")]
    StaleRegion,
    #[error("malformed variable byte integer at offset {0}")]
    MalformedVbe(u64),
}

pub type Result<T> = std::result::Result<T, MapError>;

impl MapError {
    /// Negative status code of the device API.
    ///
    /// A successful load reports its way count instead, which is `0` for
    /// water and empty tiles, so every error code is strictly negative.
    pub fn status_code(&self) -> i32 {
        match self {
            MapError::FileNotFound(_) => -1,
            MapError::BadMagic => -2,
            MapError::ArenaOverflow { .. } => -3,
            MapError::ShortRead { .. } | MapError::SeekFailure(_) | MapError::Io(_) => -4,
            MapError::LengthExceeded { .. } => -5,
            MapError::NoZoomInterval(_) => -6,
            MapError::TileOutOfBounds { .. } => -7,
            MapError::InvalidString(_) | MapError::MalformedVbe(_) => -8,
            MapError::StaleRegion => -9,
        }
    }
}
