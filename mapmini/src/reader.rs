//! Buffered big-endian reader over a seekable source.
//!
//! The reader keeps one fixed-size window of the file in memory. Reads which
//! run past the window refill it with a single read of the source; seeks into
//! the window only move the position inside it.

use crate::error::{MapError, Result};

use byteorder::{BigEndian, ByteOrder};

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Counters of the reads issued to the backing source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    pub refills: u64,
    pub bytes_read: u64,
}

#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    buffer: Box<[u8]>,
    // file offset of `buffer[0]`; the source is always positioned at
    // `buffer_start + valid`
    buffer_start: u64,
    pos: usize,
    valid: usize,
    stats: ReaderStats,
}

impl StreamReader<File> {
    /// Opens a map file and loads the first window.
    pub fn open<P: AsRef<Path>>(path: P, buffer_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MapError::FileNotFound(path.to_owned()),
            _ => MapError::Io(e),
        })?;
        Self::new(file, buffer_size)
    }
}

impl<R: Read + Seek> StreamReader<R> {
    // the widest fixed-size value must fit into one window
    const MIN_BUFFER_SIZE: usize = 8;

    pub fn new(mut inner: R, buffer_size: usize) -> Result<Self> {
        inner
            .seek(SeekFrom::Start(0))
            .map_err(|_| MapError::SeekFailure(0))?;
        let mut reader = Self {
            inner,
            buffer: vec![0; buffer_size.max(Self::MIN_BUFFER_SIZE)].into_boxed_slice(),
            buffer_start: 0,
            pos: 0,
            valid: 0,
            stats: ReaderStats::default(),
        };
        reader.refill()?;
        Ok(reader)
    }

    /// Logical offset of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.buffer_start + self.pos as u64
    }

    /// Bytes left in the current window.
    pub fn remaining(&self) -> usize {
        self.valid - self.pos
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    pub fn close(self) {}

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> Result<usize> {
        self.buffer_start += self.valid as u64;
        self.pos = 0;
        self.valid = 0;
        let n = loop {
            match self.inner.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.valid = n;
        self.stats.refills += 1;
        self.stats.bytes_read += n as u64;
        Ok(n)
    }

    fn fill(&mut self, out: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < out.len() {
            if self.pos == self.valid && self.refill()? == 0 {
                return Err(MapError::ShortRead {
                    offset: self.position(),
                    needed: out.len() - done,
                });
            }
            let n = (self.valid - self.pos).min(out.len() - done);
            out[done..done + n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
            self.pos += n;
            done += n;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.pos == self.valid && self.refill()? == 0 {
            return Err(MapError::ShortRead {
                offset: self.position(),
                needed: 1,
            });
        }
        let byte = self.buffer[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        self.fill(&mut buf)?;
        Ok(BigEndian::read_u16(&buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.fill(&mut buf)?;
        Ok(BigEndian::read_u32(&buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0; 4];
        self.fill(&mut buf)?;
        Ok(BigEndian::read_i32(&buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0; 8];
        self.fill(&mut buf)?;
        Ok(BigEndian::read_u64(&buf))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0; 8];
        self.fill(&mut buf)?;
        Ok(BigEndian::read_i64(&buf))
    }

    /// Reads an unsigned big-endian integer of `n_bytes` bytes (1 to 8).
    pub fn read_varint(&mut self, n_bytes: usize) -> Result<u64> {
        if n_bytes == 0 || n_bytes > 8 {
            return Err(MapError::LengthExceeded {
                what: "fixed width integer",
                len: n_bytes,
                max: 8,
            });
        }
        let mut buf = [0; 8];
        self.fill(&mut buf[8 - n_bytes..])?;
        Ok(BigEndian::read_u64(&buf))
    }

    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let offset = self.position();
        let mut bytes = vec![0; len];
        self.fill(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| MapError::InvalidString(offset))
    }

    /// Reads an unsigned variable byte integer.
    ///
    /// Each byte carries 7 bits, least significant group first; a set high
    /// bit means another byte follows.
    pub fn read_vbe_u32(&mut self) -> Result<u32> {
        let start = self.position();
        let mut value: u64 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return u32::try_from(value).map_err(|_| MapError::MalformedVbe(start));
            }
        }
        Err(MapError::MalformedVbe(start))
    }

    /// Reads a signed variable byte integer.
    ///
    /// Like [`read_vbe_u32`](Self::read_vbe_u32), except that the last byte
    /// holds only 6 value bits and bit 6 is the sign.
    pub fn read_vbe_i32(&mut self) -> Result<i32> {
        let start = self.position();
        let mut value: i64 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            if byte & 0x80 != 0 {
                value |= i64::from(byte & 0x7f) << shift;
                continue;
            }
            value |= i64::from(byte & 0x3f) << shift;
            if byte & 0x40 != 0 {
                value = -value;
            }
            return i32::try_from(value).map_err(|_| MapError::MalformedVbe(start));
        }
        Err(MapError::MalformedVbe(start))
    }

    /// Skips a string prefixed with its vbe-u encoded length.
    pub fn skip_vbe_string(&mut self) -> Result<()> {
        let len = self.read_vbe_u32()?;
        self.skip(u64::from(len))
    }

    pub fn skip(&mut self, n_bytes: u64) -> Result<()> {
        let position = self.position();
        let offset = position
            .checked_add(n_bytes)
            .ok_or(MapError::SeekFailure(position))?;
        self.seek_absolute(offset)
    }

    /// Moves the read position to an absolute file offset.
    pub fn seek_absolute(&mut self, offset: u64) -> Result<()> {
        if offset >= self.buffer_start && offset <= self.buffer_start + self.valid as u64 {
            self.pos = (offset - self.buffer_start) as usize;
            return Ok(());
        }
        self.rewindow(offset)
    }

    /// Moves the read position `n_bytes` back and reloads the window so that
    /// it starts at the new position.
    pub fn seek_relative_back(&mut self, n_bytes: u64) -> Result<()> {
        let offset = self
            .position()
            .checked_sub(n_bytes)
            .ok_or(MapError::SeekFailure(0))?;
        self.rewindow(offset)
    }

    /// Makes sure the next `len` bytes are in the window, reloading it at the
    /// current position if needed. Lengths larger than the window are read
    /// through refills as usual.
    pub fn ensure_buffered(&mut self, len: usize) -> Result<()> {
        if self.remaining() < len && len <= self.buffer.len() {
            self.seek_relative_back(0)?;
        }
        Ok(())
    }

    fn rewindow(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|_| MapError::SeekFailure(offset))?;
        self.buffer_start = offset;
        self.pos = 0;
        self.valid = 0;
        self.refill()?;
        Ok(())
    }
}
