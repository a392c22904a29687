//! Interfaces of the display driver the renderer draws into.
//!
//! The pixel primitives are provided by the hardware layer. Line drawing is
//! derived from them for any [`Display`], clipped to its clip window.

/// 8-bit color with 3 bits red, 3 bits green and 2 bits blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb332(pub u8);

impl Rgb332 {
    pub const BLACK: Rgb332 = Rgb332(0);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Rgb332((r & 0xe0) | ((g & 0xe0) >> 3) | (b >> 6))
    }

    /// Expands to 8 bits per channel by bit replication.
    pub fn to_rgb(self) -> [u8; 3] {
        let r = self.0 & 0xe0;
        let g = (self.0 << 3) & 0xe0;
        let b = self.0 & 0x03;
        [
            r | (r >> 3) | (r >> 6),
            g | (g >> 3) | (g >> 6),
            b * 0x55,
        ]
    }

    pub fn is_black(self) -> bool {
        self.0 == 0
    }
}

/// Inclusive pixel rectangle outside of which nothing is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipWindow {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl ClipWindow {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }

    /// Both end points lie beyond the same edge, widened by `margin`.
    fn rejects(&self, from: (i32, i32), to: (i32, i32), margin: i32) -> bool {
        from.0.max(to.0) < self.x0.saturating_sub(margin)
            || from.0.min(to.0) > self.x1.saturating_add(margin)
            || from.1.max(to.1) < self.y0.saturating_sub(margin)
            || from.1.min(to.1) > self.y1.saturating_add(margin)
    }
}

/// Pixel-level display driver.
pub trait Display {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// Writes one pixel. Callers stay inside the clip window.
    fn put_pixel(&mut self, x: i32, y: i32, color: Rgb332);

    fn draw_hline(&mut self, x: i32, y: i32, width: i32, color: Rgb332) {
        for i in 0..width {
            self.put_pixel(x + i, y, color);
        }
    }

    fn draw_vline(&mut self, x: i32, y: i32, height: i32, color: Rgb332) {
        for i in 0..height {
            self.put_pixel(x, y + i, color);
        }
    }

    /// Pushes the back buffer to the panel and returns the number of bytes
    /// transferred.
    fn flush(&mut self) -> usize;

    fn color_from_rgb(&self, r: u8, g: u8, b: u8) -> Rgb332 {
        Rgb332::from_rgb(r, g, b)
    }

    fn clip_window(&self) -> ClipWindow {
        ClipWindow {
            x0: 0,
            y0: 0,
            x1: self.width() - 1,
            y1: self.height() - 1,
        }
    }
}

/// Consumer of the renderer's line segments.
pub trait LineSink {
    /// Draws a segment between two pixels with a square pen of
    /// `2 * half_width - 1` pixels, clipped to the active clip window.
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), half_width: u8, color: Rgb332);
}

impl<D: Display> LineSink for D {
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), half_width: u8, color: Rgb332) {
        let clip = self.clip_window();
        let r = i32::from(half_width.max(1)) - 1;
        if clip.rejects(from, to, r) {
            return;
        }
        // the pen is filled along the minor axis of the segment
        let steep = to.1.abs_diff(from.1) > to.0.abs_diff(from.0);
        for (x, y) in bresenham(from, to) {
            if r == 0 {
                if clip.contains(x, y) {
                    self.put_pixel(x, y, color);
                }
                continue;
            }
            let x0 = (x - r).max(clip.x0);
            let x1 = (x + r).min(clip.x1);
            let y0 = (y - r).max(clip.y0);
            let y1 = (y + r).min(clip.y1);
            if x0 > x1 || y0 > y1 {
                continue;
            }
            if steep {
                for px in x0..=x1 {
                    self.draw_vline(px, y0, y1 - y0 + 1, color);
                }
            } else {
                for py in y0..=y1 {
                    self.draw_hline(x0, py, x1 - x0 + 1, color);
                }
            }
        }
    }
}

/// Bresenham's line algorithm, including both end points.
///
/// https://en.wikipedia.org/wiki/Bresenham%27s_line_algorithm
pub fn bresenham(
    (mut x0, mut y0): (i32, i32),
    (x1, y1): (i32, i32),
) -> impl Iterator<Item = (i32, i32)> {
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut done = false;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let res = (x0, y0);
        if x0 == x1 && y0 == y1 {
            done = true;
            return Some(res);
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        Some(res)
    })
}
