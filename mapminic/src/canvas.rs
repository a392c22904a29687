use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use mapmini::{Display, Rgb332};

/// Software framebuffer standing in for the display panel.
///
/// Pixels are drawn into an RGB332 back buffer; `flush` expands it into the
/// RGB front buffer that is written as PNG.
pub struct Canvas {
    width: u16,
    height: u16,
    back: Vec<Rgb332>,
    front: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        let len = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            back: vec![Rgb332::BLACK; len],
            front: vec![0; len * 3],
        }
    }

    pub fn clear(&mut self) {
        let black = self.color_from_rgb(0, 0, 0);
        self.back.fill(black);
    }

    pub fn write_png(&self, path: &Path) -> Result<(), png::EncodingError> {
        let buf = BufWriter::new(File::create(path)?);
        let mut encoder = png::Encoder::new(buf, u32::from(self.width), u32::from(self.height));
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.front[..])?;
        Ok(())
    }
}

impl Display for Canvas {
    fn width(&self) -> i32 {
        i32::from(self.width)
    }

    fn height(&self) -> i32 {
        i32::from(self.height)
    }

    fn put_pixel(&mut self, x: i32, y: i32, color: Rgb332) {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return;
        }
        let idx = y as usize * usize::from(self.width) + x as usize;
        self.back[idx] = color;
    }

    fn flush(&mut self) -> usize {
        for (pixel, rgb) in self.back.iter().zip(self.front.chunks_exact_mut(3)) {
            rgb.copy_from_slice(&pixel.to_rgb());
        }
        self.front.len()
    }
}
