use image::RgbaImage;

use crate::device::PixelFormat;
use crate::paint::Color;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PixelBufferError {
    #[error("pixel buffer has zero width or height ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("{width}x{height} {format:?} needs {expected} bytes, got {actual}")]
    SizeMismatch { width: u32, height: u32, format: PixelFormat, expected: usize, actual: usize },
}

/// A decoded image in row-major order with the **top** row first, the way
/// image decoders produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self, PixelBufferError> {
        if width == 0 || height == 0 {
            return Err(PixelBufferError::Empty { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(PixelBufferError::SizeMismatch { width, height, format, expected, actual: data.len() });
        }
        Ok(Self { width, height, format, data })
    }

    /// A 1×1 image of `color`.
    pub fn solid(color: Color) -> Self {
        Self { width: 1, height: 1, format: PixelFormat::Rgba8, data: color.to_rgba8().to_vec() }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Bytes of pixel `(x, y)`, top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.row_bytes() + x as usize * bpp;
        self.data.get(start..start + bpp)
    }

    /// The same image with its rows in reverse order.
    pub fn flipped_vertically(&self) -> Self {
        let data = self.data.chunks_exact(self.row_bytes()).rev().flatten().copied().collect();
        Self { data, ..*self }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height, format: PixelFormat::Rgba8, data: image.into_raw() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> PixelBuffer {
        #[rustfmt::skip]
        let data = vec![
            255, 0, 0, 255,    0, 255, 0, 255,
            0, 0, 255, 255,    255, 255, 255, 255,
        ];
        PixelBuffer::new(2, 2, PixelFormat::Rgba8, data).unwrap()
    }

    #[test]
    fn validates_dimensions() {
        assert_eq!(
            PixelBuffer::new(0, 4, PixelFormat::Rgba8, vec![]),
            Err(PixelBufferError::Empty { width: 0, height: 4 })
        );
        assert!(matches!(
            PixelBuffer::new(2, 2, PixelFormat::Rgba8, vec![0; 15]),
            Err(PixelBufferError::SizeMismatch { expected: 16, actual: 15, .. })
        ));
    }

    #[test]
    fn flip_reverses_rows_only() {
        let flipped = two_by_two().flipped_vertically();
        assert_eq!(flipped.pixel(0, 0), Some(&[0, 0, 255, 255][..]));
        assert_eq!(flipped.pixel(1, 0), Some(&[255, 255, 255, 255][..]));
        assert_eq!(flipped.pixel(0, 1), Some(&[255, 0, 0, 255][..]));
        assert_eq!(flipped.flipped_vertically(), two_by_two());
    }

    #[test]
    fn from_rgba_image() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 4]));
        let buffer = PixelBuffer::from(image);
        assert_eq!((buffer.width(), buffer.height()), (3, 2));
        assert_eq!(buffer.pixel(2, 1), Some(&[1, 2, 3, 4][..]));
        assert_eq!(buffer.pixel(3, 0), None);
    }

    #[test]
    fn solid_color() {
        let buffer = PixelBuffer::solid(Color::MAGENTA);
        assert_eq!(buffer.data(), &[255, 0, 255, 255]);
    }
}
