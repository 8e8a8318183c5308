use std::borrow::Cow;
use std::path::PathBuf;

use crate::error::Result;

/// Source of a sampled texture's pixels.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded bytes (PNG, JPEG, BMP), typically from `include_bytes!`.
    Encoded(Cow<'static, [u8]>),
    /// Encoded file on disk.
    Path(PathBuf),
    /// Already-decoded RGBA8 pixels.
    Rgba(image::RgbaImage),
}

impl ImageSource {
    /// Decodes into tightly packed RGBA8.
    pub fn decode(&self) -> Result<image::RgbaImage> {
        let rgba = match self {
            Self::Encoded(bytes) => image::load_from_memory(bytes)?.to_rgba8(),
            Self::Path(path) => image::open(path)?.to_rgba8(),
            Self::Rgba(pixels) => pixels.clone(),
        };
        Ok(rgba)
    }

    /// Two-tone checkerboard, `cells` squares of `cell_px` pixels per side.
    pub fn checkerboard(cells: u32, cell_px: u32) -> Self {
        let side = (cells * cell_px).max(1);
        let cell = cell_px.max(1);
        let pixels = image::RgbaImage::from_fn(side, side, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                image::Rgba([220, 220, 220, 255])
            } else {
                image::Rgba([60, 60, 70, 255])
            }
        });
        Self::Rgba(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_cells() {
        let img = ImageSource::checkerboard(2, 4).decode().unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        assert_ne!(img.get_pixel(0, 0), img.get_pixel(4, 0));
        assert_eq!(img.get_pixel(0, 0), img.get_pixel(4, 4));
    }

    #[test]
    fn encoded_png_round_trips_through_decode() {
        let src = ImageSource::checkerboard(2, 2).decode().unwrap();
        let mut png = Vec::new();
        src.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let decoded = ImageSource::Encoded(png.into()).decode().unwrap();
        assert_eq!(decoded, src);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = ImageSource::Encoded(Cow::Borrowed(&[1, 2, 3])).decode().unwrap_err();
        assert!(matches!(err, crate::Error::ImageDecode(_)));
    }
}
