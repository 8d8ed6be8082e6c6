pub mod image_helper {
    use crate::error::Result;
    use image::{ImageEncoder, RgbaImage};
    use std::path::Path;

    /// Decodes an encoded tile (PNG, JPEG, WebP...) into an RGBA buffer.
    pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }

    /// Reads and decodes a tile image from disk.
    pub fn open_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
        let bytes = std::fs::read(path)?;
        decode_rgba(&bytes)
    }

    /// Encodes an RGBA buffer as PNG.
    pub fn encode_png(tile: &RgbaImage) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut output);
        encoder.write_image(tile.as_raw(), tile.width(), tile.height(), image::ExtendedColorType::Rgba8)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::image_helper::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn png_round_trip_keeps_pixels() {
        let mut tile = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 200, 255]));
        tile.put_pixel(3, 1, Rgba([255, 0, 0, 255]));

        let bytes = encode_png(&tile).expect("Error encoding tile.");
        let decoded = decode_rgba(&bytes).expect("Error decoding tile.");

        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(3, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn garbage_bytes_are_an_image_error() {
        let err = decode_rgba(b"definitely not a png").unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::Image(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = open_rgba("/no/such/tile.png").unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::Io(_)));
    }
}
