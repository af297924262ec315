use std::error::Error;
use std::fmt::{Display, Formatter};

use image::{DynamicImage, RgbImage};

/// Side length of the square input the classifier was trained on.
pub const INPUT_SIZE: u32 = 192;

/// Error produced when uploaded bytes cannot be decoded as an image.
#[derive(Debug)]
pub struct DecodeError(image::ImageError);

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "could not decode the supplied bytes as an image: {}", self.0)
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// An RGB bitmap guaranteed to have the fixed `INPUT_SIZE`×`INPUT_SIZE` shape
/// the classifier expects. Only obtainable through [`preprocess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage(RgbImage);

impl NormalizedImage {
    pub fn as_rgb(&self) -> &RgbImage {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }
}

/// Decodes raw uploaded bytes into an image of arbitrary size and color mode.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    image::load_from_memory(bytes).map_err(DecodeError)
}

/// Normalizes an arbitrary decoded image into the classifier's input format:
/// 3-channel RGB (alpha flattened, grayscale expanded) stretched to
/// `INPUT_SIZE`×`INPUT_SIZE` without preserving aspect ratio.
///
/// Resampling is bilinear (`FilterType::Triangle`), chosen once and kept
/// fixed: the filter affects pixel values and therefore the numeric
/// reproducibility of predictions.
pub fn preprocess(raw: &DynamicImage) -> NormalizedImage {
    let resized = raw.resize_exact(INPUT_SIZE, INPUT_SIZE, image::imageops::FilterType::Triangle);
    NormalizedImage(resized.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgba, RgbaImage};

    fn gradient_rgba(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 128])
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_preprocess_fixes_shape_for_odd_dimensions() {
        let img = gradient_rgba(317, 41);
        let normalized = preprocess(&img);
        assert_eq!(normalized.width(), INPUT_SIZE);
        assert_eq!(normalized.height(), INPUT_SIZE);
        assert_eq!(
            normalized.as_rgb().as_raw().len(),
            (INPUT_SIZE * INPUT_SIZE * 3) as usize
        );
    }

    #[test]
    fn test_preprocess_expands_grayscale_to_rgb() {
        let gray = GrayImage::from_fn(64, 64, |x, _| image::Luma([(x * 3 % 256) as u8]));
        let normalized = preprocess(&DynamicImage::ImageLuma8(gray));
        assert_eq!(normalized.width(), INPUT_SIZE);
        assert_eq!(normalized.height(), INPUT_SIZE);
        // Every pixel carries three identical channels after expansion.
        let px = normalized.as_rgb().get_pixel(10, 10);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let img = gradient_rgba(500, 333);
        let first = preprocess(&img);
        let second = preprocess(&img);
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_roundtrip_png() {
        let img = gradient_rgba(20, 20);
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.width(), 20);
        assert_eq!(decoded.height(), 20);
    }

    #[test]
    fn test_decode_rejects_non_image_bytes() {
        let result = decode(b"definitely not an image");
        assert!(result.is_err());
    }
}
