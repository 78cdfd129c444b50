use formscan_core::PixelRegion;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::adaptive_threshold;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
    #[error("Region of {width}x{height} is too large to binarize")]
    TooLarge { width: u32, height: u32 },
}

/// Neighbourhood radius for the local threshold (an 11x11 window).
pub const THRESHOLD_BLOCK_RADIUS: u32 = 5;

/// Dark blobs with fewer pixels than this are speckle, not ink.
pub const MIN_INK_PIXELS: usize = 3;

const PAPER: Luma<u8> = Luma([255]);

// The threshold sums pixels into u32; 255 * this stays below u32::MAX.
const MAX_BINARIZE_PIXELS: u64 = 16_000_000;

/// Decode an uploaded image (JPEG / PNG / WEBP / …).
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    Ok(image::load_from_memory(data)?)
}

pub fn crop(image: &DynamicImage, region: PixelRegion) -> DynamicImage {
    image.crop_imm(region.x, region.y, region.width, region.height)
}

/// Grayscale, local adaptive threshold, then drop isolated dark specks.
pub fn binarize(crop: &DynamicImage) -> Result<GrayImage, PreprocessError> {
    let (width, height) = (crop.width(), crop.height());
    if u64::from(width) * u64::from(height) > MAX_BINARIZE_PIXELS {
        return Err(PreprocessError::TooLarge { width, height });
    }

    let gray: GrayImage = crop.to_luma8();
    let binary = adaptive_threshold(&gray, THRESHOLD_BLOCK_RADIUS);
    Ok(remove_specks(binary))
}

/// Whiten 8-connected ink components smaller than [`MIN_INK_PIXELS`].
/// Strokes of any width survive as long as they are long enough.
fn remove_specks(mut binary: GrayImage) -> GrayImage {
    let labels = connected_components(&binary, Connectivity::Eight, PAPER);
    let count = labels.pixels().map(|l| l[0]).max().unwrap_or(0) as usize;

    let mut sizes = vec![0usize; count + 1];
    for l in labels.pixels() {
        sizes[l[0] as usize] += 1;
    }
    for (x, y, l) in labels.enumerate_pixels() {
        let label = l[0] as usize;
        if label != 0 && sizes[label] < MIN_INK_PIXELS {
            binary.put_pixel(x, y, PAPER);
        }
    }
    binary
}

pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
