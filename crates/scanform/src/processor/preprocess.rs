//! Image normalization ahead of OCR.
//!
//! Fixed order: grayscale, small Gaussian blur, global Otsu binarization,
//! 3x3 morphological closing. The output only contains 0 and 255.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::close;

use crate::error::ProcessError;

use super::image::decode_image;

/// Blur strength; roughly a 3x3 kernel.
const BLUR_SIGMA: f32 = 0.8;

/// Closing radius under the L-infinity norm: a 3x3 square.
const CLOSE_RADIUS: u8 = 1;

/// Normalizes an already decoded image.
pub fn preprocess(image: &DynamicImage) -> GrayImage {
    let _span = tracing::debug_span!("processor.preprocess").entered();

    let gray = image.to_luma8();
    let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
    let level = otsu_level(&blurred);
    let binary = binarize(&blurred, level);
    close(&binary, Norm::LInf, CLOSE_RADIUS)
}

/// Decodes raw bytes and normalizes them.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<GrayImage, ProcessError> {
    let decoded = decode_image(bytes)?;
    Ok(preprocess(&decoded))
}

/// Pixels brighter than `level` become white, everything else black.
pub(crate) fn binarize(image: &GrayImage, level: u8) -> GrayImage {
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel[0] > level { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}
