use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat};

use crate::error::ProcessError;

/// Decodes PNG or JPEG bytes, sniffing the format from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ProcessError> {
    if bytes.is_empty() {
        return Err(ProcessError::ImageDecode("empty image data".to_string()));
    }

    image::load_from_memory(bytes).map_err(|e| ProcessError::ImageDecode(e.to_string()))
}

/// Encodes a grayscale image as PNG, the interchange format for OCR engines.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_data = Vec::new();
    image.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)?;
    Ok(png_data)
}
