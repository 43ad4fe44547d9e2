//! Builders for fixture images and configs.

#![allow(dead_code)]

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use serde_json::{json, Value};

/// Builds a white page with dark bars standing in for lines of text.
pub struct PageImageBuilder {
    width: u32,
    height: u32,
    lines: u32,
}

impl PageImageBuilder {
    pub fn new() -> Self {
        Self {
            width: 240,
            height: 120,
            lines: 3,
        }
    }

    /// The width doubles as a page marker for scripted engines.
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn lines(mut self, lines: u32) -> Self {
        self.lines = lines;
        self
    }

    pub fn image(&self) -> GrayImage {
        let mut img = GrayImage::from_pixel(self.width, self.height, Luma([255]));
        let line_height = 6;
        for line in 0..self.lines {
            let top = 10 + line * (line_height + 12);
            for y in top..(top + line_height).min(self.height) {
                for x in 10..self.width.saturating_sub(10) {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }

    pub fn png(&self) -> Vec<u8> {
        encode(&self.image(), ImageFormat::Png)
    }

    pub fn jpeg(&self) -> Vec<u8> {
        encode(&self.image(), ImageFormat::Jpeg)
    }
}

impl Default for PageImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(img: &GrayImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode fixture image");
    bytes
}

/// PNG of a 300x300 white page with black filled `(x, y, w, h)` blocks.
pub fn blocks_png(blocks: &[(u32, u32, u32, u32)]) -> Vec<u8> {
    let mut img = GrayImage::from_pixel(300, 300, Luma([255]));
    for &(x0, y0, w, h) in blocks {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }
    encode(&img, ImageFormat::Png)
}

/// Long joined strokes, which the classifier reads as handwriting.
pub fn handwritten_page_png() -> Vec<u8> {
    blocks_png(&[(10, 20, 70, 10), (10, 60, 70, 10), (10, 100, 70, 10)])
}

/// Compact square glyphs, which the classifier reads as print.
pub fn printed_page_png() -> Vec<u8> {
    blocks_png(&[(20, 20, 20, 20), (60, 20, 20, 20), (100, 20, 20, 20)])
}

/// Minimal bytes that claim to be a PDF. Only fake rasterizers read them.
pub fn fake_pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n% scanform test fixture\n%%EOF\n".to_vec()
}

/// Builds config JSON documents for loader tests.
pub struct ConfigJsonBuilder {
    value: Value,
}

impl ConfigJsonBuilder {
    pub fn new(upload_directory: &str) -> Self {
        Self {
            value: json!({
                "version": "1.0",
                "upload_directory": upload_directory,
                "worker_count": 2,
            }),
        }
    }

    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.value[key] = value;
        self
    }

    pub fn ocr(mut self, ocr: Value) -> Self {
        self.value["ocr"] = ocr;
        self
    }

    pub fn build(self) -> String {
        serde_json::to_string_pretty(&self.value).expect("serialize config")
    }
}

pub const SIGNUP_FORM_TEXT: &str =
    "First Name: John\nLast Name: Doe\nEmail: john.doe@example.com";
