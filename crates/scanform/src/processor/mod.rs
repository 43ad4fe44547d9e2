//! Image-level stages of the pipeline: decoding, normalization,
//! handwriting detection and PDF rasterization.

pub mod classifier;
pub mod image;
pub mod pdf;
pub mod preprocess;

pub use classifier::{is_handwritten, StrokeStats};
pub use image::decode_image;
pub use pdf::{PageRasterizer, PopplerRasterizer, RasterPages};
pub use preprocess::{preprocess, preprocess_bytes};
