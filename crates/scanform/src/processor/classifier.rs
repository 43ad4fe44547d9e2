//! Handwritten vs. printed text heuristic.
//!
//! Printed glyphs form compact, regular connected components; handwriting
//! produces irregular strokes and long joined runs. The classifier looks at
//! the external contours of ink blobs and votes on their average shape.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::otsu_level;

/// Components smaller than this bounding-box area (px²) are noise.
const MIN_COMPONENT_AREA: u64 = 100;

/// Components larger than this share of the image are frames or blocks.
const MAX_COMPONENT_SHARE: f64 = 0.1;

const IRREGULARITY_THRESHOLD: f64 = 0.8;
const MAX_PRINTED_ASPECT_RATIO: f64 = 3.0;
const MIN_PRINTED_ASPECT_RATIO: f64 = 0.3;

/// Averages over the components that passed the size filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStats {
    pub components: usize,
    pub avg_aspect_ratio: f64,
    pub avg_irregularity: f64,
}

impl StrokeStats {
    pub fn looks_handwritten(&self) -> bool {
        self.avg_irregularity > IRREGULARITY_THRESHOLD
            || self.avg_aspect_ratio > MAX_PRINTED_ASPECT_RATIO
            || self.avg_aspect_ratio < MIN_PRINTED_ASPECT_RATIO
    }
}

/// Returns `true` when the image most likely contains handwriting.
///
/// Never fails: an image without usable components counts as printed.
pub fn is_handwritten(image: &GrayImage) -> bool {
    let _span = tracing::debug_span!("processor.classify").entered();

    match analyze(image) {
        Some(stats) => {
            let handwritten = stats.looks_handwritten();
            tracing::debug!(
                components = stats.components,
                avg_aspect_ratio = stats.avg_aspect_ratio,
                avg_irregularity = stats.avg_irregularity,
                handwritten,
                "classified text type"
            );
            handwritten
        }
        None => false,
    }
}

/// Computes stroke statistics, or `None` when no component qualifies.
pub fn analyze(image: &GrayImage) -> Option<StrokeStats> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    // Inverted Otsu: ink becomes the non-zero foreground.
    let level = otsu_level(image);
    let mut foreground = image.clone();
    for pixel in foreground.pixels_mut() {
        pixel[0] = if pixel[0] > level { 0 } else { 255 };
    }

    let max_area = f64::from(width) * f64::from(height) * MAX_COMPONENT_SHARE;

    let contours: Vec<Contour<u32>> = find_contours(&foreground);
    let mut count = 0usize;
    let mut aspect_sum = 0.0;
    let mut irregularity_sum = 0.0;

    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let Some((w, h)) = bounding_box(&contour.points) else {
            continue;
        };
        let box_area = u64::from(w) * u64::from(h);
        if box_area < MIN_COMPONENT_AREA || box_area as f64 > max_area {
            continue;
        }

        let aspect_ratio = f64::from(w) / f64::from(h);
        let perimeter = perimeter(&contour.points);
        let circularity = if perimeter > 0.0 {
            4.0 * std::f64::consts::PI * polygon_area(&contour.points) / (perimeter * perimeter)
        } else {
            0.0
        };

        aspect_sum += aspect_ratio;
        irregularity_sum += 1.0 - circularity;
        count += 1;
    }

    if count == 0 {
        return None;
    }

    Some(StrokeStats {
        components: count,
        avg_aspect_ratio: aspect_sum / count as f64,
        avg_irregularity: irregularity_sum / count as f64,
    })
}

/// Inclusive pixel extent of a point set.
fn bounding_box(points: &[imageproc::point::Point<u32>]) -> Option<(u32, u32)> {
    let first = points.first()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some((max_x - min_x + 1, max_y - min_y + 1))
}

/// Shoelace area of the closed polygon through the contour points.
fn polygon_area(points: &[imageproc::point::Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y);
    }
    (twice_area / 2.0).abs()
}

/// Length of the closed polyline through the contour points.
fn perimeter(points: &[imageproc::point::Point<u32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| {
            let dx = f64::from(p.x) - f64::from(q.x);
            let dy = f64::from(p.y) - f64::from(q.y);
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}
