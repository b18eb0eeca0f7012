//! Grid decomposition of composite coupon images.
//!
//! Some flyer pages ship as one large image holding a rectangular grid of
//! independent coupons. OCR quality improves sharply when each cell is
//! recognized on its own, so this stage cuts the image into cells whose
//! boxes exactly tile the source: no gaps, no overlaps, row-major order.
//! The stage is purely geometric and deterministic; it never inspects
//! content beyond edge intensity.

use image::{imageops, GrayImage};
use imageproc::edges::canny;
use tracing::debug;

use crate::config::GridMode;

/// Canny thresholds for boundary detection.
const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;
/// Peaks closer than this many pixels belong to the same boundary group.
const PEAK_GAP: usize = 50;
/// Projection positions above this multiple of the mean count as peaks.
const PEAK_FACTOR: f64 = 1.5;
/// Width above which the fallback grid assumes four columns instead of three.
const WIDE_IMAGE_PX: u32 = 900;

/// One cell's bounding box within the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Splits a preprocessed image according to the configured grid mode.
pub fn split_image(img: &GrayImage, mode: GridMode) -> Vec<GrayImage> {
    let (width, height) = img.dimensions();
    let (cols, rows) = match mode {
        GridMode::Off => (1, 1),
        GridMode::Fixed => default_grid(width),
        GridMode::Dynamic => detect_grid(img).unwrap_or_else(|| {
            debug!("no grid boundaries detected, using default grid");
            default_grid(width)
        }),
    };

    cell_boxes(width, height, cols, rows)
        .into_iter()
        .map(|b| imageops::crop_imm(img, b.x, b.y, b.width, b.height).to_image())
        .collect()
}

/// Width-based fallback grid: 4x2 for wide scans, 3x2 otherwise.
pub fn default_grid(width: u32) -> (u32, u32) {
    if width > WIDE_IMAGE_PX { (4, 2) } else { (3, 2) }
}

/// Infers the column and row count from edge-intensity projections, or None
/// when neither axis shows any boundary peaks.
pub fn detect_grid(img: &GrayImage) -> Option<(u32, u32)> {
    let edges = canny(img, CANNY_LOW, CANNY_HIGH);
    let (width, height) = edges.dimensions();

    let mut col_counts = vec![0u64; width as usize];
    let mut row_counts = vec![0u64; height as usize];
    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel[0] > 0 {
            col_counts[x as usize] += 1;
            row_counts[y as usize] += 1;
        }
    }

    let col_groups = boundary_groups(&peak_positions(&col_counts));
    let row_groups = boundary_groups(&peak_positions(&row_counts));
    if col_groups == 0 && row_groups == 0 {
        return None;
    }

    let cols = (col_groups as u32 + 1).min(width.max(1));
    let rows = (row_groups as u32 + 1).min(height.max(1));
    debug!("detected grid {}x{} from edge projections", cols, rows);
    Some((cols, rows))
}

/// Indices whose projection value exceeds 1.5x the mean.
fn peak_positions(counts: &[u64]) -> Vec<usize> {
    if counts.is_empty() {
        return Vec::new();
    }
    let mean = counts.iter().sum::<u64>() as f64 / counts.len() as f64;
    if mean == 0.0 {
        return Vec::new();
    }
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v as f64 > mean * PEAK_FACTOR)
        .map(|(i, _)| i)
        .collect()
}

/// Number of peak clusters separated by more than the pixel-gap threshold.
fn boundary_groups(peaks: &[usize]) -> usize {
    if peaks.is_empty() {
        return 0;
    }
    let mut groups = 1;
    for pair in peaks.windows(2) {
        if pair[1] - pair[0] > PEAK_GAP {
            groups += 1;
        }
    }
    groups
}

/// Row-major cell boxes evenly partitioning `width` x `height`. Integer
/// splits at `i*dim/n` guarantee the boxes tile the source exactly for any
/// dimensions.
pub fn cell_boxes(width: u32, height: u32, cols: u32, rows: u32) -> Vec<CellBox> {
    let cols = cols.clamp(1, width.max(1));
    let rows = rows.clamp(1, height.max(1));

    let mut boxes = Vec::with_capacity((cols * rows) as usize);
    for r in 0..rows {
        let y0 = r * height / rows;
        let y1 = (r + 1) * height / rows;
        for c in 0..cols {
            let x0 = c * width / cols;
            let x1 = (c + 1) * width / cols;
            boxes.push(CellBox {
                x: x0,
                y: y0,
                width: x1 - x0,
                height: y1 - y0,
            });
        }
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn assert_exact_tiling(width: u32, height: u32, boxes: &[CellBox]) {
        let mut covered = vec![0u8; (width * height) as usize];
        for b in boxes {
            for y in b.y..b.y + b.height {
                for x in b.x..b.x + b.width {
                    covered[(y * width + x) as usize] += 1;
                }
            }
        }
        assert!(
            covered.iter().all(|&c| c == 1),
            "tiling has gaps or overlaps for {width}x{height}"
        );
    }

    #[test]
    fn test_cells_tile_exactly_even_dimensions() {
        assert_exact_tiling(120, 60, &cell_boxes(120, 60, 4, 2));
    }

    #[test]
    fn test_cells_tile_exactly_awkward_dimensions() {
        // Dimensions that do not divide evenly by the grid.
        assert_exact_tiling(101, 57, &cell_boxes(101, 57, 3, 2));
        assert_exact_tiling(7, 5, &cell_boxes(7, 5, 4, 2));
        assert_exact_tiling(1, 1, &cell_boxes(1, 1, 3, 2));
    }

    #[test]
    fn test_cell_order_is_row_major() {
        let boxes = cell_boxes(100, 100, 2, 2);
        assert_eq!((boxes[0].x, boxes[0].y), (0, 0));
        assert_eq!((boxes[1].x, boxes[1].y), (50, 0));
        assert_eq!((boxes[2].x, boxes[2].y), (0, 50));
    }

    #[test]
    fn test_default_grid_width_rule() {
        assert_eq!(default_grid(901), (4, 2));
        assert_eq!(default_grid(900), (3, 2));
        assert_eq!(default_grid(300), (3, 2));
    }

    #[test]
    fn test_off_mode_returns_whole_image() {
        let img = GrayImage::new(80, 40);
        let cells = split_image(&img, GridMode::Off);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].dimensions(), (80, 40));
    }

    #[test]
    fn test_fixed_mode_cell_count() {
        let img = GrayImage::new(1200, 400);
        assert_eq!(split_image(&img, GridMode::Fixed).len(), 8);
        let img = GrayImage::new(600, 400);
        assert_eq!(split_image(&img, GridMode::Fixed).len(), 6);
    }

    #[test]
    fn test_dynamic_falls_back_on_featureless_image() {
        // A flat image has no edges, hence no boundary peaks.
        let img = GrayImage::from_pixel(1000, 400, Luma([255]));
        let cells = split_image(&img, GridMode::Dynamic);
        assert_eq!(cells.len(), 8);
    }

    #[test]
    fn test_dynamic_is_deterministic() {
        let img = image::ImageBuffer::from_fn(400, 200, |x, y| {
            if x % 100 < 2 || y % 100 < 2 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        let first: Vec<_> = split_image(&img, GridMode::Dynamic)
            .iter()
            .map(|c| c.dimensions())
            .collect();
        let second: Vec<_> = split_image(&img, GridMode::Dynamic)
            .iter()
            .map(|c| c.dimensions())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_boundary_groups_cluster_by_gap() {
        assert_eq!(boundary_groups(&[]), 0);
        assert_eq!(boundary_groups(&[10, 12, 14]), 1);
        assert_eq!(boundary_groups(&[10, 12, 200]), 2);
        assert_eq!(boundary_groups(&[10, 200, 600]), 3);
    }

    #[test]
    fn test_peak_positions_threshold() {
        // Mean is 10; only values above 15 count.
        let counts = vec![10, 10, 10, 10, 10, 10, 10, 10, 10, 10];
        assert!(peak_positions(&counts).is_empty());
        let counts = vec![0, 0, 100, 0, 0];
        assert_eq!(peak_positions(&counts), vec![2]);
    }
}
