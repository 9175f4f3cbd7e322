//! Exclusion masks built from the mask table.
//!
//! A capture's mask combines a border frame (everything outside the survey
//! area) with up to four wooden support bars crossing the field of view.
//! The output follows the core convention: excluded pixels carry 1.

use field_spectra_core::Mask;
use nalgebra::Point2;
use thiserror::Error;

use crate::table::{TableError, TextTable};

/// Number of wooden bars every mask row describes.
const BAR_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("wooden bar endpoints share the same row coordinate")]
    DegenerateBar,
}

/// One wooden bar: two endpoints on its upper edge plus its thickness along
/// the row axis.
///
/// Point coordinates are `(row, column)`, matching the mask table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarSpec {
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
    pub height: f64,
}

/// `y = m * x + c` through two points; x is the row axis, y the column axis.
fn line_through(p1: Point2<f64>, p2: Point2<f64>) -> Option<(f64, f64)> {
    if p1.x == p2.x {
        return None;
    }
    let m = (p2.y - p1.y) / (p2.x - p1.x);
    let c = p2.y - m * p2.x;
    Some((m, c))
}

/// Pixels covered by a bar: strictly between the line through the endpoints
/// and that line shifted by `height` along the row axis.
pub fn wooden_bar_pixels(
    bar: &BarSpec,
    shape: (usize, usize),
) -> Result<Vec<(usize, usize)>, MaskError> {
    let (m1, c1) = line_through(bar.p1, bar.p2).ok_or(MaskError::DegenerateBar)?;
    let shifted1 = Point2::new(bar.p1.x + bar.height, bar.p1.y);
    let shifted2 = Point2::new(bar.p2.x + bar.height, bar.p2.y);
    let (m2, c2) = line_through(shifted1, shifted2).ok_or(MaskError::DegenerateBar)?;

    let (rows, cols) = shape;
    let mut pixels = Vec::new();
    for row in 0..rows {
        let x = row as f64;
        let upper = m1 * x + c1;
        let lower = m2 * x + c2;
        for col in 0..cols {
            let y = col as f64;
            if lower < y && y < upper {
                pixels.push((row, col));
            }
        }
    }
    Ok(pixels)
}

/// Build the exclusion mask of one measurement row of the mask table.
///
/// Excludes everything outside the `start_row..end_row` / `start_col..end_col`
/// frame, then the pixels of the four wooden bars
/// (`bar{i}_p1_x`, `bar{i}_p1_y`, `bar{i}_p2_x`, `bar{i}_p2_y`,
/// `bar{i}_height` for `i` in 1..=4).
pub fn capture_mask(
    masks: &TextTable,
    row: usize,
    shape: (usize, usize),
) -> Result<Mask, MaskError> {
    let (rows, cols) = shape;
    let mut mask = Mask::include_all(rows, cols);

    let start_row = masks.get_usize("start_row", row)?;
    let end_row = masks.get_usize("end_row", row)?;
    let start_col = masks.get_usize("start_col", row)?;
    let end_col = masks.get_usize("end_col", row)?;
    for r in 0..rows {
        for c in 0..cols {
            if r < start_row || r >= end_row || c < start_col || c >= end_col {
                mask.set_excluded(r, c);
            }
        }
    }

    for bar in 1..=BAR_COUNT {
        let spec = BarSpec {
            p1: Point2::new(
                masks.get_f64(&format!("bar{bar}_p1_x"), row)?,
                masks.get_f64(&format!("bar{bar}_p1_y"), row)?,
            ),
            p2: Point2::new(
                masks.get_f64(&format!("bar{bar}_p2_x"), row)?,
                masks.get_f64(&format!("bar{bar}_p2_y"), row)?,
            ),
            height: masks.get_f64(&format!("bar{bar}_height"), row)?,
        };
        for (r, c) in wooden_bar_pixels(&spec, shape)? {
            mask.set_excluded(r, c);
        }
    }
    Ok(mask)
}
