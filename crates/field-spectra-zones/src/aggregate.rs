//! Per-band aggregation of rectangular pixel regions.

use field_spectra_core::{BandError, BandSet, CubeView, GridCell, GridSpec, MaskView, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{effective_grid, grid_cell_labels, partition_rect, GridError};
use crate::table::Spectrum;

/// Statistic that reduces the pixels of a region to one value per band.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Sort-based median; mean of the two middle values for even counts.
    #[default]
    Median,
    Mean,
    /// Single largest value. The region must keep at least one pixel.
    Max,
    /// Mean of the 10 largest values. The region must keep at least 10
    /// pixels.
    Max10,
}

impl AggregationMode {
    /// Minimum number of kept pixels the mode needs.
    fn required_pixels(self) -> usize {
        match self {
            AggregationMode::Median | AggregationMode::Mean => 0,
            AggregationMode::Max => 1,
            AggregationMode::Max10 => 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("region keeps {got} pixels, aggregation needs at least {needed}")]
    InsufficientPixels { needed: usize, got: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Band(#[from] BandError),
}

/// Reduces rectangular regions of a cube to usable-band spectra.
///
/// Holds only borrowed, read-only inputs; every call computes from scratch.
/// Rectangles must lie inside the cube extent.
pub struct RegionAggregator<'a> {
    cube: CubeView<'a>,
    bands: &'a BandSet,
    mask: Option<MaskView<'a>>,
}

impl<'a> RegionAggregator<'a> {
    pub fn new(cube: CubeView<'a>, bands: &'a BandSet, mask: Option<MaskView<'a>>) -> Self {
        Self { cube, bands, mask }
    }

    pub fn bands(&self) -> &BandSet {
        self.bands
    }

    /// Pixels of the rectangle that survive the exclusion mask.
    fn kept_pixels(&self, rect: &Rect) -> Vec<(usize, usize)> {
        let mut kept = Vec::with_capacity(rect.area());
        for row in rect.row_start..rect.row_end {
            for col in rect.col_start..rect.col_end {
                if let Some(mask) = &self.mask {
                    if mask.is_excluded(row, col) {
                        continue;
                    }
                }
                kept.push((row, col));
            }
        }
        kept
    }

    /// Aggregate one rectangle into a usable-band spectrum.
    ///
    /// `Median` and `Mean` over a fully excluded region produce NaN values;
    /// `Max` and `Max10` fail when the region keeps fewer pixels than the
    /// statistic needs.
    pub fn region_spectrum(
        &self,
        rect: &Rect,
        mode: AggregationMode,
    ) -> Result<Spectrum, AggregateError> {
        let kept = self.kept_pixels(rect);
        let needed = mode.required_pixels();
        if kept.len() < needed {
            return Err(AggregateError::InsufficientPixels {
                needed,
                got: kept.len(),
            });
        }

        let mut raw = Vec::with_capacity(self.bands.raw_len());
        let mut roi = Vec::with_capacity(kept.len());
        for band in 0..self.bands.raw_len() {
            roi.clear();
            roi.extend(kept.iter().map(|&(row, col)| self.cube.get(row, col, band)));
            raw.push(reduce(&mut roi, mode));
        }

        let values = self.bands.filter_spectrum(&raw)?;
        Ok(Spectrum {
            wavelengths: self.bands.usable_wavelengths().to_vec(),
            values,
        })
    }

    /// Aggregate every grid cell of the rectangle independently.
    ///
    /// Returns one spectrum per cell of the partition, tagged with its
    /// grid-cell label, in matching row-major order.
    pub fn grid_spectra(
        &self,
        rect: &Rect,
        grid: Option<GridSpec>,
        mode: AggregationMode,
    ) -> Result<Vec<(GridCell, Spectrum)>, AggregateError> {
        let cells = partition_rect(rect, grid)?;
        let (eff_rows, eff_cols) = effective_grid(rect, grid);
        let labels = grid_cell_labels(Some(GridSpec::new(eff_rows as u32, eff_cols as u32)));
        if labels.len() != cells.len() {
            return Err(GridError::LabelMismatch {
                cells: cells.len(),
                labels: labels.len(),
            }
            .into());
        }

        labels
            .into_iter()
            .zip(cells)
            .map(|(label, cell)| Ok((label, self.region_spectrum(&cell, mode)?)))
            .collect()
    }
}

fn reduce(values: &mut Vec<f64>, mode: AggregationMode) -> f64 {
    match mode {
        AggregationMode::Median => median(values),
        AggregationMode::Mean => mean(values),
        AggregationMode::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationMode::Max10 => {
            values.sort_by(|a, b| a.total_cmp(b));
            mean(&values[values.len() - 10..])
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
