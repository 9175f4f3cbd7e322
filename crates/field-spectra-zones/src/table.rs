//! Spectrum and spectra-table value types.

use field_spectra_core::GridCell;
use serde::{Deserialize, Serialize};

/// One aggregated spectrum with its wavelength labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub wavelengths: Vec<f64>,
    pub values: Vec<f64>,
}

impl Spectrum {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One row of a [`SpectraTable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneRow {
    pub zone: String,
    pub cell: GridCell,
    /// One value per usable wavelength, in table column order.
    pub values: Vec<f64>,
}

/// Tabular zone spectra of one capture.
///
/// One row per `(zone, grid cell)` pair; one column per usable wavelength
/// plus the `zone`, `grid_row` and `grid_col` columns. Built fresh for every
/// capture, nothing is cached across calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectraTable {
    pub wavelengths: Vec<f64>,
    pub rows: Vec<ZoneRow>,
}

impl SpectraTable {
    pub fn new(wavelengths: Vec<f64>) -> Self {
        Self {
            wavelengths,
            rows: Vec::new(),
        }
    }

    /// `(rows, cols)`, counting the zone and grid-coordinate columns.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.wavelengths.len() + 3)
    }
}
