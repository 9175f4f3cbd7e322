//! White-reference calibration of raw spectra.

use crate::table::{SpectraTable, Spectrum};

/// Fraction of incident radiation the spectralon reference reflects.
pub const DEFAULT_REFLECTANCE_FACTOR: f64 = 0.95;

/// Calibrate one raw spectrum against the white-reference spectrum.
///
/// Per band: `soil / reference * factor`. IEEE division semantics apply
/// unmodified; a zero reference band yields an infinite (or NaN) value.
/// Both spectra must come from the same band set, in the same order.
pub fn calibrate_spectrum(soil: &[f64], reference: &[f64], factor: f64) -> Vec<f64> {
    debug_assert_eq!(soil.len(), reference.len());
    soil.iter()
        .zip(reference)
        .map(|(&s, &r)| s / r * factor)
        .collect()
}

/// Calibrate every row of a table in place against one reference spectrum.
pub fn calibrate_table(table: &mut SpectraTable, reference: &Spectrum, factor: f64) {
    for row in &mut table.rows {
        row.values = calibrate_spectrum(&row.values, &reference.values, factor);
    }
}
