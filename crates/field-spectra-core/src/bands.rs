//! Wavelength and band-quality bookkeeping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header length that carries a leading sentinel band.
///
/// Headers written by the capture software contain a zero wavelength at
/// index 0 when they have exactly this many entries; the entry has no pixel
/// data behind it and is dropped together with its quality flag.
const SENTINEL_HEADER_LEN: usize = 139;

#[derive(Debug, Error)]
pub enum BandError {
    #[error("length of wavelengths ({wavelengths}) and quality flags ({flags}) is not equal")]
    LengthMismatch { wavelengths: usize, flags: usize },
    #[error("spectrum has {got} bands, band set has {expected}")]
    SpectrumLength { expected: usize, got: usize },
}

/// Validated wavelength list with per-band quality flags.
///
/// A band is usable iff its flag equals 1 (the ENVI `bbl` convention).
/// The usable subset is fixed at construction and the same flags are applied
/// to every raw spectrum, so values and wavelength labels stay aligned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandSet {
    wavelengths: Vec<f64>,
    flags: Vec<i64>,
    usable: Vec<f64>,
}

impl BandSet {
    /// Validate a wavelength/flag pair and fix the usable subset.
    ///
    /// Fails if the two sequences differ in length. A 139-entry input drops
    /// index 0 from both sequences before anything else.
    pub fn new(mut wavelengths: Vec<f64>, mut flags: Vec<i64>) -> Result<Self, BandError> {
        if wavelengths.len() != flags.len() {
            return Err(BandError::LengthMismatch {
                wavelengths: wavelengths.len(),
                flags: flags.len(),
            });
        }
        if wavelengths.len() == SENTINEL_HEADER_LEN {
            wavelengths.remove(0);
            flags.remove(0);
        }
        let usable = wavelengths
            .iter()
            .zip(&flags)
            .filter(|(_, &flag)| flag == 1)
            .map(|(&w, _)| w)
            .collect();
        Ok(Self {
            wavelengths,
            flags,
            usable,
        })
    }

    /// Number of validated bands, including low-quality ones.
    ///
    /// Raw spectra handed to [`BandSet::filter_spectrum`] must have this
    /// length.
    #[inline]
    pub fn raw_len(&self) -> usize {
        self.wavelengths.len()
    }

    /// All validated wavelengths, including low-quality bands.
    pub fn raw_wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Wavelengths of the usable bands, in input order.
    pub fn usable_wavelengths(&self) -> &[f64] {
        &self.usable
    }

    #[inline]
    pub fn usable_len(&self) -> usize {
        self.usable.len()
    }

    /// Restrict a raw per-band spectrum to the usable bands.
    pub fn filter_spectrum(&self, spectrum: &[f64]) -> Result<Vec<f64>, BandError> {
        if spectrum.len() != self.wavelengths.len() {
            return Err(BandError::SpectrumLength {
                expected: self.wavelengths.len(),
                got: spectrum.len(),
            });
        }
        Ok(spectrum
            .iter()
            .zip(&self.flags)
            .filter(|(_, &flag)| flag == 1)
            .map(|(&v, _)| v)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_flagged_bands_in_order() {
        let bands = BandSet::new(vec![450.0, 500.0, 550.0, 600.0], vec![1, 0, 1, 1]).unwrap();
        assert_eq!(bands.raw_len(), 4);
        assert_eq!(bands.usable_wavelengths(), &[450.0, 550.0, 600.0]);

        let filtered = bands.filter_spectrum(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(filtered, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn usable_count_matches_flags() {
        let flags: Vec<i64> = (0..20).map(|i| i64::from(i % 3 != 0)).collect();
        let wavelengths: Vec<f64> = (0..20).map(|i| 400.0 + i as f64).collect();
        let expected = flags.iter().filter(|&&f| f == 1).count();

        let bands = BandSet::new(wavelengths, flags).unwrap();
        assert_eq!(bands.usable_len(), expected);
    }

    #[test]
    fn sentinel_header_drops_first_entry() {
        let mut wavelengths = vec![0.0];
        wavelengths.extend((0..138).map(|i| 400.0 + i as f64));
        let mut flags = vec![1i64];
        flags.extend(std::iter::repeat(1).take(138));
        flags[3] = 0;

        let bands = BandSet::new(wavelengths.clone(), flags.clone()).unwrap();
        assert_eq!(bands.raw_len(), 138);
        // Equivalent to dropping index 0 first, then filtering.
        assert_eq!(bands.raw_wavelengths(), &wavelengths[1..]);
        assert_eq!(bands.usable_len(), 137);
        assert!(!bands.usable_wavelengths().contains(&wavelengths[3]));
    }

    #[test]
    fn non_sentinel_lengths_pass_through() {
        let wavelengths: Vec<f64> = (0..138).map(|i| 400.0 + i as f64).collect();
        let flags = vec![1i64; 138];
        let bands = BandSet::new(wavelengths.clone(), flags).unwrap();
        assert_eq!(bands.raw_wavelengths(), wavelengths.as_slice());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let err = BandSet::new(vec![450.0, 500.0], vec![1]).unwrap_err();
        assert!(matches!(
            err,
            BandError::LengthMismatch {
                wavelengths: 2,
                flags: 1
            }
        ));
    }

    #[test]
    fn filter_rejects_wrong_spectrum_length() {
        let bands = BandSet::new(vec![450.0, 500.0], vec![1, 1]).unwrap();
        let err = bands.filter_spectrum(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            BandError::SpectrumLength {
                expected: 2,
                got: 1
            }
        ));
    }
}
