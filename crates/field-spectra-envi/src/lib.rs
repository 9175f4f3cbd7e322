//! ENVI capture I/O.
//!
//! A capture on disk is a text header (`.hdr`) next to a raw binary image
//! file (`.cue`). The header carries the cube extent, sample layout and the
//! band metadata (wavelengths and the `bbl` quality flags); the high
//! resolution header of the same capture additionally carries the capture
//! date and time in its free-form description block.

mod header;
mod read;
mod timestamp;

pub use header::{ByteOrder, EnviError, EnviHeader, Interleave};
pub use read::load_cube;
pub use timestamp::{capture_datetime, CAPTURE_UTC_OFFSET_HOURS};

/// Normalise a header wavelength to whole nanometers.
///
/// Values below 5 are micrometers, values above 200 are already nanometers.
/// Anything in between cannot be interpreted.
pub fn wavelength_to_nm(value: f64) -> Result<u32, EnviError> {
    if value < 5.0 && value >= 0.0 {
        return Ok((value * 1000.0) as u32);
    }
    if value as i64 > 200 {
        return Ok(value as u32);
    }
    Err(EnviError::WavelengthRange { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wavelength_units_are_inferred_from_magnitude() {
        assert_eq!(wavelength_to_nm(300.0).unwrap(), 300);
        assert_eq!(wavelength_to_nm(2.5).unwrap(), 2500);
        assert_eq!(wavelength_to_nm(2.0).unwrap(), 2000);
        assert!(wavelength_to_nm(10.0).is_err());
        assert!(wavelength_to_nm(200.0).is_err());
    }
}
