//! Raw cube loading.

use std::fs;
use std::path::Path;

use field_spectra_core::Cube;
use log::debug;

use crate::header::{ByteOrder, EnviError, EnviHeader, Interleave};

/// Load the binary image file of a capture into an in-memory cube.
///
/// Samples are decoded according to the header's data type and byte order
/// and stored band-interleaved by pixel regardless of the file layout.
pub fn load_cube(header: &EnviHeader, path: impl AsRef<Path>) -> Result<Cube, EnviError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let width = header.sample_width()?;

    let n_samples = header.lines * header.samples * header.bands;
    let expected = header.header_offset + n_samples * width;
    if bytes.len() < expected {
        return Err(EnviError::TruncatedImage {
            expected,
            got: bytes.len(),
        });
    }
    let bytes = &bytes[header.header_offset..];
    debug!(
        "loading {}x{}x{} cube from {}",
        header.lines,
        header.samples,
        header.bands,
        path.display()
    );

    let mut cube = Cube::filled(header.lines, header.samples, header.bands, 0.0);
    for row in 0..header.lines {
        for col in 0..header.samples {
            for band in 0..header.bands {
                let source = sample_index(header, row, col, band);
                let value = decode_sample(
                    &bytes[source * width..source * width + width],
                    header.data_type,
                    header.byte_order,
                )?;
                cube.set(row, col, band, value);
            }
        }
    }
    Ok(cube)
}

/// Flat sample index of `(row, col, band)` in the stored layout.
fn sample_index(header: &EnviHeader, row: usize, col: usize, band: usize) -> usize {
    match header.interleave {
        Interleave::Bsq => (band * header.lines + row) * header.samples + col,
        Interleave::Bil => (row * header.bands + band) * header.samples + col,
        Interleave::Bip => (row * header.samples + col) * header.bands + band,
    }
}

fn decode_sample(bytes: &[u8], data_type: u8, order: ByteOrder) -> Result<f64, EnviError> {
    let value = match (data_type, order) {
        (1, _) => f64::from(bytes[0]),
        (2, ByteOrder::Little) => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        (2, ByteOrder::Big) => f64::from(i16::from_be_bytes([bytes[0], bytes[1]])),
        (12, ByteOrder::Little) => f64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        (12, ByteOrder::Big) => f64::from(u16::from_be_bytes([bytes[0], bytes[1]])),
        (3, ByteOrder::Little) => {
            f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (3, ByteOrder::Big) => {
            f64::from(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (13, ByteOrder::Little) => {
            f64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (13, ByteOrder::Big) => {
            f64::from(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (4, ByteOrder::Little) => {
            f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (4, ByteOrder::Big) => {
            f64::from(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        }
        (5, ByteOrder::Little) => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        (5, ByteOrder::Big) => f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        (other, _) => {
            return Err(EnviError::Unsupported {
                what: "data type",
                value: other.to_string(),
            })
        }
    };
    Ok(value)
}
