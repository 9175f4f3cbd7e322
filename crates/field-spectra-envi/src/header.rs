//! ENVI header parsing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use field_spectra_core::{BandError, BandSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnviError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Band(#[from] BandError),
    #[error("not an ENVI header: first line is not \"ENVI\"")]
    MissingMagic,
    #[error("malformed header line {line}: {text:?}")]
    Malformed { line: usize, text: String },
    #[error("unterminated list value for header field {name:?}")]
    UnterminatedList { name: String },
    #[error("header field {name:?} is missing")]
    MissingField { name: &'static str },
    #[error("header field {name:?} has invalid value {value:?}")]
    InvalidField { name: &'static str, value: String },
    #[error("unsupported {what} {value:?}")]
    Unsupported { what: &'static str, value: String },
    #[error("image file is {got} bytes, cube needs {expected}")]
    TruncatedImage { expected: usize, got: usize },
    #[error("description block has no {what} line")]
    MissingTimestamp { what: &'static str },
    #[error("cannot parse capture {what} from {value:?}")]
    BadTimestamp { what: &'static str, value: String },
    #[error("cannot interpret wavelength {value}")]
    WavelengthRange { value: f64 },
}

/// Order in which the samples of one pixel/band are laid out in the image
/// file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Interleave {
    /// Band sequential: one full band plane after another.
    #[default]
    Bsq,
    /// Band interleaved by line.
    Bil,
    /// Band interleaved by pixel.
    Bip,
}

impl FromStr for Interleave {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bsq" => Ok(Self::Bsq),
            "bil" => Ok(Self::Bil),
            "bip" => Ok(Self::Bip),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Parsed ENVI header.
///
/// `samples` counts image columns and `lines` counts image rows. Fields the
/// loader does not interpret stay available verbatim in `fields`, keyed by
/// their lowercased name.
#[derive(Clone, Debug)]
pub struct EnviHeader {
    pub samples: usize,
    pub lines: usize,
    pub bands: usize,
    pub data_type: u8,
    pub interleave: Interleave,
    pub byte_order: ByteOrder,
    pub header_offset: usize,
    pub wavelengths: Option<Vec<f64>>,
    pub bbl: Option<Vec<i64>>,
    pub description: Option<String>,
    pub fields: HashMap<String, String>,
}

impl EnviHeader {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnviError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, EnviError> {
        let fields = parse_fields(text)?;

        let samples = required_usize(&fields, "samples")?;
        let lines = required_usize(&fields, "lines")?;
        let bands = required_usize(&fields, "bands")?;
        let data_type = required_usize(&fields, "data type")? as u8;

        let interleave = match fields.get("interleave") {
            None => Interleave::default(),
            Some(raw) => raw.parse().map_err(|()| EnviError::Unsupported {
                what: "interleave",
                value: raw.clone(),
            })?,
        };
        let byte_order = match fields.get("byte order").map(String::as_str) {
            None | Some("0") => ByteOrder::Little,
            Some("1") => ByteOrder::Big,
            Some(raw) => {
                return Err(EnviError::InvalidField {
                    name: "byte order",
                    value: raw.to_owned(),
                })
            }
        };
        let header_offset = match fields.get("header offset") {
            None => 0,
            Some(_) => required_usize(&fields, "header offset")?,
        };

        let wavelengths = match fields.get("wavelength") {
            None => None,
            Some(raw) => Some(parse_list(raw, "wavelength")?),
        };
        let bbl = match fields.get("bbl") {
            None => None,
            Some(raw) => Some(
                parse_list(raw, "bbl")?
                    .into_iter()
                    .map(|v: f64| v as i64)
                    .collect(),
            ),
        };
        let description = fields.get("description").cloned();

        Ok(Self {
            samples,
            lines,
            bands,
            data_type,
            interleave,
            byte_order,
            header_offset,
            wavelengths,
            bbl,
            description,
            fields,
        })
    }

    /// Build the validated band set from the wavelength and `bbl` fields.
    pub fn band_set(&self) -> Result<BandSet, EnviError> {
        let wavelengths = self
            .wavelengths
            .clone()
            .ok_or(EnviError::MissingField { name: "wavelength" })?;
        let bbl = self
            .bbl
            .clone()
            .ok_or(EnviError::MissingField { name: "bbl" })?;
        Ok(BandSet::new(wavelengths, bbl)?)
    }

    /// Bytes per stored sample for the header's data type.
    pub fn sample_width(&self) -> Result<usize, EnviError> {
        match self.data_type {
            1 => Ok(1),
            2 | 12 => Ok(2),
            3 | 4 | 13 => Ok(4),
            5 => Ok(8),
            other => Err(EnviError::Unsupported {
                what: "data type",
                value: other.to_string(),
            }),
        }
    }
}

fn parse_fields(text: &str) -> Result<HashMap<String, String>, EnviError> {
    let mut lines = text.lines().enumerate();
    match lines.next() {
        Some((_, first)) if first.trim() == "ENVI" => {}
        _ => return Err(EnviError::MissingMagic),
    }

    let mut fields = HashMap::new();
    while let Some((index, line)) = lines.next() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(EnviError::Malformed {
                line: index + 1,
                text: line.to_owned(),
            });
        };
        let key = key.trim().to_ascii_lowercase();
        let mut value = value.trim().to_owned();

        // Brace-delimited values may span multiple lines.
        if value.starts_with('{') {
            while !value.ends_with('}') {
                match lines.next() {
                    Some((_, next)) => {
                        value.push('\n');
                        value.push_str(next.trim_end());
                    }
                    None => return Err(EnviError::UnterminatedList { name: key }),
                }
            }
            value = value[1..value.len() - 1].trim().to_owned();
        }
        fields.insert(key, value);
    }
    Ok(fields)
}

fn required_usize(fields: &HashMap<String, String>, name: &'static str) -> Result<usize, EnviError> {
    let raw = fields
        .get(name)
        .ok_or(EnviError::MissingField { name })?;
    raw.trim().parse().map_err(|_| EnviError::InvalidField {
        name,
        value: raw.clone(),
    })
}

fn parse_list(raw: &str, name: &'static str) -> Result<Vec<f64>, EnviError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| EnviError::InvalidField {
                name,
                value: part.to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ENVI\n\
        description = {\n\
        Date: 08/15/2017,\n\
        Time: 5:57:02.34 P,\n\
        Capture}\n\
        samples = 50\n\
        lines = 50\n\
        bands = 4\n\
        header offset = 0\n\
        file type = ENVI Standard\n\
        data type = 4\n\
        interleave = bil\n\
        sensor type = Unknown\n\
        byte order = 0\n\
        wavelength = { 450.5, 500.1,\n\
         550.9, 600.2 }\n\
        bbl = { 1, 0, 1, 1 }\n";

    #[test]
    fn parses_scalars_lists_and_description() {
        let header = EnviHeader::parse(HEADER).unwrap();
        assert_eq!(header.samples, 50);
        assert_eq!(header.lines, 50);
        assert_eq!(header.bands, 4);
        assert_eq!(header.data_type, 4);
        assert_eq!(header.interleave, Interleave::Bil);
        assert_eq!(header.byte_order, ByteOrder::Little);
        assert_eq!(
            header.wavelengths.as_deref(),
            Some(&[450.5, 500.1, 550.9, 600.2][..])
        );
        assert_eq!(header.bbl.as_deref(), Some(&[1, 0, 1, 1][..]));
        assert!(header
            .description
            .as_deref()
            .unwrap()
            .starts_with("Date: 08/15/2017,"));
        assert_eq!(
            header.fields.get("file type").map(String::as_str),
            Some("ENVI Standard")
        );
    }

    #[test]
    fn band_set_filters_on_bbl() {
        let header = EnviHeader::parse(HEADER).unwrap();
        let bands = header.band_set().unwrap();
        assert_eq!(bands.raw_len(), 4);
        assert_eq!(bands.usable_wavelengths(), &[450.5, 550.9, 600.2]);
    }

    #[test]
    fn missing_magic_is_rejected() {
        assert!(matches!(
            EnviHeader::parse("samples = 3\n"),
            Err(EnviError::MissingMagic)
        ));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = EnviHeader::parse("ENVI\nsamples = 3\nlines = 3\nbands = 1\n").unwrap_err();
        assert!(matches!(
            err,
            EnviError::MissingField { name: "data type" }
        ));
    }

    #[test]
    fn unterminated_list_is_reported() {
        let err = EnviHeader::parse("ENVI\nwavelength = { 1.0, 2.0\n").unwrap_err();
        assert!(matches!(err, EnviError::UnterminatedList { .. }));
    }
}
