//! Per-capture processing and the survey batch driver.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use field_spectra_core::{GridCell, Mask};
use field_spectra_envi::{capture_datetime, load_cube, EnviError, EnviHeader};
use field_spectra_zones::{
    CollectError, CollectorParams, RegionAggregator, SpectraTable, ZoneCollector,
};
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::{ConfigError, ProcessConfig};
use crate::lwir::{match_lwir, LwirError};
use crate::mask::{capture_mask, MaskError};
use crate::moisture::{match_soil_moisture, MoistureError, ZoneAliases};
use crate::positions::PositionsTable;
use crate::table::{TableError, TextTable};

/// Zone names of the fixed field layout.
pub const DEFAULT_ZONES: [&str; 8] = [
    "zone1", "zone2", "zone3", "zone4", "zone5", "zone6", "zone7", "zone8",
];

/// Band probed by the empty-capture check.
const EMPTY_CHECK_BAND: usize = 5;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Envi(#[from] EnviError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Mask(#[from] MaskError),
    #[error(transparent)]
    Moisture(#[from] MoistureError),
    #[error(transparent)]
    Lwir(#[from] LwirError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("measurement {measurement:?} is not in the positions table")]
    UnknownMeasurement { measurement: String },
    #[error("positions and masks tables disagree on the row of {measurement:?}")]
    TableOrderMismatch { measurement: String },
    #[error("usable band count changed mid-survey: {expected} then {got}")]
    BandLayoutChanged { expected: usize, got: usize },
    #[error("output file {path} exists and overwrite_output is false")]
    OutputExists { path: PathBuf },
}

/// One survey: configuration plus every loaded lookup table.
pub struct Survey {
    pub config: ProcessConfig,
    pub positions_hyp: PositionsTable,
    pub positions_lwir: PositionsTable,
    pub masks: Option<TextTable>,
    pub aliases: ZoneAliases,
    ignored_measurements: Vec<String>,
    ignored_captures: Vec<(String, u32)>,
    ignored_zones: Vec<(String, u32, String)>,
}

impl Survey {
    pub fn load(config: ProcessConfig) -> Result<Self, ProcessError> {
        let positions_hyp = PositionsTable::load(&config.positions_hyp)?;
        let positions_lwir = PositionsTable::load(&config.positions_lwir)?;
        let masks = match &config.masks_hyp {
            Some(path) => Some(TextTable::load(path)?),
            None => None,
        };

        let ignored_measurements = match &config.ignore_measurements {
            Some(path) => {
                let table = TextTable::load(path)?;
                table
                    .column("measurement")?
                    .into_iter()
                    .map(str::to_owned)
                    .collect()
            }
            None => Vec::new(),
        };
        let ignored_captures = match &config.ignore_captures {
            Some(path) => {
                let table = TextTable::load(path)?;
                let mut entries = Vec::with_capacity(table.len());
                for row in 0..table.len() {
                    entries.push((
                        table.get("measurement", row)?.to_owned(),
                        table.get_usize("filenumber", row)? as u32,
                    ));
                }
                entries
            }
            None => Vec::new(),
        };
        let ignored_zones = match &config.ignore_zones {
            Some(path) => {
                let table = TextTable::load(path)?;
                let mut entries = Vec::with_capacity(table.len());
                for row in 0..table.len() {
                    entries.push((
                        table.get("measurement", row)?.to_owned(),
                        table.get_usize("filenumber", row)? as u32,
                        format!("zone{}", table.get_usize("zone", row)?),
                    ));
                }
                entries
            }
            None => Vec::new(),
        };

        Ok(Self {
            config,
            positions_hyp,
            positions_lwir,
            masks,
            aliases: ZoneAliases::default(),
            ignored_measurements,
            ignored_captures,
            ignored_zones,
        })
    }

    fn is_ignored(&self, capture: &CaptureRef) -> bool {
        self.ignored_measurements
            .iter()
            .any(|m| m == &capture.measurement)
            || self
                .ignored_captures
                .iter()
                .any(|(m, n)| m == &capture.measurement && *n == capture.number)
    }

    /// Configured zones of one capture: the fixed layout minus per-capture
    /// drops.
    fn zone_list_for(&self, capture: &CaptureRef) -> Vec<String> {
        let mut zones: Vec<String> = DEFAULT_ZONES.iter().map(|z| (*z).to_owned()).collect();
        for (measurement, number, zone) in &self.ignored_zones {
            if measurement == &capture.measurement && *number == capture.number {
                zones.retain(|z| z != zone);
            }
        }
        zones
    }
}

/// One capture on disk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureRef {
    /// Low-resolution header path; the image file sits next to it with a
    /// `.cue` extension, the band metadata in `<stem>_highres.hdr`.
    pub hdr_path: PathBuf,
    pub measurement: String,
    pub number: u32,
}

/// Scan the capture directory: one `<measurement>_hyp` subdirectory per
/// measurement, numbered `.hdr` files inside. High-resolution headers are
/// companions, not captures.
pub fn discover_captures(data_hyp: &Path) -> Result<Vec<CaptureRef>, ProcessError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(data_hyp)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut captures = Vec::new();
    for dir in dirs {
        let Some(dir_name) = dir.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        let measurement = dir_name.strip_suffix("_hyp").unwrap_or(dir_name).to_owned();

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension() == Some(OsStr::new("hdr"))
                    && path
                        .file_stem()
                        .and_then(OsStr::to_str)
                        .is_some_and(|stem| !stem.ends_with("_highres"))
            })
            .collect();
        files.sort();

        for file in files {
            let Some(stem) = file.file_stem().and_then(OsStr::to_str) else {
                continue;
            };
            let digits: String = stem
                .chars()
                .rev()
                .take_while(char::is_ascii_digit)
                .collect::<Vec<char>>()
                .into_iter()
                .rev()
                .collect();
            let Ok(number) = digits.parse::<u32>() else {
                continue;
            };
            captures.push(CaptureRef {
                hdr_path: file,
                measurement: measurement.clone(),
                number,
            });
        }
    }
    Ok(captures)
}

fn highres_header_path(hdr_path: &Path) -> PathBuf {
    match hdr_path.file_stem().and_then(OsStr::to_str) {
        Some(stem) => hdr_path.with_file_name(format!("{stem}_highres.hdr")),
        None => hdr_path.to_path_buf(),
    }
}

/// One output row: calibrated spectrum plus co-registered environment data.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureRow {
    pub zone: String,
    pub cell: GridCell,
    pub values: Vec<f64>,
    pub datetime: Option<DateTime<Utc>>,
    pub vol_sm: Option<f64>,
    pub temp_c: Option<f64>,
    pub lwir_mean: Option<f64>,
    pub lwir_median: Option<f64>,
    pub lwir_std: Option<f64>,
}

/// Flat output table of a whole survey run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputTable {
    pub wavelengths: Vec<f64>,
    pub rows: Vec<CaptureRow>,
}

impl OutputTable {
    pub fn new(wavelengths: Vec<f64>) -> Self {
        Self {
            wavelengths,
            rows: Vec::new(),
        }
    }

    /// Wrap a spectra table without environment data.
    pub fn from_spectra(spectra: SpectraTable, datetime: Option<DateTime<Utc>>) -> Self {
        let mut output = Self::new(spectra.wavelengths);
        for row in spectra.rows {
            output.rows.push(CaptureRow {
                zone: row.zone,
                cell: row.cell,
                values: row.values,
                datetime,
                vol_sm: None,
                temp_c: None,
                lwir_mean: None,
                lwir_median: None,
                lwir_std: None,
            });
        }
        output
    }

    /// Append another capture's rows; the band layout must not change.
    pub fn append(&mut self, other: OutputTable) -> Result<(), ProcessError> {
        if self.rows.is_empty() && self.wavelengths.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.wavelengths != other.wavelengths {
            return Err(ProcessError::BandLayoutChanged {
                expected: self.wavelengths.len(),
                got: other.wavelengths.len(),
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

fn fmt_cell(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        String::new()
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt_cell).unwrap_or_default()
}

/// Write the output table as CSV.
///
/// Column order: zone and grid coordinates, capture timestamp, one column
/// per usable wavelength, then the environment columns. Missing or
/// non-finite values are written as empty cells.
pub fn write_output_csv(table: &OutputTable, path: impl AsRef<Path>) -> Result<(), ProcessError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "zone".to_owned(),
        "grid_row".to_owned(),
        "grid_col".to_owned(),
        "datetime".to_owned(),
    ];
    header.extend(table.wavelengths.iter().map(|w| format!("{w}")));
    header.extend(
        ["volSM_vol%", "T_C", "lwir_mean", "lwir_med", "lwir_std"]
            .iter()
            .map(|c| (*c).to_owned()),
    );
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![
            row.zone.clone(),
            row.cell.row.to_string(),
            row.cell.col.to_string(),
            row.datetime.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
        ];
        record.extend(row.values.iter().map(|v| fmt_cell(*v)));
        record.push(fmt_opt(row.vol_sm));
        record.push(fmt_opt(row.temp_c));
        record.push(fmt_opt(row.lwir_mean));
        record.push(fmt_opt(row.lwir_median));
        record.push(fmt_opt(row.lwir_std));
        writer.write_record(&record)?;
    }
    writer.flush().map_err(ProcessError::from)?;
    Ok(())
}

/// Process one capture into output rows.
///
/// Returns `Ok(None)` for an empty image (a capture the sensor aborted).
pub fn process_capture(
    survey: &Survey,
    capture: &CaptureRef,
    zone_list: &[String],
) -> Result<Option<OutputTable>, ProcessError> {
    let hdr = EnviHeader::load(&capture.hdr_path)?;
    let hdr_highres = EnviHeader::load(highres_header_path(&capture.hdr_path))?;

    let datetime = capture_datetime(&hdr_highres)?;
    let bands = hdr_highres.band_set()?;
    let cube = load_cube(&hdr, capture.hdr_path.with_extension("cue"))?;

    let probe = EMPTY_CHECK_BAND.min(cube.bands.saturating_sub(1));
    if cube.view().band_sum(probe) == 0.0 {
        warn!(
            "capture {} {:03}: image is empty, skipping",
            capture.measurement, capture.number
        );
        return Ok(None);
    }

    let row = survey
        .positions_hyp
        .measurement_index(&capture.measurement)?
        .ok_or_else(|| ProcessError::UnknownMeasurement {
            measurement: capture.measurement.clone(),
        })?;

    let mask = match &survey.masks {
        Some(masks) => {
            let mask_row = masks
                .find_row("measurement", &capture.measurement)?
                .ok_or_else(|| ProcessError::TableOrderMismatch {
                    measurement: capture.measurement.clone(),
                })?;
            // The tables must list measurements in the same order, otherwise
            // positions and masks would describe different captures.
            if mask_row != row {
                return Err(ProcessError::TableOrderMismatch {
                    measurement: capture.measurement.clone(),
                });
            }
            Some(capture_mask(masks, mask_row, survey.config.image_shape)?)
        }
        None => None,
    };

    let aggregator = RegionAggregator::new(cube.view(), &bands, mask.as_ref().map(Mask::view));
    let layout = survey.positions_hyp.at(row);
    let params = CollectorParams {
        grid: survey.config.grid,
        ..CollectorParams::default()
    };
    let collector = ZoneCollector::new(aggregator, &layout, params);
    let spectra = collector.collect(zone_list)?;

    let moisture = match_soil_moisture(
        &survey.config.data_sm,
        datetime,
        zone_list,
        &survey.aliases,
        survey.config.time_window_min,
    )?;
    let lwir = match_lwir(
        &survey.config.data_lwir,
        datetime,
        zone_list,
        &survey.positions_lwir,
        survey.config.time_window_min,
    )?;

    let mut output = OutputTable::new(spectra.wavelengths);
    for row in spectra.rows {
        let m = moisture.iter().find(|m| m.zone == row.zone);
        let l = lwir.iter().find(|l| l.zone == row.zone);
        output.rows.push(CaptureRow {
            zone: row.zone,
            cell: row.cell,
            values: row.values,
            datetime: Some(datetime),
            vol_sm: m.map(|m| m.vol_sm),
            temp_c: m.map(|m| m.temp_c),
            lwir_mean: l.map(|l| l.mean),
            lwir_median: l.map(|l| l.median),
            lwir_std: l.map(|l| l.std),
        });
    }
    Ok(Some(output))
}

/// Process every capture of the survey and write the output CSV.
///
/// A failing capture is logged and skipped; the batch keeps going. Only
/// structural problems (unreadable configuration, a changed band layout,
/// an unwritable output file) abort the run.
pub fn process_survey(survey: &Survey) -> Result<OutputTable, ProcessError> {
    if survey.config.data_output.exists() && !survey.config.overwrite_output {
        return Err(ProcessError::OutputExists {
            path: survey.config.data_output.clone(),
        });
    }

    let captures = discover_captures(&survey.config.data_hyp)?;
    info!("discovered {} captures", captures.len());

    let mut output = OutputTable::default();
    for capture in &captures {
        if survey.is_ignored(capture) {
            debug!(
                "capture {} {:03}: ignored by configuration",
                capture.measurement, capture.number
            );
            continue;
        }
        let zone_list = survey.zone_list_for(capture);
        if zone_list.is_empty() {
            debug!(
                "capture {} {:03}: every zone is ignored",
                capture.measurement, capture.number
            );
            continue;
        }

        match process_capture(survey, capture, &zone_list) {
            Ok(Some(table)) => output.append(table)?,
            Ok(None) => {}
            Err(err) => {
                error!(
                    "capture {} {:03} failed: {err}",
                    capture.measurement, capture.number
                );
            }
        }
    }

    write_output_csv(&output, &survey.config.data_output)?;
    info!(
        "wrote {} rows to {}",
        output.rows.len(),
        survey.config.data_output.display()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_spectra_zones::ZoneRow;

    #[test]
    fn highres_companion_sits_next_to_the_capture() {
        let path = highres_header_path(Path::new("/data/hyp/Auto017.hdr"));
        assert_eq!(path, PathBuf::from("/data/hyp/Auto017_highres.hdr"));
    }

    #[test]
    fn discovery_skips_highres_headers() {
        let dir = tempfile::tempdir().unwrap();
        let meas = dir.path().join("20170815_meas1_hyp");
        fs::create_dir(&meas).unwrap();
        fs::write(meas.join("Auto017.hdr"), "ENVI\n").unwrap();
        fs::write(meas.join("Auto017_highres.hdr"), "ENVI\n").unwrap();
        fs::write(meas.join("Auto018.hdr"), "ENVI\n").unwrap();
        fs::write(meas.join("Auto017.cue"), "").unwrap();

        let captures = discover_captures(dir.path()).unwrap();
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].measurement, "20170815_meas1");
        assert_eq!(captures[0].number, 17);
        assert_eq!(captures[1].number, 18);
    }

    #[test]
    fn append_rejects_a_changed_band_layout() {
        let mut table = OutputTable::new(vec![450.0, 500.0]);
        let err = table.append(OutputTable::new(vec![450.0])).unwrap_err();
        assert!(matches!(err, ProcessError::BandLayoutChanged { .. }));
    }

    #[test]
    fn empty_table_adopts_the_first_capture() {
        let mut table = OutputTable::default();
        table.append(OutputTable::new(vec![450.0])).unwrap();
        assert_eq!(table.wavelengths, vec![450.0]);
    }

    #[test]
    fn csv_cells_for_missing_values_are_empty() {
        let spectra = SpectraTable {
            wavelengths: vec![450.5, 600.0],
            rows: vec![ZoneRow {
                zone: "zone1".to_owned(),
                cell: GridCell::new(0, 1),
                values: vec![0.5, f64::NAN],
            }],
        };
        let table = OutputTable::from_spectra(spectra, None);

        let file = tempfile::NamedTempFile::new().unwrap();
        write_output_csv(&table, file.path()).unwrap();
        let written = fs::read_to_string(file.path()).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next().unwrap(),
            "zone,grid_row,grid_col,datetime,450.5,600,volSM_vol%,T_C,lwir_mean,lwir_med,lwir_std"
        );
        assert_eq!(lines.next().unwrap(), "zone1,0,1,,0.5,,,,,,");
    }
}
