//! Long-wave infrared export matching and per-zone statistics.
//!
//! The LWIR camera writes one CSV frame per shot, named
//! `ir_export_<yyyymmdd>_..._<HH-MM-SS>.csv` with the shot's local wall
//! time. The export nearest to a capture contributes per-zone temperature
//! statistics; a capture without a matching export yields NaN statistics.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use field_spectra_core::Rect;
use log::warn;
use thiserror::Error;

use crate::positions::PositionsTable;
use crate::table::TableError;
use crate::timeutil::nearest_datetime;

#[derive(Debug, Error)]
pub enum LwirError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("frame row {row}: cannot parse {value:?} as a temperature")]
    BadSample { row: usize, value: String },
    #[error("frame row {row} has {got} columns, frame has {expected}")]
    RaggedFrame {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("no LWIR positions row for measurement date {date:?}")]
    UnknownDate { date: String },
}

/// Parse the shot timestamp out of an export file name.
///
/// Wall time in the file name runs on the field-site clock (+02:00).
pub fn export_datetime(file_name: &str) -> Option<DateTime<Utc>> {
    let stem = file_name.strip_suffix(".csv")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 4 || parts[0] != "ir" || parts[1] != "export" {
        return None;
    }
    let date = NaiveDate::parse_from_str(parts[2], "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(parts.last()?, "%H-%M-%S").ok()?;
    let offset = FixedOffset::east_opt(2 * 3600)?;
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Find the export nearest to `capture` within half the match window.
pub fn find_export(
    dir: impl AsRef<Path>,
    capture: DateTime<Utc>,
    window_min: f64,
) -> Result<Option<PathBuf>, LwirError> {
    let mut exports: Vec<(DateTime<Utc>, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(datetime) = export_datetime(name) {
            exports.push((datetime, entry.path()));
        }
    }

    let stamps: Vec<DateTime<Utc>> = exports.iter().map(|e| e.0).collect();
    let Some((nearest, delta_min)) = nearest_datetime(&stamps, capture) else {
        return Ok(None);
    };
    if delta_min > window_min / 2.0 {
        return Ok(None);
    }
    Ok(exports
        .into_iter()
        .find(|(dt, _)| *dt == nearest)
        .map(|(_, path)| path))
}

/// One thermal frame, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermalFrame {
    pub rows: usize,
    pub cols: usize,
    data: Vec<f64>,
}

/// Per-zone thermal statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct LwirReading {
    pub zone: String,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

impl LwirReading {
    /// All-NaN reading for a capture without a matching export.
    fn missing(zone: &str) -> Self {
        Self {
            zone: zone.to_owned(),
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
        }
    }
}

impl ThermalFrame {
    /// Load an export CSV: headerless rows of comma-separated temperatures.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, LwirError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut data = Vec::new();
        let mut cols = 0usize;
        let mut rows = 0usize;
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            if row == 0 {
                cols = record.len();
            } else if record.len() != cols {
                return Err(LwirError::RaggedFrame {
                    row,
                    expected: cols,
                    got: record.len(),
                });
            }
            for field in record.iter() {
                let value: f64 = field.trim().parse().map_err(|_| LwirError::BadSample {
                    row,
                    value: field.to_owned(),
                })?;
                data.push(value);
            }
            rows += 1;
        }
        Ok(Self { rows, cols, data })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Mean, median and population standard deviation over a rectangle.
    pub fn zone_stats(&self, rect: &Rect) -> (f64, f64, f64) {
        let mut values = Vec::with_capacity(rect.area());
        for row in rect.row_start..rect.row_end {
            for col in rect.col_start..rect.col_end {
                values.push(self.get(row, col));
            }
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        values.sort_by(|a, b| a.total_cmp(b));
        let mid = values.len() / 2;
        let median = if values.is_empty() {
            f64::NAN
        } else if values.len() % 2 == 1 {
            values[mid]
        } else {
            (values[mid - 1] + values[mid]) / 2.0
        };
        (mean, median, variance.sqrt())
    }
}

/// Match the LWIR exports of a survey against one capture.
///
/// Zone rectangles come from the LWIR camera's positions table, keyed by the
/// capture's local date (`yyyymmdd`). When no export falls into the match
/// window every zone reports NaN statistics.
pub fn match_lwir(
    dir: impl AsRef<Path>,
    capture: DateTime<Utc>,
    zone_list: &[String],
    positions: &PositionsTable,
    window_min: f64,
) -> Result<Vec<LwirReading>, LwirError> {
    let Some(path) = find_export(&dir, capture, window_min)? else {
        warn!("no LWIR export within the match window");
        return Ok(zone_list
            .iter()
            .map(|zone| LwirReading::missing(zone))
            .collect());
    };

    let frame = ThermalFrame::load_csv(&path)?;

    // Positions rows are keyed by the site-local (+02:00) capture date.
    let date = (capture + chrono::Duration::hours(2))
        .format("%Y%m%d")
        .to_string();
    let row = positions
        .measurement_index(&date)?
        .ok_or(LwirError::UnknownDate { date })?;

    let mut readings = Vec::with_capacity(zone_list.len());
    for zone in zone_list {
        let rect = positions.rect(zone, row)?;
        let (mean, median, std) = frame.zone_stats(&rect);
        readings.push(LwirReading {
            zone: zone.clone(),
            mean,
            median,
            std,
        });
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn file_name_timestamp_is_site_local() {
        let datetime = export_datetime("ir_export_20170816_ec_5_10-30-00.csv").unwrap();
        assert_eq!(datetime, Utc.with_ymd_and_hms(2017, 8, 16, 8, 30, 0).unwrap());
        assert!(export_datetime("ir_export_20170816.csv").is_none());
        assert!(export_datetime("export_20170816_10-30-00.csv").is_none());
        assert!(export_datetime("notes.txt").is_none());
    }

    #[test]
    fn frame_stats_cover_the_rectangle_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.0,2.0,3.0").unwrap();
        writeln!(file, "4.0,5.0,6.0").unwrap();
        writeln!(file, "7.0,8.0,9.0").unwrap();
        file.flush().unwrap();

        let frame = ThermalFrame::load_csv(file.path()).unwrap();
        assert_eq!((frame.rows, frame.cols), (3, 3));

        // 2x2 block {1, 2, 4, 5}.
        let (mean, median, std) = frame.zone_stats(&Rect::new(0, 2, 0, 2));
        assert_relative_eq!(mean, 3.0);
        assert_relative_eq!(median, 3.0);
        assert_relative_eq!(std, 2.5f64.sqrt());
    }

    #[test]
    fn missing_export_yields_nan_readings() {
        let dir = tempfile::tempdir().unwrap();
        let positions = PositionsTable::parse(
            "measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end\n\
             20170815 0 2 0 2\n",
        )
        .unwrap();
        let capture = Utc.with_ymd_and_hms(2017, 8, 15, 15, 57, 0).unwrap();

        let readings =
            match_lwir(dir.path(), capture, &["zone1".to_owned()], &positions, 6.0).unwrap();
        assert_eq!(readings.len(), 1);
        assert!(readings[0].mean.is_nan());
    }

    #[test]
    fn matching_export_produces_zone_stats() {
        let dir = tempfile::tempdir().unwrap();
        // Capture at 15:57 UTC is 17:57 site time.
        let path = dir.path().join("ir_export_20170815_ec_5_17-58-00.csv");
        std::fs::write(&path, "20.0,22.0\n24.0,26.0\n").unwrap();

        let positions = PositionsTable::parse(
            "measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end\n\
             20170815 0 2 0 2\n",
        )
        .unwrap();
        let capture = Utc.with_ymd_and_hms(2017, 8, 15, 15, 57, 0).unwrap();

        let readings =
            match_lwir(dir.path(), capture, &["zone1".to_owned()], &positions, 6.0).unwrap();
        assert_eq!(readings.len(), 1);
        assert_relative_eq!(readings[0].mean, 23.0);
        assert_relative_eq!(readings[0].median, 23.0);
    }
}
