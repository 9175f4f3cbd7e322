//! Soil moisture sensor matching.
//!
//! The field carries a fixed installation of TDR probes, several per plot at
//! different depths. For every capture, the shallowest probe of each
//! configured zone contributes the sample nearest in time.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::timeutil::nearest_datetime;

/// One TDR probe of the fixed installation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorInfo {
    pub number: u32,
    /// Experimental plot label (A1..D2).
    pub plot: &'static str,
    /// Installation depth in centimeters.
    pub depth: f64,
}

/// All installed probes.
pub const SENSORS: &[SensorInfo] = &[
    SensorInfo { number: 36554, plot: "A1", depth: 2.5 },
    SensorInfo { number: 36555, plot: "A1", depth: 5.0 },
    SensorInfo { number: 36556, plot: "A1", depth: 10.0 },
    SensorInfo { number: 36547, plot: "A2", depth: 5.0 },
    SensorInfo { number: 36557, plot: "B1", depth: 2.5 },
    SensorInfo { number: 36558, plot: "B1", depth: 5.0 },
    SensorInfo { number: 36559, plot: "B1", depth: 10.0 },
    SensorInfo { number: 36553, plot: "B2", depth: 5.0 },
    SensorInfo { number: 36549, plot: "C1", depth: 2.5 },
    SensorInfo { number: 36550, plot: "C1", depth: 5.0 },
    SensorInfo { number: 36551, plot: "C1", depth: 10.0 },
    SensorInfo { number: 36552, plot: "C1", depth: 20.0 },
    SensorInfo { number: 36560, plot: "C2", depth: 5.0 },
    SensorInfo { number: 36562, plot: "D1", depth: 2.5 },
    SensorInfo { number: 36563, plot: "D1", depth: 5.0 },
    SensorInfo { number: 36564, plot: "D1", depth: 10.0 },
    SensorInfo { number: 36565, plot: "D1", depth: 20.0 },
    SensorInfo { number: 36561, plot: "D2", depth: 5.0 },
];

/// The shallowest probe of each plot, ordered by plot label.
pub fn uppermost_sensors() -> Vec<SensorInfo> {
    let mut best: BTreeMap<&'static str, SensorInfo> = BTreeMap::new();
    for sensor in SENSORS {
        best.entry(sensor.plot)
            .and_modify(|current| {
                if sensor.depth < current.depth {
                    *current = *sensor;
                }
            })
            .or_insert(*sensor);
    }
    best.into_values().collect()
}

/// Plot label to zone name mapping of the fixed field layout.
#[derive(Clone, Debug)]
pub struct ZoneAliases {
    entries: Vec<(String, String)>,
}

impl Default for ZoneAliases {
    fn default() -> Self {
        let entries = [
            ("A1", "zone1"),
            ("A2", "zone2"),
            ("B1", "zone3"),
            ("B2", "zone4"),
            ("C1", "zone5"),
            ("C2", "zone6"),
            ("D1", "zone7"),
            ("D2", "zone8"),
        ]
        .into_iter()
        .map(|(plot, zone)| (plot.to_owned(), zone.to_owned()))
        .collect();
        Self { entries }
    }
}

impl ZoneAliases {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    /// Zone name of a plot label.
    pub fn zone(&self, plot: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == plot)
            .map(|(_, zone)| zone.as_str())
    }
}

/// One matched soil moisture sample.
#[derive(Clone, Debug, PartialEq)]
pub struct MoistureReading {
    pub zone: String,
    /// Volumetric soil moisture in percent.
    pub vol_sm: f64,
    /// Soil temperature in degrees Celsius.
    pub temp_c: f64,
}

#[derive(Debug, Error)]
pub enum MoistureError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("cannot parse timestamp {value:?}")]
    Timestamp { value: String },
}

#[derive(Debug, Deserialize)]
struct MoistureRecord {
    timestamp: String,
    #[serde(rename = "sensorID")]
    sensor_id: String,
    #[serde(rename = "volSM_vol%")]
    vol_sm: f64,
    #[serde(rename = "T_C")]
    temp_c: f64,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, MoistureError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    // Naive timestamps are taken as UTC.
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|_| MoistureError::Timestamp {
            value: value.to_owned(),
        })
}

/// Match the soil moisture log against one capture timestamp.
///
/// Considers only the shallowest probe of each zone in `zone_list`. A probe
/// without a sample within half of `window_min` minutes contributes no row;
/// the gap is logged, never fabricated.
pub fn match_soil_moisture(
    csv_path: impl AsRef<Path>,
    capture: DateTime<Utc>,
    zone_list: &[String],
    aliases: &ZoneAliases,
    window_min: f64,
) -> Result<Vec<MoistureReading>, MoistureError> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut by_sensor: HashMap<String, Vec<(DateTime<Utc>, f64, f64)>> = HashMap::new();
    for record in reader.deserialize::<MoistureRecord>() {
        let record = record?;
        let timestamp = parse_timestamp(&record.timestamp)?;
        by_sensor
            .entry(record.sensor_id)
            .or_default()
            .push((timestamp, record.vol_sm, record.temp_c));
    }

    let mut readings = Vec::new();
    for sensor in uppermost_sensors() {
        let Some(zone) = aliases.zone(sensor.plot) else {
            continue;
        };
        if !zone_list.iter().any(|z| z == zone) {
            continue;
        }

        // Sensor ids are logged with a leading T.
        let key = format!("T{}", sensor.number);
        let Some(samples) = by_sensor.get(&key) else {
            warn!("no samples for soil moisture sensor {}", sensor.number);
            continue;
        };
        let stamps: Vec<DateTime<Utc>> = samples.iter().map(|s| s.0).collect();
        let Some((nearest, delta_min)) = nearest_datetime(&stamps, capture) else {
            continue;
        };
        if delta_min > window_min / 2.0 {
            warn!(
                "no soil moisture sample for sensor {} within the match window",
                sensor.number
            );
            continue;
        }
        if let Some(&(_, vol_sm, temp_c)) = samples.iter().find(|s| s.0 == nearest) {
            readings.push(MoistureReading {
                zone: zone.to_owned(),
                vol_sm,
                temp_c,
            });
        }
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn uppermost_sensor_per_plot() {
        let uppermost = uppermost_sensors();
        let plots: Vec<&str> = uppermost.iter().map(|s| s.plot).collect();
        assert_eq!(plots, vec!["A1", "A2", "B1", "B2", "C1", "C2", "D1", "D2"]);
        let numbers: Vec<u32> = uppermost.iter().map(|s| s.number).collect();
        assert_eq!(
            numbers,
            vec![36554, 36547, 36557, 36553, 36549, 36560, 36562, 36561]
        );
    }

    #[test]
    fn aliases_map_plots_to_zones() {
        let aliases = ZoneAliases::default();
        assert_eq!(aliases.zone("A1"), Some("zone1"));
        assert_eq!(aliases.zone("D2"), Some("zone8"));
        assert_eq!(aliases.zone("E1"), None);
    }

    fn write_log(rows: &[(&str, &str, f64, f64)]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,sensorID,volSM_vol%,T_C").unwrap();
        for (ts, id, sm, t) in rows {
            writeln!(file, "{ts},{id},{sm},{t}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn matches_the_nearest_sample_within_the_window() {
        let file = write_log(&[
            ("2017-08-15 15:54:00+00:00", "T36554", 20.5, 24.0),
            ("2017-08-15 15:57:30+00:00", "T36554", 21.0, 24.5),
            ("2017-08-15 15:54:00+00:00", "T36547", 18.0, 23.0),
        ]);
        let capture = Utc.with_ymd_and_hms(2017, 8, 15, 15, 57, 0).unwrap();

        let readings = match_soil_moisture(
            file.path(),
            capture,
            &["zone1".to_owned(), "zone2".to_owned()],
            &ZoneAliases::default(),
            6.0,
        )
        .unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].zone, "zone1");
        assert_eq!(readings[0].vol_sm, 21.0);
        assert_eq!(readings[1].zone, "zone2");
        assert_eq!(readings[1].temp_c, 23.0);
    }

    #[test]
    fn zones_outside_the_list_are_skipped() {
        let file = write_log(&[("2017-08-15 15:57:00+00:00", "T36554", 20.5, 24.0)]);
        let capture = Utc.with_ymd_and_hms(2017, 8, 15, 15, 57, 0).unwrap();

        let readings = match_soil_moisture(
            file.path(),
            capture,
            &["zone3".to_owned()],
            &ZoneAliases::default(),
            6.0,
        )
        .unwrap();
        assert!(readings.is_empty());
    }

    #[test]
    fn late_samples_outside_the_window_are_dropped() {
        let file = write_log(&[("2017-08-15 16:10:00+00:00", "T36554", 20.5, 24.0)]);
        let capture = Utc.with_ymd_and_hms(2017, 8, 15, 15, 57, 0).unwrap();

        let readings = match_soil_moisture(
            file.path(),
            capture,
            &["zone1".to_owned()],
            &ZoneAliases::default(),
            6.0,
        )
        .unwrap();
        assert!(readings.is_empty());
    }
}
