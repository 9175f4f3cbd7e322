//! Survey-level processing around the zone spectra pipeline.
//!
//! One survey is a directory of captures plus the configuration that binds
//! them together: zone rectangle tables per camera, exclusion masks, soil
//! moisture logs and LWIR exports. This crate loads all of that, runs the
//! collector per capture and assembles the flat output table.

mod config;
mod dataset;
mod lwir;
mod mask;
mod moisture;
mod positions;
mod table;
mod timeutil;

pub use config::{ConfigError, ProcessConfig};
pub use dataset::{
    discover_captures, process_capture, process_survey, write_output_csv, CaptureRef, CaptureRow,
    OutputTable, ProcessError, Survey, DEFAULT_ZONES,
};
pub use lwir::{export_datetime, match_lwir, LwirError, LwirReading, ThermalFrame};
pub use mask::{capture_mask, wooden_bar_pixels, BarSpec, MaskError};
pub use moisture::{
    match_soil_moisture, uppermost_sensors, MoistureError, MoistureReading, SensorInfo,
    ZoneAliases, SENSORS,
};
pub use positions::{MeasurementPositions, PositionsTable};
pub use table::{TableError, TextTable};
pub use timeutil::nearest_datetime;
