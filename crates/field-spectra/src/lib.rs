//! High-level facade crate for the `field-spectra-*` workspace.
//!
//! This crate provides stable, convenient re-exports of the underlying
//! crates:
//!
//! - `field_spectra::core`: value types (rectangles, bands, cube, mask).
//! - `field_spectra::zones`: grid partitioning, aggregation, calibration and
//!   the per-capture zone collector.
//! - `field_spectra::envi`: ENVI header/cube loading and capture timestamps.
//! - `field_spectra::survey`: configuration tables, masks, environment
//!   matching and the batch driver.
//!
//! ## Quickstart
//!
//! ```no_run
//! use field_spectra::survey::{process_survey, ProcessConfig, Survey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProcessConfig::load_json("process.json")?;
//! let survey = Survey::load(config.resolved(std::path::Path::new("/data")))?;
//! let output = process_survey(&survey)?;
//! println!("{} rows", output.rows.len());
//! # Ok(())
//! # }
//! ```

pub use field_spectra_core as core;
pub use field_spectra_envi as envi;
pub use field_spectra_survey as survey;
pub use field_spectra_zones as zones;

pub use field_spectra_core::{BandSet, Cube, CubeView, GridCell, GridSpec, Mask, MaskView, Rect};
pub use field_spectra_zones::{
    AggregationMode, CollectorParams, RegionAggregator, SpectraTable, Spectrum, ZoneCollector,
    ZoneLayout,
};
