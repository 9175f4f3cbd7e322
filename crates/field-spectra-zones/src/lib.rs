//! Zone spectra extraction over a hyperspectral cube.
//!
//! Pipeline: a zone name resolves to a pixel [`Rect`](field_spectra_core::Rect),
//! the rectangle is partitioned into grid cells, every cell is reduced to one
//! raw per-band spectrum, and all raw spectra are calibrated against the
//! white-reference (spectralon) spectrum of the same capture.
//!
//! ## Quickstart
//!
//! ```
//! use std::collections::HashMap;
//! use field_spectra_core::{BandSet, Cube, Rect};
//! use field_spectra_zones::{CollectorParams, RegionAggregator, ZoneCollector};
//!
//! let cube = Cube::filled(40, 40, 3, 100.0);
//! let bands = BandSet::new(vec![450.0, 500.0, 550.0], vec![1, 1, 1]).unwrap();
//!
//! let mut layout = HashMap::new();
//! layout.insert("spec".to_owned(), Rect::new(0, 10, 0, 10));
//! layout.insert("zone1".to_owned(), Rect::new(10, 20, 0, 10));
//!
//! let aggregator = RegionAggregator::new(cube.view(), &bands, None);
//! let collector = ZoneCollector::new(aggregator, &layout, CollectorParams::default());
//! let table = collector.collect(&["zone1".to_owned()]).unwrap();
//! assert_eq!(table.shape(), (1, 3 + 3));
//! ```

mod aggregate;
mod calibrate;
mod collector;
mod grid;
mod table;

pub use aggregate::{AggregateError, AggregationMode, RegionAggregator};
pub use calibrate::{calibrate_spectrum, calibrate_table, DEFAULT_REFLECTANCE_FACTOR};
pub use collector::{CollectError, CollectorParams, ZoneCollector, ZoneLayout};
pub use grid::{effective_grid, grid_cell_labels, partition_rect, GridError};
pub use table::{SpectraTable, Spectrum, ZoneRow};
