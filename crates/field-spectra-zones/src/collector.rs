//! Multi-zone spectra collection for one capture.

use std::collections::HashMap;

use field_spectra_core::{GridSpec, Rect};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{AggregateError, AggregationMode, RegionAggregator};
use crate::calibrate::{calibrate_spectrum, DEFAULT_REFLECTANCE_FACTOR};
use crate::table::{SpectraTable, ZoneRow};

/// Maps zone names to pixel rectangles on the capture.
pub trait ZoneLayout {
    fn resolve(&self, zone: &str) -> Option<Rect>;
}

impl ZoneLayout for HashMap<String, Rect> {
    fn resolve(&self, zone: &str) -> Option<Rect> {
        self.get(zone).copied()
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("zone {zone:?} has no configured rectangle")]
    UnresolvableZone { zone: String },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Parameters of the per-capture collection pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectorParams {
    /// Grid subdivision applied to every zone. `None` expands both axes to
    /// one cell per pixel.
    pub grid: Option<GridSpec>,
    /// Zone name of the spectralon (white reference) rectangle.
    pub reference_zone: String,
    /// Fraction of incident radiation the reference reflects.
    pub reflectance_factor: f64,
    /// Statistic for the reference spectrum. The top-10 mean tolerates small
    /// contaminated patches on the reference surface while staying more
    /// representative than a single maximum.
    pub reference_mode: AggregationMode,
    /// Statistic for the zone spectra. Median is robust to shadow and
    /// specular-highlight pixels.
    pub zone_mode: AggregationMode,
}

impl Default for CollectorParams {
    fn default() -> Self {
        Self {
            grid: Some(GridSpec::default()),
            reference_zone: "spec".to_owned(),
            reflectance_factor: DEFAULT_REFLECTANCE_FACTOR,
            reference_mode: AggregationMode::Max10,
            zone_mode: AggregationMode::Median,
        }
    }
}

/// Produces the calibrated multi-zone spectra table of one capture.
pub struct ZoneCollector<'a, L> {
    aggregator: RegionAggregator<'a>,
    layout: &'a L,
    params: CollectorParams,
}

impl<'a, L: ZoneLayout> ZoneCollector<'a, L> {
    pub fn new(aggregator: RegionAggregator<'a>, layout: &'a L, params: CollectorParams) -> Self {
        Self {
            aggregator,
            layout,
            params,
        }
    }

    pub fn params(&self) -> &CollectorParams {
        &self.params
    }

    /// Collect the calibrated spectra of all zones, in the given order.
    ///
    /// The reference spectrum is computed once per call and shared by every
    /// row. An unresolvable zone name is a configuration error and aborts
    /// the whole capture.
    pub fn collect(&self, zones: &[String]) -> Result<SpectraTable, CollectError> {
        let reference_rect = self.resolve(&self.params.reference_zone)?;
        let reference = self
            .aggregator
            .region_spectrum(&reference_rect, self.params.reference_mode)?;
        debug!(
            "reference {:?}: {} usable bands",
            self.params.reference_zone,
            reference.len()
        );

        let mut table = SpectraTable::new(self.aggregator.bands().usable_wavelengths().to_vec());
        for zone in zones {
            let rect = self.resolve(zone)?;
            let spectra =
                self.aggregator
                    .grid_spectra(&rect, self.params.grid, self.params.zone_mode)?;
            debug!("zone {zone:?}: {} grid cells", spectra.len());
            for (cell, spectrum) in spectra {
                let values = calibrate_spectrum(
                    &spectrum.values,
                    &reference.values,
                    self.params.reflectance_factor,
                );
                table.rows.push(ZoneRow {
                    zone: zone.clone(),
                    cell,
                    values,
                });
            }
        }
        Ok(table)
    }

    fn resolve(&self, zone: &str) -> Result<Rect, CollectError> {
        self.layout
            .resolve(zone)
            .ok_or_else(|| CollectError::UnresolvableZone {
                zone: zone.to_owned(),
            })
    }
}
