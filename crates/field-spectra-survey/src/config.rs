//! Survey processing configuration.

use std::fs;
use std::path::{Path, PathBuf};

use field_spectra_core::GridSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_image_shape() -> (usize, usize) {
    (50, 50)
}

fn default_time_window_min() -> f64 {
    6.0
}

fn default_grid() -> Option<GridSpec> {
    Some(GridSpec::default())
}

/// JSON configuration of one survey processing run.
///
/// Relative paths are resolved against the dataset directory via
/// [`ProcessConfig::resolved`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Directory of the hyperspectral captures, one `<measurement>_hyp`
    /// subdirectory per measurement.
    pub data_hyp: PathBuf,
    /// Directory of the LWIR export CSVs.
    pub data_lwir: PathBuf,
    /// Soil moisture log CSV.
    pub data_sm: PathBuf,
    /// Output table CSV.
    pub data_output: PathBuf,
    /// Zone rectangle table of the hyperspectral camera.
    pub positions_hyp: PathBuf,
    /// Zone rectangle table of the LWIR camera.
    pub positions_lwir: PathBuf,
    /// Mask table; omit to aggregate unmasked.
    #[serde(default)]
    pub masks_hyp: Option<PathBuf>,
    /// Measurements to skip entirely.
    #[serde(default)]
    pub ignore_measurements: Option<PathBuf>,
    /// Single captures to skip (`measurement`, `filenumber`).
    #[serde(default)]
    pub ignore_captures: Option<PathBuf>,
    /// Zones to drop per capture (`measurement`, `filenumber`, `zone`).
    #[serde(default)]
    pub ignore_zones: Option<PathBuf>,
    /// Grid subdivision of every zone; `null` expands to one cell per pixel.
    #[serde(default = "default_grid")]
    pub grid: Option<GridSpec>,
    /// Height and width of the hyperspectral image.
    #[serde(default = "default_image_shape")]
    pub image_shape: (usize, usize),
    /// Match window for soil moisture and LWIR data, in minutes.
    #[serde(default = "default_time_window_min")]
    pub time_window_min: f64,
    /// Overwrite an existing output file instead of refusing to run.
    #[serde(default)]
    pub overwrite_output: bool,
}

impl ProcessConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve every relative path against `data_dir`.
    pub fn resolved(mut self, data_dir: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = data_dir.join(path.as_path());
            }
        };
        resolve(&mut self.data_hyp);
        resolve(&mut self.data_lwir);
        resolve(&mut self.data_sm);
        resolve(&mut self.data_output);
        resolve(&mut self.positions_hyp);
        resolve(&mut self.positions_lwir);
        for optional in [
            &mut self.masks_hyp,
            &mut self.ignore_measurements,
            &mut self.ignore_captures,
            &mut self.ignore_zones,
        ] {
            if let Some(path) = optional {
                resolve(path);
            }
        }
        self
    }
}
