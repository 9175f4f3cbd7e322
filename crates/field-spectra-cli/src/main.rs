//! Command-line driver for survey processing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use thiserror::Error;

use field_spectra_core::{init_with_level, GridSpec};
use field_spectra_envi::{capture_datetime, load_cube, EnviError, EnviHeader};
use field_spectra_survey::{
    process_survey, write_output_csv, OutputTable, PositionsTable, ProcessConfig, ProcessError,
    TableError, DEFAULT_ZONES,
};
use field_spectra_zones::{CollectError, CollectorParams, RegionAggregator, ZoneCollector};

#[derive(Parser)]
#[command(
    name = "field-spectra",
    version,
    about = "Extract calibrated zone spectra from hyperspectral field surveys"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every capture of a survey into one output table.
    Process {
        /// JSON process configuration.
        #[arg(long)]
        config: PathBuf,
        /// Dataset directory that relative config paths resolve against.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,
    },
    /// Extract the calibrated spectra table of a single capture.
    Capture {
        /// Low-resolution header of the capture (`.cue` image next to it,
        /// band metadata in `<stem>_highres.hdr`).
        #[arg(long)]
        hdr: PathBuf,
        /// Zone rectangle table of the hyperspectral camera.
        #[arg(long)]
        positions: PathBuf,
        /// Measurement name (row key into the positions table).
        #[arg(long)]
        measurement: String,
        /// Grid rows and columns; 0 expands an axis to one cell per pixel.
        #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"])]
        grid: Option<Vec<u32>>,
        /// Comma-separated zone names.
        #[arg(long, value_delimiter = ',')]
        zones: Option<Vec<String>>,
        /// Output CSV path.
        #[arg(long, default_value = "capture_spectra.csv")]
        output: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Envi(#[from] EnviError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error("measurement {0:?} is not in the positions table")]
    UnknownMeasurement(String),
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = init_with_level(level);

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Process { config, data_dir } => {
            let config = ProcessConfig::load_json(config).map_err(ProcessError::from)?;
            let survey = field_spectra_survey::Survey::load(config.resolved(&data_dir))?;
            let output = process_survey(&survey)?;
            println!(
                "{} rows written to {}",
                output.rows.len(),
                survey.config.data_output.display()
            );
            Ok(())
        }
        Command::Capture {
            hdr,
            positions,
            measurement,
            grid,
            zones,
            output,
        } => {
            let header = EnviHeader::load(&hdr)?;
            let stem = hdr
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let highres = hdr.with_file_name(format!("{stem}_highres.hdr"));
            let header_highres = EnviHeader::load(&highres)?;

            let bands = header_highres.band_set()?;
            let datetime = capture_datetime(&header_highres).ok();
            let cube = load_cube(&header, hdr.with_extension("cue"))?;

            let positions = PositionsTable::load(&positions)?;
            let row = positions
                .measurement_index(&measurement)?
                .ok_or_else(|| CliError::UnknownMeasurement(measurement.clone()))?;

            // Without --grid the whole zone stays one cell; `--grid 0 0`
            // expands to one cell per pixel.
            let params = match grid {
                Some(g) => CollectorParams {
                    grid: Some(GridSpec::new(g[0], g[1])),
                    ..CollectorParams::default()
                },
                None => CollectorParams::default(),
            };
            let layout = positions.at(row);
            let aggregator = RegionAggregator::new(cube.view(), &bands, None);
            let collector = ZoneCollector::new(aggregator, &layout, params);

            let zones = zones.unwrap_or_else(|| {
                DEFAULT_ZONES
                    .iter()
                    .filter(|zone| positions.has_zone(zone))
                    .map(|zone| (*zone).to_owned())
                    .collect()
            });
            let spectra = collector.collect(&zones)?;

            let table = OutputTable::from_spectra(spectra, datetime);
            write_output_csv(&table, &output)?;
            println!("{} rows written to {}", table.rows.len(), output.display());
            Ok(())
        }
    }
}
