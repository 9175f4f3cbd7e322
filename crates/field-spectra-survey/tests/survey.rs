//! End-to-end survey processing over a synthetic capture on disk.

use std::fs;
use std::io::Write;
use std::path::Path;

use approx::assert_relative_eq;
use field_spectra_survey::{process_survey, ProcessConfig, ProcessError, Survey};

const MEASUREMENT: &str = "20170815_meas1";

/// 6x6x4 capture, every sample 100.0, band-interleaved by pixel.
fn write_capture(dir: &Path) {
    let hyp = dir.join("hyp").join(format!("{MEASUREMENT}_hyp"));
    fs::create_dir_all(&hyp).unwrap();

    let hdr = "ENVI\n\
        samples = 6\n\
        lines = 6\n\
        bands = 4\n\
        header offset = 0\n\
        data type = 4\n\
        interleave = bip\n\
        byte order = 0\n";
    fs::write(hyp.join("Auto017.hdr"), hdr).unwrap();

    let highres = "ENVI\n\
        description = {\n\
        Date: 08/15/2017,\n\
        Time: 5:57:02.00 P,\n\
        Capture}\n\
        samples = 12\n\
        lines = 12\n\
        bands = 4\n\
        data type = 4\n\
        wavelength = { 450.0, 500.0, 550.0, 600.0 }\n\
        bbl = { 1, 0, 1, 1 }\n";
    fs::write(hyp.join("Auto017_highres.hdr"), highres).unwrap();

    let mut cue = fs::File::create(hyp.join("Auto017.cue")).unwrap();
    for _ in 0..(6 * 6 * 4) {
        cue.write_all(&100.0f32.to_le_bytes()).unwrap();
    }
    cue.flush().unwrap();
}

fn write_tables(dir: &Path) {
    // zone1 and the spectralon inside the 6x6 extent; the spectralon keeps
    // 16 pixels for the top-10 mean.
    fs::write(
        dir.join("positions_hyp.csv"),
        "measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end \
         spec_row_start spec_row_end spec_col_start spec_col_end\n\
         20170815_meas1 0 2 0 2 2 6 2 6\n",
    )
    .unwrap();

    fs::write(
        dir.join("positions_lwir.csv"),
        "measurement zone1_row_start zone1_row_end zone1_col_start zone1_col_end\n\
         20170815 0 2 0 2\n",
    )
    .unwrap();

    // Keep only zone1 for capture 17.
    let mut ignore_zones = String::from("measurement filenumber zone\n");
    for zone in 2..=8 {
        ignore_zones.push_str(&format!("{MEASUREMENT} 17 {zone}\n"));
    }
    fs::write(dir.join("ignore_zones.csv"), ignore_zones).unwrap();

    fs::write(
        dir.join("TDR.csv"),
        "timestamp,sensorID,volSM_vol%,T_C\n\
         2017-08-15 15:57:00+00:00,T36554,21.5,24.0\n",
    )
    .unwrap();

    let lwir = dir.join("lwir");
    fs::create_dir_all(&lwir).unwrap();
    // 17:57 site time, 30 s after the capture.
    fs::write(
        lwir.join("ir_export_20170815_ec_5_17-57-30.csv"),
        "20.0,22.0\n24.0,26.0\n",
    )
    .unwrap();
}

fn survey_config(dir: &Path) -> ProcessConfig {
    serde_json::from_str::<ProcessConfig>(
        r#"{
            "data_hyp": "hyp",
            "data_lwir": "lwir",
            "data_sm": "TDR.csv",
            "data_output": "output.csv",
            "positions_hyp": "positions_hyp.csv",
            "positions_lwir": "positions_lwir.csv",
            "ignore_zones": "ignore_zones.csv",
            "image_shape": [6, 6]
        }"#,
    )
    .unwrap()
    .resolved(dir)
}

#[test]
fn processes_a_synthetic_survey_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());
    write_tables(dir.path());

    let survey = Survey::load(survey_config(dir.path())).unwrap();
    let output = process_survey(&survey).unwrap();

    // One capture, one zone, default (1, 1) grid, 3 usable bands.
    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.wavelengths, vec![450.0, 550.0, 600.0]);

    let row = &output.rows[0];
    assert_eq!(row.zone, "zone1");
    assert_eq!((row.cell.row, row.cell.col), (0, 0));
    // Soil and reference counts are identical, calibration collapses to the
    // reflectance factor.
    for value in &row.values {
        assert_relative_eq!(*value, 0.95);
    }
    assert_eq!(
        row.datetime.unwrap().to_rfc3339(),
        "2017-08-15T15:57:02+00:00"
    );
    assert_eq!(row.vol_sm, Some(21.5));
    assert_eq!(row.temp_c, Some(24.0));
    assert_relative_eq!(row.lwir_mean.unwrap(), 23.0);
    assert_relative_eq!(row.lwir_median.unwrap(), 23.0);

    let written = fs::read_to_string(dir.path().join("output.csv")).unwrap();
    assert!(written.starts_with("zone,grid_row,grid_col,datetime,450,550,600,"));
    assert_eq!(written.lines().count(), 2);
}

#[test]
fn existing_output_is_not_overwritten_by_default() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());
    write_tables(dir.path());
    fs::write(dir.path().join("output.csv"), "old\n").unwrap();

    let survey = Survey::load(survey_config(dir.path())).unwrap();
    let err = process_survey(&survey).unwrap_err();
    assert!(matches!(err, ProcessError::OutputExists { .. }));
    assert_eq!(
        fs::read_to_string(dir.path().join("output.csv")).unwrap(),
        "old\n"
    );
}

#[test]
fn overwrite_flag_allows_reprocessing() {
    let dir = tempfile::tempdir().unwrap();
    write_capture(dir.path());
    write_tables(dir.path());
    fs::write(dir.path().join("output.csv"), "old\n").unwrap();

    let mut config = survey_config(dir.path());
    config.overwrite_output = true;
    let survey = Survey::load(config).unwrap();
    let output = process_survey(&survey).unwrap();
    assert_eq!(output.rows.len(), 1);
    assert_ne!(
        fs::read_to_string(dir.path().join("output.csv")).unwrap(),
        "old\n"
    );
}
