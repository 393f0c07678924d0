//! Synthetic fixture builders, standing in for the teacher's
//! `tests/cli/utils/testdata.rs` (which pulls real `testdata/*.grib2`
//! files off disk) since no retrievable binary fixtures exist here:
//! everything is built in-process with the library's own encoder.

use std::io::{self, Write};

use gribconv::grib1::{GRIB1Grid, LatLonParams};
use gribconv::{GRIB1Message, UtcDateTime};
use tempfile::NamedTempFile;

pub(crate) fn write_to_tempfile(bytes: &[u8]) -> Result<NamedTempFile, io::Error> {
    let mut out = NamedTempFile::new()?;
    out.write_all(bytes)?;
    Ok(out)
}

pub(crate) fn empty_file() -> Result<NamedTempFile, io::Error> {
    NamedTempFile::new()
}

pub(crate) fn non_grib_file() -> Result<NamedTempFile, io::Error> {
    write_to_tempfile(b"definitely not a valid codec payload, just prose padding bytes")
}

/// A minimal two-by-two GRIB1 message with a flat, unmasked lat-lon
/// grid, encoded to its on-the-wire byte form.
pub(crate) fn sample_grib1_bytes() -> Vec<u8> {
    let msg = GRIB1Message {
        edition: 1,
        table_version: 2,
        centre_id: 7,
        subcentre_id: 0,
        generating_process: 2,
        parameter_code: 11,
        level_type: 100,
        level1: 1000,
        level2: 0,
        reference_time: UtcDateTime::new(2024, 3, 1, 0, 0, 0),
        forecast_units: 1,
        p1: 0,
        p2: 0,
        time_range: 0,
        n_avg: 0,
        n_missing: 0,
        pds_extension: Vec::new(),
        grid: GRIB1Grid::LatLon(LatLonParams {
            nx: 2,
            ny: 2,
            slat: 10.0,
            slon: 20.0,
            rescomp: 0,
            elat: 9.0,
            elon: 21.0,
            loinc: 1.0,
            lainc: 1.0,
            scan_mode: 0,
        }),
        bitmap: None,
        binary_scale: 0,
        decimal_scale: 1,
        reference_value: 280.0,
        pack_width: 8,
        gridpoints: vec![280.0, 281.0, 282.0, 283.0],
        warnings: Vec::new(),
    };
    gribconv::grib1::encode(&msg).expect("sample GRIB1 message must encode")
}

pub(crate) fn sample_grib1_tempfile() -> Result<NamedTempFile, io::Error> {
    write_to_tempfile(&sample_grib1_bytes())
}
