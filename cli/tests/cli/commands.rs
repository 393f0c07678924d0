use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

use crate::utils;
use crate::{GRIB1TO2, GRIB2TO1};

macro_rules! test_help {
    ($(($name:ident, $bin:expr),)*) => ($(
        #[test]
        fn $name() -> Result<(), Box<dyn std::error::Error>> {
            let mut cmd = Command::cargo_bin($bin)?;
            cmd.arg("--help");
            cmd.assert()
                .success()
                .stdout(predicate::str::contains("Usage:").and(predicate::str::contains($bin)))
                .stderr(predicate::str::is_empty());
            Ok(())
        }
    )*);
}

test_help! {
    (grib2to1_help, GRIB2TO1),
    (grib1to2_help, GRIB1TO2),
}

macro_rules! test_missing_args {
    ($(($name:ident, $bin:expr),)*) => ($(
        #[test]
        fn $name() -> Result<(), Box<dyn std::error::Error>> {
            let mut cmd = Command::cargo_bin($bin)?;
            cmd.assert()
                .failure()
                .stdout(predicate::str::is_empty())
                .stderr(
                    predicate::str::starts_with(
                        "error: the following required arguments were not provided:",
                    )
                    .and(predicate::str::contains("Usage:")),
                );
            Ok(())
        }
    )*);
}

test_missing_args! {
    (grib2to1_without_args, GRIB2TO1),
    (grib1to2_without_args, GRIB1TO2),
}

macro_rules! test_nonexistent_input {
    ($(($name:ident, $bin:expr),)*) => ($(
        #[test]
        fn $name() -> Result<(), Box<dyn std::error::Error>> {
            let dir = tempfile::TempDir::new()?;
            let input = dir.path().join("nosuchfile");
            let output = dir.path().join("out");

            let mut cmd = Command::cargo_bin($bin)?;
            cmd.arg(&input).arg(&output);
            cmd.assert()
                .failure()
                .stdout(predicate::str::is_empty())
                .stderr(predicate::str::starts_with("error:"));
            Ok(())
        }
    )*);
}

test_nonexistent_input! {
    (grib2to1_with_nonexistent_input, GRIB2TO1),
    (grib1to2_with_nonexistent_input, GRIB1TO2),
}

/// Neither binary treats "no GRIB marker found" as fatal: the driver's
/// per-message skip-and-resume policy (spec.md §7) means a non-GRIB or
/// empty input yields a successful run with zero messages written,
/// unlike the teacher's all-or-nothing decode.
#[test]
fn grib2to1_with_non_grib_input_writes_zero_messages() -> Result<(), Box<dyn std::error::Error>> {
    let input = utils::non_grib_file()?;
    let out_dir = tempfile::TempDir::new()?;
    let output = out_dir.path().join("out.grib1");

    let mut cmd = Command::cargo_bin(GRIB2TO1)?;
    cmd.arg(input.path()).arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Number of GRIB1 messages written to output: 0",
        ))
        .stderr(predicate::str::is_empty());

    assert_eq!(std::fs::read(&output)?.len(), 0);
    Ok(())
}

#[test]
fn grib1to2_with_empty_input_writes_zero_messages() -> Result<(), Box<dyn std::error::Error>> {
    let input = utils::empty_file()?;
    let out_dir = tempfile::TempDir::new()?;
    let output = out_dir.path().join("out.grib2");

    let mut cmd = Command::cargo_bin(GRIB1TO2)?;
    cmd.arg(input.path()).arg(&output);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Number of GRIB2 messages written to output: 0",
        ))
        .stderr(predicate::str::is_empty());

    Ok(())
}

/// End-to-end happy path: a synthetic GRIB1 message survives a round
/// trip through `grib1to2` and back through `grib2to1` with its
/// gridpoints intact (spec.md §8 scenario 1).
#[test]
fn grib1_to_grib2_to_grib1_round_trip_preserves_gridpoints() -> Result<(), Box<dyn std::error::Error>> {
    let input = utils::sample_grib1_tempfile()?;
    let out_dir = tempfile::TempDir::new()?;
    let grib2_path = out_dir.path().join("out.grib2");
    let grib1_path = out_dir.path().join("roundtrip.grib1");

    let mut to2 = Command::cargo_bin(GRIB1TO2)?;
    to2.arg(input.path()).arg(&grib2_path);
    to2.assert()
        .success()
        .stdout(predicate::str::contains(
            "Number of GRIB2 messages written to output: 1",
        ));

    let grib2_bytes = std::fs::read(&grib2_path)?;
    let grib2_msg = gribconv::grib2::decode(&grib2_bytes)?;
    assert_eq!(grib2_msg.grids.len(), 1);
    let original = gribconv::grib1::decode(&std::fs::read(input.path())?)?;
    for (got, want) in grib2_msg.grids[0].gridpoints.iter().zip(original.gridpoints.iter()) {
        assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
    }

    let mut back_to1 = Command::cargo_bin(GRIB2TO1)?;
    back_to1.arg(&grib2_path).arg(&grib1_path);
    back_to1.assert()
        .success()
        .stdout(predicate::str::contains(
            "Number of GRIB1 messages written to output: 1",
        ));

    let roundtripped = gribconv::grib1::decode(&std::fs::read(&grib1_path)?)?;
    for (got, want) in roundtripped.gridpoints.iter().zip(original.gridpoints.iter()) {
        assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
    }

    Ok(())
}
