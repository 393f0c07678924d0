//! Integration tests driving the `grib2to1`/`grib1to2` binaries end to
//! end, grounded on the teacher's `cli/tests/cli.rs` +
//! `cli/tests/cli/{main,utils,commands}.rs` layout and
//! `assert_cmd`/`predicates`/`tempfile` idiom.

mod commands;
mod utils;

pub(crate) const GRIB2TO1: &str = "grib2to1";
pub(crate) const GRIB1TO2: &str = "grib1to2";
