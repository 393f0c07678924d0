#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bitio;
pub mod codetables;
pub mod driver;
pub mod error;
pub mod grib1;
pub mod grib2;
pub mod ibmfloat;
pub mod session;
pub mod time;
pub mod translate;

pub use crate::{
    codetables::Code::{self, Name, Num},
    driver::{run_grib1_to_2, run_grib2_to_1, DriverResult},
    error::{GribError, Warning},
    session::CodecSession,
    time::{add_duration, TimeUnit, UtcDateTime},
    translate::{grib1_to_grib2, grib2_to_grib1},
};

pub use crate::grib1::{GRIB1Grid, GRIB1Message};
pub use crate::grib2::{GRIB2Grid, GRIB2Message};
