//! GRIB edition 1 message model, decoder, and encoder (spec.md §3, §4.C, §4.G).

pub mod decode;
pub mod encode;
pub mod message;

pub use decode::decode;
pub use encode::encode;
pub use message::{
    GRIB1Grid, GRIB1Message, GaussianParams, LambertParams, LatLonParams, MercatorParams,
    PolarStereoParams, GRIB_MISSING,
};
