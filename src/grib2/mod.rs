//! GRIB edition 2 message model, decoder, and encoder (spec.md §3, §4.D, §4.J).

pub mod decode;
pub mod encode;
pub mod jpeg2000;
pub mod message;

pub use decode::decode;
pub use encode::encode;
pub use message::{
    BaseProductFields, CommonMetadata, ComplexPackingFields, DerivedFields, DrsBase,
    EnsembleFields, GRIB2Grid, GRIB2Message, GaussianGrid, GridDefinition, Identification,
    LambertGrid, LatLonGrid, MercatorGrid, PolarStereoGrid, ProductDefinition, ReprDefinition,
    SpatialProcessingFields, StatisticalFields, StatisticalRange, GRIB_MISSING,
};
