//! GRIB1⇄GRIB2 translation (spec.md §4.E, §4.F, §4.G).

pub mod forward;
pub mod reverse;
pub mod tables;

pub use forward::grib1_to_grib2;
pub use reverse::grib2_to_grib1;
