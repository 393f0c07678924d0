//! GRIB1 message record (spec.md §3 `GRIB1Message`).

use crate::error::Warning;
use crate::time::UtcDateTime;

pub const GRIB_MISSING: f64 = 1e30;

/// Level-type codes that use a 16-bit `level1` and a zero `level2`,
/// rather than two independent 8-bit levels (spec.md §4.C step 2).
pub const WIDE_LEVEL_TYPES: &[u8] = &[
    100, 103, 105, 107, 109, 111, 113, 115, 125, 160, 200, 201,
];

/// Time-range indicator codes that carry a number-of-reports-averaged
/// field, `N_avg` (spec.md §4.C step 2).
pub const TIME_RANGES_WITH_N_AVG: &[u8] = &[3, 4, 51, 113, 114, 115, 116, 117, 123, 124];

#[derive(Debug, Clone, PartialEq)]
pub struct LatLonParams {
    pub nx: u16,
    pub ny: u16,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub elat: f64,
    pub elon: f64,
    pub loinc: f64,
    pub lainc: f64,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianParams {
    pub nx: u16,
    pub ny: u16,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub elat: f64,
    pub elon: f64,
    pub loinc: f64,
    /// Number of parallels between a pole and the equator — an integer,
    /// not a scaled angle, unlike `LatLonParams::lainc`.
    pub n_parallels: u16,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MercatorParams {
    pub nx: u16,
    pub ny: u16,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub elat: f64,
    pub elon: f64,
    pub std_lat1: f64,
    pub xlen: f64,
    pub ylen: f64,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambertParams {
    pub nx: u16,
    pub ny: u16,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub olon: f64,
    pub xlen: f64,
    pub ylen: f64,
    pub proj_flag: u8,
    pub std_lat1: f64,
    pub std_lat2: f64,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolarStereoParams {
    pub nx: u16,
    pub ny: u16,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub olon: f64,
    pub xlen: f64,
    pub ylen: f64,
    pub proj_flag: u8,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GRIB1Grid {
    LatLon(LatLonParams),
    RotatedLatLon(LatLonParams),
    Gaussian(GaussianParams),
    Mercator(MercatorParams),
    Lambert(LambertParams),
    PolarStereographic(PolarStereoParams),
}

impl GRIB1Grid {
    pub fn nx(&self) -> u16 {
        match self {
            Self::LatLon(p) | Self::RotatedLatLon(p) => p.nx,
            Self::Gaussian(p) => p.nx,
            Self::Mercator(p) => p.nx,
            Self::Lambert(p) => p.nx,
            Self::PolarStereographic(p) => p.nx,
        }
    }

    pub fn ny(&self) -> u16 {
        match self {
            Self::LatLon(p) | Self::RotatedLatLon(p) => p.ny,
            Self::Gaussian(p) => p.ny,
            Self::Mercator(p) => p.ny,
            Self::Lambert(p) => p.ny,
            Self::PolarStereographic(p) => p.ny,
        }
    }

    /// The GRIB1 `data_representation` code for this grid's GDS template
    /// (spec.md §4.C step 3 dispatch table).
    pub fn data_representation(&self) -> u8 {
        match self {
            Self::LatLon(_) => 0,
            Self::Mercator(_) => 1,
            Self::Lambert(_) => 3,
            Self::Gaussian(_) => 4,
            Self::PolarStereographic(_) => 5,
            Self::RotatedLatLon(_) => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GRIB1Message {
    pub edition: u8,
    pub table_version: u8,
    pub centre_id: u8,
    pub subcentre_id: u8,
    pub generating_process: u8,
    pub parameter_code: u8,
    pub level_type: u8,
    pub level1: u16,
    pub level2: u8,
    pub reference_time: UtcDateTime,
    pub forecast_units: u8,
    pub p1: u32,
    pub p2: u32,
    pub time_range: u8,
    pub n_avg: u16,
    pub n_missing: u8,
    /// Opaque bytes beyond octet 40 of the PDS, preserved but not
    /// interpreted (spec.md §4.C step 2).
    pub pds_extension: Vec<u8>,
    pub grid: GRIB1Grid,
    /// Per-gridpoint mask, `nx * ny` bits, MSB-first.
    pub bitmap: Option<Vec<u8>>,
    /// Binary scale factor `E`.
    pub binary_scale: i16,
    /// Decimal scale factor `D`.
    pub decimal_scale: i16,
    /// Reference value `R`.
    pub reference_value: f32,
    pub pack_width: u8,
    /// Dense gridpoint array, `nx * ny` long, `GRIB_MISSING` at masked
    /// positions.
    pub gridpoints: Vec<f64>,
    pub warnings: Vec<Warning>,
}

impl GRIB1Message {
    /// `level_type` dispatch per spec.md §4.C step 2: wide level types
    /// use a 16-bit `level1` with `level2` forced to zero.
    pub fn uses_wide_level(level_type: u8) -> bool {
        WIDE_LEVEL_TYPES.contains(&level_type)
    }

    pub fn time_range_has_n_avg(time_range: u8) -> bool {
        TIME_RANGES_WITH_N_AVG.contains(&time_range)
    }
}
