//! GRIB edition 2 message model (spec.md §3 `GRIB2Message`/`GRIB2Grid`,
//! expanded per SPEC_FULL.md §3 with the teacher's richer
//! Identification/GDS modeling).

use crate::codetables::grib2::Table1_2;
use crate::codetables::{Code, Lookup};
use crate::time::UtcDateTime;

pub const GRIB_MISSING: f64 = 1e30;

#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub center: u16,
    pub subcenter: u16,
    pub master_table_version: u8,
    pub local_table_version: u8,
    pub ref_time_significance: u8,
    pub reference_time: UtcDateTime,
    pub production_status: u8,
    pub data_type: u8,
}

impl Identification {
    /// Decorated accessor over Code Table 1.2; the raw byte remains the
    /// field of record so unknown codes still round-trip.
    pub fn ref_time_significance_name(&self) -> Code<Table1_2> {
        Table1_2::lookup(self.ref_time_significance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLonGrid {
    pub nx: u32,
    pub ny: u32,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub elat: f64,
    pub elon: f64,
    pub loinc: f64,
    pub lainc: f64,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianGrid {
    pub nx: u32,
    pub ny: u32,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub elat: f64,
    pub elon: f64,
    pub loinc: f64,
    /// Number of parallels between a pole and the equator.
    ///
    /// The GRIB2 encoder this codec interoperates with writes `latin1` (a
    /// latitude) into this field for Gaussian grids instead of the
    /// parallel count — spec.md §9's third Open Question. This codec
    /// preserves the raw octets bit-exactly on decode and flags it via
    /// `Warning::SuspiciousParameterRegion` only when the value is
    /// implausible as a parallel count (see `decode::decode_gds`).
    pub n_parallels: u32,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorGrid {
    pub nx: u32,
    pub ny: u32,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub elat: f64,
    pub elon: f64,
    pub std_lat1: f64,
    pub dxinc: f64,
    pub dyinc: f64,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertGrid {
    pub nx: u32,
    pub ny: u32,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub olon: f64,
    pub dxinc: f64,
    pub dyinc: f64,
    pub proj_flag: u8,
    pub scan_mode: u8,
    pub std_lat1: f64,
    pub std_lat2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarStereoGrid {
    pub nx: u32,
    pub ny: u32,
    pub slat: f64,
    pub slon: f64,
    pub rescomp: u8,
    pub olon: f64,
    pub dxinc: f64,
    pub dyinc: f64,
    pub proj_flag: u8,
    pub scan_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridDefinition {
    LatLon(LatLonGrid),
    Mercator(MercatorGrid),
    PolarStereographic(PolarStereoGrid),
    Lambert(LambertGrid),
    Gaussian(GaussianGrid),
}

impl GridDefinition {
    pub fn nx(&self) -> u32 {
        match self {
            Self::LatLon(g) => g.nx,
            Self::Mercator(g) => g.nx,
            Self::PolarStereographic(g) => g.nx,
            Self::Lambert(g) => g.nx,
            Self::Gaussian(g) => g.nx,
        }
    }

    pub fn ny(&self) -> u32 {
        match self {
            Self::LatLon(g) => g.ny,
            Self::Mercator(g) => g.ny,
            Self::PolarStereographic(g) => g.ny,
            Self::Lambert(g) => g.ny,
            Self::Gaussian(g) => g.ny,
        }
    }

    /// Template number under GDS Template 3.NN. Spec.md §4.D enumerates
    /// `{0, 10, 30, 40}`; this codec additionally recognizes `20`
    /// (Polar Stereographic) since spec.md §3 lists it as a first-class
    /// grid kind and the narrower set reads as an enumeration gap rather
    /// than an intentional exclusion (recorded in DESIGN.md).
    pub fn template_num(&self) -> u16 {
        match self {
            Self::LatLon(_) => 0,
            Self::Mercator(_) => 10,
            Self::PolarStereographic(_) => 20,
            Self::Lambert(_) => 30,
            Self::Gaussian(_) => 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaseProductFields {
    pub param_category: u8,
    pub param_number: u8,
    pub generating_process: u8,
    pub time_unit: u8,
    pub forecast_time: u32,
    pub level1_type: u8,
    pub level1_scale: i8,
    pub level1_value: u32,
    pub level2_type: u8,
    pub level2_scale: i8,
    pub level2_value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleFields {
    pub ensemble_type: u8,
    pub perturbation_number: u8,
    pub ensemble_size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFields {
    pub derived_code: u8,
    pub ensemble_size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalRange {
    pub process_code: u8,
    pub incr_type: u8,
    pub time_unit: u8,
    pub time_length: u32,
    pub incr_unit: u8,
    pub incr_length: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalFields {
    pub end_time: UtcDateTime,
    pub n_missing: u32,
    pub ranges: Vec<StatisticalRange>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialProcessingFields {
    pub stat_proc: u8,
    pub spatial_type: u8,
    pub num_points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductDefinition {
    Analysis(BaseProductFields),
    Ensemble(BaseProductFields, EnsembleFields),
    Derived(BaseProductFields, DerivedFields),
    Statistical(BaseProductFields, StatisticalFields),
    EnsembleStatistical(BaseProductFields, EnsembleFields, StatisticalFields),
    DerivedStatistical(BaseProductFields, DerivedFields, StatisticalFields),
    SpatialProcessing(BaseProductFields, SpatialProcessingFields),
}

impl ProductDefinition {
    pub fn base(&self) -> &BaseProductFields {
        match self {
            Self::Analysis(b)
            | Self::Ensemble(b, _)
            | Self::Derived(b, _)
            | Self::Statistical(b, _)
            | Self::EnsembleStatistical(b, ..)
            | Self::DerivedStatistical(b, ..)
            | Self::SpatialProcessing(b, _) => b,
        }
    }

    pub fn template_num(&self) -> u16 {
        match self {
            Self::Analysis(_) => 0,
            Self::Ensemble(..) => 1,
            Self::Derived(..) => 2,
            Self::Statistical(..) => 8,
            Self::EnsembleStatistical(..) => 11,
            Self::DerivedStatistical(..) => 12,
            Self::SpatialProcessing(..) => 15,
        }
    }

    pub fn statistical(&self) -> Option<&StatisticalFields> {
        match self {
            Self::Statistical(_, s)
            | Self::EnsembleStatistical(_, _, s)
            | Self::DerivedStatistical(_, _, s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrsBase {
    pub num_packed: u32,
    pub reference_value: f32,
    pub binary_scale: i16,
    pub decimal_scale: i16,
    pub pack_width: u8,
    pub orig_val_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexPackingFields {
    pub group_splitting_method: u8,
    pub missing_value_mgmt: u8,
    pub num_groups: u32,
    pub group_width_ref: u8,
    pub group_width_pack_width: u8,
    pub group_length_ref: u32,
    pub group_length_incr: u8,
    pub group_length_last: u32,
    pub group_length_pack_width: u8,
    pub spatial_diff_order: u8,
    pub spatial_diff_extra_width: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReprDefinition {
    Simple(DrsBase),
    Complex(DrsBase, ComplexPackingFields),
    Jpeg2000(DrsBase),
}

impl ReprDefinition {
    pub fn base(&self) -> &DrsBase {
        match self {
            Self::Simple(b) | Self::Complex(b, _) | Self::Jpeg2000(b) => b,
        }
    }

    pub fn template_num(&self) -> u16 {
        match self {
            Self::Simple(_) => 0,
            Self::Complex(..) => 3,
            Self::Jpeg2000(_) => 40,
        }
    }
}

/// Metadata snapshot attached to a single `GRIB2Grid` (spec.md §3 "a copy
/// of the current metadata snapshot at the time its DS was read", promoted
/// in SPEC_FULL.md §3 to a hard deep-copy invariant: never `Rc`/`Arc`).
#[derive(Debug, Clone, PartialEq)]
pub struct CommonMetadata {
    pub gds: GridDefinition,
    pub pds: ProductDefinition,
    pub drs: ReprDefinition,
    pub bitmap: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GRIB2Grid {
    pub metadata: CommonMetadata,
    pub gridpoints: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GRIB2Message {
    pub discipline: u8,
    pub edition: u8,
    pub total_length: u64,
    pub identification: Identification,
    pub grids: Vec<GRIB2Grid>,
}
