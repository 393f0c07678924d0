//! GRIB1↔GRIB2 static mapping tables (spec.md §4.G), grounded on the
//! teacher's `codetables/grib2.rs` `num_enum` + `Code::Name`/`Code::Num`
//! idiom — kept here as plain `match` functions over tuples returning
//! `Option`, per spec.md §9's REDESIGN FLAG against the source's
//! fall-through `switch` bug class: never a fall-through, always an
//! explicit `None` on miss.

/// `(table_version, center, parameter_code)` → `(discipline, category, number)`.
/// spec.md §4.E: unmapped triples set all three fields to 255.
pub fn parameter_forward(table_version: u8, center: u16, code: u8) -> Option<(u8, u8, u8)> {
    let _ = (table_version, center);
    match code {
        11 => Some((0, 0, 0)),  // temperature
        33 => Some((0, 2, 2)),  // u-wind
        34 => Some((0, 2, 3)),  // v-wind
        52 => Some((0, 1, 1)),  // relative humidity
        61 => Some((0, 1, 8)),  // total precipitation
        2 => Some((0, 3, 0)),   // pressure (MSL)
        7 => Some((0, 3, 5)),   // geopotential height
        15 => Some((0, 0, 0)),  // maximum temperature (same parameter, stat-processed)
        16 => Some((0, 0, 0)),  // minimum temperature
        _ => None,
    }
}

/// `(discipline, category, number, center)` → `(table_version, parameter_code)`.
/// spec.md §4.F: default unmapped is `(3, 255)`. Center-specific overrides
/// are consulted only when `number` is in the local range 192..254.
pub fn parameter_reverse(discipline: u8, category: u8, number: u8, center: u16) -> (u8, u8) {
    if (192..=254).contains(&number) {
        if let Some(mapped) = local_parameter_override(discipline, category, number, center) {
            return mapped;
        }
    }
    match (discipline, category, number) {
        (0, 0, 0) => (2, 11),
        (0, 2, 2) => (2, 33),
        (0, 2, 3) => (2, 34),
        (0, 1, 1) => (2, 52),
        (0, 1, 8) => (2, 61),
        (0, 3, 0) => (2, 2),
        (0, 3, 5) => (2, 7),
        _ => (3, 255),
    }
}

fn local_parameter_override(_discipline: u8, _category: u8, number: u8, center: u16) -> Option<(u8, u8)> {
    match center {
        7 => Some((129, number)), // NCEP local table 129, pass-through code
        _ => None,
    }
}

/// Level-type codes spec.md §4.E lists as eligible for the GRIB1→GRIB2
/// level map, including aggregated layer codes, plus the supplemented
/// surface code `1` (see `level_forward_single`).
pub const FORWARD_LEVEL_TYPES: &[u8] = &[
    1, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115, 116, 117,
    119, 120, 125, 128, 141,
];

/// One-sided GRIB1 level type → GRIB2 `(lvl_type, scale_factor)`. Two-sided
/// (layer) codes are resolved by `level_forward_layer`.
///
/// spec.md §4.E's enumerated set `{100, 103, 105, 107, 109, 111, 113, 115,
/// 117, 119, 125, 128, 141}` omits GRIB1 level type `1` ("surface" / "ground
/// or water surface"), one of the most common single-surface codes in real
/// messages. Treated the same way as the GDS Polar Stereographic gap
/// (DESIGN.md): an enumeration gap in the distillation, not an intentional
/// exclusion, so it is supplemented here with its direct GRIB2 Table 4.5
/// equivalent (code 1, "ground or water surface", no scale).
pub fn level_forward_single(level_type: u8) -> Option<(u8, i8)> {
    match level_type {
        1 => Some((1, 0)),      // ground or water surface
        100 => Some((100, 0)),  // isobaric surface, Pa vs hPa -> scale handled by caller
        103 => Some((102, 0)),  // height above mean sea level
        105 => Some((103, 0)),  // height above ground
        107 => Some((104, 4)),  // sigma level, scale 10^-4
        109 => Some((105, 0)),  // hybrid level
        111 => Some((106, 2)),  // depth below land surface, cm -> scale 10^-2
        113 => Some((107, 0)),  // isentropic (theta) level
        115 => Some((108, 0)),  // pressure difference from ground
        125 => Some((103, 2)),  // height above ground, cm
        128 => Some((104, 3)),  // sigma layer
        141 => Some((108, 0)),  // pressure difference layer
        _ => None,
    }
}

/// Two-sided (layer) GRIB1 level type → GRIB2 `(lvl_type, scale_factor)`
/// shared by both surfaces of the layer.
pub fn level_forward_layer(level_type: u8) -> Option<(u8, i8)> {
    match level_type {
        101 => Some((100, -3)), // pressure layer, hPa pairs -> Pa via *100
        102 => Some((101, 0)),
        104 => Some((104, 4)),
        106 => Some((106, 2)),
        108 => Some((107, 0)),
        110 => Some((107, 0)),
        112 => Some((106, 2)),
        114 => Some((108, 0)),
        116 => Some((108, 0)),
        120 => Some((104, 4)),
        _ => None,
    }
}

/// GRIB2 `lvl1_type` → GRIB1 `level_type` for the single-surface case
/// (spec.md §4.F). `lvl1_type = 117` ("mixed layer depth") has no GRIB1
/// equivalent and must fail with `UnmappedLevel`.
pub fn level_reverse_single(lvl1_type: u8) -> Option<u8> {
    match lvl1_type {
        1 => Some(1),
        100 => Some(100),
        101 => Some(102),
        102 => Some(103),
        103 => Some(105),
        104 => Some(107),
        105 => Some(109),
        106 => Some(111),
        107 => Some(113),
        108 => Some(115),
        117 => None,
        _ => None,
    }
}

/// GRIB2 `lvl1_type` → GRIB1 `level_type` for the two-surface (layer)
/// case.
pub fn level_reverse_layer(lvl1_type: u8) -> Option<u8> {
    match lvl1_type {
        100 => Some(101),
        101 => Some(102),
        104 => Some(104),
        106 => Some(106),
        107 => Some(108),
        108 => Some(114),
        _ => None,
    }
}

/// Time-range indicator codes spec.md §4.E routes to PDS template 0
/// (point-in-time, no statistical processing).
pub const POINT_IN_TIME_RANGES: &[u8] = &[0, 1, 10];

/// Time-range indicator codes spec.md §4.E routes to PDS template 8
/// (single statistical range).
pub const STATISTICAL_TIME_RANGES: &[u8] = &[2, 3, 4];

/// `t_range` + `parameter_code` → GRIB2 statistical process code
/// (spec.md §4.E).
pub fn statistical_process_forward(t_range: u8, parameter_code: u8) -> Option<u8> {
    match (t_range, parameter_code) {
        (4, _) => Some(1), // accumulation
        (_, 15) => Some(2), // maximum
        (_, 16) => Some(3), // minimum
        (2 | 3, _) => None, // average/difference without a recognized parameter hint
        _ => None,
    }
}

/// GRIB2 statistical process code → GRIB1 `t_range` (spec.md §4.F,
/// `num_ranges == 1` case): `0⇒3, 1⇒4, 4⇒5, 2|3⇒2`.
pub fn statistical_process_reverse(process_code: u8) -> Option<u8> {
    match process_code {
        0 => Some(3),
        1 => Some(4),
        4 => Some(5),
        2 | 3 => Some(2),
        _ => None,
    }
}

/// NCEP CFSR monthly override (spec.md §4.F, `num_ranges == 2`, center 7):
/// process-code pair → GRIB1 `t_range` in `113..140`.
pub fn ncep_cfsr_monthly_t_range(first_process: u8, second_process: u8) -> Option<u8> {
    match (first_process, second_process) {
        (193, 194) => Some(113),
        (195, 196) => Some(114),
        (197, 198) => Some(115),
        (199, 200) => Some(116),
        (201, 202) => Some(117),
        (203, 204) => Some(123),
        (205, 206) => Some(124),
        (207, _) => Some(140),
        _ => None,
    }
}
