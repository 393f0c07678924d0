//! GRIB1→GRIB2 translator, the encode path (spec.md §4.E).

use crate::error::GribError;
use crate::grib1::message::GRIB1Message;
use crate::grib2::message::*;
use crate::time::{add_duration, TimeUnit};
use crate::translate::tables;

/// Translates a decoded GRIB1 message into an equivalent single-grid
/// GRIB2 message.
pub fn grib1_to_grib2(msg: &GRIB1Message) -> Result<GRIB2Message, GribError> {
    let (discipline, param_category, param_number) =
        tables::parameter_forward(msg.table_version, u16::from(msg.centre_id), msg.parameter_code)
            .unwrap_or((255, 255, 255));

    let (level1_type, level1_scale, level1_value, level2_type, level2_scale, level2_value) =
        translate_level(msg.level_type, msg.level1, msg.level2)?;

    let time_unit = match msg.forecast_units {
        0 => 0u8, // minutes
        1 => 1u8, // hours
        2 => 2u8, // days
        n => n,
    };

    let base = BaseProductFields {
        param_category,
        param_number,
        generating_process: msg.generating_process,
        time_unit,
        forecast_time: msg.p1,
        level1_type,
        level1_scale,
        level1_value,
        level2_type,
        level2_scale,
        level2_value,
    };

    let pds = if tables::POINT_IN_TIME_RANGES.contains(&msg.time_range) {
        ProductDefinition::Analysis(base)
    } else if tables::STATISTICAL_TIME_RANGES.contains(&msg.time_range) {
        let process_code = tables::statistical_process_forward(msg.time_range, msg.parameter_code)
            .ok_or(GribError::UnmappedProcess)?;

        let fcst_time_unit = match msg.forecast_units {
            0 => TimeUnit::Minute,
            1 => TimeUnit::Hour,
            _ => TimeUnit::Day,
        };
        let end_time = add_duration(msg.reference_time, i64::from(msg.p2), fcst_time_unit)?;

        ProductDefinition::Statistical(
            base,
            StatisticalFields {
                end_time,
                n_missing: u32::from(msg.n_missing),
                ranges: vec![StatisticalRange {
                    process_code,
                    incr_type: 0,
                    time_unit,
                    time_length: msg.p2.saturating_sub(msg.p1),
                    incr_unit: time_unit,
                    incr_length: 0,
                }],
            },
        )
    } else {
        ProductDefinition::Analysis(base)
    };

    let gds = translate_grid(msg)?;

    let drs = ReprDefinition::Simple(DrsBase {
        num_packed: u32::from(msg.grid.nx()) * u32::from(msg.grid.ny()),
        reference_value: msg.reference_value,
        binary_scale: msg.binary_scale,
        decimal_scale: msg.decimal_scale,
        pack_width: msg.pack_width,
        orig_val_type: 0,
    });

    let identification = Identification {
        center: u16::from(msg.centre_id),
        subcenter: u16::from(msg.subcentre_id),
        master_table_version: msg.table_version,
        local_table_version: 0,
        ref_time_significance: 0,
        reference_time: msg.reference_time,
        production_status: 0,
        data_type: 0,
    };

    Ok(GRIB2Message {
        discipline,
        edition: 2,
        total_length: 0,
        identification,
        grids: vec![GRIB2Grid {
            metadata: CommonMetadata {
                gds,
                pds,
                drs,
                bitmap: msg.bitmap.clone(),
            },
            gridpoints: msg.gridpoints.clone(),
        }],
    })
}

fn translate_level(
    level_type: u8,
    level1: u16,
    level2: u8,
) -> Result<(u8, i8, u32, u8, i8, u32), GribError> {
    if let Some((lvl_type, scale)) = tables::level_forward_layer(level_type) {
        let v1 = scale_level_to_pascals(lvl_type, u32::from(level1), true);
        let v2 = scale_level_to_pascals(lvl_type, u32::from(level2), true);
        return Ok((lvl_type, scale, v1, lvl_type, scale, v2));
    }
    if let Some((lvl_type, scale)) = tables::level_forward_single(level_type) {
        let v1 = scale_level_to_pascals(lvl_type, u32::from(level1), false);
        return Ok((lvl_type, scale, v1, 255, 0, 0));
    }
    Err(GribError::UnmappedLevel)
}

/// `lvl_type=100` ("isobaric surface") stores hPa in GRIB1 but pascals
/// in GRIB2: multiply by 100 for a single level, by 1000 for a
/// two-surface layer, the exact inverse of
/// `reverse::scale_level_value`'s divisor so the round trip is lossless.
fn scale_level_to_pascals(lvl_type: u8, value: u32, is_layer: bool) -> u32 {
    if lvl_type == 100 {
        value * if is_layer { 1000 } else { 100 }
    } else {
        value
    }
}

fn translate_grid(msg: &GRIB1Message) -> Result<GridDefinition, GribError> {
    use crate::grib1::message::GRIB1Grid;

    Ok(match &msg.grid {
        GRIB1Grid::LatLon(p) | GRIB1Grid::RotatedLatLon(p) => GridDefinition::LatLon(LatLonGrid {
            nx: u32::from(p.nx),
            ny: u32::from(p.ny),
            slat: p.slat,
            slon: p.slon,
            rescomp: derive_rescomp(p.rescomp),
            elat: p.elat,
            elon: p.elon,
            loinc: p.loinc,
            lainc: p.lainc,
            scan_mode: p.scan_mode,
        }),
        GRIB1Grid::Gaussian(p) => GridDefinition::Gaussian(GaussianGrid {
            nx: u32::from(p.nx),
            ny: u32::from(p.ny),
            slat: p.slat,
            slon: p.slon,
            rescomp: derive_rescomp(p.rescomp),
            elat: p.elat,
            elon: p.elon,
            loinc: p.loinc,
            n_parallels: u32::from(p.n_parallels),
            scan_mode: p.scan_mode,
        }),
        GRIB1Grid::Mercator(p) => GridDefinition::Mercator(MercatorGrid {
            nx: u32::from(p.nx),
            ny: u32::from(p.ny),
            slat: p.slat,
            slon: p.slon,
            rescomp: derive_rescomp(p.rescomp),
            elat: p.elat,
            elon: p.elon,
            std_lat1: p.std_lat1,
            dxinc: p.xlen,
            dyinc: p.ylen,
            scan_mode: p.scan_mode,
        }),
        GRIB1Grid::Lambert(p) => GridDefinition::Lambert(LambertGrid {
            nx: u32::from(p.nx),
            ny: u32::from(p.ny),
            slat: p.slat,
            slon: p.slon,
            rescomp: derive_rescomp(p.rescomp),
            olon: p.olon,
            dxinc: p.xlen,
            dyinc: p.ylen,
            proj_flag: p.proj_flag,
            scan_mode: p.scan_mode,
            std_lat1: p.std_lat1,
            std_lat2: p.std_lat2,
        }),
        GRIB1Grid::PolarStereographic(p) => GridDefinition::PolarStereographic(PolarStereoGrid {
            nx: u32::from(p.nx),
            ny: u32::from(p.ny),
            slat: p.slat,
            slon: p.slon,
            rescomp: derive_rescomp(p.rescomp),
            olon: p.olon,
            dxinc: p.xlen,
            dyinc: p.ylen,
            proj_flag: p.proj_flag,
            scan_mode: p.scan_mode,
        }),
    })
}

/// spec.md §8 scenario 2: resolution-component flag derived as
/// `(rescomp & 0x20) ? 0x80 : 0 | (earth_shape == 2 ? 0x40 : 0) | (rescomp & 0x8)`.
/// This codec has no separate `earth_shape` field (GRIB1 has none), so
/// that term is always 0.
fn derive_rescomp(rescomp: u8) -> u8 {
    (if rescomp & 0x20 != 0 { 0x80 } else { 0 }) | (rescomp & 0x8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grib1::message::{GRIB1Grid, LatLonParams};
    use crate::time::UtcDateTime;

    fn base_message() -> GRIB1Message {
        GRIB1Message {
            edition: 1,
            table_version: 2,
            centre_id: 7,
            subcentre_id: 0,
            generating_process: 0,
            parameter_code: 61,
            level_type: 1,
            level1: 0,
            level2: 0,
            reference_time: UtcDateTime::new(2023, 1, 31, 18, 0, 0),
            forecast_units: 1,
            p1: 0,
            p2: 6,
            time_range: 4,
            n_avg: 0,
            n_missing: 0,
            pds_extension: Vec::new(),
            grid: GRIB1Grid::LatLon(LatLonParams {
                nx: 2,
                ny: 2,
                slat: 90.0,
                slon: 0.0,
                rescomp: 0,
                elat: -90.0,
                elon: 1.0,
                loinc: 1.0,
                lainc: 1.0,
                scan_mode: 0,
            }),
            bitmap: None,
            binary_scale: 0,
            decimal_scale: 1,
            reference_value: 10.0,
            pack_width: 8,
            gridpoints: vec![10.0, 11.0, 12.0, 13.0],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn accumulation_time_range_produces_statistical_pds_with_month_rollover() {
        let msg = base_message();
        let out = grib1_to_grib2(&msg).unwrap();
        let pds = &out.grids[0].metadata.pds;
        let stats = pds.statistical().expect("expected statistical PDS");
        assert_eq!(stats.ranges[0].process_code, 1);
        assert_eq!(stats.end_time, UtcDateTime::new(2023, 2, 1, 0, 0, 0));
    }
}
