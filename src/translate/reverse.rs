//! GRIB2→GRIB1 translator, the decode-then-encode path (spec.md §4.F).

use crate::error::GribError;
use crate::grib1::message::*;
use crate::grib2::message::*;
use crate::time::{TimeUnit, UtcDateTime};
use crate::translate::tables;

/// Translates one grid of a decoded GRIB2 message into an equivalent
/// GRIB1 message. GRIB2 messages may carry several grids; the caller
/// selects which one to translate (spec.md §6.3's driver emits one GRIB1
/// message per GRIB2 grid).
pub fn grib2_to_grib1(msg: &GRIB2Message, grid: &GRIB2Grid) -> Result<GRIB1Message, GribError> {
    let md = &grid.metadata;
    let base = md.pds.base();

    let (table_version, parameter_code) = tables::parameter_reverse(
        msg.discipline,
        base.param_category,
        base.param_number,
        msg.identification.center,
    );

    let (level_type, level1, level2) = translate_level(base)?;

    let (time_range, p1, p2, n_avg) = translate_time_range(&md.pds, msg.identification.center)?;

    let forecast_units = TimeUnit::from_grib2_table_4_4(base.time_unit)
        .map(TimeUnit::to_grib1_code)
        .unwrap_or(base.time_unit);

    let (nx, ny) = (md.gds.nx(), md.gds.ny());

    let mut pds_extension = Vec::new();
    if has_ensemble_or_spatial_metadata(&md.pds) {
        pds_extension.extend_from_slice(&[0, 0, 0]);
    }

    let drs = md.drs.base();

    Ok(GRIB1Message {
        edition: 1,
        table_version,
        centre_id: u8::try_from(msg.identification.center).unwrap_or(255),
        subcentre_id: u8::try_from(msg.identification.subcenter).unwrap_or(0),
        generating_process: base.generating_process,
        parameter_code,
        level_type,
        level1,
        level2,
        reference_time: msg.identification.reference_time,
        forecast_units,
        p1,
        p2,
        time_range,
        n_avg,
        n_missing: 0,
        pds_extension,
        grid: translate_grid(&md.gds, u16::try_from(nx).unwrap_or(u16::MAX), u16::try_from(ny).unwrap_or(u16::MAX))?,
        bitmap: md.bitmap.clone(),
        binary_scale: drs.binary_scale,
        decimal_scale: drs.decimal_scale,
        reference_value: drs.reference_value,
        pack_width: drs.pack_width,
        gridpoints: grid.gridpoints.clone(),
        warnings: Vec::new(),
    })
}

fn has_ensemble_or_spatial_metadata(pds: &ProductDefinition) -> bool {
    matches!(
        pds,
        ProductDefinition::Ensemble(..)
            | ProductDefinition::EnsembleStatistical(..)
            | ProductDefinition::SpatialProcessing(..)
    )
}

fn translate_level(base: &BaseProductFields) -> Result<(u8, u16, u8), GribError> {
    if base.level2_type == 255 {
        let level_type =
            tables::level_reverse_single(base.level1_type).ok_or(GribError::UnmappedLevel)?;
        let value = scale_level_value(base.level1_type, base.level1_value, false);
        Ok((level_type, value, 0))
    } else {
        let level_type =
            tables::level_reverse_layer(base.level1_type).ok_or(GribError::UnmappedLevel)?;
        let v1 = scale_level_value(base.level1_type, base.level1_value, true);
        let v2 = scale_level_value(base.level2_type, base.level2_value, true);
        if GRIB1Message::uses_wide_level(level_type) {
            Ok((level_type, v1, 0))
        } else {
            Ok((level_type, v1, u8::try_from(v2).unwrap_or(255)))
        }
    }
}

/// `lvl1_type=100` stores pascals in GRIB2 but hPa in GRIB1: divide by
/// 100 for a single level, by 1000 for a two-surface layer (spec.md
/// §4.F).
fn scale_level_value(lvl_type: u8, value: u32, is_layer: bool) -> u16 {
    if lvl_type == 100 {
        let divisor = if is_layer { 1000 } else { 100 };
        u16::try_from(value / divisor).unwrap_or(u16::MAX)
    } else {
        u16::try_from(value).unwrap_or(u16::MAX)
    }
}

fn translate_time_range(pds: &ProductDefinition, center: u16) -> Result<(u8, u32, u32, u16), GribError> {
    let base = pds.base();
    match pds {
        ProductDefinition::Analysis(_)
        | ProductDefinition::Ensemble(..)
        | ProductDefinition::Derived(..)
        | ProductDefinition::SpatialProcessing(..) => {
            let t_range = if base.time_unit == 0 { 10 } else { 0 };
            Ok((t_range, base.forecast_time, 0, 0))
        }
        ProductDefinition::Statistical(_, stats)
        | ProductDefinition::EnsembleStatistical(_, _, stats)
        | ProductDefinition::DerivedStatistical(_, _, stats) => {
            if stats.ranges.len() == 1 {
                let t_range = tables::statistical_process_reverse(stats.ranges[0].process_code)
                    .ok_or(GribError::UnmappedProcess)?;
                let p2 = time_span_in_units(base.forecast_time, &stats.ranges[0]);
                Ok((t_range, base.forecast_time, p2, 0))
            } else if stats.ranges.len() == 2 && center == 7 {
                let t_range = tables::ncep_cfsr_monthly_t_range(
                    stats.ranges[0].process_code,
                    stats.ranges[1].process_code,
                )
                .ok_or(GribError::UnmappedProcess)?;
                Ok((t_range, base.forecast_time, 0, 0))
            } else {
                Err(GribError::UnmappedProcess)
            }
        }
    }
}

fn time_span_in_units(forecast_time: u32, range: &crate::grib2::message::StatisticalRange) -> u32 {
    forecast_time.saturating_add(range.time_length)
}

fn translate_grid(gds: &GridDefinition, nx: u16, ny: u16) -> Result<GRIB1Grid, GribError> {
    Ok(match gds {
        GridDefinition::LatLon(g) => GRIB1Grid::LatLon(LatLonParams {
            nx,
            ny,
            slat: g.slat,
            slon: g.slon,
            rescomp: g.rescomp,
            elat: g.elat,
            elon: g.elon,
            loinc: g.loinc,
            lainc: g.lainc,
            scan_mode: g.scan_mode,
        }),
        GridDefinition::Gaussian(g) => GRIB1Grid::Gaussian(GaussianParams {
            nx,
            ny,
            slat: g.slat,
            slon: g.slon,
            rescomp: g.rescomp,
            elat: g.elat,
            elon: g.elon,
            loinc: g.loinc,
            n_parallels: u16::try_from(g.n_parallels).unwrap_or(u16::MAX),
            scan_mode: g.scan_mode,
        }),
        GridDefinition::Mercator(g) => GRIB1Grid::Mercator(MercatorParams {
            nx,
            ny,
            slat: g.slat,
            slon: g.slon,
            rescomp: g.rescomp,
            elat: g.elat,
            elon: g.elon,
            std_lat1: g.std_lat1,
            xlen: g.dxinc,
            ylen: g.dyinc,
            scan_mode: g.scan_mode,
        }),
        GridDefinition::Lambert(g) => GRIB1Grid::Lambert(LambertParams {
            nx,
            ny,
            slat: g.slat,
            slon: g.slon,
            rescomp: g.rescomp,
            olon: g.olon,
            xlen: g.dxinc,
            ylen: g.dyinc,
            proj_flag: g.proj_flag,
            std_lat1: g.std_lat1,
            std_lat2: g.std_lat2,
            scan_mode: g.scan_mode,
        }),
        GridDefinition::PolarStereographic(g) => GRIB1Grid::PolarStereographic(PolarStereoParams {
            nx,
            ny,
            slat: g.slat,
            slon: g.slon,
            rescomp: g.rescomp,
            olon: g.olon,
            xlen: g.dxinc,
            ylen: g.dyinc,
            proj_flag: g.proj_flag,
            scan_mode: g.scan_mode,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::UtcDateTime;

    fn lambert_message() -> (GRIB2Message, GRIB2Grid) {
        let gds = GridDefinition::Lambert(LambertGrid {
            nx: 614,
            ny: 428,
            slat: 12.190,
            slon: 226.541,
            rescomp: 0x30,
            olon: 265.0,
            dxinc: 12191.0,
            dyinc: 12191.0,
            proj_flag: 0,
            scan_mode: 0b0100_0000,
            std_lat1: 25.0,
            std_lat2: 25.0,
        });
        let pds = ProductDefinition::Analysis(BaseProductFields {
            param_category: 0,
            param_number: 0,
            generating_process: 2,
            time_unit: 1,
            forecast_time: 0,
            level1_type: 100,
            level1_scale: 0,
            level1_value: 100_000,
            level2_type: 255,
            level2_scale: 0,
            level2_value: 0,
        });
        let drs = ReprDefinition::Simple(DrsBase {
            num_packed: 614 * 428,
            reference_value: 280.0,
            binary_scale: 0,
            decimal_scale: 1,
            pack_width: 12,
            orig_val_type: 0,
        });
        let msg = GRIB2Message {
            discipline: 0,
            edition: 2,
            total_length: 0,
            identification: Identification {
                center: 7,
                subcenter: 0,
                master_table_version: 2,
                local_table_version: 0,
                ref_time_significance: 0,
                reference_time: UtcDateTime::new(2023, 1, 1, 0, 0, 0),
                production_status: 0,
                data_type: 0,
            },
            grids: Vec::new(),
        };
        let grid = GRIB2Grid {
            metadata: CommonMetadata {
                gds,
                pds,
                drs,
                bitmap: None,
            },
            gridpoints: vec![280.0; 614 * 428],
        };
        (msg, grid)
    }

    #[test]
    fn lambert_grid_translates_with_derived_resolution_flag() {
        let (msg, grid) = lambert_message();
        let out = grib2_to_grib1(&msg, &grid).unwrap();
        assert_eq!(out.grid.nx(), 614);
        assert_eq!(out.grid.ny(), 428);
        assert_eq!(out.level_type, 100);
    }
}
