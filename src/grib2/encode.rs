//! GRIB2 section writer (SPEC_FULL.md component H), the inverse of
//! `grib2::decode`. Emits GDS/PDS/DRS/BMS sections only when a grid's
//! metadata differs from the previously emitted snapshot, mirroring
//! spec.md §6.2's "most recent instance of each section applies" rule.

use crate::bitio::{pack, pack_signed};
use crate::error::GribError;
use crate::grib2::message::*;

fn push_signed32(buf: &mut Vec<u8>, value: f64, scale: f64) {
    let mut b = [0u8; 4];
    pack_signed(&mut b, (value / scale).round() as i32, 0, 32);
    buf.extend_from_slice(&b);
}

/// Serializes `msg` into a complete GRIB2 wire message, including the
/// 16-byte IS and the `"7777"` end marker.
pub fn encode(msg: &GRIB2Message) -> Result<Vec<u8>, GribError> {
    let mut out = Vec::new();
    out.extend_from_slice(b"GRIB");
    out.extend_from_slice(&[0, 0]);
    out.push(msg.discipline);
    out.push(2);
    let total_length_pos = out.len();
    out.extend_from_slice(&[0u8; 8]);

    write_ids(&mut out, &msg.identification);

    let mut prev_metadata: Option<&CommonMetadata> = None;
    for grid in &msg.grids {
        let md = &grid.metadata;
        let gds_changed = prev_metadata.map(|p| p.gds != md.gds).unwrap_or(true);
        let pds_changed = prev_metadata.map(|p| p.pds != md.pds).unwrap_or(true);
        let drs_changed = prev_metadata.map(|p| p.drs != md.drs).unwrap_or(true);
        let bms_changed = prev_metadata.map(|p| p.bitmap != md.bitmap).unwrap_or(true);

        if gds_changed {
            write_gds(&mut out, &md.gds);
        }
        if pds_changed {
            write_pds(&mut out, &md.pds);
        }
        if drs_changed {
            write_drs(&mut out, &md.drs);
        }
        if bms_changed {
            write_bms(&mut out, md.bitmap.as_deref());
        }
        write_ds(&mut out, &md.drs, md.bitmap.as_deref(), &grid.gridpoints)?;

        prev_metadata = Some(md);
    }

    out.extend_from_slice(b"7777");

    let total_length = out.len() as u64;
    out[total_length_pos..total_length_pos + 8].copy_from_slice(&total_length.to_be_bytes());

    Ok(out)
}

fn patch_len(out: &mut Vec<u8>, start: usize) {
    let len = (out.len() - start) as u32;
    out[start..start + 4].copy_from_slice(&len.to_be_bytes());
}

fn write_ids(out: &mut Vec<u8>, id: &Identification) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]);
    out.push(1);
    out.extend_from_slice(&id.center.to_be_bytes());
    out.extend_from_slice(&id.subcenter.to_be_bytes());
    out.push(id.master_table_version);
    out.push(id.local_table_version);
    out.push(id.ref_time_significance);
    out.extend_from_slice(&(id.reference_time.year as u16).to_be_bytes());
    out.push(id.reference_time.month as u8);
    out.push(id.reference_time.day as u8);
    out.push(id.reference_time.hour as u8);
    out.push(id.reference_time.minute as u8);
    out.push(id.reference_time.second as u8);
    out.push(id.production_status);
    out.push(id.data_type);
    patch_len(out, start);
}

fn write_gds(out: &mut Vec<u8>, gds: &GridDefinition) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]);
    out.push(3);
    out.extend_from_slice(&gds.template_num().to_be_bytes());
    out.extend_from_slice(&gds.nx().to_be_bytes());
    out.extend_from_slice(&gds.ny().to_be_bytes());

    match gds {
        GridDefinition::LatLon(g) => {
            push_signed32(out, g.slat, 1e-6);
            push_signed32(out, g.slon, 1e-6);
            out.push(g.rescomp);
            push_signed32(out, g.elat, 1e-6);
            push_signed32(out, g.elon, 1e-6);
            push_signed32(out, g.loinc, 1e-6);
            push_signed32(out, g.lainc, 1e-6);
            out.push(g.scan_mode);
        }
        GridDefinition::Mercator(g) => {
            push_signed32(out, g.slat, 1e-6);
            push_signed32(out, g.slon, 1e-6);
            out.push(g.rescomp);
            push_signed32(out, g.elat, 1e-6);
            push_signed32(out, g.elon, 1e-6);
            push_signed32(out, g.std_lat1, 1e-6);
            push_signed32(out, g.dxinc, 1e-3);
            out.push(g.scan_mode);
            push_signed32(out, g.dyinc, 1e-3);
        }
        GridDefinition::PolarStereographic(g) => {
            push_signed32(out, g.slat, 1e-6);
            push_signed32(out, g.slon, 1e-6);
            out.push(g.rescomp);
            push_signed32(out, g.olon, 1e-6);
            push_signed32(out, g.dxinc, 1e-3);
            out.push(g.proj_flag);
            push_signed32(out, g.dyinc, 1e-3);
            out.push(g.scan_mode);
        }
        GridDefinition::Lambert(g) => {
            push_signed32(out, g.slat, 1e-6);
            push_signed32(out, g.slon, 1e-6);
            out.push(g.rescomp);
            push_signed32(out, g.olon, 1e-6);
            push_signed32(out, g.dxinc, 1e-3);
            out.push(g.proj_flag);
            push_signed32(out, g.dyinc, 1e-3);
            out.push(g.scan_mode);
            push_signed32(out, g.std_lat1, 1e-6);
            push_signed32(out, g.std_lat2, 1e-6);
        }
        GridDefinition::Gaussian(g) => {
            push_signed32(out, g.slat, 1e-6);
            push_signed32(out, g.slon, 1e-6);
            out.push(g.rescomp);
            push_signed32(out, g.elat, 1e-6);
            push_signed32(out, g.elon, 1e-6);
            push_signed32(out, g.loinc, 1e-6);
            out.extend_from_slice(&g.n_parallels.to_be_bytes());
            out.push(g.scan_mode);
        }
    }
    patch_len(out, start);
}

fn write_pds(out: &mut Vec<u8>, pds: &ProductDefinition) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]);
    out.push(4);
    out.extend_from_slice(&pds.template_num().to_be_bytes());

    let base = pds.base();
    out.push(base.param_category);
    out.push(base.param_number);
    out.push(base.generating_process);
    out.push(base.time_unit);
    out.extend_from_slice(&base.forecast_time.to_be_bytes());
    out.push(base.level1_type);
    let mut level1_scale_byte = [0u8; 1];
    pack_signed(&mut level1_scale_byte, i32::from(base.level1_scale), 0, 8);
    out.push(level1_scale_byte[0]);
    out.extend_from_slice(&base.level1_value.to_be_bytes());
    out.push(base.level2_type);
    let mut level2_scale_byte = [0u8; 1];
    pack_signed(&mut level2_scale_byte, i32::from(base.level2_scale), 0, 8);
    out.push(level2_scale_byte[0]);
    out.extend_from_slice(&base.level2_value.to_be_bytes());

    match pds {
        ProductDefinition::Analysis(_) => {}
        ProductDefinition::Ensemble(_, e) => write_ensemble_fields(out, e),
        ProductDefinition::Derived(_, d) => write_derived_fields(out, d),
        ProductDefinition::Statistical(_, s) => write_statistical_fields(out, s),
        ProductDefinition::EnsembleStatistical(_, e, s) => {
            write_ensemble_fields(out, e);
            write_statistical_fields(out, s);
        }
        ProductDefinition::DerivedStatistical(_, d, s) => {
            write_derived_fields(out, d);
            write_statistical_fields(out, s);
        }
        ProductDefinition::SpatialProcessing(_, sp) => {
            out.push(sp.stat_proc);
            out.push(sp.spatial_type);
            out.extend_from_slice(&sp.num_points.to_be_bytes());
        }
    }
    patch_len(out, start);
}

fn write_ensemble_fields(out: &mut Vec<u8>, e: &EnsembleFields) {
    out.push(e.ensemble_type);
    out.push(e.perturbation_number);
    out.push(e.ensemble_size);
}

fn write_derived_fields(out: &mut Vec<u8>, d: &DerivedFields) {
    out.push(d.derived_code);
    out.push(d.ensemble_size);
}

fn write_statistical_fields(out: &mut Vec<u8>, s: &StatisticalFields) {
    out.extend_from_slice(&(s.end_time.year as u16).to_be_bytes());
    out.push(s.end_time.month as u8);
    out.push(s.end_time.day as u8);
    out.push(s.end_time.hour as u8);
    out.push(s.end_time.minute as u8);
    out.push(s.end_time.second as u8);
    out.push(s.ranges.len() as u8);
    out.extend_from_slice(&s.n_missing.to_be_bytes());
    for r in &s.ranges {
        out.push(r.process_code);
        out.push(r.incr_type);
        out.push(r.time_unit);
        out.extend_from_slice(&r.time_length.to_be_bytes());
        out.push(r.incr_unit);
        out.extend_from_slice(&r.incr_length.to_be_bytes());
    }
}

fn write_drs(out: &mut Vec<u8>, drs: &ReprDefinition) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]);
    out.push(5);
    out.extend_from_slice(&drs.template_num().to_be_bytes());

    let base = drs.base();
    out.extend_from_slice(&base.num_packed.to_be_bytes());
    out.extend_from_slice(&base.reference_value.to_bits().to_be_bytes());
    let mut scale_bytes = [0u8; 2];
    pack_signed(&mut scale_bytes, i32::from(base.binary_scale), 0, 16);
    out.extend_from_slice(&scale_bytes);
    pack_signed(&mut scale_bytes, i32::from(base.decimal_scale), 0, 16);
    out.extend_from_slice(&scale_bytes);
    out.push(base.pack_width);
    out.push(base.orig_val_type);

    if let ReprDefinition::Complex(_, c) = drs {
        out.push(c.group_splitting_method);
        out.push(c.missing_value_mgmt);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&c.num_groups.to_be_bytes());
        out.push(c.group_width_ref);
        out.push(c.group_width_pack_width);
        out.extend_from_slice(&c.group_length_ref.to_be_bytes());
        out.push(c.group_length_incr);
        out.extend_from_slice(&c.group_length_last.to_be_bytes());
        out.push(c.group_length_pack_width);
        out.push(c.spatial_diff_order);
        out.push(c.spatial_diff_extra_width);
    }
    patch_len(out, start);
}

fn write_bms(out: &mut Vec<u8>, bitmap: Option<&[u8]>) {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]);
    out.push(6);
    match bitmap {
        Some(bits) => {
            out.push(0);
            out.extend_from_slice(bits);
        }
        None => out.push(255),
    }
    patch_len(out, start);
}

/// Writes section 7 for simple packing (spec.md §4.E: "the encoder
/// always emits a Bitmap Section; the Data Representation Section is
/// template 0"). Complex/JPEG 2000 encode paths are not exercised by this
/// codec's translators, which always target DRS template 0.
fn write_ds(
    out: &mut Vec<u8>,
    drs: &ReprDefinition,
    bitmap: Option<&[u8]>,
    gridpoints: &[f64],
) -> Result<(), GribError> {
    let start = out.len();
    out.extend_from_slice(&[0u8; 4]);
    out.push(7);

    let base = match drs {
        ReprDefinition::Simple(b) => b,
        _ => return Err(GribError::UnsupportedPacking("GRIB2 encoder only emits simple packing")),
    };

    if base.pack_width > 0 {
        let positions: Vec<usize> = match bitmap {
            Some(mask) => (0..gridpoints.len())
                .filter(|&i| (mask[i / 8] >> (7 - (i % 8))) & 1 == 1)
                .collect(),
            None => (0..gridpoints.len()).collect(),
        };
        let n_bits = positions.len() * usize::from(base.pack_width);
        let mut payload = vec![0u8; n_bits.div_ceil(8)];
        let bin_factor = 2f64.powi(-i32::from(base.binary_scale));
        let dig_factor = 10f64.powi(i32::from(base.decimal_scale));
        for (i, &pos) in positions.iter().enumerate() {
            let raw = ((gridpoints[pos] * dig_factor) - f64::from(base.reference_value)) * bin_factor;
            let raw = raw
                .round()
                .clamp(0.0, (1u64 << base.pack_width) as f64 - 1.0) as u32;
            pack(&mut payload, raw, i * usize::from(base.pack_width), u32::from(base.pack_width));
        }
        out.extend_from_slice(&payload);
    }

    patch_len(out, start);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grib2::decode::decode;
    use crate::time::UtcDateTime;

    fn sample_message() -> GRIB2Message {
        let gds = GridDefinition::LatLon(LatLonGrid {
            nx: 4,
            ny: 2,
            slat: 90.0,
            slon: 0.0,
            rescomp: 0,
            elat: -90.0,
            elon: 357.5,
            loinc: 2.5,
            lainc: 2.5,
            scan_mode: 0,
        });
        let pds = ProductDefinition::Analysis(BaseProductFields {
            param_category: 0,
            param_number: 0,
            generating_process: 2,
            time_unit: 1,
            forecast_time: 0,
            level1_type: 100,
            level1_scale: 0,
            level1_value: 0,
            level2_type: 255,
            level2_scale: 0,
            level2_value: 0,
        });
        let drs = ReprDefinition::Simple(DrsBase {
            num_packed: 8,
            reference_value: 280.0,
            binary_scale: 0,
            decimal_scale: 1,
            pack_width: 8,
            orig_val_type: 0,
        });
        GRIB2Message {
            discipline: 0,
            edition: 2,
            total_length: 0,
            identification: Identification {
                center: 7,
                subcenter: 0,
                master_table_version: 2,
                local_table_version: 1,
                ref_time_significance: 0,
                reference_time: UtcDateTime::new(2023, 1, 1, 0, 0, 0),
                production_status: 0,
                data_type: 0,
            },
            grids: vec![GRIB2Grid {
                metadata: CommonMetadata {
                    gds,
                    pds,
                    drs,
                    bitmap: None,
                },
                gridpoints: vec![280.0, 281.0, 282.0, 283.0, 284.0, 285.0, 286.0, 287.0],
            }],
        }
    }

    #[test]
    fn encode_decode_round_trip_preserves_grid_and_values() {
        let msg = sample_message();
        let wire = encode(&msg).unwrap();
        let decoded = decode(&wire).unwrap();

        assert_eq!(decoded.grids.len(), 1);
        let grid = &decoded.grids[0];
        assert_eq!(grid.metadata.gds.nx(), 4);
        assert_eq!(grid.metadata.gds.ny(), 2);
        for (a, b) in grid.gridpoints.iter().zip(msg.grids[0].gridpoints.iter()) {
            assert!((a - b).abs() < 0.05, "{a} vs {b}");
        }
    }
}
