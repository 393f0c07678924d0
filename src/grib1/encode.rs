//! GRIB1 section writers (spec.md §4.G), the inverse of `grib1::decode`.
//!
//! Grounded on the same section-function idiom as the decoder; each
//! `write_sectN` appends its octets (with a length prefix patched after
//! the fact) to the caller's scratch buffer.

use crate::bitio::{pack, pack_signed};
use crate::error::GribError;
use crate::grib1::message::*;
use crate::ibmfloat::ieee_to_ibm;

fn push_u24(buf: &mut Vec<u8>, value: usize) {
    buf.push((value >> 16) as u8);
    buf.push((value >> 8) as u8);
    buf.push(value as u8);
}

fn push_signed_3(buf: &mut Vec<u8>, value: f64, scale: f64) {
    let mut bytes = [0u8; 3];
    let scaled = (value / scale).round() as i32;
    pack_signed(&mut bytes, scaled, 0, 24);
    buf.extend_from_slice(&bytes);
}

fn push_unsigned_3(buf: &mut Vec<u8>, value: f64, scale: f64) {
    let mut bytes = [0u8; 3];
    let scaled = (value / scale).round() as u32;
    pack(&mut bytes, scaled, 0, 24);
    buf.extend_from_slice(&bytes);
}

/// Serializes `msg` into a complete GRIB1 wire message, including the
/// `"GRIB"` indicator and the `"7777"` end marker.
pub fn encode(msg: &GRIB1Message) -> Result<Vec<u8>, GribError> {
    let mut out = Vec::new();
    out.extend_from_slice(b"GRIB");
    let total_length_pos = out.len();
    out.extend_from_slice(&[0, 0, 0]);
    out.push(1);

    write_pds(&mut out, msg);
    write_gds(&mut out, msg);
    if let Some(bitmap) = &msg.bitmap {
        write_bms(&mut out, bitmap, msg.grid.nx() as usize * msg.grid.ny() as usize);
    }
    write_bds(&mut out, msg)?;

    out.extend_from_slice(b"7777");

    let total_length = out.len() - 8;
    let patch = &mut out[total_length_pos..total_length_pos + 3];
    patch.copy_from_slice(&[
        (total_length >> 16) as u8,
        (total_length >> 8) as u8,
        total_length as u8,
    ]);

    Ok(out)
}

fn write_pds(out: &mut Vec<u8>, msg: &GRIB1Message) {
    let pds_start = out.len();
    out.extend_from_slice(&[0, 0, 0]); // length, patched below
    out.push(msg.table_version);
    out.push(msg.centre_id);
    out.push(msg.generating_process);
    out.push(0); // grid_type: catalogued grid not used by this codec
    let flags = 0x80u8 | if msg.bitmap.is_some() { 0x40 } else { 0 };
    out.push(flags);
    out.push(msg.parameter_code);
    out.push(msg.level_type);

    if GRIB1Message::uses_wide_level(msg.level_type) {
        out.extend_from_slice(&msg.level1.to_be_bytes());
    } else {
        out.push(msg.level1 as u8);
        out.push(msg.level2);
    }

    let century = (msg.reference_time.year / 100) + 1;
    let yy = msg.reference_time.year % 100;
    out.push(century as u8);
    out.push(yy as u8);
    out.push(msg.reference_time.month as u8);
    out.push(msg.reference_time.day as u8);
    out.push(msg.reference_time.hour as u8);
    out.push(msg.reference_time.minute as u8);

    out.push(msg.forecast_units);
    out.push(msg.p1 as u8);
    out.push(msg.p2 as u8);
    out.push(msg.time_range);
    if GRIB1Message::time_range_has_n_avg(msg.time_range) {
        out.extend_from_slice(&msg.n_avg.to_be_bytes());
    }
    out.push(msg.n_missing);
    out.push(msg.subcentre_id);

    let (sign, magnitude) = if msg.decimal_scale < 0 {
        (0x80u8, (-msg.decimal_scale) as u8)
    } else {
        (0u8, msg.decimal_scale as u8)
    };
    out.push(sign);
    out.push(magnitude);

    let bytes_so_far = out.len() - pds_start;
    if bytes_so_far < 40 {
        out.resize(pds_start + 40, 0);
    }
    out.extend_from_slice(&msg.pds_extension);

    let pds_len = out.len() - pds_start;
    let patch = &mut out[pds_start..pds_start + 3];
    patch.copy_from_slice(&[
        (pds_len >> 16) as u8,
        (pds_len >> 8) as u8,
        pds_len as u8,
    ]);
}

fn write_gds(out: &mut Vec<u8>, msg: &GRIB1Message) {
    let gds_start = out.len();
    out.extend_from_slice(&[0, 0, 0]);
    out.push(0); // nv
    out.push(255); // pv
    out.push(msg.grid.data_representation());

    match &msg.grid {
        GRIB1Grid::LatLon(p) | GRIB1Grid::RotatedLatLon(p) => {
            out.extend_from_slice(&p.nx.to_be_bytes());
            out.extend_from_slice(&p.ny.to_be_bytes());
            push_signed_3(out, p.slat, 1e-3);
            push_signed_3(out, p.slon, 1e-3);
            out.push(p.rescomp);
            push_signed_3(out, p.elat, 1e-3);
            push_signed_3(out, p.elon, 1e-3);
            out.extend_from_slice(&((p.loinc / 1e-3).round() as u16).to_be_bytes());
            out.extend_from_slice(&((p.lainc / 1e-3).round() as u16).to_be_bytes());
            out.push(p.scan_mode);
        }
        GRIB1Grid::Gaussian(p) => {
            out.extend_from_slice(&p.nx.to_be_bytes());
            out.extend_from_slice(&p.ny.to_be_bytes());
            push_signed_3(out, p.slat, 1e-3);
            push_signed_3(out, p.slon, 1e-3);
            out.push(p.rescomp);
            push_signed_3(out, p.elat, 1e-3);
            push_signed_3(out, p.elon, 1e-3);
            out.extend_from_slice(&((p.loinc / 1e-3).round() as u16).to_be_bytes());
            out.extend_from_slice(&p.n_parallels.to_be_bytes());
            out.push(p.scan_mode);
        }
        GRIB1Grid::Mercator(p) => {
            out.extend_from_slice(&p.nx.to_be_bytes());
            out.extend_from_slice(&p.ny.to_be_bytes());
            push_signed_3(out, p.slat, 1e-3);
            push_signed_3(out, p.slon, 1e-3);
            out.push(p.rescomp);
            push_signed_3(out, p.elat, 1e-3);
            push_signed_3(out, p.elon, 1e-3);
            push_signed_3(out, p.std_lat1, 1e-3);
            out.push(p.scan_mode);
            push_unsigned_3(out, p.xlen, 1e-3);
            push_unsigned_3(out, p.ylen, 1e-3);
        }
        GRIB1Grid::Lambert(p) => {
            out.extend_from_slice(&p.nx.to_be_bytes());
            out.extend_from_slice(&p.ny.to_be_bytes());
            push_signed_3(out, p.slat, 1e-3);
            push_signed_3(out, p.slon, 1e-3);
            out.push(p.rescomp);
            push_signed_3(out, p.olon, 1e-3);
            push_unsigned_3(out, p.xlen, 1e-3);
            push_unsigned_3(out, p.ylen, 1e-3);
            out.push(p.proj_flag);
            out.push(p.scan_mode);
            push_signed_3(out, p.std_lat1, 1e-3);
            push_signed_3(out, p.std_lat2, 1e-3);
        }
        GRIB1Grid::PolarStereographic(p) => {
            out.extend_from_slice(&p.nx.to_be_bytes());
            out.extend_from_slice(&p.ny.to_be_bytes());
            push_signed_3(out, p.slat, 1e-3);
            push_signed_3(out, p.slon, 1e-3);
            out.push(p.rescomp);
            push_signed_3(out, p.olon, 1e-3);
            push_unsigned_3(out, p.xlen, 1e-3);
            push_unsigned_3(out, p.ylen, 1e-3);
            out.push(p.proj_flag);
            out.push(p.scan_mode);
        }
    }

    let gds_len = out.len() - gds_start;
    let patch = &mut out[gds_start..gds_start + 3];
    patch.copy_from_slice(&[
        (gds_len >> 16) as u8,
        (gds_len >> 8) as u8,
        gds_len as u8,
    ]);
}

fn write_bms(out: &mut Vec<u8>, bitmap: &[u8], num_points: usize) {
    let bms_start = out.len();
    out.extend_from_slice(&[0, 0, 0]);
    let needed_bytes = num_points.div_ceil(8);
    let unused_bits = needed_bytes * 8 - num_points;
    out.push(unused_bits as u8);
    out.extend_from_slice(&[0, 0]); // predefined bitmap indicator = 0
    out.extend_from_slice(&bitmap[..needed_bytes]);

    let bms_len = out.len() - bms_start;
    let patch = &mut out[bms_start..bms_start + 3];
    patch.copy_from_slice(&[
        (bms_len >> 16) as u8,
        (bms_len >> 8) as u8,
        bms_len as u8,
    ]);
}

fn write_bds(out: &mut Vec<u8>, msg: &GRIB1Message) -> Result<(), GribError> {
    let bds_start = out.len();
    out.extend_from_slice(&[0, 0, 0]);
    out.push(0); // flag byte: simple packing, no unused bits (patched below if needed)

    let (sign, magnitude) = if msg.binary_scale < 0 {
        (0x80u8, (-msg.binary_scale) as u8)
    } else {
        (0u8, msg.binary_scale as u8)
    };
    out.push(sign);
    out.push(magnitude);

    let r_word = ieee_to_ibm(f64::from(msg.reference_value))?;
    out.extend_from_slice(&r_word.to_be_bytes());
    out.push(msg.pack_width);

    if msg.pack_width > 0 {
        let unmasked_positions: Vec<usize> = match &msg.bitmap {
            Some(mask) => (0..msg.gridpoints.len())
                .filter(|&i| (mask[i / 8] >> (7 - (i % 8))) & 1 == 1)
                .collect(),
            None => (0..msg.gridpoints.len()).collect(),
        };

        let n_bits = unmasked_positions.len() * usize::from(msg.pack_width);
        let mut payload = vec![0u8; n_bits.div_ceil(8)];
        let bin_factor = 2f64.powi(-i32::from(msg.binary_scale));
        for (i, &pos) in unmasked_positions.iter().enumerate() {
            let value = msg.gridpoints[pos];
            let decoded_scale = 10f64.powi(i32::from(msg.decimal_scale));
            let raw = ((value * decoded_scale) - f64::from(msg.reference_value)) * bin_factor;
            let raw = raw.round().clamp(0.0, (1u64 << msg.pack_width) as f64 - 1.0) as u32;
            pack(&mut payload, raw, i * usize::from(msg.pack_width), u32::from(msg.pack_width));
        }
        out.extend_from_slice(&payload);

        // Unused bits in the last payload byte, if any, are left zero.
        let unused_bits = (payload.len() * 8 - n_bits) as u8;
        out[bds_start + 3] = unused_bits & 0x0f;
    }

    let bds_len = out.len() - bds_start;
    let patch = &mut out[bds_start..bds_start + 3];
    patch.copy_from_slice(&[
        (bds_len >> 16) as u8,
        (bds_len >> 8) as u8,
        bds_len as u8,
    ]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grib1::decode::decode;
    use crate::time::UtcDateTime;

    fn sample_message() -> GRIB1Message {
        GRIB1Message {
            edition: 1,
            table_version: 2,
            centre_id: 7,
            subcentre_id: 0,
            generating_process: 0,
            parameter_code: 11,
            level_type: 100,
            level1: 1000,
            level2: 0,
            reference_time: UtcDateTime::new(2023, 1, 1, 0, 0, 0),
            forecast_units: 1,
            p1: 0,
            p2: 0,
            time_range: 0,
            n_avg: 0,
            n_missing: 0,
            pds_extension: Vec::new(),
            grid: GRIB1Grid::LatLon(LatLonParams {
                nx: 4,
                ny: 2,
                slat: 90.0,
                slon: 0.0,
                rescomp: 0,
                elat: -90.0,
                elon: 270.0,
                loinc: 90.0,
                lainc: 90.0,
                scan_mode: 0,
            }),
            bitmap: None,
            binary_scale: 0,
            decimal_scale: 1,
            reference_value: 280.0,
            pack_width: 8,
            gridpoints: vec![280.0, 281.0, 282.0, 283.0, 284.0, 285.0, 286.0, 287.0],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn encode_decode_round_trip_preserves_grid_and_values() {
        let msg = sample_message();
        let wire = encode(&msg).unwrap();
        let decoded = decode(&wire).unwrap();

        assert_eq!(decoded.grid.nx(), 4);
        assert_eq!(decoded.grid.ny(), 2);
        assert_eq!(decoded.parameter_code, 11);
        assert_eq!(decoded.level_type, 100);
        assert_eq!(decoded.level1, 1000);
        assert_eq!(decoded.decimal_scale, 1);
        assert_eq!(decoded.gridpoints.len(), msg.gridpoints.len());
        for (a, b) in decoded.gridpoints.iter().zip(msg.gridpoints.iter()) {
            assert!((a - b).abs() < 0.05, "{a} vs {b}");
        }
    }
}
