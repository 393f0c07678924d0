//! GRIB1 section decoder (spec.md §4.C).
//!
//! Grounded on the teacher's section-reading idiom (`src/reader.rs`'s
//! `unpack_sectN_body` functions, `read_as!` macro) generalized into a
//! single linear state machine, since GRIB1 has no repeatable-section
//! structure pass the way GRIB2 does.

use crate::bitio::{unpack, unpack_signed};
use crate::error::{GribError, Warning};
use crate::grib1::message::*;
use crate::time::UtcDateTime;

const IS_MAGIC: &[u8] = b"GRIB";
const END_MARKER: &[u8] = b"7777";

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8, GribError> {
        let b = *self.buf.get(self.pos).ok_or(GribError::Eof)?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], GribError> {
        let end = self.pos + n;
        let slice = self.buf.get(self.pos..end).ok_or(GribError::Eof)?;
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16, GribError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u24(&mut self) -> Result<u32, GribError> {
        let b = self.bytes(3)?;
        Ok(u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2]))
    }

    /// Signed field: sign bit at bit 0, magnitude in the rest, spanning
    /// `n_bytes` octets starting at the cursor.
    fn signed(&mut self, n_bytes: usize) -> Result<i32, GribError> {
        let b = self.bytes(n_bytes)?;
        Ok(unpack_signed(b, 0, n_bytes as u32 * 8))
    }

    fn unsigned(&mut self, n_bytes: usize) -> Result<u32, GribError> {
        let b = self.bytes(n_bytes)?;
        Ok(unpack(b, 0, n_bytes as u32 * 8))
    }
}

/// Finds and decodes exactly one GRIB1 message starting at `buf[0]` (the
/// caller is expected to have already scanned for the `"GRIB"` marker if
/// there is leading data to skip).
pub fn decode(buf: &[u8]) -> Result<GRIB1Message, GribError> {
    let mut c = Cursor::new(buf);

    let magic = c.bytes(4)?;
    if magic != IS_MAGIC {
        return Err(GribError::InvariantViolation(
            "IS does not start with \"GRIB\"".to_owned(),
        ));
    }
    let total_length = c.u24()?;
    let edition = if total_length == 24 {
        0u8
    } else {
        let e = c.byte()?;
        if e != 1 {
            return Err(GribError::UnsupportedEdition(e));
        }
        e
    };

    let (pds, mut warnings) = decode_pds(&mut c)?;

    let has_gds = pds.gds_present;
    let has_bms = pds.bms_present;

    let grid = if has_gds {
        decode_gds(&mut c)?
    } else {
        return Err(GribError::InvariantViolation(
            "GRIB1 message without a Grid Definition Section is not supported".to_owned(),
        ));
    };

    let num_points = usize::from(grid.nx()) * usize::from(grid.ny());

    let bitmap = if has_bms {
        Some(decode_bms(&mut c, num_points)?)
    } else {
        None
    };

    let decimal_scale = pds.decimal_scale;
    let (binary_scale, reference_value, pack_width, gridpoints) =
        decode_bds(&mut c, &grid, bitmap.as_deref(), num_points, decimal_scale)?;

    if edition != 0 {
        let declared_end = 8 + total_length as usize;
        if buf.len() < declared_end {
            return Err(GribError::TruncatedMessage);
        }
        if buf.get(declared_end - 4..declared_end) != Some(END_MARKER) {
            warnings.push(Warning::MissingEndMarker);
        }
    }

    Ok(GRIB1Message {
        edition,
        table_version: pds.table_version,
        centre_id: pds.centre_id,
        subcentre_id: pds.subcentre_id,
        generating_process: pds.generating_process,
        parameter_code: pds.parameter_code,
        level_type: pds.level_type,
        level1: pds.level1,
        level2: pds.level2,
        reference_time: pds.reference_time,
        forecast_units: pds.forecast_units,
        p1: pds.p1,
        p2: pds.p2,
        time_range: pds.time_range,
        n_avg: pds.n_avg,
        n_missing: pds.n_missing,
        pds_extension: pds.extension,
        grid,
        bitmap,
        binary_scale,
        decimal_scale,
        reference_value,
        pack_width,
        gridpoints,
        warnings,
    })
}

struct PdsFields {
    table_version: u8,
    centre_id: u8,
    subcentre_id: u8,
    generating_process: u8,
    gds_present: bool,
    bms_present: bool,
    parameter_code: u8,
    level_type: u8,
    level1: u16,
    level2: u8,
    reference_time: UtcDateTime,
    forecast_units: u8,
    p1: u32,
    p2: u32,
    time_range: u8,
    n_avg: u16,
    n_missing: u8,
    decimal_scale: i16,
    extension: Vec<u8>,
}

fn decode_pds(c: &mut Cursor<'_>) -> Result<(PdsFields, Vec<Warning>), GribError> {
    let pds_start = c.pos;
    let pds_length = c.u24()? as usize;
    let table_version = c.byte()?;
    let centre_id = c.byte()?;
    let generating_process = c.byte()?;
    let _grid_type = c.byte()?;
    let flags = c.byte()?;
    let gds_present = flags & 0x80 != 0;
    let bms_present = flags & 0x40 != 0;
    let parameter_code = c.byte()?;
    let level_type = c.byte()?;

    let (level1, level2) = if GRIB1Message::uses_wide_level(level_type) {
        (c.u16()?, 0u8)
    } else {
        (u16::from(c.byte()?), c.byte()?)
    };

    let century = c.byte()?; // octet 25
    let yy = c.byte()?;
    let mm = c.byte()?;
    let dd = c.byte()?;
    let hh = c.byte()?;
    let mn = c.byte()?;
    let year = i32::from(century) * 100 + i32::from(yy) - 100;
    let reference_time = UtcDateTime::new(year, u32::from(mm), u32::from(dd), u32::from(hh), u32::from(mn), 0);

    let forecast_units = c.byte()?;
    let p1 = u32::from(c.byte()?);
    let p2 = u32::from(c.byte()?);
    let time_range = c.byte()?;
    let n_avg = if GRIB1Message::time_range_has_n_avg(time_range) {
        c.u16()?
    } else {
        0
    };
    let n_missing = c.byte()?;
    let subcentre_id = c.byte()?;

    let sign = c.byte()?;
    let magnitude = i32::from(c.byte()?);
    let decimal_scale_raw = if sign & 0x80 != 0 { -magnitude } else { magnitude };
    let decimal_scale = decimal_scale_raw as i16;

    let bytes_read = c.pos - pds_start;
    let extension = if bytes_read < 40 {
        let pad = 40 - bytes_read;
        c.bytes(pad)?;
        if pds_length > 40 {
            c.bytes(pds_length - 40)?.to_vec()
        } else {
            Vec::new()
        }
    } else if pds_length > bytes_read {
        c.bytes(pds_length - bytes_read)?.to_vec()
    } else {
        Vec::new()
    };

    let fields = PdsFields {
        table_version,
        centre_id,
        subcentre_id,
        generating_process,
        gds_present,
        bms_present,
        parameter_code,
        level_type,
        level1,
        level2,
        reference_time,
        forecast_units,
        p1,
        p2,
        time_range,
        n_avg,
        n_missing,
        decimal_scale,
        extension,
    };
    Ok((fields, Vec::new()))
}

fn decode_gds(c: &mut Cursor<'_>) -> Result<GRIB1Grid, GribError> {
    let gds_start = c.pos;
    let gds_length = c.u24()? as usize;
    let _nv = c.byte()?;
    let _pv = c.byte()?;
    let data_representation = c.byte()?;

    let grid = match data_representation {
        0 | 4 | 10 => {
            let nx = c.u16()?;
            let ny = c.u16()?;
            let slat = f64::from(c.signed(3)?) * 1e-3;
            let slon = f64::from(c.signed(3)?) * 1e-3;
            let rescomp = c.byte()?;
            let elat = f64::from(c.signed(3)?) * 1e-3;
            let elon = f64::from(c.signed(3)?) * 1e-3;
            let loinc_raw = c.u16()?;
            let lainc_raw = c.u16()?;
            let scan_mode = c.byte()?;
            let loinc = f64::from(loinc_raw) * 1e-3;

            if data_representation == 4 {
                GRIB1Grid::Gaussian(GaussianParams {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    elat,
                    elon,
                    loinc,
                    n_parallels: lainc_raw,
                    scan_mode,
                })
            } else {
                let params = LatLonParams {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    elat,
                    elon,
                    loinc,
                    lainc: f64::from(lainc_raw) * 1e-3,
                    scan_mode,
                };
                if data_representation == 10 {
                    GRIB1Grid::RotatedLatLon(params)
                } else {
                    GRIB1Grid::LatLon(params)
                }
            }
        }
        1 => {
            let nx = c.u16()?;
            let ny = c.u16()?;
            let slat = f64::from(c.signed(3)?) * 1e-3;
            let slon = f64::from(c.signed(3)?) * 1e-3;
            let rescomp = c.byte()?;
            let elat = f64::from(c.signed(3)?) * 1e-3;
            let elon = f64::from(c.signed(3)?) * 1e-3;
            let std_lat1 = f64::from(c.signed(3)?) * 1e-3;
            let scan_mode = c.byte()?;
            let xlen = f64::from(c.unsigned(3)?) * 1e-3;
            let ylen = f64::from(c.unsigned(3)?) * 1e-3;
            GRIB1Grid::Mercator(MercatorParams {
                nx,
                ny,
                slat,
                slon,
                rescomp,
                elat,
                elon,
                std_lat1,
                xlen,
                ylen,
                scan_mode,
            })
        }
        3 | 5 => {
            let nx = c.u16()?;
            let ny = c.u16()?;
            let slat = f64::from(c.signed(3)?) * 1e-3;
            let slon = f64::from(c.signed(3)?) * 1e-3;
            let rescomp = c.byte()?;
            let olon = f64::from(c.signed(3)?) * 1e-3;
            let xlen = f64::from(c.unsigned(3)?) * 1e-3;
            let ylen = f64::from(c.unsigned(3)?) * 1e-3;
            let proj_flag = c.byte()?;
            let scan_mode = c.byte()?;
            if data_representation == 3 {
                let std_lat1 = f64::from(c.signed(3)?) * 1e-3;
                let std_lat2 = f64::from(c.signed(3)?) * 1e-3;
                GRIB1Grid::Lambert(LambertParams {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    olon,
                    xlen,
                    ylen,
                    proj_flag,
                    std_lat1,
                    std_lat2,
                    scan_mode,
                })
            } else {
                GRIB1Grid::PolarStereographic(PolarStereoParams {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    olon,
                    xlen,
                    ylen,
                    proj_flag,
                    scan_mode,
                })
            }
        }
        n => return Err(GribError::UnsupportedGridTemplate(u16::from(n))),
    };

    let consumed = c.pos - gds_start;
    if gds_length > consumed {
        c.bytes(gds_length - consumed)?;
    }
    Ok(grid)
}

fn decode_bms(c: &mut Cursor<'_>, num_points: usize) -> Result<Vec<u8>, GribError> {
    let bms_start = c.pos;
    let length = c.u24()? as usize;
    let unused_bits = c.byte()? as usize;
    let predefined = c.u16()?;
    if predefined != 0 {
        return Err(GribError::InvariantViolation(
            "predefined bitmaps are not supported".to_owned(),
        ));
    }
    let body_bits = (length - 6) * 8 - unused_bits;
    let needed_bytes = body_bits.div_ceil(8);
    let bitmap = c.bytes(needed_bytes)?.to_vec();

    if body_bits != num_points {
        return Err(GribError::InvariantViolation(format!(
            "bitmap bit count {body_bits} does not match nx*ny {num_points}"
        )));
    }

    let consumed = c.pos - bms_start;
    if length > consumed {
        c.bytes(length - consumed)?;
    }
    Ok(bitmap)
}

/// NCEP grid types requiring one leading packed word to be skipped
/// before the data stream (spec.md §4.C step 5).
const GRID_TYPES_SKIPPING_LEAD_WORD: &[u8] = &[23, 24, 26, 63, 64];

fn decode_bds(
    c: &mut Cursor<'_>,
    grid: &GRIB1Grid,
    bitmap: Option<&[u8]>,
    num_points: usize,
    decimal_scale: i16,
) -> Result<(i16, f32, u8, Vec<f64>), GribError> {
    let bds_start = c.pos;
    let length = c.u24()? as usize;
    let flag_byte = c.byte()?;
    let complex_packing = flag_byte & 0x40 != 0;
    let unused_bits = usize::from(flag_byte & 0x0f);

    let e_sign = c.byte()?;
    let e_mag = i32::from(c.byte()?);
    let binary_scale = (if e_sign & 0x80 != 0 { -e_mag } else { e_mag }) as i16;

    let r_word = c.unsigned(4)?;
    let reference_value = crate::ibmfloat::ibm_to_ieee(r_word) as f32;

    let pack_width = c.byte()?;

    if complex_packing {
        return Err(GribError::UnsupportedPacking("GRIB1 complex/second-order packing"));
    }

    let skip_lead_word = GRID_TYPES_SKIPPING_LEAD_WORD.contains(&grid.data_representation());

    let mut gridpoints = vec![GRIB_MISSING; num_points];
    let dig_factor = 10f64.powi(-i32::from(decimal_scale));

    if pack_width == 0 {
        for v in gridpoints.iter_mut() {
            *v = f64::from(reference_value) * dig_factor;
        }
        if let Some(mask) = bitmap {
            apply_bitmap_missing(&mut gridpoints, mask, num_points);
        }
    } else {
        let available_bits = length * 8 - 88 - unused_bits;
        let mut num_packed = available_bits / usize::from(pack_width);
        let data_start = c.pos;

        let skip_bits = if skip_lead_word { usize::from(pack_width) } else { 0 };
        if skip_lead_word {
            num_packed = num_packed.saturating_sub(1);
        }

        let payload = &c.buf[data_start..data_start + available_bits.div_ceil(8)];

        let unmasked_positions: Vec<usize> = match bitmap {
            Some(mask) => (0..num_points)
                .filter(|&i| (mask[i / 8] >> (7 - (i % 8))) & 1 == 1)
                .collect(),
            None => (0..num_points).collect(),
        };

        if unmasked_positions.len() != num_packed {
            return Err(GribError::InvariantViolation(format!(
                "packed value count {num_packed} does not match bitmap ones {}",
                unmasked_positions.len()
            )));
        }

        let bin_factor = 2f64.powi(i32::from(binary_scale));
        for (i, &pos) in unmasked_positions.iter().enumerate() {
            let bit_offset = skip_bits + i * usize::from(pack_width);
            let raw = unpack(payload, bit_offset, u32::from(pack_width));
            gridpoints[pos] = (f64::from(reference_value) + f64::from(raw) * bin_factor) * dig_factor;
        }
        c.bytes(available_bits.div_ceil(8))?;
    }

    let consumed = c.pos - bds_start;
    if length > consumed {
        c.bytes(length - consumed)?;
    }

    Ok((binary_scale, reference_value, pack_width, gridpoints))
}

fn apply_bitmap_missing(gridpoints: &mut [f64], mask: &[u8], num_points: usize) {
    for i in 0..num_points {
        let bit = (mask[i / 8] >> (7 - (i % 8))) & 1;
        if bit == 0 {
            gridpoints[i] = GRIB_MISSING;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_signed(value: i32, n_bytes: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n_bytes];
        crate::bitio::pack_signed(&mut buf, value, 0, n_bytes as u32 * 8);
        buf
    }

    /// Builds a minimal GRIB1 lat/lon message with a constant field
    /// (pack width 0), no bitmap — the "constant field" boundary case
    /// from spec.md §8.
    fn build_constant_field_message() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"GRIB");
        let total_length_pos = buf.len();
        buf.extend_from_slice(&[0, 0, 0]); // total length, patched below
        buf.push(1); // edition

        let pds_start = buf.len();
        buf.extend_from_slice(&[0, 0, 0]); // PDS length, patched below
        buf.push(2); // table_version
        buf.push(7); // centre_id
        buf.push(0); // generating_process
        buf.push(0); // grid_type
        buf.push(0b1000_0000); // flags: GDS present, no BMS
        buf.push(11); // parameter_code (temperature)
        buf.push(100); // level_type (wide)
        buf.extend_from_slice(&1000u16.to_be_bytes()); // level1
        buf.push(23); // century
        buf.push(23); // yy
        buf.push(1); // mm
        buf.push(1); // dd
        buf.push(0); // hh
        buf.push(0); // mn
        buf.push(1); // forecast_units = hours
        buf.push(0); // p1
        buf.push(0); // p2
        buf.push(0); // time_range
        buf.push(0); // n_missing
        buf.push(0); // subcentre_id
        buf.push(0); // D sign
        buf.push(0); // D magnitude
        while buf.len() - pds_start < 40 {
            buf.push(0);
        }
        let pds_len = buf.len() - pds_start;
        buf[pds_start..pds_start + 3].copy_from_slice(&[
            (pds_len >> 16) as u8,
            (pds_len >> 8) as u8,
            pds_len as u8,
        ]);

        let gds_start = buf.len();
        buf.extend_from_slice(&[0, 0, 0]); // GDS length, patched below
        buf.push(0); // nv
        buf.push(255); // pv
        buf.push(0); // data_representation = lat/lon
        buf.extend_from_slice(&2u16.to_be_bytes()); // nx
        buf.extend_from_slice(&2u16.to_be_bytes()); // ny
        buf.extend_from_slice(&encode_signed(90_000, 3)); // slat
        buf.extend_from_slice(&encode_signed(0, 3)); // slon
        buf.push(0); // rescomp
        buf.extend_from_slice(&encode_signed(-90_000, 3)); // elat
        buf.extend_from_slice(&encode_signed(1_000, 3)); // elon
        buf.extend_from_slice(&1000u16.to_be_bytes()); // loinc
        buf.extend_from_slice(&1000u16.to_be_bytes()); // lainc
        buf.push(0); // scan_mode
        let gds_len = buf.len() - gds_start;
        buf[gds_start..gds_start + 3].copy_from_slice(&[
            (gds_len >> 16) as u8,
            (gds_len >> 8) as u8,
            gds_len as u8,
        ]);

        let bds_start = buf.len();
        buf.extend_from_slice(&[0, 0, 0]); // BDS length, patched below
        buf.push(0); // flag byte: simple packing, no unused bits
        buf.push(0); // E sign+high byte split below
        buf.push(0); // E magnitude
        let r_word = crate::ibmfloat::ieee_to_ibm(12.5).unwrap();
        buf.extend_from_slice(&r_word.to_be_bytes());
        buf.push(0); // pack_width = 0 -> constant field
        let bds_len = buf.len() - bds_start;
        buf[bds_start..bds_start + 3].copy_from_slice(&[
            (bds_len >> 16) as u8,
            (bds_len >> 8) as u8,
            bds_len as u8,
        ]);

        buf.extend_from_slice(b"7777");

        let total_length = buf.len() - 8;
        buf[total_length_pos..total_length_pos + 3].copy_from_slice(&[
            (total_length >> 16) as u8,
            (total_length >> 8) as u8,
            total_length as u8,
        ]);

        buf
    }

    #[test]
    fn constant_field_yields_reference_value_everywhere() {
        let buf = build_constant_field_message();
        let msg = decode(&buf).unwrap();
        assert_eq!(msg.grid.nx(), 2);
        assert_eq!(msg.grid.ny(), 2);
        assert_eq!(msg.pack_width, 0);
        assert_eq!(msg.gridpoints.len(), 4);
        for v in &msg.gridpoints {
            assert!((v - 12.5).abs() < 1e-3);
        }
        assert!(msg.warnings.is_empty());
    }

    #[test]
    fn missing_end_marker_is_a_warning_not_an_error() {
        let mut buf = build_constant_field_message();
        let len = buf.len();
        buf[len - 4..].copy_from_slice(b"XXXX");
        let msg = decode(&buf).unwrap();
        assert_eq!(msg.warnings, vec![Warning::MissingEndMarker]);
    }
}
