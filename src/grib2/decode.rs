//! GRIB2 section decoder (spec.md §4.D).
//!
//! Grounded on the teacher's `src/context.rs` two-pass
//! structure/decode validation (`Grib2Read::scan`, `index_submessages`'s
//! "most recent instance of each section applies to the next DS" state
//! machine) and `src/decoder.rs` + `src/decoder/complex.rs` for the
//! per-template unpacking, reimplemented as a straight-line decode
//! producing owned `Vec<f64>` rather than the teacher's lazy
//! iterator-of-iterators, since this codec's `GRIB2Grid` is eagerly owned.

use crate::bitio::{unpack, unpack_signed};
use crate::error::{GribError, Warning};
use crate::grib2::message::*;
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

    fn u32(&mut self) -> Result<u32, GribError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, GribError> {
        let b = self.bytes(8)?;
        Ok(u64::from_be_bytes(b.try_into().unwrap()))
    }

    fn signed32(&mut self) -> Result<i32, GribError> {
        let b = self.bytes(4)?;
        Ok(unpack_signed(b, 0, 32))
    }

    fn signed8(&mut self) -> Result<i8, GribError> {
        let b = self.bytes(1)?;
        Ok(unpack_signed(b, 0, 8) as i8)
    }
}

/// Decodes exactly one GRIB2 message starting at `buf[0]`.
pub fn decode(buf: &[u8]) -> Result<GRIB2Message, GribError> {
    let mut c = Cursor::new(buf);
    let magic = c.bytes(4)?;
    if magic != IS_MAGIC {
        return Err(GribError::InvariantViolation(
            "IS does not start with \"GRIB\"".to_owned(),
        ));
    }
    let _reserved = c.u16()?;
    let discipline = c.byte()?;
    let edition = c.byte()?;
    if edition != 2 {
        return Err(GribError::UnsupportedEdition(edition));
    }
    let total_length = c.u64()?;

    if (buf.len() as u64) < total_length {
        return Err(GribError::TruncatedMessage);
    }
    let body_end = total_length as usize - 4; // exclude trailing "7777"
    let mut warnings = Vec::new();
    if buf.get(body_end..total_length as usize) != Some(END_MARKER) {
        warnings.push(Warning::MissingEndMarker);
    }

    let num_grids = count_data_sections(&buf[c.pos..body_end])?;
    let mut grids = Vec::with_capacity(num_grids);

    let mut identification: Option<Identification> = None;
    let mut gds: Option<GridDefinition> = None;
    let mut pds: Option<ProductDefinition> = None;
    let mut drs: Option<ReprDefinition> = None;
    let mut bitmap: Option<Vec<u8>> = None;

    while c.pos < body_end {
        let sect_start = c.pos;
        let sect_len = c.u32()? as usize;
        let sect_num = c.byte()?;
        let body_len = sect_len
            .checked_sub(5)
            .ok_or_else(|| GribError::InvariantViolation("section length under 5".to_owned()))?;

        match sect_num {
            1 => identification = Some(decode_ids(&mut c)?),
            2 => {
                // LUS: skipped, per spec.md §4.D.
            }
            3 => gds = Some(decode_gds(&mut c, &mut warnings)?),
            4 => pds = Some(decode_pds(&mut c)?),
            5 => drs = Some(decode_drs(&mut c)?),
            6 => {
                let indicator = c.byte()?;
                match indicator {
                    0 => {
                        let num_points = gds
                            .as_ref()
                            .map(|g| usize::try_from(g.nx()).unwrap() * usize::try_from(g.ny()).unwrap())
                            .unwrap_or(0);
                        let needed = num_points.div_ceil(8);
                        bitmap = Some(c.bytes(needed)?.to_vec());
                    }
                    254 => {
                        // Reuse previous bitmap, unchanged.
                    }
                    255 => bitmap = None,
                    n => {
                        return Err(GribError::InvariantViolation(format!(
                            "unsupported bitmap indicator {n}"
                        )))
                    }
                }
            }
            7 => {
                let gds = gds.clone().ok_or_else(|| {
                    GribError::InvariantViolation("DS with no preceding GDS".to_owned())
                })?;
                let pds = pds.clone().ok_or_else(|| {
                    GribError::InvariantViolation("DS with no preceding PDS".to_owned())
                })?;
                let drs = drs.clone().ok_or_else(|| {
                    GribError::InvariantViolation("DS with no preceding DRS".to_owned())
                })?;
                let num_points = usize::try_from(gds.nx()).unwrap() * usize::try_from(gds.ny()).unwrap();
                let payload = c.bytes(body_len)?;
                let gridpoints = decode_ds(payload, &drs, bitmap.as_deref(), num_points)?;
                grids.push(GRIB2Grid {
                    metadata: CommonMetadata {
                        gds,
                        pds,
                        drs,
                        bitmap: bitmap.clone(),
                    },
                    gridpoints,
                });
                continue;
            }
            n => {
                return Err(GribError::InvariantViolation(format!(
                    "unknown GRIB2 section number {n}"
                )))
            }
        }

        let consumed = c.pos - sect_start;
        if sect_len > consumed {
            c.bytes(sect_len - consumed)?;
        }
    }

    let identification = identification.ok_or_else(|| {
        GribError::InvariantViolation("message has no Identification Section".to_owned())
    })?;

    Ok(GRIB2Message {
        discipline,
        edition,
        total_length,
        identification,
        grids,
    })
}

/// Structure pass (spec.md §4.D step 1): count section-7 occurrences to
/// size the grid vector ahead of the decode pass.
fn count_data_sections(body: &[u8]) -> Result<usize, GribError> {
    let mut pos = 0usize;
    let mut count = 0usize;
    while pos < body.len() {
        let len_bytes = body
            .get(pos..pos + 4)
            .ok_or(GribError::TruncatedMessage)?;
        let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
        let num = *body.get(pos + 4).ok_or(GribError::TruncatedMessage)?;
        if num == 7 {
            count += 1;
        }
        pos += len;
    }
    Ok(count)
}

fn decode_ids(c: &mut Cursor<'_>) -> Result<Identification, GribError> {
    let center = c.u16()?;
    let subcenter = c.u16()?;
    let master_table_version = c.byte()?;
    let local_table_version = c.byte()?;
    let ref_time_significance = c.byte()?;
    let year = c.u16()?;
    let month = c.byte()?;
    let day = c.byte()?;
    let hour = c.byte()?;
    let minute = c.byte()?;
    let second = c.byte()?;
    let production_status = c.byte()?;
    let data_type = c.byte()?;

    Ok(Identification {
        center,
        subcenter,
        master_table_version,
        local_table_version,
        ref_time_significance,
        reference_time: UtcDateTime::new(
            i32::from(year),
            u32::from(month),
            u32::from(day),
            u32::from(hour),
            u32::from(minute),
            u32::from(second),
        ),
        production_status,
        data_type,
    })
}

fn decode_gds(c: &mut Cursor<'_>, warnings: &mut Vec<Warning>) -> Result<GridDefinition, GribError> {
    let template_num = c.u16()?;

    let nx = c.u32()?;
    let ny = c.u32()?;
    let slat = f64::from(c.signed32()?) * 1e-6;
    let slon = f64::from(c.signed32()?) * 1e-6;
    let rescomp = c.byte()?;
    let elat = f64::from(c.signed32()?) * 1e-6;
    let elon = f64::from(c.signed32()?) * 1e-6;

    let grid = match template_num {
        0 | 10 | 20 | 30 => {
            let a = f64::from(c.signed32()?);
            let b = f64::from(c.signed32()?);
            let scan_mode = c.byte()?;
            match template_num {
                0 => GridDefinition::LatLon(LatLonGrid {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    elat,
                    elon,
                    loinc: a * 1e-6,
                    lainc: b * 1e-6,
                    scan_mode,
                }),
                10 => GridDefinition::Mercator(MercatorGrid {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    elat,
                    elon,
                    std_lat1: a * 1e-6,
                    dxinc: b * 1e-3,
                    dyinc: f64::from(c.signed32()?) * 1e-3,
                    scan_mode,
                }),
                20 => GridDefinition::PolarStereographic(PolarStereoGrid {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    olon: a * 1e-6,
                    dxinc: b * 1e-3,
                    dyinc: f64::from(c.signed32()?) * 1e-3,
                    proj_flag: scan_mode,
                    scan_mode: c.byte()?,
                }),
                _ => GridDefinition::Lambert(LambertGrid {
                    nx,
                    ny,
                    slat,
                    slon,
                    rescomp,
                    olon: a * 1e-6,
                    dxinc: b * 1e-3,
                    dyinc: f64::from(c.signed32()?) * 1e-3,
                    proj_flag: scan_mode,
                    scan_mode: c.byte()?,
                    std_lat1: f64::from(c.signed32()?) * 1e-6,
                    std_lat2: f64::from(c.signed32()?) * 1e-6,
                }),
            }
        }
        40 => {
            let loinc = f64::from(c.signed32()?) * 1e-6;
            let n_parallels = c.u32()?;
            let scan_mode = c.byte()?;
            if n_parallels > ny * 4 {
                warnings.push(Warning::SuspiciousParameterRegion { category: 40 });
            }
            GridDefinition::Gaussian(GaussianGrid {
                nx,
                ny,
                slat,
                slon,
                rescomp,
                elat,
                elon,
                loinc,
                n_parallels,
                scan_mode,
            })
        }
        n => return Err(GribError::UnsupportedGridTemplate(n)),
    };

    Ok(grid)
}

fn decode_pds(c: &mut Cursor<'_>) -> Result<ProductDefinition, GribError> {
    let template_num = c.u16()?;

    let param_category = c.byte()?;
    let param_number = c.byte()?;
    let generating_process = c.byte()?;
    let time_unit = c.byte()?;
    let forecast_time = c.u32()?;
    let level1_type = c.byte()?;
    let level1_scale = c.signed8()?;
    let level1_value = c.u32()?;
    let level2_type = c.byte()?;
    let level2_scale = c.signed8()?;
    let level2_value = c.u32()?;

    let base = BaseProductFields {
        param_category,
        param_number,
        generating_process,
        time_unit,
        forecast_time,
        level1_type,
        level1_scale,
        level1_value,
        level2_type,
        level2_scale,
        level2_value,
    };

    let pd = match template_num {
        0 => ProductDefinition::Analysis(base),
        1 => ProductDefinition::Ensemble(base, decode_ensemble_fields(c)?),
        2 => ProductDefinition::Derived(base, decode_derived_fields(c)?),
        8 => ProductDefinition::Statistical(base, decode_statistical_fields(c)?),
        11 => {
            let ensemble = decode_ensemble_fields(c)?;
            let stats = decode_statistical_fields(c)?;
            ProductDefinition::EnsembleStatistical(base, ensemble, stats)
        }
        12 => {
            let derived = decode_derived_fields(c)?;
            let stats = decode_statistical_fields(c)?;
            ProductDefinition::DerivedStatistical(base, derived, stats)
        }
        15 => {
            let stat_proc = c.byte()?;
            let spatial_type = c.byte()?;
            let num_points = c.u32()?;
            ProductDefinition::SpatialProcessing(
                base,
                SpatialProcessingFields {
                    stat_proc,
                    spatial_type,
                    num_points,
                },
            )
        }
        n => return Err(GribError::UnsupportedProductTemplate(n)),
    };

    Ok(pd)
}

fn decode_ensemble_fields(c: &mut Cursor<'_>) -> Result<EnsembleFields, GribError> {
    Ok(EnsembleFields {
        ensemble_type: c.byte()?,
        perturbation_number: c.byte()?,
        ensemble_size: c.byte()?,
    })
}

fn decode_derived_fields(c: &mut Cursor<'_>) -> Result<DerivedFields, GribError> {
    Ok(DerivedFields {
        derived_code: c.byte()?,
        ensemble_size: c.byte()?,
    })
}

fn decode_statistical_fields(c: &mut Cursor<'_>) -> Result<StatisticalFields, GribError> {
    let year = c.u16()?;
    let month = c.byte()?;
    let day = c.byte()?;
    let hour = c.byte()?;
    let minute = c.byte()?;
    let second = c.byte()?;
    let end_time = UtcDateTime::new(
        i32::from(year),
        u32::from(month),
        u32::from(day),
        u32::from(hour),
        u32::from(minute),
        u32::from(second),
    );
    let num_ranges = c.byte()?;
    let n_missing = c.u32()?;

    let mut ranges = Vec::with_capacity(usize::from(num_ranges));
    for _ in 0..num_ranges {
        ranges.push(StatisticalRange {
            process_code: c.byte()?,
            incr_type: c.byte()?,
            time_unit: c.byte()?,
            time_length: c.u32()?,
            incr_unit: c.byte()?,
            incr_length: c.u32()?,
        });
    }

    Ok(StatisticalFields {
        end_time,
        n_missing,
        ranges,
    })
}

fn decode_drs(c: &mut Cursor<'_>) -> Result<ReprDefinition, GribError> {
    let template_num = c.u16()?;

    let num_packed = c.u32()?;
    let r_bits = c.u32()?;
    let reference_value = f32::from_bits(r_bits);
    let binary_scale = unpack_signed(c.bytes(2)?, 0, 16) as i16;
    let decimal_scale = unpack_signed(c.bytes(2)?, 0, 16) as i16;
    let pack_width = c.byte()?;
    let orig_val_type = c.byte()?;

    let base = DrsBase {
        num_packed,
        reference_value,
        binary_scale,
        decimal_scale,
        pack_width,
        orig_val_type,
    };

    match template_num {
        0 => Ok(ReprDefinition::Simple(base)),
        40 | 40000 => Ok(ReprDefinition::Jpeg2000(base)),
        3 => {
            let group_splitting_method = c.byte()?;
            let missing_value_mgmt = c.byte()?;
            // primary/secondary missing-value substitutes, stored as
            // native IEEE-754 regardless of `orig_val_type`.
            let _primary_missing = c.u32()?;
            let _secondary_missing = c.u32()?;
            let num_groups = c.u32()?;
            let group_width_ref = c.byte()?;
            let group_width_pack_width = c.byte()?;
            let group_length_ref = c.u32()?;
            let group_length_incr = c.byte()?;
            let group_length_last = c.u32()?;
            let group_length_pack_width = c.byte()?;
            let spatial_diff_order = c.byte()?;
            let spatial_diff_extra_width = c.byte()?;

            Ok(ReprDefinition::Complex(
                base,
                ComplexPackingFields {
                    group_splitting_method,
                    missing_value_mgmt,
                    num_groups,
                    group_width_ref,
                    group_width_pack_width,
                    group_length_ref,
                    group_length_incr,
                    group_length_last,
                    group_length_pack_width,
                    spatial_diff_order,
                    spatial_diff_extra_width,
                },
            ))
        }
        n => Err(GribError::UnsupportedDataTemplate(n)),
    }
}

fn decode_ds(
    payload: &[u8],
    drs: &ReprDefinition,
    bitmap: Option<&[u8]>,
    num_points: usize,
) -> Result<Vec<f64>, GribError> {
    match drs {
        ReprDefinition::Simple(base) => decode_simple(payload, base, bitmap, num_points),
        ReprDefinition::Complex(base, complex) => {
            decode_complex(payload, base, complex, bitmap, num_points)
        }
        ReprDefinition::Jpeg2000(base) => decode_jpeg2000(payload, base, bitmap, num_points),
    }
}

fn unmasked_positions(bitmap: Option<&[u8]>, num_points: usize) -> Vec<usize> {
    match bitmap {
        Some(mask) => (0..num_points)
            .filter(|&i| (mask[i / 8] >> (7 - (i % 8))) & 1 == 1)
            .collect(),
        None => (0..num_points).collect(),
    }
}

/// DS template 0 (spec.md §4.D "DS template 0").
fn decode_simple(
    payload: &[u8],
    base: &DrsBase,
    bitmap: Option<&[u8]>,
    num_points: usize,
) -> Result<Vec<f64>, GribError> {
    let mut out = vec![GRIB_MISSING; num_points];
    let positions = unmasked_positions(bitmap, num_points);
    let bin_factor = 2f64.powi(i32::from(base.binary_scale));
    let dig_factor = 10f64.powi(-i32::from(base.decimal_scale));

    if base.pack_width == 0 {
        let value = f64::from(base.reference_value) * dig_factor;
        for &pos in &positions {
            out[pos] = value;
        }
        return Ok(out);
    }

    for (i, &pos) in positions.iter().enumerate() {
        let bit_offset = i * usize::from(base.pack_width);
        let raw = unpack(payload, bit_offset, u32::from(base.pack_width));
        out[pos] = (f64::from(base.reference_value) + f64::from(raw) * bin_factor) * dig_factor;
    }
    Ok(out)
}

/// DS templates 40/40000 (spec.md §4.D "DS templates 40/40000"), via the
/// external JPEG 2000 collaborator (spec.md §6.5, §4.J).
fn decode_jpeg2000(
    payload: &[u8],
    base: &DrsBase,
    bitmap: Option<&[u8]>,
    num_points: usize,
) -> Result<Vec<f64>, GribError> {
    if base.pack_width == 0 || payload.is_empty() {
        let mut out = vec![GRIB_MISSING; num_points];
        let dig_factor = 10f64.powi(-i32::from(base.decimal_scale));
        let value = f64::from(base.reference_value) * dig_factor;
        for &pos in &unmasked_positions(bitmap, num_points) {
            out[pos] = value;
        }
        return Ok(out);
    }

    let nx = (num_points as f64).sqrt().round() as u32;
    let samples = crate::grib2::jpeg2000::jpeg2000_decode(payload, nx, nx.max(1))?;

    let mut out = vec![GRIB_MISSING; num_points];
    let positions = unmasked_positions(bitmap, num_points);
    let bin_factor = 2f64.powi(i32::from(base.binary_scale));
    let dig_factor = 10f64.powi(-i32::from(base.decimal_scale));
    for (i, &pos) in positions.iter().enumerate() {
        let raw = *samples.get(i).unwrap_or(&0);
        out[pos] = (f64::from(base.reference_value) + f64::from(raw) * bin_factor) * dig_factor;
    }
    Ok(out)
}

/// DS template 3 (spec.md §4.D "DS template 3"): complex packing with
/// optional spatial differencing.
fn decode_complex(
    payload: &[u8],
    base: &DrsBase,
    complex: &ComplexPackingFields,
    bitmap: Option<&[u8]>,
    num_points: usize,
) -> Result<Vec<f64>, GribError> {
    let order = usize::from(complex.spatial_diff_order);
    let vals_width = usize::from(complex.spatial_diff_extra_width);

    let mut pos = 0usize;
    let mut first_vals = Vec::with_capacity(order);
    for _ in 0..order {
        let v = unpack_signed(payload, pos * 8, vals_width as u32 * 8);
        first_vals.push(i64::from(v));
        pos += vals_width;
    }
    let omin = if order > 0 {
        let v = unpack_signed(payload, pos * 8, vals_width as u32 * 8);
        pos += vals_width;
        i64::from(v)
    } else {
        0
    };

    let num_groups = complex.num_groups as usize;

    let mut bit_pos = pos * 8;
    let mut group_refs = Vec::with_capacity(num_groups);
    for _ in 0..num_groups {
        group_refs.push(unpack(payload, bit_pos, u32::from(complex.group_width_ref)));
        bit_pos += usize::from(complex.group_width_ref);
    }
    bit_pos = bit_pos.div_ceil(8) * 8;

    let mut group_widths = Vec::with_capacity(num_groups);
    for _ in 0..num_groups {
        group_widths.push(unpack(payload, bit_pos, u32::from(complex.group_width_pack_width)));
        bit_pos += usize::from(complex.group_width_pack_width);
    }
    bit_pos = bit_pos.div_ceil(8) * 8;

    let mut group_lengths = Vec::with_capacity(num_groups);
    for g in 0..num_groups {
        if g + 1 == num_groups {
            group_lengths.push(complex.group_length_last);
        } else {
            let raw = unpack(payload, bit_pos, u32::from(complex.group_length_pack_width));
            group_lengths.push(complex.group_length_ref + raw * u32::from(complex.group_length_incr));
            bit_pos += usize::from(complex.group_length_pack_width);
        }
    }
    if num_groups > 0 {
        bit_pos = bit_pos.div_ceil(8) * 8;
    }

    let missing_on = complex.missing_value_mgmt != 0;
    let mut decoded = Vec::with_capacity(num_points);
    for g in 0..num_groups {
        let width = group_widths[g];
        let length = group_lengths[g];
        let reference = i64::from(group_refs[g]) + omin;
        if width == 0 {
            for _ in 0..length {
                decoded.push(Some(reference));
            }
        } else {
            let sentinel = (1u64 << width) - 1;
            for _ in 0..length {
                let raw = unpack(payload, bit_pos, width);
                bit_pos += width as usize;
                if missing_on && u64::from(raw) == sentinel {
                    decoded.push(None);
                } else {
                    decoded.push(Some(i64::from(raw) + reference));
                }
            }
        }
    }

    // Reverse-difference the spatial-differencing order (spec.md §4.D
    // step 6). Order 1 integrates once, seeded by `first_vals[0]`;
    // order 2 integrates twice, seeded by the first difference
    // `first_vals[1] - first_vals[0]` and the running value
    // `first_vals[1]`. Order 0 carries no differencing at all.
    let bin_factor = 2f64.powi(i32::from(base.binary_scale));
    let dig_factor = 10f64.powi(-i32::from(base.decimal_scale));

    let mut values = vec![0f64; decoded.len()];
    let mut seen_non_missing = 0usize;
    let mut x_prev = if order >= 1 { first_vals[0] as f64 } else { 0.0 };
    let mut d1_prev = if order >= 2 {
        (first_vals[1] - first_vals[0]) as f64
    } else {
        0.0
    };
    for (i, slot) in decoded.iter().enumerate() {
        match slot {
            None => continue,
            Some(raw) => {
                let coded = if seen_non_missing < order {
                    first_vals[seen_non_missing] as f64
                } else if order == 2 {
                    d1_prev += *raw as f64;
                    x_prev += d1_prev;
                    x_prev
                } else if order == 1 {
                    x_prev += *raw as f64;
                    x_prev
                } else {
                    *raw as f64
                };
                values[i] = (f64::from(base.reference_value) + coded * bin_factor) * dig_factor;
                seen_non_missing += 1;
            }
        }
    }

    let positions = unmasked_positions(bitmap, num_points);
    let mut out = vec![GRIB_MISSING; num_points];
    for (i, &pos) in positions.iter().enumerate() {
        if decoded[i].is_some() {
            out[pos] = values[i];
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitio::pack;

    fn push_signed32(buf: &mut Vec<u8>, value: i32) {
        let mut b = [0u8; 4];
        crate::bitio::pack_signed(&mut b, value, 0, 32);
        buf.extend_from_slice(&b);
    }

    fn build_simple_message(nx: u32, ny: u32, pack_width: u8, values: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"GRIB");
        buf.extend_from_slice(&[0, 0]);
        buf.push(0); // discipline
        buf.push(2); // edition
        let total_length_pos = buf.len();
        buf.extend_from_slice(&[0u8; 8]);

        // Section 1: IDS
        let s1_start = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(1);
        buf.extend_from_slice(&7u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.push(2);
        buf.push(1);
        buf.push(0);
        buf.extend_from_slice(&2023u16.to_be_bytes());
        buf.push(1);
        buf.push(1);
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.push(0);
        buf.push(0);
        patch_len(&mut buf, s1_start);

        // Section 3: GDS (template 0, LatLon)
        let s3_start = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(3);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&nx.to_be_bytes());
        buf.extend_from_slice(&ny.to_be_bytes());
        push_signed32(&mut buf, 90_000_000);
        push_signed32(&mut buf, 0);
        buf.push(0);
        push_signed32(&mut buf, -90_000_000);
        push_signed32(&mut buf, 357_500_000);
        push_signed32(&mut buf, 2_500_000);
        push_signed32(&mut buf, 2_500_000);
        buf.push(0);
        patch_len(&mut buf, s3_start);

        // Section 4: PDS (template 0)
        let s4_start = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(4);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.push(0); // param_category
        buf.push(0); // param_number
        buf.push(2); // generating_process
        buf.push(1); // time_unit
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.push(100); // level1_type
        buf.push(0); // level1_scale
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.push(255); // level2_type
        buf.push(0);
        buf.extend_from_slice(&0u32.to_be_bytes());
        patch_len(&mut buf, s4_start);

        // Section 5: DRS (template 0)
        let s5_start = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(5);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&((nx * ny) as u32).to_be_bytes());
        buf.extend_from_slice(&280.0f32.to_bits().to_be_bytes());
        buf.extend_from_slice(&0i16.to_be_bytes());
        buf.extend_from_slice(&1i16.to_be_bytes());
        buf.push(pack_width);
        buf.push(0);
        patch_len(&mut buf, s5_start);

        // Section 6: BMS, no bitmap
        let s6_start = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(6);
        buf.push(255);
        patch_len(&mut buf, s6_start);

        // Section 7: DS
        let s7_start = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(7);
        let n_bits = values.len() * usize::from(pack_width);
        let mut payload = vec![0u8; n_bits.div_ceil(8)];
        for (i, &v) in values.iter().enumerate() {
            pack(&mut payload, v, i * usize::from(pack_width), u32::from(pack_width));
        }
        buf.extend_from_slice(&payload);
        patch_len(&mut buf, s7_start);

        buf.extend_from_slice(b"7777");

        let total_length = buf.len() as u64;
        buf[total_length_pos..total_length_pos + 8].copy_from_slice(&total_length.to_be_bytes());

        buf
    }

    fn patch_len(buf: &mut Vec<u8>, start: usize) {
        let len = (buf.len() - start) as u32;
        buf[start..start + 4].copy_from_slice(&len.to_be_bytes());
    }

    #[test]
    fn simple_packing_decodes_lat_lon_grid() {
        let buf = build_simple_message(4, 2, 8, &[0, 10, 20, 30, 40, 50, 60, 70]);
        let msg = decode(&buf).unwrap();
        assert_eq!(msg.discipline, 0);
        assert_eq!(msg.grids.len(), 1);
        let grid = &msg.grids[0];
        assert_eq!(grid.metadata.gds.nx(), 4);
        assert_eq!(grid.metadata.gds.ny(), 2);
        assert_eq!(grid.gridpoints.len(), 8);
        assert!((grid.gridpoints[0] - 280.0).abs() < 1e-6);
        assert!((grid.gridpoints[1] - 281.0).abs() < 1e-6);
    }

    #[test]
    fn constant_field_zero_pack_width_reduces_to_reference() {
        let buf = build_simple_message(2, 2, 0, &[]);
        let msg = decode(&buf).unwrap();
        for v in &msg.grids[0].gridpoints {
            assert!((v - 280.0).abs() < 1e-6);
        }
    }

    /// DS template 3, order-2 spatial differencing: two of the five
    /// gridpoints are the front-loaded first/second differences, a
    /// width-0 constant group covers their (unused) raw slots, and a
    /// width-8 group carries the remaining three raw second-difference
    /// values that get reverse-differenced via two nested running
    /// accumulators (first differences, then values).
    #[test]
    fn complex_packing_reverses_second_order_spatial_differencing() {
        let base = DrsBase {
            num_packed: 5,
            reference_value: 0.0,
            binary_scale: 0,
            decimal_scale: 0,
            pack_width: 0,
            orig_val_type: 0,
        };
        let complex = ComplexPackingFields {
            group_splitting_method: 1,
            missing_value_mgmt: 0,
            num_groups: 2,
            group_width_ref: 8,
            group_width_pack_width: 8,
            group_length_ref: 0,
            group_length_incr: 1,
            group_length_last: 3,
            group_length_pack_width: 8,
            spatial_diff_order: 2,
            spatial_diff_extra_width: 1,
        };

        #[rustfmt::skip]
        let payload: Vec<u8> = vec![
            10,  // first_vals[0]
            16,  // first_vals[1]
            0,   // omin
            0,   // group_refs[0]
            0,   // group_refs[1]
            0,   // group_widths[0] (constant group)
            8,   // group_widths[1]
            2,   // group_lengths[0] raw (ref=0, incr=1 -> length 2)
            5,   // group 1 raw value -> decoded[2]
            2,   // group 1 raw value -> decoded[3]
            1,   // group 1 raw value -> decoded[4]
        ];

        let out = decode_complex(&payload, &base, &complex, None, 5).unwrap();
        let expected = [10.0, 16.0, 27.0, 40.0, 54.0];
        for (got, want) in out.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }
}
