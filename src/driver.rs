//! Pumps decoder → translator → encoder across a whole input stream
//! (SPEC_FULL.md component K, grounded on spec.md §5's "messages are
//! processed strictly in file order" and §7's error-isolation policy: a
//! decode error aborts the current message but does not corrupt the
//! session, and the next `decode_one` call resumes at the next `"GRIB"`
//! marker).

use crate::error::GribError;
use crate::grib1;
use crate::grib2;
use crate::session::CodecSession;
use crate::translate;

/// Outcome of pumping one whole input stream through the codec and
/// translator (spec.md §6.3's "`Number of GRIB<N> grids|messages written
/// to output: <count>`" summary line is built from `items_written`).
pub struct DriverResult {
    pub output: Vec<u8>,
    pub items_written: usize,
    /// Per-message decode failures, paired with the byte offset of the
    /// `"GRIB"` marker that produced them. Translation/encode errors abort
    /// the whole session (spec.md §7) and surface as `Err` instead.
    pub skipped: Vec<(usize, GribError)>,
}

fn find_next_marker(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(4)
        .position(|w| w == b"GRIB")
        .map(|rel| from + rel)
}

/// Reads GRIB2 messages from `input`, translates each grid to GRIB1, and
/// writes the concatenated GRIB1 output. One GRIB2 grid becomes one
/// GRIB1 message (spec.md §6.3's `grib2to1`).
pub fn run_grib2_to_1(session: &mut CodecSession, input: &[u8]) -> Result<DriverResult, GribError> {
    let mut pos = 0usize;
    let mut skipped = Vec::new();
    let output = session.output_buffer();
    let mut items_written = 0usize;

    while let Some(marker) = find_next_marker(input, pos) {
        match grib2::decode(&input[marker..]) {
            Ok(msg) => {
                for grid in &msg.grids {
                    let grib1_msg = translate::grib2_to_grib1(&msg, grid)?;
                    let bytes = grib1::encode(&grib1_msg)?;
                    output.extend_from_slice(&bytes);
                    items_written += 1;
                }
                pos = marker + usize::try_from(msg.total_length).unwrap_or(4).max(4);
            }
            Err(e) => {
                skipped.push((marker, e));
                pos = marker + 4;
            }
        }
    }

    Ok(DriverResult {
        output: output.clone(),
        items_written,
        skipped,
    })
}

/// Reads GRIB1 messages from `input`, translates each to GRIB2, and
/// writes the concatenated GRIB2 output (spec.md §6.3's `grib1to2`).
pub fn run_grib1_to_2(session: &mut CodecSession, input: &[u8]) -> Result<DriverResult, GribError> {
    let mut pos = 0usize;
    let mut skipped = Vec::new();
    let output = session.output_buffer();
    let mut items_written = 0usize;

    while let Some(marker) = find_next_marker(input, pos) {
        match grib1::decode(&input[marker..]) {
            Ok(msg) => {
                let grib2_msg = translate::grib1_to_grib2(&msg)?;
                let bytes = grib2::encode(&grib2_msg)?;
                output.extend_from_slice(&bytes);
                items_written += 1;

                // A GRIB1 edition-1 message's total_length is a 24-bit
                // octet count at offset 4, covering the whole message
                // including the "GRIB" marker and "7777" trailer.
                let total_length = if input.get(marker + 4..marker + 7).is_some() {
                    let b = &input[marker + 4..marker + 7];
                    (u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2])) as usize
                } else {
                    4
                };
                pos = marker + total_length.max(4);
            }
            Err(e) => {
                skipped.push((marker, e));
                pos = marker + 4;
            }
        }
    }

    Ok(DriverResult {
        output: output.clone(),
        items_written,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zero_items_and_no_skips() {
        let mut session = CodecSession::new();
        let result = run_grib2_to_1(&mut session, &[]).unwrap();
        assert_eq!(result.items_written, 0);
        assert!(result.skipped.is_empty());
        assert!(result.output.is_empty());
    }

    #[test]
    fn malformed_marker_is_skipped_not_fatal() {
        let mut session = CodecSession::new();
        let mut input = b"GRIB".to_vec();
        input.extend_from_slice(&[0u8; 20]);
        let result = run_grib2_to_1(&mut session, &input).unwrap();
        assert_eq!(result.items_written, 0);
        assert_eq!(result.skipped.len(), 1);
    }
}
