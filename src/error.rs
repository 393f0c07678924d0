//! Error and warning types, grounded on the teacher's `src/error.rs`: a
//! `Display`-able tagged enum with short, lower-case-after-colon wording
//! and a `From<std::io::Error>` bridge, extended with a sibling `Warning`
//! enum for non-fatal conditions (the teacher has no logging dependency,
//! so diagnostics are returned values, not printed internally).

use std::fmt::{self, Display, Formatter};
use std::io;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GribError {
    Eof,
    TruncatedMessage,
    UnsupportedEdition(u8),
    UnsupportedGridTemplate(u16),
    UnsupportedProductTemplate(u16),
    UnsupportedDataTemplate(u16),
    UnsupportedPacking(&'static str),
    UnmappedParameter,
    UnmappedLevel,
    UnmappedProcess,
    InvariantViolation(String),
    IoError(String),
}

impl Display for GribError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "end of input before any bytes of a new message"),
            Self::TruncatedMessage => write!(f, "truncated message"),
            Self::UnsupportedEdition(n) => write!(f, "unsupported GRIB edition: {n}"),
            Self::UnsupportedGridTemplate(id) => write!(f, "unsupported grid template: {id}"),
            Self::UnsupportedProductTemplate(id) => {
                write!(f, "unsupported product template: {id}")
            }
            Self::UnsupportedDataTemplate(id) => write!(f, "unsupported data template: {id}"),
            Self::UnsupportedPacking(kind) => write!(f, "unsupported packing: {kind}"),
            Self::UnmappedParameter => write!(f, "no parameter mapping found"),
            Self::UnmappedLevel => write!(f, "no level mapping found"),
            Self::UnmappedProcess => write!(f, "no statistical process mapping found"),
            Self::InvariantViolation(reason) => write!(f, "invariant violation: {reason}"),
            Self::IoError(inner) => write!(f, "I/O error: {inner}"),
        }
    }
}

impl std::error::Error for GribError {}

impl From<io::Error> for GribError {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Non-fatal conditions tolerated during decode, returned to the caller
/// instead of logged, per the ambient "no process-global state" design
/// note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Warning {
    /// `7777` was not present at the expected offset; the message was
    /// still fully decoded.
    MissingEndMarker,
    /// A parameter lookup had no entry and degraded to code 255.
    ParameterDegraded {
        table_version: u8,
        center: u16,
        code: u8,
    },
    /// A message exercised the brace-matching-irregularity region of the
    /// source parameter map (category 7/14); treated as the intended
    /// one-to-one mapping, flagged for visibility.
    SuspiciousParameterRegion { category: u16 },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEndMarker => write!(f, "missing end marker \"7777\""),
            Self::ParameterDegraded {
                table_version,
                center,
                code,
            } => write!(
                f,
                "unmapped parameter (table {table_version}, center {center}, code {code}) degraded to 255"
            ),
            Self::SuspiciousParameterRegion { category } => write!(
                f,
                "message exercised suspicious parameter-map region (category {category})"
            ),
        }
    }
}
