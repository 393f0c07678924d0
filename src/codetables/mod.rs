//! Degrading-gracefully code tables: a known code resolves to
//! `Code::Name(Enum)`, an unknown one falls back to `Code::Num(raw)`.
//!
//! Grounded on the teacher's `codetables/grib2.rs` (`num_enum`'s
//! `TryFromPrimitive`/`IntoPrimitive`, tested against
//! `Code::from(Table4_4::try_from(..))`), generalized here into the
//! `Code`/`Lookup` wrapper itself, which the teacher snapshot declared
//! tests for but not the type — this fills that gap in the teacher's own
//! idiom rather than inventing a different one.

pub mod grib2;

use num_enum::TryFromPrimitiveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code<T> {
    Name(T),
    Num(u8),
}

pub use Code::{Name, Num};

impl<T> From<Result<T, TryFromPrimitiveError<T>>> for Code<T>
where
    T: num_enum::TryFromPrimitive<Primitive = u8>,
{
    fn from(result: Result<T, TryFromPrimitiveError<T>>) -> Self {
        match result {
            Ok(name) => Name(name),
            Err(e) => Num(e.number),
        }
    }
}

/// Looks up a raw code against the fixed variant set of `T`, degrading to
/// `Code::Num` on miss rather than erroring — coverage gaps stay visible
/// as data instead of a silent fall-through.
pub trait Lookup<T> {
    fn lookup(code: u8) -> Code<T>;
}

impl<T> Lookup<T> for T
where
    T: num_enum::TryFromPrimitive<Primitive = u8>,
{
    fn lookup(code: u8) -> Code<T> {
        Code::from(T::try_from_primitive(code))
    }
}
