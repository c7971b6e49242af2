//! Converter abstraction shared by the nullable wrapper and the client.

use crate::error::ConversionResult;

/// Maps a raw value of type `S` into a value of type `T`.
///
/// Any `Fn(S) -> ConversionResult<T>` is a converter, so plain functions and
/// closures can be passed wherever a converter is expected.
pub trait Converter<S, T> {
    fn convert(&self, source: S) -> ConversionResult<T>;
}

impl<S, T, F> Converter<S, T> for F
where
    F: Fn(S) -> ConversionResult<T>,
{
    #[inline]
    fn convert(&self, source: S) -> ConversionResult<T> {
        self(source)
    }
}

/// Converter returning its input unchanged.
#[inline]
pub fn identity<T>(source: T) -> ConversionResult<T> {
    Ok(source)
}
