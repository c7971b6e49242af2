//! # Nullable Result
//!
//! Purpose: Keep "the store returned no value" distinct from "the store
//! returned a zero value" without leaking `None` checks into façade code.
//!
//! ## Design Principles
//! 1. **Typed Empty Variant**: `Empty` is a variant per instantiation, not a
//!    shared singleton, and costs no allocation.
//! 2. **Lazy Short-Circuit**: `map`/`convert` never run on an empty value.
//! 3. **Pure Value Type**: No operation fails or has side effects.

use serde::{Serialize, Serializer};

use crate::convert::Converter;
use crate::error::ConversionResult;

/// A present value or the absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullableResult<T> {
    /// The store returned a value.
    Present(T),
    /// The store reported that no value exists.
    Empty,
}

impl<T> NullableResult<T> {
    /// Wraps a possibly absent value; `None` yields `Empty`.
    #[inline]
    pub fn of(value: Option<T>) -> Self {
        match value {
            Some(value) => NullableResult::Present(value),
            None => NullableResult::Empty,
        }
    }

    /// Returns the empty result.
    #[inline]
    pub const fn empty() -> Self {
        NullableResult::Empty
    }

    /// Applies `f` to a present value. `f` is never called on `Empty`.
    pub fn map<S, F>(self, f: F) -> NullableResult<S>
    where
        F: FnOnce(T) -> S,
    {
        match self {
            NullableResult::Present(value) => NullableResult::Present(f(value)),
            NullableResult::Empty => NullableResult::Empty,
        }
    }

    /// Same as [`map`](Self::map), through a named converter.
    ///
    /// The converter is not invoked on `Empty`; its failure is returned as-is.
    pub fn convert<S, C>(self, converter: &C) -> ConversionResult<NullableResult<S>>
    where
        C: Converter<T, S> + ?Sized,
    {
        match self {
            NullableResult::Present(value) => converter.convert(value).map(NullableResult::Present),
            NullableResult::Empty => Ok(NullableResult::Empty),
        }
    }

    /// Borrows the contained value, if any.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        match self {
            NullableResult::Present(value) => Some(value),
            NullableResult::Empty => None,
        }
    }

    /// Returns the contained value, or `default` when empty.
    #[inline]
    pub fn get_or_default(self, default: T) -> T {
        match self {
            NullableResult::Present(value) => value,
            NullableResult::Empty => default,
        }
    }

    /// Unwraps into a plain `Option`.
    #[inline]
    pub fn into_inner(self) -> Option<T> {
        self.into()
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, NullableResult::Present(_))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, NullableResult::Empty)
    }
}

impl<T> Default for NullableResult<T> {
    fn default() -> Self {
        NullableResult::Empty
    }
}

impl<T> From<Option<T>> for NullableResult<T> {
    fn from(value: Option<T>) -> Self {
        NullableResult::of(value)
    }
}

impl<T> From<NullableResult<T>> for Option<T> {
    fn from(value: NullableResult<T>) -> Self {
        match value {
            NullableResult::Present(value) => Some(value),
            NullableResult::Empty => None,
        }
    }
}

// Serialized like an `Option`, so JSON sees `null` for `Empty`.
impl<T: Serialize> Serialize for NullableResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}
