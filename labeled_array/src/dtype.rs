/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Element types and typed storage.
//!
//! A [`Buffer`] is the flat storage behind one or more variables. It
//! holds elements of exactly one [`DType`]. Event data is stored as
//! one list of raw samples per cell ([`EventList`]).

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;

/// The raw samples of one event cell.
pub type EventList = Vec<f64>;

/// The element type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Float64,
    Float32,
    Int64,
    Int32,
    Bool,
    Events,
}

impl DType {
    pub fn is_float(self) -> bool {
        matches!(self, DType::Float64 | DType::Float32)
    }

    pub fn is_int(self) -> bool {
        matches!(self, DType::Int64 | DType::Int32)
    }

    /// Whether elements of this type support arithmetic.
    pub fn is_numeric(self) -> bool {
        self.is_float() || self.is_int()
    }

    /// Whether a variances buffer may accompany values of this type.
    pub fn supports_variances(self) -> bool {
        self.is_float() || self == DType::Events
    }

    /// The result type of combining `self` and `other` arithmetically.
    pub fn promote(self, other: DType, op: &'static str) -> Result<DType, Error> {
        use DType::*;
        for dtype in [self, other] {
            if !dtype.is_numeric() {
                return Err(Error::TypeMismatch { op, dtype });
            }
        }
        Ok(match (self, other) {
            (Float32, Float32) => Float32,
            (a, b) if a.is_float() || b.is_float() => Float64,
            (Int32, Int32) => Int32,
            _ => Int64,
        })
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Float64 => "float64",
            DType::Float32 => "float32",
            DType::Int64 => "int64",
            DType::Int32 => "int32",
            DType::Bool => "bool",
            DType::Events => "events",
        };
        write!(f, "{}", name)
    }
}

/// Flat typed storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Buffer {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Bool(Vec<bool>),
    Events(Vec<EventList>),
}

impl Buffer {
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::Float64(_) => DType::Float64,
            Buffer::Float32(_) => DType::Float32,
            Buffer::Int64(_) => DType::Int64,
            Buffer::Int32(_) => DType::Int32,
            Buffer::Bool(_) => DType::Bool,
            Buffer::Events(_) => DType::Events,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::Float64(v) => v.len(),
            Buffer::Float32(v) => v.len(),
            Buffer::Int64(v) => v.len(),
            Buffer::Int32(v) => v.len(),
            Buffer::Bool(v) => v.len(),
            Buffer::Events(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A buffer of `len` zero elements.
    pub fn zeros(dtype: DType, len: usize) -> Buffer {
        match dtype {
            DType::Float64 => Buffer::Float64(vec![0.0; len]),
            DType::Float32 => Buffer::Float32(vec![0.0; len]),
            DType::Int64 => Buffer::Int64(vec![0; len]),
            DType::Int32 => Buffer::Int32(vec![0; len]),
            DType::Bool => Buffer::Bool(vec![false; len]),
            DType::Events => Buffer::Events(vec![Vec::new(); len]),
        }
    }

    /// Copy the elements at `offsets` into a new buffer.
    pub fn gather(&self, offsets: impl Iterator<Item = usize>) -> Buffer {
        match self {
            Buffer::Float64(v) => Buffer::Float64(offsets.map(|i| v[i]).collect()),
            Buffer::Float32(v) => Buffer::Float32(offsets.map(|i| v[i]).collect()),
            Buffer::Int64(v) => Buffer::Int64(offsets.map(|i| v[i]).collect()),
            Buffer::Int32(v) => Buffer::Int32(offsets.map(|i| v[i]).collect()),
            Buffer::Bool(v) => Buffer::Bool(offsets.map(|i| v[i]).collect()),
            Buffer::Events(v) => Buffer::Events(offsets.map(|i| v[i].clone()).collect()),
        }
    }

    /// Overwrite the elements at `offsets` with consecutive elements
    /// of `source`, which must have the same dtype.
    pub fn scatter(
        &mut self,
        offsets: impl Iterator<Item = usize>,
        source: Buffer,
    ) -> Result<(), Error> {
        fn put<T>(dst: &mut [T], offsets: impl Iterator<Item = usize>, src: Vec<T>) {
            for (i, value) in offsets.zip(src) {
                dst[i] = value;
            }
        }
        match (self, source) {
            (Buffer::Float64(d), Buffer::Float64(s)) => put(d.as_mut_slice(), offsets, s),
            (Buffer::Float32(d), Buffer::Float32(s)) => put(d.as_mut_slice(), offsets, s),
            (Buffer::Int64(d), Buffer::Int64(s)) => put(d.as_mut_slice(), offsets, s),
            (Buffer::Int32(d), Buffer::Int32(s)) => put(d.as_mut_slice(), offsets, s),
            (Buffer::Bool(d), Buffer::Bool(s)) => put(d.as_mut_slice(), offsets, s),
            (Buffer::Events(d), Buffer::Events(s)) => put(d.as_mut_slice(), offsets, s),
            (d, s) => {
                return Err(Error::TypeMismatch {
                    op: "assign",
                    dtype: if d.dtype() == s.dtype() {
                        d.dtype()
                    } else {
                        s.dtype()
                    },
                });
            }
        }
        Ok(())
    }

    /// The element at `i` as `f64`, for numeric buffers.
    pub(crate) fn f64_at(&self, i: usize) -> Option<f64> {
        match self {
            Buffer::Float64(v) => Some(v[i]),
            Buffer::Float32(v) => Some(v[i] as f64),
            Buffer::Int64(v) => Some(v[i] as f64),
            Buffer::Int32(v) => Some(v[i] as f64),
            Buffer::Bool(_) | Buffer::Events(_) => None,
        }
    }

    /// The element at `i` as `i64`, for integer buffers.
    pub(crate) fn i64_at(&self, i: usize) -> Option<i64> {
        match self {
            Buffer::Int64(v) => Some(v[i]),
            Buffer::Int32(v) => Some(v[i] as i64),
            _ => None,
        }
    }

    /// Build a numeric buffer of `dtype` from `f64` values. Integer
    /// targets round to nearest.
    pub(crate) fn from_f64(dtype: DType, values: Vec<f64>) -> Result<Buffer, Error> {
        Ok(match dtype {
            DType::Float64 => Buffer::Float64(values),
            DType::Float32 => Buffer::Float32(values.into_iter().map(|v| v as f32).collect()),
            DType::Int64 => Buffer::Int64(values.into_iter().map(|v| v.round() as i64).collect()),
            DType::Int32 => Buffer::Int32(values.into_iter().map(|v| v.round() as i32).collect()),
            dtype => {
                return Err(Error::TypeMismatch {
                    op: "numeric conversion",
                    dtype,
                });
            }
        })
    }

    /// Build an integer buffer of `dtype` from `i64` values. Fails if
    /// a value does not fit in `dtype`.
    pub(crate) fn from_i64(dtype: DType, values: Vec<i64>) -> Result<Buffer, Error> {
        Ok(match dtype {
            DType::Int64 => Buffer::Int64(values),
            DType::Int32 => Buffer::Int32(
                values
                    .into_iter()
                    .map(|v| {
                        i32::try_from(v).map_err(|_| {
                            Error::value(format!("integer overflow: {} is out of range for int32", v))
                        })
                    })
                    .collect::<Result<_, _>>()?,
            ),
            dtype => {
                return Err(Error::TypeMismatch {
                    op: "integer conversion",
                    dtype,
                });
            }
        })
    }
}

/// Rust types that can be stored in a [`Buffer`].
pub trait Element: Clone + Sized + 'static {
    const DTYPE: DType;

    fn into_buffer(values: Vec<Self>) -> Buffer;

    fn as_slice(buffer: &Buffer) -> Option<&[Self]>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn into_buffer(values: Vec<Self>) -> Buffer {
                Buffer::$variant(values)
            }

            fn as_slice(buffer: &Buffer) -> Option<&[Self]> {
                match buffer {
                    Buffer::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(f64, Float64);
impl_element!(f32, Float32);
impl_element!(i64, Int64);
impl_element!(i32, Int32);
impl_element!(bool, Bool);
impl_element!(EventList, Events);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote() {
        use DType::*;
        assert_eq!(Float64.promote(Int64, "add").unwrap(), Float64);
        assert_eq!(Float32.promote(Float32, "add").unwrap(), Float32);
        assert_eq!(Float32.promote(Int32, "add").unwrap(), Float64);
        assert_eq!(Int32.promote(Int32, "add").unwrap(), Int32);
        assert_eq!(Int32.promote(Int64, "add").unwrap(), Int64);
        assert!(matches!(
            Bool.promote(Int64, "add"),
            Err(Error::TypeMismatch { op: "add", dtype: Bool })
        ));
        assert!(matches!(
            Float64.promote(Events, "mul"),
            Err(Error::TypeMismatch { dtype: Events, .. })
        ));
    }

    #[test]
    fn test_gather_scatter() {
        let buffer = Buffer::Int64(vec![10, 11, 12, 13]);
        let gathered = buffer.gather([3, 1].into_iter());
        assert_eq!(gathered, Buffer::Int64(vec![13, 11]));

        let mut target = Buffer::zeros(DType::Int64, 4);
        target.scatter([0, 2].into_iter(), gathered).unwrap();
        assert_eq!(target, Buffer::Int64(vec![13, 0, 11, 0]));

        assert!(target
            .scatter([0].into_iter(), Buffer::Bool(vec![true]))
            .is_err());
    }

    #[test]
    fn test_from_f64_rounds() {
        assert_eq!(
            Buffer::from_f64(DType::Int32, vec![1.4, 1.6, -2.5]).unwrap(),
            Buffer::Int32(vec![1, 2, -3])
        );
        assert!(Buffer::from_f64(DType::Bool, vec![1.0]).is_err());
    }

    #[test]
    fn test_element() {
        let buffer = f32::into_buffer(vec![1.0, 2.0]);
        assert_eq!(buffer.dtype(), f32::DTYPE);
        assert_eq!(f32::as_slice(&buffer), Some(&[1.0f32, 2.0][..]));
        assert_eq!(f64::as_slice(&buffer), None);
    }
}
