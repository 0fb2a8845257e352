/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Deep structural equality.
//!
//! Two objects are identical when their sizes (including dimension
//! order), units, dtypes, values and variances all match exactly,
//! and, for data arrays, when their names and every coordinate, mask
//! and attribute are identical too. Floating-point values compare
//! bitwise-equal except that NaN matches NaN.

use crate::data_array::DataArray;
use crate::data_array::Metadata;
use crate::dtype::Buffer;
use crate::units::Unit;
use crate::variable::Variable;

/// Deep structural equality.
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

/// Whether `a` and `b` are identical.
pub fn identical<T: Identical + ?Sized>(a: &T, b: &T) -> bool {
    a.identical(b)
}

/// Units are identical when their exponents match and their scales
/// are bitwise equal.
fn same_unit(a: &Unit, b: &Unit) -> bool {
    a.is_compatible(b) && a.scale().to_bits() == b.scale().to_bits()
}

fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn same_buffer(a: &Buffer, b: &Buffer) -> bool {
    match (a, b) {
        (Buffer::Float64(x), Buffer::Float64(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| same_f64(*a, *b))
        }
        (Buffer::Float32(x), Buffer::Float32(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|(a, b)| same_f64(f64::from(*a), f64::from(*b)))
        }
        (Buffer::Events(x), Buffer::Events(y)) => {
            x.len() == y.len()
                && x.iter().zip(y).all(|(a, b)| {
                    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_f64(*a, *b))
                })
        }
        (Buffer::Int64(x), Buffer::Int64(y)) => x == y,
        (Buffer::Int32(x), Buffer::Int32(y)) => x == y,
        (Buffer::Bool(x), Buffer::Bool(y)) => x == y,
        _ => false,
    }
}

impl Identical for Variable {
    fn identical(&self, other: &Self) -> bool {
        if self.sizes() != other.sizes()
            || !same_unit(&self.unit(), &other.unit())
            || self.dtype() != other.dtype()
            || self.event_dim() != other.event_dim()
            || self.has_variances() != other.has_variances()
        {
            return false;
        }
        if !same_buffer(&self.read_values(), &other.read_values()) {
            return false;
        }
        match (self.read_variances(), other.read_variances()) {
            (Some(a), Some(b)) => same_buffer(&a, &b),
            _ => true,
        }
    }
}

impl Identical for Metadata {
    fn identical(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, var)| other.get(name).is_some_and(|o| var.identical(o)))
    }
}

impl Identical for DataArray {
    fn identical(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self.data().identical(other.data())
            && self.coords().identical(other.coords())
            && self.masks().identical(other.masks())
            && self.attrs().identical(other.attrs())
    }
}
