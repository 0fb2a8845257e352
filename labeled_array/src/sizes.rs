/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use itertools::izip;
use serde::Deserialize;
use serde::Serialize;

use crate::dim::Dim;

/// The type of error for sizes construction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SizesError {
    #[error("duplicate dimension {dim}")]
    DuplicateDim { dim: Dim },

    #[error("label extent mismatch: {dims} labels, {extents} extents")]
    LengthMismatch { dims: usize, extents: usize },
}

/// An ordered mapping from dimension label to extent. Order is
/// significant: it is the row-major order of the owning array.
/// Labels are unique.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sizes {
    dims: Vec<Dim>,
    extents: Vec<usize>,
}

impl Sizes {
    /// Creates new sizes from parallel label and extent lists.
    ///
    /// Sizes can also be constructed by way of the [`sizes`] macro.
    pub fn new(dims: Vec<Dim>, extents: Vec<usize>) -> Result<Self, SizesError> {
        if dims.len() != extents.len() {
            return Err(SizesError::LengthMismatch {
                dims: dims.len(),
                extents: extents.len(),
            });
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(SizesError::DuplicateDim { dim: *dim });
            }
        }
        Ok(Self { dims, extents })
    }

    /// The sizes of a 0-dimensional (scalar) array.
    pub fn scalar() -> Self {
        Self::default()
    }

    /// Sizes with a single dimension.
    pub fn one(dim: Dim, extent: usize) -> Self {
        Self {
            dims: vec![dim],
            extents: vec![extent],
        }
    }

    /// The labels, in order.
    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// The extents, in label order.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn volume(&self) -> usize {
        self.extents.iter().product()
    }

    /// The position of `dim`, if present.
    pub fn position(&self, dim: Dim) -> Option<usize> {
        self.dims.iter().position(|d| *d == dim)
    }

    pub fn contains(&self, dim: Dim) -> bool {
        self.dims.contains(&dim)
    }

    /// The extent of `dim`, if present.
    pub fn extent(&self, dim: Dim) -> Option<usize> {
        self.position(dim).map(|i| self.extents[i])
    }

    /// Iterate over `(dim, extent)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (Dim, usize)> + '_ {
        izip!(self.dims.iter().copied(), self.extents.iter().copied())
    }

    /// These sizes with `dim` removed. Removing an absent label is a
    /// no-op.
    pub fn without(&self, dim: Dim) -> Sizes {
        let (dims, extents) = self.iter().filter(|(d, _)| *d != dim).unzip();
        Sizes { dims, extents }
    }

    /// These sizes with the extent of `dim` replaced, or `dim`
    /// appended if absent.
    pub fn with_extent(&self, dim: Dim, extent: usize) -> Sizes {
        let mut sizes = self.clone();
        match self.position(dim) {
            Some(i) => sizes.extents[i] = extent,
            None => {
                sizes.dims.push(dim);
                sizes.extents.push(extent);
            }
        }
        sizes
    }

    /// Whether `self` and `other` hold the same labels with the same
    /// extents, in any order.
    pub fn same_set(&self, other: &Sizes) -> bool {
        self.ndim() == other.ndim() && self.iter().all(|(d, e)| other.extent(d) == Some(e))
    }

    /// Whether every label of `self` is in `other` with the same
    /// extent.
    pub fn includes_in(&self, other: &Sizes) -> bool {
        self.iter().all(|(d, e)| other.extent(d) == Some(e))
    }
}

impl fmt::Display for Sizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (dim, extent)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", dim, extent)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for Sizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sizes{}", self)
    }
}

/// Construct a new [`Sizes`] from a set of dimension labels and
/// extents, in order:
///
/// ```
/// let s = labeled_array::sizes!(spectrum = 4, tof = 100);
/// assert_eq!(s.volume(), 400);
/// assert_eq!(s.to_string(), "{spectrum=4,tof=100}");
/// ```
#[macro_export]
macro_rules! sizes {
    ( $( $label:ident = $extent:expr ),* $(,)? ) => {
        {
            let mut dims = Vec::new();
            let mut extents: Vec<usize> = Vec::new();

            $(
                dims.push($crate::Dim::new(stringify!($label)));
                extents.push($extent);
            )*

            $crate::Sizes::new(dims, extents).unwrap()
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let s = sizes!(x = 3, y = 2);
        assert_eq!(s.ndim(), 2);
        assert_eq!(s.volume(), 6);
        assert_eq!(s.extent(Dim::new("y")), Some(2));
        assert_eq!(s.extent(Dim::new("z")), None);
        assert_eq!(s.position(Dim::new("x")), Some(0));
        assert_eq!(s.to_string(), "{x=3,y=2}");
        assert_eq!(Sizes::scalar().volume(), 1);
    }

    #[test]
    fn test_duplicates_rejected() {
        let x = Dim::new("x");
        assert!(matches!(
            Sizes::new(vec![x, x], vec![1, 2]),
            Err(SizesError::DuplicateDim { dim }) if dim == x
        ));
        assert!(matches!(
            Sizes::new(vec![x], vec![1, 2]),
            Err(SizesError::LengthMismatch { dims: 1, extents: 2 })
        ));
    }

    #[test]
    fn test_without_and_with_extent() {
        let s = sizes!(x = 3, y = 2, z = 4);
        assert_eq!(s.without(Dim::new("y")), sizes!(x = 3, z = 4));
        assert_eq!(s.without(Dim::new("w")), s);
        assert_eq!(s.with_extent(Dim::new("y"), 7), sizes!(x = 3, y = 7, z = 4));
        assert_eq!(
            s.with_extent(Dim::new("w"), 1),
            sizes!(x = 3, y = 2, z = 4, w = 1)
        );
    }

    #[test]
    fn test_same_set() {
        let a = sizes!(x = 3, y = 2);
        let b = sizes!(y = 2, x = 3);
        assert_ne!(a, b);
        assert!(a.same_set(&b));
        assert!(!a.same_set(&sizes!(x = 3)));
        assert!(sizes!(x = 3).includes_in(&a));
    }
}
