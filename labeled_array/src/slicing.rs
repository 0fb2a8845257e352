/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Slicing along a named dimension.
//!
//! A slice is a view: it shares storage with the sliced object and
//! writes through to it. Selecting a single index removes the
//! dimension; selecting a range keeps it with a shorter extent.
//!
//! Data array coordinates follow the data. A bin-edge coordinate
//! keeps the edges bracketing the selection, so a point selection at
//! `i` keeps `edges[i..i + 2]` and a range `lo..hi` keeps
//! `edges[lo..hi + 1]`:
//!
//! ```
//! use labeled_array::DataArray;
//! use labeled_array::Dim;
//! use labeled_array::Metadata;
//! use labeled_array::Variable;
//! use labeled_array::sizes;
//! use labeled_array::units::unit;
//!
//! let x = Dim::new("x");
//! let data = Variable::new(sizes!(x = 5), unit("counts").unwrap(), vec![1.0; 5]).unwrap();
//! let edges = Variable::linspace(x, 0.0, 5.0, 6, unit("m").unwrap()).unwrap();
//! let da = DataArray::new(data, [("x", edges)], Metadata::new()).unwrap();
//!
//! let cell = da.slice(x, 2).unwrap();
//! assert_eq!(cell.data().ndim(), 0);
//! assert_eq!(cell.coords()["x"].values::<f64>().unwrap(), vec![2.0, 3.0]);
//!
//! let range = da.slice(x, 1..3).unwrap();
//! assert_eq!(range.coords()["x"].values::<f64>().unwrap(), vec![1.0, 2.0, 3.0]);
//! ```

use std::fmt;

use crate::bins;
use crate::bins::BinKind;
use crate::bins::Order;
use crate::data_array::DataArray;
use crate::data_array::Metadata;
use crate::dim::Dim;
use crate::error::Error;
use crate::variable::Variable;

/// A range of indices, with a stride. An open end runs to the extent
/// of the sliced dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range(pub usize, pub Option<usize>, pub usize);

impl Range {
    fn resolve(&self, extent: usize) -> (usize, usize, usize) {
        match self {
            Range(begin, Some(end), step) => (*begin, *end, *step),
            Range(begin, None, step) => (*begin, extent, *step),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range(begin, None, step) => write!(f, "{}::{}", begin, step),
            Range(begin, Some(end), step) => write!(f, "{}:{}:{}", begin, end, step),
        }
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self(r.start, Some(r.end), 1)
    }
}

impl From<std::ops::RangeInclusive<usize>> for Range {
    fn from(r: std::ops::RangeInclusive<usize>) -> Self {
        Self(*r.start(), Some(*r.end() + 1), 1)
    }
}

impl From<std::ops::RangeFrom<usize>> for Range {
    fn from(r: std::ops::RangeFrom<usize>) -> Self {
        Self(r.start, None, 1)
    }
}

impl From<std::ops::RangeTo<usize>> for Range {
    fn from(r: std::ops::RangeTo<usize>) -> Self {
        Self(0, Some(r.end), 1)
    }
}

impl From<std::ops::RangeFull> for Range {
    fn from(_: std::ops::RangeFull) -> Self {
        Self(0, None, 1)
    }
}

/// A selection along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceIndex {
    /// A single index; the dimension is dropped.
    Point(usize),
    /// A range of indices; the dimension is kept.
    Range(Range),
}

impl fmt::Display for SliceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceIndex::Point(i) => write!(f, "{}", i),
            SliceIndex::Range(r) => write!(f, "{}", r),
        }
    }
}

impl From<usize> for SliceIndex {
    fn from(index: usize) -> Self {
        SliceIndex::Point(index)
    }
}

impl From<Range> for SliceIndex {
    fn from(range: Range) -> Self {
        SliceIndex::Range(range)
    }
}

macro_rules! impl_from_std_range {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SliceIndex {
                fn from(r: $ty) -> Self {
                    SliceIndex::Range(Range::from(r))
                }
            }
        )*
    };
}

impl_from_std_range!(
    std::ops::Range<usize>,
    std::ops::RangeInclusive<usize>,
    std::ops::RangeFrom<usize>,
    std::ops::RangeTo<usize>,
    std::ops::RangeFull
);

impl Variable {
    /// A view of this variable restricted along `dim`.
    ///
    /// # Errors
    /// * `DimensionNotFound` if `dim` is not a dimension of `self`
    /// * `IndexOutOfRange` if the index or range exceeds the extent
    /// * `Value` for a zero step
    pub fn slice(&self, dim: Dim, index: impl Into<SliceIndex>) -> Result<Variable, Error> {
        let pos = self.sizes().position(dim).ok_or(Error::DimensionNotFound {
            dim,
            sizes: self.sizes().clone(),
        })?;
        let extent = self.shape()[pos];
        match index.into() {
            SliceIndex::Point(i) => {
                if i >= extent {
                    return Err(Error::IndexOutOfRange {
                        dim,
                        index: i,
                        extent,
                    });
                }
                let layout = self.layout().at(pos, i)?;
                Ok(self.view_with(self.sizes().without(dim), layout))
            }
            SliceIndex::Range(range) => {
                let (begin, end, step) = range.resolve(extent);
                check_range(dim, begin, end, step, extent)?;
                let layout = self.layout().select(pos, begin, end, step)?;
                let len = (end - begin).div_ceil(step);
                Ok(self.view_with(self.sizes().with_extent(dim, len), layout))
            }
        }
    }
}

fn check_range(dim: Dim, begin: usize, end: usize, step: usize, extent: usize) -> Result<(), Error> {
    if step == 0 {
        return Err(Error::value(format!(
            "slice step along {} must be positive",
            dim
        )));
    }
    if end > extent {
        return Err(Error::IndexOutOfRange {
            dim,
            index: end,
            extent,
        });
    }
    if begin > end {
        return Err(Error::IndexOutOfRange {
            dim,
            index: begin,
            extent: end,
        });
    }
    Ok(())
}

/// Slice one coordinate (or attribute) of data with extent `extent`
/// along `dim`.
fn slice_coord(coord: &Variable, dim: Dim, extent: usize, index: SliceIndex) -> Result<Variable, Error> {
    if !coord.sizes().contains(dim) {
        return Ok(coord.view());
    }
    match bins::classify(coord, dim, extent)? {
        BinKind::Centers => coord.slice(dim, index),
        BinKind::Edges => match index {
            SliceIndex::Point(i) => coord.slice(dim, i..i + 2),
            SliceIndex::Range(range) => {
                let (begin, end, step) = range.resolve(extent);
                if step != 1 {
                    return Err(Error::value(format!(
                        "cannot slice bin edges along {} with step {}",
                        dim, step
                    )));
                }
                coord.slice(dim, begin..end + 1)
            }
        },
    }
}

/// Slice one mask of data with extent `extent` along `dim`. Masks
/// with extent 1 along `dim` broadcast over it.
fn slice_mask(mask: &Variable, dim: Dim, extent: usize, index: SliceIndex) -> Result<Variable, Error> {
    match mask.sizes().extent(dim) {
        None => Ok(mask.view()),
        Some(e) if e == extent => mask.slice(dim, index),
        Some(_) => match index {
            SliceIndex::Point(_) => mask.slice(dim, 0),
            SliceIndex::Range(_) => Ok(mask.view()),
        },
    }
}

fn slice_metadata(
    items: &Metadata,
    f: impl Fn(&Variable) -> Result<Variable, Error>,
) -> Result<Metadata, Error> {
    items
        .iter()
        .map(|(name, var)| f(var).map(|v| (name.to_string(), v)))
        .collect()
}

impl DataArray {
    /// A view of this data array restricted along `dim`. Coordinates,
    /// masks and attributes depending on `dim` are sliced with the
    /// data; bin edges keep the edges bracketing the selection.
    pub fn slice(&self, dim: Dim, index: impl Into<SliceIndex>) -> Result<DataArray, Error> {
        let index = index.into();
        let extent = self.data.sizes().extent(dim).ok_or(Error::DimensionNotFound {
            dim,
            sizes: self.data.sizes().clone(),
        })?;
        let data = self.data.slice(dim, index)?;
        let coords = slice_metadata(&self.coords, |c| slice_coord(c, dim, extent, index))?;
        let masks = slice_metadata(&self.masks, |m| slice_mask(m, dim, extent, index))?;
        let attrs = slice_metadata(&self.attrs, |a| slice_coord(a, dim, extent, index))?;
        Ok(DataArray {
            name: self.name.clone(),
            data,
            coords,
            masks,
            attrs,
        })
    }

    /// Select the bin (for bin edges) or element (for bin centres) of
    /// the coordinate for `dim` that contains `value`. The dimension
    /// is dropped.
    ///
    /// Edges select the bin `[edges[i], edges[i + 1])`; centres
    /// require an exact match.
    pub fn slice_at_value(&self, dim: Dim, value: &Variable) -> Result<DataArray, Error> {
        let (coord, coords, order, kind) = self.value_coord(dim)?;
        let v = coord_value(coord, value)?;
        let index = match kind {
            BinKind::Edges => {
                let count = match order {
                    Order::Ascending => coords.iter().filter(|e| **e <= v).count(),
                    Order::Descending => coords.iter().filter(|e| **e >= v).count(),
                };
                (count >= 1 && count < coords.len()).then(|| count - 1)
            }
            BinKind::Centers => coords.iter().position(|c| *c == v),
        };
        let index = index.ok_or_else(|| Error::NotFound {
            reason: format!("no bin along {} contains {}", dim, v),
        })?;
        self.slice(dim, index)
    }

    /// Select the range of the coordinate for `dim` from `begin`
    /// (inclusive) to `end` (exclusive). Either bound may be open.
    /// Descending coordinates select in their own order.
    pub fn slice_by_value(
        &self,
        dim: Dim,
        begin: Option<&Variable>,
        end: Option<&Variable>,
    ) -> Result<DataArray, Error> {
        let (coord, coords, order, kind) = self.value_coord(dim)?;
        let bins = self.data.sizes().extent(dim).unwrap_or_default();
        // Comparisons in the coordinate's own order.
        let before = |c: f64, v: f64| match order {
            Order::Ascending => c < v,
            Order::Descending => c > v,
        };
        let first = match begin {
            None => 0,
            Some(b) => {
                let b = coord_value(coord, b)?;
                match kind {
                    BinKind::Edges => {
                        let count = coords.iter().filter(|c| before(**c, b) || **c == b).count();
                        count.saturating_sub(1).min(bins)
                    }
                    BinKind::Centers => coords.iter().filter(|c| before(**c, b)).count(),
                }
            }
        };
        let last = match end {
            None => bins,
            Some(e) => {
                let e = coord_value(coord, e)?;
                coords.iter().filter(|c| before(**c, e)).count().min(bins)
            }
        };
        self.slice(dim, first..last.max(first))
    }

    fn value_coord(&self, dim: Dim) -> Result<(&Variable, Vec<f64>, Order, BinKind), Error> {
        let extent = self.data.sizes().extent(dim).ok_or(Error::DimensionNotFound {
            dim,
            sizes: self.data.sizes().clone(),
        })?;
        let coord = self.coords.get(&dim.name()).ok_or_else(|| Error::NotFound {
            reason: format!("no coordinate for dimension {}", dim),
        })?;
        let kind = bins::classify(coord, dim, extent)?;
        let (values, order) = bins::monotonic_values(coord, dim)?;
        Ok((coord, values, order, kind))
    }
}

/// `value`, a 0-dimensional variable, expressed in the unit of
/// `coord`.
fn coord_value(coord: &Variable, value: &Variable) -> Result<f64, Error> {
    if value.ndim() != 0 {
        return Err(Error::shape(format!(
            "slicing by value requires a 0-dimensional value, got {}",
            value.sizes()
        )));
    }
    if !value.unit().is_compatible(&coord.unit()) {
        return Err(Error::UnitMismatch {
            op: "slice by value",
            lhs: coord.unit(),
            rhs: value.unit(),
        });
    }
    let factor = value.unit().conversion_factor(&coord.unit())?;
    let v = value
        .read_f64("slice by value")?
        .first()
        .copied()
        .unwrap_or(f64::NAN);
    Ok(v * factor)
}
