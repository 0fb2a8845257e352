/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Reductions over named dimensions.
//!
//! A reduction collapses a dimension by combining, for every output
//! cell, the elements lined up along that dimension. The same kernel
//! serves three entry points:
//!
//! - [`Reducible::reduce_dim`], collapsing one dimension of an object;
//! - [`Reducible::reduce_all`], collapsing every dimension;
//! - [`reduce`], combining a sequence of equally shaped slices that
//!   were produced independently, as if they had been stacked along a
//!   dimension and reduced along it.
//!
//! ```
//! use labeled_array::Variable;
//! use labeled_array::reduction;
//! use labeled_array::units::Unit;
//!
//! let slices: Vec<Variable> = [1.0, 2.0, 3.0]
//!     .into_iter()
//!     .map(|v| Variable::scalar_with_variance(v, 1.0, Unit::dimensionless()).unwrap())
//!     .collect();
//! let total = reduction::reduce(slices).unwrap().sum().unwrap();
//! assert_eq!(total.value::<f64>().unwrap(), 6.0);
//! assert_eq!(total.variance::<f64>().unwrap(), Some(3.0));
//! ```
//!
//! Variances propagate through [`crate::variance`]. For data arrays,
//! masks that depend on the reduced dimension exclude the elements
//! they cover and are dropped from the result, as are coordinates
//! depending on that dimension.

use crate::broadcast;
use crate::data_array::DataArray;
use crate::data_array::Metadata;
use crate::dim::Dim;
use crate::dtype::Buffer;
use crate::dtype::DType;
use crate::dtype::EventList;
use crate::error::Error;
use crate::identical::Identical;
use crate::ops;
use crate::ops::Logical;
use crate::sizes::Sizes;
use crate::slice::Slice;
use crate::variable::Variable;
use crate::variance;

/// A reduction operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    Sum,
    Mean,
    Min,
    Max,
    All,
    Any,
    NanSum,
    NanMean,
    NanMin,
    NanMax,
}

impl Reduction {
    pub fn name(self) -> &'static str {
        match self {
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::All => "all",
            Reduction::Any => "any",
            Reduction::NanSum => "nansum",
            Reduction::NanMean => "nanmean",
            Reduction::NanMin => "nanmin",
            Reduction::NanMax => "nanmax",
        }
    }

    fn skips_nan(self) -> bool {
        matches!(
            self,
            Reduction::NanSum | Reduction::NanMean | Reduction::NanMin | Reduction::NanMax
        )
    }

    fn averages(self) -> bool {
        matches!(self, Reduction::Mean | Reduction::NanMean)
    }

    fn selects(self) -> bool {
        matches!(
            self,
            Reduction::Min | Reduction::Max | Reduction::NanMin | Reduction::NanMax
        )
    }
}

/// One position along the reduced dimension: a layout over the
/// output sizes into `var`'s storage, and optionally a mask layout
/// over the same sizes.
struct Column<'a> {
    var: &'a Variable,
    layout: Slice,
    mask: Option<(&'a Variable, Slice)>,
}

fn columns_along<'a>(
    var: &'a Variable,
    dim: Dim,
    mask: Option<&'a Variable>,
) -> Result<Vec<Column<'a>>, Error> {
    let pos = var.sizes().position(dim).ok_or(Error::DimensionNotFound {
        dim,
        sizes: var.sizes().clone(),
    })?;
    let mask = mask
        .map(|m| broadcast::layout_for(m, var.sizes()).map(|l| (m, l)))
        .transpose()?;
    (0..var.shape()[pos])
        .map(|k| -> Result<Column<'a>, Error> {
            Ok(Column {
                var,
                layout: var.layout().at(pos, k)?,
                mask: match &mask {
                    Some((m, layout)) => Some((*m, layout.at(pos, k)?)),
                    None => None,
                },
            })
        })
        .collect()
}

fn columns_all<'a>(var: &'a Variable, mask: Option<&'a Variable>) -> Result<Vec<Column<'a>>, Error> {
    let point = |offset: usize| Slice::new(offset, Vec::new(), Vec::new());
    let mask_offsets = mask
        .map(|m| broadcast::layout_for(m, var.sizes()).map(|l| (m, l.iter().collect::<Vec<_>>())))
        .transpose()?;
    var.layout()
        .iter()
        .enumerate()
        .map(|(i, offset)| -> Result<Column<'a>, Error> {
            Ok(Column {
                var,
                layout: point(offset)?,
                mask: match &mask_offsets {
                    Some((m, offsets)) => Some((*m, point(offsets[i])?)),
                    None => None,
                },
            })
        })
        .collect()
}

/// Columns for a sequence of slices, each addressed in the dimension
/// order of the first.
fn columns_of<'a>(
    slices: &[&'a Variable],
    masks: &[Option<&'a Variable>],
) -> Result<Vec<Column<'a>>, Error> {
    let target = slices.first().map(|s| s.sizes().clone()).unwrap_or_default();
    slices
        .iter()
        .enumerate()
        .map(|(k, &var)| -> Result<Column<'a>, Error> {
            Ok(Column {
                var,
                layout: broadcast::layout_for(var, &target)?,
                mask: match masks.get(k) {
                    Some(&Some(m)) => Some((m, broadcast::layout_for(m, &target)?)),
                    _ => None,
                },
            })
        })
        .collect()
}

fn read_masks(columns: &[Column<'_>], op: &'static str) -> Result<Vec<Option<Vec<bool>>>, Error> {
    columns
        .iter()
        .map(|c| match &c.mask {
            Some((m, layout)) => m.read_bool_with(layout, op).map(Some),
            None => Ok(None),
        })
        .collect()
}

/// Combine `columns` element-wise into a variable of `sizes` with the
/// unit and dtype of `like`.
fn combine(op: Reduction, columns: &[Column<'_>], sizes: Sizes, like: &Variable) -> Result<Variable, Error> {
    let name = op.name();
    let dtype = like.dtype();
    if columns.is_empty() && op.selects() {
        return Err(Error::value(format!(
            "{} over an empty dimension is undefined",
            name
        )));
    }
    let masks = read_masks(columns, name)?;
    let masked = |k: usize, j: usize| masks[k].as_ref().is_some_and(|m| m[j]);

    match op {
        Reduction::All | Reduction::Any => {
            if dtype != DType::Bool {
                return Err(Error::TypeMismatch { op: name, dtype });
            }
            let cols = columns
                .iter()
                .map(|c| c.var.read_bool_with(&c.layout, name))
                .collect::<Result<Vec<_>, _>>()?;
            let out: Vec<bool> = (0..sizes.volume())
                .map(|j| {
                    let mut kept = (0..cols.len()).filter(|&k| !masked(k, j)).map(|k| cols[k][j]);
                    match op {
                        Reduction::All => kept.all(|x| x),
                        _ => kept.any(|x| x),
                    }
                })
                .collect();
            Variable::new(sizes, like.unit(), out)
        }
        _ if !dtype.is_numeric() => Err(Error::TypeMismatch { op: name, dtype }),
        _ if dtype.is_int() && !op.averages() => combine_int(op, columns, masked, sizes, like),
        _ => combine_float(op, columns, masked, sizes, like),
    }
}

fn combine_int(
    op: Reduction,
    columns: &[Column<'_>],
    masked: impl Fn(usize, usize) -> bool,
    sizes: Sizes,
    like: &Variable,
) -> Result<Variable, Error> {
    let name = op.name();
    let cols = columns
        .iter()
        .map(|c| c.var.read_i64_with(&c.layout, name))
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = Vec::with_capacity(sizes.volume());
    for j in 0..sizes.volume() {
        let mut kept = (0..cols.len()).filter(|&k| !masked(k, j)).map(|k| cols[k][j]);
        let value = match op {
            Reduction::Sum | Reduction::NanSum => kept
                .try_fold(0i64, i64::checked_add)
                .ok_or_else(|| Error::value(format!("integer overflow in {}", name)))?,
            Reduction::Min | Reduction::NanMin => kept.min().ok_or_else(|| fully_masked(name))?,
            _ => kept.max().ok_or_else(|| fully_masked(name))?,
        };
        out.push(value);
    }
    Variable::from_buffer(sizes, like.unit(), Buffer::from_i64(like.dtype(), out)?, None)
}

fn fully_masked(name: &str) -> Error {
    Error::value(format!("{} of fully masked integer data is undefined", name))
}

fn combine_float(
    op: Reduction,
    columns: &[Column<'_>],
    masked: impl Fn(usize, usize) -> bool,
    sizes: Sizes,
    like: &Variable,
) -> Result<Variable, Error> {
    let name = op.name();
    let slots = sizes.volume();
    let xs = columns
        .iter()
        .map(|c| c.var.read_f64_with(&c.layout, name))
        .collect::<Result<Vec<_>, _>>()?;
    let vs: Option<Vec<Vec<f64>>> = like.has_variances().then(|| {
        columns
            .iter()
            .map(|c| {
                c.var
                    .read_variances_f64_with(&c.layout)
                    .unwrap_or_else(|| vec![0.0; slots])
            })
            .collect()
    });
    let variance_at = |k: usize, j: usize| vs.as_ref().map_or(0.0, |v| v[k][j]);

    let mut values = Vec::with_capacity(slots);
    let mut variances = Vec::with_capacity(slots);
    for j in 0..slots {
        let kept: Vec<usize> = (0..xs.len())
            .filter(|&k| !masked(k, j) && !(op.skips_nan() && xs[k][j].is_nan()))
            .collect();
        let (value, var) = if op.averages() {
            let total: f64 = kept.iter().map(|&k| xs[k][j]).sum();
            let count = kept.len();
            (
                total / count as f64,
                variance::mean(kept.iter().map(|&k| variance_at(k, j)), count),
            )
        } else if op.selects() {
            let selected = select(op, &kept, |k| xs[k][j]);
            (
                selected.map_or(f64::NAN, |k| xs[k][j]),
                variance::selected(selected.map(|k| variance_at(k, j))),
            )
        } else {
            (
                kept.iter().map(|&k| xs[k][j]).sum(),
                variance::sum(kept.iter().map(|&k| variance_at(k, j))),
            )
        };
        values.push(value);
        variances.push(var);
    }

    let dtype = if like.dtype().is_int() {
        DType::Float64
    } else {
        like.dtype()
    };
    let variances = vs
        .is_some()
        .then(|| Buffer::from_f64(dtype, variances))
        .transpose()?;
    Variable::from_parts(sizes, like.unit(), Buffer::from_f64(dtype, values)?, variances, None)
}

/// The index among `kept` of the minimum or maximum value. A NaN
/// among `kept` wins.
fn select(op: Reduction, kept: &[usize], value: impl Fn(usize) -> f64) -> Option<usize> {
    if let Some(&k) = kept.iter().find(|&&k| value(k).is_nan()) {
        return Some(k);
    }
    let better = |a: f64, b: f64| match op {
        Reduction::Min | Reduction::NanMin => a < b,
        _ => a > b,
    };
    kept.iter()
        .copied()
        .reduce(|best, k| if better(value(k), value(best)) { k } else { best })
}

/// Concatenate the event lists of `columns` per output cell.
fn concat(columns: &[Column<'_>], sizes: Sizes, like: &Variable) -> Result<Variable, Error> {
    let event_dim = match (like.dtype(), like.event_dim()) {
        (DType::Events, Some(dim)) => dim,
        (dtype, _) => {
            return Err(Error::TypeMismatch {
                op: "concat",
                dtype,
            });
        }
    };
    let masks = read_masks(columns, "concat")?;
    let masked = |k: usize, j: usize| masks[k].as_ref().is_some_and(|m| m[j]);
    let gather = |cols: &[Vec<EventList>]| -> Vec<EventList> {
        (0..sizes.volume())
            .map(|j| {
                (0..cols.len())
                    .filter(|&k| !masked(k, j))
                    .flat_map(|k| cols[k][j].iter().copied())
                    .collect()
            })
            .collect()
    };

    let lists = columns
        .iter()
        .map(|c| c.var.read_events_with(&c.layout))
        .collect::<Result<Vec<_>, _>>()?;
    let values = gather(&lists);
    let variances = if like.has_variances() {
        let lists = columns
            .iter()
            .map(|c| {
                c.var
                    .read_event_variances_with(&c.layout)
                    .ok_or_else(|| Error::value("concatenated events disagree on variances"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Some(Buffer::Events(gather(&lists)))
    } else {
        None
    };
    Variable::from_parts(sizes, like.unit(), Buffer::Events(values), variances, Some(event_dim))
}

/// Check that `slices` can be reduced together.
fn check_slices(slices: &[&Variable]) -> Result<(), Error> {
    let first = slices
        .first()
        .ok_or_else(|| Error::value("cannot reduce an empty sequence of slices"))?;
    for slice in &slices[1..] {
        if !slice.sizes().same_set(first.sizes()) {
            return Err(Error::shape(format!(
                "slice sizes {} differ from {}",
                slice.sizes(),
                first.sizes()
            )));
        }
        if slice.unit() != first.unit() {
            return Err(Error::UnitMismatch {
                op: "reduce",
                lhs: first.unit(),
                rhs: slice.unit(),
            });
        }
        if slice.dtype() != first.dtype() {
            return Err(Error::TypeMismatch {
                op: "reduce",
                dtype: slice.dtype(),
            });
        }
        if slice.has_variances() != first.has_variances() {
            return Err(Error::value("slices disagree on the presence of variances"));
        }
        if slice.event_dim() != first.event_dim() {
            return Err(Error::shape("slices disagree on their event dimension"));
        }
    }
    Ok(())
}

/// Objects that reductions apply to.
pub trait Reducible: Sized {
    /// Collapse `dim` with `op`.
    fn reduce_dim(&self, op: Reduction, dim: Dim) -> Result<Self, Error>;

    /// Collapse every dimension with `op`.
    fn reduce_all(&self, op: Reduction) -> Result<Self, Error>;

    /// Combine equally shaped `slices` with `op`.
    fn reduce_slices(op: Reduction, slices: &[Self]) -> Result<Self, Error>;

    /// Concatenate event lists along `dim`.
    fn concat_dim(&self, dim: Dim) -> Result<Self, Error>;

    /// Concatenate the event lists of equally shaped `slices`.
    fn concat_slices(slices: &[Self]) -> Result<Self, Error>;
}

impl Reducible for Variable {
    fn reduce_dim(&self, op: Reduction, dim: Dim) -> Result<Self, Error> {
        let columns = columns_along(self, dim, None)?;
        combine(op, &columns, self.sizes().without(dim), self)
    }

    fn reduce_all(&self, op: Reduction) -> Result<Self, Error> {
        let columns = columns_all(self, None)?;
        combine(op, &columns, Sizes::scalar(), self)
    }

    fn reduce_slices(op: Reduction, slices: &[Self]) -> Result<Self, Error> {
        let refs: Vec<&Variable> = slices.iter().collect();
        check_slices(&refs)?;
        tracing::debug!(op = op.name(), slices = refs.len(), "reducing over slices");
        let columns = columns_of(&refs, &[])?;
        combine(op, &columns, refs[0].sizes().clone(), refs[0])
    }

    fn concat_dim(&self, dim: Dim) -> Result<Self, Error> {
        let columns = columns_along(self, dim, None)?;
        concat(&columns, self.sizes().without(dim), self)
    }

    fn concat_slices(slices: &[Self]) -> Result<Self, Error> {
        let refs: Vec<&Variable> = slices.iter().collect();
        check_slices(&refs)?;
        tracing::debug!(op = "concat", slices = refs.len(), "reducing over slices");
        let columns = columns_of(&refs, &[])?;
        concat(&columns, refs[0].sizes().clone(), refs[0])
    }
}

/// Entries present in every one of `items` and identical across them.
fn common_metadata<'a>(items: impl IntoIterator<Item = &'a Metadata>) -> Metadata {
    let mut items = items.into_iter();
    let Some(first) = items.next() else {
        return Metadata::new();
    };
    let rest: Vec<&Metadata> = items.collect();
    first
        .iter()
        .filter(|&(name, var)| {
            rest.iter()
                .all(|other| other.get(name).is_some_and(|o| var.identical(o)))
        })
        .map(|(name, var)| (name, var.deep_copy()))
        .collect()
}

/// The logical or of `masks`, or `None` if there are none.
fn union_masks<'a>(masks: impl IntoIterator<Item = &'a Variable>) -> Result<Option<Variable>, Error> {
    let mut combined: Option<Variable> = None;
    for mask in masks {
        combined = Some(match combined {
            None => mask.deep_copy(),
            Some(acc) => ops::logical(Logical::Or, &acc, mask)?,
        });
    }
    Ok(combined)
}

/// Deep copies of the entries of `items` that pass `keep`.
fn retain(items: &Metadata, keep: impl Fn(&Variable) -> bool) -> Metadata {
    items
        .iter()
        .filter(|&(_, v)| keep(v))
        .map(|(k, v)| (k, v.deep_copy()))
        .collect()
}

/// Masks of each slice that are not shared by all slices, combined
/// per slice.
fn differing_masks(slices: &[DataArray], common: &Metadata) -> Result<Vec<Option<Variable>>, Error> {
    slices
        .iter()
        .map(|da| union_masks(da.masks.iter().filter(|&(name, _)| !common.contains(name)).map(|(_, m)| m)))
        .collect()
}

fn as_refs(masks: &[Option<Variable>]) -> Vec<Option<&Variable>> {
    masks.iter().map(Option::as_ref).collect()
}

impl Reducible for DataArray {
    fn reduce_dim(&self, op: Reduction, dim: Dim) -> Result<Self, Error> {
        let mask = self.mask_along(dim)?;
        let columns = columns_along(&self.data, dim, mask.as_ref())?;
        let data = combine(op, &columns, self.data.sizes().without(dim), &self.data)?;
        let independent = |v: &Variable| !v.sizes().contains(dim);
        DataArray::from_parts(
            self.name.clone(),
            data,
            retain(&self.coords, independent),
            retain(&self.masks, independent),
            retain(&self.attrs, independent),
        )
    }

    fn reduce_all(&self, op: Reduction) -> Result<Self, Error> {
        let mask = union_masks(self.masks.values())?;
        let columns = columns_all(&self.data, mask.as_ref())?;
        let data = combine(op, &columns, Sizes::scalar(), &self.data)?;
        let dims = self.data.dims();
        let independent = |v: &Variable| v.dims().iter().all(|d| !dims.contains(d));
        DataArray::from_parts(
            self.name.clone(),
            data,
            retain(&self.coords, independent),
            Metadata::new(),
            retain(&self.attrs, independent),
        )
    }

    fn reduce_slices(op: Reduction, slices: &[Self]) -> Result<Self, Error> {
        let refs: Vec<&Variable> = slices.iter().map(|da| &da.data).collect();
        check_slices(&refs)?;
        tracing::debug!(op = op.name(), slices = refs.len(), "reducing over slices");
        let masks = common_metadata(slices.iter().map(|da| &da.masks));
        let applied = differing_masks(slices, &masks)?;
        let columns = columns_of(&refs, &as_refs(&applied))?;
        let data = combine(op, &columns, refs[0].sizes().clone(), refs[0])?;
        DataArray::from_parts(
            slices[0].name.clone(),
            data,
            common_metadata(slices.iter().map(|da| &da.coords)),
            masks,
            common_metadata(slices.iter().map(|da| &da.attrs)),
        )
    }

    fn concat_dim(&self, dim: Dim) -> Result<Self, Error> {
        let mask = self.mask_along(dim)?;
        let out = self.data.sizes().without(dim);
        let data = concat(&columns_along(&self.data, dim, mask.as_ref())?, out.clone(), &self.data)?;
        let mut coords = retain(&self.coords, |v| !v.sizes().contains(dim));
        for (name, coord) in self.coords.iter() {
            if coord.dtype() == DType::Events && coord.sizes().contains(dim) {
                let columns = columns_along(coord, dim, mask.as_ref())?;
                coords.insert(name, concat(&columns, out.clone(), coord)?);
            }
        }
        let independent = |v: &Variable| !v.sizes().contains(dim);
        DataArray::from_parts(
            self.name.clone(),
            data,
            coords,
            retain(&self.masks, independent),
            retain(&self.attrs, independent),
        )
    }

    fn concat_slices(slices: &[Self]) -> Result<Self, Error> {
        let refs: Vec<&Variable> = slices.iter().map(|da| &da.data).collect();
        check_slices(&refs)?;
        tracing::debug!(op = "concat", slices = refs.len(), "reducing over slices");
        let masks = common_metadata(slices.iter().map(|da| &da.masks));
        let applied = differing_masks(slices, &masks)?;
        let out = refs[0].sizes().clone();
        let applied = as_refs(&applied);
        let data = concat(&columns_of(&refs, &applied)?, out.clone(), refs[0])?;

        let mut coords = common_metadata(slices.iter().map(|da| &da.coords));
        for (name, coord) in slices[0].coords.iter() {
            if coord.dtype() != DType::Events || coords.contains(name) {
                continue;
            }
            let parts = slices
                .iter()
                .map(|da| {
                    da.coords.get(name).ok_or_else(|| Error::NotFound {
                        reason: format!("event coordinate {} missing from a slice", name),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            check_slices(&parts)?;
            coords.insert(name, concat(&columns_of(&parts, &applied)?, out.clone(), coord)?);
        }
        DataArray::from_parts(
            slices[0].name.clone(),
            data,
            coords,
            masks,
            common_metadata(slices.iter().map(|da| &da.attrs)),
        )
    }
}

impl Variable {
    /// Concatenate event lists along `dim`: each output cell holds the
    /// events of all cells along `dim`, in order.
    pub fn concat_events(&self, dim: Dim) -> Result<Variable, Error> {
        self.concat_dim(dim)
    }
}

impl DataArray {
    /// Concatenate event data and event coordinates along `dim`,
    /// skipping masked cells.
    pub fn concat_events(&self, dim: Dim) -> Result<DataArray, Error> {
        self.concat_dim(dim)
    }
}

fn apply<T: Reducible>(obj: &T, op: Reduction, dim: Option<Dim>) -> Result<T, Error> {
    match dim {
        Some(dim) => obj.reduce_dim(op, dim),
        None => obj.reduce_all(op),
    }
}

macro_rules! reduction_fns {
    ($($(#[$doc:meta])* $name:ident => $op:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<T: Reducible>(obj: &T, dim: impl Into<Option<Dim>>) -> Result<T, Error> {
                apply(obj, $op, dim.into())
            }
        )*

        impl<T: Reducible> Reducer<T> {
            $(
                $(#[$doc])*
                pub fn $name(&self) -> Result<T, Error> {
                    T::reduce_slices($op, &self.slices)
                }
            )*
        }
    };
}

reduction_fns! {
    /// Sum of the elements.
    sum => Reduction::Sum;
    /// Mean of the elements.
    mean => Reduction::Mean;
    /// Minimum of the elements.
    min => Reduction::Min;
    /// Maximum of the elements.
    max => Reduction::Max;
    /// Whether all elements are true.
    all => Reduction::All;
    /// Whether any element is true.
    any => Reduction::Any;
    /// Sum of the non-NaN elements.
    nansum => Reduction::NanSum;
    /// Mean of the non-NaN elements.
    nanmean => Reduction::NanMean;
    /// Minimum of the non-NaN elements.
    nanmin => Reduction::NanMin;
    /// Maximum of the non-NaN elements.
    nanmax => Reduction::NanMax;
}

/// Concatenate event lists along `dim`.
pub fn concat_events<T: Reducible>(obj: &T, dim: Dim) -> Result<T, Error> {
    obj.concat_dim(dim)
}

/// Pending reduction over a sequence of slices, created by
/// [`reduce`].
#[derive(Debug, Clone)]
pub struct Reducer<T> {
    slices: Vec<T>,
}

impl<T: Reducible> Reducer<T> {
    /// Concatenate the event lists of the slices per cell.
    pub fn concat(&self) -> Result<T, Error> {
        T::concat_slices(&self.slices)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Prepare to reduce `slices` as though they were stacked along a new
/// dimension. The sequence must not be empty.
pub fn reduce<T: Reducible>(slices: impl IntoIterator<Item = T>) -> Result<Reducer<T>, Error> {
    let slices: Vec<T> = slices.into_iter().collect();
    if slices.is_empty() {
        return Err(Error::value("cannot reduce an empty sequence of slices"));
    }
    Ok(Reducer { slices })
}
