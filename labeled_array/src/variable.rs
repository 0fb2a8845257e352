/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Labeled arrays.
//!
//! A [`Variable`] couples a typed [`Buffer`] with ordered
//! [`Sizes`], a [`Unit`] and an optional variances buffer of the
//! same shape and type.
//!
//! Storage is shared between a variable and the views sliced from
//! it. Each variable carries an [`Ownership`] tag:
//!
//! - [`Ownership::Owned`] variables have exclusive storage. Cloning
//!   an owned variable copies its buffers.
//! - [`Ownership::View`] variables address a region of another
//!   variable's storage through a strided [`Slice`]. Writing through
//!   a view (e.g. [`Variable::add_assign`], [`Variable::assign`])
//!   mutates the parent. [`Variable::deep_copy`] is the only way to
//!   detach a view.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::dim::Dim;
use crate::dtype::Buffer;
use crate::dtype::DType;
use crate::dtype::Element;
use crate::dtype::EventList;
use crate::error::Error;
use crate::sizes::Sizes;
use crate::slice::Slice;
use crate::units::Unit;

/// Whether a variable owns its storage or views another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    Owned,
    View,
}

/// An N-dimensional labeled array with a unit and optional variances.
pub struct Variable {
    sizes: Sizes,
    unit: Unit,
    dtype: DType,
    layout: Slice,
    values: Arc<RwLock<Buffer>>,
    variances: Option<Arc<RwLock<Buffer>>>,
    ownership: Ownership,
    event_dim: Option<Dim>,
}

impl Variable {
    /// Create a variable from row-major `values`.
    ///
    /// ```
    /// use labeled_array::Variable;
    /// use labeled_array::sizes;
    /// use labeled_array::units::unit;
    ///
    /// let v = Variable::new(sizes!(x = 2, y = 3), unit("m").unwrap(), vec![0.0; 6]).unwrap();
    /// assert_eq!(v.shape(), &[2, 3]);
    /// ```
    pub fn new<T: Element>(sizes: Sizes, unit: Unit, values: Vec<T>) -> Result<Self, Error> {
        Self::from_parts(sizes, unit, T::into_buffer(values), None, None)
    }

    /// Create a variable from a row-major buffer and optional
    /// variances.
    pub fn from_buffer(
        sizes: Sizes,
        unit: Unit,
        values: Buffer,
        variances: Option<Buffer>,
    ) -> Result<Self, Error> {
        Self::from_parts(sizes, unit, values, variances, None)
    }

    /// Create an event variable: one list of raw samples per cell of
    /// `sizes`, with the samples running along `event_dim`. The
    /// event dimension has no fixed extent and must not appear in
    /// `sizes`.
    pub fn events(
        sizes: Sizes,
        event_dim: Dim,
        unit: Unit,
        events: Vec<EventList>,
    ) -> Result<Self, Error> {
        Self::from_parts(sizes, unit, Buffer::Events(events), None, Some(event_dim))
    }

    /// A 0-dimensional `float64` variable.
    pub fn scalar(value: f64, unit: Unit) -> Self {
        Variable::owned(
            Sizes::scalar(),
            unit,
            Buffer::Float64(vec![value]),
            None,
            None,
        )
    }

    /// A 0-dimensional `float64` variable with a variance.
    pub fn scalar_with_variance(value: f64, variance: f64, unit: Unit) -> Result<Self, Error> {
        Variable::scalar(value, unit).with_variances(vec![variance])
    }

    /// `num` evenly spaced `float64` values from `start` to `stop`
    /// inclusive, along `dim`.
    pub fn linspace(
        dim: Dim,
        start: f64,
        stop: f64,
        num: usize,
        unit: Unit,
    ) -> Result<Self, Error> {
        let values = match num {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (num - 1) as f64;
                let mut values: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
                values[num - 1] = stop;
                values
            }
        };
        Variable::new(Sizes::one(dim, num), unit, values)
    }

    /// A variable of `dtype` filled with ones (`true` for booleans).
    pub fn ones(sizes: Sizes, unit: Unit, dtype: DType) -> Result<Self, Error> {
        let n = sizes.volume();
        let values = match dtype {
            DType::Bool => Buffer::Bool(vec![true; n]),
            DType::Events => {
                return Err(Error::TypeMismatch {
                    op: "ones",
                    dtype,
                });
            }
            dtype => Buffer::from_f64(dtype, vec![1.0; n])?,
        };
        Variable::from_buffer(sizes, unit, values, None)
    }

    /// A variable of `dtype` filled with zeros (`false` for booleans,
    /// empty lists for events).
    pub fn zeros(sizes: Sizes, unit: Unit, dtype: DType) -> Result<Self, Error> {
        if dtype == DType::Events {
            return Err(Error::TypeMismatch {
                op: "zeros",
                dtype,
            });
        }
        let n = sizes.volume();
        Variable::from_buffer(sizes, unit, Buffer::zeros(dtype, n), None)
    }

    /// Attach `variances` to an owned variable.
    pub fn with_variances<T: Element>(self, variances: Vec<T>) -> Result<Self, Error> {
        if self.ownership == Ownership::View {
            return Err(Error::value("cannot attach variances to a view"));
        }
        let values = self.read_values();
        Self::from_parts(
            self.sizes,
            self.unit,
            values,
            Some(T::into_buffer(variances)),
            self.event_dim,
        )
    }

    pub(crate) fn from_parts(
        sizes: Sizes,
        unit: Unit,
        values: Buffer,
        variances: Option<Buffer>,
        event_dim: Option<Dim>,
    ) -> Result<Self, Error> {
        if values.len() != sizes.volume() {
            return Err(Error::shape(format!(
                "{} values for sizes {} of volume {}",
                values.len(),
                sizes,
                sizes.volume()
            )));
        }
        let dtype = values.dtype();
        match (dtype, event_dim) {
            (DType::Events, None) => {
                return Err(Error::value("event data requires an event dimension"));
            }
            (DType::Events, Some(dim)) if sizes.contains(dim) => {
                return Err(Error::shape(format!(
                    "event dimension {} cannot also have a fixed extent in {}",
                    dim, sizes
                )));
            }
            (DType::Events, Some(_)) => {}
            (_, Some(dim)) => {
                return Err(Error::value(format!(
                    "event dimension {} given for dense {} data",
                    dim, dtype
                )));
            }
            (_, None) => {}
        }
        if let Some(variances) = &variances {
            check_variances(&values, variances)?;
        }
        Ok(Variable::owned(sizes, unit, values, variances, event_dim))
    }

    fn owned(
        sizes: Sizes,
        unit: Unit,
        values: Buffer,
        variances: Option<Buffer>,
        event_dim: Option<Dim>,
    ) -> Self {
        Variable {
            layout: Slice::new_row_major(sizes.extents()),
            sizes,
            unit,
            dtype: values.dtype(),
            values: Arc::new(RwLock::new(values)),
            variances: variances.map(|v| Arc::new(RwLock::new(v))),
            ownership: Ownership::Owned,
            event_dim,
        }
    }

    /// A view of `layout` within this variable's storage.
    pub(crate) fn view_with(&self, sizes: Sizes, layout: Slice) -> Variable {
        Variable {
            sizes,
            unit: self.unit,
            dtype: self.dtype,
            layout,
            values: self.values.clone(),
            variances: self.variances.clone(),
            ownership: Ownership::View,
            event_dim: self.event_dim,
        }
    }

    /// A view of the whole variable, sharing its storage.
    pub fn view(&self) -> Variable {
        self.view_with(self.sizes.clone(), self.layout.clone())
    }

    /// A copy of this variable with exclusive storage.
    pub fn deep_copy(&self) -> Variable {
        Variable::owned(
            self.sizes.clone(),
            self.unit,
            self.read_values(),
            self.read_variances(),
            self.event_dim,
        )
    }

    pub fn sizes(&self) -> &Sizes {
        &self.sizes
    }

    pub fn dims(&self) -> &[Dim] {
        self.sizes.dims()
    }

    pub fn shape(&self) -> &[usize] {
        self.sizes.extents()
    }

    pub fn ndim(&self) -> usize {
        self.sizes.ndim()
    }

    /// Number of elements (cells, for event data).
    pub fn volume(&self) -> usize {
        self.sizes.volume()
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn has_variances(&self) -> bool {
        self.variances.is_some()
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_view(&self) -> bool {
        self.ownership == Ownership::View
    }

    /// The event dimension, for event data.
    pub fn event_dim(&self) -> Option<Dim> {
        self.event_dim
    }

    pub(crate) fn layout(&self) -> &Slice {
        &self.layout
    }

    /// Whether `self` and `other` address the same storage.
    pub fn shares_storage(&self, other: &Variable) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    /// The values in row-major order of [`Variable::dims`].
    pub fn values<T: Element>(&self) -> Result<Vec<T>, Error> {
        let buffer = self.values.read();
        let data = T::as_slice(&buffer).ok_or(Error::TypeMismatch {
            op: "values",
            dtype: self.dtype,
        })?;
        Ok(self.layout.iter().map(|i| data[i].clone()).collect())
    }

    /// The variances in row-major order, if any.
    pub fn variances<T: Element>(&self) -> Result<Option<Vec<T>>, Error> {
        let Some(variances) = &self.variances else {
            return Ok(None);
        };
        let buffer = variances.read();
        let data = T::as_slice(&buffer).ok_or(Error::TypeMismatch {
            op: "variances",
            dtype: self.dtype,
        })?;
        Ok(Some(self.layout.iter().map(|i| data[i].clone()).collect()))
    }

    /// The single value of a 0-dimensional variable.
    pub fn value<T: Element>(&self) -> Result<T, Error> {
        self.require_scalar("value")?;
        let mut values = self.values::<T>()?;
        values
            .pop()
            .ok_or_else(|| Error::shape("scalar variable without a value"))
    }

    /// The single variance of a 0-dimensional variable, if any.
    pub fn variance<T: Element>(&self) -> Result<Option<T>, Error> {
        self.require_scalar("variance")?;
        Ok(self.variances::<T>()?.and_then(|mut v| v.pop()))
    }

    fn require_scalar(&self, what: &str) -> Result<(), Error> {
        if self.ndim() != 0 {
            return Err(Error::shape(format!(
                "{} requires a 0-dimensional variable, got {}",
                what, self.sizes
            )));
        }
        Ok(())
    }

    /// The number of events in each cell, as an `int64` variable.
    pub fn event_sizes(&self) -> Result<Variable, Error> {
        let events = self.read_events_with(&self.layout)?;
        Variable::new(
            self.sizes.clone(),
            Unit::dimensionless(),
            events.iter().map(|e| e.len() as i64).collect::<Vec<i64>>(),
        )
    }

    pub(crate) fn read_values(&self) -> Buffer {
        self.values.read().gather(self.layout.iter())
    }

    pub(crate) fn read_variances(&self) -> Option<Buffer> {
        self.variances
            .as_ref()
            .map(|v| v.read().gather(self.layout.iter()))
    }

    /// Values at `layout` converted to `f64`.
    pub(crate) fn read_f64_with(&self, layout: &Slice, op: &'static str) -> Result<Vec<f64>, Error> {
        let buffer = self.values.read();
        if !self.dtype.is_numeric() {
            return Err(Error::TypeMismatch {
                op,
                dtype: self.dtype,
            });
        }
        Ok(layout
            .iter()
            .map(|i| buffer.f64_at(i).unwrap_or(f64::NAN))
            .collect())
    }

    pub(crate) fn read_f64(&self, op: &'static str) -> Result<Vec<f64>, Error> {
        self.read_f64_with(&self.layout, op)
    }

    /// Values at `layout` as `i64`, for integer variables.
    pub(crate) fn read_i64_with(&self, layout: &Slice, op: &'static str) -> Result<Vec<i64>, Error> {
        let buffer = self.values.read();
        if !self.dtype.is_int() {
            return Err(Error::TypeMismatch {
                op,
                dtype: self.dtype,
            });
        }
        Ok(layout
            .iter()
            .map(|i| buffer.i64_at(i).unwrap_or_default())
            .collect())
    }

    /// Values at `layout`, for boolean variables.
    pub(crate) fn read_bool_with(&self, layout: &Slice, op: &'static str) -> Result<Vec<bool>, Error> {
        let buffer = self.values.read();
        match &*buffer {
            Buffer::Bool(data) => Ok(layout.iter().map(|i| data[i]).collect()),
            _ => Err(Error::TypeMismatch {
                op,
                dtype: self.dtype,
            }),
        }
    }

    pub(crate) fn read_bool(&self, op: &'static str) -> Result<Vec<bool>, Error> {
        self.read_bool_with(&self.layout, op)
    }

    /// Event lists at `layout`, for event variables.
    pub(crate) fn read_events_with(&self, layout: &Slice) -> Result<Vec<EventList>, Error> {
        let buffer = self.values.read();
        match &*buffer {
            Buffer::Events(data) => Ok(layout.iter().map(|i| data[i].clone()).collect()),
            _ => Err(Error::TypeMismatch {
                op: "events",
                dtype: self.dtype,
            }),
        }
    }

    pub(crate) fn read_event_variances_with(&self, layout: &Slice) -> Option<Vec<EventList>> {
        let variances = self.variances.as_ref()?;
        let buffer = variances.read();
        match &*buffer {
            Buffer::Events(data) => Some(layout.iter().map(|i| data[i].clone()).collect()),
            _ => None,
        }
    }

    /// Variances at `layout` converted to `f64`, if any.
    pub(crate) fn read_variances_f64_with(&self, layout: &Slice) -> Option<Vec<f64>> {
        let variances = self.variances.as_ref()?;
        let buffer = variances.read();
        Some(
            layout
                .iter()
                .map(|i| buffer.f64_at(i).unwrap_or(f64::NAN))
                .collect(),
        )
    }

    pub(crate) fn read_variances_f64(&self) -> Option<Vec<f64>> {
        self.read_variances_f64_with(&self.layout)
    }

    /// Overwrite this variable's elements, in row-major order. Views
    /// write through to their parent's storage.
    pub(crate) fn write(&mut self, values: Buffer, variances: Option<Buffer>) -> Result<(), Error> {
        if values.len() != self.volume() {
            return Err(Error::shape(format!(
                "cannot write {} values into {}",
                values.len(),
                self.sizes
            )));
        }
        match (self.variances.clone(), variances) {
            (Some(target), Some(source)) => {
                check_variances(&values, &source)?;
                target.write().scatter(self.layout.iter(), source)?;
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(Error::value(
                    "cannot write values without variances into a variable with variances",
                ));
            }
            (None, Some(source)) => {
                if self.ownership == Ownership::View {
                    return Err(Error::value("cannot add variances to a view"));
                }
                check_variances(&values, &source)?;
                let mut full = Buffer::zeros(source.dtype(), self.values.read().len());
                full.scatter(self.layout.iter(), source)?;
                self.variances = Some(Arc::new(RwLock::new(full)));
            }
        }
        self.values.write().scatter(self.layout.iter(), values)
    }

    /// Overwrite the values of this variable. Views write through.
    pub fn set_values<T: Element>(&mut self, values: Vec<T>) -> Result<(), Error> {
        let variances = self.read_variances();
        self.write(T::into_buffer(values), variances)
    }

    /// Overwrite the variances of this variable. Views write through.
    pub fn set_variances<T: Element>(&mut self, variances: Vec<T>) -> Result<(), Error> {
        let values = self.read_values();
        self.write(values, Some(T::into_buffer(variances)))
    }

    /// Copy `other` into this variable, broadcasting it to this
    /// variable's sizes. Units and dtypes must match. Views write
    /// through.
    pub fn assign(&mut self, other: &Variable) -> Result<(), Error> {
        if self.unit != other.unit {
            return Err(Error::UnitMismatch {
                op: "assign",
                lhs: self.unit,
                rhs: other.unit,
            });
        }
        if self.dtype != other.dtype {
            return Err(Error::TypeMismatch {
                op: "assign",
                dtype: other.dtype,
            });
        }
        let layout = crate::broadcast::layout_for(other, &self.sizes)?;
        let values = other.values.read().gather(layout.iter());
        let variances = match &other.variances {
            Some(v) => Some(v.read().gather(layout.iter())),
            None => self.read_variances(),
        };
        self.write(values, variances)
    }

    /// Replace the unit. Only owned variables may change unit; a
    /// view shares its parent's meaning.
    pub fn set_unit(&mut self, unit: Unit) -> Result<(), Error> {
        if self.ownership == Ownership::View && unit != self.unit {
            return Err(Error::UnitMismatch {
                op: "set the unit of a view",
                lhs: self.unit,
                rhs: unit,
            });
        }
        self.unit = unit;
        Ok(())
    }

    /// A view with dimensions reordered to `dims`, which must be a
    /// permutation of [`Variable::dims`].
    pub fn transpose(&self, dims: &[Dim]) -> Result<Variable, Error> {
        if dims.len() != self.ndim() {
            return Err(Error::shape(format!(
                "cannot transpose {} to {} dimensions",
                self.sizes,
                dims.len()
            )));
        }
        let order = dims
            .iter()
            .map(|d| {
                self.sizes.position(*d).ok_or(Error::DimensionNotFound {
                    dim: *d,
                    sizes: self.sizes.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let extents = order.iter().map(|&i| self.shape()[i]).collect();
        let sizes = Sizes::new(dims.to_vec(), extents)?;
        let layout = self.layout.permute(&order)?;
        Ok(self.view_with(sizes, layout))
    }

    /// This variable expressed in `unit`. Values are multiplied by the
    /// conversion factor and variances by its square; integer values
    /// round to nearest. If no conversion is needed the result is a
    /// view of the same storage.
    pub fn to_unit(&self, unit: Unit) -> Result<Variable, Error> {
        if !self.unit.is_compatible(&unit) {
            return Err(Error::UnitMismatch {
                op: "convert",
                lhs: self.unit,
                rhs: unit,
            });
        }
        let factor = self.unit.conversion_factor(&unit)?;
        if factor == 1.0 {
            let mut view = self.view();
            view.unit = unit;
            return Ok(view);
        }
        let scale = |b: Buffer, f: f64| -> Result<Buffer, Error> {
            match b {
                Buffer::Events(events) => Ok(Buffer::Events(
                    events
                        .into_iter()
                        .map(|e| e.into_iter().map(|x| x * f).collect())
                        .collect(),
                )),
                b => {
                    let dtype = b.dtype();
                    let n = b.len();
                    let scaled = (0..n)
                        .map(|i| b.f64_at(i).map(|x| x * f))
                        .collect::<Option<Vec<f64>>>()
                        .ok_or(Error::TypeMismatch {
                            op: "convert",
                            dtype,
                        })?;
                    Buffer::from_f64(dtype, scaled)
                }
            }
        };
        let values = scale(self.read_values(), factor)?;
        let variances = self
            .read_variances()
            .map(|v| scale(v, factor * factor))
            .transpose()?;
        Variable::from_parts(self.sizes.clone(), unit, values, variances, self.event_dim)
    }
}

fn check_variances(values: &Buffer, variances: &Buffer) -> Result<(), Error> {
    let dtype = values.dtype();
    if !dtype.supports_variances() {
        return Err(Error::TypeMismatch {
            op: "variances",
            dtype,
        });
    }
    if variances.dtype() != dtype {
        return Err(Error::TypeMismatch {
            op: "variances",
            dtype: variances.dtype(),
        });
    }
    if variances.len() != values.len() {
        return Err(Error::shape(format!(
            "{} variances for {} values",
            variances.len(),
            values.len()
        )));
    }
    let negative = match (values, variances) {
        (Buffer::Events(v), Buffer::Events(e)) => {
            if v.iter().zip(e).any(|(a, b)| a.len() != b.len()) {
                return Err(Error::shape("event variances differ in length from events"));
            }
            e.iter().flatten().any(|x| *x < 0.0)
        }
        _ => (0..variances.len()).any(|i| variances.f64_at(i).is_some_and(|x| x < 0.0)),
    };
    if negative {
        return Err(Error::value("variances must be non-negative"));
    }
    Ok(())
}

impl Clone for Variable {
    /// Owned variables clone their storage; views clone into another
    /// view of the same parent.
    fn clone(&self) -> Self {
        match self.ownership {
            Ownership::Owned => self.deep_copy(),
            Ownership::View => self.view(),
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Variable");
        s.field("sizes", &self.sizes)
            .field("unit", &self.unit.to_string())
            .field("dtype", &self.dtype);
        if let Some(dim) = self.event_dim {
            s.field("event_dim", &dim);
        }
        s.field("values", &self.read_values())
            .field("variances", &self.read_variances())
            .field("ownership", &self.ownership)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizes;
    use crate::units::m;
    use crate::units::unit;

    fn xy() -> Variable {
        Variable::new(
            sizes!(x = 2, y = 3),
            m(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn test_construction() {
        let v = xy();
        assert_eq!(v.shape(), &[2, 3]);
        assert_eq!(v.dtype(), DType::Float64);
        assert_eq!(v.unit(), m());
        assert!(!v.has_variances());
        assert_eq!(v.ownership(), Ownership::Owned);
        assert_eq!(v.values::<f64>().unwrap()[4], 4.0);
        assert!(matches!(
            v.values::<i64>(),
            Err(Error::TypeMismatch { dtype: DType::Float64, .. })
        ));

        assert!(matches!(
            Variable::new(sizes!(x = 2), m(), vec![1.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_variances() {
        let v = Variable::new(sizes!(x = 2), m(), vec![1.0, 2.0])
            .unwrap()
            .with_variances(vec![0.5, 0.25])
            .unwrap();
        assert_eq!(v.variances::<f64>().unwrap(), Some(vec![0.5, 0.25]));

        let negative = Variable::new(sizes!(x = 1), m(), vec![1.0])
            .unwrap()
            .with_variances(vec![-1.0]);
        assert!(matches!(negative, Err(Error::Value { .. })));

        let ints = Variable::new(sizes!(x = 1), m(), vec![1i64])
            .unwrap()
            .with_variances(vec![1i64]);
        assert!(matches!(
            ints,
            Err(Error::TypeMismatch { dtype: DType::Int64, .. })
        ));
    }

    #[test]
    fn test_clone_of_owned_is_independent() {
        let v = xy();
        let mut copy = v.clone();
        assert!(!copy.shares_storage(&v));
        copy.set_values(vec![9.0; 6]).unwrap();
        assert_eq!(v.values::<f64>().unwrap()[0], 0.0);
    }

    #[test]
    fn test_transpose_is_a_view() {
        let v = xy();
        let t = v.transpose(&[Dim::new("y"), Dim::new("x")]).unwrap();
        assert!(t.is_view());
        assert!(t.shares_storage(&v));
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(
            t.values::<f64>().unwrap(),
            vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]
        );
        assert!(matches!(
            v.transpose(&[Dim::new("y"), Dim::new("z")]),
            Err(Error::DimensionNotFound { .. })
        ));
    }

    #[test]
    fn test_to_unit() {
        let v = Variable::new(sizes!(x = 2), m(), vec![1.0, 2.5])
            .unwrap()
            .with_variances(vec![1.0, 4.0])
            .unwrap();
        let mm = v.to_unit(unit("mm").unwrap()).unwrap();
        assert_eq!(mm.values::<f64>().unwrap(), vec![1000.0, 2500.0]);
        assert_eq!(
            mm.variances::<f64>().unwrap(),
            Some(vec![1.0e6, 4.0e6])
        );
        assert!(!mm.shares_storage(&v));

        let same = v.to_unit(m()).unwrap();
        assert!(same.shares_storage(&v));

        assert!(matches!(
            v.to_unit(unit("s").unwrap()),
            Err(Error::UnitMismatch { op: "convert", .. })
        ));

        let ints = Variable::new(sizes!(x = 1), unit("mm").unwrap(), vec![1499i64]).unwrap();
        assert_eq!(ints.to_unit(m()).unwrap().values::<i64>().unwrap(), vec![1]);
    }

    #[test]
    fn test_events() {
        let tof = Dim::new("tof");
        let v = Variable::events(
            sizes!(spectrum = 2),
            tof,
            unit("us").unwrap(),
            vec![vec![1.0, 2.0], vec![]],
        )
        .unwrap();
        assert_eq!(v.dtype(), DType::Events);
        assert_eq!(v.event_dim(), Some(tof));
        assert_eq!(v.event_sizes().unwrap().values::<i64>().unwrap(), vec![2, 0]);

        let clash = Variable::events(sizes!(tof = 1), tof, m(), vec![vec![]]);
        assert!(matches!(clash, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_scalar_and_linspace() {
        let s = Variable::scalar_with_variance(2.0, 0.5, m()).unwrap();
        assert_eq!(s.value::<f64>().unwrap(), 2.0);
        assert_eq!(s.variance::<f64>().unwrap(), Some(0.5));
        assert!(xy().value::<f64>().is_err());

        let l = Variable::linspace(Dim::new("x"), 0.0, 1.0, 5, m()).unwrap();
        assert_eq!(
            l.values::<f64>().unwrap(),
            vec![0.0, 0.25, 0.5, 0.75, 1.0]
        );
    }
}
