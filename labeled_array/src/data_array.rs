/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Data arrays: a data [`Variable`] with aligned metadata.
//!
//! A [`DataArray`] bundles its data with three [`Metadata`] maps:
//!
//! - *coordinates*, each of which is either bin centres (extent `n`)
//!   or bin edges (extent `n + 1`) along every data dimension it
//!   depends on;
//! - *masks*, boolean variables broadcastable to the data;
//! - *attributes*, unaligned metadata with the same shape rules as
//!   coordinates.
//!
//! A coordinate may also carry a dimension the data lacks, with
//! extent 1 or 2: this is what remains of a bin-edge coordinate
//! after selecting a single index.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ops::Add;
use std::ops::Div;
use std::ops::Index;
use std::ops::Mul;
use std::ops::Sub;

use crate::dim::Dim;
use crate::dtype::DType;
use crate::error::Error;
use crate::identical::Identical;
use crate::ops;
use crate::ops::Arithmetic;
use crate::ops::Logical;
use crate::sizes::Sizes;
use crate::units::BaseDim;
use crate::units::Unit;
use crate::variable::Variable;

/// An ordered map of names to variables.
///
/// Any iterable of `(name, variable)` pairs converts into metadata,
/// so constructors accept arrays, vectors and standard maps alike:
///
/// ```
/// use std::collections::HashMap;
///
/// use labeled_array::Metadata;
/// use labeled_array::Variable;
/// use labeled_array::units::Unit;
///
/// let a: Metadata = [("a", Variable::scalar(1.0, Unit::dimensionless()))].into();
/// let b: Metadata = HashMap::from([("a".to_string(), Variable::scalar(1.0, Unit::dimensionless()))]).into();
/// assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    items: BTreeMap<String, Variable>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `var` under `name`, returning the previous entry.
    pub fn insert(&mut self, name: impl Into<String>, var: Variable) -> Option<Variable> {
        self.items.insert(name.into(), var)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.items.get_mut(name)
    }

    /// Remove and return the entry for `name`.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.items.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Variable> {
        self.items.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn deep_copy(&self) -> Metadata {
        self.iter().map(|(k, v)| (k, v.deep_copy())).collect()
    }
}

impl Index<&str> for Metadata {
    type Output = Variable;

    fn index(&self, name: &str) -> &Variable {
        &self.items[name]
    }
}

impl<K: Into<String>> FromIterator<(K, Variable)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, Variable)>>(iter: I) -> Self {
        Metadata {
            items: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Metadata {
    type Item = (String, Variable);
    type IntoIter = std::collections::btree_map::IntoIter<String, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Variable); N]> for Metadata {
    fn from(items: [(K, Variable); N]) -> Self {
        items.into_iter().collect()
    }
}

impl<K: Into<String>> From<Vec<(K, Variable)>> for Metadata {
    fn from(items: Vec<(K, Variable)>) -> Self {
        items.into_iter().collect()
    }
}

impl<K: Into<String>> From<BTreeMap<K, Variable>> for Metadata {
    fn from(items: BTreeMap<K, Variable>) -> Self {
        items.into_iter().collect()
    }
}

impl<K: Into<String>, S> From<HashMap<K, Variable, S>> for Metadata {
    fn from(items: HashMap<K, Variable, S>) -> Self {
        items.into_iter().collect()
    }
}

/// A data variable with coordinates, masks and attributes.
#[derive(Debug, Clone)]
pub struct DataArray {
    pub(crate) name: String,
    pub(crate) data: Variable,
    pub(crate) coords: Metadata,
    pub(crate) masks: Metadata,
    pub(crate) attrs: Metadata,
}

impl DataArray {
    /// Create a data array, validating every coordinate and mask
    /// against `data`.
    pub fn new(
        data: Variable,
        coords: impl Into<Metadata>,
        masks: impl Into<Metadata>,
    ) -> Result<Self, Error> {
        Self::from_parts(String::new(), data, coords.into(), masks.into(), Metadata::new())
    }

    pub(crate) fn from_parts(
        name: String,
        data: Variable,
        coords: Metadata,
        masks: Metadata,
        attrs: Metadata,
    ) -> Result<Self, Error> {
        for (name, coord) in coords.iter() {
            check_coord(&data, name, coord)?;
        }
        for (name, attr) in attrs.iter() {
            check_coord(&data, name, attr)?;
        }
        for (name, mask) in masks.iter() {
            check_mask(&data, name, mask)?;
        }
        Ok(DataArray {
            name,
            data,
            coords,
            masks,
            attrs,
        })
    }

    /// A data array of unit-weight events located by `positions`.
    /// The positions become the coordinate named after their event
    /// dimension; the data holds a weight of one count per event.
    pub fn from_events(positions: Variable) -> Result<Self, Error> {
        let event_dim = positions.event_dim().ok_or(Error::TypeMismatch {
            op: "from_events",
            dtype: positions.dtype(),
        })?;
        let weights = positions
            .read_events_with(positions.layout())?
            .into_iter()
            .map(|cell| vec![1.0; cell.len()])
            .collect();
        let data = Variable::events(
            positions.sizes().clone(),
            event_dim,
            Unit::base(BaseDim::Counts),
            weights,
        )?;
        DataArray::new(data, [(event_dim.name().to_string(), positions)], Metadata::new())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_coord(mut self, name: impl Into<String>, coord: Variable) -> Result<Self, Error> {
        self.insert_coord(name, coord)?;
        Ok(self)
    }

    pub fn with_mask(mut self, name: impl Into<String>, mask: Variable) -> Result<Self, Error> {
        self.insert_mask(name, mask)?;
        Ok(self)
    }

    pub fn with_attr(mut self, name: impl Into<String>, attr: Variable) -> Result<Self, Error> {
        self.insert_attr(name, attr)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn data(&self) -> &Variable {
        &self.data
    }

    pub fn coords(&self) -> &Metadata {
        &self.coords
    }

    pub fn masks(&self) -> &Metadata {
        &self.masks
    }

    pub fn attrs(&self) -> &Metadata {
        &self.attrs
    }

    /// Mutable access to the values of coordinate `name`. Changes
    /// made through a view write through to the array it was sliced
    /// from. Use [`DataArray::insert_coord`] to replace a coordinate.
    pub fn coord_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.coords.get_mut(name)
    }

    /// Mutable access to the values of mask `name`. Views write
    /// through, as for [`DataArray::coord_mut`].
    pub fn mask_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.masks.get_mut(name)
    }

    /// Mutable access to the values of attribute `name`. Views write
    /// through.
    pub fn attr_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.attrs.get_mut(name)
    }

    pub fn sizes(&self) -> &Sizes {
        self.data.sizes()
    }

    pub fn dims(&self) -> &[Dim] {
        self.data.dims()
    }

    pub fn unit(&self) -> Unit {
        self.data.unit()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn insert_coord(
        &mut self,
        name: impl Into<String>,
        coord: Variable,
    ) -> Result<Option<Variable>, Error> {
        let name = name.into();
        check_coord(&self.data, &name, &coord)?;
        Ok(self.coords.insert(name, coord))
    }

    pub fn insert_mask(
        &mut self,
        name: impl Into<String>,
        mask: Variable,
    ) -> Result<Option<Variable>, Error> {
        let name = name.into();
        check_mask(&self.data, &name, &mask)?;
        Ok(self.masks.insert(name, mask))
    }

    pub fn insert_attr(
        &mut self,
        name: impl Into<String>,
        attr: Variable,
    ) -> Result<Option<Variable>, Error> {
        let name = name.into();
        check_coord(&self.data, &name, &attr)?;
        Ok(self.attrs.insert(name, attr))
    }

    pub fn remove_coord(&mut self, name: &str) -> Option<Variable> {
        self.coords.remove(name)
    }

    pub fn remove_mask(&mut self, name: &str) -> Option<Variable> {
        self.masks.remove(name)
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Variable> {
        self.attrs.remove(name)
    }

    /// A copy with exclusive storage for the data and all metadata.
    pub fn deep_copy(&self) -> DataArray {
        DataArray {
            name: self.name.clone(),
            data: self.data.deep_copy(),
            coords: self.coords.deep_copy(),
            masks: self.masks.deep_copy(),
            attrs: self.attrs.deep_copy(),
        }
    }

    /// The logical or of the masks that depend on `dim`, or `None`
    /// if there are none.
    pub(crate) fn mask_along(&self, dim: Dim) -> Result<Option<Variable>, Error> {
        let mut combined: Option<Variable> = None;
        for mask in self.masks.values().filter(|m| m.sizes().contains(dim)) {
            combined = Some(match combined {
                None => mask.deep_copy(),
                Some(acc) => ops::logical(Logical::Or, &acc, mask)?,
            });
        }
        Ok(combined)
    }

    /// `self += rhs` on the data. Views write through.
    pub fn add_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.data.add_assign(rhs)
    }

    /// `self -= rhs` on the data. Views write through.
    pub fn sub_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.data.sub_assign(rhs)
    }

    /// `self *= rhs` on the data. Views write through.
    pub fn mul_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.data.mul_assign(rhs)
    }

    /// `self /= rhs` on the data. Views write through.
    pub fn div_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.data.div_assign(rhs)
    }
}

impl From<Variable> for DataArray {
    fn from(data: Variable) -> Self {
        DataArray {
            name: String::new(),
            data,
            coords: Metadata::new(),
            masks: Metadata::new(),
            attrs: Metadata::new(),
        }
    }
}

fn check_coord(data: &Variable, name: &str, coord: &Variable) -> Result<(), Error> {
    for (dim, extent) in coord.sizes().iter() {
        let ok = match data.sizes().extent(dim) {
            Some(n) => extent == n || extent == n + 1,
            None => extent == 1 || extent == 2,
        };
        if !ok {
            return Err(Error::shape(format!(
                "coordinate {} with sizes {} does not match data sizes {}",
                name,
                coord.sizes(),
                data.sizes()
            )));
        }
    }
    if coord.dtype() == DType::Events {
        if data.dtype() != DType::Events || data.event_dim() != coord.event_dim() {
            return Err(Error::shape(format!(
                "event coordinate {} requires event data along the same dimension",
                name
            )));
        }
        let coord_lengths = coord.event_sizes()?.transpose(data.dims())?;
        if coord_lengths.values::<i64>()? != data.event_sizes()?.values::<i64>()? {
            return Err(Error::shape(format!(
                "event coordinate {} differs in per-cell length from the data",
                name
            )));
        }
    }
    Ok(())
}

fn check_mask(data: &Variable, name: &str, mask: &Variable) -> Result<(), Error> {
    if mask.dtype() != DType::Bool {
        return Err(Error::TypeMismatch {
            op: "mask",
            dtype: mask.dtype(),
        });
    }
    for (dim, extent) in mask.sizes().iter() {
        let n = data.sizes().extent(dim).ok_or(Error::DimensionNotFound {
            dim,
            sizes: data.sizes().clone(),
        })?;
        if extent != 1 && extent != n {
            return Err(Error::shape(format!(
                "mask {} with sizes {} is not broadcastable to {}",
                name,
                mask.sizes(),
                data.sizes()
            )));
        }
    }
    Ok(())
}

/// Evaluate `a op b` on data arrays. Coordinates present in both
/// operands must be identical; masks are combined with logical or;
/// attributes are kept where both operands agree.
pub fn binary(op: Arithmetic, a: &DataArray, b: &DataArray) -> Result<DataArray, Error> {
    let data = ops::binary(op, &a.data, &b.data)?;

    let mut coords = a.coords.deep_copy();
    for (name, coord) in b.coords.iter() {
        match a.coords.get(name) {
            Some(existing) if !existing.identical(coord) => {
                return Err(Error::value(format!(
                    "mismatch in coordinate {} between operands",
                    name
                )));
            }
            Some(_) => {}
            None => {
                coords.insert(name, coord.deep_copy());
            }
        }
    }

    let mut masks = a.masks.deep_copy();
    for (name, mask) in b.masks.iter() {
        let combined = match masks.remove(name) {
            Some(existing) => ops::logical(Logical::Or, &existing, mask)?,
            None => mask.deep_copy(),
        };
        masks.insert(name, combined);
    }

    let attrs = a
        .attrs
        .iter()
        .filter(|(name, attr)| b.attrs.get(name).is_some_and(|other| attr.identical(other)))
        .map(|(name, attr)| (name, attr.deep_copy()))
        .collect();

    DataArray::from_parts(a.name.clone(), data, coords, masks, attrs)
}

/// Evaluate `a op b` with a plain variable on the right. The
/// metadata of `a` carries over.
pub fn binary_with_variable(op: Arithmetic, a: &DataArray, b: &Variable) -> Result<DataArray, Error> {
    let data = ops::binary(op, &a.data, b)?;
    DataArray::from_parts(
        a.name.clone(),
        data,
        a.coords.deep_copy(),
        a.masks.deep_copy(),
        a.attrs.deep_copy(),
    )
}

macro_rules! impl_data_array_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&DataArray> for &DataArray {
            type Output = Result<DataArray, Error>;

            fn $method(self, rhs: &DataArray) -> Self::Output {
                binary($op, self, rhs)
            }
        }

        impl $trait<&Variable> for &DataArray {
            type Output = Result<DataArray, Error>;

            fn $method(self, rhs: &Variable) -> Self::Output {
                binary_with_variable($op, self, rhs)
            }
        }
    };
}

impl_data_array_op!(Add, add, Arithmetic::Add);
impl_data_array_op!(Sub, sub, Arithmetic::Sub);
impl_data_array_op!(Mul, mul, Arithmetic::Mul);
impl_data_array_op!(Div, div, Arithmetic::Div);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sizes;
    use crate::units::counts;
    use crate::units::m;

    fn x() -> Dim {
        Dim::new("x")
    }

    fn data() -> Variable {
        Variable::new(sizes!(x = 3), counts(), vec![1.0, 2.0, 3.0]).unwrap()
    }

    fn mask(values: Vec<bool>) -> Variable {
        let n = values.len();
        Variable::new(Sizes::one(x(), n), Unit::dimensionless(), values).unwrap()
    }

    #[test]
    fn test_metadata_mapping() {
        let mut meta = Metadata::new();
        assert!(meta.is_empty());
        assert!(meta.insert("b", data()).is_none());
        meta.insert("a", data());
        assert!(meta.insert("a", data()).is_some());
        assert_eq!(meta.len(), 2);
        assert!(meta.contains("a"));
        assert_eq!(meta.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(meta.remove("a").is_some());
        assert!(!meta.contains("a"));
        assert!(meta.remove("a").is_none());

        let from_vec: Metadata = vec![("x".to_string(), data())].into();
        let from_map: Metadata = BTreeMap::from([("x", data())]).into();
        assert!(from_vec.identical(&from_map));
    }

    #[test]
    fn test_coord_validation() {
        let centers = Variable::new(sizes!(x = 3), m(), vec![0.0, 1.0, 2.0]).unwrap();
        let edges = Variable::new(sizes!(x = 4), m(), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let bad = Variable::new(sizes!(x = 5), m(), vec![0.0; 5]).unwrap();
        assert!(DataArray::new(data(), [("x", centers)], Metadata::new()).is_ok());
        assert!(DataArray::new(data(), [("x", edges)], Metadata::new()).is_ok());
        assert_eq!(
            DataArray::new(data(), [("x", bad)], Metadata::new())
                .unwrap_err()
                .kind(),
            ErrorKind::ShapeMismatch
        );

        let unrelated = Variable::new(sizes!(y = 4), m(), vec![0.0; 4]).unwrap();
        assert!(DataArray::from(data()).with_coord("y", unrelated).is_err());
        let scalar = Variable::scalar(1.0, m());
        assert!(DataArray::from(data()).with_coord("s", scalar).is_ok());
    }

    #[test]
    fn test_mask_validation() {
        let da = DataArray::from(data());
        assert!(da.clone().with_mask("m", mask(vec![true, false, true])).is_ok());
        assert!(da.clone().with_mask("m", mask(vec![true])).is_ok());
        assert_eq!(
            da.clone()
                .with_mask("m", mask(vec![true, false]))
                .unwrap_err()
                .kind(),
            ErrorKind::ShapeMismatch
        );
        assert_eq!(
            da.clone().with_mask("m", data()).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        let other = Variable::new(sizes!(y = 1), Unit::dimensionless(), vec![true]).unwrap();
        assert_eq!(
            da.with_mask("m", other).unwrap_err().kind(),
            ErrorKind::Dimension
        );
    }

    #[test]
    fn test_from_events() {
        let tof = Dim::new("tof");
        let positions = Variable::events(
            sizes!(x = 2),
            tof,
            crate::units::unit("us").unwrap(),
            vec![vec![1.0, 2.0, 3.0], vec![4.0]],
        )
        .unwrap();
        let da = DataArray::from_events(positions).unwrap();
        assert_eq!(da.unit(), counts());
        assert_eq!(da.dtype(), DType::Events);
        assert!(da.coords().contains("tof"));
        assert_eq!(
            da.data().values::<Vec<f64>>().unwrap(),
            vec![vec![1.0, 1.0, 1.0], vec![1.0]]
        );

        assert_eq!(
            DataArray::from_events(data()).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_arithmetic_merges_metadata() {
        let coord = Variable::new(sizes!(x = 3), m(), vec![0.0, 1.0, 2.0]).unwrap();
        let a = DataArray::new(data(), [("x", coord.clone())], [("m", mask(vec![true, false, false]))])
            .unwrap()
            .with_name("a");
        let b = DataArray::new(data(), [("x", coord)], [("m", mask(vec![false, false, true]))]).unwrap();
        let sum = (&a + &b).unwrap();
        assert_eq!(sum.name(), "a");
        assert_eq!(sum.data().values::<f64>().unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(
            sum.masks()["m"].values::<bool>().unwrap(),
            vec![true, false, true]
        );
        // Result metadata does not alias the operands.
        assert!(!sum.coords()["x"].shares_storage(&a.coords()["x"]));

        let shifted = Variable::new(sizes!(x = 3), m(), vec![1.0, 2.0, 3.0]).unwrap();
        let c = DataArray::new(data(), [("x", shifted)], Metadata::new()).unwrap();
        assert_eq!((&a + &c).unwrap_err().kind(), ErrorKind::Value);

        let scaled = (&a * &Variable::scalar(2.0, Unit::dimensionless())).unwrap();
        assert_eq!(scaled.data().values::<f64>().unwrap(), vec![2.0, 4.0, 6.0]);
        assert!(scaled.masks().contains("m"));
    }

    #[test]
    fn test_in_place_on_slice_writes_through() {
        let da = DataArray::from(data());
        let mut cell = da.slice(x(), 1).unwrap();
        cell.add_assign(&Variable::scalar(10.0, counts())).unwrap();
        assert_eq!(da.data().values::<f64>().unwrap(), vec![1.0, 12.0, 3.0]);

        let mut copy = da.deep_copy();
        copy.mul_assign(&Variable::scalar(0.0, Unit::dimensionless())).unwrap();
        assert_eq!(da.data().values::<f64>().unwrap(), vec![1.0, 12.0, 3.0]);
    }

    #[test]
    fn test_metadata_on_slice_writes_through() {
        let da = DataArray::new(
            data(),
            [("x", Variable::new(sizes!(x = 3), m(), vec![0.0, 1.0, 2.0]).unwrap())],
            [("m", mask(vec![false, false, false]))],
        )
        .unwrap();
        let mut range = da.slice(x(), 1..3).unwrap();

        // Values of existing masks and coordinates are shared.
        range.mask_mut("m").unwrap().set_values(vec![true, false]).unwrap();
        assert_eq!(
            da.masks()["m"].values::<bool>().unwrap(),
            vec![false, true, false]
        );
        range
            .coord_mut("x")
            .unwrap()
            .assign(&Variable::scalar(5.0, m()))
            .unwrap();
        assert_eq!(da.coords()["x"].values::<f64>().unwrap(), vec![0.0, 5.0, 5.0]);
        assert!(range.mask_mut("missing").is_none());

        // The set of masks is not.
        range.insert_mask("extra", mask(vec![true, true])).unwrap();
        assert!(range.masks().contains("extra"));
        assert!(!da.masks().contains("extra"));
        range.remove_mask("m");
        assert!(da.masks().contains("m"));

        // A deep copy detaches mask values too.
        let mut copy = da.deep_copy();
        copy.mask_mut("m").unwrap().set_values(vec![true; 3]).unwrap();
        assert_eq!(
            da.masks()["m"].values::<bool>().unwrap(),
            vec![false, true, false]
        );
    }
}
