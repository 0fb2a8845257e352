/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Labeled multi-dimensional arrays.
//!
//! A [`Variable`] is a strided array whose dimensions are identified by
//! name rather than position, carrying a physical [`Unit`] and
//! optional per-element variances. A [`DataArray`] pairs a data
//! variable with coordinates, masks and attributes, where a
//! coordinate along a dimension holds either bin centres or bin
//! edges.
//!
//! Operations align operands by dimension name and broadcast missing
//! dimensions; units and variances propagate through arithmetic and
//! [`reduction`]s. Slicing produces views that share storage with
//! their parent. Event data, holding a ragged list of samples per
//! cell, is turned into dense counts by [`histogram`].
//!
//! ```
//! use labeled_array::Dim;
//! use labeled_array::Variable;
//! use labeled_array::reduction;
//! use labeled_array::sizes;
//! use labeled_array::units::unit;
//!
//! let a = Variable::new(sizes!(x = 2, y = 3), unit("m").unwrap(), vec![1.0; 6]).unwrap();
//! let b = Variable::new(sizes!(y = 3), unit("m").unwrap(), vec![1.0, 2.0, 3.0]).unwrap();
//! let c = (&a + &b).unwrap();
//! assert_eq!(c.sizes(), a.sizes());
//! let total = reduction::sum(&c, Dim::new("x")).unwrap();
//! assert_eq!(total.values::<f64>().unwrap(), vec![4.0, 6.0, 8.0]);
//! ```

mod slice;
pub use slice::Slice;
pub use slice::SliceError;
pub use slice::SliceIterator;

/// Dimension labels.
pub mod dim;
pub use dim::Dim;

/// Ordered dimension-to-extent mappings.
pub mod sizes;
pub use sizes::Sizes;
pub use sizes::SizesError;

/// Physical units and their algebra.
pub mod units;
pub use units::Unit;

/// Element types and typed storage.
pub mod dtype;
pub use dtype::DType;

/// The crate error taxonomy.
pub mod error;
pub use error::Error;
pub use error::ErrorKind;

/// Labeled arrays with units and variances.
pub mod variable;
pub use variable::Ownership;
pub use variable::Variable;

/// Alignment of operands by dimension name.
pub mod broadcast;

/// Elementwise arithmetic, comparison and logical operations.
pub mod ops;

/// Variance propagation rules.
pub mod variance;

/// Bin-edge and bin-centre coordinates.
pub mod bins;

/// Data arrays with coordinates, masks and attributes.
pub mod data_array;
pub use data_array::DataArray;
pub use data_array::Metadata;

/// Index, range and value-based slicing.
pub mod slicing;
pub use slicing::Range;
pub use slicing::SliceIndex;

/// Reductions over dimensions and over sequences of slices.
pub mod reduction;
pub use reduction::reduce;

/// Histogramming of event data.
pub mod histogram;
pub use histogram::Bins;
pub use histogram::histogram;

/// Deep structural equality.
pub mod identical;
pub use identical::Identical;
pub use identical::identical;

/// Engine configuration.
pub mod config;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
