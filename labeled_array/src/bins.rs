/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Bin-edge and bin-centre coordinates.
//!
//! A coordinate along dimension `d` of data with extent `n` is either
//! a list of bin *centres* (extent `n`) or of bin *edges* (extent
//! `n + 1`). Edges must be monotonic; descending edges are flipped to
//! ascending order before they are used for range queries.

use crate::config;
use crate::dim::Dim;
use crate::error::Error;
use crate::slicing::SliceIndex;
use crate::units::Unit;
use crate::variable::Variable;

/// Whether a coordinate holds bin edges or bin centres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinKind {
    Edges,
    Centers,
}

/// Classify a coordinate extent against the data extent.
pub fn classify_extent(coord_extent: usize, data_extent: usize) -> Result<BinKind, Error> {
    if coord_extent == data_extent + 1 {
        Ok(BinKind::Edges)
    } else if coord_extent == data_extent {
        Ok(BinKind::Centers)
    } else {
        Err(Error::shape(format!(
            "coordinate extent {} is neither the data extent {} nor one more",
            coord_extent, data_extent
        )))
    }
}

/// Classify `coord` along `dim` against the data extent.
pub fn classify(coord: &Variable, dim: Dim, data_extent: usize) -> Result<BinKind, Error> {
    let extent = coord.sizes().extent(dim).ok_or(Error::DimensionNotFound {
        dim,
        sizes: coord.sizes().clone(),
    })?;
    classify_extent(extent, data_extent)
}

/// The midpoints of consecutive `edges` along `dim`.
pub fn edges_to_centers(edges: &Variable, dim: Dim) -> Result<Variable, Error> {
    let n = edges.sizes().extent(dim).ok_or(Error::DimensionNotFound {
        dim,
        sizes: edges.sizes().clone(),
    })?;
    if n == 0 {
        return Err(Error::value(format!(
            "bin edges along {} must not be empty",
            dim
        )));
    }
    let left = edges.slice(dim, SliceIndex::from(0..n - 1))?;
    let right = edges.slice(dim, SliceIndex::from(1..n))?;
    let sum = (&left + &right)?;
    &sum * &Variable::scalar(0.5, Unit::dimensionless())
}

/// `n + 1` evenly spaced edges along `dim` covering `[min, max]` with
/// a padding of [`config::EngineConfig::edge_padding`] bin widths on
/// either side.
///
/// When `min == max` the range is widened to `[v - |v|/2, v + |v|/2]`,
/// or to `[-0.5, 0.5]` if the value is zero, without further
/// padding.
///
/// The last edge always lies above `max`, so right-open bins keep the
/// largest value. Fails if `n` bins cannot be told apart at the
/// precision of the data.
pub fn make_auto_edges(min: f64, max: f64, n: usize, unit: Unit, dim: Dim) -> Result<Variable, Error> {
    if n == 0 {
        return Err(Error::value("bin count must be positive"));
    }
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(Error::value(format!(
            "invalid range [{}, {}] for automatic bin edges",
            min, max
        )));
    }
    let (lo, hi) = if min == max {
        if min == 0.0 {
            (-0.5, 0.5)
        } else {
            let half = 0.5 * min.abs();
            (min - half, min + half)
        }
    } else {
        let padding = config::global::get().edge_padding;
        let dx = (max - min) / n as f64;
        (min - padding * dx, max + padding * dx)
    };
    let hi = if hi > max { hi } else { next_up(max) };
    let edges = Variable::linspace(dim, lo, hi, n + 1, unit)?;
    if monotonic_order(&edges.read_f64("automatic bin edges")?) != Some(Order::Ascending) {
        return Err(Error::value(format!(
            "cannot place {} distinct bins in [{}, {}] at double precision",
            n, lo, hi
        )));
    }
    Ok(edges)
}

/// The least `f64` greater than the finite value `x`.
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() + 1)
    } else {
        f64::from_bits(x.to_bits() - 1)
    }
}

/// The sort order of a monotonic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Ascending,
    Descending,
}

/// The order of `values` if they are strictly monotonic. Sequences of
/// fewer than two elements count as ascending.
pub fn monotonic_order(values: &[f64]) -> Option<Order> {
    if values.len() < 2 {
        return Some(Order::Ascending);
    }
    if values.windows(2).all(|w| w[0] < w[1]) {
        Some(Order::Ascending)
    } else if values.windows(2).all(|w| w[0] > w[1]) {
        Some(Order::Descending)
    } else {
        None
    }
}

/// The values of a 1-D coordinate along `dim` and their order.
/// Fails unless the coordinate is 1-D, numeric and strictly monotonic.
pub fn monotonic_values(coord: &Variable, dim: Dim) -> Result<(Vec<f64>, Order), Error> {
    if coord.dims() != [dim] {
        return Err(Error::value(format!(
            "expected a 1-D coordinate along {}, got {}",
            dim,
            coord.sizes()
        )));
    }
    let values = coord.read_f64("monotonic check")?;
    let order = monotonic_order(&values).ok_or_else(|| {
        Error::value(format!(
            "coordinate along {} must be monotonically increasing or decreasing",
            dim
        ))
    })?;
    Ok((values, order))
}

/// `edges` in ascending order. Descending edges are reversed;
/// ascending edges are returned as a view.
pub fn normalize_edges(edges: &Variable, dim: Dim) -> Result<Variable, Error> {
    let (values, order) = monotonic_values(edges, dim)?;
    match order {
        Order::Ascending => Ok(edges.view()),
        Order::Descending => {
            tracing::debug!(%dim, edges = values.len(), "flipping descending bin edges");
            let n = edges.volume();
            let flipped = edges.read_values().gather((0..n).rev());
            let variances = edges.read_variances().map(|v| v.gather((0..n).rev()));
            Variable::from_parts(edges.sizes().clone(), edges.unit(), flipped, variances, None)
        }
    }
}
