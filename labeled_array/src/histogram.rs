/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Histogramming of event data.
//!
//! An event data array holds, per cell, a list of weights in its data
//! and a list of positions in the coordinate named after its event
//! dimension. Histogramming sums the weights of every cell into bins
//! of the positions, producing a dense array with the event dimension
//! appended as its innermost dimension and the bin edges as its
//! coordinate.
//!
//! ```
//! use labeled_array::Bins;
//! use labeled_array::DataArray;
//! use labeled_array::Dim;
//! use labeled_array::Variable;
//! use labeled_array::histogram;
//! use labeled_array::sizes;
//! use labeled_array::units::unit;
//!
//! let tof = Dim::new("tof");
//! let positions = Variable::events(
//!     sizes!(spectrum = 2),
//!     tof,
//!     unit("us").unwrap(),
//!     vec![vec![1.0, 2.0, 2.5], vec![3.5]],
//! )
//! .unwrap();
//! let events = DataArray::from_events(positions).unwrap();
//! let edges = Variable::linspace(tof, 0.0, 4.0, 3, unit("us").unwrap()).unwrap();
//! let hist = histogram(&events, Bins::Edges(edges)).unwrap();
//! assert_eq!(hist.sizes(), &sizes!(spectrum = 2, tof = 2));
//! assert_eq!(hist.data().values::<f64>().unwrap(), vec![1.0, 2.0, 0.0, 1.0]);
//! ```

use crate::bins;
use crate::broadcast;
use crate::config;
use crate::data_array::DataArray;
use crate::data_array::Metadata;
use crate::dim::Dim;
use crate::dtype::Buffer;
use crate::dtype::DType;
use crate::error::Error;
use crate::sizes::Sizes;
use crate::variable::Variable;

/// How to choose the bins of a histogram.
#[derive(Debug, Clone)]
pub enum Bins {
    /// `true` selects the configured default bin count. `false` is
    /// rejected.
    Auto(bool),
    /// This many evenly spaced bins spanning the events.
    Count(usize),
    /// Explicit edges, in the unit of the event positions.
    Values(Vec<f64>),
    /// Explicit edges along the event dimension.
    Edges(Variable),
}

impl From<bool> for Bins {
    fn from(auto: bool) -> Self {
        Bins::Auto(auto)
    }
}

impl From<usize> for Bins {
    fn from(count: usize) -> Self {
        Bins::Count(count)
    }
}

impl From<Vec<f64>> for Bins {
    fn from(values: Vec<f64>) -> Self {
        Bins::Values(values)
    }
}

impl From<&[f64]> for Bins {
    fn from(values: &[f64]) -> Self {
        Bins::Values(values.to_vec())
    }
}

impl From<Variable> for Bins {
    fn from(edges: Variable) -> Self {
        Bins::Edges(edges)
    }
}

/// Histogram `events` along its event dimension.
pub fn histogram(events: &DataArray, bins: impl Into<Bins>) -> Result<DataArray, Error> {
    let dim = event_dim(events)?;
    histogram_dim(events, dim, bins)
}

/// Histogram `events` along `dim`, which must be its event dimension.
pub fn histogram_dim(events: &DataArray, dim: Dim, bins: impl Into<Bins>) -> Result<DataArray, Error> {
    let own = event_dim(events)?;
    if own != dim {
        return Err(Error::value(format!(
            "cannot histogram along {}: the event dimension is {}",
            dim, own
        )));
    }
    let positions_var = events.coords().get(&dim.name()).ok_or_else(|| Error::NotFound {
        reason: format!("no event coordinate named {}", dim),
    })?;
    if positions_var.dtype() != DType::Events {
        return Err(Error::TypeMismatch {
            op: "histogram",
            dtype: positions_var.dtype(),
        });
    }

    let weights = events.data();
    let positions =
        positions_var.read_events_with(&broadcast::layout_for(positions_var, weights.sizes())?)?;
    let weight_values = weights.read_events_with(weights.layout())?;
    let weight_variances = weights.read_event_variances_with(weights.layout());

    let edges = make_edges(bins.into(), dim, positions_var, &positions)?;
    let edge_values = edges.read_f64("histogram")?;
    let nbins = edge_values.len() - 1;
    tracing::debug!(
        %dim,
        bins = nbins,
        lo = edge_values[0],
        hi = edge_values[nbins],
        cells = positions.len(),
        "histogramming events"
    );

    let cells = positions.len();
    let mut counts = vec![0.0; cells * nbins];
    let mut variances = weight_variances.as_ref().map(|_| vec![0.0; cells * nbins]);
    for cell in 0..cells {
        for (i, &x) in positions[cell].iter().enumerate() {
            let Some(bin) = bin_of(&edge_values, x) else {
                continue;
            };
            counts[cell * nbins + bin] += weight_values[cell][i];
            if let (Some(out), Some(vs)) = (variances.as_mut(), weight_variances.as_ref()) {
                out[cell * nbins + bin] += vs[cell][i];
            }
        }
    }

    let mut dims = weights.dims().to_vec();
    let mut extents = weights.shape().to_vec();
    dims.push(dim);
    extents.push(nbins);
    let data = Variable::from_buffer(
        Sizes::new(dims, extents)?,
        weights.unit(),
        Buffer::Float64(counts),
        variances.map(Buffer::Float64),
    )?;

    let dense = |items: &Metadata| -> Metadata {
        items
            .iter()
            .filter(|(_, v)| v.dtype() != DType::Events)
            .map(|(k, v)| (k, v.deep_copy()))
            .collect()
    };
    let mut coords = dense(events.coords());
    coords.insert(dim.name().to_string(), edges);
    DataArray::from_parts(
        events.name().to_string(),
        data,
        coords,
        dense(events.masks()),
        dense(events.attrs()),
    )
}

/// The single event dimension of `events`.
fn event_dim(events: &DataArray) -> Result<Dim, Error> {
    let data = events.data();
    let dim = data.event_dim().ok_or(Error::TypeMismatch {
        op: "histogram",
        dtype: data.dtype(),
    })?;
    let others: Vec<Dim> = events
        .coords()
        .values()
        .chain(events.attrs().values())
        .filter_map(Variable::event_dim)
        .filter(|&d| d != dim)
        .collect();
    if !others.is_empty() {
        return Err(Error::value(format!(
            "cannot histogram data with more than one event dimension: {} and {:?}",
            dim, others
        )));
    }
    Ok(dim)
}

/// The bin of `x` among ascending `edges`. Bins are closed on the
/// left and open on the right.
fn bin_of(edges: &[f64], x: f64) -> Option<usize> {
    let last = *edges.last()?;
    if x.is_nan() || x < edges[0] || x >= last {
        return None;
    }
    Some(edges.partition_point(|&e| e <= x) - 1)
}

/// Ascending edges along `dim` in the unit of `coord`.
fn make_edges(bins: Bins, dim: Dim, coord: &Variable, positions: &[Vec<f64>]) -> Result<Variable, Error> {
    let edges = match bins {
        Bins::Auto(false) => {
            return Err(Error::value("automatic binning was not requested"));
        }
        Bins::Auto(true) => {
            return auto_edges(config::global::get().default_bin_count, dim, coord, positions);
        }
        Bins::Count(n) => return auto_edges(n, dim, coord, positions),
        Bins::Values(values) => Variable::new(Sizes::one(dim, values.len()), coord.unit(), values)?,
        Bins::Edges(edges) => edges.to_unit(coord.unit())?,
    };
    if edges.sizes().extent(dim).unwrap_or(0) < 2 {
        return Err(Error::value(format!(
            "bin edges along {} need at least two values, got {}",
            dim,
            edges.sizes()
        )));
    }
    Ok(bins::normalize_edges(&edges, dim)?.deep_copy())
}

fn auto_edges(n: usize, dim: Dim, coord: &Variable, positions: &[Vec<f64>]) -> Result<Variable, Error> {
    if n == 0 {
        return Err(Error::value("bin count must be positive"));
    }
    let (lo, hi) = positions
        .iter()
        .flatten()
        .copied()
        .filter(|x| x.is_finite())
        .fold(None, |range: Option<(f64, f64)>, x| match range {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
        .ok_or_else(|| Error::value("cannot choose bins for data without finite events"))?;
    bins::make_auto_edges(lo, hi, n, coord.unit(), dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLayer;
    use crate::error::ErrorKind;
    use crate::sizes;
    use crate::units::Unit;
    use crate::units::counts;
    use crate::units::s;
    use crate::units::unit;

    fn tof() -> Dim {
        Dim::new("tof")
    }

    fn events(cells: Vec<Vec<f64>>) -> DataArray {
        let n = cells.len();
        let positions = Variable::events(Sizes::one(Dim::new("x"), n), tof(), s(), cells).unwrap();
        DataArray::from_events(positions).unwrap()
    }

    fn padded() -> ConfigLayer {
        ConfigLayer {
            edge_padding: Some(0.5),
            ..Default::default()
        }
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_count_bins_keep_every_event() {
        let lock = config::global::lock();
        let _guard = lock.override_config(padded());
        let hist = histogram(&events(vec![vec![1.0, 2.0, 2.0, 3.0, 9.0]]), Bins::Count(4)).unwrap();
        assert_eq!(hist.sizes(), &sizes!(x = 1, tof = 4));
        assert_eq!(hist.unit(), counts());
        assert_eq!(
            hist.coords()["tof"].values::<f64>().unwrap(),
            vec![0.0, 2.5, 5.0, 7.5, 10.0]
        );
        let values = hist.data().values::<f64>().unwrap();
        assert_eq!(values, vec![3.0, 1.0, 0.0, 1.0]);
        assert_eq!(values.iter().sum::<f64>(), 5.0);
        assert!(logs_contain("histogramming events"));
    }

    #[test]
    fn test_auto_uses_configured_bin_count() {
        let lock = config::global::lock();
        let _guard = lock.override_config(ConfigLayer {
            default_bin_count: Some(3),
            ..padded()
        });
        let hist = histogram(&events(vec![vec![0.0], vec![3.0]]), true).unwrap();
        assert_eq!(hist.sizes(), &sizes!(x = 2, tof = 3));
        assert_eq!(
            hist.data().values::<f64>().unwrap(),
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_global_range_skips_empty_cells() {
        let lock = config::global::lock();
        let _guard = lock.override_config(padded());
        let hist = histogram(&events(vec![vec![], vec![2.0, 4.0]]), Bins::Count(2)).unwrap();
        assert_eq!(
            hist.coords()["tof"].values::<f64>().unwrap(),
            vec![1.5, 3.0, 4.5]
        );
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_count_bins_keep_the_largest_event() {
        let lock = config::global::lock();
        let _guard = lock.override_config(ConfigLayer {
            edge_padding: Some(0.0),
            ..Default::default()
        });
        let hist = histogram(&events(vec![vec![1.0, 1.5, 3.0]]), Bins::Count(2)).unwrap();
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![2.0, 1.0]);

        let large = events(vec![vec![1e16, 1e16 + 2.0]]);
        let hist = histogram(&large, Bins::Count(1)).unwrap();
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![2.0]);
        assert_eq!(
            histogram(&large, Bins::Count(4)).unwrap_err().kind(),
            ErrorKind::Value
        );
    }

    #[test]
    fn test_explicit_edges() {
        let data = events(vec![vec![0.5, 1.5, 1.7, 5.0, -1.0]]);
        let hist = histogram(&data, vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![1.0, 2.0]);

        // Descending edges are flipped.
        let hist = histogram(&data, vec![2.0, 1.0, 0.0]).unwrap();
        assert_eq!(hist.coords()["tof"].values::<f64>().unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![1.0, 2.0]);

        // Edges in a compatible unit are converted.
        let ms = Variable::new(sizes!(tof = 3), unit("ms").unwrap(), vec![0.0, 1000.0, 2000.0])
            .unwrap();
        let hist = histogram(&data, Bins::Edges(ms)).unwrap();
        assert_eq!(hist.coords()["tof"].unit(), s());
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_weights_and_variances() {
        let positions = Variable::events(sizes!(x = 1), tof(), s(), vec![vec![0.5, 0.6, 1.5]]).unwrap();
        let weights = Variable::events(sizes!(x = 1), tof(), counts(), vec![vec![2.0, 3.0, 4.0]])
            .unwrap()
            .with_variances(vec![vec![1.0, 1.0, 2.0]])
            .unwrap();
        let data = DataArray::new(weights, [("tof", positions)], Metadata::new()).unwrap();
        let hist = histogram(&data, vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(hist.data().values::<f64>().unwrap(), vec![5.0, 4.0]);
        assert_eq!(hist.data().variances::<f64>().unwrap(), Some(vec![2.0, 2.0]));
    }

    #[test]
    fn test_keeps_dense_metadata() {
        let mask = Variable::new(sizes!(x = 2), Unit::dimensionless(), vec![false, true]).unwrap();
        let label = Variable::new(sizes!(x = 2), Unit::dimensionless(), vec![7i64, 8]).unwrap();
        let data = events(vec![vec![0.5], vec![1.5]])
            .with_mask("dead", mask)
            .unwrap()
            .with_coord("x", label)
            .unwrap()
            .with_name("detector");
        let hist = histogram(&data, vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(hist.name(), "detector");
        assert!(hist.masks().contains("dead"));
        assert!(hist.coords().contains("x"));
        assert_eq!(hist.coords()["tof"].dtype(), DType::Float64);
    }

    #[test]
    fn test_errors() {
        let lock = config::global::lock();
        let _guard = lock.override_config(padded());
        let data = events(vec![vec![1.0, 2.0]]);
        assert_eq!(histogram(&data, false).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(histogram(&data, Bins::Count(0)).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(histogram(&data, vec![1.0]).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(
            histogram(&data, vec![0.0, 2.0, 1.0]).unwrap_err().kind(),
            ErrorKind::Value
        );
        let metres = Variable::new(sizes!(tof = 2), unit("m").unwrap(), vec![0.0, 1.0]).unwrap();
        assert_eq!(
            histogram(&data, Bins::Edges(metres)).unwrap_err().kind(),
            ErrorKind::UnitMismatch
        );
        assert_eq!(
            histogram_dim(&data, Dim::new("x"), Bins::Count(2)).unwrap_err().kind(),
            ErrorKind::Value
        );

        let nothing = events(vec![vec![], vec![f64::NAN]]);
        assert_eq!(histogram(&nothing, Bins::Count(2)).unwrap_err().kind(), ErrorKind::Value);

        let dense = DataArray::from(Variable::new(sizes!(x = 1), counts(), vec![1.0]).unwrap());
        assert_eq!(
            histogram(&dense, Bins::Count(2)).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_bin_of() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(bin_of(&edges, 0.0), Some(0));
        assert_eq!(bin_of(&edges, 1.0), Some(1));
        assert_eq!(bin_of(&edges, 1.999), Some(1));
        assert_eq!(bin_of(&edges, 2.0), None);
        assert_eq!(bin_of(&edges, -0.1), None);
        assert_eq!(bin_of(&edges, f64::NAN), None);
    }
}
