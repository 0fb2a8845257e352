/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! End-to-end properties of the labeled array engine.

use labeled_array::Bins;
use labeled_array::DataArray;
use labeled_array::Dim;
use labeled_array::ErrorKind;
use labeled_array::Metadata;
use labeled_array::Ownership;
use labeled_array::Sizes;
use labeled_array::Variable;
use labeled_array::bins;
use labeled_array::config::ConfigLayer;
use labeled_array::config::global;
use labeled_array::histogram;
use labeled_array::identical;
use labeled_array::reduce;
use labeled_array::reduction;
use labeled_array::sizes;
use labeled_array::units::Unit;
use labeled_array::units::unit;
use proptest::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn x() -> Dim {
    Dim::new("x")
}

fn m() -> Unit {
    unit("m").unwrap()
}

fn line(values: Vec<f64>) -> Variable {
    Variable::new(Sizes::one(x(), values.len()), m(), values).unwrap()
}

/// Run `f` with half-bin edge padding, whatever the environment says.
fn with_half_bin_padding<R>(f: impl FnOnce() -> R) -> R {
    let lock = global::lock();
    let _guard = lock.override_config(ConfigLayer {
        edge_padding: Some(0.5),
        ..Default::default()
    });
    f()
}

#[test]
fn reduce_pair_matches_addition() -> anyhow::Result<()> {
    let a = line(vec![1.0, 2.0, 3.0]);
    let b = line(vec![10.0, 20.0, 30.0]);
    let reduced = reduce([a.clone(), b.clone()])?.sum()?;
    let added = (&a + &b)?;
    assert_eq!(reduced.values::<f64>()?, added.values::<f64>()?);
    assert_eq!(reduced.unit(), added.unit());
    Ok(())
}

#[test]
fn reduce_pair_matches_addition_on_random_input() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);
    for _ in 0..32 {
        let n = rng.gen_range(1..8);
        let a = line((0..n).map(|_| rng.gen_range(-1e3..1e3)).collect());
        let b = line((0..n).map(|_| rng.gen_range(-1e3..1e3)).collect());
        let reduced = reduce([a.clone(), b.clone()]).unwrap().sum().unwrap();
        assert_eq!(
            reduced.values::<f64>().unwrap(),
            (&a + &b).unwrap().values::<f64>().unwrap()
        );
    }
}

#[test]
fn auto_edges_pad_by_half_a_bin() {
    let edges = with_half_bin_padding(|| bins::make_auto_edges(0.0, 10.0, 5, m(), x()).unwrap());
    assert_eq!(edges.sizes(), &sizes!(x = 6));
    let centers = bins::edges_to_centers(&edges, x()).unwrap();
    let values = centers.values::<f64>().unwrap();
    assert_eq!(values.len(), 5);
    assert!(values.iter().all(|&c| -1.0 < c && c < 11.0));
}

#[test]
fn auto_edges_widen_degenerate_ranges() {
    let (five, zero) = with_half_bin_padding(|| {
        (
            bins::make_auto_edges(5.0, 5.0, 4, m(), x()).unwrap(),
            bins::make_auto_edges(0.0, 0.0, 4, m(), x()).unwrap(),
        )
    });
    let five = five.values::<f64>().unwrap();
    assert_eq!((five[0], five[4]), (2.5, 7.5));
    let zero = zero.values::<f64>().unwrap();
    assert_eq!((zero[0], zero[4]), (-0.5, 0.5));
}

#[test]
fn slicing_keeps_bracketing_edges() -> anyhow::Result<()> {
    let edges = vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0];
    let da = DataArray::new(
        line(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        [("x", line(edges.clone()))],
        Metadata::new(),
    )?;

    let point = da.slice(x(), 2)?;
    assert_eq!(point.sizes(), &Sizes::scalar());
    assert_eq!(point.coords()["x"].values::<f64>()?, edges[2..4].to_vec());

    let range = da.slice(x(), 1..3)?;
    assert_eq!(range.sizes(), &sizes!(x = 2));
    assert_eq!(range.coords()["x"].values::<f64>()?, edges[1..4].to_vec());

    assert_eq!(da.slice(x(), 5).unwrap_err().kind(), ErrorKind::Index);
    assert_eq!(da.slice(Dim::new("y"), 0).unwrap_err().kind(), ErrorKind::Dimension);
    Ok(())
}

#[test]
fn reduce_scalar_slices_with_variances() -> anyhow::Result<()> {
    let slices: Vec<Variable> = [1.0, 2.0, 3.0]
        .into_iter()
        .map(|v| line(vec![v]).with_variances(vec![1.0]))
        .collect::<Result<_, _>>()?;
    let reducer = reduce(slices)?;

    let total = reducer.sum()?;
    assert_eq!(total.values::<f64>()?, vec![6.0]);
    assert_eq!(total.variances::<f64>()?, Some(vec![3.0]));

    let avg = reducer.mean()?;
    assert_eq!(avg.values::<f64>()?, vec![2.0]);
    assert_eq!(avg.variances::<f64>()?, Some(vec![3.0 / 9.0]));

    // Reducing a stacked variable gives the same scalar.
    let stacked = line(vec![1.0, 2.0, 3.0]).with_variances(vec![1.0; 3])?;
    let direct = reduction::sum(&stacked, x())?;
    assert_eq!(direct.value::<f64>()?, 6.0);
    assert_eq!(direct.variance::<f64>()?, Some(3.0));
    Ok(())
}

#[test]
fn nan_aware_reduction_over_slices() -> anyhow::Result<()> {
    let slices = [1.0, f64::NAN, 3.0].map(|v| line(vec![v]));
    let reducer = reduce(slices)?;
    assert_eq!(reducer.nansum()?.values::<f64>()?, vec![4.0]);
    assert_eq!(reducer.nanmean()?.values::<f64>()?, vec![2.0]);
    assert_eq!(reducer.nanmax()?.values::<f64>()?, vec![3.0]);
    assert!(reducer.sum()?.values::<f64>()?[0].is_nan());
    Ok(())
}

#[test]
fn histogram_keeps_every_event() -> anyhow::Result<()> {
    let positions = Variable::events(
        Sizes::scalar(),
        Dim::new("tof"),
        unit("us")?,
        vec![vec![1.0, 2.0, 2.0, 3.0, 9.0]],
    )?;
    let events = DataArray::from_events(positions)?;
    let hist = with_half_bin_padding(|| histogram(&events, Bins::Count(4)))?;

    let edges = hist.coords()["tof"].values::<f64>()?;
    assert_eq!(edges.len(), 5);
    assert_eq!((edges[0], edges[4]), (0.0, 10.0));

    let counts = hist.data().values::<f64>()?;
    assert_eq!(counts.iter().sum::<f64>(), 5.0);
    assert!(counts.iter().all(|&c| c >= 0.0 && c.fract() == 0.0));
    assert!(hist.unit().is_counts());
    Ok(())
}

#[test]
fn alignment_failures() {
    let three = line(vec![0.0; 3]);
    let four = line(vec![0.0; 4]);
    assert_eq!((&three + &four).unwrap_err().kind(), ErrorKind::ShapeMismatch);

    let seconds = Variable::new(sizes!(x = 3), unit("s").unwrap(), vec![0.0; 3]).unwrap();
    assert_eq!((&three + &seconds).unwrap_err().kind(), ErrorKind::UnitMismatch);
}

#[test]
fn views_write_through_and_deep_copies_detach() -> anyhow::Result<()> {
    let parent = line(vec![1.0, 2.0, 3.0]);
    let mut view = parent.slice(x(), 1..3)?;
    assert_eq!(view.ownership(), Ownership::View);
    assert!(view.shares_storage(&parent));

    view.add_assign(&Variable::scalar(10.0, m()))?;
    assert_eq!(parent.values::<f64>()?, vec![1.0, 12.0, 13.0]);

    let mut detached = parent.slice(x(), 1..3)?.deep_copy();
    assert_eq!(detached.ownership(), Ownership::Owned);
    detached.add_assign(&Variable::scalar(100.0, m()))?;
    assert_eq!(parent.values::<f64>()?, vec![1.0, 12.0, 13.0]);
    assert_eq!(detached.values::<f64>()?, vec![112.0, 113.0]);
    Ok(())
}

#[test]
fn identical_compares_everything() -> anyhow::Result<()> {
    let da = DataArray::new(
        line(vec![1.0, 2.0]),
        [("x", line(vec![0.0, 1.0, 2.0]))],
        [(
            "mask",
            Variable::new(sizes!(x = 2), Unit::dimensionless(), vec![false, true])?,
        )],
    )?;
    assert!(identical(&da, &da.deep_copy()));
    let mut renamed = da.deep_copy();
    renamed.set_name("other");
    assert!(!identical(&da, &renamed));
    Ok(())
}

proptest! {
    #[test]
    fn histogram_conserves_finite_events(
        cells in prop::collection::vec(prop::collection::vec(-100i32..100, 0..6), 1..4),
        nbins in 1usize..12,
    ) {
        let total: usize = cells.iter().map(Vec::len).sum();
        prop_assume!(total > 0);
        let n = cells.len();
        let lists = cells
            .into_iter()
            .map(|cell| cell.into_iter().map(f64::from).collect())
            .collect();
        let positions = Variable::events(Sizes::one(x(), n), Dim::new("tof"), m(), lists).unwrap();
        let events = DataArray::from_events(positions).unwrap();
        let hist = with_half_bin_padding(|| histogram(&events, Bins::Count(nbins))).unwrap();
        prop_assert_eq!(hist.sizes().extent(Dim::new("tof")), Some(nbins));
        let counted: f64 = hist.data().values::<f64>().unwrap().iter().sum();
        prop_assert_eq!(counted, total as f64);
    }

    #[test]
    fn sum_over_dim_equals_sum_of_point_slices(
        values in prop::collection::vec(-1000i32..1000, 1..10),
    ) {
        let v = line(values.iter().copied().map(f64::from).collect());
        let slices: Vec<Variable> = (0..values.len()).map(|i| v.slice(x(), i).unwrap()).collect();
        let via_slices = reduce(slices).unwrap().sum().unwrap();
        let direct = reduction::sum(&v, x()).unwrap();
        prop_assert!(identical(&via_slices, &direct));
        prop_assert_eq!(direct.value::<f64>().unwrap(), values.iter().map(|&v| f64::from(v)).sum::<f64>());
    }
}
