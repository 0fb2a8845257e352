/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for [`Sizes`] and [`Variable`].
//!
//! These strategies are used in `proptest`-based tests to construct
//! randomized labeled arrays for testing broadcasting, slicing and
//! reduction.
//!
//! Example usage:
//!
//! ```
//! use proptest::prelude::*;
//!
//! use crate::strategy::gen_variable;
//!
//! proptest! {
//!     #[test]
//!     fn test_variable(v in gen_variable(3, 4)) {
//!         // Use `v` as input
//!     }
//! }
//! ```
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::dim::Dim;
use crate::sizes::Sizes;
use crate::units::Unit;
use crate::variable::Variable;

/// Labels drawn by the generators.
const LABELS: [&str; 4] = ["x", "y", "z", "t"];

/// Small integral values, so that sums are exact in any order.
fn gen_element() -> impl Strategy<Value = f64> {
    (-50i32..50).prop_map(f64::from)
}

/// Generates random [`Sizes`] with between 1 and `max_dims`
/// dimensions in random order, each with an extent between 1 and
/// `max_len` (inclusive).
pub fn gen_sizes(max_dims: usize, max_len: usize) -> impl Strategy<Value = Sizes> {
    assert!(max_dims <= LABELS.len(), "at most {} dimensions", LABELS.len());
    prop::sample::subsequence(LABELS.to_vec(), 1..=max_dims)
        .prop_shuffle()
        .prop_flat_map(move |labels| {
            let n = labels.len();
            prop::collection::vec(1..=max_len, n).prop_map(move |extents| {
                let dims = labels.iter().copied().map(Dim::new).collect();
                Sizes::new(dims, extents).unwrap()
            })
        })
}

fn gen_variable_of(sizes: Sizes) -> impl Strategy<Value = Variable> {
    let n = sizes.volume();
    (
        Just(sizes),
        prop::collection::vec(gen_element(), n),
        prop::option::of(prop::collection::vec(0u8..10, n)),
    )
        .prop_map(|(sizes, values, variances)| {
            let var = Variable::new(sizes, Unit::dimensionless(), values).unwrap();
            match variances {
                Some(variances) => var
                    .with_variances(variances.into_iter().map(f64::from).collect::<Vec<f64>>())
                    .unwrap(),
                None => var,
            }
        })
}

/// Generates a random `float64` [`Variable`] over [`gen_sizes`],
/// with variances about half of the time.
pub fn gen_variable(max_dims: usize, max_len: usize) -> impl Strategy<Value = Variable> {
    gen_sizes(max_dims, max_len).prop_flat_map(gen_variable_of)
}

/// Generates a random [`Variable`] along with one of its dimensions.
pub fn gen_variable_and_dim(
    max_dims: usize,
    max_len: usize,
) -> impl Strategy<Value = (Variable, Dim)> {
    gen_variable(max_dims, max_len).prop_flat_map(|var| {
        let dims = var.dims().to_vec();
        (Just(var), prop::sample::select(dims))
    })
}

/// Generates a variable over a random subset of `common`'s
/// dimensions, in random order.
fn gen_broadcastable(common: &Sizes) -> impl Strategy<Value = Variable> {
    let entries: Vec<(Dim, usize)> = common.iter().collect();
    let n = entries.len();
    prop::sample::subsequence(entries, 0..=n)
        .prop_shuffle()
        .prop_flat_map(|entries| {
            let (dims, extents): (Vec<Dim>, Vec<usize>) = entries.into_iter().unzip();
            let sizes = Sizes::new(dims, extents).unwrap();
            let n = sizes.volume();
            (Just(sizes), prop::collection::vec(gen_element(), n))
        })
        .prop_map(|(sizes, values)| Variable::new(sizes, Unit::dimensionless(), values).unwrap())
}

/// Generates two variables that broadcast against each other: each
/// spans a random subset of a common set of dimensions, in its own
/// order.
pub fn gen_broadcast_pair(
    max_dims: usize,
    max_len: usize,
) -> impl Strategy<Value = (Variable, Variable)> {
    gen_sizes(max_dims, max_len)
        .prop_flat_map(|common| (gen_broadcastable(&common), gen_broadcastable(&common)))
}

#[cfg(test)]
mod tests {
    use proptest::strategy::ValueTree;
    use proptest::test_runner::Config;
    use proptest::test_runner::TestRunner;

    use super::*;
    use crate::identical::identical;
    use crate::reduction;

    #[test]
    fn print_some_variables() {
        let mut runner = TestRunner::new(Config::default());

        for _ in 0..5 {
            let strat = gen_variable(3, 4);
            let value = strat.new_tree(&mut runner).unwrap().current();
            println!("{:?}", value);
        }
    }

    proptest! {
        #[test]
        fn test_sizes_properties(sizes in gen_sizes(4, 8)) {
            prop_assert!(sizes.ndim() >= 1);
            prop_assert!(sizes.extents().iter().all(|&e| (1..=8).contains(&e)));
        }

        #[test]
        fn test_broadcast_symmetry((a, b) in gen_broadcast_pair(3, 4)) {
            let ab = (&a + &b).unwrap();
            let ba = (&b + &a).unwrap();
            prop_assert!(ab.sizes().same_set(ba.sizes()));
            prop_assert!(identical(&ab, &ba.transpose(ab.dims()).unwrap()));
        }

        #[test]
        fn test_broadcast_result_contains_operands((a, b) in gen_broadcast_pair(3, 4)) {
            let ab = (&a * &b).unwrap();
            prop_assert!(a.sizes().includes_in(ab.sizes()));
            prop_assert!(b.sizes().includes_in(ab.sizes()));
        }

        #[test]
        fn test_range_then_point((v, dim) in gen_variable_and_dim(3, 5)) {
            let n = v.sizes().extent(dim).unwrap();
            for begin in 0..n {
                let range = v.slice(dim, begin..n).unwrap();
                prop_assert_eq!(range.sizes().extent(dim), Some(n - begin));
                for k in 0..n - begin {
                    let point = range.slice(dim, k).unwrap();
                    prop_assert!(identical(&point, &v.slice(dim, begin + k).unwrap()));
                }
            }
        }

        #[test]
        fn test_reduce_slices_matches_direct((v, dim) in gen_variable_and_dim(3, 4)) {
            let n = v.sizes().extent(dim).unwrap();
            let slices: Vec<Variable> = (0..n).map(|i| v.slice(dim, i).unwrap()).collect();
            let reducer = reduction::reduce(slices).unwrap();
            prop_assert!(identical(&reducer.sum().unwrap(), &reduction::sum(&v, dim).unwrap()));
            prop_assert!(identical(&reducer.mean().unwrap(), &reduction::mean(&v, dim).unwrap()));
            prop_assert!(identical(&reducer.min().unwrap(), &reduction::min(&v, dim).unwrap()));
            prop_assert!(identical(&reducer.max().unwrap(), &reduction::max(&v, dim).unwrap()));
        }
    }
}
