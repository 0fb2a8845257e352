/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Propagation of uncertainties.
//!
//! Each function computes the output variance of one operation from
//! the values and variances of its inputs, assuming independent
//! inputs. An input without variances contributes zero.

/// Variance of `a + b` or `a - b`.
pub fn add(va: f64, vb: f64) -> f64 {
    va + vb
}

/// Variance of `a * b`.
pub fn mul(a: f64, va: f64, b: f64, vb: f64) -> f64 {
    va * b * b + vb * a * a
}

/// Variance of `a / b`.
pub fn div(a: f64, va: f64, b: f64, vb: f64) -> f64 {
    let b2 = b * b;
    va / b2 + vb * a * a / (b2 * b2)
}

/// Variance of `a^n`.
pub fn powi(a: f64, va: f64, n: i32) -> f64 {
    let d = n as f64 * a.powi(n - 1);
    va * d * d
}

/// Variance of `sqrt(a)`.
pub fn sqrt(a: f64, va: f64) -> f64 {
    va / (4.0 * a)
}

/// Variance of a sum over `variances`.
pub fn sum(variances: impl IntoIterator<Item = f64>) -> f64 {
    variances.into_iter().sum()
}

/// Variance of the mean of `count` values whose variances are
/// `variances`.
pub fn mean(variances: impl IntoIterator<Item = f64>, count: usize) -> f64 {
    let n = count as f64;
    sum(variances) / (n * n)
}

/// Variance of a selecting reduction (`min`, `max`): the variance of
/// the selected element, or NaN when nothing was selected.
pub fn selected(variance: Option<f64>) -> f64 {
    variance.unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        assert_eq!(add(1.0, 2.0), 3.0);
        // (2 ± 1) * (3 ± 2): 1 * 9 + 2 * 4
        assert_eq!(mul(2.0, 1.0, 3.0, 2.0), 17.0);
        // (2 ± 1) / (4 ± 2): 1 / 16 + 2 * 4 / 256
        assert_eq!(div(2.0, 1.0, 4.0, 2.0), 0.09375);
        assert_eq!(powi(3.0, 1.0, 2), 36.0);
        assert_eq!(sqrt(4.0, 16.0), 1.0);
    }

    #[test]
    fn test_reductions() {
        assert_eq!(sum([1.0, 1.0, 1.0]), 3.0);
        assert_eq!(mean([1.0, 1.0, 1.0], 3), 3.0 / 9.0);
        assert_eq!(selected(Some(0.5)), 0.5);
        assert!(selected(None).is_nan());
        assert!(mean(std::iter::empty(), 0).is_nan());
    }
}
