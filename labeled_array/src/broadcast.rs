/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Broadcasting and alignment.
//!
//! Operands are aligned by dimension *label*, never by position. The
//! merged dimension list is the union of the operands' labels: the
//! first operand's order is kept, and each label new to the merge is
//! inserted right after the previous label of the operand it came
//! from (or right before the next one, if it leads).
//!
//! For each label the target extent is the unique non-1 extent among
//! the operands carrying it. An operand that lacks a label, or has
//! extent 1 along it, is iterated with stride 0 along that label.

use crate::dim::Dim;
use crate::error::Error;
use crate::sizes::Sizes;
use crate::slice::Slice;
use crate::variable::Variable;

/// An iteration plan over merged sizes: one strided layout per
/// operand, each addressing that operand's storage in the row-major
/// order of `sizes`.
#[derive(Debug, Clone)]
pub struct Plan {
    pub sizes: Sizes,
    pub layouts: Vec<Slice>,
}

/// The union of `operands`, with broadcast extents.
pub fn merge_sizes(operands: &[&Sizes]) -> Result<Sizes, Error> {
    let mut dims: Vec<Dim> = Vec::new();
    for sizes in operands {
        let mut previous: Option<usize> = None;
        for (i, dim) in sizes.dims().iter().enumerate() {
            if let Some(pos) = dims.iter().position(|d| d == dim) {
                previous = Some(pos);
                continue;
            }
            let pos = match previous {
                Some(p) => p + 1,
                None => sizes.dims()[i + 1..]
                    .iter()
                    .find_map(|next| dims.iter().position(|d| d == next))
                    .unwrap_or(dims.len()),
            };
            dims.insert(pos, *dim);
            previous = Some(pos);
        }
    }

    let mut extents = Vec::with_capacity(dims.len());
    for dim in &dims {
        let mut extent: Option<usize> = None;
        for sizes in operands {
            match (sizes.extent(*dim), extent) {
                (None, _) | (Some(1), _) => {}
                (Some(e), None) => extent = Some(e),
                (Some(e), Some(f)) if e == f => {}
                (Some(e), Some(f)) => {
                    return Err(Error::shape(format!(
                        "conflicting extents {} and {} for dimension {}",
                        f, e, dim
                    )));
                }
            }
        }
        extents.push(extent.unwrap_or(1));
    }
    Ok(Sizes::new(dims, extents)?)
}

/// The layout iterating `var`'s storage over `target`, with stride 0
/// along dimensions it broadcasts over. Every dimension of `var`
/// must appear in `target` with the same extent, or have extent 1.
pub fn layout_for(var: &Variable, target: &Sizes) -> Result<Slice, Error> {
    let own = var.layout();
    for (dim, extent) in var.sizes().iter() {
        match target.extent(dim) {
            Some(e) if e == extent || extent == 1 => {}
            Some(e) => {
                return Err(Error::shape(format!(
                    "cannot broadcast extent {} of dimension {} to {}",
                    extent, dim, e
                )));
            }
            None if extent == 1 => {}
            None => {
                return Err(Error::shape(format!(
                    "dimension {} of {} is missing from {}",
                    dim,
                    var.sizes(),
                    target
                )));
            }
        }
    }
    let strides = target
        .iter()
        .map(|(dim, extent)| match var.sizes().position(dim) {
            Some(i) if var.shape()[i] == extent => own.strides()[i],
            _ => 0,
        })
        .collect();
    Ok(Slice::new(own.offset(), target.extents().to_vec(), strides)?)
}

/// Plan a joint iteration over `operands`.
pub fn plan(operands: &[&Variable]) -> Result<Plan, Error> {
    let sizes = merge_sizes(&operands.iter().map(|v| v.sizes()).collect::<Vec<_>>())?;
    let layouts = operands
        .iter()
        .map(|v| layout_for(v, &sizes))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Plan { sizes, layouts })
}
