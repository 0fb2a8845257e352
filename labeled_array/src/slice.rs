/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use serde::Deserialize;
use serde::Serialize;

/// The type of error for slice operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SliceError {
    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    #[error("index {index} out of range {total}")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("invalid range: {begin}..{end} (step {step})")]
    InvalidRange {
        begin: usize,
        end: usize,
        step: usize,
    },

    #[error("dimension {dim} out of range for {ndims}-dimensional slice")]
    DimensionOutOfRange { dim: usize, ndims: usize },
}

/// Slice is a compact representation of indices into the flat
/// storage of an n-dimensional array. Given an offset, sizes of each
/// dimension, and strides for each dimension, Slice computes indices
/// into the flat buffer.
///
/// For example, the following describes a dense 4x4x4 array in
/// row-major order:
/// ```
/// # use labeled_array::Slice;
/// let s = Slice::new(0, vec![4, 4, 4], vec![16, 4, 1]).unwrap();
/// assert!(s.iter().eq(0..(4 * 4 * 4)));
/// ```
///
/// Every view of an array is a slice over its parent's buffer:
/// fixing an index drops a dimension and moves the offset, selecting
/// a range shrinks a size and scales a stride. A stride of 0 repeats
/// the same element along a dimension, which is how broadcasting
/// iterates an operand that lacks a dimension.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Slice {
    offset: usize,
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl Slice {
    /// Create a new Slice with the provided offset, sizes, and
    /// strides. Sizes and strides must have the same length. Strides
    /// may repeat or be zero; a zero stride broadcasts.
    pub fn new(offset: usize, sizes: Vec<usize>, strides: Vec<usize>) -> Result<Self, SliceError> {
        if sizes.len() != strides.len() {
            return Err(SliceError::InvalidDims {
                expected: sizes.len(),
                got: strides.len(),
            });
        }
        Ok(Slice {
            offset,
            sizes,
            strides,
        })
    }

    /// Create a new slice of the given sizes in row-major order.
    pub fn new_row_major(sizes: impl Into<Vec<usize>>) -> Self {
        let sizes = sizes.into();
        // "flip it and reverse it" --Missy Elliott
        let mut strides: Vec<usize> = sizes.clone();
        let _ = strides.iter_mut().rev().fold(1, |acc, n| {
            let next = *n * acc;
            *n = acc;
            next
        });
        Self {
            offset: 0,
            sizes,
            strides,
        }
    }

    /// The number of dimensions in this slice.
    pub fn num_dim(&self) -> usize {
        self.sizes.len()
    }

    /// This is the offset from which the first value in the Slice begins.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The shape of the slice; that is, the size of each dimension.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The strides of the slice; that is, the distance between each
    /// element at a given index in the underlying array.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Select a single index along a dimension, removing that
    /// dimension entirely.
    ///
    /// The fixed coordinate's contribution (index × stride) is
    /// absorbed into the base offset, while the remaining dimensions
    /// keep their original strides.
    ///
    /// # Errors
    /// * `DimensionOutOfRange` if `dim >= self.num_dim()`
    /// * `IndexOutOfRange` if `index >= self.sizes[dim]`
    pub fn at(&self, dim: usize, index: usize) -> Result<Self, SliceError> {
        if dim >= self.sizes.len() {
            return Err(SliceError::DimensionOutOfRange {
                dim,
                ndims: self.num_dim(),
            });
        }
        if index >= self.sizes[dim] {
            return Err(SliceError::IndexOutOfRange {
                index,
                total: self.sizes[dim],
            });
        }

        let mut sizes = self.sizes.clone();
        let mut strides = self.strides.clone();
        sizes.remove(dim);
        strides.remove(dim);
        Ok(Slice {
            offset: self.offset + index * self.strides[dim],
            sizes,
            strides,
        })
    }

    /// Restrict the slice to `begin..end` with step `step` along
    /// `dim`:
    /// ```text
    /// offset       += begin × strides[dim]
    /// sizes[dim]    = ⎡(end - begin) / step⎤
    /// strides[dim] ×= step
    /// ```
    ///
    /// The range may be empty (`begin == end`), in which case the
    /// result has size 0 along `dim`.
    pub fn select(
        &self,
        dim: usize,
        begin: usize,
        end: usize,
        step: usize,
    ) -> Result<Self, SliceError> {
        if dim >= self.sizes.len() {
            return Err(SliceError::DimensionOutOfRange {
                dim,
                ndims: self.num_dim(),
            });
        }
        if end > self.sizes[dim] {
            return Err(SliceError::IndexOutOfRange {
                index: end,
                total: self.sizes[dim],
            });
        }
        if begin > end || step == 0 {
            return Err(SliceError::InvalidRange { begin, end, step });
        }

        let mut sizes = self.sizes.clone();
        let mut strides = self.strides.clone();
        sizes[dim] = (end - begin).div_ceil(step);
        strides[dim] *= step;
        // An empty selection never dereferences its offset.
        let offset = if sizes[dim] == 0 {
            self.offset
        } else {
            self.offset + begin * self.strides[dim]
        };
        Ok(Slice {
            offset,
            sizes,
            strides,
        })
    }

    /// Reorder the dimensions: dimension `i` of the result is
    /// dimension `order[i]` of `self`.
    pub fn permute(&self, order: &[usize]) -> Result<Self, SliceError> {
        if order.len() != self.num_dim() {
            return Err(SliceError::InvalidDims {
                expected: self.num_dim(),
                got: order.len(),
            });
        }
        let mut sizes = Vec::with_capacity(order.len());
        let mut strides = Vec::with_capacity(order.len());
        for &i in order {
            if i >= self.num_dim() {
                return Err(SliceError::DimensionOutOfRange {
                    dim: i,
                    ndims: self.num_dim(),
                });
            }
            sizes.push(self.sizes[i]);
            strides.push(self.strides[i]);
        }
        Ok(Slice {
            offset: self.offset,
            sizes,
            strides,
        })
    }

    /// The total length of the slice's indices.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator over the slice's locations in row-major order.
    pub fn iter(&self) -> SliceIterator {
        SliceIterator {
            slice: self.clone(),
            pos: CartesianIterator::new(self.sizes.clone()),
        }
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl IntoIterator for &Slice {
    type Item = usize;
    type IntoIter = SliceIterator;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct SliceIterator {
    slice: Slice,
    pos: CartesianIterator,
}

impl Iterator for SliceIterator {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos.next()?;
        Some(
            self.slice.offset
                + pos
                    .iter()
                    .zip(&self.slice.strides)
                    .map(|(i, s)| i * s)
                    .sum::<usize>(),
        )
    }
}

/// Iterates over all coordinate tuples in an N-dimensional space.
///
/// Yields each point in row-major order for the shape defined by
/// `dims`, where each coordinate lies in `[0..dims[i])`. A space
/// with no dimensions has exactly one point, the empty tuple.
pub(crate) struct CartesianIterator {
    dims: Vec<usize>,
    index: usize,
}

impl CartesianIterator {
    pub(crate) fn new(dims: Vec<usize>) -> Self {
        CartesianIterator { dims, index: 0 }
    }
}

impl Iterator for CartesianIterator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.dims.iter().product::<usize>() {
            return None;
        }

        let mut result: Vec<usize> = vec![0; self.dims.len()];
        let mut rest = self.index;
        for (i, dim) in self.dims.iter().enumerate().rev() {
            result[i] = rest % dim;
            rest /= dim;
        }
        self.index += 1;
        Some(result)
    }
}
