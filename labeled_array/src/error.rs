/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The crate error type.
//!
//! Every fallible operation returns [`Error`]. Variants carry the
//! offending dimension, extent, unit or dtype so that a caller can
//! fix the call without inspecting internals. [`Error::kind`] folds
//! the variants into the coarse [`ErrorKind`] taxonomy.

use crate::dim::Dim;
use crate::dtype::DType;
use crate::sizes::Sizes;
use crate::sizes::SizesError;
use crate::slice::SliceError;
use crate::units::Unit;
use crate::units::UnitError;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Conflicting or non-broadcastable extents.
    ShapeMismatch,
    /// Units incompatible for the requested operation.
    UnitMismatch,
    /// A referenced dimension is absent.
    Dimension,
    /// An index or range exceeds an extent.
    Index,
    /// A dtype incompatible with the requested operation.
    TypeMismatch,
    /// A malformed argument.
    Value,
    /// A value-based lookup matched nothing.
    NotFound,
}

/// The type of error for labeled array operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("shape mismatch: {reason}")]
    ShapeMismatch { reason: String },

    #[error("cannot {op} {lhs} and {rhs}: incompatible units")]
    UnitMismatch {
        op: &'static str,
        lhs: Unit,
        rhs: Unit,
    },

    #[error("dimension {dim} not found in {sizes}")]
    DimensionNotFound { dim: Dim, sizes: Sizes },

    #[error("index {index} out of range for dimension {dim} of extent {extent}")]
    IndexOutOfRange {
        dim: Dim,
        index: usize,
        extent: usize,
    },

    #[error("{op} does not support dtype {dtype}")]
    TypeMismatch { op: &'static str, dtype: DType },

    #[error("{reason}")]
    Value { reason: String },

    #[error("{reason}")]
    NotFound { reason: String },

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Sizes(#[from] SizesError),

    #[error(transparent)]
    Slice(#[from] SliceError),
}

impl Error {
    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn value(reason: impl Into<String>) -> Self {
        Error::Value {
            reason: reason.into(),
        }
    }

    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Error::UnitMismatch { .. } => ErrorKind::UnitMismatch,
            Error::DimensionNotFound { .. } => ErrorKind::Dimension,
            Error::IndexOutOfRange { .. } => ErrorKind::Index,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Value { .. } => ErrorKind::Value,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Unit(UnitError::Incompatible { .. }) => ErrorKind::UnitMismatch,
            Error::Unit(_) => ErrorKind::Value,
            Error::Sizes(SizesError::DuplicateDim { .. }) => ErrorKind::Dimension,
            Error::Sizes(_) => ErrorKind::ShapeMismatch,
            Error::Slice(SliceError::IndexOutOfRange { .. }) => ErrorKind::Index,
            Error::Slice(_) => ErrorKind::ShapeMismatch,
        }
    }
}
