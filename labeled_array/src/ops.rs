/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Elementwise operators.
//!
//! All binary operators broadcast their operands by label (see
//! [`crate::broadcast`]) and return a new owned variable. Operators
//! are fallible, so the `std::ops` impls on `&Variable` produce
//! `Result<Variable, Error>`:
//!
//! ```
//! use labeled_array::Variable;
//! use labeled_array::sizes;
//! use labeled_array::units::unit;
//!
//! let a = Variable::new(sizes!(x = 2), unit("m").unwrap(), vec![1.0, 2.0]).unwrap();
//! let b = Variable::new(sizes!(x = 2), unit("s").unwrap(), vec![2.0, 4.0]).unwrap();
//! let speed = (&a / &b).unwrap();
//! assert_eq!(speed.unit(), unit("m/s").unwrap());
//! assert!((&a + &b).is_err());
//! ```
//!
//! Unit rules: `+`, `-` and comparisons require compatible units and
//! express the right operand in the left operand's unit; `*` and `/`
//! compose units. Variances propagate per [`crate::variance`].

use std::ops::Add;
use std::ops::BitAnd;
use std::ops::BitOr;
use std::ops::BitXor;
use std::ops::Div;
use std::ops::Mul;
use std::ops::Neg;
use std::ops::Not;
use std::ops::Sub;

use itertools::izip;

use crate::broadcast;
use crate::dtype::Buffer;
use crate::dtype::DType;
use crate::error::Error;
use crate::units::Unit;
use crate::variable::Variable;
use crate::variance;

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
}

impl Arithmetic {
    fn name(self) -> &'static str {
        match self {
            Arithmetic::Add => "add",
            Arithmetic::Sub => "subtract",
            Arithmetic::Mul => "multiply",
            Arithmetic::Div => "divide",
        }
    }

    fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            Arithmetic::Add => x + y,
            Arithmetic::Sub => x - y,
            Arithmetic::Mul => x * y,
            Arithmetic::Div => x / y,
        }
    }

    /// `x op y`, or `None` on overflow.
    fn apply_i64(self, x: i64, y: i64) -> Option<i64> {
        match self {
            Arithmetic::Add => x.checked_add(y),
            Arithmetic::Sub => x.checked_sub(y),
            Arithmetic::Mul => x.checked_mul(y),
            Arithmetic::Div => x.checked_div(y),
        }
    }

    fn variance(self, x: f64, vx: f64, y: f64, vy: f64) -> f64 {
        match self {
            Arithmetic::Add | Arithmetic::Sub => variance::add(vx, vy),
            Arithmetic::Mul => variance::mul(x, vx, y, vy),
            Arithmetic::Div => variance::div(x, vx, y, vy),
        }
    }
}

/// Comparison operators. Results are boolean and dimensionless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparison {
    fn apply<T: PartialOrd>(self, x: T, y: T) -> bool {
        match self {
            Comparison::Equal => x == y,
            Comparison::NotEqual => x != y,
            Comparison::Less => x < y,
            Comparison::LessEqual => x <= y,
            Comparison::Greater => x > y,
            Comparison::GreaterEqual => x >= y,
        }
    }
}

/// Logical operators on boolean variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logical {
    And,
    Or,
    Xor,
}

/// The unit of `a op b`, and the factor converting `b` into the
/// unit `a` is expressed in.
fn result_unit(op: Arithmetic, a: Unit, b: Unit) -> Result<(Unit, f64), Error> {
    match op {
        Arithmetic::Add | Arithmetic::Sub => {
            if !a.is_compatible(&b) {
                return Err(Error::UnitMismatch {
                    op: op.name(),
                    lhs: a,
                    rhs: b,
                });
            }
            Ok((a, b.conversion_factor(&a)?))
        }
        Arithmetic::Mul => Ok(((a * b)?, 1.0)),
        Arithmetic::Div => Ok(((a / b)?, 1.0)),
    }
}

/// Evaluate `a op b`.
pub fn binary(op: Arithmetic, a: &Variable, b: &Variable) -> Result<Variable, Error> {
    let promoted = a.dtype().promote(b.dtype(), op.name())?;
    let dtype = if op == Arithmetic::Div && promoted.is_int() {
        DType::Float64
    } else {
        promoted
    };
    let (unit, factor) = result_unit(op, a.unit(), b.unit())?;
    let plan = broadcast::plan(&[a, b])?;
    let (la, lb) = (&plan.layouts[0], &plan.layouts[1]);

    let values = if dtype.is_int() && factor == 1.0 {
        let x = a.read_i64_with(la, op.name())?;
        let y = b.read_i64_with(lb, op.name())?;
        let out = izip!(x, y)
            .map(|(x, y)| op.apply_i64(x, y))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::value(format!("integer overflow in {}", op.name())))?;
        Buffer::from_i64(dtype, out)?
    } else {
        let x = a.read_f64_with(la, op.name())?;
        let y = b.read_f64_with(lb, op.name())?;
        let out: Vec<f64> = izip!(&x, &y)
            .map(|(x, y)| op.apply(*x, y * factor))
            .collect();
        let variances = match (a.read_variances_f64_with(la), b.read_variances_f64_with(lb)) {
            (None, None) => None,
            (va, vb) => {
                let n = x.len();
                let va = va.unwrap_or_else(|| vec![0.0; n]);
                let vb = vb.unwrap_or_else(|| vec![0.0; n]);
                let f2 = factor * factor;
                Some(
                    izip!(&x, &va, &y, &vb)
                        .map(|(x, vx, y, vy)| op.variance(*x, *vx, y * factor, vy * f2))
                        .collect(),
                )
            }
        };
        return Variable::from_parts(
            plan.sizes,
            unit,
            Buffer::from_f64(dtype, out)?,
            variances.map(|v| Buffer::from_f64(dtype, v)).transpose()?,
            None,
        );
    };
    Variable::from_parts(plan.sizes, unit, values, None, None)
}

/// Evaluate the comparison `a op b`.
pub fn compare(op: Comparison, a: &Variable, b: &Variable) -> Result<Variable, Error> {
    const NAME: &str = "compare";
    let plan = broadcast::plan(&[a, b])?;
    let (la, lb) = (&plan.layouts[0], &plan.layouts[1]);
    let out: Vec<bool> = match (a.dtype(), b.dtype()) {
        (DType::Bool, DType::Bool) => {
            if !matches!(op, Comparison::Equal | Comparison::NotEqual) {
                return Err(Error::TypeMismatch {
                    op: "ordered comparison",
                    dtype: DType::Bool,
                });
            }
            let x = a.read_bool_with(la, NAME)?;
            let y = b.read_bool_with(lb, NAME)?;
            izip!(x, y).map(|(x, y)| op.apply(x, y)).collect()
        }
        (da, db) => {
            da.promote(db, NAME)?;
            if !a.unit().is_compatible(&b.unit()) {
                return Err(Error::UnitMismatch {
                    op: NAME,
                    lhs: a.unit(),
                    rhs: b.unit(),
                });
            }
            let factor = b.unit().conversion_factor(&a.unit())?;
            if da.is_int() && db.is_int() && factor == 1.0 {
                let x = a.read_i64_with(la, NAME)?;
                let y = b.read_i64_with(lb, NAME)?;
                izip!(x, y).map(|(x, y)| op.apply(x, y)).collect()
            } else {
                let x = a.read_f64_with(la, NAME)?;
                let y = b.read_f64_with(lb, NAME)?;
                izip!(x, y).map(|(x, y)| op.apply(x, y * factor)).collect()
            }
        }
    };
    Variable::new(plan.sizes, Unit::dimensionless(), out)
}

/// Evaluate the logical operation `a op b` on boolean variables.
pub fn logical(op: Logical, a: &Variable, b: &Variable) -> Result<Variable, Error> {
    const NAME: &str = "logical operation";
    let plan = broadcast::plan(&[a, b])?;
    let x = a.read_bool_with(&plan.layouts[0], NAME)?;
    let y = b.read_bool_with(&plan.layouts[1], NAME)?;
    let out: Vec<bool> = izip!(x, y)
        .map(|(x, y)| match op {
            Logical::And => x && y,
            Logical::Or => x || y,
            Logical::Xor => x ^ y,
        })
        .collect();
    Variable::new(plan.sizes, Unit::dimensionless(), out)
}

impl Variable {
    /// Logical negation of a boolean variable.
    pub fn logical_not(&self) -> Result<Variable, Error> {
        let out: Vec<bool> = self.read_bool("logical not")?.into_iter().map(|x| !x).collect();
        Variable::new(self.sizes().clone(), self.unit(), out)
    }

    /// Elementwise negation.
    pub fn negate(&self) -> Result<Variable, Error> {
        let values = match self.read_values() {
            Buffer::Float64(v) => Buffer::Float64(v.into_iter().map(|x| -x).collect()),
            Buffer::Float32(v) => Buffer::Float32(v.into_iter().map(|x| -x).collect()),
            Buffer::Int64(v) => Buffer::Int64(v.into_iter().map(|x| x.wrapping_neg()).collect()),
            Buffer::Int32(v) => Buffer::Int32(v.into_iter().map(|x| x.wrapping_neg()).collect()),
            other => {
                return Err(Error::TypeMismatch {
                    op: "negate",
                    dtype: other.dtype(),
                });
            }
        };
        Variable::from_parts(
            self.sizes().clone(),
            self.unit(),
            values,
            self.read_variances(),
            None,
        )
    }

    /// Raise every element to the integer power `n`. The unit is
    /// raised likewise.
    pub fn powi(&self, n: i32) -> Result<Variable, Error> {
        let dtype = if self.dtype().is_numeric() {
            if self.dtype() == DType::Float32 {
                DType::Float32
            } else {
                DType::Float64
            }
        } else {
            return Err(Error::TypeMismatch {
                op: "power",
                dtype: self.dtype(),
            });
        };
        let x = self.read_f64("power")?;
        let values = x.iter().map(|x| x.powi(n)).collect();
        let variances = self
            .read_variances_f64()
            .map(|v| {
                let v = izip!(&x, v).map(|(x, v)| variance::powi(*x, v, n)).collect();
                Buffer::from_f64(dtype, v)
            })
            .transpose()?;
        Variable::from_parts(
            self.sizes().clone(),
            self.unit().pow(n)?,
            Buffer::from_f64(dtype, values)?,
            variances,
            None,
        )
    }

    /// Elementwise square root. Fails unless every exponent of the
    /// unit is even.
    pub fn sqrt(&self) -> Result<Variable, Error> {
        let unit = self.unit().sqrt()?;
        let dtype = match self.dtype() {
            DType::Float32 => DType::Float32,
            d if d.is_numeric() => DType::Float64,
            dtype => return Err(Error::TypeMismatch { op: "sqrt", dtype }),
        };
        let x = self.read_f64("sqrt")?;
        let values = x.iter().map(|x| x.sqrt()).collect();
        let variances = self
            .read_variances_f64()
            .map(|v| {
                let v = izip!(&x, v).map(|(x, v)| variance::sqrt(*x, v)).collect();
                Buffer::from_f64(dtype, v)
            })
            .transpose()?;
        Variable::from_parts(
            self.sizes().clone(),
            unit,
            Buffer::from_f64(dtype, values)?,
            variances,
            None,
        )
    }

    pub fn equal(&self, other: &Variable) -> Result<Variable, Error> {
        compare(Comparison::Equal, self, other)
    }

    pub fn not_equal(&self, other: &Variable) -> Result<Variable, Error> {
        compare(Comparison::NotEqual, self, other)
    }

    pub fn less(&self, other: &Variable) -> Result<Variable, Error> {
        compare(Comparison::Less, self, other)
    }

    pub fn less_equal(&self, other: &Variable) -> Result<Variable, Error> {
        compare(Comparison::LessEqual, self, other)
    }

    pub fn greater(&self, other: &Variable) -> Result<Variable, Error> {
        compare(Comparison::Greater, self, other)
    }

    pub fn greater_equal(&self, other: &Variable) -> Result<Variable, Error> {
        compare(Comparison::GreaterEqual, self, other)
    }

    /// Apply `op` in place. `rhs` is evaluated in full before any
    /// element of `self` is written, so `rhs` may alias `self`. The
    /// result must have the sizes and dtype of `self`; a view cannot
    /// change unit.
    fn apply_in_place(&mut self, op: Arithmetic, rhs: &Variable) -> Result<(), Error> {
        let result = binary(op, self, rhs)?;
        if !result.sizes().same_set(self.sizes()) {
            return Err(Error::shape(format!(
                "in-place {} would change sizes {} to {}",
                op.name(),
                self.sizes(),
                result.sizes()
            )));
        }
        if result.dtype() != self.dtype() {
            return Err(Error::TypeMismatch {
                op: op.name(),
                dtype: result.dtype(),
            });
        }
        if self.is_view() && result.unit() != self.unit() {
            return Err(Error::UnitMismatch {
                op: op.name(),
                lhs: self.unit(),
                rhs: rhs.unit(),
            });
        }
        let aligned = result.transpose(self.dims())?;
        self.write(aligned.read_values(), aligned.read_variances())?;
        self.set_unit(result.unit())
    }

    /// `self += rhs`. Views write through to their parent.
    pub fn add_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.apply_in_place(Arithmetic::Add, rhs)
    }

    /// `self -= rhs`. Views write through to their parent.
    pub fn sub_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.apply_in_place(Arithmetic::Sub, rhs)
    }

    /// `self *= rhs`. Views write through to their parent.
    pub fn mul_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.apply_in_place(Arithmetic::Mul, rhs)
    }

    /// `self /= rhs`. Views write through to their parent.
    pub fn div_assign(&mut self, rhs: &Variable) -> Result<(), Error> {
        self.apply_in_place(Arithmetic::Div, rhs)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $func:ident, $op:expr) => {
        impl $trait<&Variable> for &Variable {
            type Output = Result<Variable, Error>;

            fn $method(self, rhs: &Variable) -> Self::Output {
                $func($op, self, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, binary, Arithmetic::Add);
impl_binary_op!(Sub, sub, binary, Arithmetic::Sub);
impl_binary_op!(Mul, mul, binary, Arithmetic::Mul);
impl_binary_op!(Div, div, binary, Arithmetic::Div);
impl_binary_op!(BitAnd, bitand, logical, Logical::And);
impl_binary_op!(BitOr, bitor, logical, Logical::Or);
impl_binary_op!(BitXor, bitxor, logical, Logical::Xor);

impl Not for &Variable {
    type Output = Result<Variable, Error>;

    fn not(self) -> Self::Output {
        self.logical_not()
    }
}

impl Neg for &Variable {
    type Output = Result<Variable, Error>;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}
