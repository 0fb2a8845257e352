/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Physical units.
//!
//! A [`Unit`] is a vector of integer exponents over a fixed set of
//! base dimensions ([`BaseDim`]) together with a scale factor
//! relative to the canonical base unit. `mm` is `length^1` with scale
//! `1e-3`; `J` is `mass^1 length^2 time^-2` with scale `1`.
//!
//! Multiplying units adds exponents and multiplies scales; dividing
//! subtracts and divides. Two units are *compatible* when their
//! exponents are identical; the scales may differ, in which case
//! [`Unit::conversion_factor`] gives the factor converting values
//! from one to the other.
//!
//! Units are named through a process-wide registry: a fixed table of
//! predefined units plus user-defined units added with
//! [`add_user_defined_unit`] and removed wholesale with
//! [`clear_user_defined_units`]. The registry is consulted both for
//! parsing unit strings (see [`parse`]) and for rendering units back
//! to their names.

use std::fmt;
use std::ops::Div;
use std::ops::Mul;
use std::str::FromStr;
use std::sync::LazyLock;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;

/// Parser for unit strings such as `m/s`, `kg*m^2` or `1/us`.
pub mod parse;

/// Number of base dimensions tracked by a [`Unit`].
pub const NUM_BASE_DIMS: usize = 8;

/// Relative tolerance used when comparing unit scales. Scales are
/// products of decimal prefixes, so round-off must not make `mm * m /
/// m` differ from `mm`.
const SCALE_RTOL: f64 = 1e-12;

/// The base dimensions a unit is expressed in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BaseDim {
    Length,
    Time,
    Mass,
    Current,
    Temperature,
    Amount,
    Angle,
    Counts,
}

impl BaseDim {
    const ALL: [BaseDim; NUM_BASE_DIMS] = [
        BaseDim::Length,
        BaseDim::Time,
        BaseDim::Mass,
        BaseDim::Current,
        BaseDim::Temperature,
        BaseDim::Amount,
        BaseDim::Angle,
        BaseDim::Counts,
    ];

    fn symbol(self) -> &'static str {
        match self {
            BaseDim::Length => "m",
            BaseDim::Time => "s",
            BaseDim::Mass => "kg",
            BaseDim::Current => "A",
            BaseDim::Temperature => "K",
            BaseDim::Amount => "mol",
            BaseDim::Angle => "rad",
            BaseDim::Counts => "counts",
        }
    }
}

/// The type of error for unit operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UnitError {
    #[error("failed to parse unit `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("unknown unit `{name}`")]
    Unknown { name: String },

    #[error("unit `{name}` is already defined")]
    AlreadyDefined { name: String },

    #[error("invalid unit name `{name}`")]
    InvalidName { name: String },

    #[error("cannot convert between incompatible units {from} and {to}")]
    Incompatible { from: Unit, to: Unit },

    #[error("unsupported unit as result of {op}({unit})")]
    Unsupported { op: &'static str, unit: Unit },
}

/// A physical unit: base-dimension exponents plus a scale factor.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    exponents: [i32; NUM_BASE_DIMS],
    scale: f64,
}

impl Unit {
    /// The unit of pure numbers.
    pub const fn dimensionless() -> Self {
        Self {
            exponents: [0; NUM_BASE_DIMS],
            scale: 1.0,
        }
    }

    /// The canonical unit of a single base dimension.
    pub fn base(dim: BaseDim) -> Self {
        let mut exponents = [0; NUM_BASE_DIMS];
        exponents[dim as usize] = 1;
        Self {
            exponents,
            scale: 1.0,
        }
    }

    /// This unit with its scale multiplied by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            exponents: self.exponents,
            scale: self.scale * factor,
        }
    }

    /// The exponent of `dim` in this unit.
    pub fn exponent(&self, dim: BaseDim) -> i32 {
        self.exponents[dim as usize]
    }

    /// The scale relative to the canonical base unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Unit::dimensionless()
    }

    pub fn is_counts(&self) -> bool {
        *self == Unit::base(BaseDim::Counts)
    }

    /// Whether values in `self` and `other` measure the same
    /// quantity, i.e. their base-dimension exponents are identical.
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.exponents == other.exponents
    }

    /// The factor by which values in `self` must be multiplied to
    /// express them in `to`.
    pub fn conversion_factor(&self, to: &Unit) -> Result<f64, UnitError> {
        if !self.is_compatible(to) {
            return Err(UnitError::Incompatible {
                from: *self,
                to: *to,
            });
        }
        if scales_equal(self.scale, to.scale) {
            Ok(1.0)
        } else {
            Ok(self.scale / to.scale)
        }
    }

    /// Raise this unit to an integer power. Fails if an exponent
    /// overflows.
    pub fn pow(&self, power: i32) -> Result<Unit, UnitError> {
        let mut exponents = self.exponents;
        for e in exponents.iter_mut() {
            *e = e.checked_mul(power).ok_or(UnitError::Unsupported {
                op: "pow",
                unit: *self,
            })?;
        }
        Ok(Unit {
            exponents,
            scale: self.scale.powi(power),
        })
    }

    /// The square root of this unit. Fails unless every exponent is
    /// even.
    pub fn sqrt(&self) -> Result<Unit, UnitError> {
        if self.exponents.iter().any(|e| e % 2 != 0) {
            return Err(UnitError::Unsupported {
                op: "sqrt",
                unit: *self,
            });
        }
        let mut exponents = self.exponents;
        for e in exponents.iter_mut() {
            *e /= 2;
        }
        Ok(Unit {
            exponents,
            scale: self.scale.sqrt(),
        })
    }

    /// Combine the exponents of `self` and `rhs` with `f`, failing on
    /// overflow.
    fn combine(
        self,
        rhs: Unit,
        op: &'static str,
        f: fn(i32, i32) -> Option<i32>,
        scale: f64,
    ) -> Result<Unit, UnitError> {
        let mut exponents = self.exponents;
        for (e, r) in exponents.iter_mut().zip(rhs.exponents) {
            *e = f(*e, r).ok_or(UnitError::Unsupported { op, unit: self })?;
        }
        Ok(Unit { exponents, scale })
    }

    /// The registered name of this unit, if any.
    pub fn name(&self) -> Option<String> {
        REGISTRY.read().name_of(self)
    }
}

fn scales_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= SCALE_RTOL * a.abs().max(b.abs())
}

impl Default for Unit {
    fn default() -> Self {
        Unit::dimensionless()
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.exponents == other.exponents && scales_equal(self.scale, other.scale)
    }
}

impl Mul for Unit {
    type Output = Result<Unit, UnitError>;

    fn mul(self, rhs: Unit) -> Self::Output {
        self.combine(rhs, "mul", i32::checked_add, self.scale * rhs.scale)
    }
}

impl Div for Unit {
    type Output = Result<Unit, UnitError>;

    fn div(self, rhs: Unit) -> Self::Output {
        self.combine(rhs, "div", i32::checked_sub, self.scale / rhs.scale)
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_unit(s)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return write!(f, "{}", name);
        }
        let mut parts = Vec::new();
        if !scales_equal(self.scale, 1.0) {
            parts.push(format!("{}", self.scale));
        }
        for dim in BaseDim::ALL {
            match self.exponent(dim) {
                0 => {}
                1 => parts.push(dim.symbol().to_string()),
                e => parts.push(format!("{}^{}", dim.symbol(), e)),
            }
        }
        write!(f, "{}", parts.join("*"))
    }
}

/// Named units known to the process.
struct UnitRegistry {
    builtin: Vec<(&'static str, Unit)>,
    user: Vec<(String, Unit)>,
}

impl UnitRegistry {
    fn predefined() -> Self {
        use BaseDim::*;
        let m = Unit::base(Length);
        let s = Unit::base(Time);
        let kg = Unit::base(Mass);
        let rad = Unit::base(Angle);
        let joule = Unit {
            exponents: [2, -2, 1, 0, 0, 0, 0, 0],
            scale: 1.0,
        };
        let ev = joule.scaled(1.602176634e-19);
        let builtin = vec![
            ("dimensionless", Unit::dimensionless()),
            ("one", Unit::dimensionless()),
            ("m", m),
            ("mm", m.scaled(1e-3)),
            ("um", m.scaled(1e-6)),
            ("µm", m.scaled(1e-6)),
            ("nm", m.scaled(1e-9)),
            ("angstrom", m.scaled(1e-10)),
            ("Å", m.scaled(1e-10)),
            ("s", s),
            ("ms", s.scaled(1e-3)),
            ("us", s.scaled(1e-6)),
            ("µs", s.scaled(1e-6)),
            ("ns", s.scaled(1e-9)),
            ("min", s.scaled(60.0)),
            ("h", s.scaled(3600.0)),
            ("kg", kg),
            ("g", kg.scaled(1e-3)),
            ("A", Unit::base(Current)),
            ("K", Unit::base(Temperature)),
            ("mol", Unit::base(Amount)),
            ("rad", rad),
            ("deg", rad.scaled(std::f64::consts::PI / 180.0)),
            ("counts", Unit::base(Counts)),
            ("count", Unit::base(Counts)),
            ("J", joule),
            ("eV", ev),
            ("meV", ev.scaled(1e-3)),
            ("Hz", Unit {
                exponents: [0, -1, 0, 0, 0, 0, 0, 0],
                scale: 1.0,
            }),
        ];
        Self {
            builtin,
            user: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Unit> {
        self.user
            .iter()
            .map(|(n, u)| (n.as_str(), u))
            .chain(self.builtin.iter().map(|(n, u)| (*n, u)))
            .find_map(|(n, u)| (n == name).then_some(*u))
    }

    fn name_of(&self, unit: &Unit) -> Option<String> {
        self.builtin
            .iter()
            .map(|(n, u)| (*n, u))
            .chain(self.user.iter().map(|(n, u)| (n.as_str(), u)))
            .find_map(|(n, u)| (u == unit).then(|| n.to_string()))
    }
}

static REGISTRY: LazyLock<RwLock<UnitRegistry>> =
    LazyLock::new(|| RwLock::new(UnitRegistry::predefined()));

/// Look up a unit by its registered name.
pub fn lookup(name: &str) -> Result<Unit, UnitError> {
    REGISTRY
        .read()
        .lookup(name)
        .ok_or_else(|| UnitError::Unknown {
            name: name.to_string(),
        })
}

/// Register `unit` under `name`, making it available to the unit
/// parser and to `Display`. Predefined names cannot be shadowed;
/// re-registering a user-defined name replaces it.
pub fn add_user_defined_unit(name: &str, unit: Unit) -> Result<Unit, UnitError> {
    if name.is_empty() || !name.chars().all(parse::is_name_char) {
        return Err(UnitError::InvalidName {
            name: name.to_string(),
        });
    }
    let mut registry = REGISTRY.write();
    if registry.builtin.iter().any(|(n, _)| *n == name) {
        return Err(UnitError::AlreadyDefined {
            name: name.to_string(),
        });
    }
    registry.user.retain(|(n, _)| n != name);
    registry.user.push((name.to_string(), unit));
    tracing::info!(name, %unit, "registered user-defined unit");
    Ok(unit)
}

/// Remove every user-defined unit, restoring the predefined table.
pub fn clear_user_defined_units() {
    let mut registry = REGISTRY.write();
    let count = registry.user.len();
    registry.user.clear();
    tracing::info!(count, "cleared user-defined units");
}

/// Parse a unit expression, e.g. `unit("m/s")`. Equivalent to
/// `str::parse::<Unit>`.
pub fn unit(expr: &str) -> Result<Unit, UnitError> {
    expr.parse()
}

#[cfg(test)]
pub(crate) fn m() -> Unit {
    Unit::base(BaseDim::Length)
}

#[cfg(test)]
pub(crate) fn s() -> Unit {
    Unit::base(BaseDim::Time)
}

#[cfg(test)]
pub(crate) fn counts() -> Unit {
    Unit::base(BaseDim::Counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algebra() {
        let speed = (m() / s()).unwrap();
        assert_eq!(speed.exponent(BaseDim::Length), 1);
        assert_eq!(speed.exponent(BaseDim::Time), -1);
        assert_eq!((speed * s()).unwrap(), m());
        assert_eq!((m() * m()).unwrap().sqrt().unwrap(), m());
        assert!(m().sqrt().is_err());
        assert_eq!((m().pow(3).unwrap() / m().pow(2).unwrap()).unwrap(), m());
        assert_eq!(m().pow(0).unwrap(), Unit::dimensionless());
        assert_eq!(lookup("J").unwrap(), unit("kg*m^2/s^2").unwrap());
        assert_eq!(lookup("Hz").unwrap(), unit("1/s").unwrap());
    }

    #[test]
    fn test_exponent_overflow() {
        let area = m().pow(2).unwrap();
        assert!(matches!(
            area.pow(1 << 30),
            Err(UnitError::Unsupported { op: "pow", .. })
        ));
        let huge = m().pow(i32::MAX).unwrap();
        assert!(matches!(
            huge * m(),
            Err(UnitError::Unsupported { op: "mul", .. })
        ));
        assert!(matches!(
            m().pow(i32::MIN).unwrap() / m(),
            Err(UnitError::Unsupported { op: "div", .. })
        ));
        assert!(matches!(
            unit("m^2147483647*m"),
            Err(UnitError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_compatibility_and_conversion() {
        let mm = lookup("mm").unwrap();
        assert!(mm.is_compatible(&m()));
        assert_ne!(mm, m());
        assert_eq!(m().conversion_factor(&mm).unwrap(), 1000.0);
        assert_eq!(m().conversion_factor(&m()).unwrap(), 1.0);
        assert!(matches!(
            m().conversion_factor(&s()),
            Err(UnitError::Incompatible { .. })
        ));
    }

    #[test]
    fn test_scale_roundoff() {
        let mm = lookup("mm").unwrap();
        let us = lookup("us").unwrap();
        assert_eq!(((mm * us).unwrap() / us).unwrap(), mm);
    }

    #[test]
    fn test_display() {
        assert_eq!(m().to_string(), "m");
        assert_eq!(Unit::dimensionless().to_string(), "dimensionless");
        assert_eq!(lookup("us").unwrap().to_string(), "us");
        assert_eq!((m() * s()).unwrap().to_string(), "m*s");
        assert_eq!((m() / s().pow(2).unwrap()).unwrap().to_string(), "m*s^-2");
        assert_eq!(counts().to_string(), "counts");
        assert_eq!(lookup("meV").unwrap().to_string(), "meV");
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_user_defined_units() {
        let furlong = m().scaled(201.168);
        assert!(lookup("furlong").is_err());
        add_user_defined_unit("furlong", furlong).unwrap();
        assert_eq!(lookup("furlong").unwrap(), furlong);
        assert_eq!("furlong/s".parse::<Unit>().unwrap(), (furlong / s()).unwrap());
        assert!(matches!(
            add_user_defined_unit("m", m()),
            Err(UnitError::AlreadyDefined { .. })
        ));
        assert!(matches!(
            add_user_defined_unit("bad name", m()),
            Err(UnitError::InvalidName { .. })
        ));
        assert!(logs_contain("registered user-defined unit"));
        clear_user_defined_units();
        assert!(lookup("furlong").is_err());
        assert_eq!(lookup("m").unwrap(), m());
        assert!(logs_contain("cleared user-defined units"));
    }
}
