/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! This module defines a parser for unit expressions.
//! ```text
//! expression ::= term ( ( "*" | "/" ) term )*
//! term       ::= atom ( "^" integer )?
//! atom       ::= name
//!              | number
//!              | "(" expression ")"
//! name       ::= [letter | "_" | "µ"]+
//! number     ::= float
//! integer    ::= "-"? [0-9]+
//! ```
//!
//! Notes:
//! - `*` and `/` are left-associative and bind equally, so `m/s*s`
//!   is `m`.
//! - `^` binds tighter than `*` and `/`: `m/s^2` is an acceleration.
//! - Names are resolved against the unit registry after parsing, so
//!   user-defined units are accepted anywhere a predefined one is.
//! - A bare number is a dimensionless scale factor: `1/s`,
//!   `1e-3*m`.
//! - Whitespace around operators is admitted and ignored. The empty
//!   string is `dimensionless`.

use nom::IResult;
use nom::Parser as _;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::character::complete::i32 as integer;
use nom::character::complete::multispace0;
use nom::combinator::all_consuming;
use nom::combinator::map;
use nom::combinator::opt;
use nom::multi::many0;
use nom::number::complete::double;
use nom::sequence::delimited;
use nom::sequence::preceded;

use super::Unit;
use super::UnitError;
use super::lookup;

/// The syntax tree of a unit expression, before names are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitExpr {
    Name(String),
    Number(f64),
    Mul(Box<UnitExpr>, Box<UnitExpr>),
    Div(Box<UnitExpr>, Box<UnitExpr>),
    Pow(Box<UnitExpr>, i32),
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn name(input: &str) -> IResult<&str, UnitExpr> {
    map(take_while1(is_name_char), |s: &str| {
        UnitExpr::Name(s.to_string())
    })
    .parse(input)
}

fn number(input: &str) -> IResult<&str, UnitExpr> {
    map(double, UnitExpr::Number).parse(input)
}

fn atom(input: &str) -> IResult<&str, UnitExpr> {
    alt((
        name,
        number,
        delimited(
            char('('),
            delimited(multispace0, expression, multispace0),
            char(')'),
        ),
    ))
    .parse(input)
}

fn term(input: &str) -> IResult<&str, UnitExpr> {
    let (input, (base, power)) = (
        atom,
        opt(preceded(
            delimited(multispace0, char('^'), multispace0),
            integer,
        )),
    )
        .parse(input)?;
    Ok((
        input,
        match power {
            Some(p) => UnitExpr::Pow(Box::new(base), p),
            None => base,
        },
    ))
}

fn expression(input: &str) -> IResult<&str, UnitExpr> {
    let (input, (first, rest)) = (
        term,
        many0((
            delimited(multispace0, alt((char('*'), char('/'))), multispace0),
            term,
        )),
    )
        .parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => UnitExpr::Mul(Box::new(acc), Box::new(rhs)),
        _ => UnitExpr::Div(Box::new(acc), Box::new(rhs)),
    });
    Ok((input, expr))
}

/// Parse `input` into a [`UnitExpr`] without resolving names.
pub fn parse_expr(input: &str) -> Result<UnitExpr, UnitError> {
    all_consuming(expression)
        .parse(input.trim())
        .map(|(_, expr)| expr)
        .map_err(|e| UnitError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// Resolve the names in `expr` and evaluate the unit algebra.
pub fn evaluate(expr: &UnitExpr) -> Result<Unit, UnitError> {
    match expr {
        UnitExpr::Name(name) => lookup(name),
        UnitExpr::Number(value) => {
            if !value.is_finite() || *value <= 0.0 {
                return Err(UnitError::Parse {
                    input: value.to_string(),
                    reason: "scale factors must be positive and finite".to_string(),
                });
            }
            Ok(Unit::dimensionless().scaled(*value))
        }
        UnitExpr::Mul(a, b) => evaluate(a)? * evaluate(b)?,
        UnitExpr::Div(a, b) => evaluate(a)? / evaluate(b)?,
        UnitExpr::Pow(a, p) => evaluate(a)?.pow(*p),
    }
}

/// Parse and evaluate a unit string.
pub fn parse_unit(input: &str) -> Result<Unit, UnitError> {
    if input.trim().is_empty() {
        return Ok(Unit::dimensionless());
    }
    evaluate(&parse_expr(input)?)
}
