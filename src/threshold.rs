//! Threshold expressions for pass/fail gating.
//!
//! A threshold is written as `<operator><number>`, e.g. `>=0.8` or `!=0`.
//! Two-character operators are always tried before their one-character
//! prefixes so that `>=` is never read as `>` followed by `=0.8`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a threshold expression cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdFormatError {
    /// No known comparison operator prefixes the expression.
    #[error("Invalid threshold format: {0}")]
    UnknownOperator(String),

    /// The operator matched but the remainder is not a number.
    #[error("Invalid threshold value in '{expr}': {value:?} is not a number")]
    InvalidValue { expr: String, value: String },
}

/// Comparison operator of a threshold expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Ge,
    Le,
    Eq,
    Ne,
    Gt,
    Lt,
}

impl Operator {
    /// Symbol table, longest symbols first.
    const TABLE: [(&'static str, Operator); 6] = [
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ];

    /// Returns the textual symbol of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
        }
    }

    /// Applies the comparison `lhs <op> rhs`.
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Ge => lhs >= rhs,
            Operator::Le => lhs <= rhs,
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
            Operator::Gt => lhs > rhs,
            Operator::Lt => lhs < rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Outcome of checking a metric against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOutcome {
    Pass,
    Fail,
    /// The criterion could not be parsed; counted as a failure.
    Invalid,
}

impl ThresholdOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, ThresholdOutcome::Pass)
    }
}

impl fmt::Display for ThresholdOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdOutcome::Pass => write!(f, "Pass"),
            ThresholdOutcome::Fail => write!(f, "Fail"),
            ThresholdOutcome::Invalid => write!(f, "Invalid threshold"),
        }
    }
}

/// A parsed threshold expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub operator: Operator,
    pub value: f64,
}

impl Threshold {
    /// Parse an expression such as `>=0.8`.
    pub fn parse(expr: &str) -> Result<Self, ThresholdFormatError> {
        let (operator, rest) = Operator::TABLE
            .iter()
            .find_map(|(symbol, op)| expr.strip_prefix(symbol).map(|rest| (*op, rest)))
            .ok_or_else(|| ThresholdFormatError::UnknownOperator(expr.to_string()))?;

        let value = rest
            .trim()
            .parse::<f64>()
            .map_err(|_| ThresholdFormatError::InvalidValue {
                expr: expr.to_string(),
                value: rest.to_string(),
            })?;

        Ok(Self { operator, value })
    }

    /// Check a score against this threshold. A missing score never passes.
    pub fn check(&self, score: Option<f64>) -> ThresholdOutcome {
        match score {
            Some(s) if self.operator.compare(s, self.value) => ThresholdOutcome::Pass,
            _ => ThresholdOutcome::Fail,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.value)
    }
}
