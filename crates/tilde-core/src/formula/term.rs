//! Term types for formula specification
//!
//! This module defines the types representing terms in an expanded formula:
//! main effects, interactions, transform calls and escaped arithmetic.

use crate::formula::arith::ArithExpr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal value of a transform argument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArgValue {
    Number(f64),
    Bool(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Number(v) => write!(f, "{}", v),
            ArgValue::Bool(true) => write!(f, "TRUE"),
            ArgValue::Bool(false) => write!(f, "FALSE"),
        }
    }
}

/// Extra argument of a transform call, positional or named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: ArgValue,
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} = {}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// An opaque transform call such as `log(x)` or `poly(x, 2)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformCall {
    /// Function name as written
    pub function: String,
    /// First argument, evaluated over numeric columns
    pub input: ArithExpr,
    /// Remaining literal arguments
    pub args: Vec<CallArg>,
}

impl TransformCall {
    /// Find an argument by name, falling back to a positional slot
    ///
    /// `position` counts the extra arguments only, so the first argument after
    /// the input is position 0.
    pub fn arg(&self, name: &str, position: usize) -> Option<ArgValue> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .or_else(|| self.args.iter().filter(|a| a.name.is_none()).nth(position))
            .map(|a| a.value)
    }
}

impl fmt::Display for TransformCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.function, self.input)?;
        for arg in &self.args {
            write!(f, ", {}", arg)?;
        }
        write!(f, ")")
    }
}

/// A term in an expanded formula
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Term {
    /// Single variable
    MainEffect(String),
    /// Product of two or more variables, ordered by first appearance
    Interaction(Vec<String>),
    /// Transform applied to a numeric input
    Transformed(TransformCall),
    /// Escaped arithmetic, `I(expr)`
    Identity(ArithExpr),
}

impl Term {
    /// Create a main effect term
    pub fn main(name: impl Into<String>) -> Self {
        Term::MainEffect(name.into())
    }

    /// Create an interaction term, collapsing to a main effect for one variable
    pub fn interaction<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        let mut vars: Vec<String> = Vec::new();
        for v in variables {
            let v = v.into();
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
        if vars.len() == 1 {
            Term::MainEffect(vars.remove(0))
        } else {
            Term::Interaction(vars)
        }
    }

    /// Variables referenced by the term, in order
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Term::MainEffect(name) => vec![name.as_str()],
            Term::Interaction(vars) => vars.iter().map(|v| v.as_str()).collect(),
            Term::Transformed(call) => call.input.variables(),
            Term::Identity(expr) => expr.variables(),
        }
    }

    /// Plain variable set for main effects and interactions
    pub fn factors(&self) -> Option<Vec<&str>> {
        match self {
            Term::MainEffect(_) | Term::Interaction(_) => Some(self.variables()),
            _ => None,
        }
    }

    /// Rank used for canonical term ordering
    pub(crate) fn rank(&self) -> usize {
        match self {
            Term::MainEffect(_) => 0,
            Term::Transformed(_) | Term::Identity(_) => 1,
            Term::Interaction(vars) => vars.len(),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::MainEffect(a), Term::MainEffect(b)) => a == b,
            (Term::Interaction(a), Term::Interaction(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            (Term::Transformed(a), Term::Transformed(b)) => a == b,
            (Term::Identity(a), Term::Identity(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::MainEffect(name) => write!(f, "{}", name),
            Term::Interaction(vars) => write!(f, "{}", vars.join(":")),
            Term::Transformed(call) => write!(f, "{}", call),
            Term::Identity(expr) => write!(f, "I({})", expr),
        }
    }
}
