//! R-style model formulas
//!
//! A formula such as `rate ~ temp * species` is parsed into an expression
//! tree, bound against a [`Schema`] and expanded into an ordered list of
//! [`Term`]s. Binding happens once at parse time: a [`Formula`] never looks
//! names up again.

use crate::data::Schema;
use serde::{Deserialize, Serialize};

pub mod arith;
pub mod error;
mod expander;
mod parser;
mod term;


pub use arith::{ArithExpr, ArithOp, ElementwiseFn};
pub use error::{FormulaError, FormulaResult};
pub use expander::TermExpander;
pub use parser::{Expr, FormulaParser, ParsedFormula, Summand};
pub use term::{ArgValue, CallArg, Term, TransformCall};

pub type Result<T> = std::result::Result<T, FormulaError>;

/// A parsed formula specifying a statistical model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    /// Response variable (left-hand side)
    pub response: String,

    /// Expanded terms on the right-hand side, in design order
    pub terms: Vec<Term>,

    /// Whether to include an intercept
    pub has_intercept: bool,

    /// Original formula string
    pub original: String,
}

impl Formula {
    /// Parse a formula and bind it against a schema
    pub fn parse(formula: &str, schema: &Schema) -> Result<Self> {
        let parsed = FormulaParser::parse(formula)?;

        if !schema.contains(&parsed.response) {
            return Err(FormulaError::variable_not_found(
                &parsed.response,
                &schema.names(),
            ));
        }

        let (terms, has_intercept) =
            TermExpander::new(schema, &parsed.response).expand(&parsed.rhs)?;

        Ok(Self {
            response: parsed.response,
            terms,
            has_intercept,
            original: parsed.original,
        })
    }

    /// Predictor variables in order of first use, excluding the response
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::new();
        for term in &self.terms {
            for var in term.variables() {
                if !vars.contains(&var) {
                    vars.push(var);
                }
            }
        }
        vars
    }

    /// Term labels in design order
    pub fn term_labels(&self) -> Vec<String> {
        self.terms.iter().map(|t| t.to_string()).collect()
    }

    /// Check whether the formula contains a term
    pub fn contains_term(&self, term: &Term) -> bool {
        self.terms.contains(term)
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ ", self.response)?;

        if self.terms.is_empty() {
            return write!(f, "{}", if self.has_intercept { "1" } else { "0" });
        }

        if !self.has_intercept {
            write!(f, "0 + ")?;
        }

        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", term)?;
        }

        Ok(())
    }
}
