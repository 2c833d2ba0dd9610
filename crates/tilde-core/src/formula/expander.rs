//! Expansion of a parsed term-expression into an explicit term list

use super::arith::ArithExpr;
use super::parser::{Expr, Summand};
use super::Term;
use crate::data::Schema;
use crate::design::TransformKind;
use crate::formula::error::{FormulaError, FormulaResult};

/// Expands `*`, `:`, `^n`, `.` and `-` into an ordered, deduplicated term list
pub struct TermExpander<'a> {
    schema: &'a Schema,
    response: &'a str,
}

impl<'a> TermExpander<'a> {
    /// Create an expander bound to a schema
    pub fn new(schema: &'a Schema, response: &'a str) -> Self {
        Self { schema, response }
    }

    /// Expand a right-hand side, returning the terms and the intercept flag
    pub fn expand(&self, rhs: &Expr) -> FormulaResult<(Vec<Term>, bool)> {
        let summands = match rhs {
            Expr::Sum(summands) => summands.clone(),
            other => vec![Summand {
                remove: false,
                expr: other.clone(),
            }],
        };

        let mut has_intercept = true;
        let mut included = Vec::new();
        self.apply(&summands, &mut included, Some(&mut has_intercept))?;
        let terms = Self::normalize(&included);

        log::debug!(
            "expanded formula into {} terms (intercept: {})",
            terms.len(),
            has_intercept
        );

        Ok((terms, has_intercept))
    }

    /// Deduplicate and order a term list
    ///
    /// Main effects come first, then transforms and escaped arithmetic, then
    /// interactions by increasing order. Ties keep their input order. The
    /// variables of each interaction are then ordered by their first
    /// appearance in the resulting list. Normalizing an already normalized
    /// list is a no-op.
    pub fn normalize(terms: &[Term]) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            if !out.contains(term) {
                out.push(term.clone());
            }
        }
        out.sort_by_key(|t| t.rank());

        let mut appearance: Vec<String> = Vec::new();
        for term in &out {
            for var in term.variables() {
                if !appearance.iter().any(|v| v == var) {
                    appearance.push(var.to_string());
                }
            }
        }
        for term in &mut out {
            if let Term::Interaction(vars) = term {
                vars.sort_by_key(|v| appearance.iter().position(|a| a == v));
            }
        }
        out
    }

    fn eval(&self, expr: &Expr) -> FormulaResult<Vec<Term>> {
        match expr {
            Expr::Var(name) => {
                self.check_variable(name)?;
                Ok(vec![Term::main(name.clone())])
            }
            Expr::Dot => Ok(self
                .schema
                .names()
                .into_iter()
                .filter(|name| *name != self.response)
                .map(Term::main)
                .collect()),
            Expr::Intercept(_) => Err(intercept_not_allowed()),
            Expr::Call(call) => {
                TransformKind::from_call(call)?;
                self.check_arith(&call.input)?;
                Ok(vec![Term::Transformed(call.clone())])
            }
            Expr::Identity(arith) => {
                self.check_arith(arith)?;
                Ok(vec![Term::Identity(arith.clone())])
            }
            Expr::Sum(summands) => {
                let mut included = Vec::new();
                self.apply(summands, &mut included, None)?;
                Ok(included)
            }
            Expr::Cross(lhs, rhs) => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                self.cross(&a, &b)
            }
            Expr::Interact(lhs, rhs) => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                self.interact(&a, &b)
            }
            Expr::Power(base, n) => {
                let set = self.eval(base)?;
                let mut result = set.clone();
                for _ in 1..*n {
                    result = self.cross(&result, &set)?;
                }
                Ok(result)
            }
        }
    }

    /// Apply summands left to right, so a later `+ a` restores an earlier `- a`
    ///
    /// Parenthesised sums are flattened into their parent. Intercept literals
    /// are accepted only when `intercept` is given, i.e. outside `*`, `:` and `^`.
    fn apply(
        &self,
        summands: &[Summand],
        terms: &mut Vec<Term>,
        mut intercept: Option<&mut bool>,
    ) -> FormulaResult<()> {
        for summand in summands {
            match &summand.expr {
                Expr::Intercept(one) => match intercept.as_deref_mut() {
                    // `- 1` and `+ 0` drop the intercept, `+ 1` and `- 0` restore it
                    Some(flag) => *flag = *one != summand.remove,
                    None => return Err(intercept_not_allowed()),
                },
                Expr::Sum(inner) if !summand.remove => {
                    self.apply(inner, terms, intercept.as_deref_mut())?;
                }
                expr => {
                    let evaluated = self.eval(expr)?;
                    if summand.remove {
                        terms.retain(|t| !evaluated.contains(t));
                    } else {
                        terms.extend(evaluated);
                    }
                }
            }
        }
        Ok(())
    }

    /// `a * b` = `a + b + a:b`
    fn cross(&self, a: &[Term], b: &[Term]) -> FormulaResult<Vec<Term>> {
        let mut out: Vec<Term> = Vec::new();
        for term in a.iter().chain(b.iter()).cloned().chain(self.interact(a, b)?) {
            if !out.contains(&term) {
                out.push(term);
            }
        }
        Ok(out)
    }

    /// Pairwise products of two term sets
    fn interact(&self, a: &[Term], b: &[Term]) -> FormulaResult<Vec<Term>> {
        let mut out: Vec<Term> = Vec::new();
        for right in b {
            for left in a {
                let term = self.combine(left, right)?;
                if !out.contains(&term) {
                    out.push(term);
                }
            }
        }
        Ok(out)
    }

    fn combine(&self, left: &Term, right: &Term) -> FormulaResult<Term> {
        let (Some(lv), Some(rv)) = (left.factors(), right.factors()) else {
            let offending = if left.factors().is_none() { left } else { right };
            return Err(FormulaError::InteractionError {
                term: offending.to_string(),
                message: "interactions may only combine plain variables".to_string(),
            });
        };

        Ok(Term::interaction(lv.into_iter().chain(rv).map(String::from)))
    }

    fn check_variable(&self, name: &str) -> FormulaResult<()> {
        if name == self.response {
            return Err(self.response_as_predictor());
        }
        if !self.schema.contains(name) {
            return Err(FormulaError::variable_not_found(name, &self.schema.names()));
        }
        Ok(())
    }

    fn check_arith(&self, expr: &ArithExpr) -> FormulaResult<()> {
        if expr.variables().contains(&self.response) {
            return Err(self.response_as_predictor());
        }
        expr.check_columns(self.schema)
    }

    fn response_as_predictor(&self) -> FormulaError {
        FormulaError::syntax_with_context(
            0,
            format!("Response '{}' cannot also be a predictor", self.response),
            self.response.to_string(),
        )
    }
}

fn intercept_not_allowed() -> FormulaError {
    FormulaError::syntax(
        0,
        "Intercept literals 0 and 1 are not valid inside *, : or ^",
    )
}
