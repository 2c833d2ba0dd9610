//! Literal arithmetic used inside `I(...)` and as transform input
//!
//! Expressions are evaluated row-wise over numeric columns. A missing input
//! (NaN) yields a missing output; a finite input outside a function's domain
//! is an error.

use crate::data::{ColumnKind, DataFrame, FloatArray, Schema};
use crate::formula::error::{FormulaError, FormulaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => " + ",
            ArithOp::Sub => " - ",
            ArithOp::Mul => " * ",
            ArithOp::Div => " / ",
            ArithOp::Pow => "^",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            ArithOp::Add | ArithOp::Sub => 1,
            ArithOp::Mul | ArithOp::Div => 2,
            ArithOp::Pow => 4,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Pow => a.powf(b),
        }
    }
}

/// Stateless elementwise function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementwiseFn {
    Log,
    Log2,
    Log10,
    Exp,
    Sqrt,
    Abs,
}

impl ElementwiseFn {
    /// Look up a function by its formula name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "log" => Some(ElementwiseFn::Log),
            "log2" => Some(ElementwiseFn::Log2),
            "log10" => Some(ElementwiseFn::Log10),
            "exp" => Some(ElementwiseFn::Exp),
            "sqrt" => Some(ElementwiseFn::Sqrt),
            "abs" => Some(ElementwiseFn::Abs),
            _ => None,
        }
    }

    /// Formula name of the function
    pub fn name(self) -> &'static str {
        match self {
            ElementwiseFn::Log => "log",
            ElementwiseFn::Log2 => "log2",
            ElementwiseFn::Log10 => "log10",
            ElementwiseFn::Exp => "exp",
            ElementwiseFn::Sqrt => "sqrt",
            ElementwiseFn::Abs => "abs",
        }
    }

    /// Apply to a finite value, `None` when the value is outside the domain
    pub fn apply(self, x: f64) -> Option<f64> {
        let y = match self {
            ElementwiseFn::Log if x > 0.0 => x.ln(),
            ElementwiseFn::Log2 if x > 0.0 => x.log2(),
            ElementwiseFn::Log10 if x > 0.0 => x.log10(),
            ElementwiseFn::Sqrt if x >= 0.0 => x.sqrt(),
            ElementwiseFn::Exp => x.exp(),
            ElementwiseFn::Abs => x.abs(),
            _ => return None,
        };
        y.is_finite().then_some(y)
    }

    /// Apply to every element; NaN stays NaN
    pub fn apply_array(self, values: &FloatArray, term: &str) -> FormulaResult<FloatArray> {
        let mut out = FloatArray::zeros(values.len());
        for (o, &x) in out.iter_mut().zip(values.iter()) {
            *o = if x.is_nan() {
                f64::NAN
            } else {
                self.apply(x).ok_or_else(|| {
                    FormulaError::domain(term, format!("{}() is undefined at {}", self.name(), x))
                })?
            };
        }
        Ok(out)
    }
}

/// Arithmetic expression over numeric columns and literals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArithExpr {
    Column(String),
    Number(f64),
    Neg(Box<ArithExpr>),
    Binary {
        op: ArithOp,
        lhs: Box<ArithExpr>,
        rhs: Box<ArithExpr>,
    },
    Call {
        function: ElementwiseFn,
        arg: Box<ArithExpr>,
    },
}

impl ArithExpr {
    pub fn binary(op: ArithOp, lhs: ArithExpr, rhs: ArithExpr) -> Self {
        ArithExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Column name if the expression is a bare column reference
    pub fn as_column(&self) -> Option<&str> {
        match self {
            ArithExpr::Column(name) => Some(name),
            _ => None,
        }
    }

    /// Referenced columns in order of first appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables<'a>(&'a self, vars: &mut Vec<&'a str>) {
        match self {
            ArithExpr::Column(name) => {
                if !vars.contains(&name.as_str()) {
                    vars.push(name);
                }
            }
            ArithExpr::Number(_) => {}
            ArithExpr::Neg(inner) | ArithExpr::Call { arg: inner, .. } => {
                inner.collect_variables(vars)
            }
            ArithExpr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(vars);
                rhs.collect_variables(vars);
            }
        }
    }

    /// Check that every referenced column exists and is numeric
    pub(crate) fn check_columns(&self, schema: &Schema) -> FormulaResult<()> {
        for var in self.variables() {
            match schema.kind(var) {
                Some(ColumnKind::Numeric) => {}
                Some(kind) => {
                    return Err(FormulaError::TypeMismatch {
                        variable: var.to_string(),
                        expected_type: "numeric",
                        actual_type: kind.to_string(),
                    });
                }
                None => return Err(FormulaError::variable_not_found(var, &schema.names())),
            }
        }
        Ok(())
    }

    /// Evaluate over every row of `data`
    pub fn evaluate(&self, data: &DataFrame) -> FormulaResult<FloatArray> {
        match self {
            ArithExpr::Column(name) => {
                let series = data
                    .get_column(name)
                    .ok_or_else(|| FormulaError::missing_column(name))?;
                series.to_float().ok_or_else(|| FormulaError::TypeMismatch {
                    variable: name.clone(),
                    expected_type: "numeric",
                    actual_type: series.dtype().to_string(),
                })
            }
            ArithExpr::Number(v) => Ok(FloatArray::from_elem(data.nrows(), *v)),
            ArithExpr::Neg(inner) => Ok(inner.evaluate(data)?.mapv(|v| -v)),
            ArithExpr::Call { function, arg } => {
                function.apply_array(&arg.evaluate(data)?, &self.to_string())
            }
            ArithExpr::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(data)?;
                let b = rhs.evaluate(data)?;
                let mut out = FloatArray::zeros(a.len());
                for ((o, &x), &y) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
                    if x.is_nan() || y.is_nan() {
                        *o = f64::NAN;
                        continue;
                    }
                    let v = op.apply(x, y);
                    if !v.is_finite() {
                        return Err(FormulaError::domain(
                            self.to_string(),
                            format!("non-finite result from {} and {}", x, y),
                        ));
                    }
                    *o = v;
                }
                Ok(out)
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            ArithExpr::Binary { op, .. } => op.precedence(),
            ArithExpr::Neg(_) => 3,
            ArithExpr::Column(_) | ArithExpr::Number(_) | ArithExpr::Call { .. } => 5,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &ArithExpr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for ArithExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithExpr::Column(name) => write!(f, "{}", name),
            ArithExpr::Number(v) => write!(f, "{}", v),
            ArithExpr::Neg(inner) => {
                write!(f, "-")?;
                write_operand(f, inner, inner.precedence() < 4)
            }
            ArithExpr::Call { function, arg } => write!(f, "{}({})", function.name(), arg),
            ArithExpr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                // `^` is right associative, everything else left associative
                let (lhs_parens, rhs_parens) = if *op == ArithOp::Pow {
                    (lhs.precedence() <= prec, rhs.precedence() < prec)
                } else {
                    (lhs.precedence() < prec, rhs.precedence() <= prec)
                };
                write_operand(f, lhs, lhs_parens)?;
                write!(f, "{}", op.symbol())?;
                write_operand(f, rhs, rhs_parens)
            }
        }
    }
}
