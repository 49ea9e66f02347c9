//! Expression and template evaluation.
//!
//! The map resolves names and reads data; turning an expression plus a
//! namespace into a value is delegated to an [`ExpressionEngine`]. The
//! built-in [`Calculator`] understands arithmetic, comparisons, indexing and
//! a small set of numpy-style functions, which covers the expressions found
//! in scan metadata formats.

mod format;
mod interp;
mod lexer;
mod parser;

pub(crate) use format::format_value;

use std::fmt::Debug;

use indexmap::IndexMap;

use crate::error::EvalError;
use crate::value::Value;

/// Name to value bindings for one evaluation.
pub type Scope = IndexMap<String, Value>;

/// Evaluates expressions and `{expression:spec}` templates.
pub trait ExpressionEngine: Send + Sync + Debug {
    /// Free variable names referenced by `expression`, in order of first use.
    ///
    /// # Errors
    /// Returns an error if the expression cannot be parsed.
    fn identifiers(&self, expression: &str) -> Result<Vec<String>, EvalError>;

    /// Evaluate `expression` with the names in `scope` bound.
    ///
    /// # Errors
    /// Returns an error naming the identifier that could not be resolved, or
    /// describing the syntax, type or shape failure.
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, EvalError>;

    /// Free variable names referenced by all fields of `template`.
    ///
    /// # Errors
    /// Returns an error if the template or one of its fields cannot be parsed.
    fn template_identifiers(&self, template: &str) -> Result<Vec<String>, EvalError>;

    /// Replace every field of `template` by its formatted value.
    ///
    /// # Errors
    /// Returns an error if a field fails to evaluate or its format
    /// specifier is invalid.
    fn format(&self, template: &str, scope: &Scope) -> Result<String, EvalError>;
}

/// Built-in expression engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl ExpressionEngine for Calculator {
    fn identifiers(&self, expression: &str) -> Result<Vec<String>, EvalError> {
        Ok(parser::parse(expression)?.identifiers())
    }

    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, EvalError> {
        interp::evaluate(&parser::parse(expression)?, scope)
    }

    fn template_identifiers(&self, template: &str) -> Result<Vec<String>, EvalError> {
        let mut names: Vec<String> = Vec::new();
        for segment in format::parse_template(template)? {
            if let format::Segment::Field { expression, .. } = segment {
                for name in parser::parse(&expression)?.identifiers() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        Ok(names)
    }

    fn format(&self, template: &str, scope: &Scope) -> Result<String, EvalError> {
        format::render(template, scope)
    }
}
