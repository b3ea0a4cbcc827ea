//! Custom operations: handlers for operator keywords the compiler does not know.
//!
//! Any `Fn(&str, &str, &Operand) -> FilterResult<Clause>` closure is an
//! [`Operation`]. The compiler returns a handler's result verbatim, so the
//! handler owns the placeholder/parameter contract of what it emits.

use crate::ast::Operand;
use crate::error::{FilterError, FilterResult};
use crate::transpiler::Clause;

/// Handler for a custom operator keyword.
pub trait Operation: Send + Sync {
    /// Build the clause for `field <operator> operand`.
    fn apply(&self, field: &str, operator: &str, operand: &Operand) -> FilterResult<Clause>;
}

impl<F> Operation for F
where
    F: Fn(&str, &str, &Operand) -> FilterResult<Clause> + Send + Sync,
{
    fn apply(&self, field: &str, operator: &str, operand: &Operand) -> FilterResult<Clause> {
        self(field, operator, operand)
    }
}

/// Operation described by a SQL template such as `{field} REGEXP ?`.
///
/// `{field}` is substituted with the leaf field. Each `?` binds one value, so
/// the placeholder count is the operation's arity:
///
/// - 0 binds nothing (`{field} IS NULL`),
/// - 1 binds the single operand value,
/// - n binds a sequence of exactly n values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOperation {
    template: String,
    arity: usize,
}

impl TemplateOperation {
    pub fn new(template: impl Into<String>) -> FilterResult<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(FilterError::Config(
                "operation template must not be empty".to_string(),
            ));
        }
        let arity = template.matches('?').count();
        Ok(Self { template, arity })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl Operation for TemplateOperation {
    fn apply(&self, field: &str, operator: &str, operand: &Operand) -> FilterResult<Clause> {
        let params = match self.arity {
            0 => Vec::new(),
            1 => vec![operand.single(operator)?.clone()],
            n => match operand {
                Operand::Many(values) if values.len() == n => values.clone(),
                other => return Err(FilterError::arity(operator, n, other.len())),
            },
        };
        Ok(Clause::new(self.template.replace("{field}", field), params))
    }
}
