//! SQL transpiler for filter trees.
//!
//! Turns a [`FilterNode`] into a WHERE-clause fragment with `?` placeholders
//! and the values bound to them, in placeholder order. Only field names and
//! operator keywords reach the SQL text.

use serde::Serialize;
use tracing::{debug, trace};

use crate::ast::*;
use crate::config::SqlConfig;
use crate::error::{FilterError, FilterResult};

/// A compiled WHERE fragment and its positional parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Clause {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Clause {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// The "no filter" clause.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Trait for compiling filter nodes to SQL.
pub trait ToSql {
    /// Compile this node against `config`.
    fn to_sql(&self, config: &SqlConfig) -> FilterResult<Clause>;
}

impl ToSql for FilterNode {
    fn to_sql(&self, config: &SqlConfig) -> FilterResult<Clause> {
        match self {
            FilterNode::Leaf(leaf) => leaf.to_sql(config),
            FilterNode::Group { glue, rules } => group_sql(*glue, rules, config),
        }
    }
}

impl ToSql for Leaf {
    fn to_sql(&self, config: &SqlConfig) -> FilterResult<Clause> {
        if self.is_degenerate() {
            return Ok(Clause::empty());
        }

        if !config.is_allowed(&self.field) {
            debug!(field = %self.field, "field rejected by whitelist");
            return Err(FilterError::FieldNotAllowed(self.field.clone()));
        }

        if !self.includes.is_empty() {
            return Ok(in_sql(&self.field, &self.includes));
        }

        let operator = self.condition.operator.as_str();
        if operator.is_empty() {
            return Ok(Clause::empty());
        }

        if let Some(builtin) = Builtin::from_keyword(operator) {
            let clause = builtin.to_sql(&self.field, &self.condition.operand)?;
            trace!(sql = %clause.sql, params = clause.params.len(), "compiled leaf");
            return Ok(clause);
        }

        match config.operation_for(operator) {
            Some(op) => op.apply(&self.field, operator, &self.condition.operand),
            None => {
                debug!(operator, field = %self.field, "no handler for operator");
                Err(FilterError::UnknownOperator(operator.to_string()))
            }
        }
    }
}

/// Join compiled children with the glue; parenthesize only when there are several.
fn group_sql(glue: Glue, rules: &[FilterNode], config: &SqlConfig) -> FilterResult<Clause> {
    let mut parts: Vec<String> = Vec::with_capacity(rules.len());
    let mut params: Vec<Value> = Vec::new();

    for rule in rules {
        let clause = rule.to_sql(config)?;
        parts.push(clause.sql);
        params.extend(clause.params);
    }

    let mut sql = parts.join(glue.joiner());
    if rules.len() > 1 {
        sql = format!("( {} )", sql);
    }

    Ok(Clause { sql, params })
}

/// `field IN(?, ?, ...)`, one placeholder per value.
fn in_sql(field: &str, values: &[Value]) -> Clause {
    let marks = vec!["?"; values.len()];
    Clause::new(
        format!("{} IN({})", field, marks.join(", ")),
        values.to_vec(),
    )
}

/// Operators the compiler translates without a custom handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    LessOrEqual,
    GreaterOrEqual,
    Less,
    Greater,
    BeginsWith,
    NotBeginsWith,
    EndsWith,
    NotEndsWith,
    Between,
    NotBetween,
}

impl Builtin {
    pub const ALL: [Builtin; 14] = [
        Builtin::Equal,
        Builtin::NotEqual,
        Builtin::Contains,
        Builtin::NotContains,
        Builtin::LessOrEqual,
        Builtin::GreaterOrEqual,
        Builtin::Less,
        Builtin::Greater,
        Builtin::BeginsWith,
        Builtin::NotBeginsWith,
        Builtin::EndsWith,
        Builtin::NotEndsWith,
        Builtin::Between,
        Builtin::NotBetween,
    ];

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.keyword() == keyword)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Builtin::Equal => "equal",
            Builtin::NotEqual => "notEqual",
            Builtin::Contains => "contains",
            Builtin::NotContains => "notContains",
            Builtin::LessOrEqual => "lessOrEqual",
            Builtin::GreaterOrEqual => "greaterOrEqual",
            Builtin::Less => "less",
            Builtin::Greater => "greater",
            Builtin::BeginsWith => "beginsWith",
            Builtin::NotBeginsWith => "notBeginsWith",
            Builtin::EndsWith => "endsWith",
            Builtin::NotEndsWith => "notEndsWith",
            Builtin::Between => "between",
            Builtin::NotBetween => "notBetween",
        }
    }

    /// SQL shape with `{field}` standing for the column. Range operators show
    /// the form used when both bounds are present.
    pub fn template(self) -> &'static str {
        match self {
            Builtin::Equal => "{field} = ?",
            Builtin::NotEqual => "{field} <> ?",
            Builtin::Contains => "INSTR({field}, ?) > 0",
            Builtin::NotContains => "INSTR({field}, ?) = 0",
            Builtin::LessOrEqual => "{field} <= ?",
            Builtin::GreaterOrEqual => "{field} >= ?",
            Builtin::Less => "{field} < ?",
            Builtin::Greater => "{field} > ?",
            Builtin::BeginsWith => "{field} LIKE CONCAT(?, '%')",
            Builtin::NotBeginsWith => "{field} NOT LIKE CONCAT(?, '%')",
            Builtin::EndsWith => "{field} LIKE CONCAT('%', ?)",
            Builtin::NotEndsWith => "{field} NOT LIKE CONCAT('%', ?)",
            Builtin::Between => "( {field} > ? AND {field} < ? )",
            Builtin::NotBetween => "( {field} < ? OR {field} > ? )",
        }
    }

    pub fn is_range(self) -> bool {
        matches!(self, Builtin::Between | Builtin::NotBetween)
    }

    fn to_sql(self, field: &str, operand: &Operand) -> FilterResult<Clause> {
        match self {
            Builtin::Between => range_sql(field, operand.bounds(self.keyword())?, (">", "AND", "<")),
            Builtin::NotBetween => range_sql(field, operand.bounds(self.keyword())?, ("<", "OR", ">")),
            _ => {
                let value = operand.single(self.keyword())?;
                Ok(Clause::new(
                    self.template().replace("{field}", field),
                    vec![value.clone()],
                ))
            }
        }
    }
}

/// Range over `(low_op, joiner, high_op)`. A missing bound drops its half of the test.
fn range_sql(
    field: &str,
    bounds: Bounds<'_>,
    (low_op, joiner, high_op): (&str, &str, &str),
) -> FilterResult<Clause> {
    let clause = match (bounds.low, bounds.high) {
        (Some(low), Some(high)) => Clause::new(
            format!("( {f} {} ? {} {f} {} ? )", low_op, joiner, high_op, f = field),
            vec![low.clone(), high.clone()],
        ),
        (Some(low), None) => Clause::new(format!("{} {} ?", field, low_op), vec![low.clone()]),
        (None, Some(high)) => Clause::new(format!("{} {} ?", field, high_op), vec![high.clone()]),
        (None, None) => Clause::empty(),
    };
    Ok(clause)
}
