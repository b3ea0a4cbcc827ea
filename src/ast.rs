//! Filter tree produced by query-builder UIs.
//!
//! The wire shape is loose: a node is a group when it carries a `rules` key
//! (even an empty one) and a leaf otherwise. Decoding resolves that once, so
//! the rest of the crate only ever sees [`FilterNode::Leaf`] or
//! [`FilterNode::Group`].
//!
//! ```text
//! { "glue": "or", "rules": [
//!     { "field": "age",  "condition": { "type": "between", "filter": [18, null] } },
//!     { "field": "role", "includes": ["admin", "mod"] }
//! ] }
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{FilterError, FilterResult};

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFilter", into = "RawFilter")]
pub enum FilterNode {
    /// A single field test.
    Leaf(Leaf),
    /// Child rules joined with a logical combinator.
    Group { glue: Glue, rules: Vec<FilterNode> },
}

impl FilterNode {
    /// Leaf testing `field` with `condition`.
    pub fn leaf(field: impl Into<String>, condition: Condition) -> Self {
        FilterNode::Leaf(Leaf {
            field: field.into(),
            condition,
            includes: Vec::new(),
        })
    }

    /// Set-membership leaf: `field IN(...)`.
    pub fn includes(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterNode::Leaf(Leaf {
            field: field.into(),
            condition: Condition::default(),
            includes: values,
        })
    }

    /// Leaf that compiles to nothing.
    pub fn empty() -> Self {
        FilterNode::Leaf(Leaf::default())
    }

    pub fn and(rules: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            glue: Glue::And,
            rules,
        }
    }

    pub fn or(rules: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            glue: Glue::Or,
            rules,
        }
    }

    /// Nesting depth; a leaf or an empty group counts as 1.
    pub fn depth(&self) -> usize {
        match self {
            FilterNode::Leaf(_) => 1,
            FilterNode::Group { rules, .. } => {
                1 + rules.iter().map(FilterNode::depth).max().unwrap_or(0)
            }
        }
    }
}

/// Leaf payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaf {
    /// Column identifier, emitted verbatim into SQL.
    pub field: String,
    pub condition: Condition,
    /// Literal set for `IN(...)`; wins over `condition` when non-empty.
    pub includes: Vec<Value>,
}

impl Leaf {
    /// No field, no operator, no includes: the "match everything" leaf.
    pub fn is_degenerate(&self) -> bool {
        self.field.is_empty() && self.condition.operator.is_empty() && self.includes.is_empty()
    }
}

/// Logical combinator of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Glue {
    #[default]
    And,
    Or,
}

impl Glue {
    /// `"or"` selects OR; anything else falls back to AND.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "or" => Glue::Or,
            _ => Glue::And,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Glue::And => "and",
            Glue::Or => "or",
        }
    }

    /// SQL text placed between child fragments.
    pub fn joiner(self) -> &'static str {
        match self {
            Glue::And => " AND ",
            Glue::Or => " OR ",
        }
    }
}

impl fmt::Display for Glue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Glue::And => write!(f, "AND"),
            Glue::Or => write!(f, "OR"),
        }
    }
}

/// Operator keyword plus its operand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Operator keyword; empty means "no condition".
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub operator: String,
    #[serde(rename = "filter", default)]
    pub operand: Operand,
}

impl Condition {
    /// Condition with a single value.
    pub fn new(operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            operator: operator.into(),
            operand: Operand::One(value.into()),
        }
    }

    /// Two-slot condition for range operators; `None` is an open bound.
    pub fn range(operator: impl Into<String>, low: Option<Value>, high: Option<Value>) -> Self {
        Self {
            operator: operator.into(),
            operand: Operand::Many(vec![
                low.unwrap_or(Value::Null),
                high.unwrap_or(Value::Null),
            ]),
        }
    }

    /// Condition carrying an arbitrary value list.
    pub fn list(operator: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            operator: operator.into(),
            operand: Operand::Many(values),
        }
    }
}

/// The `filter` payload as decoded, before an operator gives it a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Many(Vec<Value>),
    One(Value),
}

impl Default for Operand {
    fn default() -> Self {
        Operand::One(Value::Null)
    }
}

/// Range operand resolved from a two-element sequence; null slots are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<'a> {
    pub low: Option<&'a Value>,
    pub high: Option<&'a Value>,
}

impl Operand {
    /// Number of values carried. An absent scalar counts as zero.
    pub fn len(&self) -> usize {
        match self {
            Operand::One(Value::Null) => 0,
            Operand::One(_) => 1,
            Operand::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value for a single-value operator. Sequences are rejected.
    pub fn single(&self, operator: &str) -> FilterResult<&Value> {
        match self {
            Operand::One(value) => Ok(value),
            Operand::Many(values) => Err(FilterError::arity(operator, 1, values.len())),
        }
    }

    /// The two bounds for a range operator.
    pub fn bounds(&self, operator: &str) -> FilterResult<Bounds<'_>> {
        match self {
            Operand::Many(values) if values.len() == 2 => Ok(Bounds {
                low: values[0].present(),
                high: values[1].present(),
            }),
            other => Err(FilterError::arity(operator, 2, other.len())),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::One(value) => write!(f, "{}", value),
            Operand::Many(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A literal bound as a query parameter.
///
/// Integers decode as `Int` when they fit in `i64` and as `UInt` up to
/// `u64::MAX`; anything larger is a `Float` and loses precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn present(&self) -> Option<&Value> {
        if self.is_null() { None } else { Some(self) }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire shape of a node. Every key is optional, `null` included.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    glue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    includes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<RawFilter>>,
}

impl From<RawFilter> for FilterNode {
    fn from(raw: RawFilter) -> Self {
        match raw.rules {
            Some(rules) => FilterNode::Group {
                glue: Glue::from_keyword(raw.glue.as_deref().unwrap_or_default()),
                rules: rules.into_iter().map(FilterNode::from).collect(),
            },
            None => FilterNode::Leaf(Leaf {
                field: raw.field.unwrap_or_default(),
                condition: raw.condition.unwrap_or_default(),
                includes: raw.includes.unwrap_or_default(),
            }),
        }
    }
}

impl From<FilterNode> for RawFilter {
    fn from(node: FilterNode) -> Self {
        match node {
            FilterNode::Group { glue, rules } => RawFilter {
                glue: Some(glue.keyword().to_string()),
                rules: Some(rules.into_iter().map(RawFilter::from).collect()),
                ..Default::default()
            },
            FilterNode::Leaf(leaf) => RawFilter {
                field: Some(leaf.field),
                condition: Some(leaf.condition).filter(|c| !c.operator.is_empty()),
                includes: Some(leaf.includes).filter(|i| !i.is_empty()),
                ..Default::default()
            },
        }
    }
}
