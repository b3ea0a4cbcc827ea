//! # querysql
//!
//! Compiles the JSON filter trees emitted by visual query builders into a
//! parameterized SQL WHERE clause plus the values to bind, in placeholder
//! order. Client input only ever reaches the SQL text as field names (which a
//! whitelist can restrict) and operator keywords; every literal is a `?`.
//!
//! ## Quick Example
//!
//! ```
//! use querysql::prelude::*;
//!
//! let filter = querysql::from_json(r#"{
//!     "glue": "or",
//!     "rules": [
//!         { "field": "a", "condition": { "type": "equal", "filter": 1 } },
//!         { "field": "b", "condition": { "type": "equal", "filter": 2 } }
//!     ]
//! }"#).unwrap();
//!
//! let config = SqlConfig::new().allow(["a", "b"]);
//! let clause = querysql::compile(&filter, &config).unwrap();
//! assert_eq!(clause.sql, "( a = ? OR b = ? )");
//! assert_eq!(clause.params, vec![Value::Int(1), Value::Int(2)]);
//! ```
//!
//! ## Operators
//!
//! | Keyword          | SQL                              |
//! |------------------|----------------------------------|
//! | `equal`          | `field = ?`                      |
//! | `notEqual`       | `field <> ?`                     |
//! | `contains`       | `INSTR(field, ?) > 0`            |
//! | `notContains`    | `INSTR(field, ?) = 0`            |
//! | `lessOrEqual`    | `field <= ?`                     |
//! | `greaterOrEqual` | `field >= ?`                     |
//! | `less`           | `field < ?`                      |
//! | `greater`        | `field > ?`                      |
//! | `beginsWith`     | `field LIKE CONCAT(?, '%')`      |
//! | `notBeginsWith`  | `field NOT LIKE CONCAT(?, '%')`  |
//! | `endsWith`       | `field LIKE CONCAT('%', ?)`      |
//! | `notEndsWith`    | `field NOT LIKE CONCAT('%', ?)`  |
//! | `between`        | `( field > ? AND field < ? )`    |
//! | `notBetween`     | `( field < ? OR field > ? )`     |
//!
//! Anything else is looked up in [`SqlConfig`]'s custom operations.

pub mod ast;
pub mod config;
pub mod error;
pub mod operations;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::{FileConfig, SqlConfig};
    pub use crate::error::*;
    pub use crate::operations::{Operation, TemplateOperation};
    pub use crate::transpiler::{Builtin, Clause, ToSql};
}

use ast::FilterNode;
use config::SqlConfig;
use error::FilterResult;
use transpiler::{Clause, ToSql};

/// Decode a filter tree from its JSON wire form.
///
/// # Example
///
/// ```
/// use querysql::ast::FilterNode;
///
/// let node = querysql::from_json(r#"{"rules": []}"#).unwrap();
/// assert!(matches!(node, FilterNode::Group { .. }));
/// ```
pub fn from_json(text: &str) -> FilterResult<FilterNode> {
    Ok(serde_json::from_str(text)?)
}

/// Compile a filter tree to a WHERE fragment and its parameters.
///
/// Fails closed: any rejected field, bad arity or unknown operator anywhere
/// in the tree fails the whole compilation.
///
/// Every child of a group contributes its fragment, empty ones included: a
/// degenerate leaf next to a sibling yields `( a = ? AND  )`, which is not
/// valid SQL. Drop empty leaves from multi-rule groups before compiling.
pub fn compile(node: &FilterNode, config: &SqlConfig) -> FilterResult<Clause> {
    node.to_sql(config)
}
