//! Compiler configuration.
//!
//! [`SqlConfig`] is what the compiler reads: an optional field whitelist and
//! the registry of custom operations. [`FileConfig`] is its on-disk form
//! (`querysql.toml`), used by the CLI.
//!
//! ```toml
//! whitelist = ["name", "age", "email"]
//! max_depth = 16
//!
//! [operations]
//! regex = "{field} REGEXP ?"
//! isNull = "{field} IS NULL"
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::ast::FilterNode;
use crate::error::{FilterError, FilterResult};
use crate::operations::{Operation, TemplateOperation};
use crate::transpiler::Builtin;

/// Whitelist and custom operations shared across compilations.
#[derive(Clone, Default)]
pub struct SqlConfig {
    whitelist: Option<HashSet<String>>,
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl SqlConfig {
    /// Unrestricted configuration with no custom operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict leaves to the given fields. Repeated calls extend the set.
    pub fn allow<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist
            .get_or_insert_with(HashSet::new)
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Register a handler for `keyword`, replacing any previous one.
    pub fn operation(mut self, keyword: impl Into<String>, handler: impl Operation + 'static) -> Self {
        self.operations.insert(keyword.into(), Arc::new(handler));
        self
    }

    /// Without a whitelist every field is allowed.
    pub fn is_allowed(&self, field: &str) -> bool {
        self.whitelist
            .as_ref()
            .is_none_or(|allowed| allowed.contains(field))
    }

    pub fn whitelist(&self) -> Option<&HashSet<String>> {
        self.whitelist.as_ref()
    }

    pub fn operation_for(&self, keyword: &str) -> Option<&dyn Operation> {
        self.operations.get(keyword).map(Arc::as_ref)
    }

    /// Registered keywords, sorted.
    pub fn operation_keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }
}

impl fmt::Debug for SqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConfig")
            .field("whitelist", &self.whitelist)
            .field("operations", &self.operation_keywords())
            .finish()
    }
}

/// Contents of `querysql.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    /// Allowed fields; absent means unrestricted.
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,

    /// Deepest filter tree accepted before compiling.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Operator keyword to SQL template.
    #[serde(default)]
    pub operations: BTreeMap<String, String>,
}

fn default_max_depth() -> usize {
    32
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            whitelist: None,
            max_depth: default_max_depth(),
            operations: BTreeMap::new(),
        }
    }
}

impl FileConfig {
    pub const FILE_NAME: &'static str = "querysql.toml";

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> FilterResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Look for `./querysql.toml`, then `<config dir>/querysql/config.toml`.
    pub fn discover() -> FilterResult<Option<Self>> {
        match Self::candidates().into_iter().find(|path| path.is_file()) {
            Some(path) => Self::load(path).map(Some),
            None => Ok(None),
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(Self::FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("querysql").join("config.toml"));
        }
        paths
    }

    /// Reject trees nesting deeper than `max_depth`.
    pub fn check_depth(&self, node: &FilterNode) -> FilterResult<()> {
        let depth = node.depth();
        if depth > self.max_depth {
            return Err(FilterError::TooDeep {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// Build the compiler configuration. Templates may not shadow built-in operators.
    pub fn into_sql_config(self) -> FilterResult<SqlConfig> {
        let mut config = SqlConfig::new();
        if let Some(fields) = self.whitelist {
            config = config.allow(fields);
        }
        for (keyword, template) in self.operations {
            if Builtin::from_keyword(&keyword).is_some() {
                return Err(FilterError::Config(format!(
                    "operation '{}' shadows a built-in operator",
                    keyword
                )));
            }
            let op = TemplateOperation::new(template)?;
            config = config.operation(keyword, op);
        }
        Ok(config)
    }
}
