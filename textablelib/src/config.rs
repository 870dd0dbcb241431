//! Table configuration.
//!
//! [`TableConfig`] is a declarative bundle of column lists, per-column maps,
//! replacement rules and layout settings. It can be built in code with the
//! builder methods or loaded from a TOML file:
//!
//! ```toml
//! columns = ["name", "mass"]
//! group_key = "kind"
//! group_order = ["quark", "lepton"]
//! significant_digits = 2
//!
//! [[header_lines]]
//! name = "Particle"
//! mass = "$m$"
//!
//! [[header_lines]]
//! mass = "[GeV]"
//!
//! [column_widths]
//! name = 3.5
//!
//! [[replacements]]
//! literal = "mu"
//! replacement = '$\mu$'
//! column = "name"
//!
//! [column_functions.mass]
//! kind = "uncertainty"
//! value = "mass"
//! error = "mass_err"
//! ```
//!
//! Loading never executes anything; every file is parsed as data and then
//! checked by [`TableConfig::validate`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TexTableError;
use crate::escape::escape_latex;
use crate::record::{Coercion, Value};
use crate::replace::Replacements;
use crate::rounding::{Errors, Rounder};
use crate::row::{
    ColumnFn, ColumnRules, GroupBy, GroupFn, GroupSeparator, Row, DEFAULT_SIGNIFICANT_DIGITS,
};
use crate::Result;

/// One literal replacement rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacementRule {
    pub literal: String,
    pub replacement: String,
    /// Restrict the rule to one column; global when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// Declarative column function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnFunction {
    /// A value with a symmetric `error` or separate `up`/`down` errors,
    /// rounded together
    Uncertainty {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        up: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        down: Option<String>,
    },
    /// Show another column's value under this column's key
    Alias { source: String },
}

impl ColumnFunction {
    fn validate(&self, column: &str) -> Result<()> {
        match self {
            ColumnFunction::Uncertainty {
                error, up, down, ..
            } => {
                if error.is_some() && (up.is_some() || down.is_some()) {
                    return Err(TexTableError::InvalidConfig(format!(
                        "column function '{}' mixes 'error' with 'up'/'down'",
                        column
                    )));
                }
                if up.is_some() != down.is_some() {
                    return Err(TexTableError::InvalidConfig(format!(
                        "column function '{}' needs both 'up' and 'down'",
                        column
                    )));
                }
                Ok(())
            }
            ColumnFunction::Alias { source } => {
                if source == column {
                    return Err(TexTableError::InvalidConfig(format!(
                        "column function '{}' aliases itself",
                        column
                    )));
                }
                Ok(())
            }
        }
    }

    /// Turn the declaration into a callable using the cell rounder.
    pub fn to_column_fn(&self, rounder: Rounder) -> ColumnFn {
        match self.clone() {
            ColumnFunction::Uncertainty {
                value,
                error,
                up,
                down,
            } => Arc::new(move |row: &Row| {
                let number = |key: &str| row.value(key).and_then(Value::as_f64);
                let Some(v) = number(&value) else {
                    // Non-numeric values are shown as escaped text
                    return Value::Text(escape_latex(row.raw(&value).unwrap_or("")));
                };
                let errors = match (&error, &up, &down) {
                    (Some(e), _, _) => number(e).map(Errors::Symmetric),
                    (None, Some(u), Some(d)) => number(u)
                        .zip(number(d))
                        .map(|(up, down)| Errors::Asymmetric { up, down }),
                    _ => None,
                };
                Value::Text(rounder.latex(v, errors.unwrap_or(Errors::None)))
            }),
            // Missing source fields show as an empty cell
            ColumnFunction::Alias { source } => Arc::new(move |row: &Row| {
                row.value(&source)
                    .cloned()
                    .unwrap_or_else(|| Value::Text(String::new()))
            }),
        }
    }
}

/// Declarative configuration for a [`TexTable`](crate::TexTable).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Columns in output order; empty means all input columns
    pub columns: Vec<String>,
    /// Explicit group display order
    pub group_order: Vec<String>,
    /// Header lines as column → header markup
    pub header_lines: Vec<IndexMap<String, String>>,
    /// Fixed column widths in cm
    pub column_widths: HashMap<String, f64>,
    /// Left-hand column separators that differ from `default_col_separator`
    pub column_separators: HashMap<String, String>,
    /// Column → columns whose values are appended to it
    pub merge: HashMap<String, Vec<String>>,
    /// Columns shown without replacement or escaping
    pub raw_columns: Vec<String>,
    /// Columns never coerced to numbers
    pub text_columns: Vec<String>,
    pub replacements: Vec<ReplacementRule>,
    pub column_functions: IndexMap<String, ColumnFunction>,
    /// Extra LaTeX packages for the standalone document
    pub packages: Vec<String>,
    /// Sort rows descending by this column
    pub sort_key: Option<String>,
    /// Group rows by this column
    pub group_key: Option<String>,
    /// Hide the group column
    pub hide_group: bool,
    /// LaTeX table environment
    pub table_style: String,
    pub default_col_separator: String,
    /// Markup placed before each group, or `newline` for a blank row
    pub row_group_separator: GroupSeparator,
    /// Rows per table block; unbounded when absent
    pub chunk_size: Option<usize>,
    pub landscape: bool,
    /// Output path of the table file
    pub out: PathBuf,
    pub significant_digits: u32,
    /// Coerce numeric-looking fields to numbers
    pub numeric_coercion: bool,

    #[serde(skip)]
    custom_functions: HashMap<String, ColumnFn>,
    #[serde(skip)]
    group_func: Option<GroupFn>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            group_order: Vec::new(),
            header_lines: Vec::new(),
            column_widths: HashMap::new(),
            column_separators: HashMap::new(),
            merge: HashMap::new(),
            raw_columns: Vec::new(),
            text_columns: Vec::new(),
            replacements: Vec::new(),
            column_functions: IndexMap::new(),
            packages: Vec::new(),
            sort_key: None,
            group_key: None,
            hide_group: true,
            table_style: "tabular".to_string(),
            default_col_separator: "|".to_string(),
            row_group_separator: GroupSeparator::default(),
            chunk_size: None,
            landscape: false,
            out: PathBuf::from("outtable.tex"),
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
            numeric_coercion: true,
            custom_functions: HashMap::new(),
            group_func: None,
        }
    }
}

impl fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom: Vec<&String> = self.custom_functions.keys().collect();
        custom.sort();
        f.debug_struct("TableConfig")
            .field("columns", &self.columns)
            .field("group_order", &self.group_order)
            .field("header_lines", &self.header_lines)
            .field("column_widths", &self.column_widths)
            .field("column_separators", &self.column_separators)
            .field("merge", &self.merge)
            .field("raw_columns", &self.raw_columns)
            .field("text_columns", &self.text_columns)
            .field("replacements", &self.replacements)
            .field("column_functions", &self.column_functions)
            .field("custom_functions", &custom)
            .field("packages", &self.packages)
            .field("sort_key", &self.sort_key)
            .field("group_key", &self.group_key)
            .field("group_func", &self.group_func.as_ref().map(|_| ".."))
            .field("hide_group", &self.hide_group)
            .field("table_style", &self.table_style)
            .field("default_col_separator", &self.default_col_separator)
            .field("row_group_separator", &self.row_group_separator)
            .field("chunk_size", &self.chunk_size)
            .field("landscape", &self.landscape)
            .field("out", &self.out)
            .field("significant_digits", &self.significant_digits)
            .field("numeric_coercion", &self.numeric_coercion)
            .finish()
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML config.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Self::parse(source, Path::new("<string>"))
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| TexTableError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&source, path)
    }

    fn parse(source: &str, path: &Path) -> Result<Self> {
        let config: TableConfig =
            toml::from_str(source).map_err(|e| TexTableError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded table config");
        Ok(config)
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TexTableError::InvalidConfig(msg));

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return invalid(format!("column '{}' is listed twice", column));
            }
        }
        if self.chunk_size == Some(0) {
            return invalid("chunk_size must be at least 1".to_string());
        }
        if self.significant_digits == 0 {
            return invalid("significant_digits must be at least 1".to_string());
        }
        for rule in &self.replacements {
            if rule.literal.is_empty() {
                return invalid("replacement literals must not be empty".to_string());
            }
        }
        for (column, targets) in &self.merge {
            if targets.iter().any(|t| t == column) {
                return invalid(format!("column '{}' is merged into itself", column));
            }
        }
        for (column, width) in &self.column_widths {
            if !width.is_finite() || *width <= 0.0 {
                return invalid(format!("column '{}' has invalid width {}", column, width));
            }
        }
        for (column, function) in &self.column_functions {
            function.validate(column)?;
        }
        Ok(())
    }

    /// Whether the group key is also listed in `columns`.
    pub fn lists_group_key(&self) -> bool {
        self.group_key
            .as_deref()
            .is_some_and(|key| self.columns.iter().any(|c| c == key))
    }

    /// Configured columns without the group key.
    pub fn table_columns(&self) -> Vec<String> {
        let group_key = self.group_key.as_deref();
        self.columns
            .iter()
            .filter(|c| Some(c.as_str()) != group_key)
            .cloned()
            .collect()
    }

    pub fn rounder(&self) -> Rounder {
        Rounder::for_cells(self.significant_digits)
    }

    /// Build the resolution rules rows are rendered with.
    pub fn column_rules(&self) -> ColumnRules {
        let rounder = self.rounder();

        let mut replacements = Replacements::new();
        for rule in &self.replacements {
            match &rule.column {
                Some(column) => {
                    replacements.add_column(&rule.literal, &rule.replacement, column)
                }
                None => replacements.add_global(&rule.literal, &rule.replacement),
            }
        }

        let mut functions: HashMap<String, ColumnFn> = self
            .column_functions
            .iter()
            .map(|(column, f)| (column.clone(), f.to_column_fn(rounder)))
            .collect();
        for (column, f) in &self.custom_functions {
            functions.insert(column.clone(), f.clone());
        }

        ColumnRules {
            functions,
            merges: self.merge.clone(),
            raw_columns: self.raw_columns.iter().cloned().collect(),
            replacements,
            rounder,
        }
    }

    pub fn coercion(&self) -> Coercion {
        Coercion {
            enabled: self.numeric_coercion,
            text_columns: self.text_columns.iter().cloned().collect(),
        }
    }

    /// Grouping strategy; a group function wins over the group key.
    pub fn group_by(&self) -> GroupBy {
        match (&self.group_func, &self.group_key) {
            (Some(f), _) => GroupBy::Func(f.clone()),
            (None, Some(key)) => GroupBy::Column(key.clone()),
            (None, None) => GroupBy::None,
        }
    }

    pub fn add_package(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    /// Add a header line of column → header markup.
    pub fn add_header_line<I, K, V>(mut self, line: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.header_lines
            .push(line.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn add_group_order<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_order = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_column_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_column_widths<I, S>(mut self, widths: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.column_widths = widths.into_iter().map(|(k, w)| (k.into(), w)).collect();
        self
    }

    pub fn add_global_replacement(
        mut self,
        literal: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.replacements.push(ReplacementRule {
            literal: literal.into(),
            replacement: replacement.into(),
            column: None,
        });
        self
    }

    pub fn add_row_replacement(
        mut self,
        literal: impl Into<String>,
        replacement: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.replacements.push(ReplacementRule {
            literal: literal.into(),
            replacement: replacement.into(),
            column: Some(column.into()),
        });
        self
    }

    pub fn add_column_separator(
        mut self,
        separator: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.column_separators
            .insert(column.into(), separator.into());
        self
    }

    /// Register a value override computed from the whole row.
    pub fn add_column_func<F>(mut self, func: F, column: impl Into<String>) -> Self
    where
        F: Fn(&Row) -> Value + Send + Sync + 'static,
    {
        self.custom_functions.insert(column.into(), Arc::new(func));
        self
    }

    pub fn add_raw_flag(mut self, column: impl Into<String>) -> Self {
        self.raw_columns.push(column.into());
        self
    }

    pub fn add_column_merge_list<I, S>(mut self, targets: I, column: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge
            .insert(column.into(), targets.into_iter().map(Into::into).collect());
        self
    }

    /// Group rows by a callback instead of a column.
    pub fn group_func<F>(mut self, func: F) -> Self
    where
        F: Fn(&Row) -> Option<String> + Send + Sync + 'static,
    {
        self.group_func = Some(Arc::new(func));
        self
    }

    pub fn sort_key(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    pub fn group_key(mut self, key: impl Into<String>) -> Self {
        self.group_key = Some(key.into());
        self
    }

    pub fn hide_group(mut self, hide: bool) -> Self {
        self.hide_group = hide;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn landscape(mut self, landscape: bool) -> Self {
        self.landscape = landscape;
        self
    }

    pub fn significant_digits(mut self, digits: u32) -> Self {
        self.significant_digits = digits;
        self
    }

    pub fn row_group_separator(mut self, separator: GroupSeparator) -> Self {
        self.row_group_separator = separator;
        self
    }

    pub fn out(mut self, path: impl Into<PathBuf>) -> Self {
        self.out = path.into();
        self
    }
}
