//! Rows: per-record cell resolution.
//!
//! A [`Row`] wraps one [`Record`] together with its coerced values and its
//! group. Cells are resolved on demand against a set of [`ColumnRules`]
//! owned by the table, so a row never caches formatted output.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TexTableError;
use crate::record::{Coercion, Record, Value};
use crate::replace::Replacements;
use crate::rounding::Rounder;
use crate::Result;

/// Key of the synthetic column holding the group label.
pub const GROUP_COLUMN: &str = "group";

/// Default number of significant digits for numeric cells.
pub const DEFAULT_SIGNIFICANT_DIGITS: u32 = 3;

/// Per-column value override. Called with the whole row.
pub type ColumnFn = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

/// Computes a row's group from the whole row.
pub type GroupFn = Arc<dyn Fn(&Row) -> Option<String> + Send + Sync>;

/// How rows are assigned to groups.
#[derive(Clone, Default)]
pub enum GroupBy {
    /// No grouping; every row is in the `None` group
    #[default]
    None,
    /// Group by the raw text of a column
    Column(String),
    /// Group by a callback
    Func(GroupFn),
}

impl GroupBy {
    pub fn is_none(&self) -> bool {
        matches!(self, GroupBy::None)
    }

    /// The group column key, if grouping by column.
    pub fn key(&self) -> Option<&str> {
        match self {
            GroupBy::Column(key) => Some(key),
            _ => None,
        }
    }

    /// Compute the group of a row.
    pub fn group_of(&self, row: &Row) -> Result<Option<String>> {
        match self {
            GroupBy::None => Ok(None),
            GroupBy::Column(key) => row
                .raw(key)
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| TexTableError::MissingColumn {
                    column: key.clone(),
                }),
            GroupBy::Func(f) => Ok(f(row)),
        }
    }
}

impl fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupBy::None => f.write_str("None"),
            GroupBy::Column(key) => f.debug_tuple("Column").field(key).finish(),
            GroupBy::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// Markup placed before the first row of each visible group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GroupSeparator {
    /// A literal line such as `\hline`
    Rule(String),
    /// An empty row spanning every column (`newline` in config files)
    BlankRow,
}

impl Default for GroupSeparator {
    fn default() -> Self {
        GroupSeparator::Rule("\\hline".to_string())
    }
}

impl From<String> for GroupSeparator {
    fn from(s: String) -> Self {
        if s == "newline" {
            GroupSeparator::BlankRow
        } else {
            GroupSeparator::Rule(s)
        }
    }
}

impl From<GroupSeparator> for String {
    fn from(sep: GroupSeparator) -> Self {
        match sep {
            GroupSeparator::Rule(s) => s,
            GroupSeparator::BlankRow => "newline".to_string(),
        }
    }
}

/// Everything a row needs to turn raw values into cell markup.
#[derive(Clone)]
pub struct ColumnRules {
    pub functions: HashMap<String, ColumnFn>,
    pub merges: HashMap<String, Vec<String>>,
    pub raw_columns: HashSet<String>,
    pub replacements: Replacements,
    pub rounder: Rounder,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            functions: HashMap::new(),
            merges: HashMap::new(),
            raw_columns: HashSet::new(),
            replacements: Replacements::new(),
            rounder: Rounder::for_cells(DEFAULT_SIGNIFICANT_DIGITS),
        }
    }
}

impl fmt::Debug for ColumnRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("ColumnRules")
            .field("functions", &functions)
            .field("merges", &self.merges)
            .field("raw_columns", &self.raw_columns)
            .field("replacements", &self.replacements)
            .field("rounder", &self.rounder)
            .finish()
    }
}

/// Group column settings used when assembling a row line.
#[derive(Debug, Clone, Default)]
pub struct LineLayout {
    /// Render the group label as the first column
    pub show_group: bool,
    /// Group column key, used for raw/replacement lookups of the label
    pub group_key: Option<String>,
    pub separator: GroupSeparator,
}

/// A single table row.
#[derive(Debug, Clone)]
pub struct Row {
    record: Record,
    values: IndexMap<String, Value>,
    group: Option<String>,
}

impl Row {
    /// Build a row, coercing numeric-looking fields.
    pub fn new(record: Record) -> Self {
        Self::with_coercion(record, &Coercion::default())
    }

    pub fn with_coercion(record: Record, coercion: &Coercion) -> Self {
        let values = record
            .iter()
            .map(|(key, raw)| (key.to_string(), coercion.value(key, raw)))
            .collect();
        Self {
            record,
            values,
            group: None,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// The coerced value of a field.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The raw text of a field.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.record.get(key)
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub(crate) fn assign_group(&mut self, group_by: &GroupBy) -> Result<()> {
        self.group = group_by.group_of(self)?;
        Ok(())
    }

    /// Resolve the display markup of one cell.
    ///
    /// Column functions win over record fields; their text output is used
    /// verbatim while numbers are still rounded. Record text is passed
    /// through untouched for raw columns and replaced/escaped otherwise.
    /// Merge targets are appended, separated by spaces.
    pub fn resolve_value(&self, column: &str, rules: &ColumnRules) -> Result<String> {
        self.resolve(column, rules, &mut Vec::new())
    }

    fn resolve(
        &self,
        column: &str,
        rules: &ColumnRules,
        stack: &mut Vec<String>,
    ) -> Result<String> {
        if stack.iter().any(|c| c == column) {
            return Err(TexTableError::MergeCycle {
                column: column.to_string(),
            });
        }

        let computed;
        let (value, overridden) = match rules.functions.get(column) {
            Some(func) => {
                computed = func(self);
                (&computed, true)
            }
            None => {
                let value = self
                    .values
                    .get(column)
                    .ok_or_else(|| TexTableError::MissingColumn {
                        column: column.to_string(),
                    })?;
                (value, false)
            }
        };

        let mut text = match value {
            Value::Int(_) | Value::Float(_) => {
                rules.rounder.latex_value(value.as_f64().unwrap_or(0.0))
            }
            Value::Text(s) if overridden || rules.raw_columns.contains(column) => s.clone(),
            Value::Text(s) => rules.replacements.apply(s, Some(column)),
        };

        if let Some(targets) = rules.merges.get(column) {
            stack.push(column.to_string());
            for target in targets {
                let merged = self.resolve(target, rules, stack)?;
                text.push(' ');
                text.push_str(&merged);
            }
            stack.pop();
        }

        Ok(text)
    }

    /// Markup for the group label cell.
    fn group_label(&self, layout: &LineLayout, rules: &ColumnRules) -> String {
        let label = self.group.as_deref().unwrap_or("");
        let key = layout.group_key.as_deref().unwrap_or(GROUP_COLUMN);
        if rules.raw_columns.contains(key) {
            label.to_string()
        } else {
            rules.replacements.apply(label, Some(key))
        }
    }

    /// Assemble the markup line for this row.
    ///
    /// `columns` are the visible table columns, including the synthetic
    /// group column when it is shown.
    pub fn table_line(
        &self,
        columns: &[String],
        layout: &LineLayout,
        rules: &ColumnRules,
        first_in_group: bool,
    ) -> Result<String> {
        let mut line = String::new();

        if layout.show_group {
            if first_in_group {
                match &layout.separator {
                    GroupSeparator::BlankRow => {
                        line.push_str(&"&".repeat(columns.len().saturating_sub(1)));
                        line.push_str("\\\\\n");
                    }
                    GroupSeparator::Rule(rule) => {
                        line.push_str(rule);
                        line.push('\n');
                    }
                }
                line.push_str(&self.group_label(layout, rules));
                line.push_str(" & ");
            } else {
                line.push_str("& ");
            }
        }

        let cells = columns
            .iter()
            .filter(|c| {
                c.as_str() != GROUP_COLUMN && Some(c.as_str()) != layout.group_key.as_deref()
            })
            .map(|c| self.resolve_value(c, rules))
            .collect::<Result<Vec<_>>>()?;

        line.push_str(&cells.join(" & "));
        line.push_str("\\\\");
        Ok(line)
    }
}
