//! Serializable snapshot of a rendered table.
//!
//! `TableView` holds the resolved cell markup of every row, chunked and
//! grouped exactly as the LaTeX output is. It carries no environments or
//! separators, so tooling can consume it as JSON.

use serde::{Deserialize, Serialize};

use crate::row::GROUP_COLUMN;
use crate::table::TexTable;
use crate::Result;

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub first_in_group: bool,
    /// Cell markup for each non-group column
    pub cells: Vec<String>,
}

/// Table-ready data: columns, header lines and rendered chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    /// Visible columns, including `group` when it is shown
    pub columns: Vec<String>,
    /// Header cells per header line, aligned with `columns`
    pub header: Vec<Vec<String>>,
    pub chunks: Vec<Vec<ViewRow>>,
}

impl TableView {
    /// Resolve every cell of `table`.
    pub fn from_table(table: &TexTable) -> Result<Self> {
        let columns = table.table_cols();
        let header = table
            .header_replacement_maps()
            .iter()
            .map(|line| {
                columns
                    .iter()
                    .map(|c| line.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        let group_key = table.config().group_key.as_deref();
        let cell_columns: Vec<&String> = columns
            .iter()
            .filter(|c| c.as_str() != GROUP_COLUMN && Some(c.as_str()) != group_key)
            .collect();

        let mut chunks = Vec::new();
        for chunk in table.table_chunks() {
            let mut rows = Vec::with_capacity(chunk.len());
            for placement in chunk {
                let row = &table.rows()[placement.row];
                let cells = cell_columns
                    .iter()
                    .map(|c| row.resolve_value(c, table.rules()))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(ViewRow {
                    group: row.group().map(String::from),
                    first_in_group: placement.first_in_group,
                    cells,
                });
            }
            chunks.push(rows);
        }

        Ok(TableView {
            columns,
            header,
            chunks,
        })
    }

    /// Number of data rows across all chunks.
    pub fn row_count(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }
}
