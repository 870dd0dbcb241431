//! Table assembly: grouping, chunking, headers and LaTeX output.
//!
//! A [`TexTable`] owns its rows and a [`TableConfig`]. Three derived views are
//! computed lazily and cached:
//!
//! - **group_row_dict**: row indices bucketed by group, in display order
//! - **table_chunks**: the grouped rows flattened and split into chunks of
//!   `chunk_size`, each placement flagged with `first_in_group`
//! - **table_header**: the rendered header lines
//!
//! Every mutating operation drops all three views, so a view is never stale.
//! Each chunk is rendered as its own table environment with the header
//! repeated.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compile::DocumentCompiler;
use crate::config::TableConfig;
use crate::error::TexTableError;
use crate::escape::escape_latex;
use crate::record::{Coercion, Record};
use crate::row::{ColumnRules, GroupBy, LineLayout, Row, GROUP_COLUMN};
use crate::Result;

/// Rows sharing one group, as indices into [`TexTable::rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBucket {
    pub group: Option<String>,
    pub rows: Vec<usize>,
}

/// Position of a row inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Index into [`TexTable::rows`]
    pub row: usize,
    /// First row of its group in display order
    pub first_in_group: bool,
}

/// Lazily computed views over the rows.
#[derive(Debug, Default)]
struct DerivedViews {
    group_row_dict: OnceLock<Vec<GroupBucket>>,
    table_chunks: OnceLock<Vec<Vec<Placement>>>,
    table_header: OnceLock<String>,
}

/// A LaTeX table built from records.
#[derive(Debug)]
pub struct TexTable {
    config: TableConfig,
    rules: ColumnRules,
    group_by: GroupBy,
    coercion: Coercion,
    /// Columns of the input, used when no columns are configured
    default_cols: Vec<String>,
    rows: Vec<Row>,
    views: DerivedViews,
}

impl TexTable {
    /// Create an empty table from a validated config.
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        if config.lists_group_key() {
            tracing::warn!(
                column = config.group_key.as_deref().unwrap_or_default(),
                "group key listed in columns, rendering it as the group column"
            );
        }
        let rules = config.column_rules();
        let group_by = config.group_by();
        let coercion = config.coercion();
        Ok(Self {
            config,
            rules,
            group_by,
            coercion,
            default_cols: Vec::new(),
            rows: Vec::new(),
            views: DerivedViews::default(),
        })
    }

    /// Create an empty table from a TOML config file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(TableConfig::load(path)?)
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn rules(&self) -> &ColumnRules {
        &self.rules
    }

    /// Rows in sorted order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Change the configuration in place.
    ///
    /// The new config is validated, rows are regrouped and resorted and all
    /// cached views are dropped.
    pub fn update_config(&mut self, update: impl FnOnce(&mut TableConfig)) -> Result<()> {
        let mut config = self.config.clone();
        update(&mut config);

        let mut next = TexTable::new(config)?;
        next.default_cols = self.default_cols.clone();
        let rows = self
            .rows
            .iter()
            .map(|row| next.build_row(row.record().clone()))
            .collect::<Result<Vec<_>>>()?;
        next.replace_rows(rows)?;
        *self = next;
        Ok(())
    }

    /// Add one header line of column → header markup.
    pub fn add_header_line<I, K, V>(&mut self, line: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .header_lines
            .push(line.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.views = DerivedViews::default();
    }

    /// Whether the synthetic group column is rendered.
    pub fn shows_group(&self) -> bool {
        !self.config.hide_group && !self.group_by.is_none()
    }

    fn line_layout(&self) -> LineLayout {
        LineLayout {
            show_group: self.shows_group(),
            group_key: self.config.group_key.clone(),
            separator: self.config.row_group_separator.clone(),
        }
    }

    fn build_row(&self, record: Record) -> Result<Row> {
        if self.shows_group()
            && record.contains_key(GROUP_COLUMN)
            && self.config.group_key.as_deref() != Some(GROUP_COLUMN)
        {
            return Err(TexTableError::DuplicateAttribute {
                key: GROUP_COLUMN.to_string(),
            });
        }
        let mut row = Row::with_coercion(record, &self.coercion);
        row.assign_group(&self.group_by)?;
        Ok(row)
    }

    fn replace_rows(&mut self, rows: Vec<Row>) -> Result<()> {
        self.rows = self.sort_rows(rows)?;
        self.invalidate();
        Ok(())
    }

    /// Sort rows descending by the sort key; without one the order is kept.
    ///
    /// The sort is stable, so rows with equal keys keep ingestion order.
    pub fn sort_rows(&self, mut rows: Vec<Row>) -> Result<Vec<Row>> {
        let Some(key) = self.config.sort_key.as_deref() else {
            return Ok(rows);
        };
        if let Some(missing) = rows.iter().find(|r| r.value(key).is_none()) {
            tracing::debug!(record = ?missing.record(), "row without sort key");
            return Err(TexTableError::MissingColumn {
                column: key.to_string(),
            });
        }
        rows.sort_by(|a, b| match (b.value(key), a.value(key)) {
            (Some(b), Some(a)) => b.compare(a),
            _ => std::cmp::Ordering::Equal,
        });
        Ok(rows)
    }

    /// Append one record.
    pub fn add_record(&mut self, record: Record) -> Result<()> {
        if self.default_cols.is_empty() {
            self.default_cols = record.keys().map(String::from).collect();
        }
        let row = self.build_row(record)?;
        self.add_prepared(row)
    }

    /// Append a row built elsewhere; it is regrouped with this table's settings.
    pub fn add_row(&mut self, row: Row) -> Result<()> {
        self.add_record(row.record().clone())
    }

    fn add_prepared(&mut self, row: Row) -> Result<()> {
        let mut rows = self.rows.clone();
        rows.push(row);
        self.replace_rows(rows)
    }

    /// Replace all rows with rows read from a CSV file.
    pub fn read_csv(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| TexTableError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.read_csv_from_reader(file)?;
        tracing::debug!(path = %path.display(), rows = self.rows.len(), "read csv");
        Ok(())
    }

    /// Replace all rows with rows read from CSV data.
    ///
    /// The first record is the header; later records map onto it by
    /// position. Short records leave the trailing columns absent.
    pub fn read_csv_from_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for result in reader.records() {
            let fields = result?;
            if fields.len() > headers.len() {
                return Err(TexTableError::InvalidRecord {
                    line: fields.position().map(|p| p.line()).unwrap_or(0),
                    message: format!(
                        "{} fields but the header has {}",
                        fields.len(),
                        headers.len()
                    ),
                });
            }
            let record = Record::from_pairs(headers.iter().zip(fields.iter()))?;
            rows.push(self.build_row(record)?);
        }

        self.default_cols = headers.iter().map(String::from).collect();
        self.replace_rows(rows)
    }

    /// Visible columns in output order.
    ///
    /// Falls back to the input columns when none are configured. The group
    /// key is never listed itself; when the group is shown the synthetic
    /// `group` column comes first.
    pub fn table_cols(&self) -> Vec<String> {
        let mut cols = if self.config.columns.is_empty() {
            self.default_cols
                .iter()
                .filter(|c| Some(c.as_str()) != self.config.group_key.as_deref())
                .cloned()
                .collect()
        } else {
            self.config.table_columns()
        };
        if self.shows_group() {
            cols.insert(0, GROUP_COLUMN.to_string());
        }
        cols
    }

    /// Group values in display order: the configured order, then undeclared
    /// groups in first-seen order.
    pub fn group_order(&self) -> Vec<Option<String>> {
        let mut order: Vec<Option<String>> = self
            .config
            .group_order
            .iter()
            .map(|g| Some(g.clone()))
            .collect();
        for row in &self.rows {
            let group = row.group().map(String::from);
            if !order.contains(&group) {
                order.push(group);
            }
        }
        order
    }

    /// Position of a group in the display order; unknown groups sort last.
    pub fn group_order_index(&self, group: Option<&str>) -> usize {
        let order = self.group_order();
        order
            .iter()
            .position(|g| g.as_deref() == group)
            .unwrap_or(order.len())
    }

    /// Row indices bucketed by group, buckets in display order.
    pub fn group_row_dict(&self) -> &[GroupBucket] {
        self.views.group_row_dict.get_or_init(|| {
            let mut buckets: Vec<GroupBucket> = Vec::new();
            for (index, row) in self.rows.iter().enumerate() {
                match buckets.iter_mut().find(|b| b.group.as_deref() == row.group()) {
                    Some(bucket) => bucket.rows.push(index),
                    None => buckets.push(GroupBucket {
                        group: row.group().map(String::from),
                        rows: vec![index],
                    }),
                }
            }
            let order = self.group_order();
            buckets.sort_by_key(|b| {
                order
                    .iter()
                    .position(|g| *g == b.group)
                    .unwrap_or(order.len())
            });
            tracing::debug!(groups = buckets.len(), "grouped rows");
            buckets
        })
    }

    /// Grouped rows split into chunks of at most `chunk_size` rows.
    ///
    /// An empty table yields a single empty chunk.
    pub fn table_chunks(&self) -> &[Vec<Placement>] {
        self.views.table_chunks.get_or_init(|| {
            let chunk_size = self.config.chunk_size.unwrap_or(usize::MAX);
            let mut chunks = Vec::new();
            let mut chunk = Vec::new();
            for bucket in self.group_row_dict() {
                for (i, &row) in bucket.rows.iter().enumerate() {
                    if chunk.len() == chunk_size {
                        chunks.push(std::mem::take(&mut chunk));
                    }
                    chunk.push(Placement {
                        row,
                        first_in_group: i == 0,
                    });
                }
            }
            chunks.push(chunk);
            chunks
        })
    }

    /// Header line maps with defaults filled in.
    ///
    /// A line mentioning the group key also labels the `group` column. A
    /// visible column missing from every line gets its escaped key in the
    /// first line.
    pub fn header_replacement_maps(&self) -> Vec<IndexMap<String, String>> {
        header_replacement_maps(
            &self.config.header_lines,
            &self.table_cols(),
            self.config.group_key.as_deref(),
        )
    }

    /// Rendered header lines, each terminated by `\\`.
    pub fn table_header(&self) -> &str {
        self.views.table_header.get_or_init(|| {
            let cols = self.table_cols();
            let mut header = String::new();
            for line in self.header_replacement_maps() {
                let cells: Vec<&str> = cols
                    .iter()
                    .map(|c| line.get(c).map(|s| s.as_str()).unwrap_or(""))
                    .collect();
                header.push_str(&cells.join(" & "));
                header.push_str("\\\\\n");
            }
            header
        })
    }

    /// Render one chunk body: header followed by one line per row.
    fn chunk_body(
        &self,
        chunk: &[Placement],
        cols: &[String],
        layout: &LineLayout,
    ) -> Result<String> {
        let mut tex = self.table_header().to_string();
        for placement in chunk {
            let row = &self.rows[placement.row];
            tex.push_str(&row.table_line(cols, layout, &self.rules, placement.first_in_group)?);
            tex.push('\n');
        }
        Ok(tex)
    }

    /// Header and row lines of every chunk, without table environments.
    pub fn tex_table_chunks(&self) -> Result<Vec<String>> {
        let cols = self.table_cols();
        let layout = self.line_layout();
        self.table_chunks()
            .iter()
            .map(|chunk| self.chunk_body(chunk, &cols, &layout))
            .collect()
    }

    /// The complete table markup, one environment per chunk.
    pub fn tex_table(&self) -> Result<String> {
        let mut tex = String::new();
        for chunk in self.tex_table_chunks()? {
            tex.push_str(&self.apply_table_definition(&chunk));
        }
        if self.config.landscape {
            tex = apply_landscape(&tex);
        }
        Ok(tex)
    }

    /// Width of a column in cm, looking through the `group` alias.
    pub fn col_width(&self, column: &str) -> Option<f64> {
        self.config.column_widths.get(self.config_key(column)).copied()
    }

    /// Left-hand separator of a column.
    pub fn col_separator(&self, column: &str) -> &str {
        self.config
            .column_separators
            .get(self.config_key(column))
            .map(|s| s.as_str())
            .unwrap_or(self.config.default_col_separator.as_str())
    }

    fn config_key<'a>(&'a self, column: &'a str) -> &'a str {
        if column == GROUP_COLUMN {
            self.config.group_key.as_deref().unwrap_or(column)
        } else {
            column
        }
    }

    /// Column specification, e.g. `|l |p{3.000 cm}|`.
    pub fn column_spec(&self) -> String {
        let defs: Vec<String> = self
            .table_cols()
            .iter()
            .map(|col| {
                let width = match self.col_width(col) {
                    Some(w) => format!("p{{{:.3} cm}}", w),
                    None => "l".to_string(),
                };
                format!("{}{}", self.col_separator(col), width)
            })
            .collect();
        format!("{}{}", defs.join(" "), self.config.default_col_separator)
    }

    /// Wrap a table body in the table environment.
    pub fn apply_table_definition(&self, body: &str) -> String {
        let style = &self.config.table_style;
        format!(
            "\\begin{{{style}}}{{{spec}}}\n{body}\\end{{{style}}}\n",
            style = style,
            spec = self.column_spec(),
            body = body
        )
    }

    /// Wrap markup in a standalone document.
    pub fn apply_document_definition(&self, tex: &str) -> String {
        let mut doc = String::from("\\documentclass{article}\n");
        doc.push_str("\\usepackage[a4paper, total={8in, 9in}]{geometry}\n");
        if self.config.landscape {
            doc.push_str("\\usepackage{lscape}\n");
        }
        for package in &self.config.packages {
            doc.push_str(&format!("\\usepackage{{{}}}\n", package));
        }
        doc.push_str("\\begin{document}\n");
        doc.push_str(tex);
        doc.push_str("\\end{document}\n");
        doc
    }

    /// Path of the standalone document: the output path with `.tex`
    /// replaced by `doc.tex`.
    pub fn document_path(&self) -> PathBuf {
        let out = self.config.out.to_string_lossy();
        let stem = out.strip_suffix(".tex").unwrap_or(&*out);
        PathBuf::from(format!("{}doc.tex", stem))
    }

    /// Write the table markup to the configured output path.
    pub fn write_tex_file(&self) -> Result<PathBuf> {
        let path = self.config.out.clone();
        write_file(&path, &self.tex_table()?)?;
        tracing::info!(path = %path.display(), "wrote table");
        Ok(path)
    }

    /// Write the table as a standalone document.
    pub fn write_tex_document_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let doc = self.apply_document_definition(&self.tex_table()?);
        write_file(path.as_ref(), &doc)
    }

    /// Write the standalone document and compile it.
    pub fn write_pdf_file(&self, compiler: &dyn DocumentCompiler) -> Result<PathBuf> {
        let path = self.document_path();
        self.write_tex_document_file(&path)?;
        let artifact = compiler.compile(&path)?;
        tracing::info!(path = %artifact.display(), "compiled document");
        Ok(artifact)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| TexTableError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Fill in default header entries for columns no header line mentions.
pub fn header_replacement_maps(
    lines: &[IndexMap<String, String>],
    cols: &[String],
    group_key: Option<&str>,
) -> Vec<IndexMap<String, String>> {
    let mut lines = if lines.is_empty() {
        vec![IndexMap::new()]
    } else {
        lines.to_vec()
    };

    if let Some(key) = group_key {
        for line in &mut lines {
            if let Some(label) = line.get(key).cloned() {
                line.insert(GROUP_COLUMN.to_string(), label);
            }
        }
    }

    for col in cols {
        if lines.iter().any(|line| line.contains_key(col)) {
            continue;
        }
        let label = if col == GROUP_COLUMN {
            escape_latex(group_key.unwrap_or(col))
        } else {
            escape_latex(col)
        };
        lines[0].insert(col.clone(), label);
    }

    lines
}

/// Wrap markup for landscape pages: tight padding, small font, centered.
pub fn apply_landscape(tex: &str) -> String {
    format!(
        concat!(
            "\\setlength\\tabcolsep{{2pt}}\n\\small\n\\begin{{center}}\n\\begin{{landscape}}\n",
            "{}\\end{{landscape}}\n\\end{{center}}\n",
        ),
        tex
    )
}
