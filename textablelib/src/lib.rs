//! # textablelib
//!
//! Render tabular records (typically read from CSV) as LaTeX tables.
//!
//! ## Overview
//!
//! A [`TexTable`] takes records of column → text, coerces numeric fields and
//! turns every cell into LaTeX markup:
//!
//! - **Numbers** are rounded to a fixed number of significant digits, switching
//!   to `\cdot10^{n}` notation outside a readable range
//! - **Text** goes through literal replacements and LaTeX escaping
//! - **Raw columns** are passed through untouched
//! - **Column functions** compute a cell from the whole row
//!
//! Rows can be sorted, grouped (with an explicit group order and visible
//! group labels) and split into chunks, each rendered as its own table
//! environment with the header repeated.
//!
//! ## Features
//!
//! - **Declarative config**: everything is a [`TableConfig`], built in code or
//!   loaded from TOML
//! - **Error-aware rounding**: values and their uncertainties are rounded
//!   together via [`Rounder`]
//! - **Standalone documents**: wrap the table in a document and compile it
//!   through a [`DocumentCompiler`]
//! - **JSON view**: [`TableView`] exposes the resolved cells as data
//!
//! ## Example
//!
//! ```rust
//! use textablelib::{TableConfig, TexTable};
//!
//! let config = TableConfig::new()
//!     .add_column_keys(["name", "mass"])
//!     .add_header_line([("name", "Particle"), ("mass", "$m$ [GeV]")])
//!     .sort_key("mass");
//!
//! let mut table = TexTable::new(config).unwrap();
//! table
//!     .read_csv_from_reader("name,mass\nmuon,0.1057\ntop_quark,172.69\n".as_bytes())
//!     .unwrap();
//!
//! let tex = table.tex_table().unwrap();
//! assert!(tex.starts_with("\\begin{tabular}{|l |l|}\nParticle & $m$ [GeV]\\\\\n"));
//! assert!(tex.contains("top\\_quark & 173\\\\\nmuon & 0.106\\\\\n"));
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod escape;
pub mod output;
pub mod record;
pub mod replace;
pub mod rounding;
pub mod row;
pub mod table;

pub use compile::{DocumentCompiler, PdfLatex};
pub use config::{ColumnFunction, ReplacementRule, TableConfig};
pub use error::TexTableError;
pub use escape::escape_latex;
pub use output::{TableView, ViewRow};
pub use record::{Coercion, Record, Value};
pub use replace::Replacements;
pub use rounding::{Dialect, Errors, Rounded, Rounder};
pub use row::{ColumnFn, ColumnRules, GroupBy, GroupFn, GroupSeparator, LineLayout, Row};
pub use table::{GroupBucket, Placement, TexTable};

/// Result type for textablelib operations
pub type Result<T> = std::result::Result<T, TexTableError>;
