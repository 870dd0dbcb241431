//! Output formatting: present a table as data.
//!
//! The LaTeX text comes from [`TexTable`](crate::TexTable) itself. This module
//! provides the data view of the same layout:
//!
//! - **TableView**: columns, header lines and chunks of rendered rows
//! - **ViewRow**: one row's group, group-start flag and cell markup
//!
//! TableView is a pure presentation layer. Grouping, sorting and chunking
//! all happen in the table.
//!
//! ## Example
//!
//! ```rust,ignore
//! use textablelib::output::TableView;
//!
//! let view = TableView::from_table(&table)?;
//! // view.columns: ["group", "name", "mass"]
//! // view.chunks[0][0]: ViewRow { group: Some("quark"), first_in_group: true, cells: [...] }
//! ```

pub mod view;

pub use view::{TableView, ViewRow};
