//! # textable
//!
//! A CLI tool that turns CSV files into LaTeX tables.
//!
//! ## Overview
//!
//! textable is built on top of textablelib. It reads a CSV file, applies an
//! optional TOML table config plus command-line overrides, and writes the
//! table markup. Numbers are rounded to significant digits, text is escaped,
//! and rows can be sorted, grouped and split into chunks.
//!
//! ## Usage
//!
//! ```bash
//! # Render data.csv to outtable.tex
//! textable data.csv
//!
//! # Use a config file and choose the output path
//! textable data.csv -c table.toml -o results.tex
//!
//! # Group by a column, show the group labels, 10 rows per table
//! textable data.csv --group-key kind --show-group --chunk-size 10
//!
//! # Print the resolved cells as JSON
//! textable data.csv --output json
//!
//! # Also build a standalone document and compile it with pdflatex
//! textable data.csv --pdf
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::Style;
use textablelib::{PdfLatex, TableConfig, TableView, TexTable};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("textable")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Tobias Pook")
        .about("Turn CSV files into LaTeX tables")
        .arg(
            Arg::new("csv")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("CSV file with a header line"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(clap::value_parser!(PathBuf))
                .help("TOML table config"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .value_name("LEVEL")
                .value_parser(["ERROR", "WARNING", "INFO", "DEBUG"])
                .ignore_case(true)
                .default_value("INFO")
                .help("Log level (RUST_LOG takes precedence)"),
        )
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Output .tex path (overrides the config)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_parser(["tex", "json"])
                .default_value("tex")
                .help("Write the table file (tex) or print the resolved cells (json)"),
        )
        .arg(
            Arg::new("pdf")
                .long("pdf")
                .action(ArgAction::SetTrue)
                .help("Also write a standalone document and compile it with pdflatex"),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_parser(clap::value_parser!(usize))
                .help("Rows per table block"),
        )
        .arg(
            Arg::new("landscape")
                .long("landscape")
                .action(ArgAction::SetTrue)
                .help("Wrap the table for landscape pages"),
        )
        .arg(
            Arg::new("sort-key")
                .long("sort-key")
                .help("Sort rows descending by this column"),
        )
        .arg(
            Arg::new("group-key")
                .long("group-key")
                .help("Group rows by this column"),
        )
        .arg(
            Arg::new("show-group")
                .long("show-group")
                .action(ArgAction::SetTrue)
                .help("Render the group label as the first column"),
        )
        .arg(
            Arg::new("significant-digits")
                .long("significant-digits")
                .value_parser(clap::value_parser!(u32))
                .help("Significant digits for numeric cells"),
        )
}

/// Map a `--debug` level to a filter directive
fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARNING" => "warn",
        "DEBUG" => "debug",
        _ => "info",
    }
}

fn init_tracing(level: &str) {
    let directive = level_directive(level);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("textable={0},textablelib={0}", directive).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the config file (if any) and apply command-line overrides
fn build_config(matches: &ArgMatches) -> anyhow::Result<TableConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => TableConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TableConfig::new(),
    };

    if let Some(out) = matches.get_one::<PathBuf>("out") {
        config.out = out.clone();
    }
    if let Some(size) = matches.get_one::<usize>("chunk-size") {
        config.chunk_size = Some(*size);
    }
    if matches.get_flag("landscape") {
        config.landscape = true;
    }
    if let Some(key) = matches.get_one::<String>("sort-key") {
        config.sort_key = Some(key.clone());
    }
    if let Some(key) = matches.get_one::<String>("group-key") {
        config.group_key = Some(key.clone());
    }
    if matches.get_flag("show-group") {
        config.hide_group = false;
    }
    if let Some(digits) = matches.get_one::<u32>("significant-digits") {
        config.significant_digits = *digits;
    }

    Ok(config)
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = build_config(matches)?;
    tracing::debug!(?config, "effective config");
    let mut table = TexTable::new(config)?;

    let csv = matches
        .get_one::<PathBuf>("csv")
        .context("missing CSV path")?;
    table
        .read_csv(csv)
        .with_context(|| format!("reading {}", csv.display()))?;

    let highlight = Style::new().green().bold();
    match matches.get_one::<String>("output").map(|s| s.as_str()) {
        Some("json") => {
            let view = TableView::from_table(&table)?;
            tracing::debug!(rows = view.row_count(), chunks = view.chunks.len(), "json view");
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        _ => {
            let path = table.write_tex_file()?;
            println!("{} {}", highlight.apply_to("Wrote"), path.display());
        }
    }

    if matches.get_flag("pdf") {
        let pdf = table.write_pdf_file(&PdfLatex::default())?;
        println!("{} {}", highlight.apply_to("Compiled"), pdf.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();

    let level = matches
        .get_one::<String>("debug")
        .map(|s| s.as_str())
        .unwrap_or("INFO");
    init_tracing(level);

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", Style::new().red().bold().apply_to("Error:"), e);
            ExitCode::FAILURE
        }
    }
}
