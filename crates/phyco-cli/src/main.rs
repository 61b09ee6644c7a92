//! Phyco CLI - project inspection and export tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use phyco::prelude::*;
use phyco::{format_number, StatisticSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "phyco")]
#[command(author, version, about = "Inspect, recalculate and export phyco projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a project
    Info {
        /// Input project file (JSON)
        input: PathBuf,
    },

    /// Recalculate every formula column and save the project
    Recalc {
        /// Input project file (JSON)
        input: PathBuf,

        /// Output project file (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the table as CSV to stdout or a file
    #[command(alias = "csv")]
    Export {
        /// Input project file (JSON)
        input: PathBuf,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field delimiter (default: comma)
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Recalculate formulas before export
        #[arg(short, long)]
        calculate: bool,

        /// Text for undefined numbers in recalculated cells
        #[arg(long, default_value = "NaN")]
        nan_text: String,
    },

    /// Print the statistics of one column
    Stats {
        /// Input project file (JSON)
        input: PathBuf,

        /// Column name
        column: String,
    },

    /// Check that saved formula cells match a fresh recalculation
    Check {
        /// Input project file (JSON)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input } => show_info(&input),
        Commands::Recalc { input, output } => recalc(&input, output.as_deref()),
        Commands::Export {
            input,
            output,
            delimiter,
            calculate,
            nan_text,
        } => export(&input, output.as_deref(), delimiter, calculate, nan_text),
        Commands::Stats { input, column } => show_stats(&input, &column),
        Commands::Check { input } => check(&input),
    }
}

fn open(input: &Path, options: EngineOptions) -> Result<Editor> {
    Editor::open(input, options).with_context(|| format!("Failed to open '{}'", input.display()))
}

fn show_info(input: &Path) -> Result<()> {
    let editor = open(input, EngineOptions::default())?;
    let table = editor.table();

    println!("File: {}", input.display());
    println!("Rows: {}", table.row_count());
    println!("Columns: {}", table.column_count());
    for column in table.columns() {
        match column.raw_expression() {
            Some(raw) => println!("  {}\t{}\t{} = {}", column.key(), column.column_type(), column.name(), raw),
            None => println!("  {}\t{}\t{}", column.key(), column.column_type(), column.name()),
        }
    }

    println!("Charts: {}", table.charts().len());
    for chart in table.charts() {
        let columns: Vec<&str> = chart
            .referenced_columns()
            .iter()
            .filter_map(|key| table.column(key))
            .map(|column| column.name())
            .collect();
        println!("  {}\t{}\t{} [{}]", chart.key, chart.kind, chart.name, columns.join(", "));
    }
    println!("Dependencies: {}", table.graph().edges().len());

    Ok(())
}

fn recalc(input: &Path, output: Option<&Path>) -> Result<()> {
    let mut editor = open(input, EngineOptions::default())?;
    let count = editor.recalculate_all();

    let target = output.unwrap_or(input);
    editor
        .save(target)
        .with_context(|| format!("Failed to write '{}'", target.display()))?;
    eprintln!("Recalculated {} formula columns into '{}'", count, target.display());
    Ok(())
}

fn export(
    input: &Path,
    output: Option<&Path>,
    delimiter: char,
    calculate: bool,
    nan_text: String,
) -> Result<()> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }

    let mut editor = open(input, EngineOptions::new().with_nan_text(nan_text))?;
    if calculate {
        let count = editor.recalculate_all();
        eprintln!("Calculated {} formula columns", count);
    }

    let mut builder = csv::WriterBuilder::new();
    builder.delimiter(delimiter as u8);

    match output {
        Some(path) => {
            let writer = builder
                .from_path(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            let rows = write_table(writer, editor.table())?;
            eprintln!("Wrote {} rows to '{}'", rows, path.display());
        }
        None => {
            write_table(builder.from_writer(io::stdout()), editor.table())?;
        }
    }

    Ok(())
}

/// Header of names, then one record per row
fn write_table<W: io::Write>(mut writer: csv::Writer<W>, table: &TableStore) -> Result<usize> {
    let columns = table.columns();
    writer
        .write_record(columns.iter().map(|c| c.name()))
        .context("Failed to write header")?;

    for row in table.rows() {
        writer
            .write_record(columns.iter().map(|c| row.get(c.key()).unwrap_or("")))
            .with_context(|| format!("Failed to write row {}", row.key))?;
    }

    writer.flush().context("Failed to flush output")?;
    Ok(table.row_count())
}

fn show_stats(input: &Path, name: &str) -> Result<()> {
    let mut editor = open(input, EngineOptions::default())?;
    let key = match editor.table().column_by_name(name) {
        Some(column) if column.column_type().is_numeric() => column.key().clone(),
        Some(_) => bail!("Column '{}' is not numeric", name),
        None => bail!("No column named '{}'", name),
    };

    let kinds: StatisticSet = StatisticKind::ALL.into_iter().collect();
    let values = editor.column_statistics(&key, &kinds);
    for kind in StatisticKind::ALL {
        let value = values.get(kind).unwrap_or(f64::NAN);
        println!("{}\t{}", kind, format_number(value, "NaN"));
    }
    Ok(())
}

fn check(input: &Path) -> Result<()> {
    let saved = open(input, EngineOptions::default())?;
    let mut fresh = saved.clone();
    fresh.recalculate_all();

    let mut stale = 0;
    for column in saved.table().columns() {
        if column.as_formula().is_none() {
            continue;
        }
        let before = saved.table().column_cells(column.key());
        let after = fresh.table().column_cells(column.key());
        let differing = before.iter().zip(&after).filter(|(a, b)| a != b).count();
        if differing > 0 {
            eprintln!("Column '{}': {} stale cells", column.name(), differing);
            stale += differing;
        }
    }

    if stale > 0 {
        bail!("{} formula cells differ from a fresh recalculation", stale);
    }
    eprintln!("All formula cells are up to date");
    Ok(())
}
