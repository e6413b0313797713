//! Output rendering for the CLI
//!
//! JSON formats serialize the command's result value directly; human and CSV
//! formats render a flattened [`View`] of it.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table output
    Human,
    /// JSON output (pretty-printed)
    Json,
    /// JSON output (compact)
    JsonCompact,
    /// CSV output
    Csv,
}

/// Flattened rendering of a command result
pub enum View {
    /// Label/value pairs describing one record
    Fields {
        title: String,
        fields: Vec<(&'static str, String)>,
    },
    /// Rows under a header line
    Table {
        title: String,
        headers: Vec<&'static str>,
        rows: Vec<Vec<String>>,
    },
}

pub fn print_result<T: Serialize>(value: &T, view: View, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => print_human(&view),
        OutputFormat::Json => print_json(value, true)?,
        OutputFormat::JsonCompact => print_json(value, false)?,
        OutputFormat::Csv => print_csv(&view)?,
    }
    Ok(())
}

fn print_human(view: &View) {
    println!();
    match view {
        View::Fields { title, fields } => {
            println!("{}", title.bold().cyan());
            println!("{}", "─".repeat(50).dimmed());
            for (label, value) in fields {
                if value.is_empty() {
                    continue;
                }
                println!("{:>15}: {}", label.bold(), value);
            }
        }
        View::Table {
            title,
            headers,
            rows,
        } => {
            println!("{}", title.bold().cyan());

            let widths = column_widths(headers, rows);
            let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
            println!("{}", "─".repeat(total.max(50)).dimmed());

            let header: Vec<String> = headers
                .iter()
                .zip(&widths)
                .map(|(h, w)| format!("{:<w$}", h, w = *w))
                .collect();
            println!("{}", header.join("  ").bold());

            if rows.is_empty() {
                println!("{}", "(none)".dimmed());
            }
            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| format!("{:<w$}", c, w = *w))
                    .collect();
                println!("{}", cells.join("  ").trim_end());
            }
        }
    }
    println!();
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}

fn print_csv(view: &View) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    match view {
        View::Fields { fields, .. } => {
            wtr.write_record(fields.iter().map(|(label, _)| *label))?;
            wtr.write_record(fields.iter().map(|(_, value)| value.as_str()))?;
        }
        View::Table { headers, rows, .. } => {
            wtr.write_record(headers)?;
            for row in rows {
                wtr.write_record(row)?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}
