// 🖨️ Output - text tables, CSV and JSON
//
// Every writer takes `impl Write` so the binary prints to stdout and tests
// write into a Vec<u8>.

use crate::daily::{DailyTable, TableCell};
use crate::error::Result;
use crate::extract::{AccountSplits, AccountSummary, BalanceRecord, SplitRecord};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned, indexed table
    #[default]
    Text,
    Csv,
    Json,
}

// ============================================================================
// RECORD TABLES
// ============================================================================

pub fn write_splits<W: Write>(out: W, records: &[SplitRecord], format: OutputFormat) -> Result<()> {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.account.clone(),
                r.account_type.to_string(),
                r.date.to_string(),
                r.description.clone(),
                format!("{:.2}", r.amount),
            ]
        })
        .collect();

    write_records(
        out,
        &["account", "type", "date", "description", "amount"],
        rows,
        records,
        format,
    )
}

pub fn write_balances<W: Write>(out: W, records: &[BalanceRecord], format: OutputFormat) -> Result<()> {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.account.clone(),
                r.account_type.to_string(),
                r.date.to_string(),
                format!("{:.2}", r.balance),
            ]
        })
        .collect();

    write_records(out, &["account", "type", "date", "balance"], rows, records, format)
}

pub fn write_accounts<W: Write>(out: W, accounts: &[AccountSummary], format: OutputFormat) -> Result<()> {
    let rows = accounts
        .iter()
        .map(|a| vec![a.account.clone(), a.name.clone(), a.account_type.to_string()])
        .collect();

    write_records(out, &["account", "name", "type"], rows, accounts, format)
}

fn write_records<W: Write, R: Serialize>(
    mut out: W,
    headers: &[&str],
    text_rows: Vec<Vec<String>>,
    records: &[R],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text_table(&mut out, headers, &text_rows)?,
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            // Header row is written by the first serialize; empty input still gets one
            if records.is_empty() {
                wtr.write_record(headers)?;
            }
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

// ============================================================================
// DAILY TABLE
// ============================================================================

pub fn write_daily<W: Write, T: TableCell>(mut out: W, table: &DailyTable<T>, format: OutputFormat) -> Result<()> {
    let mut headers = vec!["date"];
    headers.extend(table.columns().iter().map(|c| c.as_str()));

    match format {
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = table
                .rows()
                .map(|(date, cells)| {
                    std::iter::once(date.to_string())
                        .chain(cells.iter().map(|c| c.text()))
                        .collect()
                })
                .collect();
            write_text_table(&mut out, &headers, &rows)?;
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            wtr.write_record(&headers)?;
            for (date, cells) in table.rows() {
                let mut record = vec![date.to_string()];
                record.extend(cells.iter().map(|c| c.field()));
                wtr.write_record(&record)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => {
            let rows = table
                .rows()
                .map(|(date, cells)| -> Result<serde_json::Value> {
                    let mut row = serde_json::Map::new();
                    row.insert("date".to_string(), serde_json::json!(date));
                    for (column, cell) in table.columns().iter().zip(cells) {
                        row.insert(column.clone(), serde_json::to_value(cell)?);
                    }
                    Ok(serde_json::Value::Object(row))
                })
                .collect::<Result<Vec<_>>>()?;
            serde_json::to_writer_pretty(&mut out, &rows)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

// ============================================================================
// EXPENSE DUMP
// ============================================================================

/// "Expense Accounts:" header, then each account name followed by one
/// `date: description: amount` line per split
pub fn write_expense_dump<W: Write>(mut out: W, grouped: &[AccountSplits]) -> Result<()> {
    writeln!(out, "Expense Accounts:")?;
    writeln!(out)?;

    for group in grouped {
        writeln!(out, "{}", group.account)?;
        for split in &group.splits {
            writeln!(out, "{}: {}: {:.6}", split.date, split.description, split.amount)?;
        }
    }
    Ok(())
}

// ============================================================================
// TEXT TABLE
// ============================================================================

/// Right-aligned columns with a leading row index
fn write_text_table<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
    if rows.is_empty() {
        writeln!(out, "Empty table")?;
        writeln!(out, "Columns: [{}]", headers.join(", "))?;
        return Ok(());
    }

    let index_width = (rows.len() - 1).to_string().len();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r.get(i).map_or(0, |c| c.chars().count()))
                .max()
                .unwrap_or(0)
                .max(h.chars().count())
        })
        .collect();

    write!(out, "{:iw$}", "", iw = index_width)?;
    for (h, w) in headers.iter().zip(&widths) {
        write!(out, "  {:>w$}", h, w = *w)?;
    }
    writeln!(out)?;

    for (i, row) in rows.iter().enumerate() {
        write!(out, "{:<iw$}", i, iw = index_width)?;
        for (cell, w) in row.iter().zip(&widths) {
            write!(out, "  {:>w$}", cell, w = *w)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
