//! Output rendering: aligned-column tables for lists, JSON or YAML for
//! structured records.

use anyhow::Result;
use serde::Serialize;

/// Print an aligned table; each column is as wide as its widest cell.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{h:<w$}"))
        .collect();
    println!("{}", header_line.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        println!("{}", line.join("  "));
    }
}

/// Print one structured record, as pretty JSON or YAML.
pub fn print_record<T: Serialize>(record: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        print!("{}", serde_yaml_ng::to_string(record)?);
    }
    Ok(())
}

/// Print a list of records, as a JSON array or via the row formatter.
pub fn print_list<T: Serialize>(
    records: &[T],
    json: bool,
    headers: &[&str],
    to_row: impl Fn(&T) -> Vec<String>,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        let rows: Vec<Vec<String>> = records.iter().map(to_row).collect();
        print_table(headers, &rows);
    }
    Ok(())
}

/// "none" for empty strings, mirroring the table output conventions.
pub fn string_or_none(s: &str) -> String {
    if s.is_empty() {
        "none".to_string()
    } else {
        s.to_string()
    }
}
