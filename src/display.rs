// Result rendering
// Formats query results for the shell: box-drawn tables for people, JSON
// lines for scripts

use crate::driver::ResultRow;
use crate::storage::Value;
use serde_json::{json, Map};

/// Render rows as a box table followed by a row count
pub fn format_table(columns: &[String], rows: &[ResultRow]) -> String {
    if rows.is_empty() {
        return "No rows found".to_string();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.values().iter().map(Value::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut result = String::new();
    result.push_str(&border(&widths, '┌', '┬', '┐'));
    result.push_str(&line(columns, &widths));
    result.push_str(&border(&widths, '├', '┼', '┤'));
    for row in &cells {
        result.push_str(&line(row, &widths));
    }
    result.push_str(&border(&widths, '└', '┴', '┘'));
    result.push_str(&format!("\n{} row(s) returned", rows.len()));
    result
}

fn border(widths: &[usize], left: char, middle: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}\n", left, segments.join(&middle.to_string()), right)
}

fn line(cells: &[String], widths: &[usize]) -> String {
    let mut result = String::from("│");
    for (cell, width) in cells.iter().zip(widths) {
        result.push_str(&format!(" {:<width$} │", cell, width = width));
    }
    result.push('\n');
    result
}

/// Render rows as one JSON object per line, keyed by column label
pub fn format_json_lines(rows: &[ResultRow]) -> String {
    rows.iter()
        .map(|row| {
            let object: Map<String, serde_json::Value> = row
                .columns()
                .iter()
                .zip(row.values())
                .map(|(column, value)| (column.clone(), to_json(value)))
                .collect();
            serde_json::Value::Object(object).to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message for a statement that changed rows instead of returning them
pub fn format_update(affected_rows: u64, generated_key: Option<i64>) -> String {
    match generated_key {
        Some(key) => format!("{} row(s) affected, generated key {}", affected_rows, key),
        None => format!("{} row(s) affected", affected_rows),
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Boolean(b) => json!(b),
        Value::Text(s) => json!(s),
        // Blobs print as byte arrays
        Value::Blob(bytes) => json!(bytes),
        Value::Time(_) | Value::Date(_) | Value::Timestamp(_) => json!(value.to_string()),
    }
}
