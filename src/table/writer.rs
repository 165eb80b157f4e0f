//! Writes the input table back out with the snapped columns added.

use std::path::{Path, PathBuf};

use crate::config::ColumnNames;
use crate::error::AppError;
use crate::table::atomic_writer::AtomicCsvWriter;
use crate::table::model::{SnappedPoint, Table};

/// Where each snapped value lands in an output row.
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Overwrite an existing input column at this index.
    Replace(usize),
    /// New trailing column.
    Append,
}

/// Writes `table` plus the snapped latitude/longitude columns to `path`.
///
/// Result `i` fills row `i`. Columns are appended after the input columns; a
/// snapped column whose name already exists in the input is overwritten in
/// place instead. No index column is written.
///
/// # Errors
///
/// - `AppError::ResponseShape` if `snapped` and the table differ in length
/// - `AppError::OutputFailed` if the file cannot be written; any previous
///   file at `path` is left untouched
pub async fn write_snapped_table(
    table: Table,
    snapped: Vec<SnappedPoint>,
    path: &Path,
    columns: &ColumnNames,
) -> Result<PathBuf, AppError> {
    if snapped.len() != table.len() {
        return Err(AppError::ResponseShape(format!(
            "{} snapped points for {} rows",
            snapped.len(),
            table.len()
        )));
    }

    let path = path.to_owned();
    let columns = columns.clone();

    tokio::task::spawn_blocking(move || write_blocking(&table, &snapped, &path, &columns))
        .await
        .map_err(|e| AppError::Unexpected(format!("Task join error: {}", e)))?
}

fn write_blocking(
    table: &Table,
    snapped: &[SnappedPoint],
    path: &Path,
    columns: &ColumnNames,
) -> Result<PathBuf, AppError> {
    let mut headers: Vec<String> = table.headers().to_vec();
    let lat_slot = slot_for(table, &mut headers, &columns.snapped_latitude);
    let lon_slot = slot_for(table, &mut headers, &columns.snapped_longitude);

    let mut writer = AtomicCsvWriter::new(path)?;
    writer.write_record(&headers)?;

    for (record, point) in table.rows().iter().zip(snapped) {
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        place(&mut fields, lat_slot, point.latitude);
        place(&mut fields, lon_slot, point.longitude);
        writer.write_record(&fields)?;
    }

    let rows = writer.rows_written().saturating_sub(1);
    let written = writer.finish()?;

    tracing::debug!(
        path = %written.display(),
        rows,
        columns = headers.len(),
        "[TABLE] Wrote snapped table"
    );

    Ok(written)
}

fn slot_for(table: &Table, headers: &mut Vec<String>, name: &str) -> Slot {
    match table.column_index(name) {
        Some(idx) => Slot::Replace(idx),
        None => {
            headers.push(name.to_string());
            Slot::Append
        }
    }
}

fn place(fields: &mut Vec<String>, slot: Slot, value: f64) {
    let text = format_degrees(value);
    match slot {
        Slot::Replace(idx) => fields[idx] = text,
        Slot::Append => fields.push(text),
    }
}

/// Shortest round-trip decimal, keeping a `.0` on whole degrees so the snapped
/// columns always read as floats.
fn format_degrees(value: f64) -> String {
    let mut text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}
