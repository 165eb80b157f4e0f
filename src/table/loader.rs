//! CSV loading with coordinate extraction.
//!
//! Reads the whole input file with the `csv` crate, so quoted fields with
//! embedded commas or newlines survive untouched, and parses the configured
//! longitude/latitude columns of every row up front. Any bad coordinate is
//! reported before a single request is sent.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

use csv::ReaderBuilder;

use crate::config::ColumnNames;
use crate::error::AppError;
use crate::table::model::{Coordinate, Table};

/// Byte order mark some spreadsheet exports put in front of the first header.
const UTF8_BOM: char = '\u{feff}';

/// Loads a CSV file and extracts the coordinate pair of every row.
///
/// # Errors
///
/// - `AppError::InputNotFound` if the file does not exist
/// - `AppError::InvalidInput` if the file has no header, lacks one of the
///   coordinate columns, has a malformed record, or holds a coordinate that is
///   not a decimal number in range
pub async fn load_table(path: &Path, columns: &ColumnNames) -> Result<Table, AppError> {
    let path = path.to_owned();
    let longitude = columns.longitude.clone();
    let latitude = columns.latitude.clone();

    tokio::task::spawn_blocking(move || load_table_blocking(&path, &longitude, &latitude))
        .await
        .map_err(|e| AppError::Unexpected(format!("Task join error: {}", e)))?
}

fn load_table_blocking(
    path: &Path,
    longitude_column: &str,
    latitude_column: &str,
) -> Result<Table, AppError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::InputNotFound(path.display().to_string()),
        _ => AppError::InvalidInput(format!("Failed to open {}: {}", path.display(), e)),
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches(UTF8_BOM).to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::InvalidInput(
            "CSV file has no header row".to_string(),
        ));
    }

    let lon_idx = find_column(&headers, longitude_column)?;
    let lat_idx = find_column(&headers, latitude_column)?;

    let mut rows = Vec::new();
    let mut coordinates = Vec::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV record: {}", e)))?;

        // Line numbers are 1-based and include the header line
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let longitude = parse_degrees(record.get(lon_idx), longitude_column, line, 180.0)?;
        let latitude = parse_degrees(record.get(lat_idx), latitude_column, line, 90.0)?;

        coordinates.push(Coordinate::new(longitude, latitude));
        rows.push(record);
    }

    tracing::debug!(
        path = %path.display(),
        rows = rows.len(),
        columns = headers.len(),
        "[TABLE] Loaded input table"
    );

    Ok(Table::new(headers, rows, coordinates))
}

fn find_column(headers: &[String], name: &str) -> Result<usize, AppError> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Missing column '{}' (found: {})",
            name,
            headers.join(", ")
        ))
    })
}

/// Parses a decimal-degree cell and checks it lies within `[-limit, limit]`.
fn parse_degrees(cell: Option<&str>, column: &str, line: u64, limit: f64) -> Result<f64, AppError> {
    let raw = cell.unwrap_or("").trim();
    let value: f64 = raw.parse().map_err(|_| {
        AppError::InvalidInput(format!(
            "Line {}: '{}' value '{}' is not a decimal number",
            line, column, raw
        ))
    })?;

    if !value.is_finite() || value.abs() > limit {
        return Err(AppError::InvalidInput(format!(
            "Line {}: '{}' value {} is outside [-{}, {}]",
            line, column, raw, limit, limit
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Helper to create a test CSV file and return its path.
    fn create_test_csv(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("input.csv");
        fs::write(&path, content).expect("Failed to write test CSV");
        path
    }

    fn columns() -> ColumnNames {
        ColumnNames {
            longitude: "lon".to_string(),
            latitude: "lat".to_string(),
            ..ColumnNames::default()
        }
    }

    #[tokio::test]
    async fn loads_rows_and_coordinates_in_order() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(
            &dir,
            "id,lat,lon,depth\n1,25.77,-80.19,0.4\n2,25.78,-80.20,1.2\n3,25.79,-80.21,0.0\n",
        );

        let table = load_table(&source, &columns()).await.expect("load failed");

        assert_eq!(table.headers(), &["id", "lat", "lon", "depth"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.coordinates()[0], Coordinate::new(-80.19, 25.77));
        assert_eq!(table.coordinates()[2], Coordinate::new(-80.21, 25.79));
        assert_eq!(&table.rows()[1][0], "2");
        assert_eq!(&table.rows()[1][3], "1.2");
    }

    #[tokio::test]
    async fn default_column_names_match_flood_export() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(
            &dir,
            "Station,Latitude (Dec. Deg),Longitude (Dec. Deg)\nA,25.7617,-80.1918\n",
        );

        let table = load_table(&source, &ColumnNames::default())
            .await
            .expect("load failed");

        assert_eq!(table.coordinates(), &[Coordinate::new(-80.1918, 25.7617)]);
    }

    #[tokio::test]
    async fn missing_file_is_input_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.csv");

        let result = load_table(&path, &columns()).await;

        match result {
            Err(AppError::InputNotFound(p)) => assert!(p.ends_with("nope.csv")),
            other => panic!("Expected InputNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_coordinate_column_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "id,lat\n1,25.0\n");

        let result = load_table(&source, &columns()).await;

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("'lon'")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_numeric_coordinate_reports_line() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "lat,lon\n25.0,-80.0\n25.1,west\n");

        let result = load_table(&source, &columns()).await;

        match result {
            Err(AppError::InvalidInput(msg)) => {
                assert!(msg.contains("Line 3"), "unexpected message: {}", msg);
                assert!(msg.contains("west"));
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn out_of_range_latitude_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "lat,lon\n95.0,-80.0\n");

        let result = load_table(&source, &columns()).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn ragged_record_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "lat,lon,name\n25.0,-80.0\n");

        let result = load_table(&source, &columns()).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn empty_file_has_no_header() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "");

        let result = load_table(&source, &columns()).await;

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("header")),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn header_only_file_loads_empty_table() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "lat,lon\n");

        let table = load_table(&source, &columns()).await.expect("load failed");

        assert!(table.is_empty());
        assert_eq!(table.headers(), &["lat", "lon"]);
    }

    #[tokio::test]
    async fn bom_is_stripped_from_first_header() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "\u{feff}lon,lat\n-80.0,25.0\n");

        let table = load_table(&source, &columns()).await.expect("load failed");

        assert_eq!(table.headers()[0], "lon");
        assert_eq!(table.column_index("lon"), Some(0));
    }

    #[tokio::test]
    async fn quoted_passthrough_fields_are_preserved() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(
            &dir,
            "lat,lon,note\n25.0,-80.0,\"Flooded, knee deep\nat the corner\"\n",
        );

        let table = load_table(&source, &columns()).await.expect("load failed");

        assert_eq!(&table.rows()[0][2], "Flooded, knee deep\nat the corner");
    }

    #[tokio::test]
    async fn whitespace_around_numbers_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let source = create_test_csv(&dir, "lat,lon\n 25.5 , -80.25 \n");

        let table = load_table(&source, &columns()).await.expect("load failed");

        assert_eq!(table.coordinates()[0], Coordinate::new(-80.25, 25.5));
        // Raw cell is kept verbatim for passthrough
        assert_eq!(&table.rows()[0][0], " 25.5 ");
    }
}
