use crate::error::{FormError, Result};
use crate::forms::settings::CsvGrid;

/// Reject uploads that are not named `*.csv`.
pub fn ensure_csv_file_name(file_name: &str) -> Result<()> {
    if file_name.to_ascii_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(FormError::InvalidCsv(format!(
            "'{}' is not a .csv file",
            file_name
        )))
    }
}

/// Parse CSV bytes into a grid. No header handling: row 0 stays in the grid
/// and rows may have different widths.
pub fn parse_csv(bytes: &[u8]) -> Result<CsvGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
