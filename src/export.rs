use crate::display::strip_uncertainty;
use crate::table::TableData;
use std::error::Error;

/// Convert a table to CSV format
///
/// Writes the header row followed by one record per table row, in header
/// order. Every uncertainty marker (and the whitespace around it) is removed
/// from cell values; nothing else is altered. Quoting follows the usual CSV
/// rules: fields containing commas, quotes or newlines are quoted and quotes
/// are doubled. There is no trailing newline after the last record.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use tablesnap::table::TableData;
/// use tablesnap::export::to_csv;
///
/// let table = TableData::new(
///     vec!["Item".into(), "Qty".into()],
///     vec![vec!["Pen".into(), "10[?]".into()]],
/// );
/// assert_eq!(to_csv(&table).unwrap(), "Item,Qty\nPen,10");
/// ```
pub fn to_csv(table: &TableData) -> Result<String, Box<dyn Error>> {
    write_delimited(table, b',')
}

/// Convert a table to tab-separated text for pasting into a spreadsheet
///
/// Same cleaning rule as [`to_csv`]; fields that contain tabs, quotes or
/// newlines are quoted, which spreadsheet applications accept on paste.
pub fn to_tsv(table: &TableData) -> Result<String, Box<dyn Error>> {
    write_delimited(table, b'\t')
}

fn write_delimited(table: &TableData, delimiter: u8) -> Result<String, Box<dyn Error>> {
    if table.column_count() == 0 {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| strip_uncertainty(value).into_owned()))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut content = String::from_utf8(bytes)?;
    if content.ends_with('\n') {
        content.pop();
    }
    Ok(content)
}

/// What one exported XLSX cell holds.
#[derive(Debug, Clone, PartialEq)]
pub enum XlsxCell {
    Number(f64),
    Text(String),
}

/// Decides how a stored value is written to the workbook: numeric columns
/// whose cleaned value parses as a finite number become numbers, everything
/// else is text with the uncertainty marker removed.
pub fn xlsx_value(header: &str, value: &str) -> XlsxCell {
    let cleaned = strip_uncertainty(value);
    if crate::display::is_numeric_column(header) {
        if let Ok(number) = cleaned.trim().parse::<f64>() {
            if number.is_finite() {
                return XlsxCell::Number(number);
            }
        }
    }
    XlsxCell::Text(cleaned.into_owned())
}

/// The workbook grid: a header row of text followed by one row per table row.
pub fn xlsx_rows(table: &TableData) -> Vec<Vec<XlsxCell>> {
    let header_row = table
        .headers()
        .iter()
        .map(|h| XlsxCell::Text(h.clone()))
        .collect();
    std::iter::once(header_row)
        .chain(table.rows().iter().map(|row| {
            row.iter()
                .zip(table.headers())
                .map(|(value, header)| xlsx_value(header, value))
                .collect()
        }))
        .collect()
}

/// Convert a table to XLSX format
///
/// Uses rust_xlsxwriter to build a single-sheet workbook. Row 0 holds the
/// headers. Cells in numeric columns whose cleaned value parses as a number
/// are written as numbers; everything else is written as text.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(table: &TableData) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    let bold = Format::new().set_bold();

    for (r, row) in xlsx_rows(table).into_iter().enumerate() {
        for (c, cell) in row.into_iter().enumerate() {
            let (r, c) = (r as u32, c as u16);
            match cell {
                XlsxCell::Text(text) if r == 0 => {
                    worksheet.write_string_with_format(r, c, &text, &bold)?;
                }
                XlsxCell::Text(text) => {
                    worksheet.write_string(r, c, &text)?;
                }
                XlsxCell::Number(number) => {
                    worksheet.write_number(r, c, number)?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Download name for an export, stamped with the current Unix time in
/// milliseconds so repeated exports never collide.
pub fn export_filename(extension: &str) -> String {
    export_filename_at(chrono::Utc::now().timestamp_millis(), extension)
}

pub fn export_filename_at(unix_ms: i64, extension: &str) -> String {
    format!("tablesnap-export-{}.{}", unix_ms, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> TableData {
        TableData::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn csv_strips_markers_only() {
        let t = table(&["Item", "Qty"], &[&["Pen", "10[?]"]]);
        assert_eq!(to_csv(&t).unwrap(), "Item,Qty\nPen,10");
    }

    #[test]
    fn csv_quotes_delimiters_quotes_and_newlines() {
        let t = table(
            &["Name", "Note"],
            &[&["Smith, J", "said \"hi\""], &["multi\nline", "plain"]],
        );
        assert_eq!(
            to_csv(&t).unwrap(),
            "Name,Note\n\"Smith, J\",\"said \"\"hi\"\"\"\n\"multi\nline\",plain"
        );
    }

    #[test]
    fn csv_of_headerless_table_is_empty() {
        assert_eq!(to_csv(&TableData::default()).unwrap(), "");
    }

    #[test]
    fn csv_with_no_rows_is_just_headers() {
        let t = table(&["A", "B"], &[]);
        assert_eq!(to_csv(&t).unwrap(), "A,B");
    }

    #[test]
    fn tsv_uses_tabs() {
        let t = table(&["Item", "Price"], &[&["Pen [?]", "1,50"], &["Ink", "4"]]);
        assert_eq!(to_tsv(&t).unwrap(), "Item\tPrice\nPen\t1,50\nInk\t4");
    }

    #[test]
    fn export_does_not_mutate() {
        let t = table(&["Qty"], &[&["3[?]"]]);
        let before = t.clone();
        to_csv(&t).unwrap();
        to_tsv(&t).unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn filenames_carry_timestamp() {
        assert_eq!(
            export_filename_at(1_700_000_000_123, "csv"),
            "tablesnap-export-1700000000123.csv"
        );
        let name = export_filename("csv");
        assert!(name.starts_with("tablesnap-export-") && name.ends_with(".csv"));
    }

    #[test]
    fn xlsx_numbers_only_in_numeric_columns() {
        assert_eq!(xlsx_value("Price", "1.50[?]"), XlsxCell::Number(1.5));
        assert_eq!(xlsx_value("Qty", " 3 "), XlsxCell::Number(3.0));
        assert_eq!(xlsx_value("Item", "42"), XlsxCell::Text("42".into()));
        assert_eq!(xlsx_value("Qty", "n/a"), XlsxCell::Text("n/a".into()));
        assert_eq!(xlsx_value("Item", "Pen [?]"), XlsxCell::Text("Pen".into()));
    }

    #[test]
    fn xlsx_rows_start_with_headers() {
        let t = table(&["Item", "Price"], &[&["Pen", "1.50[?]"], &["Ink", "free"]]);
        assert_eq!(
            xlsx_rows(&t),
            vec![
                vec![XlsxCell::Text("Item".into()), XlsxCell::Text("Price".into())],
                vec![XlsxCell::Text("Pen".into()), XlsxCell::Number(1.5)],
                vec![XlsxCell::Text("Ink".into()), XlsxCell::Text("free".into())],
            ]
        );
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_is_a_zip_container() {
        let t = table(&["Item", "Price"], &[&["Pen", "1.50[?]"]]);
        let bytes = to_xlsx(&t).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
