use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// The extracted table: ordered, unique headers plus rows of cells.
///
/// Every row holds exactly one cell per header, stored positionally, so a
/// header rename never has to touch row contents. On the wire (model replies,
/// HTTP bodies) rows are JSON objects keyed by header name:
///
/// ```json
/// { "headers": ["Item", "Qty"], "rows": [ { "Item": "Pen", "Qty": "10[?]" } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "WireTable")]
pub struct TableData {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Loosely-typed shape accepted from the model and from HTTP clients.
#[derive(Debug, Deserialize)]
pub struct WireTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, Value>>,
}

impl TableData {
    /// Builds a table from headers and positional rows.
    ///
    /// Duplicate header names get a ` (n)` suffix, short rows are padded with
    /// empty cells and overlong rows are truncated.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = unique_headers(headers);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        TableData { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Looks a cell up by header name, the way the wire form addresses it.
    pub fn get(&self, row: usize, header: &str) -> Option<&str> {
        self.cell(row, self.column_index(header)?)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn headers_mut(&mut self) -> &mut Vec<String> {
        &mut self.headers
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }
}

impl From<WireTable> for TableData {
    fn from(wire: WireTable) -> Self {
        let headers = unique_headers(wire.headers);
        let rows = wire
            .rows
            .into_iter()
            .map(|mut record| {
                headers
                    .iter()
                    .map(|h| record.remove(h).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        TableData { headers, rows }
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut candidate = header.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{} ({})", header, n);
            n += 1;
        }
        seen.push(candidate);
    }
    seen
}

struct RowRecord<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, cell) in self.headers.iter().zip(self.cells) {
            map.serialize_entry(header, cell)?;
        }
        map.end()
    }
}

impl Serialize for TableData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let records: Vec<RowRecord<'_>> = self
            .rows
            .iter()
            .map(|cells| RowRecord {
                headers: &self.headers,
                cells,
            })
            .collect();
        let mut state = serializer.serialize_struct("TableData", 2)?;
        state.serialize_field("headers", &self.headers)?;
        state.serialize_field("rows", &records)?;
        state.end()
    }
}
