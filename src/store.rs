use crate::table::TableData;

/// Callback invoked with the complete table after every mutation.
pub type Observer = Box<dyn FnMut(&TableData) + Send>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("column name cannot be empty")]
    EmptyHeader,

    #[error("a column named '{0}' already exists")]
    DuplicateHeader(String),

    #[error("no column named '{0}'")]
    UnknownHeader(String),
}

/// Owns the table under review and applies edits to it.
///
/// All edits are whole-table consistent: a rename rewrites the header in one
/// step, and observers only ever see the finished result of an edit, never an
/// intermediate state.
pub struct TableStore {
    table: TableData,
    revision: u64,
    observers: Vec<Observer>,
}

impl TableStore {
    pub fn new(table: TableData) -> Self {
        TableStore {
            table,
            revision: 0,
            observers: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableData {
        &self.table
    }

    /// Number of mutations applied since the store was created.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&TableData) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn into_table(self) -> TableData {
        self.table
    }

    /// Renames a column in place, keeping its position and every row's value.
    ///
    /// The new name is trimmed first. Returns `Ok(false)` when the trimmed name
    /// equals the old one, in which case nothing changes and nobody is
    /// notified. An empty name or a name already used by another column is
    /// rejected and the table is left as it was.
    pub fn rename_header(&mut self, old: &str, new: &str) -> Result<bool, StoreError> {
        let new = new.trim();
        if new == old {
            return Ok(false);
        }
        if new.is_empty() {
            return Err(StoreError::EmptyHeader);
        }
        let col = self
            .table
            .column_index(old)
            .ok_or_else(|| StoreError::UnknownHeader(old.to_string()))?;
        if self.table.column_index(new).is_some() {
            return Err(StoreError::DuplicateHeader(new.to_string()));
        }

        self.table.headers_mut()[col] = new.to_string();
        log::debug!("renamed column {} from '{}' to '{}'", col, old, new);
        self.changed();
        Ok(true)
    }

    /// Replaces the cell at `row_index` in the column named `header`.
    ///
    /// # Panics
    /// If `row_index` is out of range.
    pub fn update_cell(
        &mut self,
        row_index: usize,
        header: &str,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let col = self
            .table
            .column_index(header)
            .ok_or_else(|| StoreError::UnknownHeader(header.to_string()))?;
        self.update_cell_at(row_index, col, value);
        Ok(())
    }

    /// Positional form of [`TableStore::update_cell`].
    ///
    /// # Panics
    /// If `row_index` or `col` is out of range.
    pub fn update_cell_at(&mut self, row_index: usize, col: usize, value: impl Into<String>) {
        let row_count = self.table.row_count();
        let row = self
            .table
            .rows_mut()
            .get_mut(row_index)
            .unwrap_or_else(|| panic!("row {} out of range for {} rows", row_index, row_count));
        let value = value.into();
        if row[col] == value {
            return;
        }
        row[col] = value;
        self.changed();
    }

    /// Appends an all-empty row and returns its index.
    pub fn add_row(&mut self) -> usize {
        let width = self.table.column_count();
        self.table.rows_mut().push(vec![String::new(); width]);
        self.changed();
        self.table.row_count() - 1
    }

    /// Removes a row; later rows shift up by one. Returns `None` without
    /// notifying anyone when the index does not exist.
    pub fn delete_row(&mut self, row_index: usize) -> Option<Vec<String>> {
        if row_index >= self.table.row_count() {
            return None;
        }
        let removed = self.table.rows_mut().remove(row_index);
        self.changed();
        Some(removed)
    }

    fn changed(&mut self) {
        self.revision += 1;
        for observer in self.observers.iter_mut() {
            observer(&self.table);
        }
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("table", &self.table)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}
