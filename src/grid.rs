use crate::display::{self, Align, CellView};
use crate::navigation::{self, CellPos, Move, NavKey};
use crate::store::{StoreError, TableStore};
use crate::table::TableData;

/// Interactive view over a [`TableStore`]: tracks the focused cell and the
/// currency display toggle, and turns user input into store edits.
#[derive(Debug)]
pub struct GridView {
    store: TableStore,
    focus: Option<CellPos>,
    format_currency: bool,
}

impl GridView {
    pub fn new(table: TableData) -> Self {
        GridView {
            store: TableStore::new(table),
            focus: None,
            format_currency: false,
        }
    }

    pub fn table(&self) -> &TableData {
        self.store.table()
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// Registers an observer that receives the whole table after every edit.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&TableData) + Send + 'static,
    {
        self.store.subscribe(observer);
    }

    pub fn focus(&self) -> Option<CellPos> {
        self.focus
    }

    pub fn format_currency(&self) -> bool {
        self.format_currency
    }

    pub fn set_format_currency(&mut self, enabled: bool) {
        self.format_currency = enabled;
    }

    /// Focuses a cell. Returns false (focus unchanged) if it does not exist.
    pub fn set_focus(&mut self, pos: CellPos) -> bool {
        if self.contains(pos) {
            self.focus = Some(pos);
            true
        } else {
            false
        }
    }

    pub fn blur(&mut self) {
        self.focus = None;
    }

    fn contains(&self, pos: CellPos) -> bool {
        let table = self.store.table();
        pos.row < table.row_count() && pos.col < table.column_count()
    }

    /// Applies a navigation key to the focused cell and returns the new focus.
    ///
    /// Enter on the last row appends exactly one empty row and focuses the
    /// same column in it.
    pub fn press(&mut self, key: NavKey) -> Option<CellPos> {
        let from = self.focus?;
        let table = self.store.table();
        match navigation::navigate(from, key, table.row_count(), table.column_count())? {
            Move::To(pos) => self.focus = Some(pos),
            Move::AppendRow(pos) => {
                let row = self.store.add_row();
                debug_assert_eq!(row, pos.row);
                self.focus = Some(pos);
            }
        }
        self.focus
    }

    /// Commits edited text into the focused cell. Returns false when nothing
    /// is focused.
    pub fn commit(&mut self, value: impl Into<String>) -> bool {
        match self.focus {
            Some(pos) => {
                self.store.update_cell_at(pos.row, pos.col, value);
                true
            }
            None => false,
        }
    }

    /// Renames the column at `col`. A rejected name reverts to the current one
    /// and the error says why.
    pub fn rename_column(&mut self, col: usize, new_name: &str) -> Result<bool, StoreError> {
        let old = self
            .store
            .table()
            .headers()
            .get(col)
            .cloned()
            .ok_or_else(|| StoreError::UnknownHeader(format!("#{}", col + 1)))?;
        self.store.rename_header(&old, new_name)
    }

    pub fn add_row(&mut self) -> usize {
        self.store.add_row()
    }

    /// Deletes a row and keeps focus pointing at the same logical cell, or at
    /// the nearest remaining row when the focused row itself goes away.
    pub fn delete_row(&mut self, row: usize) -> Option<Vec<String>> {
        let removed = self.store.delete_row(row)?;
        if let Some(pos) = self.focus {
            let remaining = self.store.table().row_count();
            self.focus = if remaining == 0 {
                None
            } else if pos.row > row {
                Some(CellPos::new(pos.row - 1, pos.col))
            } else {
                Some(CellPos::new(pos.row.min(remaining - 1), pos.col))
            };
        }
        Some(removed)
    }

    pub fn cell_view(&self, pos: CellPos) -> Option<CellView> {
        let table = self.store.table();
        let value = table.cell(pos.row, pos.col)?;
        let header = &table.headers()[pos.col];
        Some(display::cell_view(
            value,
            header,
            self.format_currency,
            self.focus == Some(pos),
        ))
    }

    pub fn uncertain_cells(&self) -> Vec<CellPos> {
        let mut cells = Vec::new();
        for (r, row) in self.store.table().rows().iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if display::has_uncertainty(value) {
                    cells.push(CellPos::new(r, c));
                }
            }
        }
        cells
    }

    /// Plain-text rendering for terminals. The focused cell is wrapped in
    /// `>` `<` and uncertain cells are prefixed with `!`.
    pub fn render(&self) -> String {
        let table = self.store.table();
        if table.column_count() == 0 {
            return "(no columns)\n".to_string();
        }

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.row_count());
        for r in 0..table.row_count() {
            let mut line = Vec::with_capacity(table.column_count());
            for c in 0..table.column_count() {
                let view = self
                    .cell_view(CellPos::new(r, c))
                    .unwrap_or_else(|| display::cell_view("", "", false, false));
                let flag = if view.uncertain { "!" } else { "" };
                let text = if view.focused {
                    format!(">{}{}<", flag, view.text)
                } else {
                    format!("{}{}", flag, view.text)
                };
                line.push(text);
            }
            grid.push(line);
        }

        let widths: Vec<usize> = (0..table.column_count())
            .map(|c| {
                grid.iter()
                    .map(|line| line[c].chars().count())
                    .chain(std::iter::once(table.headers()[c].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str("    ");
        for (c, header) in table.headers().iter().enumerate() {
            out.push_str(&pad(header, widths[c], display::column_align(header)));
            out.push(' ');
        }
        out.push('\n');

        if grid.is_empty() {
            out.push_str("    NO DATA TO DISPLAY\n");
        }
        for (r, line) in grid.iter().enumerate() {
            out.push_str(&format!("{:>3} ", r + 1));
            for (c, text) in line.iter().enumerate() {
                let align = display::column_align(&table.headers()[c]);
                out.push_str(&pad(text, widths[c], align));
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text, width = width),
        Align::Right => format!("{:>width$}", text, width = width),
    }
}
