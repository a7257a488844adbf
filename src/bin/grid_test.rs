use tablesnap::export::to_csv;
use tablesnap::{CellPos, GridView, NavKey, StoreError, TableData};

// Helper to build the invoice used by every check
fn invoice() -> TableData {
    TableData::new(
        vec!["Item".into(), "Qty".into(), "Unit Price".into()],
        vec![
            vec!["Pen".into(), "10[?]".into(), "1.50".into()],
            vec!["Ink".into(), "2".into(), "4.00".into()],
        ],
    )
}

// Helper to check a cell by header name
fn assert_cell(grid: &GridView, row: usize, header: &str, expected: &str) {
    let actual = grid.table().get(row, header);
    assert_eq!(actual, Some(expected), "row {} column {}", row, header);
    println!("✓ Row {} '{}' holds '{}' as expected", row + 1, header, expected);
}

fn test_rename() {
    println!("\n====== Testing rename ======");
    let mut grid = GridView::new(invoice());

    assert_eq!(grid.rename_column(1, "Qty"), Ok(false));
    println!("✓ Renaming to the same name is a no-op");

    assert_eq!(grid.rename_column(1, "Quantity"), Ok(true));
    assert_cell(&grid, 0, "Quantity", "10[?]");
    assert_cell(&grid, 1, "Quantity", "2");

    assert_eq!(grid.rename_column(1, "  "), Err(StoreError::EmptyHeader));
    println!("✓ Empty names are rejected");

    assert_eq!(
        grid.rename_column(1, "Item"),
        Err(StoreError::DuplicateHeader("Item".into()))
    );
    println!("✓ Colliding names are rejected");
}

fn test_navigation() {
    println!("\n====== Testing navigation ======");
    let mut grid = GridView::new(invoice());
    grid.set_focus(CellPos::new(0, 0));

    assert_eq!(grid.press(NavKey::Up), Some(CellPos::new(0, 0)));
    assert_eq!(grid.press(NavKey::Left), Some(CellPos::new(0, 0)));
    println!("✓ Focus clamps at the top-left corner");

    grid.set_focus(CellPos::new(1, 2));
    assert_eq!(grid.press(NavKey::Right), Some(CellPos::new(1, 2)));
    assert_eq!(grid.press(NavKey::Down), Some(CellPos::new(1, 2)));
    println!("✓ Focus clamps at the bottom-right corner");

    assert_eq!(grid.press(NavKey::Enter), Some(CellPos::new(2, 2)));
    assert_eq!(grid.table().row_count(), 3);
    assert_cell(&grid, 2, "Item", "");
    println!("✓ Enter on the last row added one row and focused it");
}

fn test_add_delete() {
    println!("\n====== Testing add/delete ======");
    let mut grid = GridView::new(invoice());
    let before = grid.table().clone();

    let row = grid.add_row();
    grid.delete_row(row);
    assert_eq!(grid.table(), &before);
    println!("✓ add_row then delete_row(last) restores the table");

    grid.delete_row(0);
    assert_cell(&grid, 0, "Item", "Ink");
}

fn test_export() {
    println!("\n====== Testing export ======");
    let grid = GridView::new(TableData::new(
        vec!["Item".into(), "Qty".into()],
        vec![vec!["Pen".into(), "10[?]".into()]],
    ));
    assert_eq!(grid.uncertain_cells(), vec![CellPos::new(0, 1)]);
    println!("✓ Uncertain cell flagged");

    let csv = to_csv(grid.table()).unwrap();
    assert_eq!(csv, "Item,Qty\nPen,10");
    println!("✓ CSV export stripped the marker: {:?}", csv);
}

fn main() {
    test_rename();
    test_navigation();
    test_add_delete();
    test_export();
    println!("\nAll grid checks passed.");
}
