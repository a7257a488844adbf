//! Keyboard focus movement across the grid.

/// Zero-based cell coordinate inside the grid body (headers excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        CellPos { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
}

impl NavKey {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" | "arrowup" | "k" => Some(NavKey::Up),
            "down" | "arrowdown" | "j" => Some(NavKey::Down),
            "left" | "arrowleft" | "h" => Some(NavKey::Left),
            "right" | "arrowright" | "l" => Some(NavKey::Right),
            "enter" | "return" => Some(NavKey::Enter),
            _ => None,
        }
    }
}

/// Where focus goes after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Focus an existing cell (possibly the one already focused).
    To(CellPos),
    /// Append a row first, then focus this cell inside it.
    AppendRow(CellPos),
}

/// Computes the focus target for `key` pressed on `from` in a grid of
/// `rows` x `cols` cells.
///
/// Arrows clamp at the edges. Enter moves down one row, except on the last
/// row where it asks for a new row and focuses the same column in it.
/// Returns `None` when the grid has no cells or `from` lies outside it.
pub fn navigate(from: CellPos, key: NavKey, rows: usize, cols: usize) -> Option<Move> {
    if rows == 0 || cols == 0 || from.row >= rows || from.col >= cols {
        return None;
    }

    let target = match key {
        NavKey::Up => CellPos::new(from.row.saturating_sub(1), from.col),
        NavKey::Down => CellPos::new((from.row + 1).min(rows - 1), from.col),
        NavKey::Left => CellPos::new(from.row, from.col.saturating_sub(1)),
        NavKey::Right => CellPos::new(from.row, (from.col + 1).min(cols - 1)),
        NavKey::Enter if from.row == rows - 1 => {
            return Some(Move::AppendRow(CellPos::new(rows, from.col)));
        }
        NavKey::Enter => CellPos::new(from.row + 1, from.col),
    };
    Some(Move::To(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [NavKey; 4] = [NavKey::Up, NavKey::Down, NavKey::Left, NavKey::Right];

    #[test]
    fn arrows_never_leave_the_grid() {
        let (rows, cols) = (3, 4);
        for row in 0..rows {
            for col in 0..cols {
                for key in KEYS {
                    match navigate(CellPos::new(row, col), key, rows, cols) {
                        Some(Move::To(p)) => assert!(p.row < rows && p.col < cols),
                        other => panic!("unexpected {:?} for {:?}", other, key),
                    }
                }
            }
        }
    }

    #[test]
    fn arrows_clamp_at_corners() {
        let origin = CellPos::new(0, 0);
        assert_eq!(navigate(origin, NavKey::Up, 2, 2), Some(Move::To(origin)));
        assert_eq!(navigate(origin, NavKey::Left, 2, 2), Some(Move::To(origin)));

        let corner = CellPos::new(1, 1);
        assert_eq!(navigate(corner, NavKey::Down, 2, 2), Some(Move::To(corner)));
        assert_eq!(navigate(corner, NavKey::Right, 2, 2), Some(Move::To(corner)));
        assert_eq!(navigate(corner, NavKey::Up, 2, 2), Some(Move::To(CellPos::new(0, 1))));
    }

    #[test]
    fn enter_moves_down_then_appends_on_last_row() {
        assert_eq!(
            navigate(CellPos::new(0, 1), NavKey::Enter, 2, 3),
            Some(Move::To(CellPos::new(1, 1)))
        );
        assert_eq!(
            navigate(CellPos::new(1, 2), NavKey::Enter, 2, 3),
            Some(Move::AppendRow(CellPos::new(2, 2)))
        );
    }

    #[test]
    fn empty_grid_has_nowhere_to_go() {
        assert_eq!(navigate(CellPos::new(0, 0), NavKey::Down, 0, 3), None);
        assert_eq!(navigate(CellPos::new(0, 0), NavKey::Enter, 3, 0), None);
        assert_eq!(navigate(CellPos::new(5, 0), NavKey::Up, 3, 3), None);
    }

    #[test]
    fn parses_key_names() {
        assert_eq!(NavKey::from_name("ArrowUp"), Some(NavKey::Up));
        assert_eq!(NavKey::from_name("j"), Some(NavKey::Down));
        assert_eq!(NavKey::from_name("Enter"), Some(NavKey::Enter));
        assert_eq!(NavKey::from_name("tab"), None);
    }
}
