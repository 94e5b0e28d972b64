//! Pending and committed cell grids.
//!
//! The pending grid is what the next [`draw`](super::draw) should put on the
//! terminal; the committed grid is what the terminal is believed to show.
//! Both always share dimensions.
//!
//! # Design Decisions
//!
//! - **Row storage**: each row is its own `Vec<Cell>` so scroll-region
//!   insert/delete can splice whole rows in both grids.
//! - **Dirty flags**: pending rows are flagged only when a write actually
//!   changes a cell.

use crate::types::{Attr, Cell};

/// One pending row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub dirty: bool,
}

impl Row {
    fn blank(cols: usize, dirty: bool) -> Self {
        Self { cells: vec![Cell::default(); cols], dirty }
    }
}

/// The two grids of one screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cols: usize,
    rows: usize,
    pending: Vec<Row>,
    committed: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(cols: u16, rows: u16) -> Self {
        let mut grid = Self { cols: 0, rows: 0, pending: Vec::new(), committed: Vec::new() };
        grid.alloc(cols, rows, true);
        grid
    }

    /// Replace both grids with default cells.
    pub fn alloc(&mut self, cols: u16, rows: u16, dirty: bool) {
        self.cols = cols as usize;
        self.rows = rows as usize;
        self.pending = (0..self.rows).map(|_| Row::blank(self.cols, dirty)).collect();
        self.committed = (0..self.rows).map(|_| vec![Cell::default(); self.cols]).collect();
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    /// Pending cell at `(x, y)`.
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&self.pending[y as usize].cells[x as usize])
    }

    /// Committed cell at `(x, y)`.
    pub fn committed(&self, x: i32, y: i32) -> Option<&Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&self.committed[y as usize][x as usize])
    }

    /// Write a pending cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, attr: Attr, ch: &str) {
        if !self.in_bounds(x, y) {
            return;
        }
        let row = &mut self.pending[y as usize];
        let cell = &mut row.cells[x as usize];
        if cell.attr != attr || cell.ch != ch {
            cell.set(attr, ch);
            row.dirty = true;
        }
    }

    /// Replace only the attribute of a pending cell.
    pub fn set_attr(&mut self, x: i32, y: i32, attr: Attr) {
        if !self.in_bounds(x, y) {
            return;
        }
        let row = &mut self.pending[y as usize];
        let cell = &mut row.cells[x as usize];
        if cell.attr != attr {
            cell.attr = attr;
            row.dirty = true;
        }
    }

    /// Fill the half-open rectangle, clipped to the grid.
    pub fn fill(&mut self, attr: Attr, ch: &str, xi: i32, xl: i32, yi: i32, yl: i32) {
        let xi = xi.max(0);
        let yi = yi.max(0);
        let xl = xl.min(self.cols as i32);
        let yl = yl.min(self.rows as i32);
        for y in yi..yl {
            for x in xi..xl {
                self.set(x, y, attr, ch);
            }
        }
    }

    /// Reset every pending cell to blank default.
    pub fn clear(&mut self) {
        self.fill(Attr::DEFAULT, " ", 0, self.cols as i32, 0, self.rows as i32);
    }

    pub fn row(&self, y: usize) -> Option<&Row> {
        self.pending.get(y)
    }

    pub fn is_dirty(&self, y: usize) -> bool {
        self.pending.get(y).is_some_and(|r| r.dirty)
    }

    pub fn mark_dirty(&mut self, y: usize) {
        if let Some(row) = self.pending.get_mut(y) {
            row.dirty = true;
        }
    }

    pub fn mark_all_dirty(&mut self) {
        for row in &mut self.pending {
            row.dirty = true;
        }
    }

    /// Split borrow used by the diff renderer.
    pub(crate) fn rows_mut(&mut self, y: usize) -> Option<(&mut Row, &mut Vec<Cell>)> {
        let row = self.pending.get_mut(y)?;
        let committed = self.committed.get_mut(y)?;
        Some((row, committed))
    }

    /// Mirror a terminal `IL n` issued with the scroll region `top..=bottom`
    /// and the cursor on row `y`: blank rows enter at `y`, rows fall off
    /// the bottom of the region.
    pub fn insert_lines(&mut self, n: usize, y: usize, bottom: usize) {
        if y > bottom || bottom >= self.rows {
            return;
        }
        for _ in 0..n.min(bottom + 1 - y) {
            self.pending.remove(bottom);
            self.pending.insert(y, Row::blank(self.cols, false));
            self.committed.remove(bottom);
            self.committed.insert(y, vec![Cell::default(); self.cols]);
        }
    }

    /// Mirror a terminal `DL n`: rows at `y` disappear, blank rows enter at
    /// the bottom of the region.
    pub fn delete_lines(&mut self, n: usize, y: usize, bottom: usize) {
        if y > bottom || bottom >= self.rows {
            return;
        }
        for _ in 0..n.min(bottom + 1 - y) {
            self.pending.remove(y);
            self.pending.insert(bottom, Row::blank(self.cols, false));
            self.committed.remove(y);
            self.committed.insert(bottom, vec![Cell::default(); self.cols]);
        }
    }

    /// Pending grid as plain text, one line per row, fillers omitted.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity((self.cols + 1) * self.rows);
        for row in &self.pending {
            for cell in &row.cells {
                out.push_str(&cell.ch);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_sets_dimensions_and_dirty() {
        let mut g = Grid::new(4, 3);
        assert_eq!((g.cols(), g.rows()), (4, 3));
        assert!(g.is_dirty(0));
        g.alloc(6, 2, false);
        assert_eq!((g.cols(), g.rows()), (6, 2));
        assert!(!g.is_dirty(1));
        assert_eq!(g.committed(5, 1), Some(&Cell::default()));
    }

    #[test]
    fn set_marks_dirty_only_on_change() {
        let mut g = Grid::new(4, 2);
        g.alloc(4, 2, false);
        g.set(1, 1, Attr::DEFAULT, " ");
        assert!(!g.is_dirty(1));
        g.set(1, 1, Attr::DEFAULT, "x");
        assert!(g.is_dirty(1));
        assert_eq!(g.get(1, 1).map(|c| c.ch.as_str()), Some("x"));
        g.set(-1, 0, Attr::DEFAULT, "y");
        g.set(4, 0, Attr::DEFAULT, "y");
        assert!(!g.is_dirty(0));
    }

    #[test]
    fn fill_clips_to_grid() {
        let mut g = Grid::new(3, 3);
        g.fill(Attr::DEFAULT, "#", -2, 2, 1, 10);
        assert_eq!(g.text(), "   \n## \n## \n");
    }

    #[test]
    fn delete_and_insert_shift_region_rows() {
        let mut g = Grid::new(1, 4);
        for (y, ch) in ["a", "b", "c", "d"].iter().enumerate() {
            g.set(0, y as i32, Attr::DEFAULT, ch);
        }
        g.delete_lines(1, 1, 2);
        assert_eq!(g.text(), "a\nc\n \nd\n");
        g.insert_lines(1, 1, 2);
        assert_eq!(g.text(), "a\n \nc\nd\n");
    }
}
