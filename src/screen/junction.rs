//! Border-junction resolution.
//!
//! After compositing, box-drawing glyphs on rows that hold a line border
//! are re-chosen from their neighbours so that adjacent boxes share one
//! joined edge: `┌──┬──┐` instead of `┌──┐┌──┐`.
//!
//! The table index is a 4-bit mask: left = 8, up = 4, right = 2, down = 1.
//! A neighbour counts when its glyph has an arm pointing back at the cell.

use std::collections::BTreeSet;

use super::grid::Grid;

/// Glyphs the resolver may replace.
const ANGLES: [&str; 11] = ["┘", "┐", "┌", "└", "┼", "├", "┤", "┴", "┬", "│", "─"];

/// Glyphs with an arm pointing right (valid left neighbours).
const LEFT_NEIGHBOURS: [&str; 7] = ["┌", "└", "┼", "├", "┴", "┬", "─"];
/// Glyphs with an arm pointing down (valid upper neighbours).
const UP_NEIGHBOURS: [&str; 7] = ["┐", "┌", "┼", "├", "┤", "┬", "│"];
/// Glyphs with an arm pointing left (valid right neighbours).
const RIGHT_NEIGHBOURS: [&str; 7] = ["┘", "┐", "┼", "┤", "┴", "┬", "─"];
/// Glyphs with an arm pointing up (valid lower neighbours).
const DOWN_NEIGHBOURS: [&str; 7] = ["┘", "└", "┼", "├", "┤", "┴", "│"];

const TABLE: [&str; 16] = [
    "", "│", "─", "┌", "│", "│", "└", "├", "─", "┐", "─", "┬", "┘", "┤", "┴", "┼",
];

pub fn is_angle(ch: &str) -> bool {
    ANGLES.contains(&ch)
}

/// Glyph for the cell at `(x, y)`. With `ignore_contrast` off, a neighbour
/// with a different attribute leaves the glyph unchanged.
pub fn angle_at(grid: &Grid, x: i32, y: i32, ignore_contrast: bool) -> Option<String> {
    let cell = grid.get(x, y)?;
    let mut mask = 0usize;
    let probes: [(i32, i32, &[&str], usize); 4] = [
        (x - 1, y, &LEFT_NEIGHBOURS, 8),
        (x, y - 1, &UP_NEIGHBOURS, 4),
        (x + 1, y, &RIGHT_NEIGHBOURS, 2),
        (x, y + 1, &DOWN_NEIGHBOURS, 1),
    ];
    for (nx, ny, set, bit) in probes {
        let Some(n) = grid.get(nx, ny) else { continue };
        if !set.contains(&n.ch.as_str()) {
            continue;
        }
        if !ignore_contrast && n.attr != cell.attr {
            return Some(cell.ch.clone());
        }
        mask |= bit;
    }
    let glyph = TABLE[mask];
    Some(if glyph.is_empty() { cell.ch.clone() } else { glyph.to_string() })
}

/// Rewrite every angle glyph on the given rows.
pub fn dock_borders(grid: &mut Grid, stops: &BTreeSet<i32>, ignore_contrast: bool) {
    let cols = grid.cols() as i32;
    for &y in stops {
        for x in 0..cols {
            let Some(cell) = grid.get(x, y) else { break };
            if !is_angle(&cell.ch) {
                continue;
            }
            let attr = cell.attr;
            if let Some(g) = angle_at(grid, x, y, ignore_contrast) {
                grid.set(x, y, attr, &g);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attr;

    fn grid(rows: &[&str]) -> Grid {
        let cols = rows[0].chars().count();
        let mut g = Grid::new(cols as u16, rows.len() as u16);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                g.set(x as i32, y as i32, Attr::DEFAULT, &c.to_string());
            }
        }
        g
    }

    #[test]
    fn left_and_up_neighbours_make_bottom_right_corner() {
        let g = grid(&[" │", "─┼"]);
        assert_eq!(angle_at(&g, 1, 1, false).as_deref(), Some("┘"));
    }

    #[test]
    fn boxes_sharing_an_edge_get_tees() {
        let mut g = grid(&["┌─┌─┐", "│ │ │", "└─└─┘"]);
        let stops: BTreeSet<i32> = [0, 2].into_iter().collect();
        dock_borders(&mut g, &stops, false);
        assert_eq!(g.text(), "┌─┬─┐\n│ │ │\n└─┴─┘\n");
    }

    #[test]
    fn contrast_blocks_substitution() {
        let mut g = grid(&[" │", "─┼"]);
        g.set(0, 1, Attr::DEFAULT.with_fg(1), "─");
        assert_eq!(angle_at(&g, 1, 1, false).as_deref(), Some("┼"));
        assert_eq!(angle_at(&g, 1, 1, true).as_deref(), Some("┘"));
    }

    #[test]
    fn isolated_glyph_is_kept() {
        let g = grid(&["   ", " ┼ ", "   "]);
        assert_eq!(angle_at(&g, 1, 1, false).as_deref(), Some("┼"));
    }
}
