//! Border decoration and painting.

use super::style::{Style, StylePatch};
use crate::screen::grid::Grid;
use crate::types::{Attr, RenderCoords};

pub const TOP_LEFT: &str = "┌";
pub const TOP_RIGHT: &str = "┐";
pub const BOTTOM_LEFT: &str = "└";
pub const BOTTOM_RIGHT: &str = "┘";
pub const HORIZONTAL: &str = "─";
pub const VERTICAL: &str = "│";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderKind {
    /// Box-drawing lines; takes part in junction resolution.
    #[default]
    Line,
    /// Every border cell is this glyph.
    Bg(char),
}

/// Per-side style overrides. Corners take the top or bottom override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderSides {
    pub left: Option<StylePatch>,
    pub right: Option<StylePatch>,
    pub top: Option<StylePatch>,
    pub bottom: Option<StylePatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Border {
    pub kind: BorderKind,
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
    pub sides: BorderSides,
    /// Foreground colours cycled over perimeter cells, clockwise from the
    /// top-left corner. Empty means the border style applies everywhere.
    pub perimeter: Vec<u16>,
}

impl Default for Border {
    fn default() -> Self {
        Self::line()
    }
}

impl Border {
    pub fn line() -> Self {
        Self {
            kind: BorderKind::Line,
            left: true,
            right: true,
            top: true,
            bottom: true,
            sides: BorderSides::default(),
            perimeter: Vec::new(),
        }
    }

    pub fn bg(ch: char) -> Self {
        Self { kind: BorderKind::Bg(ch), ..Self::line() }
    }

    pub fn sides(mut self, left: bool, top: bool, right: bool, bottom: bool) -> Self {
        self.left = left;
        self.top = top;
        self.right = right;
        self.bottom = bottom;
        self
    }

    pub fn perimeter(mut self, colors: Vec<u16>) -> Self {
        self.perimeter = colors;
        self
    }

    pub fn is_line(&self) -> bool {
        self.kind == BorderKind::Line
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

struct Painter<'a> {
    border: &'a Border,
    base: Style,
    coords: &'a RenderCoords,
}

impl Painter<'_> {
    /// Clockwise perimeter index of `(x, y)`, starting at the top-left.
    fn perimeter_index(&self, x: i32, y: i32, side: Side) -> usize {
        let c = self.coords;
        let w = c.width();
        let h = c.height();
        let i = match side {
            Side::Top => x - c.xi,
            Side::Right => w + (y - c.yi - 1),
            Side::Bottom => w + (h - 2) + (c.xl - 1 - x),
            Side::Left => 2 * w + (h - 2) + (c.yl - 2 - y),
        };
        i.max(0) as usize
    }

    fn attr(&self, x: i32, y: i32, side: Side) -> Attr {
        let patch = match side {
            Side::Left => self.border.sides.left,
            Side::Right => self.border.sides.right,
            Side::Top => self.border.sides.top,
            Side::Bottom => self.border.sides.bottom,
        };
        let mut style = match patch {
            Some(p) => self.base.patched(&p),
            None => self.base,
        };
        let colors = &self.border.perimeter;
        if !colors.is_empty() {
            style.fg = colors[self.perimeter_index(x, y, side) % colors.len()];
        }
        style.attr()
    }

    fn glyph(&self, line: &'static str) -> String {
        match self.border.kind {
            BorderKind::Line => line.to_string(),
            BorderKind::Bg(ch) => ch.to_string(),
        }
    }
}

/// Paint the border of an element whose box is `coords`. `dattr` is the
/// element's own attribute, used for blanked disabled sides.
pub fn paint(grid: &mut Grid, border: &Border, style: Style, coords: &RenderCoords, dattr: Attr) {
    let p = Painter { border, base: style, coords };
    let (xi, xl, yi, yl) = (coords.xi, coords.xl, coords.yi, coords.yl);

    let edges = [(yi, Side::Top, coords.notop), (yl - 1, Side::Bottom, coords.nobot)];
    for (y, side, clipped) in edges {
        if clipped {
            continue;
        }
        let (present, left_corner, right_corner) = match side {
            Side::Top => (border.top, TOP_LEFT, TOP_RIGHT),
            _ => (border.bottom, BOTTOM_LEFT, BOTTOM_RIGHT),
        };
        for x in xi..xl {
            if (coords.noleft && x == xi) || (coords.noright && x == xl - 1) {
                continue;
            }
            let ch = if x == xi {
                match (border.left, present) {
                    (true, true) => left_corner,
                    (true, false) => VERTICAL,
                    (false, true) => HORIZONTAL,
                    (false, false) => continue,
                }
            } else if x == xl - 1 {
                match (border.right, present) {
                    (true, true) => right_corner,
                    (true, false) => VERTICAL,
                    (false, true) => HORIZONTAL,
                    (false, false) => continue,
                }
            } else if present {
                HORIZONTAL
            } else {
                grid.set(x, y, dattr, " ");
                continue;
            };
            grid.set(x, y, p.attr(x, y, side), &p.glyph(ch));
        }
    }

    for y in (yi + 1)..(yl - 1) {
        let columns = [(xi, Side::Left, border.left, coords.noleft), (xl - 1, Side::Right, border.right, coords.noright)];
        for (x, side, present, clipped) in columns {
            if !present {
                grid.set(x, y, dattr, " ");
            } else if !clipped {
                grid.set(x, y, p.attr(x, y, side), &p.glyph(VERTICAL));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(w: i32, h: i32) -> RenderCoords {
        RenderCoords { xi: 0, xl: w, yi: 0, yl: h, ..Default::default() }
    }

    #[test]
    fn full_line_border() {
        let mut g = Grid::new(4, 3);
        paint(&mut g, &Border::line(), Style::default(), &boxed(4, 3), Attr::DEFAULT);
        assert_eq!(g.text(), "┌──┐\n│  │\n└──┘\n");
    }

    #[test]
    fn disabled_sides_are_skipped() {
        let mut g = Grid::new(4, 3);
        let b = Border::line().sides(false, true, true, false);
        paint(&mut g, &b, Style::default(), &boxed(4, 3), Attr::DEFAULT);
        assert_eq!(g.text(), "───┐\n   │\n   │\n");
    }

    #[test]
    fn bg_border_uses_its_glyph() {
        let mut g = Grid::new(3, 3);
        paint(&mut g, &Border::bg('#'), Style::default(), &boxed(3, 3), Attr::DEFAULT);
        assert_eq!(g.text(), "###\n# #\n###\n");
    }

    #[test]
    fn clipped_top_is_not_drawn() {
        let mut g = Grid::new(3, 3);
        let c = RenderCoords { notop: true, ..boxed(3, 3) };
        paint(&mut g, &Border::line(), Style::default(), &c, Attr::DEFAULT);
        assert_eq!(g.text(), "   \n│ │\n└─┘\n");
    }

    #[test]
    fn side_override_colours_one_side() {
        let mut g = Grid::new(3, 3);
        let mut b = Border::line();
        b.sides.left = Some(StylePatch::fg(2));
        paint(&mut g, &b, Style::default(), &boxed(3, 3), Attr::DEFAULT);
        assert_eq!(g.get(0, 1).unwrap().attr.fg(), 2);
        assert_eq!(g.get(2, 1).unwrap().attr, Attr::DEFAULT);
    }

    #[test]
    fn perimeter_colours_run_clockwise() {
        let mut g = Grid::new(3, 3);
        let b = Border::line().perimeter((0..8).collect());
        paint(&mut g, &b, Style::default(), &boxed(3, 3), Attr::DEFAULT);
        let fg = |x, y| g.get(x, y).unwrap().attr.fg();
        assert_eq!([fg(0, 0), fg(1, 0), fg(2, 0)], [0, 1, 2]);
        assert_eq!(fg(2, 1), 3);
        assert_eq!([fg(2, 2), fg(1, 2), fg(0, 2)], [4, 5, 6]);
        assert_eq!(fg(0, 1), 7);
    }
}
