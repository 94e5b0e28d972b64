//! Differential renderer.
//!
//! [`draw`] reconciles the pending grid with the committed grid and returns
//! the bytes that bring the terminal up to date. Committed cells are
//! updated as they are emitted, so a second `draw` without mutation
//! produces nothing.
//!
//! # Algorithm
//!
//! 1. Visit dirty rows only (plus the artificial cursor's row)
//! 2. Skip runs of unchanged cells, remembering where the run started
//! 3. On the next change, reposition once: `CUF` when the terminal has
//!    relative forward motion, `CUP` otherwise
//! 4. A run of identical blanks reaching the end of the row becomes `EL`
//!    when back-color-erase allows it
//! 5. SGR only on attribute change, reset before a new non-default attribute
//! 6. Wrap the frame in save/restore cursor (and hide/show when visible)

use std::io::Write;

use super::cursor::ArtificialCursor;
use super::grid::Grid;
use super::junction;
use crate::program::{ansi, sgr};
use crate::types::{Attr, AttrFlags, Cell};
use crate::unicode;

/// Terminal facts the renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOptions {
    /// Palette size attributes are reduced to.
    pub colors: u16,
    /// Terminal understands `CUF n`.
    pub parm_right_cursor: bool,
    /// Terminal erases with the current background.
    pub bce: bool,
    /// Use `EL` for trailing blank runs at all.
    pub use_bce: bool,
    /// Terminal cursor is hidden by the application.
    pub cursor_hidden: bool,
    /// Terminal can display non-ASCII glyphs.
    pub unicode: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            colors: 256,
            parm_right_cursor: true,
            bce: false,
            use_bce: false,
            cursor_hidden: false,
            unicode: true,
        }
    }
}

/// Artificial cursor to paint at a grid position.
#[derive(Debug, Clone, Copy)]
pub struct CursorOverlay<'a> {
    pub x: usize,
    pub y: usize,
    pub cursor: &'a ArtificialCursor,
}

/// Redraw rows `start..=end` and return the bytes to emit.
pub fn draw(
    grid: &mut Grid,
    opts: &DrawOptions,
    cursor: Option<CursorOverlay<'_>>,
    start: usize,
    end: usize,
) -> Vec<u8> {
    let cursor = cursor.filter(|c| c.cursor.is_drawn());
    let last = grid.rows().saturating_sub(1);
    let mut main = Vec::new();

    if grid.rows() == 0 {
        return main;
    }

    for y in start..=end.min(last) {
        let cursor_x = cursor.filter(|c| c.y == y).map(|c| c.x);
        if !grid.is_dirty(y) && cursor_x.is_none() {
            continue;
        }
        let Some((row, committed)) = grid.rows_mut(y) else { continue };
        row.dirty = false;

        let out = draw_row(&row.cells, committed, opts, cursor_x.zip(cursor.map(|c| c.cursor)), y);
        if !out.is_empty() {
            let _ = ansi::cup(&mut main, 0, y as u16);
            main.extend_from_slice(&out);
        }
    }

    if main.is_empty() {
        return main;
    }

    let mut framed = Vec::with_capacity(main.len() + 16);
    let _ = ansi::save_cursor(&mut framed);
    if !opts.cursor_hidden {
        let _ = ansi::hide_cursor(&mut framed);
    }
    framed.extend_from_slice(&main);
    let _ = ansi::restore_cursor(&mut framed);
    if !opts.cursor_hidden {
        let _ = ansi::show_cursor(&mut framed);
    }
    framed
}

/// Emit one row. The terminal cursor is at column 0 of `y` on entry.
fn draw_row(
    line: &[Cell],
    committed: &mut [Cell],
    opts: &DrawOptions,
    cursor: Option<(usize, &ArtificialCursor)>,
    y: usize,
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut attr = Attr::DEFAULT;
    let mut skip_from: Option<usize> = None;
    let cols = line.len();

    let mut x = 0;
    while x < cols {
        let (data, ch) = match cursor {
            Some((cx, c)) if cx == x => c.overlay(line[x].attr, &line[x].ch),
            _ => (line[x].attr, line[x].ch.clone()),
        };

        if committed[x].attr == data && committed[x].ch == ch {
            skip_from.get_or_insert(x);
            x += 1;
            continue;
        }

        // A filler only changes along with its wide glyph.
        if ch.is_empty() {
            committed[x].set(data, "");
            skip_from.get_or_insert(x);
            x += 1;
            continue;
        }

        if let Some(lx) = skip_from.take() {
            if opts.parm_right_cursor {
                let _ = ansi::cuf(&mut out, (x - lx) as u16);
            } else {
                let _ = ansi::cup(&mut out, x as u16, y as u16);
            }
        }

        let past_cursor = cursor.is_some_and(|(cx, _)| cx >= x);
        if ch == " " && !past_cursor && can_erase(data, opts) && erase_tail(line, committed, x, data) {
            // The cursor already sits at `x`: row start, a skip move, or
            // the glyphs just written put it there.
            switch_attr(&mut out, &mut attr, data, opts.colors);
            let _ = ansi::erase_eol(&mut out);
            for cell in &mut committed[x..] {
                cell.set(data, " ");
            }
            break;
        }

        switch_attr(&mut out, &mut attr, data, opts.colors);

        if unicode::str_width(&ch) == 2 {
            let cramped = x + 1 >= cols || junction::is_angle(&line[x + 1].ch);
            if cramped {
                out.push(b' ');
                committed[x].set(data, &ch);
            } else {
                out.extend_from_slice(glyph(&ch, opts).as_bytes());
                if !opts.unicode {
                    out.push(b' ');
                }
                committed[x].set(data, &ch);
                committed[x + 1].set(line[x + 1].attr, &line[x + 1].ch);
                x += 1;
            }
        } else {
            out.extend_from_slice(glyph(&ch, opts).as_bytes());
            committed[x].set(data, &ch);
        }
        x += 1;
    }

    if attr != Attr::DEFAULT {
        let _ = out.write_all(ansi::SGR_RESET.as_bytes());
    }
    out
}

/// `EL` paints with the current background: only usable when that matches
/// what the cell wants.
fn can_erase(data: Attr, opts: &DrawOptions) -> bool {
    let def = Attr::DEFAULT;
    opts.use_bce
        && (opts.bce || data.bg() == def.bg())
        && data.flags().contains(AttrFlags::INVERSE) == def.flags().contains(AttrFlags::INVERSE)
}

/// Whether every cell from `x` is the same blank and at least one of them
/// differs from what the terminal shows.
fn erase_tail(line: &[Cell], committed: &[Cell], x: usize, data: Attr) -> bool {
    let mut changed = false;
    for (cell, old) in line[x..].iter().zip(&committed[x..]) {
        if cell.attr != data || cell.ch != " " {
            return false;
        }
        if old != cell {
            changed = true;
        }
    }
    changed
}

fn switch_attr(out: &mut Vec<u8>, cur: &mut Attr, data: Attr, colors: u16) {
    if data == *cur {
        return;
    }
    if *cur != Attr::DEFAULT {
        out.extend_from_slice(ansi::SGR_RESET.as_bytes());
    }
    if data != Attr::DEFAULT {
        let mut body = String::from("\x1b[");
        sgr::push_body(&mut body, data, colors);
        body.push('m');
        out.extend_from_slice(body.as_bytes());
    }
    *cur = data;
}

/// Glyph as the terminal can show it.
fn glyph<'a>(ch: &'a str, opts: &DrawOptions) -> &'a str {
    if opts.unicode || ch.is_ascii() {
        return ch;
    }
    match ch {
        "─" | "┬" | "┴" => "-",
        "│" | "├" | "┤" => "|",
        "┌" | "┐" | "└" | "┘" | "┼" => "+",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::CursorShape;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    fn hidden() -> DrawOptions {
        DrawOptions { cursor_hidden: true, ..Default::default() }
    }

    #[test]
    fn second_draw_is_empty() {
        let mut g = Grid::new(10, 3);
        g.set(2, 1, Attr::DEFAULT.with_fg(1), "x");
        let first = text(draw(&mut g, &hidden(), None, 0, 2));
        assert!(first.contains("x"));
        assert!(draw(&mut g, &hidden(), None, 0, 2).is_empty());
    }

    #[test]
    fn fresh_grid_matches_committed() {
        let mut g = Grid::new(5, 2);
        assert!(draw(&mut g, &hidden(), None, 0, 1).is_empty());
        assert!(!g.is_dirty(0));
    }

    #[test]
    fn skipped_run_uses_cuf() {
        let mut g = Grid::new(10, 1);
        g.set(3, 0, Attr::DEFAULT, "a");
        g.set(7, 0, Attr::DEFAULT, "b");
        let out = text(draw(&mut g, &hidden(), None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H\x1b[3Ca\x1b[3Cb\x1b8");
    }

    #[test]
    fn skipped_run_uses_cup_without_cuf() {
        let mut g = Grid::new(10, 2);
        g.set(3, 1, Attr::DEFAULT, "a");
        let opts = DrawOptions { parm_right_cursor: false, ..hidden() };
        let out = text(draw(&mut g, &opts, None, 0, 1));
        assert_eq!(out, "\x1b7\x1b[2;1H\x1b[2;4Ha\x1b8");
    }

    #[test]
    fn attributes_reset_between_and_after() {
        let mut g = Grid::new(3, 1);
        let red = Attr::DEFAULT.with_fg(1);
        let bold = Attr::DEFAULT.with_flags(AttrFlags::BOLD);
        g.set(0, 0, red, "a");
        g.set(1, 0, red, "b");
        g.set(2, 0, bold, "c");
        let out = text(draw(&mut g, &hidden(), None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H\x1b[31mab\x1b[m\x1b[1mc\x1b[m\x1b8");
    }

    #[test]
    fn visible_cursor_is_hidden_during_frame() {
        let mut g = Grid::new(2, 1);
        g.set(0, 0, Attr::DEFAULT, "a");
        let out = text(draw(&mut g, &DrawOptions::default(), None, 0, 0));
        assert!(out.starts_with("\x1b7\x1b[?25l"));
        assert!(out.ends_with("\x1b8\x1b[?25h"));
    }

    #[test]
    fn trailing_blanks_become_erase() {
        let mut g = Grid::new(6, 1);
        for x in 0..6 {
            g.set(x, 0, Attr::DEFAULT, "z");
        }
        draw(&mut g, &hidden(), None, 0, 0);
        for x in 2..6 {
            g.set(x, 0, Attr::DEFAULT, " ");
        }
        let opts = DrawOptions { use_bce: true, ..hidden() };
        let out = text(draw(&mut g, &opts, None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H\x1b[2C\x1b[K\x1b8");
        assert_eq!(g.committed(5, 0).map(|c| c.ch.as_str()), Some(" "));
    }

    #[test]
    fn erase_after_written_glyphs_needs_no_move() {
        let mut g = Grid::new(5, 1);
        for x in 0..5 {
            g.set(x, 0, Attr::DEFAULT, "z");
        }
        draw(&mut g, &hidden(), None, 0, 0);
        g.set(0, 0, Attr::DEFAULT, "a");
        for x in 1..5 {
            g.set(x, 0, Attr::DEFAULT, " ");
        }
        let opts = DrawOptions { use_bce: true, ..hidden() };
        let out = text(draw(&mut g, &opts, None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1Ha\x1b[K\x1b8");
    }

    #[test]
    fn colored_blanks_need_bce() {
        let mut g = Grid::new(4, 1);
        let blue = Attr::DEFAULT.with_bg(4);
        g.fill(blue, " ", 0, 4, 0, 1);
        let opts = DrawOptions { use_bce: true, ..hidden() };
        let out = text(draw(&mut g.clone(), &opts, None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H\x1b[44m    \x1b[m\x1b8");
        let opts = DrawOptions { bce: true, ..opts };
        let out = text(draw(&mut g, &opts, None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H\x1b[44m\x1b[K\x1b[m\x1b8");
    }

    #[test]
    fn wide_glyph_consumes_filler() {
        let mut g = Grid::new(4, 1);
        g.set(0, 0, Attr::DEFAULT, "世");
        g.set(1, 0, Attr::DEFAULT, "");
        g.set(2, 0, Attr::DEFAULT, "a");
        let out = text(draw(&mut g, &hidden(), None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H世a\x1b8");
        assert!(g.committed(1, 0).is_some_and(Cell::is_filler));
    }

    #[test]
    fn wide_glyph_in_last_column_is_blank() {
        let mut g = Grid::new(3, 1);
        g.set(2, 0, Attr::DEFAULT, "世");
        let out = text(draw(&mut g, &hidden(), None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H\x1b[2C \x1b8");
        assert!(draw(&mut g, &hidden(), None, 0, 0).is_empty());
    }

    #[test]
    fn ascii_terminal_gets_fallback_glyphs() {
        let mut g = Grid::new(3, 1);
        g.set(0, 0, Attr::DEFAULT, "┌");
        g.set(1, 0, Attr::DEFAULT, "─");
        g.set(2, 0, Attr::DEFAULT, "é");
        let opts = DrawOptions { unicode: false, ..hidden() };
        let out = text(draw(&mut g, &opts, None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H+-?\x1b8");
    }

    #[test]
    fn ascii_terminal_pads_wide_fallback() {
        let mut g = Grid::new(4, 1);
        g.set(0, 0, Attr::DEFAULT, "世");
        g.set(1, 0, Attr::DEFAULT, "");
        g.set(2, 0, Attr::DEFAULT, "a");
        let opts = DrawOptions { unicode: false, ..hidden() };
        let out = text(draw(&mut g, &opts, None, 0, 0));
        assert_eq!(out, "\x1b7\x1b[1;1H? a\x1b8");
    }

    #[test]
    fn artificial_cursor_row_is_always_visited() {
        let mut g = Grid::new(3, 2);
        draw(&mut g, &hidden(), None, 0, 1);
        let c = ArtificialCursor { shape: CursorShape::Underline, ..Default::default() };
        let overlay = CursorOverlay { x: 1, y: 1, cursor: &c };
        let out = text(draw(&mut g, &hidden(), Some(overlay), 0, 1));
        assert_eq!(out, "\x1b7\x1b[2;1H\x1b[1C\x1b[4;37m \x1b[m\x1b8");
        assert!(draw(&mut g, &hidden(), Some(overlay), 0, 1).is_empty());
    }
}
