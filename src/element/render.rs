//! Compositing elements into the pending grid.
//!
//! One pass walks the tree in document order. Each element is painted in
//! layers: background fill, wrapped content, scrollbar, border; then its
//! children paint over it. Z-indices are handed out in the same order, so
//! a higher index is always on top.

use std::collections::BTreeSet;

use super::border;
use super::content::{self, TextOptions};
use super::coords::Layout;
use super::wrap::{Line, Wrapped};
use super::{Align, Element, ElementId, Tree, VAlign};
use crate::color;
use crate::screen::grid::Grid;
use crate::types::{Attr, AttrFlags, RenderCoords};

/// Per-pass compositing state.
pub struct Compositor<'a> {
    tree: &'a mut Tree,
    grid: &'a mut Grid,
    auto_padding: bool,
    text: TextOptions,
    renders: u64,
    focused: Option<ElementId>,
    next_index: u32,
    border_stops: BTreeSet<i32>,
}

impl<'a> Compositor<'a> {
    pub fn new(tree: &'a mut Tree, grid: &'a mut Grid) -> Self {
        Self {
            tree,
            grid,
            auto_padding: true,
            text: TextOptions::default(),
            renders: 0,
            focused: None,
            next_index: 0,
            border_stops: BTreeSet::new(),
        }
    }

    pub fn auto_padding(mut self, on: bool) -> Self {
        self.auto_padding = on;
        self
    }

    pub fn text(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    pub fn renders(mut self, renders: u64) -> Self {
        self.renders = renders;
        self
    }

    pub fn focused(mut self, focused: Option<ElementId>) -> Self {
        self.focused = focused;
        self
    }

    /// Rows holding at least one line border.
    pub fn border_stops(&self) -> &BTreeSet<i32> {
        &self.border_stops
    }

    /// Paint every attached element. The grid is expected to be cleared.
    pub fn render_all(&mut self) {
        self.tree.clear_frame();
        let roots = self.tree.roots().to_vec();
        for id in roots {
            self.render(id);
        }
    }

    fn layout(&self) -> Layout<'_> {
        Layout::new(self.tree, self.grid.cols() as u16, self.grid.rows() as u16)
            .auto_padding(self.auto_padding)
            .text(self.text)
            .renders(self.renders)
    }

    /// Paint one element and its subtree.
    pub fn render(&mut self, id: ElementId) {
        let index = self.next_index;
        self.next_index += 1;

        let Some(coords) = self.layout().coords(id) else {
            if let Some(el) = self.tree.get_mut(id) {
                el.lpos = None;
            }
            return;
        };
        if coords.width() <= 0 || coords.height() <= 0 {
            return;
        }
        let Some(el) = self.tree.get_mut(id) else { return };
        el.lpos = Some(coords);
        el.index = Some(index);

        let scroll_height = self.layout().scroll_bottom(id);
        let Some(el) = self.tree.get(id) else { return };
        let focused = self.focused == Some(id);
        let mut base = el.style.base;
        if focused {
            if let Some(patch) = &el.style.focus {
                base = base.patched(patch);
            }
        }
        let dattr = base.attr();
        let wrapped = content::parse(el, coords.width() - el.iwidth(), self.text, dattr);
        let scroll_height = scroll_height.max(wrapped.height() as i32);

        paint(self.grid, el, &coords, &wrapped, dattr, scroll_height);
        if let Some(b) = &el.border {
            border::paint(self.grid, b, el.style.border, &coords, dattr);
            if b.is_line() {
                self.border_stops.insert(coords.yi);
                self.border_stops.insert(coords.yl - 1);
            }
        }

        let children = el.children.clone();
        for child in children {
            self.render(child);
        }
    }
}

// =============================================================================
// Painting
// =============================================================================

struct Surface<'g> {
    grid: &'g mut Grid,
    transparent: bool,
    fill: String,
}

impl Surface<'_> {
    fn glyph(&mut self, x: i32, y: i32, attr: Attr, ch: &str) {
        if self.transparent {
            let Some(under) = self.grid.get(x, y).map(|c| c.attr) else { return };
            self.grid.set(x, y, color::blend(attr, under, 0.5), ch);
        } else {
            self.grid.set(x, y, attr, ch);
        }
    }

    /// Background cell: transparent elements only tint what is beneath.
    fn blank(&mut self, x: i32, y: i32, attr: Attr) {
        if self.transparent {
            let Some(under) = self.grid.get(x, y).map(|c| c.attr) else { return };
            self.grid.set_attr(x, y, color::blend(attr, under, 0.5));
        } else {
            let fill = std::mem::take(&mut self.fill);
            self.grid.set(x, y, attr, &fill);
            self.fill = fill;
        }
    }

    fn blank_region(&mut self, attr: Attr, xi: i32, xl: i32, yi: i32, yl: i32) {
        let (cols, rows) = (self.grid.cols() as i32, self.grid.rows() as i32);
        for y in yi.max(0)..yl.min(rows) {
            for x in xi.max(0)..xl.min(cols) {
                self.blank(x, y, attr);
            }
        }
    }

    fn line(&mut self, line: &Line, y: i32, xi: i32, xl: i32) {
        let cols = self.grid.cols() as i32;
        let lw = line.width() as i32;
        let pad = match line.align {
            Align::Left => 0,
            Align::Center => ((xl - xi - lw) / 2).max(0),
            Align::Right => (xl - xi - lw).max(0),
        };
        for x in xi.max(0)..xl.min(cols) {
            let rel = x - xi - pad;
            if rel < 0 {
                self.blank(x, y, line.start);
                continue;
            }
            match line.glyphs.get(rel as usize) {
                Some(g) if g.is_filler() && x == xi => self.blank(x, y, g.attr),
                Some(g) if g.width == 2 && x + 1 >= xl => self.glyph(x, y, g.attr, " "),
                Some(g) => self.glyph(x, y, g.attr, &g.ch),
                None => self.blank(x, y, line.end),
            }
        }
    }
}

fn paint(grid: &mut Grid, el: &Element, coords: &RenderCoords, wrapped: &Wrapped, dattr: Attr, scroll_height: i32) {
    let rows = grid.rows() as i32;
    let mut s = Surface { grid, transparent: el.style.transparent, fill: el.fill.to_string() };
    let (mut xi, mut xl, mut yi, mut yl) = (coords.xi, coords.xl, coords.yi, coords.yl);
    if el.border.is_some() {
        xi += 1;
        xl -= 1;
        yi += 1;
        yl -= 1;
    }
    if !el.padding.is_zero() || el.valign != VAlign::Top {
        s.blank_region(dattr, xi, xl, yi, yl);
    }
    xi += el.padding.left;
    xl -= el.padding.right;
    yi += el.padding.top;
    yl -= el.padding.bottom;

    let visible = yl - yi;
    let lines = &wrapped.lines;
    let count = lines.len() as i32;
    let skip = match el.valign {
        VAlign::Middle if count < visible => visible / 2 - count / 2,
        VAlign::Bottom if count < visible => visible - count,
        _ => 0,
    };
    let base = coords.base.max(0) as usize;
    let tail = lines.last().map_or(dattr, |l| l.end);

    for y in yi.max(0)..yl.min(rows) {
        let r = y - yi;
        if r < skip {
            continue;
        }
        match lines.get(base + (r - skip) as usize) {
            Some(line) => s.line(line, y, xi, xl),
            None => s.blank_region(tail, xi, xl, y, y + 1),
        }
    }

    let Some(scroll) = el.scroll else { return };
    let Some(bar) = scroll.scrollbar else { return };
    if coords.notop || coords.nobot || visible >= scroll_height || visible <= 0 {
        return;
    }
    let mut x = xl - 1;
    if bar.ignore_border && el.border.is_some() {
        x += 1;
    }
    if let Some(track) = bar.track {
        let style = el.style.track.unwrap_or(el.style.base);
        s.grid.fill(style.attr(), &track.to_string(), x, x + 1, yi, yl);
    }
    let style = el.style.scrollbar.unwrap_or_else(|| {
        let mut st = el.style.base;
        st.flags |= AttrFlags::INVERSE;
        st
    });
    let y = yi + scroll.thumb_row(visible, scroll_height);
    s.grid.set(x, y, style.attr(), &bar.ch.to_string());
}
