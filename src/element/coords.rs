//! Position resolution, shrink-to-fit, and scroll clipping.
//!
//! [`Layout`] is a read-only view over the element tree plus the screen
//! size. All resolution is relative to the parent's rendered box (its last
//! render coordinates), or to the whole screen for top-level elements.
//! A parent with no rendered box is resolved on the fly without scroll
//! clipping, which is what queries made before the first render see.

use super::content::{self, TextOptions};
use super::position::Dim;
use super::wrap::Wrapped;
use super::{Element, ElementId, Tree};
use crate::types::RenderCoords;

/// Parent box as seen by a child.
#[derive(Debug, Clone, Copy)]
struct Frame {
    aleft: i32,
    atop: i32,
    aright: i32,
    abottom: i32,
    width: i32,
    height: i32,
    ileft: i32,
    itop: i32,
    iright: i32,
    ibottom: i32,
}

/// Resolved offsets and size of one element, before shrink and clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
}

/// Temporary boxes for elements whose size is still being decided.
type Overrides = Vec<(ElementId, RenderCoords)>;

pub struct Layout<'a> {
    tree: &'a Tree,
    cols: i32,
    rows: i32,
    auto_padding: bool,
    text: TextOptions,
    renders: u64,
}

impl<'a> Layout<'a> {
    pub fn new(tree: &'a Tree, cols: u16, rows: u16) -> Self {
        Self {
            tree,
            cols: cols as i32,
            rows: rows as i32,
            auto_padding: true,
            text: TextOptions::default(),
            renders: 0,
        }
    }

    /// Offset children by their parent's border and padding.
    pub fn auto_padding(mut self, on: bool) -> Self {
        self.auto_padding = on;
        self
    }

    pub fn text(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    /// Frame counter stamped into produced coordinates.
    pub fn renders(mut self, renders: u64) -> Self {
        self.renders = renders;
        self
    }

    // =========================================================================
    // Public queries
    // =========================================================================

    /// Render coordinates for this frame, clipped by any scrollable
    /// ancestor. `None` means the element is not drawn.
    pub fn coords(&self, id: ElementId) -> Option<RenderCoords> {
        self.coords_in(id, false, &mut Vec::new())
    }

    /// Coordinates ignoring scrollable ancestors.
    pub fn coords_unscrolled(&self, id: ElementId) -> Option<RenderCoords> {
        self.coords_in(id, true, &mut Vec::new())
    }

    /// Offsets and size from the declared position alone.
    pub fn resolve(&self, id: ElementId) -> Option<Resolved> {
        let el = self.tree.get(id)?;
        let p = self.parent_frame(el, &mut Vec::new())?;
        Some(Resolved {
            left: self.left_in(el, &p),
            top: self.top_in(el, &p),
            right: self.right_in(el, &p),
            bottom: self.bottom_in(el, &p),
            width: self.width_in(el, &p),
            height: self.height_in(el, &p),
        })
    }

    /// Content laid out at the element's current interior width.
    pub fn content(&self, id: ElementId) -> Option<Wrapped> {
        let el = self.tree.get(id)?;
        let pos = match el.lpos {
            Some(p) => p,
            None => self.coords_unscrolled(id)?,
        };
        Some(content::parse(el, pos.width() - el.iwidth(), self.text, el.style.base.attr()))
    }

    /// Rows available for content inside the element.
    pub fn view_height(&self, id: ElementId) -> i32 {
        let Some(el) = self.tree.get(id) else { return 0 };
        let pos = el.lpos.or_else(|| self.coords_unscrolled(id));
        pos.map_or(0, |p| p.height() - el.iheight())
    }

    /// Lowest bottom edge among children, relative to the interior top.
    pub fn scroll_bottom(&self, id: ElementId) -> i32 {
        let Some(el) = self.tree.get(id) else { return 0 };
        if el.scroll.is_none() {
            return 0;
        }
        let Some(pos) = el.lpos.or_else(|| self.coords_unscrolled(id)) else { return 0 };
        let top = pos.yi + el.itop();
        let mut ov = Vec::new();
        el.children
            .iter()
            .filter_map(|c| self.coords_in(*c, true, &mut ov))
            .map(|r| r.yl - top)
            .fold(0, i32::max)
    }

    /// Total scrollable rows: wrapped content or lowest child, whichever
    /// reaches further.
    pub fn scroll_height(&self, id: ElementId) -> i32 {
        let lines = self.content(id).map_or(0, |w| w.height() as i32);
        lines.max(self.scroll_bottom(id))
    }

    // =========================================================================
    // Parent frames
    // =========================================================================

    fn screen_frame(&self) -> Frame {
        Frame {
            aleft: 0,
            atop: 0,
            aright: 0,
            abottom: 0,
            width: self.cols,
            height: self.rows,
            ileft: 0,
            itop: 0,
            iright: 0,
            ibottom: 0,
        }
    }

    fn lpos(&self, id: ElementId, ov: &Overrides) -> Option<RenderCoords> {
        ov.iter().rev().find(|(i, _)| *i == id).map(|(_, c)| *c).or_else(|| self.tree.get(id)?.lpos)
    }

    fn parent_frame(&self, el: &Element, ov: &mut Overrides) -> Option<Frame> {
        let Some(pid) = el.parent else {
            return Some(self.screen_frame());
        };
        let pe = self.tree.get(pid)?;
        let pos = match self.lpos(pid, ov) {
            Some(p) => p,
            None => self.coords_in(pid, true, ov)?,
        };
        Some(Frame {
            aleft: pos.xi,
            atop: pos.yi,
            aright: self.cols - pos.xl,
            abottom: self.rows - pos.yl,
            width: pos.width(),
            height: pos.height(),
            ileft: pe.ileft(),
            itop: pe.itop(),
            iright: pe.iright(),
            ibottom: pe.ibottom(),
        })
    }

    // =========================================================================
    // Horizontal
    // =========================================================================

    fn width_in(&self, el: &Element, p: &Frame) -> i32 {
        let pos = &el.position;
        if let Some(w) = pos.width_expr() {
            return w.resolve(p.width).unwrap_or(0);
        }
        let left = offset(pos.left, p.width);
        let right = offset(pos.right, p.width);
        let mut width = p.width - right - left;
        if self.auto_padding {
            if (pos.left.is_some() || pos.right.is_none()) && pos.left != Some(Dim::Center) {
                width -= p.ileft;
            }
            width -= p.iright;
        }
        width
    }

    fn left_in(&self, el: &Element, p: &Frame) -> i32 {
        let pos = &el.position;
        if pos.left.is_none() && pos.right.is_some() {
            return self.cols - self.width_in(el, p) - self.right_in(el, p);
        }
        let mut left = offset(pos.left, p.width);
        if pos.left == Some(Dim::Center) {
            left -= self.width_in(el, p) / 2;
        } else if self.auto_padding {
            left += p.ileft;
        }
        p.aleft + left
    }

    fn right_in(&self, el: &Element, p: &Frame) -> i32 {
        let pos = &el.position;
        let mut right = if pos.right.is_none() && pos.left.is_some() {
            self.cols - (self.left_in(el, p) + self.width_in(el, p))
        } else {
            p.aright + offset(pos.right, p.width)
        };
        if self.auto_padding {
            right += p.iright;
        }
        right
    }

    // =========================================================================
    // Vertical
    // =========================================================================

    fn height_in(&self, el: &Element, p: &Frame) -> i32 {
        let pos = &el.position;
        if let Some(h) = pos.height_expr() {
            return h.resolve(p.height).unwrap_or(0);
        }
        let top = offset(pos.top, p.height);
        let bottom = offset(pos.bottom, p.height);
        let mut height = p.height - bottom - top;
        if self.auto_padding {
            if (pos.top.is_some() || pos.bottom.is_none()) && pos.top != Some(Dim::Center) {
                height -= p.itop;
            }
            height -= p.ibottom;
        }
        height
    }

    fn top_in(&self, el: &Element, p: &Frame) -> i32 {
        let pos = &el.position;
        if pos.top.is_none() && pos.bottom.is_some() {
            return self.rows - self.height_in(el, p) - self.bottom_in(el, p);
        }
        let mut top = offset(pos.top, p.height);
        if pos.top == Some(Dim::Center) {
            top -= self.height_in(el, p) / 2;
        } else if self.auto_padding {
            top += p.itop;
        }
        p.atop + top
    }

    fn bottom_in(&self, el: &Element, p: &Frame) -> i32 {
        let pos = &el.position;
        let mut bottom = if pos.bottom.is_none() && pos.top.is_some() {
            self.rows - (self.top_in(el, p) + self.height_in(el, p))
        } else {
            p.abottom + offset(pos.bottom, p.height)
        };
        if self.auto_padding {
            bottom += p.ibottom;
        }
        bottom
    }

    // =========================================================================
    // Coordinates
    // =========================================================================

    fn coords_in(&self, id: ElementId, noscroll: bool, ov: &mut Overrides) -> Option<RenderCoords> {
        let el = self.tree.get(id)?;
        if el.hidden {
            return None;
        }
        let p = self.parent_frame(el, ov)?;
        let mut xi = self.left_in(el, &p);
        let mut xl = xi + self.width_in(el, &p);
        let mut yi = self.top_in(el, &p);
        let mut yl = yi + self.height_in(el, &p);
        let mut base = el.scroll.map_or(0, |s| s.child_base);
        let (mut noleft, mut noright, mut notop, mut nobot) = (false, false, false, false);

        if el.shrinks() {
            (xi, xl, yi, yl) = self.shrink(id, el, (xi, xl, yi, yl), ov);
        }

        let mut fixed = el.fixed;
        let mut anc = el.parent;
        while let Some(a) = anc {
            let ae = self.tree.get(a)?;
            if ae.scroll.is_some() {
                if !fixed {
                    break;
                }
                fixed = false;
            }
            anc = ae.parent;
        }

        if let (Some(a), false) = (anc, noscroll) {
            let ae = self.tree.get(a)?;
            let ppos = self.lpos(a, ov)?;
            let own = i32::from(el.border.is_some());
            let b = i32::from(ae.border.is_some());
            yi -= ppos.base;
            yl -= ppos.base;

            if yi < ppos.yi + b {
                if yl - 1 < ppos.yi + b {
                    return None;
                }
                notop = true;
                let v = ppos.yi - yi - own + b;
                base += v;
                yi += v;
            } else if yl > ppos.yl - b {
                if yi > ppos.yl - 1 - b {
                    return None;
                }
                nobot = true;
                let v = yl - ppos.yl - own + b;
                yl -= v;
            }
            if yi >= yl {
                return None;
            }
            if xi < ppos.xi {
                xi = ppos.xi - own + b;
                noleft = true;
            }
            if xl > ppos.xl {
                xl = ppos.xl + own - b;
                noright = true;
            }
            if xi >= xl {
                return None;
            }
        }

        if el.no_overflow {
            if let Some(pid) = el.parent {
                if let (Some(pp), Some(pe)) = (self.lpos(pid, ov), self.tree.get(pid)) {
                    xi = xi.max(pp.xi + pe.ileft());
                    xl = xl.min(pp.xl - pe.iright());
                    yi = yi.max(pp.yi + pe.itop());
                    yl = yl.min(pp.yl - pe.ibottom());
                }
            }
        }

        Some(RenderCoords { xi, xl, yi, yl, base, noleft, noright, notop, nobot, renders: self.renders })
    }

    // =========================================================================
    // Shrink-to-fit
    // =========================================================================

    fn shrink(&self, id: ElementId, el: &Element, b: (i32, i32, i32, i32), ov: &mut Overrides) -> (i32, i32, i32, i32) {
        let (_, xll, _, yll) = b;
        let sb = self.shrink_box(id, el, b, ov);
        let sc = self.shrink_content(el, b);

        let (mut xi, mut xl) = if sb.1 - sb.0 > sc.1 - sc.0 { (sb.0, sb.1) } else { (sc.0, sc.1) };
        let (mut yi, mut yl) = if sb.3 - sb.2 > sc.3 - sc.2 { (sb.2, sb.3) } else { (sc.2, sc.3) };

        if xl < xll && el.position.left == Some(Dim::Center) {
            let d = (xll - xl) / 2;
            xi += d;
            xl += d;
        }
        if yl < yll && el.position.top == Some(Dim::Center) {
            let d = (yll - yl) / 2;
            yi += d;
            yl += d;
        }
        (xi, xl, yi, yl)
    }

    /// Bounding box of the children, each resolved against the unshrunk box.
    fn shrink_box(&self, id: ElementId, el: &Element, b: (i32, i32, i32, i32), ov: &mut Overrides) -> (i32, i32, i32, i32) {
        let (mut xi, mut xl, mut yi, mut yl) = b;
        if el.children.is_empty() {
            return (xi, xi + 1, yi, yi + 1);
        }
        let (mut mxi, mut mxl, mut myi, mut myl) = (xi, xi + 1, yi, yi + 1);

        ov.push((id, RenderCoords { xi, xl, yi, yl, ..Default::default() }));
        for &child in &el.children {
            let Some(ce) = self.tree.get(child) else { continue };
            let Some(mut r) = self.coords_in(child, false, ov) else { continue };
            // Right/bottom anchored children would otherwise stretch the
            // box back to full size.
            if ce.position.left.is_none() && ce.position.right.is_some() {
                r.xl = xi + r.width();
                r.xi = xi;
                if self.auto_padding {
                    r.xl += el.ileft();
                    r.xi += el.ileft();
                }
            }
            if ce.position.top.is_none() && ce.position.bottom.is_some() {
                r.yl = yi + r.height();
                r.yi = yi;
                if self.auto_padding {
                    r.yl += el.itop();
                    r.yi += el.itop();
                }
            }
            mxi = mxi.min(r.xi);
            mxl = mxl.max(r.xl);
            myi = myi.min(r.yi);
            myl = myl.max(r.yl);
        }
        ov.pop();

        let pos = &el.position;
        if pos.width_expr().is_none() && (pos.left.is_none() || pos.right.is_none()) {
            if pos.left.is_none() && pos.right.is_some() {
                xi = xl - (mxl - mxi);
                xi -= if self.auto_padding { el.ileft() } else { el.padding.left + el.padding.right };
            } else {
                xl = mxl;
                xl += if self.auto_padding { el.iright() } else { el.padding.left + el.padding.right };
            }
        }
        if pos.height_expr().is_none() && (pos.top.is_none() || pos.bottom.is_none()) && el.scroll.is_none() {
            if pos.top.is_none() && pos.bottom.is_some() {
                yi = yl - (myl - myi);
                yi -= if self.auto_padding { el.itop() } else { el.padding.top + el.padding.bottom };
            } else {
                yl = myl;
                yl += if self.auto_padding { el.ibottom() } else { el.padding.top + el.padding.bottom };
            }
        }
        (xi, xl, yi, yl)
    }

    /// Box that exactly fits the wrapped content plus insets.
    fn shrink_content(&self, el: &Element, b: (i32, i32, i32, i32)) -> (i32, i32, i32, i32) {
        let (mut xi, mut xl, mut yi, mut yl) = b;
        let wrapped = content::parse(el, (xl - xi) - el.iwidth(), self.text, el.style.base.attr());
        let h = wrapped.height() as i32;
        let w = (wrapped.max_width as i32).max(1);
        let pos = &el.position;
        if pos.width_expr().is_none() && (pos.left.is_none() || pos.right.is_none()) {
            if pos.left.is_none() && pos.right.is_some() {
                xi = xl - w - el.iwidth();
            } else {
                xl = xi + w + el.iwidth();
            }
        }
        if pos.height_expr().is_none() && (pos.top.is_none() || pos.bottom.is_none()) && el.scroll.is_none() {
            if pos.top.is_none() && pos.bottom.is_some() {
                yi = yl - h - el.iheight();
            } else {
                yl = yi + h + el.iheight();
            }
        }
        (xi, xl, yi, yl)
    }
}

/// An offset expression against a parent extent; absent and `shrink` are 0.
fn offset(d: Option<Dim>, extent: i32) -> i32 {
    d.and_then(|d| d.resolve(extent)).unwrap_or(0)
}
