//! Layout resolver and compositor.
//!
//! Elements live in a [`Tree`] arena owned by the screen and are addressed
//! by [`ElementId`]. Each render pass resolves every visible element's
//! declared [`Position`] against its parent's rendered box
//! ([`coords`]), lays out its text ([`content`], [`wrap`]), and paints
//! background, content, scrollbar, border and children into the pending
//! grid ([`render`]).
//!
//! # Example
//!
//! ```
//! use spark_term::element::{Border, Dim, Element};
//!
//! let el = Element::new()
//!     .left(1)
//!     .top(1)
//!     .width(Dim::percent(50.0))
//!     .height(5)
//!     .border(Border::line())
//!     .content("{bold}Hi{/bold}")
//!     .tags(true);
//! assert_eq!(el.ileft(), 1);
//! ```

pub mod border;
pub mod content;
pub mod coords;
pub mod position;
pub mod render;
pub mod scroll;
pub mod style;
pub mod tree;
pub mod wrap;

use std::fmt;

pub use self::border::{Border, BorderKind, BorderSides};
pub use self::coords::Layout;
pub use self::position::{Dim, Padding, Position};
pub use self::scroll::{ScrollState, Scrollbar};
pub use self::style::{ElementStyle, Style, StylePatch};
pub use self::tree::Tree;

use crate::types::RenderCoords;

/// Handle to an element in a [`Tree`]. Ids are never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// A box on screen: geometry, decoration, text, and optional scrolling.
#[derive(Debug, Clone)]
pub struct Element {
    pub position: Position,
    pub padding: Padding,
    pub border: Option<Border>,
    pub style: ElementStyle,
    pub content: String,
    /// Interpret `{...}` tags in `content`.
    pub tags: bool,
    pub align: Align,
    pub valign: VAlign,
    pub wrap: bool,
    pub hidden: bool,
    /// Size to content and children on axes the position leaves open,
    /// even when there is nothing to fit.
    pub shrink: bool,
    /// Not moved by the nearest scrollable ancestor.
    pub fixed: bool,
    /// Clamp the rendered box to the parent's interior.
    pub no_overflow: bool,
    pub focusable: bool,
    /// Negative removes the element from tab order; 0 is natural order.
    pub tab_index: i32,
    /// Background fill glyph.
    pub fill: char,
    pub scroll: Option<ScrollState>,

    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) attached: bool,
    pub(crate) lpos: Option<RenderCoords>,
    pub(crate) index: Option<u32>,
}

impl Default for Element {
    fn default() -> Self {
        Self {
            position: Position::default(),
            padding: Padding::default(),
            border: None,
            style: ElementStyle::default(),
            content: String::new(),
            tags: false,
            align: Align::Left,
            valign: VAlign::Top,
            wrap: true,
            hidden: false,
            shrink: false,
            fixed: false,
            no_overflow: false,
            focusable: false,
            tab_index: 0,
            fill: ' ',
            scroll: None,
            parent: None,
            children: Vec::new(),
            attached: false,
            lpos: None,
            index: None,
        }
    }
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Builder
    // =========================================================================

    pub fn left(mut self, d: impl Into<Dim>) -> Self {
        self.position.left = Some(d.into());
        self
    }

    pub fn top(mut self, d: impl Into<Dim>) -> Self {
        self.position.top = Some(d.into());
        self
    }

    pub fn right(mut self, d: impl Into<Dim>) -> Self {
        self.position.right = Some(d.into());
        self
    }

    pub fn bottom(mut self, d: impl Into<Dim>) -> Self {
        self.position.bottom = Some(d.into());
        self
    }

    pub fn width(mut self, d: impl Into<Dim>) -> Self {
        let d = d.into();
        self.shrink |= d == Dim::Shrink;
        self.position.width = Some(d);
        self
    }

    pub fn height(mut self, d: impl Into<Dim>) -> Self {
        let d = d.into();
        self.shrink |= d == Dim::Shrink;
        self.position.height = Some(d);
        self
    }

    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style.base = style;
        self
    }

    pub fn border_style(mut self, style: Style) -> Self {
        self.style.border = style;
        self
    }

    pub fn focus_style(mut self, patch: StylePatch) -> Self {
        self.style.focus = Some(patch);
        self
    }

    pub fn transparent(mut self, on: bool) -> Self {
        self.style.transparent = on;
        self
    }

    pub fn content(mut self, text: impl Into<String>) -> Self {
        self.content = text.into();
        self
    }

    pub fn tags(mut self, on: bool) -> Self {
        self.tags = on;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn valign(mut self, valign: VAlign) -> Self {
        self.valign = valign;
        self
    }

    pub fn wrap(mut self, on: bool) -> Self {
        self.wrap = on;
        self
    }

    pub fn hidden(mut self, on: bool) -> Self {
        self.hidden = on;
        self
    }

    pub fn shrink(mut self, on: bool) -> Self {
        self.shrink = on;
        self
    }

    pub fn fixed(mut self, on: bool) -> Self {
        self.fixed = on;
        self
    }

    pub fn no_overflow(mut self, on: bool) -> Self {
        self.no_overflow = on;
        self
    }

    pub fn focusable(mut self, on: bool) -> Self {
        self.focusable = on;
        self
    }

    pub fn tab_index(mut self, index: i32) -> Self {
        self.focusable = true;
        self.tab_index = index;
        self
    }

    pub fn fill(mut self, ch: char) -> Self {
        self.fill = ch;
        self
    }

    pub fn scrollable(mut self, state: ScrollState) -> Self {
        self.scroll = Some(state);
        self
    }

    // =========================================================================
    // Insets
    // =========================================================================

    fn border_inset(&self) -> i32 {
        i32::from(self.border.is_some())
    }

    pub fn ileft(&self) -> i32 {
        self.border_inset() + self.padding.left
    }

    pub fn iright(&self) -> i32 {
        self.border_inset() + self.padding.right
    }

    pub fn itop(&self) -> i32 {
        self.border_inset() + self.padding.top
    }

    pub fn ibottom(&self) -> i32 {
        self.border_inset() + self.padding.bottom
    }

    pub fn iwidth(&self) -> i32 {
        self.ileft() + self.iright()
    }

    pub fn iheight(&self) -> i32 {
        self.itop() + self.ibottom()
    }

    /// Whether layout sizes this element to its content and children.
    ///
    /// Explicit `shrink` always does. Otherwise an axis with no size that
    /// is not pinned by both edges shrinks, as long as there is content or
    /// a child to fit; an empty element fills the space its anchors leave.
    pub fn shrinks(&self) -> bool {
        if self.shrink {
            return true;
        }
        if self.content.is_empty() && self.children.is_empty() {
            return false;
        }
        let pos = &self.position;
        let open_x = pos.width.is_none() && (pos.left.is_none() || pos.right.is_none());
        let open_y = pos.height.is_none() && (pos.top.is_none() || pos.bottom.is_none());
        open_x || open_y
    }

    // =========================================================================
    // Runtime state
    // =========================================================================

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Whether the element is reachable from the screen.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Bounds from the most recent render, if it was drawn.
    pub fn last_coords(&self) -> Option<&RenderCoords> {
        self.lpos.as_ref()
    }

    /// Paint order from the most recent render; higher is on top.
    pub fn z_index(&self) -> Option<u32> {
        self.index
    }

    pub fn is_scrollable(&self) -> bool {
        self.scroll.is_some()
    }
}
