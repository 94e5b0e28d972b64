//! Core types shared by the driver, the grid, and the compositor.
//!
//! A cell is a packed attribute plus one grapheme cluster. The attribute
//! layout is fixed because it is also the unit the SGR codec works in:
//!
//! ```text
//!  bits 0..9    background colour index (0x1ff = terminal default)
//!  bits 9..18   foreground colour index (0x1ff = terminal default)
//!  bits 18..    flags: bold, underline, blink, inverse, invisible, dim
//! ```

use std::fmt;

// =============================================================================
// Attributes
// =============================================================================

/// Colour index meaning "let the terminal pick".
pub const DEFAULT_COLOR: u16 = 0x1ff;

bitflags::bitflags! {
    /// Text attribute flags, stored above bit 18 of a packed [`Attr`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u32 {
        const BOLD      = 1 << 0;
        const UNDERLINE = 1 << 1;
        const BLINK     = 1 << 2;
        const INVERSE   = 1 << 3;
        const INVISIBLE = 1 << 4;
        const DIM       = 1 << 5;
    }
}

/// Packed cell attribute.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attr(pub u32);

impl Attr {
    /// Default foreground and background, no flags.
    pub const DEFAULT: Attr = Attr(((DEFAULT_COLOR as u32) << 9) | DEFAULT_COLOR as u32);

    pub const fn new(flags: AttrFlags, fg: u16, bg: u16) -> Self {
        Attr((flags.bits() << 18) | (((fg & 0x1ff) as u32) << 9) | (bg & 0x1ff) as u32)
    }

    #[inline]
    pub const fn bg(self) -> u16 {
        (self.0 & 0x1ff) as u16
    }

    #[inline]
    pub const fn fg(self) -> u16 {
        ((self.0 >> 9) & 0x1ff) as u16
    }

    #[inline]
    pub const fn flags(self) -> AttrFlags {
        AttrFlags::from_bits_truncate(self.0 >> 18)
    }

    pub const fn with_bg(self, bg: u16) -> Self {
        Attr((self.0 & !0x1ff) | (bg & 0x1ff) as u32)
    }

    pub const fn with_fg(self, fg: u16) -> Self {
        Attr((self.0 & !(0x1ff << 9)) | (((fg & 0x1ff) as u32) << 9))
    }

    pub const fn with_flags(self, flags: AttrFlags) -> Self {
        Attr((self.0 & 0x3ffff) | (flags.bits() << 18))
    }

    pub const fn is_default(self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl Default for Attr {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr")
            .field("fg", &self.fg())
            .field("bg", &self.bg())
            .field("flags", &self.flags())
            .finish()
    }
}

// =============================================================================
// Cell
// =============================================================================

/// One terminal position.
///
/// `ch` holds a whole grapheme cluster. The empty string is the filler that
/// sits in the column after a double-width glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub attr: Attr,
    pub ch: String,
}

impl Cell {
    pub fn new(attr: Attr, ch: impl Into<String>) -> Self {
        Self { attr, ch: ch.into() }
    }

    pub fn blank(attr: Attr) -> Self {
        Self { attr, ch: " ".to_string() }
    }

    pub fn filler(attr: Attr) -> Self {
        Self { attr, ch: String::new() }
    }

    #[inline]
    pub fn is_filler(&self) -> bool {
        self.ch.is_empty()
    }

    #[inline]
    pub fn is_blank(&self) -> bool {
        self.ch == " "
    }

    pub fn set(&mut self, attr: Attr, ch: &str) {
        self.attr = attr;
        if self.ch != ch {
            self.ch.clear();
            self.ch.push_str(ch);
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Attr::DEFAULT)
    }
}

// =============================================================================
// RenderCoords
// =============================================================================

/// Absolute half-open cell bounds of a rendered element for one frame.
///
/// `base` is the scroll offset of the element's own content. The `no*`
/// flags record which edges were clipped by a scrollable ancestor, so the
/// compositor knows not to draw that side of the border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderCoords {
    pub xi: i32,
    pub xl: i32,
    pub yi: i32,
    pub yl: i32,
    pub base: i32,
    pub noleft: bool,
    pub noright: bool,
    pub notop: bool,
    pub nobot: bool,
    /// Frame counter value when these coordinates were produced.
    pub renders: u64,
}

impl RenderCoords {
    pub fn width(&self) -> i32 {
        self.xl - self.xi
    }

    pub fn height(&self) -> i32 {
        self.yl - self.yi
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.xi && x < self.xl && y >= self.yi && y < self.yl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attr_packs_both_default_colors() {
        assert_eq!(Attr::DEFAULT.0, (0x1ff << 9) | 0x1ff);
        assert_eq!(Attr::DEFAULT.fg(), DEFAULT_COLOR);
        assert_eq!(Attr::DEFAULT.bg(), DEFAULT_COLOR);
        assert!(Attr::DEFAULT.flags().is_empty());
    }

    #[test]
    fn attr_accessors_roundtrip_fields() {
        let a = Attr::new(AttrFlags::BOLD | AttrFlags::DIM, 12, 200);
        assert_eq!(a.fg(), 12);
        assert_eq!(a.bg(), 200);
        assert_eq!(a.flags(), AttrFlags::BOLD | AttrFlags::DIM);

        let b = a.with_fg(DEFAULT_COLOR).with_bg(4).with_flags(AttrFlags::UNDERLINE);
        assert_eq!(b.fg(), DEFAULT_COLOR);
        assert_eq!(b.bg(), 4);
        assert_eq!(b.flags(), AttrFlags::UNDERLINE);
    }

    #[test]
    fn flags_live_above_bit_18() {
        let a = Attr::new(AttrFlags::INVERSE, 0, 0);
        assert_eq!(a.0, 8 << 18);
    }

    #[test]
    fn filler_cell_is_empty() {
        assert!(Cell::filler(Attr::DEFAULT).is_filler());
        assert!(Cell::default().is_blank());
    }

    #[test]
    fn coords_contains_is_half_open() {
        let c = RenderCoords { xi: 1, xl: 11, yi: 1, yl: 6, ..Default::default() };
        assert!(c.contains(1, 1));
        assert!(c.contains(10, 5));
        assert!(!c.contains(11, 5));
        assert!(!c.contains(10, 6));
        assert_eq!(c.width(), 10);
        assert_eq!(c.height(), 5);
    }
}
