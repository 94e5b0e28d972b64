//! Widget styling: colours and flags that resolve to a packed [`Attr`].

use crate::color;
use crate::types::{Attr, AttrFlags, DEFAULT_COLOR};

/// Colours and flags of one styled surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub fg: u16,
    pub bg: u16,
    pub flags: AttrFlags,
}

impl Default for Style {
    fn default() -> Self {
        Self { fg: DEFAULT_COLOR, bg: DEFAULT_COLOR, flags: AttrFlags::empty() }
    }
}

impl Style {
    pub fn fg(mut self, color: u16) -> Self {
        self.fg = color;
        self
    }

    pub fn bg(mut self, color: u16) -> Self {
        self.bg = color;
        self
    }

    /// Colour by name (`"red"`, `"light-blue"`, `"#ff0000"`, `"default"`).
    /// Unknown names leave the colour unchanged.
    pub fn fg_named(mut self, name: &str) -> Self {
        if let Some(c) = color::convert(name) {
            self.fg = c;
        }
        self
    }

    pub fn bg_named(mut self, name: &str) -> Self {
        if let Some(c) = color::convert(name) {
            self.bg = c;
        }
        self
    }

    pub fn bold(mut self) -> Self {
        self.flags |= AttrFlags::BOLD;
        self
    }

    pub fn underline(mut self) -> Self {
        self.flags |= AttrFlags::UNDERLINE;
        self
    }

    pub fn inverse(mut self) -> Self {
        self.flags |= AttrFlags::INVERSE;
        self
    }

    pub fn dim(mut self) -> Self {
        self.flags |= AttrFlags::DIM;
        self
    }

    pub fn attr(&self) -> Attr {
        Attr::new(self.flags, self.fg, self.bg)
    }

    /// Apply the set fields of a patch over this style.
    pub fn patched(mut self, patch: &StylePatch) -> Self {
        if let Some(fg) = patch.fg {
            self.fg = fg;
        }
        if let Some(bg) = patch.bg {
            self.bg = bg;
        }
        if let Some(flags) = patch.flags {
            self.flags = flags;
        }
        self
    }
}

/// Partial override, used for the focused state and per-side border colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StylePatch {
    pub fg: Option<u16>,
    pub bg: Option<u16>,
    pub flags: Option<AttrFlags>,
}

impl StylePatch {
    pub fn fg(color: u16) -> Self {
        Self { fg: Some(color), ..Default::default() }
    }

    pub fn bg(color: u16) -> Self {
        Self { bg: Some(color), ..Default::default() }
    }
}

/// Full element styling.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementStyle {
    pub base: Style,
    /// Blend over what is underneath instead of painting.
    pub transparent: bool,
    /// Applied while the element holds focus.
    pub focus: Option<StylePatch>,
    pub border: Style,
    pub scrollbar: Option<Style>,
    pub track: Option<Style>,
}
