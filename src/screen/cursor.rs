//! Artificial cursor drawn into the grid.
//!
//! Some terminals cannot change cursor shape or colour; with the artificial
//! cursor enabled the diff renderer paints the cell under the tracked
//! cursor position itself. Blinking toggles `phase` from a repeating timer.
//!
//! - Block: inverse cell
//! - Underline: underline flag
//! - Line: `│` glyph
//!
//! Each shape forces the cursor colour (white unless configured).

use std::time::Duration;

use crate::program::CursorShape;
use crate::types::{Attr, AttrFlags};

/// Blink half-period.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(500);

const LINE_GLYPH: &str = "│";
const DEFAULT_CURSOR_COLOR: u16 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtificialCursor {
    pub shape: CursorShape,
    pub blink: bool,
    pub color: Option<u16>,
    /// Hidden by the application.
    pub hidden: bool,
    /// Current blink phase; `false` draws nothing.
    pub phase: bool,
}

impl Default for ArtificialCursor {
    fn default() -> Self {
        Self { shape: CursorShape::Block, blink: false, color: None, hidden: false, phase: true }
    }
}

impl ArtificialCursor {
    /// Whether anything should be painted this frame.
    pub fn is_drawn(&self) -> bool {
        !self.hidden && self.phase
    }

    /// Attribute and glyph for the cell under the cursor.
    pub fn overlay(&self, attr: Attr, ch: &str) -> (Attr, String) {
        let attr = attr.with_fg(self.color.unwrap_or(DEFAULT_CURSOR_COLOR));
        match self.shape {
            CursorShape::Block => (attr.with_flags(attr.flags() | AttrFlags::INVERSE), ch.to_string()),
            CursorShape::Underline => (attr.with_flags(attr.flags() | AttrFlags::UNDERLINE), ch.to_string()),
            CursorShape::Line => (attr, LINE_GLYPH.to_string()),
        }
    }

    /// Flip the blink phase; returns the new phase.
    pub fn toggle(&mut self) -> bool {
        self.phase = !self.phase;
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_inverts_and_keeps_glyph() {
        let c = ArtificialCursor::default();
        let (attr, ch) = c.overlay(Attr::DEFAULT, "a");
        assert!(attr.flags().contains(AttrFlags::INVERSE));
        assert_eq!(attr.fg(), 7);
        assert_eq!(ch, "a");
    }

    #[test]
    fn line_replaces_glyph() {
        let c = ArtificialCursor { shape: CursorShape::Line, color: Some(2), ..Default::default() };
        let (attr, ch) = c.overlay(Attr::DEFAULT, "a");
        assert_eq!(ch, "│");
        assert_eq!(attr.fg(), 2);
    }

    #[test]
    fn toggle_hides_for_one_phase() {
        let mut c = ArtificialCursor::default();
        assert!(c.is_drawn());
        assert!(!c.toggle());
        assert!(!c.is_drawn());
        assert!(c.toggle());
    }
}
