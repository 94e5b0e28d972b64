//! Scroll state for scrollable elements.
//!
//! Scrolling is cursor-like: `child_offset` is a position inside the view
//! and `child_base` (the first visible content row) only moves once the
//! offset runs past either edge. With `always_scroll` every scroll moves
//! the base directly.
//!
//! The math here is pure; the screen supplies the view height and content
//! height (the larger of wrapped line count and the lowest child bottom).

/// Default scroll amount for arrow keys (lines).
pub const LINE_SCROLL: i32 = 1;

/// Default scroll amount for mouse wheel.
pub const WHEEL_SCROLL: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scrollbar {
    /// Thumb glyph.
    pub ch: char,
    /// Track glyph; `None` leaves the track unpainted.
    pub track: Option<char>,
    /// Draw over the right border instead of inside it.
    pub ignore_border: bool,
}

impl Default for Scrollbar {
    fn default() -> Self {
        Self { ch: ' ', track: None, ignore_border: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub child_base: i32,
    pub child_offset: i32,
    pub always_scroll: bool,
    pub base_limit: i32,
    pub scrollbar: Option<Scrollbar>,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self { child_base: 0, child_offset: 0, always_scroll: false, base_limit: i32::MAX, scrollbar: None }
    }
}

impl ScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_scroll(mut self, on: bool) -> Self {
        self.always_scroll = on;
        self
    }

    pub fn scrollbar(mut self, bar: Scrollbar) -> Self {
        self.scrollbar = Some(bar);
        self
    }

    /// Move by `offset` rows in a view of `visible` rows over `height`
    /// rows of content. Returns whether `child_base` changed.
    pub fn scroll(&mut self, offset: i32, always: bool, visible: i32, height: i32) -> bool {
        let visible = visible.max(1);
        let before = self.child_base;

        if self.always_scroll || always {
            self.child_offset = if offset > 0 { visible - 1 + offset } else { offset };
        } else {
            self.child_offset += offset;
        }

        if self.child_offset > visible - 1 {
            let d = self.child_offset - (visible - 1);
            self.child_offset -= d;
            self.child_base += d;
        } else if self.child_offset < 0 {
            let d = self.child_offset;
            self.child_offset -= d;
            self.child_base += d;
        }
        self.clamp_base();

        if self.child_base == before {
            return false;
        }
        let max = (height - visible).max(0);
        self.child_base = self.child_base.min(max);
        self.clamp_base();
        self.child_base != before
    }

    /// Bring content row `row` into view.
    pub fn scroll_to(&mut self, row: i32, always: bool, visible: i32, height: i32) -> bool {
        let a = self.scroll(0, false, visible, height);
        let target = row - (self.child_base + self.child_offset);
        let b = self.scroll(target, always, visible, height);
        a || b
    }

    /// Scroll to `perc` percent of the content.
    pub fn set_perc(&mut self, perc: f32, visible: i32, height: i32) -> bool {
        let row = (perc / 100.0 * height as f32) as i32;
        self.scroll_to(row, false, visible, height)
    }

    /// Position as a percentage, or `None` when everything fits.
    pub fn perc(&self, visible: i32, height: i32) -> Option<f32> {
        if visible >= height {
            return None;
        }
        let p = if self.always_scroll {
            self.child_base as f32 / (height - visible) as f32
        } else {
            (self.child_base + self.child_offset) as f32 / (height - 1).max(1) as f32
        };
        Some(p * 100.0)
    }

    pub fn reset(&mut self) {
        self.child_base = 0;
        self.child_offset = 0;
    }

    /// Row of the scrollbar thumb within a view of `visible` rows.
    ///
    /// Follows the base alone, so the thumb tracks what is shown rather
    /// than where the offset sits inside the view.
    pub fn thumb_row(&self, visible: i32, height: i32) -> i32 {
        let frac = self.child_base as f32 / (height - visible).max(1) as f32;
        ((visible as f32 * frac) as i32).clamp(0, (visible - 1).max(0))
    }

    fn clamp_base(&mut self) {
        self.child_base = self.child_base.clamp(0, self.base_limit.max(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_moves_inside_view_before_base() {
        let mut s = ScrollState::new();
        assert!(!s.scroll(3, false, 5, 20));
        assert_eq!((s.child_base, s.child_offset), (0, 3));
        assert!(s.scroll(3, false, 5, 20));
        assert_eq!((s.child_base, s.child_offset), (2, 4));
    }

    #[test]
    fn always_scroll_moves_base() {
        let mut s = ScrollState::new().always_scroll(true);
        assert!(s.scroll(1, false, 5, 20));
        assert_eq!(s.child_base, 1);
        assert!(s.scroll(-1, false, 5, 20));
        assert_eq!(s.child_base, 0);
    }

    #[test]
    fn base_is_clamped_to_content() {
        let mut s = ScrollState::new().always_scroll(true);
        s.scroll(100, false, 5, 20);
        assert_eq!(s.child_base, 15);
        s.scroll(-100, false, 5, 20);
        assert_eq!(s.child_base, 0);
    }

    #[test]
    fn scroll_to_brings_row_into_view() {
        let mut s = ScrollState::new();
        s.scroll_to(10, false, 5, 20);
        assert_eq!(s.child_base + s.child_offset, 10);
        assert!(s.child_base <= 10 && 10 < s.child_base + 5);
    }

    #[test]
    fn perc_is_none_when_content_fits() {
        let s = ScrollState::new();
        assert_eq!(s.perc(10, 5), None);
        let mut s = ScrollState::new().always_scroll(true);
        s.scroll(100, false, 5, 15);
        assert_eq!(s.perc(5, 15), Some(100.0));
    }

    #[test]
    fn reset_returns_to_top() {
        let mut s = ScrollState::new().always_scroll(true);
        s.scroll(4, false, 5, 20);
        s.reset();
        assert_eq!((s.child_base, s.child_offset), (0, 0));
    }

    #[test]
    fn thumb_stays_inside_view() {
        let mut s = ScrollState::new().always_scroll(true);
        assert_eq!(s.thumb_row(5, 20), 0);
        s.scroll(100, false, 5, 20);
        assert_eq!(s.thumb_row(5, 20), 4);
    }

    #[test]
    fn thumb_follows_base_in_both_modes() {
        let offset = ScrollState { child_base: 9, child_offset: 4, ..ScrollState::new() };
        assert_eq!(offset.thumb_row(5, 20), 3);
        let always = ScrollState { child_base: 9, ..ScrollState::new().always_scroll(true) };
        assert_eq!(always.thumb_row(5, 20), 3);
    }
}
