//! Escape sequence writers.
//!
//! Every function takes zero-based coordinates and converts to the one-based
//! wire form at the point of writing. Callers own cursor bookkeeping; these
//! functions only produce bytes.

use std::io::{self, Write};

use super::caps::MouseProtocol;

// =============================================================================
// Constants
// =============================================================================

pub const ESC: &str = "\x1b";
pub const CSI: &str = "\x1b[";
pub const BEL: &str = "\x07";
pub const ST: &str = "\x1b\\";

/// Plain SGR reset.
pub const SGR_RESET: &str = "\x1b[m";

// =============================================================================
// Cursor
// =============================================================================

/// `CUP`: absolute position.
#[inline]
pub fn cup<W: Write>(w: &mut W, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y as u32 + 1, x as u32 + 1)
}

/// `CUF`: forward `n` columns.
#[inline]
pub fn cuf<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 { Ok(()) } else { write!(w, "\x1b[{n}C") }
}

/// `CUB`: back `n` columns.
#[inline]
pub fn cub<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 { Ok(()) } else { write!(w, "\x1b[{n}D") }
}

/// `CUU`: up `n` rows.
#[inline]
pub fn cuu<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 { Ok(()) } else { write!(w, "\x1b[{n}A") }
}

/// `CUD`: down `n` rows.
#[inline]
pub fn cud<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    if n == 0 { Ok(()) } else { write!(w, "\x1b[{n}B") }
}

/// `CHA`: absolute column on the current row.
#[inline]
pub fn cha<W: Write>(w: &mut W, x: u16) -> io::Result<()> {
    write!(w, "\x1b[{}G", x as u32 + 1)
}

/// `DECSC`
pub fn save_cursor<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b7")
}

/// `DECRC`
pub fn restore_cursor<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b8")
}

pub fn hide_cursor<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

pub fn show_cursor<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Cursor shape as set by `DECSCUSR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Line,
}

pub fn cursor_shape<W: Write>(w: &mut W, shape: CursorShape, blink: bool) -> io::Result<()> {
    let n = match shape {
        CursorShape::Block => 2,
        CursorShape::Underline => 4,
        CursorShape::Line => 6,
    } - u8::from(blink);
    write!(w, "\x1b[{n} q")
}

// =============================================================================
// Erase, scroll region, lines
// =============================================================================

/// `EL`: erase to end of line with the current background.
pub fn erase_eol<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

/// Home and erase the whole display.
pub fn clear_screen<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[H\x1b[2J")
}

/// `DECSTBM` over rows `top..=bottom`.
pub fn csr<W: Write>(w: &mut W, top: u16, bottom: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}r", top as u32 + 1, bottom as u32 + 1)
}

/// `IL`
pub fn insert_lines<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}L")
}

/// `DL`
pub fn delete_lines<W: Write>(w: &mut W, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}M")
}

// =============================================================================
// Modes
// =============================================================================

pub fn alt_buffer<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { b"\x1b[?1049h" } else { b"\x1b[?1049l" })
}

pub fn bracketed_paste<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { b"\x1b[?2004h" } else { b"\x1b[?2004l" })
}

pub fn focus_reporting<W: Write>(w: &mut W, on: bool) -> io::Result<()> {
    w.write_all(if on { b"\x1b[?1004h" } else { b"\x1b[?1004l" })
}

/// Which mouse events to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseTracking {
    /// Press and release only (1000).
    Normal,
    /// Plus motion while a button is held (1002).
    #[default]
    ButtonEvent,
    /// All motion (1003).
    AnyEvent,
}

/// Turn mouse reporting on or off for a tracking level and dialect.
pub fn mouse<W: Write>(
    w: &mut W,
    on: bool,
    tracking: MouseTracking,
    protocol: MouseProtocol,
) -> io::Result<()> {
    let suffix = if on { 'h' } else { 'l' };
    let mode = match tracking {
        MouseTracking::Normal => 1000,
        MouseTracking::ButtonEvent => 1002,
        MouseTracking::AnyEvent => 1003,
    };
    write!(w, "\x1b[?{mode}{suffix}")?;
    match protocol {
        MouseProtocol::Sgr => write!(w, "\x1b[?1006{suffix}"),
        MouseProtocol::Urxvt => write!(w, "\x1b[?1015{suffix}"),
        MouseProtocol::X10 => Ok(()),
    }
}

// =============================================================================
// Misc
// =============================================================================

pub fn bell<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(BEL.as_bytes())
}

/// `OSC 0`: window and icon title.
pub fn set_title<W: Write>(w: &mut W, title: &str) -> io::Result<()> {
    write!(w, "\x1b]0;{title}\x07")
}

/// Wrap a sequence for tmux pass-through.
///
/// tmux cannot see nested string terminators, so each `ESC \` inside the
/// payload becomes `BEL` before wrapping.
pub fn tmux_wrap(data: &str) -> String {
    format!("\x1bPtmux;\x1b{}\x1b\\", data.replace(ST, BEL))
}

// =============================================================================
// Queries
// =============================================================================

/// Primary device attributes.
pub fn query_device_attributes<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[c")
}

/// Secondary device attributes.
pub fn query_secondary_attributes<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[>c")
}

/// `DSR 6`: cursor position report.
pub fn query_cursor_position<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

/// `DSR 5`: device status.
pub fn query_status<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[5n")
}

/// Text area size in characters.
pub fn query_window_size<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[18t")
}

/// `OSC 4`: palette colour query.
pub fn query_palette_color<W: Write>(w: &mut W, index: u8) -> io::Result<()> {
    write!(w, "\x1b]4;{index};?\x07")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn cursor_positions_are_one_based() {
        assert_eq!(emit(|w| cup(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(emit(|w| cup(w, 9, 4)), "\x1b[5;10H");
        assert_eq!(emit(|w| cha(w, 3)), "\x1b[4G");
    }

    #[test]
    fn relative_moves_skip_zero() {
        assert_eq!(emit(|w| cuf(w, 0)), "");
        assert_eq!(emit(|w| cuf(w, 3)), "\x1b[3C");
        assert_eq!(emit(|w| cub(w, 2)), "\x1b[2D");
        assert_eq!(emit(|w| cuu(w, 1)), "\x1b[1A");
        assert_eq!(emit(|w| cud(w, 1)), "\x1b[1B");
    }

    #[test]
    fn scroll_region_and_lines() {
        assert_eq!(emit(|w| csr(w, 0, 23)), "\x1b[1;24r");
        assert_eq!(emit(|w| insert_lines(w, 2)), "\x1b[2L");
        assert_eq!(emit(|w| delete_lines(w, 1)), "\x1b[1M");
    }

    #[test]
    fn mouse_modes_follow_protocol() {
        assert_eq!(
            emit(|w| mouse(w, true, MouseTracking::ButtonEvent, MouseProtocol::Sgr)),
            "\x1b[?1002h\x1b[?1006h"
        );
        assert_eq!(
            emit(|w| mouse(w, false, MouseTracking::Normal, MouseProtocol::Urxvt)),
            "\x1b[?1000l\x1b[?1015l"
        );
        assert_eq!(
            emit(|w| mouse(w, true, MouseTracking::AnyEvent, MouseProtocol::X10)),
            "\x1b[?1003h"
        );
    }

    #[test]
    fn cursor_shape_codes() {
        assert_eq!(emit(|w| cursor_shape(w, CursorShape::Block, true)), "\x1b[1 q");
        assert_eq!(emit(|w| cursor_shape(w, CursorShape::Line, false)), "\x1b[6 q");
    }

    #[test]
    fn tmux_wrapping_replaces_string_terminators() {
        assert_eq!(
            tmux_wrap("\x1b]52;c;aGk=\x1b\\"),
            "\x1bPtmux;\x1b\x1b]52;c;aGk=\x07\x1b\\"
        );
    }

    #[test]
    fn title_and_queries() {
        assert_eq!(emit(|w| set_title(w, "hi")), "\x1b]0;hi\x07");
        assert_eq!(emit(query_cursor_position), "\x1b[6n");
        assert_eq!(emit(|w| query_palette_color(w, 4)), "\x1b]4;4;?\x07");
    }
}
